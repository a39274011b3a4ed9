//! CLI module
//!
//! Command-line interface for the directory search service.
//!
//! # Commands
//!
//! - `serve` - Start HTTP server mode
//! - `query` - Run a query and print one page
//! - `export` - Run a query and export every result
//! - `attributes` - List default attributes of an object type

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat, QueryArgs};
pub use runner::Runner;
pub use server::{router, serve, status_for};
