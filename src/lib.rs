// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # dirsearch
//!
//! Paged search over a directory whose protocol only offers forward-only,
//! per-partition continuation tokens.
//!
//! ## Features
//!
//! - **Multi-partition queries**: results of several search bases are
//!   concatenated in the order the query names them
//! - **Page cache**: every page produced for a session is kept, so revisiting
//!   a page never touches the directory again
//! - **Sliding sessions**: idle sessions expire after a configurable TTL
//! - **Export**: drain a session and render it as CSV or JSON
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dirsearch::service::{DirectoryService, QueryRequest};
//! use dirsearch::{MemoryDirectory, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> dirsearch::Result<()> {
//!     let directory = MemoryDirectory::from_file("fixtures/directory.yaml")?;
//!     let service = DirectoryService::in_memory(Arc::new(directory), ServiceConfig::default())?;
//!
//!     let first = service
//!         .start_query(&QueryRequest::object_type("users", "smith"))
//!         .await?;
//!     let second = service.get_page(first.session_id.as_str(), 2).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │              HTTP (axum) / CLI (clap)                        │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │  DirectoryService: StartQuery GetPage GetAll Export Invalidate│
//! └───────┬──────────────────┬───────────────────┬───────────────┘
//!         │                  │                   │
//! ┌───────┴──────┐  ┌────────┴─────────┐  ┌──────┴──────────┐
//! │ SessionStore │  │ PaginationEngine │  │ ExportReplayer  │
//! │ TTL, locking │  │ cursors, pages   │  │ CSV / JSON      │
//! └──────────────┘  └────────┬─────────┘  └─────────────────┘
//!                            │
//!                  ┌─────────┴─────────┐
//!                  │ DirectoryProvider │
//!                  └───────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Records, partitions and object types
pub mod types;

/// Search filter parsing and evaluation
pub mod filter;

/// Directory search provider abstraction
pub mod provider;

/// Sessions and the session store
pub mod session;

/// Page production across partitions
pub mod pagination;

/// Export replay and formatting
pub mod export;

/// Service operations
pub mod service;

/// Service configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use pagination::{PageResult, PaginationEngine};
pub use provider::{DirectoryProvider, MemoryDirectory};
pub use service::DirectoryService;
pub use session::{MemorySessionStore, SessionStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
