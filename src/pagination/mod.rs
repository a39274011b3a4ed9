//! Pagination module
//!
//! Turns per-partition, forward-only directory searches into numbered pages
//! of a fixed size.
//!
//! # Overview
//!
//! A page is produced by walking the query's partitions in order, resuming
//! each from its continuation token, until the page is full or every
//! partition is exhausted. Pages are produced strictly in sequence and cached
//! on the session, so asking for an already-produced page never touches the
//! directory again.

mod engine;
mod types;

pub use engine::PaginationEngine;
pub use types::PageResult;
