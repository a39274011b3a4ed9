//! Directory search provider module
//!
//! The engine talks to the directory only through the [`DirectoryProvider`]
//! trait: a paged `search` with opaque continuation tokens and a best-effort
//! `estimate_count`.
//!
//! # Overview
//!
//! The provider module provides:
//! - `DirectoryProvider` - The search/count capability consumed by the engine
//! - `ContinuationToken` - Opaque, move-only resume marker issued by a provider
//! - `MemoryDirectory` - A provider backed by an in-memory (YAML fixture) directory

mod memory;
mod types;

pub use memory::{DirectoryFixture, MemoryDirectory};
pub use types::{ContinuationToken, CountEstimate, DirectoryProvider, SearchPage, SearchRequest};

#[cfg(test)]
mod tests;
