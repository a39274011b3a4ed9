//! Session management module
//!
//! Holds the per-query state that makes repeated page requests cheap: the
//! cursor of every partition, every page produced so far, and the count
//! estimate. Sessions expire after a sliding idle TTL.
//!
//! # Overview
//!
//! The session module provides:
//! - `Session` - Query, cursor set, page cache and count estimate
//! - `SessionStore` - Keyed storage with sliding TTL and per-session locking
//! - `MemorySessionStore` - In-process store backing
//! - `spawn_sweeper` - Background removal of expired sessions

mod store;
mod types;

pub use store::{spawn_sweeper, MemorySessionStore, SessionHandle, SessionStore};
pub use types::{CursorSet, CursorState, PageCache, SearchQuery, Session, SessionId};
