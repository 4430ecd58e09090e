//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose keyword search over question and answer bodies, backed by
//!   the SQLite FTS5 index maintained by schema triggers.

pub mod fts;
