//! Domain model for the Q&A store.
//!
//! # Responsibility
//! - Define canonical row shapes used by repositories and services.
//! - Keep field semantics (denormalized counters, wiki/closed state) in
//!   one place.
//!
//! # Invariants
//! - Posts are identified by `i64` rowids; deletion is a soft flag.
//! - Denormalized counters on rows are maintained by the writing
//!   repository, never by callers.

pub mod answer;
pub mod badge;
pub mod comment;
pub mod post;
pub mod question;
pub mod revision;
pub mod tag;
pub mod user;
pub mod vote;
