//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into write-path use-case APIs
//!   (asking, editing, voting, commenting, accounts).
//! - Keep the HTTP layer decoupled from storage details.
//!
//! Read paths for pages go straight to repositories; permission checks
//! stay in the view layer, mirroring the original request handlers.

pub mod answer_service;
pub mod comment_service;
pub mod question_service;
pub mod user_service;
pub mod vote_service;
