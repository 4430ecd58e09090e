//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories that update denormalized counters do so in the same
//!   transaction as the triggering write.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   DB transport errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::model::user::UserId;

pub mod answer_repo;
pub mod badge_repo;
pub mod comment_repo;
pub mod question_repo;
pub mod tag_repo;
pub mod user_repo;
pub mod vote_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Author columns denormalized into read models, mirroring what list and
/// detail pages show next to every post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorBrief {
    pub id: UserId,
    pub username: String,
    pub reputation: i64,
    pub gold: i64,
    pub silver: i64,
    pub bronze: i64,
}

impl AuthorBrief {
    /// Parses author columns selected with an `author_` prefix.
    pub(crate) fn from_prefixed_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("author_id")?,
            username: row.get("author_username")?,
            reputation: row.get("author_reputation")?,
            gold: row.get("author_gold")?,
            silver: row.get("author_silver")?,
            bronze: row.get("author_bronze")?,
        })
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn int_to_bool(field: &'static str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {field}"
        ))),
    }
}
