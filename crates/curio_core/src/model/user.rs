//! User account row.

use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// Registered account with denormalized reputation and medal counters.
///
/// Anonymous visitors are represented as `Option<User>::None` at the
/// request layer; every row here is a real account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub date_joined: i64,
    /// Floors at 1; adjusted by vote and acceptance deltas.
    pub reputation: i64,
    pub gold: i64,
    pub silver: i64,
    pub bronze: i64,
    /// Per-user page size for question lists.
    pub questions_per_page: u32,
    pub is_staff: bool,
}
