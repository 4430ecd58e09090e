//! Vote direction and per-post vote row.
//!
//! # Invariants
//! - One vote per user per post (unique index in storage).
//! - Casting the same direction twice removes the vote; the opposite
//!   direction replaces it.

use serde::{Deserialize, Serialize};

use crate::model::post::PostKind;
use crate::model::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// Score contribution of this vote.
    pub fn value(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub post_kind: PostKind,
    pub post_id: i64,
    pub user_id: UserId,
    pub vote: VoteKind,
}
