//! Answer row.

use serde::{Deserialize, Serialize};

use crate::model::question::QuestionId;
use crate::model::user::UserId;

pub type AnswerId = i64;

/// Canonical answer row. `html` is the sanitized rendering of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub author_id: UserId,
    pub added_at: i64,
    pub html: String,
    pub text: String,
    pub score: i64,
    pub wiki: bool,
    pub wikified_at: Option<i64>,
    pub last_edited_at: Option<i64>,
    pub last_edited_by: Option<UserId>,
    pub accepted: bool,
    pub deleted: bool,
    pub locked: bool,
}

impl Answer {
    pub fn is_votable(&self) -> bool {
        !self.deleted && !self.locked
    }
}
