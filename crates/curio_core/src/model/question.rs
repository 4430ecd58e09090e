//! Question row.

use serde::{Deserialize, Serialize};

use crate::model::user::UserId;

pub type QuestionId = i64;

/// Canonical question row.
///
/// `html` is the sanitized rendering of `text` (the latest revision's
/// markdown source); `summary` is the tag-stripped 180-char excerpt.
/// `tagnames` mirrors the tag link table as a space-separated string so
/// revisions can snapshot it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub author_id: UserId,
    pub added_at: i64,
    pub tagnames: String,
    pub summary: String,
    pub html: String,
    pub text: String,
    pub answer_count: i64,
    pub score: i64,
    pub favourite_count: i64,
    pub last_activity_at: i64,
    pub last_activity_by: UserId,
    pub wiki: bool,
    pub wikified_at: Option<i64>,
    pub last_edited_at: Option<i64>,
    pub last_edited_by: Option<UserId>,
    pub closed: bool,
    pub closed_by: Option<UserId>,
    pub closed_at: Option<i64>,
    pub close_reason: Option<String>,
    pub deleted: bool,
    pub locked: bool,
}

impl Question {
    /// Whether the post accepts votes and comments.
    pub fn is_votable(&self) -> bool {
        !self.deleted && !self.locked
    }
}
