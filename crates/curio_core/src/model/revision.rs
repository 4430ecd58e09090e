//! Revision rows for questions and answers.
//!
//! # Invariants
//! - `revision` numbers start at 1 and increase monotonically per post.
//! - Revisions snapshot the markdown source, not the rendered HTML.

use serde::{Deserialize, Serialize};

use crate::model::answer::AnswerId;
use crate::model::question::QuestionId;
use crate::model::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRevision {
    pub id: i64,
    pub question_id: QuestionId,
    pub revision: i64,
    pub title: String,
    pub author_id: UserId,
    pub revised_at: i64,
    pub tagnames: String,
    pub summary: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRevision {
    pub id: i64,
    pub answer_id: AnswerId,
    pub revision: i64,
    pub author_id: UserId,
    pub revised_at: i64,
    pub summary: String,
    pub text: String,
}
