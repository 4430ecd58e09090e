//! Comment row, attachable to a question or an answer.

use serde::{Deserialize, Serialize};

use crate::model::post::PostKind;
use crate::model::user::UserId;

pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_kind: PostKind,
    pub post_id: i64,
    pub author_id: UserId,
    pub added_at: i64,
    pub comment: String,
}
