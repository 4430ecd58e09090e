//! Post addressing shared by comments, votes and search.
//!
//! Questions and answers live in separate tables but share vote and
//! comment semantics; `PostKind` plus a rowid is the generic address.

use serde::{Deserialize, Serialize};

/// Discriminates the two post tables for generic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Question,
    Answer,
}

impl PostKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "question" => Some(Self::Question),
            "answer" => Some(Self::Answer),
            _ => None,
        }
    }
}
