//! Badge and award rows.

use serde::{Deserialize, Serialize};

use crate::model::user::UserId;

pub type BadgeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    Gold,
    Silver,
    Bronze,
}

impl BadgeKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gold" => Some(Self::Gold),
            "silver" => Some(Self::Silver),
            "bronze" => Some(Self::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub kind: BadgeKind,
    pub description: String,
    /// Whether the badge can be awarded to the same user more than once.
    pub multiple: bool,
    pub awarded_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: i64,
    pub badge_id: BadgeId,
    pub user_id: UserId,
    pub awarded_at: i64,
}
