//! Tag row and tagname normalization.
//!
//! # Invariants
//! - Tag names are normalized to lowercase before persistence.
//! - `tagnames` strings are space-separated, deduplicated, order
//!   preserving (first occurrence wins).

use serde::{Deserialize, Serialize};

use crate::model::user::UserId;

pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_by: Option<UserId>,
    /// Number of non-deleted questions carrying this tag.
    pub use_count: i64,
}

/// Normalizes one tag name. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Splits a space-separated tagnames string into normalized, deduplicated
/// names, preserving first-occurrence order.
pub fn parse_tagnames(tagnames: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for raw in tagnames.split_whitespace() {
        if let Some(name) = normalize_tag(raw) {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

/// Joins normalized tag names back into the denormalized string form.
pub fn join_tagnames(names: &[String]) -> String {
    names.join(" ")
}

#[cfg(test)]
mod tests {
    use super::parse_tagnames;

    #[test]
    fn parse_tagnames_normalizes_and_dedupes_in_order() {
        let names = parse_tagnames("  Rust  sqlite RUST web ");
        assert_eq!(names, vec!["rust", "sqlite", "web"]);
    }

    #[test]
    fn parse_tagnames_of_blank_input_is_empty() {
        assert!(parse_tagnames("   ").is_empty());
    }
}
