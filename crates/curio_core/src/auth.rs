//! Reputation-gated permission rules.
//!
//! # Responsibility
//! - Answer "may this user do that" questions for the view layer.
//!
//! # Invariants
//! - Staff accounts pass every check.
//! - Thresholds compare against the denormalized `reputation` column.

use crate::model::user::{User, UserId};

pub const VOTE_UP_MIN_REPUTATION: i64 = 15;
pub const VOTE_DOWN_MIN_REPUTATION: i64 = 100;
pub const RETAG_MIN_REPUTATION: i64 = 500;
pub const EDIT_OTHERS_MIN_REPUTATION: i64 = 2_000;
pub const EDIT_WIKI_MIN_REPUTATION: i64 = 100;
pub const CLOSE_MIN_REPUTATION: i64 = 3_000;

pub fn can_vote_up(user: &User) -> bool {
    user.is_staff || user.reputation >= VOTE_UP_MIN_REPUTATION
}

pub fn can_vote_down(user: &User) -> bool {
    user.is_staff || user.reputation >= VOTE_DOWN_MIN_REPUTATION
}

pub fn can_retag_questions(user: &User) -> bool {
    user.is_staff || user.reputation >= RETAG_MIN_REPUTATION
}

/// Whether `user` may edit a post owned by `author_id`.
///
/// Wiki posts lower the bar so the community can maintain them.
pub fn can_edit_post(user: &User, author_id: UserId, wiki: bool) -> bool {
    if user.is_staff || user.id == author_id {
        return true;
    }
    let threshold = if wiki {
        EDIT_WIKI_MIN_REPUTATION
    } else {
        EDIT_OTHERS_MIN_REPUTATION
    };
    user.reputation >= threshold
}

pub fn can_close_question(user: &User) -> bool {
    user.is_staff || user.reputation >= CLOSE_MIN_REPUTATION
}

/// Only the question's author accepts answers.
pub fn can_accept_answer(user: &User, question_author: UserId) -> bool {
    user.id == question_author
}

/// Comment deletion is limited to the comment author and staff.
pub fn can_delete_comment(user: &User, comment_author: UserId) -> bool {
    user.is_staff || user.id == comment_author
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::User;

    fn user_with_reputation(reputation: i64) -> User {
        User {
            id: 7,
            username: "someone".to_string(),
            email: String::new(),
            date_joined: 0,
            reputation,
            gold: 0,
            silver: 0,
            bronze: 0,
            questions_per_page: 10,
            is_staff: false,
        }
    }

    #[test]
    fn reputation_thresholds_gate_votes() {
        assert!(!can_vote_up(&user_with_reputation(14)));
        assert!(can_vote_up(&user_with_reputation(15)));
        assert!(!can_vote_down(&user_with_reputation(99)));
        assert!(can_vote_down(&user_with_reputation(100)));
    }

    #[test]
    fn staff_bypasses_thresholds() {
        let mut staff = user_with_reputation(1);
        staff.is_staff = true;
        assert!(can_vote_down(&staff));
        assert!(can_close_question(&staff));
        assert!(can_edit_post(&staff, 99, false));
    }

    #[test]
    fn authors_edit_their_own_posts_and_wiki_lowers_the_bar() {
        let user = user_with_reputation(150);
        assert!(can_edit_post(&user, user.id, false));
        assert!(!can_edit_post(&user, 99, false));
        assert!(can_edit_post(&user, 99, true));
    }
}
