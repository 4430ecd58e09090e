//! Badge list and detail handlers.

use axum::extract::{Path, State};
use axum::response::Response;

use curio_core::repo::badge_repo::{BadgeRepository, SqliteBadgeRepository};

use crate::error::PageError;
use crate::handlers::{base_context, render};
use crate::session::MaybeUser;
use crate::state::SharedState;

/// Recipients shown on the badge detail page.
const RECIPIENT_LIST_SIZE: u32 = 500;

/// Badge list.
pub async fn badges(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, PageError> {
    let badges = {
        let mut conn = state.db()?;
        SqliteBadgeRepository::new(&mut conn).list_badges()?
    };

    let mut context = base_context("Badges", user.as_ref());
    context.insert("badges", &badges);
    render(&state, "badges.html", &context)
}

/// Displays a badge and the users most recently awarded it.
pub async fn badge(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(badge_id): Path<i64>,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let repo = SqliteBadgeRepository::new(&mut conn);
    let badge = repo.get_badge(badge_id)?.ok_or(PageError::NotFound)?;
    let awarded_to = repo.recent_recipients(badge.id, RECIPIENT_LIST_SIZE)?;
    drop(conn);

    let title = format!("{} Badge", badge.name);
    let mut context = base_context(&title, user.as_ref());
    context.insert("badge", &badge);
    context.insert("awarded_to", &awarded_to);
    render(&state, "badge.html", &context)
}
