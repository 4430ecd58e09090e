//! Request handlers, grouped the way the route table reads.

use axum::response::{Html, IntoResponse, Response};
use tera::Context;

use curio_core::model::user::User;

use crate::error::PageError;
use crate::state::AppState;

pub mod accounts;
pub mod answers;
pub mod badges;
pub mod comments;
pub mod questions;
pub mod search;
pub mod tags_users;
pub mod votes;

/// Renders a template to an HTML response.
pub(crate) fn render(
    state: &AppState,
    template: &str,
    context: &Context,
) -> Result<Response, PageError> {
    let html = state.templates.render(template, context)?;
    Ok(Html(html).into_response())
}

/// Context pre-populated with the keys every page expects.
pub(crate) fn base_context(title: &str, user: Option<&User>) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("current_user", &user);
    context
}

pub(crate) fn question_url(question_id: i64) -> String {
    format!("/questions/{question_id}")
}
