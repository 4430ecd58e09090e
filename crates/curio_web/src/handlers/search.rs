//! Full-text search handler.

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use curio_core::{search_posts, SearchError, SearchQuery};

use crate::error::PageError;
use crate::handlers::{base_context, render};
use crate::session::MaybeUser;
use crate::state::SharedState;

const SEARCH_RESULT_LIMIT: u32 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Searches questions and answers.
pub async fn search(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<SearchParams>,
) -> Result<Response, PageError> {
    let query_text = params.q.unwrap_or_default();

    let (hits, query_error) = {
        let conn = state.db()?;
        let mut query = SearchQuery::new(query_text.clone());
        query.limit = SEARCH_RESULT_LIMIT;
        match search_posts(&conn, &query) {
            Ok(hits) => (hits, None),
            Err(SearchError::InvalidQuery { message, .. }) => (Vec::new(), Some(message)),
            Err(other) => return Err(other.into()),
        }
    };

    let mut context = base_context("Search", user.as_ref());
    context.insert("query", &query_text);
    context.insert("hits", &hits);
    context.insert("query_error", &query_error);
    render(&state, "search.html", &context)
}
