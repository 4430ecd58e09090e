//! Session-cookie authentication extractors.
//!
//! Sessions are uuid tokens stored in the database; the cookie carries
//! only the token. `CurrentUser` redirects anonymous visitors to the
//! login page, `MaybeUser` never rejects.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use curio_core::model::user::User;
use curio_core::repo::user_repo::{SqliteUserRepository, UserRepository};

use crate::error::PageError;
use crate::state::{AppState, SharedState};

pub const SESSION_COOKIE: &str = "curio_session";

/// Extractor for views that require a logged-in user.
pub struct CurrentUser(pub User);

/// Extractor for views that render differently for anonymous visitors.
pub struct MaybeUser(pub Option<User>);

/// Resolves the session cookie to a user, if any.
pub fn resolve_user(state: &AppState, jar: &CookieJar) -> Result<Option<User>, PageError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Ok(token) = Uuid::parse_str(cookie.value()) else {
        return Ok(None);
    };

    let mut conn = state.db()?;
    let repo = SqliteUserRepository::new(&mut conn);
    Ok(repo.session_user(token)?)
}

/// The original marks AJAX requests with this header.
pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

#[async_trait]
impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(MaybeUser(resolve_user(state, &jar)?))
    }
}

#[async_trait]
impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match resolve_user(state, &jar) {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(err) => Err(err.into_response()),
        }
    }
}
