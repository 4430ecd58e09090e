//! Vote handlers for questions and answers.

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use curio_core::auth;
use curio_core::model::user::User;
use curio_core::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::repo::vote_repo::SqliteVoteRepository;
use curio_core::service::vote_service::VoteService;
use curio_core::{PostKind, VoteKind};

use crate::error::PageError;
use crate::forms::VoteForm;
use crate::handlers::question_url;
use crate::session::{is_ajax, CurrentUser};
use crate::state::{AppState, SharedState};

/// Maps the posted vote type, enforcing reputation gates; anything else
/// is a 404, mirroring the original.
fn parse_direction(user: &User, vote_type: &str) -> Result<VoteKind, PageError> {
    match vote_type {
        "up" if auth::can_vote_up(user) => Ok(VoteKind::Up),
        "down" if auth::can_vote_down(user) => Ok(VoteKind::Down),
        _ => Err(PageError::NotFound),
    }
}

fn cast(
    state: &AppState,
    user: &User,
    kind: PostKind,
    post_id: i64,
    post_author: i64,
    votable: bool,
    direction: VoteKind,
) -> Result<i64, PageError> {
    let mut conn = state.db()?;
    let mut service = VoteService::new(SqliteVoteRepository::new(&mut conn));
    let outcome = service.cast(user.id, post_author, votable, kind, post_id, direction)?;
    Ok(outcome.score)
}

/// Vote on a question.
pub async fn vote_question(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<VoteForm>,
) -> Result<Response, PageError> {
    let direction = parse_direction(&user, &form.vote_type)?;

    let question = {
        let mut conn = state.db()?;
        SqliteQuestionRepository::new(&mut conn)
            .get_question(question_id)?
            .filter(|question| !question.deleted)
            .ok_or(PageError::NotFound)?
    };

    let score = cast(
        &state,
        &user,
        PostKind::Question,
        question.id,
        question.author_id,
        question.is_votable(),
        direction,
    )?;

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true, "score": score})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question.id)).into_response())
    }
}

/// Vote on an answer.
pub async fn vote_answer(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(answer_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<VoteForm>,
) -> Result<Response, PageError> {
    let direction = parse_direction(&user, &form.vote_type)?;

    let answer = {
        let mut conn = state.db()?;
        SqliteAnswerRepository::new(&mut conn)
            .get_answer(answer_id)?
            .filter(|answer| !answer.deleted)
            .ok_or(PageError::NotFound)?
    };

    let score = cast(
        &state,
        &user,
        PostKind::Answer,
        answer.id,
        answer.author_id,
        answer.is_votable(),
        direction,
    )?;

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true, "score": score})).into_response())
    } else {
        Ok(Redirect::to(&question_url(answer.question_id)).into_response())
    }
}
