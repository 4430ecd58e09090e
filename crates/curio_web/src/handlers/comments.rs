//! Comment handlers for questions and answers.

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use curio_core::auth;
use curio_core::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use curio_core::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::service::comment_service::CommentService;
use curio_core::PostKind;

use crate::error::PageError;
use crate::forms::CommentForm;
use crate::handlers::answers::answer_comments_page;
use crate::handlers::question_url;
use crate::handlers::questions::question_comments_page;
use crate::session::{is_ajax, CurrentUser};
use crate::state::SharedState;

/// Adds a comment to a question; invalid input falls back to the
/// comments page with the error map (or JSON for AJAX).
pub async fn add_question_comment(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let question = {
        let mut conn = state.db()?;
        SqliteQuestionRepository::new(&mut conn)
            .get_question(question_id)?
            .filter(|question| !question.deleted)
            .ok_or(PageError::NotFound)?
    };

    let errors = form.validate();
    if !errors.is_empty() {
        return if is_ajax(&headers) {
            Ok(Json(json!({"success": false, "errors": errors})).into_response())
        } else {
            question_comments_page(&state, Some(&user), &question, &form.comment, &errors)
        };
    }

    {
        let mut conn = state.db()?;
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service.add_comment(user.id, PostKind::Question, question.id, &form.comment)?;
    }

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question.id)).into_response())
    }
}

/// Adds a comment to an answer.
pub async fn add_answer_comment(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(answer_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let answer = {
        let mut conn = state.db()?;
        SqliteAnswerRepository::new(&mut conn)
            .get_answer(answer_id)?
            .filter(|answer| !answer.deleted)
            .ok_or(PageError::NotFound)?
    };

    let errors = form.validate();
    if !errors.is_empty() {
        return if is_ajax(&headers) {
            Ok(Json(json!({"success": false, "errors": errors})).into_response())
        } else {
            answer_comments_page(&state, Some(&user), &answer, &form.comment, &errors)
        };
    }

    {
        let mut conn = state.db()?;
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service.add_comment(user.id, PostKind::Answer, answer.id, &form.comment)?;
    }

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true})).into_response())
    } else {
        Ok(Redirect::to(&question_url(answer.question_id)).into_response())
    }
}

/// Deletes a comment permanently; author and staff only.
pub async fn delete_comment(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let comment = {
        let mut conn = state.db()?;
        SqliteCommentRepository::new(&mut conn)
            .get_comment(comment_id)?
            .ok_or(PageError::NotFound)?
    };
    if !auth::can_delete_comment(&user, comment.author_id) {
        return Err(PageError::NotFound);
    }

    {
        let mut conn = state.db()?;
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service.delete_comment(comment.id)?;
    }

    let question_id = match comment.post_kind {
        PostKind::Question => comment.post_id,
        PostKind::Answer => {
            let mut conn = state.db()?;
            SqliteAnswerRepository::new(&mut conn)
                .get_answer(comment.post_id)?
                .map(|answer| answer.question_id)
                .ok_or(PageError::NotFound)?
        }
    };

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question_id)).into_response())
    }
}
