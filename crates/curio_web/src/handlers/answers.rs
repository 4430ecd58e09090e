//! Answer lifecycle handlers.

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use curio_core::auth;
use curio_core::markdown::render_markdown;
use curio_core::model::answer::Answer;
use curio_core::model::question::Question;
use curio_core::model::user::User;
use curio_core::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use curio_core::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use curio_core::service::answer_service::{AnswerService, EditAnswerInput};
use curio_core::PostKind;

use crate::error::PageError;
use crate::forms::{AddAnswerForm, AnswerFormValues, EditAnswerForm, FormErrors};
use crate::handlers::questions::revision_authors;
use crate::handlers::{base_context, question_url, render};
use crate::session::{is_ajax, CurrentUser, MaybeUser};
use crate::state::{AppState, SharedState};

fn get_active_question(state: &AppState, question_id: i64) -> Result<Question, PageError> {
    let mut conn = state.db()?;
    SqliteQuestionRepository::new(&mut conn)
        .get_question(question_id)?
        .filter(|question| !question.deleted)
        .ok_or(PageError::NotFound)
}

fn get_active_answer(state: &AppState, answer_id: i64) -> Result<Answer, PageError> {
    let mut conn = state.db()?;
    SqliteAnswerRepository::new(&mut conn)
        .get_answer(answer_id)?
        .filter(|answer| !answer.deleted)
        .ok_or(PageError::NotFound)
}

fn render_add_page(
    state: &AppState,
    user: Option<&User>,
    question: &Question,
    values: &AnswerFormValues,
    errors: &FormErrors,
    preview: Option<String>,
) -> Result<Response, PageError> {
    let mut context = base_context("Post an Answer", user);
    context.insert("question", question);
    context.insert("form", values);
    context.insert("errors", errors);
    context.insert("preview", &preview);
    render(state, "add_answer.html", &context)
}

/// Answer form page.
pub async fn add_answer_form(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(question_id): Path<i64>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;
    render_add_page(
        &state,
        user.as_ref(),
        &question,
        &AnswerFormValues::default(),
        &FormErrors::new(),
        None,
    )
}

/// Answer submission with preview support.
pub async fn add_answer_submit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    Form(form): Form<AddAnswerForm>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;

    let errors = form.validate();
    if errors.is_empty() && form.wants_submit() {
        let mut conn = state.db()?;
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        service.add_answer(user.id, &question, &form.text, form.wiki_checked())?;
        return Ok(Redirect::to(&question_url(question_id)).into_response());
    }

    let preview = if errors.is_empty() && form.wants_preview() {
        Some(render_markdown(&form.text))
    } else {
        None
    };
    render_add_page(
        &state,
        Some(&user),
        &question,
        &AnswerFormValues::from_add_form(&form),
        &errors,
        preview,
    )
}

/// Fallback page showing one answer plus its comments and comment form.
pub(crate) fn answer_comments_page(
    state: &AppState,
    user: Option<&User>,
    answer: &Answer,
    comment_value: &str,
    comment_errors: &FormErrors,
) -> Result<Response, PageError> {
    let question = get_active_question(state, answer.question_id)?;

    let mut conn = state.db()?;
    let comments =
        SqliteCommentRepository::new(&mut conn).list_for_post(PostKind::Answer, answer.id)?;
    let author = SqliteUserRepository::new(&mut conn)
        .get_user(answer.author_id)?
        .ok_or_else(|| PageError::Internal("answer author row missing".to_string()))?;
    drop(conn);

    let mut context = base_context("Answer Comments", user);
    context.insert("question", &question);
    context.insert("answer", answer);
    context.insert("answer_author", &author);
    context.insert("comments", &comments);
    context.insert("comment_value", comment_value);
    context.insert("comment_errors", comment_errors);
    render(state, "answer.html", &context)
}

/// Displays a single answer and any comments on it.
pub async fn answer_comments(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(answer_id): Path<i64>,
) -> Result<Response, PageError> {
    let answer = get_active_answer(&state, answer_id)?;
    answer_comments_page(&state, user.as_ref(), &answer, "", &FormErrors::new())
}

fn render_edit_page(
    state: &AppState,
    user: &User,
    answer: &Answer,
    question: &Question,
    values: &AnswerFormValues,
    errors: &FormErrors,
    preview: Option<String>,
    selected_revision: i64,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let revisions = SqliteAnswerRepository::new(&mut conn).list_revisions(answer.id)?;
    drop(conn);

    let mut context = base_context("Edit Answer", Some(user));
    context.insert("question", question);
    context.insert("answer", answer);
    context.insert("form", values);
    context.insert("errors", errors);
    context.insert("preview", &preview);
    context.insert("revisions", &revisions);
    context.insert("selected_revision", &selected_revision);
    render(state, "edit_answer.html", &context)
}

/// Edit form, permission-gated like question editing.
pub async fn edit_answer_form(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(answer_id): Path<i64>,
) -> Result<Response, PageError> {
    let answer = get_active_answer(&state, answer_id)?;
    if !auth::can_edit_post(&user, answer.author_id, answer.wiki) {
        return Err(PageError::NotFound);
    }
    let question = get_active_question(&state, answer.question_id)?;

    let mut conn = state.db()?;
    let latest = SqliteAnswerRepository::new(&mut conn).latest_revision(answer_id)?;
    drop(conn);

    let selected = latest.revision;
    render_edit_page(
        &state,
        &user,
        &answer,
        &question,
        &AnswerFormValues::from_revision(&latest, answer.wiki),
        &FormErrors::new(),
        None,
        selected,
    )
}

/// Edit submission, including the revision selector.
pub async fn edit_answer_submit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(answer_id): Path<i64>,
    Form(form): Form<EditAnswerForm>,
) -> Result<Response, PageError> {
    let answer = get_active_answer(&state, answer_id)?;
    if !auth::can_edit_post(&user, answer.author_id, answer.wiki) {
        return Err(PageError::NotFound);
    }
    let question = get_active_question(&state, answer.question_id)?;

    if form.wants_revision_change() {
        let mut conn = state.db()?;
        let selected = match form.revision {
            Some(number) => {
                SqliteAnswerRepository::new(&mut conn).get_revision(answer_id, number)?
            }
            None => None,
        };
        drop(conn);
        let (values, selected_number) = match selected {
            Some(revision) => {
                let number = revision.revision;
                (AnswerFormValues::from_revision(&revision, answer.wiki), number)
            }
            None => (
                AnswerFormValues::from_edit_form(&form),
                form.revision.unwrap_or(1),
            ),
        };
        return render_edit_page(
            &state,
            &user,
            &answer,
            &question,
            &values,
            &FormErrors::new(),
            None,
            selected_number,
        );
    }

    let errors = form.validate();
    if errors.is_empty() && form.wants_submit() {
        let mut conn = state.db()?;
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        service.edit(
            user.id,
            answer_id,
            &EditAnswerInput {
                text: form.text.clone(),
                wiki: form.wiki_checked(),
                summary: form.summary.clone(),
            },
        )?;
        return Ok(Redirect::to(&question_url(answer.question_id)).into_response());
    }

    let preview = if errors.is_empty() && form.wants_preview() {
        Some(render_markdown(&form.text))
    } else {
        None
    };
    let latest_number = {
        let mut conn = state.db()?;
        SqliteAnswerRepository::new(&mut conn)
            .latest_revision(answer_id)?
            .revision
    };
    render_edit_page(
        &state,
        &user,
        &answer,
        &question,
        &AnswerFormValues::from_edit_form(&form),
        &errors,
        preview,
        form.revision.unwrap_or(latest_number),
    )
}

/// Revision history for an answer.
pub async fn answer_revisions(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(answer_id): Path<i64>,
) -> Result<Response, PageError> {
    let answer = get_active_answer(&state, answer_id)?;
    let question = get_active_question(&state, answer.question_id)?;

    let mut conn = state.db()?;
    let pages =
        AnswerService::new(SqliteAnswerRepository::new(&mut conn)).revision_pages(answer_id)?;
    let authors = revision_authors(
        &mut conn,
        pages.iter().map(|page| page.revision.author_id),
    )?;
    drop(conn);

    let entries: Vec<serde_json::Value> = pages
        .iter()
        .map(|page| {
            json!({
                "revision": page.revision,
                "html": page.html,
                "diff": page.diff,
                "author": authors
                    .get(&page.revision.author_id.to_string())
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        })
        .collect();

    let mut context = base_context("Answer Revisions", user.as_ref());
    context.insert("question", &question);
    context.insert("answer", &answer);
    context.insert("revisions", &entries);
    render(&state, "answer_revisions.html", &context)
}

/// Toggles the accepted mark; only the question's author may do so.
pub async fn accept_answer(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(answer_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let answer = get_active_answer(&state, answer_id)?;
    let question = get_active_question(&state, answer.question_id)?;
    if !auth::can_accept_answer(&user, question.author_id) {
        return Err(PageError::NotFound);
    }

    let mut conn = state.db()?;
    let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
    let accepted = service.toggle_accept(answer_id)?;
    drop(conn);

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true, "accepted": accepted})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question.id)).into_response())
    }
}
