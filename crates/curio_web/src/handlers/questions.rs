//! Question list and lifecycle handlers.

use std::collections::BTreeMap;

use axum::extract::{Form, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use curio_core::auth;
use curio_core::markdown::render_markdown;
use curio_core::model::question::Question;
use curio_core::model::user::User;
use curio_core::repo::answer_repo::{AnswerRepository, AnswerSort, SqliteAnswerRepository};
use curio_core::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use curio_core::repo::question_repo::{
    QuestionListQuery, QuestionRepository, QuestionSort, SqliteQuestionRepository,
};
use curio_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use curio_core::repo::vote_repo::{SqliteVoteRepository, VoteRepository};
use curio_core::service::question_service::{
    AskQuestionInput, EditQuestionInput, QuestionService,
};
use curio_core::PostKind;

use crate::error::PageError;
use crate::forms::{
    AskQuestionForm, CloseQuestionForm, EditQuestionForm, FormErrors, QuestionFormValues,
    RetagQuestionForm, CLOSE_REASONS,
};
use crate::handlers::{base_context, question_url, render};
use crate::pagination::Paginator;
use crate::session::{is_ajax, CurrentUser, MaybeUser};
use crate::state::{AppState, SharedState};

/// Condensed front-page list size.
pub const INDEX_PAGE_SIZE: u32 = 50;
/// Answer page size on the question page.
pub const ANSWERS_PER_PAGE: u32 = 30;
pub const DEFAULT_QUESTIONS_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub revision: Option<i64>,
    pub showcomments: Option<String>,
}

/// Unknown sort ids fall back to the first view, like the original's
/// view lookup.
fn parse_question_sort(value: Option<&str>) -> (QuestionSort, &'static str) {
    match value {
        Some("active") => (QuestionSort::Active, "active"),
        Some("hottest") => (QuestionSort::Hottest, "hottest"),
        Some("votes") => (QuestionSort::Votes, "votes"),
        _ => (QuestionSort::Latest, "latest"),
    }
}

fn questions_per_page(user: Option<&User>) -> u32 {
    user.map_or(DEFAULT_QUESTIONS_PER_PAGE, |user| {
        user.questions_per_page.max(1)
    })
}

struct ListOptions {
    template: &'static str,
    title: String,
    tag: Option<String>,
    unanswered: bool,
    per_page: u32,
    page: Option<u64>,
    sort: Option<String>,
}

/// Question list generic view: sort selection, pagination, rendering.
fn question_list(
    state: &AppState,
    user: Option<&User>,
    options: ListOptions,
) -> Result<Response, PageError> {
    let (sort, sort_id) = parse_question_sort(options.sort.as_deref());
    let mut conn = state.db()?;
    let repo = SqliteQuestionRepository::new(&mut conn);

    let query = QuestionListQuery {
        sort,
        tag: options.tag.clone(),
        unanswered: options.unanswered,
        author: None,
        limit: options.per_page,
        offset: 0,
    };
    let count = repo.count_questions(&query)?;
    let paginator = Paginator::new(count, options.per_page);
    let page = paginator.page(options.page);
    let questions = repo.list_questions(&QuestionListQuery {
        offset: page.offset(),
        ..query
    })?;
    drop(conn);

    let mut context = base_context(&options.title, user);
    context.insert("questions", &questions);
    context.insert("page", &page);
    context.insert("current_sort", sort_id);
    context.insert("tag", &options.tag);
    render(state, options.template, &context)
}

/// A condensed version of the main question list.
pub async fn index(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    question_list(
        &state,
        user.as_ref(),
        ListOptions {
            template: "index.html",
            title: "Questions".to_string(),
            tag: None,
            unanswered: false,
            per_page: INDEX_PAGE_SIZE,
            page: Some(1),
            sort: params.sort,
        },
    )
}

/// All questions list.
pub async fn questions(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    question_list(
        &state,
        user.as_ref(),
        ListOptions {
            template: "questions.html",
            title: "Questions".to_string(),
            tag: None,
            unanswered: false,
            per_page: questions_per_page(user.as_ref()),
            page: params.page,
            sort: params.sort,
        },
    )
}

/// Unanswered questions list.
pub async fn unanswered(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    question_list(
        &state,
        user.as_ref(),
        ListOptions {
            template: "unanswered.html",
            title: "Unanswered Questions".to_string(),
            tag: None,
            unanswered: true,
            per_page: questions_per_page(user.as_ref()),
            page: params.page,
            sort: params.sort,
        },
    )
}

/// Question list restricted to one tag, shared with the tag detail page.
pub(crate) fn tagged_question_list(
    state: &AppState,
    user: Option<&User>,
    tag_name: &str,
    per_page: u32,
    params: ListParams,
) -> Result<Response, PageError> {
    question_list(
        state,
        user,
        ListOptions {
            template: "questions.html",
            title: format!("Questions tagged [{tag_name}]"),
            tag: Some(tag_name.to_string()),
            unanswered: false,
            per_page,
            page: params.page,
            sort: params.sort,
        },
    )
}

fn get_active_question(state: &AppState, question_id: i64) -> Result<Question, PageError> {
    let mut conn = state.db()?;
    SqliteQuestionRepository::new(&mut conn)
        .get_question(question_id)?
        .filter(|question| !question.deleted)
        .ok_or(PageError::NotFound)
}

/// Displays a question with its paginated answers and vote state.
pub async fn question(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(question_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;

    if params.showcomments.is_some() {
        return question_comments_page(&state, user.as_ref(), &question, "", &FormErrors::new());
    }

    let (answer_sort, answer_sort_id) = match params.sort.as_deref() {
        Some("newest") => (AnswerSort::Newest, "newest"),
        Some("oldest") => (AnswerSort::Oldest, "oldest"),
        _ => (AnswerSort::Votes, "votes"),
    };

    // The denormalized count spares a COUNT() per page view.
    let paginator = Paginator::new(question.answer_count.max(0) as u64, ANSWERS_PER_PAGE);
    let page = paginator.page(params.page);

    let mut conn = state.db()?;
    let answers = SqliteAnswerRepository::new(&mut conn).list_for_question(
        question.id,
        answer_sort,
        ANSWERS_PER_PAGE,
        page.offset(),
    )?;

    let (question_vote, answer_votes) = match user.as_ref() {
        Some(user) => {
            let vote_repo = SqliteVoteRepository::new(&mut conn);
            let question_vote = vote_repo.get_vote(PostKind::Question, question.id, user.id)?;
            let votes: BTreeMap<i64, &'static str> = vote_repo
                .votes_on_answers(question.id, user.id)?
                .into_iter()
                .map(|(answer_id, vote)| {
                    (answer_id, match vote {
                        curio_core::VoteKind::Up => "up",
                        curio_core::VoteKind::Down => "down",
                    })
                })
                .collect();
            (question_vote, votes)
        }
        None => (None, BTreeMap::new()),
    };

    // Each answer entry carries the current user's vote on it, so the
    // template never has to index a lookup table.
    let answer_entries: Vec<serde_json::Value> = answers
        .iter()
        .map(|answer| {
            json!({
                "answer": answer,
                "vote": answer_votes.get(&answer.id).copied().unwrap_or(""),
            })
        })
        .collect();

    let favourite = match user.as_ref() {
        Some(user) => {
            SqliteQuestionRepository::new(&mut conn).is_favourite(question.id, user.id)?
        }
        None => false,
    };
    let tags = SqliteQuestionRepository::new(&mut conn).tags_for_question(question.id)?;
    let author = SqliteUserRepository::new(&mut conn)
        .get_user(question.author_id)?
        .ok_or_else(|| PageError::Internal("question author row missing".to_string()))?;
    drop(conn);

    let title = if question.closed {
        format!("{} [closed]", question.title)
    } else {
        question.title.clone()
    };

    let mut context = base_context(&title, user.as_ref());
    context.insert("question", &question);
    context.insert("question_author", &author);
    context.insert("question_vote", &question_vote);
    context.insert("favourite", &favourite);
    context.insert("answers", &answer_entries);
    context.insert("page", &page);
    context.insert("answer_sort", answer_sort_id);
    context.insert("tags", &tags);
    context.insert("show_comments", &false);
    context.insert("comments", &Vec::<()>::new());
    context.insert("comment_value", "");
    context.insert("comment_errors", &FormErrors::new());
    render(&state, "question.html", &context)
}

/// Fallback page showing a question plus its comments and comment form.
pub(crate) fn question_comments_page(
    state: &AppState,
    user: Option<&User>,
    question: &Question,
    comment_value: &str,
    comment_errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let comments =
        SqliteCommentRepository::new(&mut conn).list_for_post(PostKind::Question, question.id)?;
    let tags = SqliteQuestionRepository::new(&mut conn).tags_for_question(question.id)?;
    let author = SqliteUserRepository::new(&mut conn)
        .get_user(question.author_id)?
        .ok_or_else(|| PageError::Internal("question author row missing".to_string()))?;
    drop(conn);

    let title = format!("Comments on {}", question.title);
    let mut context = base_context(&title, user);
    context.insert("question", question);
    context.insert("question_author", &author);
    context.insert("tags", &tags);
    context.insert("show_comments", &true);
    context.insert("comments", &comments);
    context.insert("comment_value", comment_value);
    context.insert("comment_errors", comment_errors);
    context.insert("question_vote", &None::<String>);
    context.insert("favourite", &false);
    context.insert("answers", &Vec::<serde_json::Value>::new());
    context.insert("answer_sort", "votes");
    context.insert("page", &Paginator::new(0, 1).page(None));
    render(state, "question.html", &context)
}

fn render_ask_page(
    state: &AppState,
    user: Option<&User>,
    values: &QuestionFormValues,
    errors: &FormErrors,
    preview: Option<String>,
) -> Result<Response, PageError> {
    let mut context = base_context("Ask a Question", user);
    context.insert("form", values);
    context.insert("errors", errors);
    context.insert("preview", &preview);
    render(state, "ask_question.html", &context)
}

/// Ask form.
pub async fn ask_question_form(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, PageError> {
    render_ask_page(
        &state,
        user.as_ref(),
        &QuestionFormValues::default(),
        &FormErrors::new(),
        None,
    )
}

/// Ask submission: preview re-renders, submit creates and redirects.
pub async fn ask_question_submit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<AskQuestionForm>,
) -> Result<Response, PageError> {
    let errors = form.validate();
    if errors.is_empty() && form.wants_submit() {
        let mut conn = state.db()?;
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        let question = service.ask(
            user.id,
            &AskQuestionInput {
                title: form.title.trim().to_string(),
                tagnames: form.tags.clone(),
                text: form.text.clone(),
                wiki: form.wiki_checked(),
            },
        )?;
        return Ok(Redirect::to(&question_url(question.id)).into_response());
    }

    let preview = if errors.is_empty() && form.wants_preview() {
        Some(render_markdown(&form.text))
    } else {
        None
    };
    render_ask_page(
        &state,
        Some(&user),
        &QuestionFormValues::from_ask_form(&form),
        &errors,
        preview,
    )
}

fn render_edit_page(
    state: &AppState,
    user: &User,
    question: &Question,
    values: &QuestionFormValues,
    errors: &FormErrors,
    preview: Option<String>,
    selected_revision: i64,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let revisions = SqliteQuestionRepository::new(&mut conn).list_revisions(question.id)?;
    drop(conn);

    let mut context = base_context("Edit Question", Some(user));
    context.insert("question", question);
    context.insert("form", values);
    context.insert("errors", errors);
    context.insert("preview", &preview);
    context.insert("revisions", &revisions);
    context.insert("selected_revision", &selected_revision);
    render(state, "edit_question.html", &context)
}

fn render_retag_page(
    state: &AppState,
    user: &User,
    question: &Question,
    tags: &str,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context("Edit Tags", Some(user));
    context.insert("question", question);
    context.insert("tags_value", tags);
    context.insert("errors", errors);
    render(state, "retag_question.html", &context)
}

/// Entry point for editing: full edit, retag-only, or 404, depending on
/// the user's standing.
pub async fn edit_question_form(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;

    if auth::can_edit_post(&user, question.author_id, question.wiki) {
        let mut conn = state.db()?;
        let repo = SqliteQuestionRepository::new(&mut conn);
        let latest = repo.latest_revision(question_id)?;
        let (values, selected) = match params.revision {
            Some(number) => match repo.get_revision(question_id, number)? {
                Some(revision) => (
                    QuestionFormValues::from_revision(&revision, question.wiki),
                    revision.revision,
                ),
                None => (
                    QuestionFormValues::from_revision(&latest, question.wiki),
                    latest.revision,
                ),
            },
            None => (
                QuestionFormValues::from_revision(&latest, question.wiki),
                latest.revision,
            ),
        };
        drop(conn);
        render_edit_page(
            &state,
            &user,
            &question,
            &values,
            &FormErrors::new(),
            None,
            selected,
        )
    } else if auth::can_retag_questions(&user) {
        render_retag_page(&state, &user, &question, &question.tagnames, &FormErrors::new())
    } else {
        Err(PageError::NotFound)
    }
}

/// Edit submission, including the revision selector and the retag-only
/// variant for lower-reputation users.
pub async fn edit_question_submit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    Form(form): Form<EditQuestionForm>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;

    if auth::can_edit_post(&user, question.author_id, question.wiki) {
        if form.wants_revision_change() {
            // Load the chosen revision into the form; an invalid selector
            // keeps the user's posted values.
            let mut conn = state.db()?;
            let selected = match form.revision {
                Some(number) => {
                    SqliteQuestionRepository::new(&mut conn).get_revision(question_id, number)?
                }
                None => None,
            };
            drop(conn);
            let (values, selected_number) = match selected {
                Some(revision) => {
                    let number = revision.revision;
                    (QuestionFormValues::from_revision(&revision, question.wiki), number)
                }
                None => (
                    QuestionFormValues::from_edit_form(&form),
                    form.revision.unwrap_or(1),
                ),
            };
            return render_edit_page(
                &state,
                &user,
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
            let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
            service.edit(
                user.id,
                question_id,
                &EditQuestionInput {
                    title: form.title.trim().to_string(),
                    tagnames: form.tags.clone(),
                    text: form.text.clone(),
                    wiki: form.wiki_checked(),
                    summary: form.summary.clone(),
                },
            )?;
            return Ok(Redirect::to(&question_url(question_id)).into_response());
        }

        let preview = if errors.is_empty() && form.wants_preview() {
            Some(render_markdown(&form.text))
        } else {
            None
        };
        let latest_number = {
            let mut conn = state.db()?;
            let latest = SqliteQuestionRepository::new(&mut conn).latest_revision(question_id)?;
            latest.revision
        };
        render_edit_page(
            &state,
            &user,
            &question,
            &QuestionFormValues::from_edit_form(&form),
            &errors,
            preview,
            form.revision.unwrap_or(latest_number),
        )
    } else if auth::can_retag_questions(&user) {
        let errors = RetagQuestionForm {
            tags: form.tags.clone(),
        }
        .validate();
        if !errors.is_empty() {
            return render_retag_page(&state, &user, &question, &form.tags, &errors);
        }

        let mut conn = state.db()?;
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service.retag(user.id, question_id, &form.tags)?;
        Ok(Redirect::to(&question_url(question_id)).into_response())
    } else {
        Err(PageError::NotFound)
    }
}

/// Revision history for a question.
pub async fn question_revisions(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(question_id): Path<i64>,
) -> Result<Response, PageError> {
    let question = get_active_question(&state, question_id)?;

    let mut conn = state.db()?;
    let pages = QuestionService::new(SqliteQuestionRepository::new(&mut conn))
        .revision_pages(question_id)?;
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

    let mut context = base_context("Question Revisions", user.as_ref());
    context.insert("question", &question);
    context.insert("revisions", &entries);
    render(&state, "question_revisions.html", &context)
}

/// Username lookup for revision lists, keyed by stringified user id.
pub(crate) fn revision_authors(
    conn: &mut rusqlite::Connection,
    author_ids: impl Iterator<Item = i64>,
) -> Result<BTreeMap<String, String>, PageError> {
    let repo = SqliteUserRepository::new(conn);
    let mut authors = BTreeMap::new();
    for author_id in author_ids {
        let key = author_id.to_string();
        if authors.contains_key(&key) {
            continue;
        }
        if let Some(author) = repo.get_user(author_id)? {
            authors.insert(key, author.username);
        }
    }
    Ok(authors)
}

/// Closes or reopens a question based on its current closed state.
pub async fn close_question_form(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    if !auth::can_close_question(&user) {
        return Err(PageError::NotFound);
    }
    if is_ajax(&headers) {
        // AJAX clients only ever POST here.
        return Err(PageError::NotFound);
    }
    let question = get_active_question(&state, question_id)?;

    if question.closed {
        let mut context = base_context("Reopen Question", Some(&user));
        context.insert("question", &question);
        render(&state, "reopen_question.html", &context)
    } else {
        let mut context = base_context("Close Question", Some(&user));
        context.insert("question", &question);
        context.insert("reasons", &CLOSE_REASONS);
        context.insert("errors", &FormErrors::new());
        render(&state, "close_question.html", &context)
    }
}

pub async fn close_question_submit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<CloseQuestionForm>,
) -> Result<Response, PageError> {
    if !auth::can_close_question(&user) {
        return Err(PageError::NotFound);
    }
    let question = get_active_question(&state, question_id)?;

    if question.closed {
        if !form.wants_reopen() {
            return Err(PageError::NotFound);
        }
        let mut conn = state.db()?;
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service.reopen(question_id)?;
        drop(conn);
        return if is_ajax(&headers) {
            Ok(Json(json!({"success": true})).into_response())
        } else {
            Ok(Redirect::to(&question_url(question_id)).into_response())
        };
    }

    if !form.wants_close() {
        return Err(PageError::NotFound);
    }

    let errors = form.validate();
    if !errors.is_empty() {
        return if is_ajax(&headers) {
            Ok(Json(json!({"success": false, "errors": errors})).into_response())
        } else {
            let mut context = base_context("Close Question", Some(&user));
            context.insert("question", &question);
            context.insert("reasons", &CLOSE_REASONS);
            context.insert("errors", &errors);
            render(&state, "close_question.html", &context)
        };
    }

    let mut conn = state.db()?;
    let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    service.close(user.id, question_id, &form.reason)?;
    drop(conn);

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question_id)).into_response())
    }
}

/// Adds or removes a favourite; POST only, no confirmation page.
pub async fn favourite_question(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    let favourited = service.toggle_favourite(user.id, question_id)?;
    drop(conn);

    if is_ajax(&headers) {
        Ok(Json(json!({"success": true, "favourited": favourited})).into_response())
    } else {
        Ok(Redirect::to(&question_url(question_id)).into_response())
    }
}
