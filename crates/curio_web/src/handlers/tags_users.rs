//! Tag and user list/detail handlers.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use curio_core::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use curio_core::repo::question_repo::{
    QuestionListQuery, QuestionRepository, QuestionSort, SqliteQuestionRepository,
};
use curio_core::repo::tag_repo::{SqliteTagRepository, TagListQuery, TagRepository, TagSort};
use curio_core::repo::user_repo::{
    SqliteUserRepository, UserListQuery, UserRepository, UserSort,
};

use crate::error::PageError;
use crate::handlers::questions::ListParams;
use crate::handlers::{base_context, render};
use crate::pagination::Paginator;
use crate::session::MaybeUser;
use crate::state::SharedState;

pub const TAGS_PER_PAGE: u32 = 50;
pub const USERS_PER_PAGE: u32 = 28;
const PROFILE_LIST_SIZE: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub filter: Option<String>,
}

/// Searchable tag list.
pub async fn tags(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<FilterParams>,
) -> Result<Response, PageError> {
    let (sort, sort_id) = match params.sort.as_deref() {
        Some("name") => (TagSort::Name, "name"),
        _ => (TagSort::Popular, "popular"),
    };
    let filter = params
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    let conn = state.db()?;
    let repo = SqliteTagRepository::new(&conn);
    let count = repo.count_tags(filter.as_deref())?;
    let paginator = Paginator::new(count, TAGS_PER_PAGE);
    let page = paginator.page(params.page);
    let tags = repo.list_tags(&TagListQuery {
        sort,
        filter: filter.clone(),
        limit: TAGS_PER_PAGE,
        offset: page.offset(),
    })?;
    drop(conn);

    let mut context = base_context("Tags", user.as_ref());
    context.insert("tags", &tags);
    context.insert("page", &page);
    context.insert("current_sort", sort_id);
    context.insert("filter", filter.as_deref().unwrap_or(""));
    render(&state, "tags.html", &context)
}

/// Questions carrying one tag, rendered through the question list page.
pub async fn tag(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(tag_name): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Response, PageError> {
    let tag = {
        let conn = state.db()?;
        SqliteTagRepository::new(&conn)
            .get_tag(&tag_name)?
            .ok_or(PageError::NotFound)?
    };

    let per_page = user
        .as_ref()
        .map_or(super::questions::DEFAULT_QUESTIONS_PER_PAGE, |user| {
            user.questions_per_page.max(1)
        });
    super::questions::tagged_question_list(&state, user.as_ref(), &tag.name, per_page, params)
}

/// Searchable user list.
pub async fn users(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<FilterParams>,
) -> Result<Response, PageError> {
    let (sort, sort_id) = match params.sort.as_deref() {
        Some("newest") => (UserSort::Newest, "newest"),
        Some("oldest") => (UserSort::Oldest, "oldest"),
        Some("name") => (UserSort::Name, "name"),
        _ => (UserSort::Reputation, "reputation"),
    };
    let filter = params
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    let mut conn = state.db()?;
    let repo = SqliteUserRepository::new(&mut conn);
    let count = repo.count_users(filter.as_deref())?;
    let paginator = Paginator::new(count, USERS_PER_PAGE);
    let page = paginator.page(params.page);
    let users = repo.list_users(&UserListQuery {
        sort,
        filter: filter.clone(),
        limit: USERS_PER_PAGE,
        offset: page.offset(),
    })?;
    drop(conn);

    let mut context = base_context("Users", user.as_ref());
    context.insert("users", &users);
    context.insert("page", &page);
    context.insert("current_sort", sort_id);
    context.insert("filter", filter.as_deref().unwrap_or(""));
    render(&state, "users.html", &context)
}

/// Displays a user and their recent activity.
pub async fn user(
    State(state): State<SharedState>,
    MaybeUser(current): MaybeUser,
    Path(user_id): Path<i64>,
) -> Result<Response, PageError> {
    let mut conn = state.db()?;
    let profile = SqliteUserRepository::new(&mut conn)
        .get_user(user_id)?
        .ok_or(PageError::NotFound)?;

    let questions = SqliteQuestionRepository::new(&mut conn).list_questions(&QuestionListQuery {
        sort: QuestionSort::Latest,
        tag: None,
        unanswered: false,
        author: Some(profile.id),
        limit: PROFILE_LIST_SIZE,
        offset: 0,
    })?;
    let answers =
        SqliteAnswerRepository::new(&mut conn).list_recent_by_user(profile.id, PROFILE_LIST_SIZE)?;
    drop(conn);

    let mut context = base_context(&profile.username.clone(), current.as_ref());
    context.insert("profile", &profile);
    context.insert("questions", &questions);
    context.insert("answers", &answers);
    render(&state, "user.html", &context)
}
