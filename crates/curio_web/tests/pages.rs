use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use curio_core::db::open_db_in_memory;
use curio_core::model::user::User;
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use curio_core::service::question_service::{AskQuestionInput, QuestionService};
use curio_core::service::user_service::UserService;
use curio_core::Question;

use curio_web::app;
use curio_web::config::Config;
use curio_web::state::{AppState, SharedState};

fn test_state() -> SharedState {
    let conn = open_db_in_memory().unwrap();
    let config = Config {
        port: 0,
        database_path: ":memory:".to_string(),
        log_dir: "logs".to_string(),
        log_level: "info".to_string(),
    };
    AppState::with_connection(config, conn).unwrap()
}

fn seed_user(state: &SharedState, username: &str) -> User {
    let mut conn = state.db().unwrap();
    let mut service = UserService::new(SqliteUserRepository::new(&mut conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn seed_question(state: &SharedState, author: i64, title: &str) -> Question {
    let mut conn = state.db().unwrap();
    let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    service
        .ask(
            author,
            &AskQuestionInput {
                title: title.to_string(),
                tagnames: "rust".to_string(),
                text: "A body that explains the problem.".to_string(),
                wiki: false,
            },
        )
        .unwrap()
}

fn session_for(state: &SharedState, user: &User) -> String {
    let mut conn = state.db().unwrap();
    let token = SqliteUserRepository::new(&mut conn)
        .create_session(user.id, 0)
        .unwrap();
    format!("curio_session={token}")
}

fn set_reputation(state: &SharedState, user: i64, reputation: i64) {
    let conn = state.db().unwrap();
    conn.execute(
        "UPDATE users SET reputation = ?2 WHERE id = ?1;",
        rusqlite::params![user, reputation],
    )
    .unwrap();
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str, ajax: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    if ajax {
        builder = builder.header("x-requested-with", "XMLHttpRequest");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn index_renders_seeded_questions() {
    let state = test_state();
    let user = seed_user(&state, "asker");
    seed_question(&state, user.id, "How do I parse a query string?");

    let response = app(state).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("How do I parse a query string?"));
    assert!(body.contains("asker"));
}

#[tokio::test]
async fn unknown_question_is_404() {
    let state = test_state();
    let response = app(state)
        .oneshot(get("/questions/4242"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn question_page_shows_answers_and_tags() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");

    let answerer = seed_user(&state, "answerer");
    let cookie = session_for(&state, &answerer);
    let response = app(state.clone())
        .oneshot(post_form(
            &format!("/questions/{}/answer", question.id),
            Some(&cookie),
            "text=An+answer+body&submit=submit",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app(state.clone())
        .oneshot(get(&format!("/questions/{}", question.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("An answer body"));
    assert!(body.contains("/tags/rust"));

    let mut conn = state.db().unwrap();
    let question = SqliteQuestionRepository::new(&mut conn)
        .get_question(question.id)
        .unwrap()
        .unwrap();
    assert_eq!(question.answer_count, 1);
}

#[tokio::test]
async fn anonymous_posting_redirects_to_login() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/answer", question.id),
            None,
            "text=hello&submit=submit",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn ajax_vote_returns_new_score() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let voter = seed_user(&state, "voter");
    set_reputation(&state, voter.id, 200);
    let cookie = session_for(&state, &voter);

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/vote", question.id),
            Some(&cookie),
            "type=up",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["score"], 1);
}

#[tokio::test]
async fn low_reputation_votes_are_rejected() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let voter = seed_user(&state, "voter");
    let cookie = session_for(&state, &voter);

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/vote", question.id),
            Some(&cookie),
            "type=up",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_ask_submission_rerenders_with_errors() {
    let state = test_state();
    let user = seed_user(&state, "asker");
    let cookie = session_for(&state, &user);

    let response = app(state)
        .oneshot(post_form(
            "/questions/ask",
            Some(&cookie),
            "title=short&tags=rust&text=body&submit=submit",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Titles must be at least"));
    assert!(body.contains("value=\"short\""));
}

#[tokio::test]
async fn close_requires_reputation() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let lowrep = seed_user(&state, "lowrep");
    let cookie = session_for(&state, &lowrep);

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/close", question.id),
            Some(&cookie),
            "reason=off+topic&close=close",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moderator_close_then_reopen_roundtrip() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let moderator = seed_user(&state, "moderator");
    set_reputation(&state, moderator.id, 5_000);
    let cookie = session_for(&state, &moderator);

    let response = app(state.clone())
        .oneshot(post_form(
            &format!("/questions/{}/close", question.id),
            Some(&cookie),
            "reason=off+topic&close=close",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("\"success\":true"));

    let response = app(state.clone())
        .oneshot(get(&format!("/questions/{}", question.id)))
        .await
        .unwrap();
    let body = body_text(response).await;
    assert!(body.contains("[closed]"));

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/close", question.id),
            Some(&cookie),
            "reopen=reopen",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn search_returns_matching_question() {
    let state = test_state();
    let user = seed_user(&state, "asker");
    seed_question(&state, user.id, "Unusual keyword zanzibar question");

    let response = app(state)
        .oneshot(get("/search?q=zanzibar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Unusual keyword zanzibar question"));
}

#[tokio::test]
async fn tags_and_users_pages_render() {
    let state = test_state();
    let user = seed_user(&state, "asker");
    seed_question(&state, user.id, "A question about lifetimes?");

    let response = app(state.clone()).oneshot(get("/tags")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("rust"));

    let response = app(state.clone()).oneshot(get("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("asker"));

    let response = app(state).oneshot(get("/badges")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Student"));
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let state = test_state();
    seed_user(&state, "alice");

    let response = app(state)
        .oneshot(post_form(
            "/login",
            None,
            "username=alice&password=password",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("curio_session="));
}

#[tokio::test]
async fn comment_validation_errors_return_json_for_ajax() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let cookie = session_for(&state, &asker);

    let response = app(state)
        .oneshot(post_form(
            &format!("/questions/{}/comments", question.id),
            Some(&cookie),
            "comment=short",
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["success"], false);
    assert!(parsed["errors"]["comment"].is_string());
}

#[tokio::test]
async fn question_revisions_show_diffs_after_edit() {
    let state = test_state();
    let asker = seed_user(&state, "asker");
    let question = seed_question(&state, asker.id, "A question about lifetimes?");
    let cookie = session_for(&state, &asker);

    let response = app(state.clone())
        .oneshot(post_form(
            &format!("/questions/{}/edit", question.id),
            Some(&cookie),
            "title=A+question+about+lifetimes%3F&tags=rust&text=A+changed+body+entirely.&submit=submit",
            false,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app(state)
        .oneshot(get(&format!("/questions/{}/revisions", question.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("edited body"));
    assert!(body.contains("<ins>"));
}
