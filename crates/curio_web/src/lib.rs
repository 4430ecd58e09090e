//! HTTP surface of the Curio Q&A platform.
//!
//! Thin axum handlers over `curio_core`: each one does a permission
//! check, form validation, a handful of repository/service calls and a
//! template render, mirroring the request/response cycle of a classic
//! server-rendered Q&A site.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::CorsLayer;

pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod pagination;
pub mod session;
pub mod state;
pub mod templates;

use config::Config;
use handlers::{accounts, answers, badges, comments, questions, search, tags_users, votes};
use state::SharedState;

/// Builds the full route table over shared state.
pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(questions::index))
        .route("/questions", get(questions::questions))
        .route("/questions/unanswered", get(questions::unanswered))
        .route(
            "/questions/ask",
            get(questions::ask_question_form).post(questions::ask_question_submit),
        )
        .route("/questions/:id", get(questions::question))
        .route(
            "/questions/:id/edit",
            get(questions::edit_question_form).post(questions::edit_question_submit),
        )
        .route(
            "/questions/:id/close",
            get(questions::close_question_form).post(questions::close_question_submit),
        )
        .route("/questions/:id/favourite", post(questions::favourite_question))
        .route("/questions/:id/revisions", get(questions::question_revisions))
        .route("/questions/:id/vote", post(votes::vote_question))
        .route(
            "/questions/:id/answer",
            get(answers::add_answer_form).post(answers::add_answer_submit),
        )
        .route(
            "/questions/:id/comments",
            post(comments::add_question_comment),
        )
        .route("/answers/:id", get(answers::answer_comments))
        .route(
            "/answers/:id/edit",
            get(answers::edit_answer_form).post(answers::edit_answer_submit),
        )
        .route("/answers/:id/revisions", get(answers::answer_revisions))
        .route("/answers/:id/vote", post(votes::vote_answer))
        .route("/answers/:id/accept", post(answers::accept_answer))
        .route("/answers/:id/comments", post(comments::add_answer_comment))
        .route("/comments/:id/delete", post(comments::delete_comment))
        .route("/tags", get(tags_users::tags))
        .route("/tags/:name", get(tags_users::tag))
        .route("/users", get(tags_users::users))
        .route("/users/:id", get(tags_users::user))
        .route("/badges", get(badges::badges))
        .route("/badges/:id", get(badges::badge))
        .route("/search", get(search::search))
        .route(
            "/login",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route("/logout", get(accounts::logout))
        .route(
            "/register",
            get(accounts::register_form).post(accounts::register_submit),
        )
        .layer(cors)
        .with_state(state)
}

/// Loads configuration, initializes logging and state, and serves until
/// a shutdown signal arrives.
pub async fn start_server() {
    let config = Config::load();
    if let Err(err) = curio_core::init_logging(&config.log_level, &config.log_dir) {
        eprintln!("logging disabled: {err}");
    }

    info!("event=server_init module=web status=start");
    let state = match state::AppState::new(config) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to initialize: {err}");
            return;
        }
    };

    let address = format!("0.0.0.0:{}", state.config.port);
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to bind {address}: {err}");
            return;
        }
    };
    info!("event=server_init module=web status=ok address={address}");

    if let Err(err) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("server error: {err}");
    }

    info!("event=server_stop module=web status=ok");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("event=server_stop module=web status=start signal=interrupt");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=server_stop module=web status=start signal=terminate");
            }
            Err(err) => {
                eprintln!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
