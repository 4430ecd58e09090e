//! Login, logout and registration handlers.

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use curio_core::repo::user_repo::SqliteUserRepository;
use curio_core::service::user_service::{UserService, UserServiceError};
use uuid::Uuid;

use crate::error::PageError;
use crate::forms::{FormErrors, LoginForm, RegisterForm};
use crate::handlers::{base_context, render};
use crate::session::{MaybeUser, SESSION_COOKIE};
use crate::state::{AppState, SharedState};

fn session_cookie(token: Uuid) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

fn render_login(
    state: &AppState,
    username: &str,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context("Log in", None);
    context.insert("username", username);
    context.insert("errors", errors);
    render(state, "login.html", &context)
}

/// Login form.
pub async fn login_form(State(state): State<SharedState>) -> Result<Response, PageError> {
    render_login(&state, "", &FormErrors::new())
}

/// Verifies credentials and sets the session cookie.
pub async fn login_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let result = {
        let mut conn = state.db()?;
        let mut service = UserService::new(SqliteUserRepository::new(&mut conn));
        service.login(&form.username, &form.password)
    };

    match result {
        Ok((_user, token)) => {
            let jar = jar.add(session_cookie(token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(UserServiceError::InvalidCredentials) => {
            let mut errors = FormErrors::new();
            errors.insert(
                "username".to_string(),
                "Invalid username or password.".to_string(),
            );
            render_login(&state, &form.username, &errors)
        }
        Err(other) => Err(other.into()),
    }
}

/// Revokes the session and renders the logged-out page.
pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            let mut conn = state.db()?;
            let mut service = UserService::new(SqliteUserRepository::new(&mut conn));
            service.logout(token)?;
        }
    }

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    let context = base_context("Logged out", None);
    let page = render(&state, "logged_out.html", &context)?;
    Ok((jar, page).into_response())
}

fn render_register(
    state: &AppState,
    form: &RegisterForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = base_context("Register", None);
    context.insert("username", &form.username);
    context.insert("email", &form.email);
    context.insert("errors", errors);
    render(state, "register.html", &context)
}

/// Registration form.
pub async fn register_form(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_register(&state, &RegisterForm::default(), &FormErrors::new())
}

/// Creates the account and logs it straight in.
pub async fn register_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return render_register(&state, &form, &errors);
    }

    let result = {
        let mut conn = state.db()?;
        let mut service = UserService::new(SqliteUserRepository::new(&mut conn));
        service
            .register(&form.username, &form.email, &form.password)
            .map(|user| service.login(&user.username, &form.password))
    };

    match result {
        Ok(Ok((_user, token))) => {
            let jar = jar.add(session_cookie(token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(UserServiceError::UsernameTaken(username)) => {
            let mut errors = FormErrors::new();
            errors.insert(
                "username".to_string(),
                format!("The username `{username}` is already taken."),
            );
            render_register(&state, &form, &errors)
        }
        Ok(Err(err)) | Err(err) => Err(err.into()),
    }
}
