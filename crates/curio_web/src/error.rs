//! Request-level error type and its HTTP mapping.
//!
//! Missing and forbidden objects both surface as 404, matching the
//! original handlers; everything unexpected is a logged 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use thiserror::Error;

use curio_core::service::answer_service::AnswerServiceError;
use curio_core::service::comment_service::CommentServiceError;
use curio_core::service::question_service::QuestionServiceError;
use curio_core::service::user_service::UserServiceError;
use curio_core::service::vote_service::VoteServiceError;
use curio_core::{RepoError, SearchError};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("not found")]
    NotFound,
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Template(_) | Self::Internal(_) => {
                error!("event=request_error module=web status=error error={self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

impl From<RepoError> for PageError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { .. } => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<QuestionServiceError> for PageError {
    fn from(value: QuestionServiceError) -> Self {
        match value {
            QuestionServiceError::QuestionNotFound(_)
            | QuestionServiceError::RevisionNotFound { .. }
            | QuestionServiceError::AlreadyClosed(_)
            | QuestionServiceError::NotClosed(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AnswerServiceError> for PageError {
    fn from(value: AnswerServiceError) -> Self {
        match value {
            AnswerServiceError::AnswerNotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CommentServiceError> for PageError {
    fn from(value: CommentServiceError) -> Self {
        match value {
            CommentServiceError::CommentNotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<VoteServiceError> for PageError {
    fn from(value: VoteServiceError) -> Self {
        match value {
            // Self-votes and votes on locked posts 404 like every other
            // disallowed action.
            VoteServiceError::OwnPost | VoteServiceError::PostNotVotable => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(value: UserServiceError) -> Self {
        match value {
            UserServiceError::UserNotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SearchError> for PageError {
    fn from(value: SearchError) -> Self {
        Self::Internal(value.to_string())
    }
}
