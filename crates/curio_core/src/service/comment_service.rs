//! Comment use-case service.
//!
//! The target post's existence is checked by the caller (the view layer
//! resolves posts before dispatching, and 404s there); this service owns
//! content normalization and persistence.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::clock::now_millis;
use crate::model::comment::{Comment, CommentId};
use crate::model::post::PostKind;
use crate::model::user::UserId;
use crate::repo::comment_repo::{CommentRepository, NewComment};
use crate::repo::RepoError;

#[derive(Debug)]
pub enum CommentServiceError {
    EmptyComment,
    CommentNotFound(CommentId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for CommentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyComment => write!(f, "comment text is empty"),
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent comment state: {details}"),
        }
    }
}

impl Error for CommentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CommentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "comment",
                id,
            } => Self::CommentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Comment service facade over the repository implementation.
pub struct CommentService<R: CommentRepository> {
    repo: R,
}

impl<R: CommentRepository> CommentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add_comment(
        &mut self,
        author: UserId,
        post_kind: PostKind,
        post_id: i64,
        body: &str,
    ) -> Result<Comment, CommentServiceError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(CommentServiceError::EmptyComment);
        }

        let comment_id = self.repo.create_comment(&NewComment {
            post_kind,
            post_id,
            author_id: author,
            added_at: now_millis(),
            comment: body.to_string(),
        })?;

        info!(
            "event=comment_add module=service status=ok post_kind={} post_id={post_id} comment_id={comment_id}",
            post_kind.as_db()
        );
        self.repo
            .get_comment(comment_id)?
            .ok_or(CommentServiceError::InconsistentState(
                "written comment not found in read-back",
            ))
    }

    pub fn delete_comment(&mut self, id: CommentId) -> Result<(), CommentServiceError> {
        self.repo.delete_comment(id)?;
        info!("event=comment_delete module=service status=ok comment_id={id}");
        Ok(())
    }
}
