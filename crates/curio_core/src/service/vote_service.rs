//! Vote use-case service.
//!
//! Eligibility by reputation is a view-layer concern; this service owns
//! the rules bound to the post itself: no self-voting, no voting on
//! deleted or locked posts, and the reputation price list.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::post::PostKind;
use crate::model::user::UserId;
use crate::model::vote::VoteKind;
use crate::repo::vote_repo::{ReputationDeltas, VoteOutcome, VoteRepository};
use crate::repo::RepoError;

/// Reputation adjustments for vote changes.
pub const REPUTATION_DELTAS: ReputationDeltas = ReputationDeltas {
    up_author: 10,
    down_author: 2,
    down_voter: 1,
};

#[derive(Debug)]
pub enum VoteServiceError {
    /// Users cannot vote on their own posts.
    OwnPost,
    /// Deleted and locked posts do not accept votes.
    PostNotVotable,
    Repo(RepoError),
}

impl Display for VoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnPost => write!(f, "users cannot vote on their own posts"),
            Self::PostNotVotable => write!(f, "post does not accept votes"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VoteServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Vote service facade over the repository implementation.
pub struct VoteService<R: VoteRepository> {
    repo: R,
}

impl<R: VoteRepository> VoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Casts a vote with toggle semantics. The caller resolves the post
    /// and passes its author and votable state.
    pub fn cast(
        &mut self,
        voter: UserId,
        post_author: UserId,
        post_votable: bool,
        kind: PostKind,
        post_id: i64,
        direction: VoteKind,
    ) -> Result<VoteOutcome, VoteServiceError> {
        if voter == post_author {
            return Err(VoteServiceError::OwnPost);
        }
        if !post_votable {
            return Err(VoteServiceError::PostNotVotable);
        }

        let outcome = self
            .repo
            .cast_vote(kind, post_id, voter, direction, &REPUTATION_DELTAS)?;
        info!(
            "event=vote_cast module=service status=ok post_kind={} post_id={post_id} action={:?} score={}",
            kind.as_db(),
            outcome.action,
            outcome.score
        );
        Ok(outcome)
    }
}
