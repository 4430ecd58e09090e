//! Vote repository: toggle semantics, score and reputation maintenance.
//!
//! # Responsibility
//! - Persist the one-vote-per-user-per-post row.
//! - Apply the matching score delta to the post and reputation deltas to
//!   the involved users, all inside one transaction.
//!
//! # Invariants
//! - Casting the same direction twice removes the vote; the opposite
//!   direction replaces it.
//! - Reputation never drops below 1.

use rusqlite::{params, Connection, TransactionBehavior};

use crate::model::post::PostKind;
use crate::model::user::UserId;
use crate::model::vote::VoteKind;
use crate::repo::{RepoError, RepoResult};

/// Reputation adjustments applied when votes change; all values are
/// magnitudes, the repository picks the sign.
#[derive(Debug, Clone, Copy)]
pub struct ReputationDeltas {
    /// Gained by the post author per upvote.
    pub up_author: i64,
    /// Lost by the post author per downvote.
    pub down_author: i64,
    /// Lost by the voter for casting a downvote.
    pub down_voter: i64,
}

/// What `cast_vote` did with the existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Created,
    Removed,
    Switched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub action: VoteAction,
    /// Post score after the vote was applied.
    pub score: i64,
}

/// Repository interface for vote operations.
pub trait VoteRepository {
    fn get_vote(&self, kind: PostKind, post_id: i64, user: UserId)
        -> RepoResult<Option<VoteKind>>;
    /// The user's votes on all answers of one question.
    fn votes_on_answers(
        &self,
        question_id: i64,
        user: UserId,
    ) -> RepoResult<Vec<(i64, VoteKind)>>;
    /// Applies toggle semantics for one vote and maintains score and
    /// reputation in the same transaction.
    fn cast_vote(
        &mut self,
        kind: PostKind,
        post_id: i64,
        voter: UserId,
        direction: VoteKind,
        deltas: &ReputationDeltas,
    ) -> RepoResult<VoteOutcome>;
}

/// SQLite-backed vote repository.
pub struct SqliteVoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteVoteRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl VoteRepository for SqliteVoteRepository<'_> {
    fn get_vote(
        &self,
        kind: PostKind,
        post_id: i64,
        user: UserId,
    ) -> RepoResult<Option<VoteKind>> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT vote FROM votes
                 WHERE post_kind = ?1 AND post_id = ?2 AND user_id = ?3;",
                params![kind.as_db(), post_id, user],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(RepoError::from(other)),
            })?;

        match value {
            None => Ok(None),
            Some(raw) => VoteKind::from_value(raw)
                .map(Some)
                .ok_or_else(|| RepoError::InvalidData(format!("invalid vote value `{raw}`"))),
        }
    }

    fn votes_on_answers(
        &self,
        question_id: i64,
        user: UserId,
    ) -> RepoResult<Vec<(i64, VoteKind)>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.post_id, v.vote
             FROM votes v
             INNER JOIN answers a ON a.id = v.post_id
             WHERE v.post_kind = 'answer'
               AND a.question_id = ?1
               AND v.user_id = ?2;",
        )?;
        let mut rows = stmt.query(params![question_id, user])?;
        let mut votes = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: i64 = row.get(1)?;
            let vote = VoteKind::from_value(raw)
                .ok_or_else(|| RepoError::InvalidData(format!("invalid vote value `{raw}`")))?;
            votes.push((row.get(0)?, vote));
        }
        Ok(votes)
    }

    fn cast_vote(
        &mut self,
        kind: PostKind,
        post_id: i64,
        voter: UserId,
        direction: VoteKind,
        deltas: &ReputationDeltas,
    ) -> RepoResult<VoteOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let post_table = match kind {
            PostKind::Question => "questions",
            PostKind::Answer => "answers",
        };
        let author: UserId = tx
            .query_row(
                &format!("SELECT author_id FROM {post_table} WHERE id = ?1;"),
                [post_id],
                |row| row.get(0),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => RepoError::NotFound {
                    entity: "post",
                    id: post_id,
                },
                other => other.into(),
            })?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT vote FROM votes
                 WHERE post_kind = ?1 AND post_id = ?2 AND user_id = ?3;",
                params![kind.as_db(), post_id, voter],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(RepoError::from(other)),
            })?;
        let existing = match existing {
            None => None,
            Some(raw) => Some(VoteKind::from_value(raw).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid vote value `{raw}`"))
            })?),
        };

        let (action, score_delta) = match existing {
            None => {
                tx.execute(
                    "INSERT INTO votes (post_kind, post_id, user_id, vote)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![kind.as_db(), post_id, voter, direction.value()],
                )?;
                apply_reputation(&tx, author, voter, direction, 1, deltas)?;
                (VoteAction::Created, direction.value())
            }
            Some(previous) if previous == direction => {
                tx.execute(
                    "DELETE FROM votes
                     WHERE post_kind = ?1 AND post_id = ?2 AND user_id = ?3;",
                    params![kind.as_db(), post_id, voter],
                )?;
                apply_reputation(&tx, author, voter, direction, -1, deltas)?;
                (VoteAction::Removed, -direction.value())
            }
            Some(previous) => {
                tx.execute(
                    "UPDATE votes SET vote = ?4
                     WHERE post_kind = ?1 AND post_id = ?2 AND user_id = ?3;",
                    params![kind.as_db(), post_id, voter, direction.value()],
                )?;
                apply_reputation(&tx, author, voter, previous, -1, deltas)?;
                apply_reputation(&tx, author, voter, direction, 1, deltas)?;
                (VoteAction::Switched, direction.value() - previous.value())
            }
        };

        tx.execute(
            &format!("UPDATE {post_table} SET score = score + ?2 WHERE id = ?1;"),
            params![post_id, score_delta],
        )?;
        let score: i64 = tx.query_row(
            &format!("SELECT score FROM {post_table} WHERE id = ?1;"),
            [post_id],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(VoteOutcome { action, score })
    }
}

/// Applies (sign = 1) or reverses (sign = -1) the reputation effect of
/// one vote in `direction`.
fn apply_reputation(
    tx: &rusqlite::Transaction<'_>,
    author: UserId,
    voter: UserId,
    direction: VoteKind,
    sign: i64,
    deltas: &ReputationDeltas,
) -> RepoResult<()> {
    let author_delta = match direction {
        VoteKind::Up => deltas.up_author * sign,
        VoteKind::Down => -deltas.down_author * sign,
    };
    tx.execute(
        "UPDATE users SET reputation = MAX(1, reputation + ?2) WHERE id = ?1;",
        params![author, author_delta],
    )?;

    if direction == VoteKind::Down {
        tx.execute(
            "UPDATE users SET reputation = MAX(1, reputation - ?2) WHERE id = ?1;",
            params![voter, deltas.down_voter * sign],
        )?;
    }
    Ok(())
}
