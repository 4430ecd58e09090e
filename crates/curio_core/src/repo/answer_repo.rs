//! Answer repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist answer rows and their revisions.
//! - Own the question-side counters an answer write touches
//!   (`answer_count`, activity fields) in the same transaction.
//! - Own accepted-answer exclusivity and thread-wide wiki conversion.
//!
//! # Invariants
//! - `answer_count` is recounted from non-deleted answers, never blindly
//!   incremented.
//! - At most one accepted answer per question; reputation adjustments for
//!   acceptance happen inside the accepting transaction.

use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::Serialize;

use crate::model::answer::{Answer, AnswerId};
use crate::model::question::QuestionId;
use crate::model::revision::AnswerRevision;
use crate::model::user::UserId;
use crate::repo::{bool_to_int, int_to_bool, AuthorBrief, RepoError, RepoResult};

const ANSWER_SELECT_SQL: &str = "SELECT
    id, question_id, author_id, added_at, html, text, score, wiki,
    wikified_at, last_edited_at, last_edited_by, accepted, deleted, locked
FROM answers";

const REVISION_SELECT_SQL: &str = "SELECT
    id, answer_id, revision, author_id, revised_at, summary, text
FROM answer_revisions";

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub question_id: QuestionId,
    pub author_id: UserId,
    pub added_at: i64,
    pub html: String,
    pub text: String,
    pub wiki: bool,
}

#[derive(Debug, Clone)]
pub struct AnswerEdit {
    pub answer_id: AnswerId,
    pub html: String,
    pub text: String,
    pub edited_at: i64,
    pub edited_by: UserId,
    pub set_wiki: bool,
}

#[derive(Debug, Clone)]
pub struct NewAnswerRevision {
    pub answer_id: AnswerId,
    pub author_id: UserId,
    pub revised_at: i64,
    pub summary: String,
    pub text: String,
}

/// Orderings offered on the question page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerSort {
    /// Accepted answer pinned first, then highest score.
    #[default]
    Votes,
    Newest,
    Oldest,
}

impl AnswerSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::Votes => "a.accepted DESC, a.score DESC, a.added_at DESC, a.id ASC",
            Self::Newest => "a.added_at DESC, a.id DESC",
            Self::Oldest => "a.added_at ASC, a.id ASC",
        }
    }
}

/// Read model for the answers shown on a question page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerListItem {
    pub id: AnswerId,
    pub added_at: i64,
    pub html: String,
    pub score: i64,
    pub wiki: bool,
    pub accepted: bool,
    pub last_edited_at: Option<i64>,
    pub author: AuthorBrief,
}

/// Read model for a user profile's recent answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerProfileItem {
    pub answer_id: AnswerId,
    pub question_id: QuestionId,
    pub question_title: String,
    pub score: i64,
    pub accepted: bool,
    pub added_at: i64,
}

/// Outcome of accepting an answer, carrying the author ids whose
/// reputation was adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub answer_author: UserId,
    /// Previously accepted answer on the same question, if any.
    pub previous: Option<(AnswerId, UserId)>,
}

/// Repository interface for answer aggregate operations.
pub trait AnswerRepository {
    /// Inserts the answer and refreshes the question's `answer_count` and
    /// activity fields in one transaction.
    fn create_answer(&mut self, new: &NewAnswer) -> RepoResult<AnswerId>;
    fn get_answer(&self, id: AnswerId) -> RepoResult<Option<Answer>>;
    fn apply_edit(&mut self, edit: &AnswerEdit) -> RepoResult<()>;
    fn list_for_question(
        &self,
        question_id: QuestionId,
        sort: AnswerSort,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<AnswerListItem>>;
    /// Marks `id` accepted, clearing any previous acceptance, and applies
    /// `reputation_delta` to the gaining (and losing) answer author.
    fn accept(&mut self, id: AnswerId, reputation_delta: i64) -> RepoResult<AcceptOutcome>;
    /// Clears acceptance of `id`, reversing `reputation_delta`.
    fn unaccept(&mut self, id: AnswerId, reputation_delta: i64) -> RepoResult<UserId>;
    /// Converts one answer to wiki.
    fn wikify(&mut self, id: AnswerId, at: i64) -> RepoResult<()>;
    /// Converts the question and all of its answers to wiki.
    fn wikify_thread(&mut self, question_id: QuestionId, at: i64) -> RepoResult<()>;
    fn create_revision(&mut self, new: &NewAnswerRevision) -> RepoResult<i64>;
    fn latest_revision(&self, answer_id: AnswerId) -> RepoResult<AnswerRevision>;
    fn get_revision(&self, answer_id: AnswerId, revision: i64)
        -> RepoResult<Option<AnswerRevision>>;
    fn list_revisions(&self, answer_id: AnswerId) -> RepoResult<Vec<AnswerRevision>>;
    fn author_edit_count(&self, answer_id: AnswerId, author: UserId) -> RepoResult<i64>;
    fn distinct_editor_count(&self, answer_id: AnswerId) -> RepoResult<i64>;
    fn list_recent_by_user(&self, user: UserId, limit: u32) -> RepoResult<Vec<AnswerProfileItem>>;
}

/// SQLite-backed answer repository.
pub struct SqliteAnswerRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAnswerRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl AnswerRepository for SqliteAnswerRepository<'_> {
    fn create_answer(&mut self, new: &NewAnswer) -> RepoResult<AnswerId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO answers (
                question_id, author_id, added_at, html, text, wiki,
                wikified_at, last_edited_at, last_edited_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                      CASE WHEN ?6 = 1 THEN ?3 END,
                      CASE WHEN ?6 = 1 THEN ?3 END,
                      CASE WHEN ?6 = 1 THEN ?2 END);",
            params![
                new.question_id,
                new.author_id,
                new.added_at,
                new.html,
                new.text,
                bool_to_int(new.wiki),
            ],
        )?;
        let answer_id = tx.last_insert_rowid();

        let changed = tx.execute(
            "UPDATE questions
             SET
                answer_count = (
                    SELECT COUNT(*) FROM answers
                    WHERE question_id = ?1 AND deleted = 0
                ),
                last_activity_at = ?2,
                last_activity_by = ?3
             WHERE id = ?1;",
            params![new.question_id, new.added_at, new.author_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id: new.question_id,
            });
        }

        tx.commit()?;
        Ok(answer_id)
    }

    fn get_answer(&self, id: AnswerId) -> RepoResult<Option<Answer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ANSWER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_answer_row(row)?)),
            None => Ok(None),
        }
    }

    fn apply_edit(&mut self, edit: &AnswerEdit) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE answers
             SET
                html = ?2,
                text = ?3,
                last_edited_at = ?4,
                last_edited_by = ?5,
                wiki = CASE WHEN ?6 = 1 THEN 1 ELSE wiki END,
                wikified_at = CASE WHEN ?6 = 1 AND wiki = 0 THEN ?4 ELSE wikified_at END
             WHERE id = ?1;",
            params![
                edit.answer_id,
                edit.html,
                edit.text,
                edit.edited_at,
                edit.edited_by,
                bool_to_int(edit.set_wiki),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "answer",
                id: edit.answer_id,
            });
        }
        Ok(())
    }

    fn list_for_question(
        &self,
        question_id: QuestionId,
        sort: AnswerSort,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<AnswerListItem>> {
        let sql = format!(
            "SELECT
                a.id, a.added_at, a.html, a.score, a.wiki, a.accepted,
                a.last_edited_at,
                u.id AS author_id,
                u.username AS author_username,
                u.reputation AS author_reputation,
                u.gold AS author_gold,
                u.silver AS author_silver,
                u.bronze AS author_bronze
             FROM answers a
             INNER JOIN users u ON u.id = a.author_id
             WHERE a.question_id = ?1 AND a.deleted = 0
             ORDER BY {}
             LIMIT ?2 OFFSET ?3;",
            sort.order_by()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![question_id, limit, offset as i64])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(AnswerListItem {
                id: row.get("id")?,
                added_at: row.get("added_at")?,
                html: row.get("html")?,
                score: row.get("score")?,
                wiki: int_to_bool("answers.wiki", row.get("wiki")?)?,
                accepted: int_to_bool("answers.accepted", row.get("accepted")?)?,
                last_edited_at: row.get("last_edited_at")?,
                author: AuthorBrief::from_prefixed_row(row)?,
            });
        }
        Ok(items)
    }

    fn accept(&mut self, id: AnswerId, reputation_delta: i64) -> RepoResult<AcceptOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (question_id, answer_author): (QuestionId, UserId) = tx
            .query_row(
                "SELECT question_id, author_id FROM answers WHERE id = ?1;",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => RepoError::NotFound {
                    entity: "answer",
                    id,
                },
                other => other.into(),
            })?;

        let previous: Option<(AnswerId, UserId)> = tx
            .query_row(
                "SELECT id, author_id FROM answers
                 WHERE question_id = ?1 AND accepted = 1 AND id != ?2;",
                params![question_id, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(RepoError::from(other)),
            })?;

        tx.execute(
            "UPDATE answers SET accepted = 0 WHERE question_id = ?1;",
            [question_id],
        )?;
        tx.execute("UPDATE answers SET accepted = 1 WHERE id = ?1;", [id])?;

        if let Some((_, previous_author)) = previous {
            tx.execute(
                "UPDATE users SET reputation = MAX(1, reputation - ?2) WHERE id = ?1;",
                params![previous_author, reputation_delta],
            )?;
        }
        tx.execute(
            "UPDATE users SET reputation = MAX(1, reputation + ?2) WHERE id = ?1;",
            params![answer_author, reputation_delta],
        )?;

        tx.commit()?;
        Ok(AcceptOutcome {
            answer_author,
            previous,
        })
    }

    fn unaccept(&mut self, id: AnswerId, reputation_delta: i64) -> RepoResult<UserId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let author: UserId = tx
            .query_row(
                "SELECT author_id FROM answers WHERE id = ?1 AND accepted = 1;",
                [id],
                |row| row.get(0),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => RepoError::NotFound {
                    entity: "accepted answer",
                    id,
                },
                other => other.into(),
            })?;

        tx.execute("UPDATE answers SET accepted = 0 WHERE id = ?1;", [id])?;
        tx.execute(
            "UPDATE users SET reputation = MAX(1, reputation - ?2) WHERE id = ?1;",
            params![author, reputation_delta],
        )?;

        tx.commit()?;
        Ok(author)
    }

    fn wikify(&mut self, id: AnswerId, at: i64) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE answers SET wiki = 1, wikified_at = ?2
             WHERE id = ?1 AND wiki = 0;",
            params![id, at],
        )?;
        Ok(())
    }

    fn wikify_thread(&mut self, question_id: QuestionId, at: i64) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE questions SET wiki = 1, wikified_at = ?2
             WHERE id = ?1 AND wiki = 0;",
            params![question_id, at],
        )?;
        tx.execute(
            "UPDATE answers SET wiki = 1, wikified_at = ?2
             WHERE question_id = ?1 AND wiki = 0;",
            params![question_id, at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn create_revision(&mut self, new: &NewAnswerRevision) -> RepoResult<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO answer_revisions (
                answer_id, revision, author_id, revised_at, summary, text
            )
            SELECT ?1, COALESCE(MAX(revision), 0) + 1, ?2, ?3, ?4, ?5
            FROM answer_revisions
            WHERE answer_id = ?1;",
            params![
                new.answer_id,
                new.author_id,
                new.revised_at,
                new.summary,
                new.text,
            ],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT revision FROM answer_revisions WHERE id = last_insert_rowid();",
            [],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(revision)
    }

    fn latest_revision(&self, answer_id: AnswerId) -> RepoResult<AnswerRevision> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE answer_id = ?1
             ORDER BY revision DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([answer_id])?;
        match rows.next()? {
            Some(row) => parse_revision_row(row),
            None => Err(RepoError::NotFound {
                entity: "answer revision",
                id: answer_id,
            }),
        }
    }

    fn get_revision(
        &self,
        answer_id: AnswerId,
        revision: i64,
    ) -> RepoResult<Option<AnswerRevision>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL} WHERE answer_id = ?1 AND revision = ?2;"
        ))?;
        let mut rows = stmt.query(params![answer_id, revision])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_revision_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_revisions(&self, answer_id: AnswerId) -> RepoResult<Vec<AnswerRevision>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE answer_id = ?1
             ORDER BY revision DESC;"
        ))?;
        let mut rows = stmt.query([answer_id])?;
        let mut revisions = Vec::new();
        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_row(row)?);
        }
        Ok(revisions)
    }

    fn author_edit_count(&self, answer_id: AnswerId, author: UserId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM answer_revisions
             WHERE answer_id = ?1 AND author_id = ?2 AND revision > 1;",
            params![answer_id, author],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn distinct_editor_count(&self, answer_id: AnswerId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT author_id)
             FROM answer_revisions
             WHERE answer_id = ?1;",
            [answer_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_recent_by_user(&self, user: UserId, limit: u32) -> RepoResult<Vec<AnswerProfileItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.question_id, q.title, a.score, a.accepted, a.added_at
             FROM answers a
             INNER JOIN questions q ON q.id = a.question_id
             WHERE a.author_id = ?1 AND a.deleted = 0 AND q.deleted = 0
             ORDER BY a.added_at DESC, a.id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![user, limit])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(AnswerProfileItem {
                answer_id: row.get(0)?,
                question_id: row.get(1)?,
                question_title: row.get(2)?,
                score: row.get(3)?,
                accepted: int_to_bool("answers.accepted", row.get(4)?)?,
                added_at: row.get(5)?,
            });
        }
        Ok(items)
    }
}

fn parse_answer_row(row: &Row<'_>) -> RepoResult<Answer> {
    Ok(Answer {
        id: row.get("id")?,
        question_id: row.get("question_id")?,
        author_id: row.get("author_id")?,
        added_at: row.get("added_at")?,
        html: row.get("html")?,
        text: row.get("text")?,
        score: row.get("score")?,
        wiki: int_to_bool("answers.wiki", row.get("wiki")?)?,
        wikified_at: row.get("wikified_at")?,
        last_edited_at: row.get("last_edited_at")?,
        last_edited_by: row.get("last_edited_by")?,
        accepted: int_to_bool("answers.accepted", row.get("accepted")?)?,
        deleted: int_to_bool("answers.deleted", row.get("deleted")?)?,
        locked: int_to_bool("answers.locked", row.get("locked")?)?,
    })
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<AnswerRevision> {
    Ok(AnswerRevision {
        id: row.get("id")?,
        answer_id: row.get("answer_id")?,
        revision: row.get("revision")?,
        author_id: row.get("author_id")?,
        revised_at: row.get("revised_at")?,
        summary: row.get("summary")?,
        text: row.get("text")?,
    })
}
