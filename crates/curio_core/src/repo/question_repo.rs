//! Question repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist question rows, their revisions, tag links and favourites.
//! - Own the denormalized columns on questions (`tagnames`,
//!   `favourite_count`, activity fields) and `tags.use_count`.
//!
//! # Invariants
//! - Tag relinking replaces the whole link set in a single transaction
//!   and recomputes `use_count` for every affected tag.
//! - Revision numbers are allocated inside the insert transaction and
//!   are monotonic per question.
//! - List queries never return deleted questions.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use serde::Serialize;

use crate::model::question::{Question, QuestionId};
use crate::model::revision::QuestionRevision;
use crate::model::tag::Tag;
use crate::model::user::UserId;
use crate::repo::{bool_to_int, int_to_bool, AuthorBrief, RepoError, RepoResult};

const QUESTION_SELECT_SQL: &str = "SELECT
    id, title, author_id, added_at, tagnames, summary, html, text,
    answer_count, score, favourite_count, last_activity_at,
    last_activity_by, wiki, wikified_at, last_edited_at, last_edited_by,
    closed, closed_by, closed_at, close_reason, deleted, locked
FROM questions";

const REVISION_SELECT_SQL: &str = "SELECT
    id, question_id, revision, title, author_id, revised_at, tagnames,
    summary, text
FROM question_revisions";

/// Write model for question creation.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub author_id: UserId,
    pub added_at: i64,
    pub tagnames: String,
    pub summary: String,
    pub html: String,
    pub text: String,
    pub wiki: bool,
}

/// Write model for a full question edit.
#[derive(Debug, Clone)]
pub struct QuestionEdit {
    pub question_id: QuestionId,
    pub title: String,
    pub tagnames: String,
    pub summary: String,
    pub html: String,
    pub text: String,
    pub edited_at: i64,
    pub edited_by: UserId,
    /// Wiki mode can be turned on by an edit, never off.
    pub set_wiki: bool,
}

/// Write model for a new revision; the revision number is allocated by
/// the repository.
#[derive(Debug, Clone)]
pub struct NewQuestionRevision {
    pub question_id: QuestionId,
    pub title: String,
    pub author_id: UserId,
    pub revised_at: i64,
    pub tagnames: String,
    pub summary: String,
    pub text: String,
}

/// Orderings offered by the question list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionSort {
    /// Most recently asked first.
    #[default]
    Latest,
    /// Most recent activity (new answers/edits) first.
    Active,
    /// Most answers first.
    Hottest,
    /// Highest score first.
    Votes,
}

impl QuestionSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::Latest => "q.added_at DESC, q.id DESC",
            Self::Active => "q.last_activity_at DESC, q.id DESC",
            Self::Hottest => "q.answer_count DESC, q.added_at DESC, q.id DESC",
            Self::Votes => "q.score DESC, q.added_at DESC, q.id DESC",
        }
    }
}

/// Filter/sort/pagination options for question lists.
#[derive(Debug, Clone, Default)]
pub struct QuestionListQuery {
    pub sort: QuestionSort,
    /// Restrict to questions carrying this (normalized) tag.
    pub tag: Option<String>,
    /// Restrict to questions with no answers.
    pub unanswered: bool,
    /// Restrict to questions asked by this user.
    pub author: Option<UserId>,
    pub limit: u32,
    pub offset: u64,
}

/// Read model for question list pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionListItem {
    pub id: QuestionId,
    pub title: String,
    pub tagnames: String,
    pub summary: String,
    pub answer_count: i64,
    pub score: i64,
    pub added_at: i64,
    pub last_activity_at: i64,
    pub closed: bool,
    pub author: AuthorBrief,
}

/// Repository interface for question aggregate operations.
pub trait QuestionRepository {
    fn create_question(&mut self, new: &NewQuestion) -> RepoResult<QuestionId>;
    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>>;
    fn apply_edit(&mut self, edit: &QuestionEdit) -> RepoResult<()>;
    /// Tags-only update used by the retag flow.
    fn apply_retag(
        &mut self,
        id: QuestionId,
        tagnames: &str,
        retagged_at: i64,
        retagged_by: UserId,
    ) -> RepoResult<()>;
    /// Replaces the question's tag links with `names` in one transaction.
    fn relink_tags(&mut self, id: QuestionId, names: &[String], user: UserId) -> RepoResult<()>;
    fn tags_for_question(&self, id: QuestionId) -> RepoResult<Vec<Tag>>;
    fn set_closed(
        &mut self,
        id: QuestionId,
        closed_by: UserId,
        closed_at: i64,
        reason: &str,
    ) -> RepoResult<()>;
    fn reopen(&mut self, id: QuestionId) -> RepoResult<()>;
    /// Creates or removes the favourite; returns whether it now exists.
    fn toggle_favourite(&mut self, id: QuestionId, user: UserId, at: i64) -> RepoResult<bool>;
    fn is_favourite(&self, id: QuestionId, user: UserId) -> RepoResult<bool>;
    fn wikify(&mut self, id: QuestionId, at: i64) -> RepoResult<()>;
    /// Inserts the next revision and returns its allocated number.
    fn create_revision(&mut self, new: &NewQuestionRevision) -> RepoResult<i64>;
    fn latest_revision(&self, question_id: QuestionId) -> RepoResult<QuestionRevision>;
    fn get_revision(
        &self,
        question_id: QuestionId,
        revision: i64,
    ) -> RepoResult<Option<QuestionRevision>>;
    /// All revisions, newest first.
    fn list_revisions(&self, question_id: QuestionId) -> RepoResult<Vec<QuestionRevision>>;
    /// Revisions authored by `author`, excluding the initial one.
    fn author_edit_count(&self, question_id: QuestionId, author: UserId) -> RepoResult<i64>;
    fn distinct_editor_count(&self, question_id: QuestionId) -> RepoResult<i64>;
    fn list_questions(&self, query: &QuestionListQuery) -> RepoResult<Vec<QuestionListItem>>;
    fn count_questions(&self, query: &QuestionListQuery) -> RepoResult<u64>;
}

/// SQLite-backed question repository.
pub struct SqliteQuestionRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteQuestionRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl QuestionRepository for SqliteQuestionRepository<'_> {
    fn create_question(&mut self, new: &NewQuestion) -> RepoResult<QuestionId> {
        // Wiki questions always display the last edit, so the edit fields
        // start populated.
        self.conn.execute(
            "INSERT INTO questions (
                title, author_id, added_at, tagnames, summary, html, text,
                last_activity_at, last_activity_by, wiki, wikified_at,
                last_edited_at, last_edited_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?3, ?2, ?8,
                      CASE WHEN ?8 = 1 THEN ?3 END,
                      CASE WHEN ?8 = 1 THEN ?3 END,
                      CASE WHEN ?8 = 1 THEN ?2 END);",
            params![
                new.title,
                new.author_id,
                new.added_at,
                new.tagnames,
                new.summary,
                new.html,
                new.text,
                bool_to_int(new.wiki),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_question(&self, id: QuestionId) -> RepoResult<Option<Question>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUESTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_question_row(row)?));
        }
        Ok(None)
    }

    fn apply_edit(&mut self, edit: &QuestionEdit) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions
             SET
                title = ?2,
                tagnames = ?3,
                summary = ?4,
                html = ?5,
                text = ?6,
                last_edited_at = ?7,
                last_edited_by = ?8,
                last_activity_at = ?7,
                last_activity_by = ?8,
                wiki = CASE WHEN ?9 = 1 THEN 1 ELSE wiki END,
                wikified_at = CASE WHEN ?9 = 1 AND wiki = 0 THEN ?7 ELSE wikified_at END
             WHERE id = ?1;",
            params![
                edit.question_id,
                edit.title,
                edit.tagnames,
                edit.summary,
                edit.html,
                edit.text,
                edit.edited_at,
                edit.edited_by,
                bool_to_int(edit.set_wiki),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id: edit.question_id,
            });
        }
        Ok(())
    }

    fn apply_retag(
        &mut self,
        id: QuestionId,
        tagnames: &str,
        retagged_at: i64,
        retagged_by: UserId,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions
             SET
                tagnames = ?2,
                last_edited_at = ?3,
                last_edited_by = ?4,
                last_activity_at = ?3,
                last_activity_by = ?4
             WHERE id = ?1;",
            params![id, tagnames, retagged_at, retagged_by],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id,
            });
        }
        Ok(())
    }

    fn relink_tags(&mut self, id: QuestionId, names: &[String], user: UserId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id,
            });
        }

        // Affected tags: every tag currently linked plus every tag named.
        let mut affected: Vec<i64> = Vec::new();
        {
            let mut stmt =
                tx.prepare("SELECT tag_id FROM question_tags WHERE question_id = ?1;")?;
            let mut rows = stmt.query([id])?;
            while let Some(row) = rows.next()? {
                affected.push(row.get(0)?);
            }
        }

        tx.execute("DELETE FROM question_tags WHERE question_id = ?1;", [id])?;

        for name in names {
            tx.execute(
                "INSERT OR IGNORE INTO tags (name, created_by) VALUES (?1, ?2);",
                params![name, user],
            )?;
            let tag_id: i64 = tx.query_row(
                "SELECT id FROM tags WHERE name = ?1;",
                [name.as_str()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO question_tags (question_id, tag_id) VALUES (?1, ?2);",
                params![id, tag_id],
            )?;
            if !affected.contains(&tag_id) {
                affected.push(tag_id);
            }
        }

        if !affected.is_empty() {
            let placeholders = vec!["?"; affected.len()].join(", ");
            let sql = format!(
                "UPDATE tags
                 SET use_count = (
                    SELECT COUNT(*)
                    FROM question_tags qt
                    INNER JOIN questions q ON q.id = qt.question_id
                    WHERE qt.tag_id = tags.id
                      AND q.deleted = 0
                 )
                 WHERE id IN ({placeholders});"
            );
            tx.execute(
                &sql,
                params_from_iter(affected.iter().map(|tag_id| Value::Integer(*tag_id))),
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn tags_for_question(&self, id: QuestionId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.created_by, t.use_count
             FROM question_tags qt
             INNER JOIN tags t ON t.id = qt.tag_id
             WHERE qt.question_id = ?1
             ORDER BY t.name ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                created_by: row.get(2)?,
                use_count: row.get(3)?,
            });
        }
        Ok(tags)
    }

    fn set_closed(
        &mut self,
        id: QuestionId,
        closed_by: UserId,
        closed_at: i64,
        reason: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions
             SET closed = 1, closed_by = ?2, closed_at = ?3, close_reason = ?4
             WHERE id = ?1;",
            params![id, closed_by, closed_at, reason],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id,
            });
        }
        Ok(())
    }

    fn reopen(&mut self, id: QuestionId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions
             SET closed = 0, closed_by = NULL, closed_at = NULL, close_reason = NULL
             WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id,
            });
        }
        Ok(())
    }

    fn toggle_favourite(&mut self, id: QuestionId, user: UserId, at: i64) -> RepoResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute(
            "DELETE FROM favourite_questions WHERE question_id = ?1 AND user_id = ?2;",
            params![id, user],
        )?;

        let favourited = if removed == 0 {
            tx.execute(
                "INSERT INTO favourite_questions (question_id, user_id, added_at)
                 VALUES (?1, ?2, ?3);",
                params![id, user, at],
            )?;
            true
        } else {
            false
        };

        let delta: i64 = if favourited { 1 } else { -1 };
        let changed = tx.execute(
            "UPDATE questions
             SET favourite_count = MAX(0, favourite_count + ?2)
             WHERE id = ?1;",
            params![id, delta],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "question",
                id,
            });
        }

        tx.commit()?;
        Ok(favourited)
    }

    fn is_favourite(&self, id: QuestionId, user: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM favourite_questions
                WHERE question_id = ?1 AND user_id = ?2
            );",
            params![id, user],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn wikify(&mut self, id: QuestionId, at: i64) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE questions
             SET wiki = 1, wikified_at = ?2
             WHERE id = ?1 AND wiki = 0;",
            params![id, at],
        )?;
        Ok(())
    }

    fn create_revision(&mut self, new: &NewQuestionRevision) -> RepoResult<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO question_revisions (
                question_id, revision, title, author_id, revised_at,
                tagnames, summary, text
            )
            SELECT ?1, COALESCE(MAX(revision), 0) + 1, ?2, ?3, ?4, ?5, ?6, ?7
            FROM question_revisions
            WHERE question_id = ?1;",
            params![
                new.question_id,
                new.title,
                new.author_id,
                new.revised_at,
                new.tagnames,
                new.summary,
                new.text,
            ],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT revision FROM question_revisions WHERE id = last_insert_rowid();",
            [],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(revision)
    }

    fn latest_revision(&self, question_id: QuestionId) -> RepoResult<QuestionRevision> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE question_id = ?1
             ORDER BY revision DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([question_id])?;
        match rows.next()? {
            Some(row) => parse_revision_row(row),
            None => Err(RepoError::NotFound {
                entity: "question revision",
                id: question_id,
            }),
        }
    }

    fn get_revision(
        &self,
        question_id: QuestionId,
        revision: i64,
    ) -> RepoResult<Option<QuestionRevision>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL} WHERE question_id = ?1 AND revision = ?2;"
        ))?;
        let mut rows = stmt.query(params![question_id, revision])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_revision_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_revisions(&self, question_id: QuestionId) -> RepoResult<Vec<QuestionRevision>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL}
             WHERE question_id = ?1
             ORDER BY revision DESC;"
        ))?;
        let mut rows = stmt.query([question_id])?;
        let mut revisions = Vec::new();
        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_row(row)?);
        }
        Ok(revisions)
    }

    fn author_edit_count(&self, question_id: QuestionId, author: UserId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM question_revisions
             WHERE question_id = ?1 AND author_id = ?2 AND revision > 1;",
            params![question_id, author],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn distinct_editor_count(&self, question_id: QuestionId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT author_id)
             FROM question_revisions
             WHERE question_id = ?1;",
            [question_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_questions(&self, query: &QuestionListQuery) -> RepoResult<Vec<QuestionListItem>> {
        let (where_sql, mut bind_values) = build_question_filter(query);
        let mut sql = format!(
            "SELECT
                q.id, q.title, q.tagnames, q.summary, q.answer_count,
                q.score, q.added_at, q.last_activity_at, q.closed,
                u.id AS author_id,
                u.username AS author_username,
                u.reputation AS author_reputation,
                u.gold AS author_gold,
                u.silver AS author_silver,
                u.bronze AS author_bronze
             FROM questions q
             INNER JOIN users u ON u.id = q.author_id
             {where_sql}
             ORDER BY {}",
            query.sort.order_by()
        );
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(query.limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(query.offset as i64));
        }
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(QuestionListItem {
                id: row.get("id")?,
                title: row.get("title")?,
                tagnames: row.get("tagnames")?,
                summary: row.get("summary")?,
                answer_count: row.get("answer_count")?,
                score: row.get("score")?,
                added_at: row.get("added_at")?,
                last_activity_at: row.get("last_activity_at")?,
                closed: int_to_bool("questions.closed", row.get("closed")?)?,
                author: AuthorBrief::from_prefixed_row(row)?,
            });
        }
        Ok(items)
    }

    fn count_questions(&self, query: &QuestionListQuery) -> RepoResult<u64> {
        let (where_sql, bind_values) = build_question_filter(query);
        let sql = format!("SELECT COUNT(*) FROM questions q {where_sql};");
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn build_question_filter(query: &QuestionListQuery) -> (String, Vec<Value>) {
    let mut where_sql = String::from("WHERE q.deleted = 0");
    let mut bind_values: Vec<Value> = Vec::new();

    if query.unanswered {
        where_sql.push_str(" AND q.answer_count = 0");
    }
    if let Some(tag) = query.tag.as_ref() {
        where_sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM question_tags qt
                INNER JOIN tags t ON t.id = qt.tag_id
                WHERE qt.question_id = q.id
                  AND t.name = ? COLLATE NOCASE
            )",
        );
        bind_values.push(Value::Text(tag.clone()));
    }
    if let Some(author) = query.author {
        where_sql.push_str(" AND q.author_id = ?");
        bind_values.push(Value::Integer(author));
    }

    (where_sql, bind_values)
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<Question> {
    Ok(Question {
        id: row.get("id")?,
        title: row.get("title")?,
        author_id: row.get("author_id")?,
        added_at: row.get("added_at")?,
        tagnames: row.get("tagnames")?,
        summary: row.get("summary")?,
        html: row.get("html")?,
        text: row.get("text")?,
        answer_count: row.get("answer_count")?,
        score: row.get("score")?,
        favourite_count: row.get("favourite_count")?,
        last_activity_at: row.get("last_activity_at")?,
        last_activity_by: row.get("last_activity_by")?,
        wiki: int_to_bool("questions.wiki", row.get("wiki")?)?,
        wikified_at: row.get("wikified_at")?,
        last_edited_at: row.get("last_edited_at")?,
        last_edited_by: row.get("last_edited_by")?,
        closed: int_to_bool("questions.closed", row.get("closed")?)?,
        closed_by: row.get("closed_by")?,
        closed_at: row.get("closed_at")?,
        close_reason: row.get("close_reason")?,
        deleted: int_to_bool("questions.deleted", row.get("deleted")?)?,
        locked: int_to_bool("questions.locked", row.get("locked")?)?,
    })
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<QuestionRevision> {
    Ok(QuestionRevision {
        id: row.get("id")?,
        question_id: row.get("question_id")?,
        revision: row.get("revision")?,
        title: row.get("title")?,
        author_id: row.get("author_id")?,
        revised_at: row.get("revised_at")?,
        tagnames: row.get("tagnames")?,
        summary: row.get("summary")?,
        text: row.get("text")?,
    })
}
