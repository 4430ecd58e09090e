//! Comment repository for questions and answers.

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::model::comment::{Comment, CommentId};
use crate::model::post::PostKind;
use crate::model::user::UserId;
use crate::repo::{AuthorBrief, RepoError, RepoResult};

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_kind: PostKind,
    pub post_id: i64,
    pub author_id: UserId,
    pub added_at: i64,
    pub comment: String,
}

/// Read model for comment threads under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentWithAuthor {
    pub id: CommentId,
    pub comment: String,
    pub added_at: i64,
    pub author: AuthorBrief,
}

/// Repository interface for comment operations.
pub trait CommentRepository {
    fn create_comment(&mut self, new: &NewComment) -> RepoResult<CommentId>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    /// Comments for one post, oldest first.
    fn list_for_post(&self, kind: PostKind, post_id: i64) -> RepoResult<Vec<CommentWithAuthor>>;
    /// Hard delete; comments have no tombstone state.
    fn delete_comment(&mut self, id: CommentId) -> RepoResult<()>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn create_comment(&mut self, new: &NewComment) -> RepoResult<CommentId> {
        self.conn.execute(
            "INSERT INTO comments (post_kind, post_id, author_id, added_at, comment)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                new.post_kind.as_db(),
                new.post_id,
                new.author_id,
                new.added_at,
                new.comment,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, post_kind, post_id, author_id, added_at, comment
             FROM comments
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_comment_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_for_post(&self, kind: PostKind, post_id: i64) -> RepoResult<Vec<CommentWithAuthor>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id, c.comment, c.added_at,
                u.id AS author_id,
                u.username AS author_username,
                u.reputation AS author_reputation,
                u.gold AS author_gold,
                u.silver AS author_silver,
                u.bronze AS author_bronze
             FROM comments c
             INNER JOIN users u ON u.id = c.author_id
             WHERE c.post_kind = ?1 AND c.post_id = ?2
             ORDER BY c.added_at ASC, c.id ASC;",
        )?;
        let mut rows = stmt.query(params![kind.as_db(), post_id])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(CommentWithAuthor {
                id: row.get("id")?,
                comment: row.get("comment")?,
                added_at: row.get("added_at")?,
                author: AuthorBrief::from_prefixed_row(row)?,
            });
        }
        Ok(comments)
    }

    fn delete_comment(&mut self, id: CommentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "comment",
                id,
            });
        }
        Ok(())
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let kind_text: String = row.get("post_kind")?;
    let post_kind = PostKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid post kind `{kind_text}` in comments.post_kind"))
    })?;
    Ok(Comment {
        id: row.get("id")?,
        post_kind,
        post_id: row.get("post_id")?,
        author_id: row.get("author_id")?,
        added_at: row.get("added_at")?,
        comment: row.get("comment")?,
    })
}
