//! Tag listing repository.
//!
//! Tag creation and `use_count` maintenance live with the question
//! repository, which owns the link table; this repository only reads.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::model::tag::Tag;
use crate::repo::RepoResult;

/// Orderings offered by the tag list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSort {
    /// Most used first.
    #[default]
    Popular,
    Name,
}

impl TagSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::Popular => "use_count DESC, name ASC",
            Self::Name => "name ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagListQuery {
    pub sort: TagSort,
    /// Case-insensitive substring filter on the name.
    pub filter: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

/// Repository interface for tag reads.
pub trait TagRepository {
    fn list_tags(&self, query: &TagListQuery) -> RepoResult<Vec<Tag>>;
    fn count_tags(&self, filter: Option<&str>) -> RepoResult<u64>;
    fn get_tag(&self, name: &str) -> RepoResult<Option<Tag>>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn list_tags(&self, query: &TagListQuery) -> RepoResult<Vec<Tag>> {
        let mut sql = String::from("SELECT id, name, created_by, use_count FROM tags");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(filter) = query.filter.as_ref() {
            sql.push_str(" WHERE name LIKE '%' || ? || '%'");
            bind_values.push(Value::Text(filter.to_lowercase()));
        }

        sql.push_str(&format!(" ORDER BY {} LIMIT ?", query.sort.order_by()));
        bind_values.push(Value::Integer(i64::from(query.limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(query.offset as i64));
        }
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
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

    fn count_tags(&self, filter: Option<&str>) -> RepoResult<u64> {
        let count: i64 = match filter {
            Some(filter) => self.conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE name LIKE '%' || ?1 || '%';",
                [filter.to_lowercase()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM tags;", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn get_tag(&self, name: &str) -> RepoResult<Option<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_by, use_count
             FROM tags
             WHERE name = ?1 COLLATE NOCASE;",
        )?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                created_by: row.get(2)?,
                use_count: row.get(3)?,
            })),
            None => Ok(None),
        }
    }
}
