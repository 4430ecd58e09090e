//! SQLite FTS5-based search implementation.
//!
//! # Responsibility
//! - Provide keyword search over question and answer text.
//! - Return typed hits with stable post addresses.
//!
//! # Invariants
//! - Only non-deleted posts are returned.
//! - Result ordering is deterministic by rank.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::db::DbError;
use crate::model::post::PostKind;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result
/// decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery { query: String, message: String },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Optional post-kind filter.
    pub kind: Option<PostKind>,
    /// Maximum number of hits to return.
    pub limit: u32,
    /// Whether to pass text directly as a raw FTS5 expression.
    ///
    /// Default is `false` so plain search-box input never hits FTS5
    /// syntax errors.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates a query with default pagination and no kind filter.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: 20,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_posts`].
///
/// `title` is the question title, for answer hits the title of the
/// question the answer belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub kind: PostKind,
    pub post_id: i64,
    pub title: String,
    pub snippet: String,
}

/// Searches posts via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
pub fn search_posts(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            post_kind,
            post_id,
            CASE post_kind
                WHEN 'question' THEN title
                ELSE (
                    SELECT q.title
                    FROM answers a
                    INNER JOIN questions q ON q.id = a.question_id
                    WHERE a.id = post_id
                )
            END AS title,
            snippet(posts_fts, 1, '[', ']', ' ... ', 10) AS snippet
         FROM posts_fts
         WHERE posts_fts MATCH ?
           AND CASE post_kind
               WHEN 'question' THEN EXISTS (
                   SELECT 1 FROM questions q WHERE q.id = post_id AND q.deleted = 0
               )
               ELSE EXISTS (
                   SELECT 1 FROM answers a WHERE a.id = post_id AND a.deleted = 0
               )
           END",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(kind) = query.kind {
        sql.push_str(" AND post_kind = ?");
        bind_values.push(Value::Text(kind.as_db().to_string()));
    }

    sql.push_str(" ORDER BY bm25(posts_fts) LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }

    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let kind_text: String = row.get("post_kind")?;
    let kind = PostKind::parse(&kind_text)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid post kind `{kind_text}`")))?;

    Ok(SearchHit {
        kind,
        post_id: row.get("post_id")?,
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }

    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
