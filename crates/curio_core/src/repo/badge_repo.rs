//! Badge repository.
//!
//! Awarding automation never shipped in the original system; awards are
//! written by this repository's `award` and read by the badge pages.

use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::Serialize;

use crate::model::badge::{Badge, BadgeId, BadgeKind};
use crate::model::user::UserId;
use crate::repo::{int_to_bool, AuthorBrief, RepoError, RepoResult};

const BADGE_SELECT_SQL: &str = "SELECT
    id, name, kind, description, multiple, awarded_count
FROM badges";

/// One row of the badge detail recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeRecipient {
    pub user: AuthorBrief,
    pub awarded_at: i64,
}

/// Repository interface for badge reads and awarding.
pub trait BadgeRepository {
    /// All badges, gold first, then by name.
    fn list_badges(&self) -> RepoResult<Vec<Badge>>;
    fn get_badge(&self, id: BadgeId) -> RepoResult<Option<Badge>>;
    /// Most recent recipients of one badge.
    fn recent_recipients(&self, id: BadgeId, limit: u32) -> RepoResult<Vec<BadgeRecipient>>;
    /// Awards the badge and maintains `awarded_count` plus the user's
    /// medal counter in one transaction.
    fn award(&mut self, id: BadgeId, user: UserId, awarded_at: i64) -> RepoResult<()>;
    /// Inserts the stock badge set on first boot; no-op otherwise.
    fn seed_defaults(&mut self) -> RepoResult<()>;
}

/// SQLite-backed badge repository.
pub struct SqliteBadgeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteBadgeRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl BadgeRepository for SqliteBadgeRepository<'_> {
    fn list_badges(&self) -> RepoResult<Vec<Badge>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BADGE_SELECT_SQL}
             ORDER BY CASE kind
                 WHEN 'gold' THEN 0
                 WHEN 'silver' THEN 1
                 ELSE 2
             END, name ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut badges = Vec::new();
        while let Some(row) = rows.next()? {
            badges.push(parse_badge_row(row)?);
        }
        Ok(badges)
    }

    fn get_badge(&self, id: BadgeId) -> RepoResult<Option<Badge>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BADGE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_badge_row(row)?)),
            None => Ok(None),
        }
    }

    fn recent_recipients(&self, id: BadgeId, limit: u32) -> RepoResult<Vec<BadgeRecipient>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                u.id AS author_id,
                u.username AS author_username,
                u.reputation AS author_reputation,
                u.gold AS author_gold,
                u.silver AS author_silver,
                u.bronze AS author_bronze,
                aw.awarded_at
             FROM awards aw
             INNER JOIN users u ON u.id = aw.user_id
             WHERE aw.badge_id = ?1
             ORDER BY aw.awarded_at DESC, aw.id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![id, limit])?;
        let mut recipients = Vec::new();
        while let Some(row) = rows.next()? {
            recipients.push(BadgeRecipient {
                user: AuthorBrief::from_prefixed_row(row)?,
                awarded_at: row.get("awarded_at")?,
            });
        }
        Ok(recipients)
    }

    fn award(&mut self, id: BadgeId, user: UserId, awarded_at: i64) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let kind_text: String = tx
            .query_row("SELECT kind FROM badges WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => RepoError::NotFound {
                    entity: "badge",
                    id,
                },
                other => other.into(),
            })?;
        let kind = BadgeKind::parse(&kind_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid badge kind `{kind_text}` in badges.kind"))
        })?;

        tx.execute(
            "INSERT INTO awards (badge_id, user_id, awarded_at) VALUES (?1, ?2, ?3);",
            params![id, user, awarded_at],
        )?;
        tx.execute(
            "UPDATE badges SET awarded_count = awarded_count + 1 WHERE id = ?1;",
            [id],
        )?;
        let medal_column = match kind {
            BadgeKind::Gold => "gold",
            BadgeKind::Silver => "silver",
            BadgeKind::Bronze => "bronze",
        };
        tx.execute(
            &format!("UPDATE users SET {medal_column} = {medal_column} + 1 WHERE id = ?1;"),
            [user],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn seed_defaults(&mut self) -> RepoResult<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM badges;", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }

        let defaults: &[(&str, &str, &str, bool)] = &[
            ("Student", "bronze", "Asked first question with score of 1 or more", false),
            ("Teacher", "bronze", "Answered first question with score of 1 or more", false),
            ("Editor", "bronze", "First edit", false),
            ("Supporter", "bronze", "First up vote", false),
            ("Critic", "bronze", "First down vote", false),
            ("Citizen", "bronze", "First accepted answer", false),
            ("Good Question", "silver", "Question voted up 25 times", true),
            ("Good Answer", "silver", "Answer voted up 25 times", true),
            ("Favourite Question", "silver", "Question favourited by 25 users", true),
            ("Great Question", "gold", "Question voted up 100 times", true),
            ("Great Answer", "gold", "Answer voted up 100 times", true),
        ];

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (name, kind, description, multiple) in defaults {
            tx.execute(
                "INSERT INTO badges (name, kind, description, multiple)
                 VALUES (?1, ?2, ?3, ?4);",
                params![name, kind, description, i64::from(*multiple)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_badge_row(row: &Row<'_>) -> RepoResult<Badge> {
    let kind_text: String = row.get("kind")?;
    let kind = BadgeKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid badge kind `{kind_text}` in badges.kind"))
    })?;
    Ok(Badge {
        id: row.get("id")?,
        name: row.get("name")?,
        kind,
        description: row.get("description")?,
        multiple: int_to_bool("badges.multiple", row.get("multiple")?)?,
        awarded_count: row.get("awarded_count")?,
    })
}
