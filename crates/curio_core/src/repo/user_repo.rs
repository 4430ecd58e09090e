//! User and session repository.
//!
//! # Responsibility
//! - Persist accounts, credentials and session tokens.
//! - Serve the user list page queries.
//!
//! # Invariants
//! - Credentials (salt + hash) never leave this module except through
//!   `get_credentials`.
//! - Reputation adjustments floor at 1.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::model::user::{User, UserId};
use crate::repo::{int_to_bool, RepoError, RepoResult};

const USER_SELECT_SQL: &str = "SELECT
    id, username, email, date_joined, reputation, gold, silver, bronze,
    questions_per_page, is_staff
FROM users";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub date_joined: i64,
}

/// Stored credential columns for password verification.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: UserId,
    pub password_salt: String,
    pub password_hash: String,
}

/// Orderings offered by the user list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSort {
    #[default]
    Reputation,
    Newest,
    Oldest,
    Name,
}

impl UserSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::Reputation => "reputation DESC, date_joined DESC",
            Self::Newest => "date_joined DESC",
            Self::Oldest => "date_joined ASC",
            Self::Name => "username ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub sort: UserSort,
    /// Case-insensitive substring filter on the username.
    pub filter: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

/// Repository interface for account and session operations.
pub trait UserRepository {
    fn create_user(&mut self, new: &NewUser) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn get_credentials(&self, username: &str) -> RepoResult<Option<Credentials>>;
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    fn count_users(&self, filter: Option<&str>) -> RepoResult<u64>;
    fn adjust_reputation(&mut self, user: UserId, delta: i64) -> RepoResult<()>;
    fn create_session(&mut self, user: UserId, created_at: i64) -> RepoResult<Uuid>;
    fn session_user(&self, token: Uuid) -> RepoResult<Option<User>>;
    fn delete_session(&mut self, token: Uuid) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&mut self, new: &NewUser) -> RepoResult<UserId> {
        self.conn.execute(
            "INSERT INTO users (
                username, email, password_salt, password_hash, date_joined
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                new.username,
                new.email,
                new.password_salt,
                new.password_hash,
                new.date_joined,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_credentials(&self, username: &str) -> RepoResult<Option<Credentials>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, password_salt, password_hash FROM users WHERE username = ?1;",
        )?;
        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(Credentials {
                user_id: row.get(0)?,
                password_salt: row.get(1)?,
                password_hash: row.get(2)?,
            })),
            None => Ok(None),
        }
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = String::from(USER_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(filter) = query.filter.as_ref() {
            sql.push_str(" WHERE username LIKE '%' || ? || '%'");
            bind_values.push(Value::Text(filter.clone()));
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
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn count_users(&self, filter: Option<&str>) -> RepoResult<u64> {
        let count: i64 = match filter {
            Some(filter) => self.conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username LIKE '%' || ?1 || '%';",
                [filter],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn adjust_reputation(&mut self, user: UserId, delta: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET reputation = MAX(1, reputation + ?2) WHERE id = ?1;",
            params![user, delta],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user,
            });
        }
        Ok(())
    }

    fn create_session(&mut self, user: UserId, created_at: i64) -> RepoResult<Uuid> {
        let token = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3);",
            params![token.to_string(), user, created_at],
        )?;
        Ok(token)
    }

    fn session_user(&self, token: Uuid) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                u.id, u.username, u.email, u.date_joined, u.reputation,
                u.gold, u.silver, u.bronze, u.questions_per_page, u.is_staff
             FROM sessions s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1;",
        )?;
        let mut rows = stmt.query([token.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn delete_session(&mut self, token: Uuid) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token.to_string()])?;
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        date_joined: row.get(3)?,
        reputation: row.get(4)?,
        gold: row.get(5)?,
        silver: row.get(6)?,
        bronze: row.get(7)?,
        questions_per_page: row.get(8)?,
        is_staff: int_to_bool("users.is_staff", row.get(9)?)?,
    })
}
