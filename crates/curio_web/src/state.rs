//! Shared application state.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tera::Tera;

use curio_core::db::{open_db, open_db_in_memory};
use curio_core::repo::badge_repo::{BadgeRepository, SqliteBadgeRepository};

use crate::config::Config;
use crate::error::PageError;
use crate::templates::build_templates;

pub type SharedState = Arc<AppState>;

/// Per-process state: configuration, the database handle and the
/// compiled template set.
pub struct AppState {
    pub config: Config,
    db: Mutex<Connection>,
    pub templates: Tera,
}

impl AppState {
    /// Opens (and migrates) the configured database and compiles
    /// templates. Seeds the stock badge set on first boot.
    pub fn new(config: Config) -> Result<SharedState, String> {
        let conn = if config.database_path == ":memory:" {
            open_db_in_memory()
        } else {
            open_db(&config.database_path)
        }
        .map_err(|err| format!("failed to open database `{}`: {err}", config.database_path))?;

        Self::with_connection(config, conn)
    }

    /// Builds state over an existing migrated connection. Used by tests
    /// to share an in-memory database with the request stack.
    pub fn with_connection(config: Config, mut conn: Connection) -> Result<SharedState, String> {
        SqliteBadgeRepository::new(&mut conn)
            .seed_defaults()
            .map_err(|err| format!("failed to seed badges: {err}"))?;

        let templates = build_templates().map_err(|err| format!("failed to load templates: {err}"))?;

        Ok(Arc::new(Self {
            config,
            db: Mutex::new(conn),
            templates,
        }))
    }

    /// Locks the database handle for the duration of one request's work.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, PageError> {
        self.db
            .lock()
            .map_err(|_| PageError::Internal("database mutex poisoned".to_string()))
    }
}
