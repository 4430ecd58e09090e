//! Environment-backed configuration.

use std::{env, fmt::Display, str::FromStr};

use log::warn;

pub struct Config {
    pub port: u16,
    /// SQLite database path; `:memory:` is accepted for ephemeral runs.
    pub database_path: String,
    pub log_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("CURIO_PORT", "8080"),
            database_path: try_load("CURIO_DB", "curio.db"),
            log_dir: try_load("CURIO_LOG_DIR", "logs"),
            log_level: try_load("CURIO_LOG_LEVEL", curio_core::default_log_level()),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|err| {
            warn!("Invalid {key} value: {err}");
        })
        .unwrap_or_else(|()| {
            default
                .parse()
                .map_err(|_| ())
                .expect("default configuration value must parse")
        })
}
