//! Wall-clock helper shared by services.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as unix epoch milliseconds, the storage timestamp unit.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
