//! Timestamp utilities

use chrono::{DateTime, Duration, Local, Utc};

/// Play-log timestamp layout
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a local time for the play log, rounded to the nearest second
pub fn log_timestamp(at: DateTime<Local>) -> String {
    (at + Duration::milliseconds(500))
        .format(LOG_TIMESTAMP_FORMAT)
        .to_string()
}

/// Current local time formatted for the play log
pub fn log_timestamp_now() -> String {
    log_timestamp(Local::now())
}
