use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use crate::utils::constants::DEFAULT_REFRESH_BUFFER_SECS;

pub fn get_refresh_buffer(refresh_buffer_seconds_settings: Option<u64>) -> TimeDelta {
    let seconds = refresh_buffer_seconds_settings.unwrap_or(DEFAULT_REFRESH_BUFFER_SECS);
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::minutes(5))
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// RFC3339 timestamps rendered as `YYYY-MM-DD HH:MM:SS`; anything else passes through.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_owned())
}
