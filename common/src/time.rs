//! Wall-clock helpers. The game server reports command timestamps as unix
//! seconds, so both millisecond and fractional-second views are provided.

use chrono::Utc;

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Current unix time in seconds, fractional.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
