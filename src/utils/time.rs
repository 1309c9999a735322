use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Whole seconds between `since` and `now`, zero when the clock ran backwards.
pub fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - since).num_seconds().max(0) as u64
}

/// Wait since check-in as `H:MM:SS`. Hours are not padded and not capped.
pub fn format_wait_time(check_in: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total = elapsed_seconds(check_in, now);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
