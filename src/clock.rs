use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds. Clocks set before the epoch read as 0.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
