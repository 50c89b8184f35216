use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Compact timestamp used in storage object keys, e.g. `20261019T142503123`.
pub fn storage_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%S%3f").to_string()
}
