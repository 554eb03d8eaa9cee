//! Horodatage à l'heure de Brasília

use chrono::{DateTime, FixedOffset, Utc};

const BRASILIA_OFFSET_SECS: i32 = -3 * 3600;

/// Current time as `YYYY-MM-DDTHH:MM:SS-03:00`, the format of `dhEmi` and friends
pub fn timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(BRASILIA_OFFSET_SECS) {
        Some(offset) => instant
            .with_timezone(&offset)
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string(),
        None => instant.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
    }
}
