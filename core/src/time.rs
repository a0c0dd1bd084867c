use chrono::{DateTime, Local, SecondsFormat, Utc};

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// Used for profile `createdAt`/`modifiedAt` fields and export stamps so that
/// values sort lexically in the same order as chronologically.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

pub fn format_rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Local-time stamp used in backup file names, `YYYYMMDDHHMMSS`.
pub fn backup_stamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}
