use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const LOCAL_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    None,
    Soon,
    Ended,
}

impl Urgency {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Urgency::None => None,
            Urgency::Soon => Some("Ending soon"),
            Urgency::Ended => Some("Ended"),
        }
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a stored due date into the local moment it refers to.
///
/// Plain dates mean midnight. RFC 3339 timestamps are moved into local time;
/// `datetime-local` style values are already local.
pub fn parse_due(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
        return Some(stamp.with_timezone(&Local).naive_local());
    }
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub fn classify(due: Option<&str>, today: NaiveDate) -> Urgency {
    let Some(due_at) = due.and_then(parse_due) else {
        return Urgency::None;
    };
    let diff_ms = (due_at - today.and_time(NaiveTime::MIN)).num_milliseconds();
    match ceil_days(diff_ms) {
        days if days <= 0 => Urgency::Ended,
        1..=3 => Urgency::Soon,
        _ => Urgency::None,
    }
}

/// Classifies against the current local date; call it per render.
pub fn classify_now(due: Option<&str>) -> Urgency {
    classify(due, local_today())
}

// Integer division truncates toward zero, which is already the ceiling for
// negative differences.
fn ceil_days(diff_ms: i64) -> i64 {
    let days = diff_ms / DAY_MS;
    if diff_ms % DAY_MS > 0 {
        days + 1
    } else {
        days
    }
}
