use chrono::{DateTime, SecondsFormat, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Millisecond precision with a `Z` suffix, as sent in webhook payloads.
pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rounds `t` up to the next multiple of `minutes` since the epoch.
pub fn ceil_to_minutes(t: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let step = minutes * 60;
    let secs = t.timestamp();
    let floor = secs.div_euclid(step) * step;
    let target = if floor == secs && t.timestamp_subsec_nanos() == 0 {
        floor
    } else {
        floor + step
    };
    DateTime::<Utc>::from_timestamp(target, 0).unwrap_or(t)
}
