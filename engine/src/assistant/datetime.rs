//! Lenient date/time parsing for model-produced fields
//!
//! Values without an offset are wall-clock times in the given zone. The
//! engine passes `chrono::Local`; tests pass `Utc` to stay deterministic.

use chrono::{
    DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a JSON value into an instant.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD[T ]HH:MM[:SS]`, a bare
/// `YYYY-MM-DD` (midnight) or unix milliseconds. Anything else is `None`.
pub fn parse_datetime_in<Tz: TimeZone>(value: &Value, tz: &Tz) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str_in(s.trim(), tz),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_str_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // `2025-06-02T10:00:00Z` without fractional seconds is RFC 3339, but a
    // trailing `Z` on a minute-precision value is not
    if let Some(stripped) = s.strip_suffix('Z') {
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_to_utc(&naive, tz);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| local_to_utc(&d.and_time(NaiveTime::MIN), tz))
}

/// Wall-clock time in `tz` to UTC. On a DST fold the earlier instant wins.
pub(crate) fn local_to_utc<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Start and inclusive end (last millisecond) of `date` in `tz`
pub fn day_bounds_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_to_utc(&date.and_time(NaiveTime::MIN), tz)?;
    let next = date.succ_opt()?;
    let end = local_to_utc(&next.and_time(NaiveTime::MIN), tz)? - Duration::milliseconds(1);
    Some((start, end))
}

/// Midnight of the day containing `now`, in `tz`
pub fn start_of_day_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    day_bounds_in(local_date, tz)
        .map(|(start, _)| start)
        .unwrap_or(now)
}

/// `HH:MM` on the day of `now` in `tz`
pub fn time_of_day_in<Tz: TimeZone>(text: &str, now: DateTime<Utc>, tz: &Tz) -> Option<DateTime<Utc>> {
    let (h, m) = text.trim().split_once(':')?;
    let time = NaiveTime::from_hms_opt(h.trim().parse().ok()?, m.trim().parse().ok()?, 0)?;
    let local_date = now.with_timezone(tz).date_naive();
    local_to_utc(&local_date.and_time(time), tz)
}

/// Calendar date of `text` (`YYYY-MM-DD` or any accepted datetime) in `tz`
pub fn parse_date_in<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
        return Some(d);
    }
    parse_str_in(text.trim(), tz).map(|dt| dt.with_timezone(tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_rfc3339_and_naive_forms() {
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02T10:00:00+02:00"), &Utc),
            Some(utc(2025, 6, 2, 8, 0))
        );
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02T10:00"), &Utc),
            Some(utc(2025, 6, 2, 10, 0))
        );
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02 10:30"), &Utc),
            Some(utc(2025, 6, 2, 10, 30))
        );
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02T10:30Z"), &Utc),
            Some(utc(2025, 6, 2, 10, 30))
        );
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02"), &Utc),
            Some(utc(2025, 6, 2, 0, 0))
        );
    }

    #[test]
    fn test_naive_uses_zone() {
        let berlin_summer = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            parse_datetime_in(&json!("2025-06-02T10:00"), &berlin_summer),
            Some(utc(2025, 6, 2, 8, 0))
        );
    }

    #[test]
    fn test_unparseable_values() {
        assert_eq!(parse_datetime_in(&json!("Thursday 15:00"), &Utc), None);
        assert_eq!(parse_datetime_in(&json!(""), &Utc), None);
        assert_eq!(parse_datetime_in(&Value::Null, &Utc), None);
        assert_eq!(parse_datetime_in(&json!(true), &Utc), None);
    }

    #[test]
    fn test_millis_value() {
        let dt = utc(2025, 6, 2, 10, 0);
        assert_eq!(
            parse_datetime_in(&json!(dt.timestamp_millis()), &Utc),
            Some(dt)
        );
    }

    #[test]
    fn test_day_helpers() {
        let now = utc(2025, 6, 2, 15, 45);
        assert_eq!(start_of_day_in(now, &Utc), utc(2025, 6, 2, 0, 0));

        let (start, end) = day_bounds_in(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), &Utc).unwrap();
        assert_eq!(start, utc(2025, 6, 2, 0, 0));
        assert_eq!(end, utc(2025, 6, 3, 0, 0) - Duration::milliseconds(1));

        assert_eq!(time_of_day_in("16:30", now, &Utc), Some(utc(2025, 6, 2, 16, 30)));
        assert_eq!(time_of_day_in("25:00", now, &Utc), None);
        assert_eq!(time_of_day_in("soon", now, &Utc), None);

        assert_eq!(
            parse_date_in("2025-06-03", &Utc),
            NaiveDate::from_ymd_opt(2025, 6, 3)
        );
        assert_eq!(
            parse_date_in("2025-06-03T23:30:00-02:00", &Utc),
            NaiveDate::from_ymd_opt(2025, 6, 4)
        );
    }
}
