use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{GoCdError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A wall-clock time of day, parsed from `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || GoCdError::InvalidTimeFormat(value.to_string());

        let parts: Vec<&str> = value.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }

        let mut fields = [0u32; 3];
        for (field, part) in fields.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *field = part.parse().map_err(|_| invalid())?;
        }

        NaiveTime::from_hms_opt(fields[0], fields[1], fields[2])
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Latest occurrence of this time of day that is not after `now`.
    ///
    /// If the time has already passed today, today's occurrence is returned,
    /// otherwise yesterday's.
    pub fn resolve_in<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> i64 {
        let tz = now.timezone();
        let today = now.date_naive().and_time(self.0);
        let candidate = localize(&tz, today);

        if now.timestamp_millis() >= candidate {
            candidate
        } else {
            localize(&tz, today - Duration::days(1))
        }
    }

    /// Same as [`TimeOfDay::resolve_in`] using the local timezone.
    pub fn resolve(&self, now_ms: i64) -> i64 {
        match Local.timestamp_millis_opt(now_ms) {
            LocalResult::Single(now) | LocalResult::Ambiguous(now, _) => self.resolve_in(&now),
            LocalResult::None => now_ms,
        }
    }
}

/// Resolves an optional `ran_after` input into an epoch-millisecond threshold.
///
/// Missing or blank input means no threshold was requested.
pub fn resolve(time_of_day: Option<&str>, now_ms: i64) -> Result<Option<i64>> {
    match time_of_day.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(TimeOfDay::parse(value)?.resolve(now_ms))),
    }
}

/// Formats epoch milliseconds as a local wall-clock timestamp.
pub fn format_timestamp(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            dt.format(TIMESTAMP_FORMAT).to_string()
        }
        LocalResult::None => epoch_ms.to_string(),
    }
}

fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> i64 {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        // Wall-clock time skipped by a DST transition, use the first valid instant after it
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map_or_else(|| naive.and_utc().timestamp_millis(), |dt| dt.timestamp_millis()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(tz: &FixedOffset, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_time_later_today_resolves_to_yesterday() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = at(&tz, 2024, 5, 10, 13, 15);

        let threshold = TimeOfDay::parse("14:00").unwrap().resolve_in(&now);

        assert_eq!(threshold, at(&tz, 2024, 5, 9, 14, 0).timestamp_millis());
    }

    #[test]
    fn test_time_earlier_today_resolves_to_today() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = at(&tz, 2024, 5, 10, 13, 15);

        let threshold = TimeOfDay::parse("12:00").unwrap().resolve_in(&now);

        assert_eq!(threshold, at(&tz, 2024, 5, 10, 12, 0).timestamp_millis());
    }

    #[test]
    fn test_time_equal_to_now_resolves_to_today() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = at(&tz, 2024, 1, 1, 8, 30);

        let threshold = TimeOfDay::parse("08:30").unwrap().resolve_in(&now);

        assert_eq!(threshold, now.timestamp_millis());
    }

    #[test]
    fn test_crossing_month_boundary() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = at(&tz, 2024, 3, 1, 0, 5);

        let threshold = TimeOfDay::parse("23:59:30").unwrap().resolve_in(&now);

        let expected = tz.with_ymd_and_hms(2024, 2, 29, 23, 59, 30).unwrap();
        assert_eq!(threshold, expected.timestamp_millis());
    }

    #[test]
    fn test_parse_accepts_seconds() {
        assert!(TimeOfDay::parse("07:05:09").is_ok());
        assert!(TimeOfDay::parse(" 7:05 ").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in ["", "14", "14:", "25:00", "12:60", "ab:cd", "1:2:3:4", "-1:00", "12:00pm"] {
            let err = TimeOfDay::parse(input).unwrap_err();
            assert!(
                matches!(err, GoCdError::InvalidTimeFormat(_)),
                "expected InvalidTimeFormat for {input:?}"
            );
        }
    }

    #[test]
    fn test_resolve_without_input_is_no_threshold() {
        assert_eq!(resolve(None, 1_700_000_000_000).unwrap(), None);
        assert_eq!(resolve(Some("  "), 1_700_000_000_000).unwrap(), None);
    }

    #[test]
    fn test_resolve_never_returns_future_threshold() {
        let now_ms = Local::now().timestamp_millis();

        for input in ["00:00", "06:30", "12:00", "18:45", "23:59:59"] {
            let threshold = resolve(Some(input), now_ms).unwrap().unwrap();
            assert!(threshold <= now_ms, "{input} resolved into the future");
            assert!(now_ms - threshold <= 26 * 3600 * 1000, "{input} resolved too far back");
        }
    }

    #[test]
    fn test_resolve_propagates_format_errors() {
        assert!(matches!(
            resolve(Some("noon"), 0),
            Err(GoCdError::InvalidTimeFormat(_))
        ));
    }
}
