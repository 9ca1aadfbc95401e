use crate::models::{Lead, TimeWindow};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Parses the timestamp shapes found in the lead sheet. Offset-less values are
/// read as wall-clock time in `tz`.
pub fn parse_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(tz));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(tz));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;

    tz.from_local_datetime(&naive).earliest()
}

/// Milliseconds since the epoch, for ordering. Offset-less values are read as UTC.
pub fn timestamp_millis(raw: &str) -> Option<i64> {
    parse_timestamp(raw, &Utc).map(|at| at.timestamp_millis())
}

/// Midnight of the most recent Sunday on or before `today`.
pub fn start_of_week(today: NaiveDate) -> NaiveDateTime {
    let back = u64::from(today.weekday().num_days_from_sunday());
    today
        .checked_sub_days(Days::new(back))
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
}

/// Whether `timestamp` falls inside `window` as seen from `now`. Calendar
/// comparisons happen in `now`'s zone. Unparseable timestamps only match
/// [`TimeWindow::All`].
pub fn classify<Tz: TimeZone>(timestamp: &str, window: TimeWindow, now: &DateTime<Tz>) -> bool {
    if window == TimeWindow::All {
        return true;
    }
    let Some(at) = parse_timestamp(timestamp, &now.timezone()) else {
        return false;
    };

    let today = now.date_naive();
    let day = at.date_naive();
    match window {
        TimeWindow::Today => day == today,
        TimeWindow::Week => at.naive_local() >= start_of_week(today),
        TimeWindow::Month => day.year() == today.year() && day.month() == today.month(),
        TimeWindow::All => true,
    }
}

pub fn filter_leads<Tz: TimeZone>(leads: &[Lead], window: TimeWindow, now: &DateTime<Tz>) -> Vec<Lead> {
    leads
        .iter()
        .filter(|lead| classify(&lead.timestamp, window, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{classify, parse_timestamp, start_of_week, timestamp_millis};
    use crate::models::TimeWindow;
    use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, TimeZone};

    fn dubai_now() -> DateTime<FixedOffset> {
        // Wednesday
        FixedOffset::east_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 21, 10, 0, 0)
            .unwrap()
    }

    #[test]
    fn today_is_bounded_by_local_midnight() {
        let now = dubai_now();
        assert!(classify("2026-10-21T00:00:00+04:00", TimeWindow::Today, &now));
        assert!(classify("2026-10-21T23:59:59+04:00", TimeWindow::Today, &now));
        assert!(!classify("2026-10-20T23:59:59+04:00", TimeWindow::Today, &now));
        assert!(!classify("2026-10-22T00:00:01+04:00", TimeWindow::Today, &now));
        // 21:00 UTC on the 20th is 01:00 on the 21st in Dubai
        assert!(classify("2026-10-20T21:00:00.000Z", TimeWindow::Today, &now));
    }

    #[test]
    fn week_starts_on_sunday_midnight() {
        let now = dubai_now();
        assert!(classify("2026-10-18T00:00:00+04:00", TimeWindow::Week, &now));
        assert!(!classify("2026-10-17T23:59:59+04:00", TimeWindow::Week, &now));
        assert!(classify("2026-10-21T09:00:00+04:00", TimeWindow::Week, &now));

        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(start_of_week(sunday), sunday.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn month_compares_calendar_month_and_year() {
        let now = dubai_now();
        assert!(classify("2026-10-01T00:00:00+04:00", TimeWindow::Month, &now));
        assert!(!classify("2026-09-30T23:59:59+04:00", TimeWindow::Month, &now));
        assert!(!classify("2025-10-15T12:00:00+04:00", TimeWindow::Month, &now));
    }

    #[test]
    fn malformed_timestamps_only_match_all() {
        let now = dubai_now();
        for window in [TimeWindow::Today, TimeWindow::Week, TimeWindow::Month] {
            assert!(!classify("not a date", window, &now));
            assert!(!classify("", window, &now));
        }
        assert!(classify("not a date", TimeWindow::All, &now));
    }

    #[test]
    fn sheet_style_timestamps_are_local() {
        let now = dubai_now();
        assert!(classify("10/21/2026 08:15:00", TimeWindow::Today, &now));
        assert!(classify("2026-10-21 08:15:00", TimeWindow::Today, &now));
        let parsed = parse_timestamp("2026-10-21 08:15:00", &now.timezone()).expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2026-10-21T08:15:00+04:00");
    }

    #[test]
    fn host_zone_resolves_offset_per_timestamp_date() {
        for raw in ["2026-01-15 23:30:00", "2026-07-15 23:30:00"] {
            let naive = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap();
            let parsed = parse_timestamp(raw, &Local).expect("parse");
            assert_eq!(parsed.naive_local(), naive);
            let expected = Local.from_local_datetime(&naive).earliest().expect("local time");
            assert_eq!(parsed.offset().fix(), expected.offset().fix());

            let now = expected + chrono::Duration::minutes(10);
            assert!(classify(raw, TimeWindow::Today, &now));
        }
    }

    #[test]
    fn millis_orders_mixed_formats() {
        let earlier = timestamp_millis("2026-10-20T10:00:00Z").expect("iso");
        let later = timestamp_millis("2026-10-21 10:00:00").expect("naive");
        assert!(later > earlier);
        assert!(timestamp_millis("garbage").is_none());
    }
}
