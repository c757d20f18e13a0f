//! Parsing and formatting of instants, intervals and durations.
//!
//! Stored values use one canonical form, `YYYY-MM-DDTHH:MM`, with `:SS`
//! appended only when the seconds are non-zero. Canonical strings sort
//! lexically in chronological order, which the row store relies on when it
//! compares them. A date range is stored as `start/end`.
//!
//! User input is more forgiving: US-style dates, 12-hour clocks, `today` and
//! relative `now+2h` forms are accepted. Parsing relative forms needs a
//! reference time, which is the only state a [`TemporalParser`] holds.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

const STORED_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const STORED_SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Full instants, second resolution.
const INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%y %I:%M:%S%p",
    "%m/%d/%Y %I:%M:%S%p",
];

/// Instants naming a whole minute.
const MINUTE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %I:%M%p",
    "%m/%d/%Y %I:%M%p",
];

/// Dates naming a whole day.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhd])$").expect("valid duration pattern"));

static RELATIVE_NOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^now\s*([-+])\s*(\d+[smhd])$").expect("valid relative pattern")
});

static MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(\s.*)?$").expect("valid month/day pattern"));

static HOUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(\d{1,2})\s*(am|pm)?$").expect("valid hour pattern")
});

/// A half-open span of time `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Inclusive start
    pub start: NaiveDateTime,
    /// Exclusive end
    pub end: NaiveDateTime,
}

impl Interval {
    /// Span of `length` beginning at `start`, or `None` when the end falls
    /// outside the representable range
    #[must_use]
    pub fn starting_at(start: NaiveDateTime, length: Duration) -> Option<Self> {
        Some(Self {
            start,
            end: start.checked_add_signed(length)?,
        })
    }
}

/// Format an instant in stored form
#[must_use]
pub fn format_instant(instant: NaiveDateTime) -> String {
    if instant.second() == 0 {
        instant.format(STORED_MINUTE_FORMAT).to_string()
    } else {
        instant.format(STORED_SECOND_FORMAT).to_string()
    }
}

/// Format an interval as a stored date-range cell
#[must_use]
pub fn format_interval(interval: &Interval) -> String {
    format!(
        "{}/{}",
        format_instant(interval.start),
        format_instant(interval.end)
    )
}

/// Parse an instant in stored form; a bare date means midnight
#[must_use]
pub fn parse_stored_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, STORED_SECOND_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, STORED_MINUTE_FORMAT))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Split a stored date-range cell into its raw endpoints
#[must_use]
pub fn split_stored_interval(value: &str) -> Option<(&str, &str)> {
    let (start, end) = value.split_once('/')?;
    if end.contains('/') {
        return None;
    }
    Some((start.trim(), end.trim()))
}

/// Parse a stored date-range cell
#[must_use]
pub fn parse_stored_interval(value: &str) -> Option<Interval> {
    let (start, end) = split_stored_interval(value)?;
    Some(Interval {
        start: parse_stored_instant(start)?,
        end: parse_stored_instant(end)?,
    })
}

/// Parse a duration such as `30m`, `2h`, `45s` or `1d`
#[must_use]
pub fn parse_duration(input: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(input.trim())?;
    let quantity: i64 = caps[1].parse().ok()?;
    let unit_seconds = match &caps[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return None,
    };
    quantity
        .checked_mul(unit_seconds)
        .and_then(Duration::try_seconds)
}

/// Parses user-typed dates relative to a fixed reference time.
#[derive(Debug, Clone, Copy)]
pub struct TemporalParser {
    now: NaiveDateTime,
}

impl TemporalParser {
    /// Parser resolving `now`, `today` and yearless dates against `now`
    #[must_use]
    pub const fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Reference time
    #[must_use]
    pub const fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Parse a single point in time
    #[must_use]
    pub fn parse_instant(&self, input: &str) -> Option<NaiveDateTime> {
        let input = input.trim();
        if let Some(instant) = self.with_default_year(input, |s| parse_with(s, INSTANT_FORMATS)) {
            return Some(instant);
        }
        if input.eq_ignore_ascii_case("now") {
            return Some(self.now);
        }
        let caps = RELATIVE_NOW_RE.captures(input)?;
        let delta = parse_duration(&caps[2])?;
        if &caps[1] == "-" {
            self.now.checked_sub_signed(delta)
        } else {
            self.now.checked_add_signed(delta)
        }
    }

    /// Parse a span of time: an explicit `start/end` pair, or a minute, hour
    /// or day named by its coarsest given field
    #[must_use]
    pub fn parse_interval(&self, input: &str) -> Option<Interval> {
        let input = input.trim();
        if let Some(interval) = parse_stored_interval(input) {
            return Some(interval);
        }
        if let Some(start) = self.with_default_year(input, |s| parse_with(s, MINUTE_FORMATS)) {
            return Interval::starting_at(start, Duration::minutes(1));
        }
        if let Some(start) = self.parse_hour(input) {
            return Interval::starting_at(start, Duration::hours(1));
        }
        if let Some(day) = self.parse_day(input) {
            return Interval::starting_at(day.and_time(NaiveTime::MIN), Duration::days(1));
        }
        None
    }

    fn parse_day(&self, input: &str) -> Option<NaiveDate> {
        let today = self.now.date();
        match input.to_ascii_lowercase().as_str() {
            "today" => return Some(today),
            "yesterday" => return today.pred_opt(),
            "tomorrow" | "tmw" => return today.succ_opt(),
            _ => {},
        }
        self.with_default_year(input, |s| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        })
    }

    fn parse_hour(&self, input: &str) -> Option<NaiveDateTime> {
        let caps = HOUR_RE.captures(input)?;
        let day = self.parse_day(caps[1].trim())?;
        let hour: u32 = caps[2].parse().ok()?;
        let hour = match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
            None => hour,
            Some(_) if !(1..=12).contains(&hour) => return None,
            Some(meridiem) if meridiem == "am" => hour % 12,
            Some(_) => hour % 12 + 12,
        };
        day.and_hms_opt(hour, 0, 0)
    }

    /// Run `parse` on the input, and again with the reference year filled in
    /// when the input starts with a bare `M/D`
    fn with_default_year<T>(&self, input: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        if let Some(value) = parse(input) {
            return Some(value);
        }
        let caps = MONTH_DAY_RE.captures(input)?;
        let rest = caps.get(3).map_or("", |m| m.as_str());
        let dated = format!("{}/{}/{}{}", &caps[1], &caps[2], self.now.format("%Y"), rest);
        parse(&dated)
    }
}

fn parse_with(input: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(input, f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_stored_instant(s).unwrap()
    }

    fn parser() -> TemporalParser {
        TemporalParser::new(at("2024-01-10T12:30"))
    }

    #[test]
    fn test_format_instant_omits_zero_seconds() {
        assert_eq!(format_instant(at("2024-01-10T09:00")), "2024-01-10T09:00");
        assert_eq!(format_instant(at("2024-01-10T09:00:15")), "2024-01-10T09:00:15");
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_duration("2h"), Some(Duration::hours(2)));
        assert_eq!(parse_duration("45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_duration("1d"), Some(Duration::days(1)));
        assert_eq!(parse_duration("0m"), Some(Duration::zero()));
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("3w"), None);
        assert_eq!(parse_duration("-3m"), None);
    }

    #[test]
    fn test_parse_instant_forms() {
        let p = parser();
        assert_eq!(p.parse_instant("2024-02-01T08:15:30"), Some(at("2024-02-01T08:15:30")));
        assert_eq!(p.parse_instant("2/1/2024 08:15:30"), Some(at("2024-02-01T08:15:30")));
        assert_eq!(p.parse_instant("2/1/24 8:15:30pm"), Some(at("2024-02-01T20:15:30")));
        assert_eq!(p.parse_instant("2/1 08:15:30"), Some(at("2024-02-01T08:15:30")));
        assert_eq!(p.parse_instant("now"), Some(at("2024-01-10T12:30")));
        assert_eq!(p.parse_instant("now + 2h"), Some(at("2024-01-10T14:30")));
        assert_eq!(p.parse_instant("now-30m"), Some(at("2024-01-10T12:00")));
        assert_eq!(p.parse_instant("lunch"), None);
    }

    #[test]
    fn test_parse_interval_resolutions() {
        let p = parser();
        let minute = p.parse_interval("2024-01-10T09:00").unwrap();
        assert_eq!(minute.end - minute.start, Duration::minutes(1));

        let hour = p.parse_interval("1/10/2024 9pm").unwrap();
        assert_eq!(hour.start, at("2024-01-10T21:00"));
        assert_eq!(hour.end, at("2024-01-10T22:00"));

        let day = p.parse_interval("2024-01-11").unwrap();
        assert_eq!(day.start, at("2024-01-11T00:00"));
        assert_eq!(day.end, at("2024-01-12T00:00"));

        let tomorrow = p.parse_interval("tmw").unwrap();
        assert_eq!(tomorrow.start, at("2024-01-11T00:00"));

        let yearless = p.parse_interval("3/4").unwrap();
        assert_eq!(yearless.start, at("2024-03-04T00:00"));
    }

    #[test]
    fn test_parse_interval_explicit_pair() {
        let p = parser();
        let interval = p.parse_interval("2024-01-10T09:00/2024-01-10T10:00").unwrap();
        assert_eq!(format_interval(&interval), "2024-01-10T09:00/2024-01-10T10:00");
    }

    #[test]
    fn test_full_instant_is_not_an_interval() {
        assert!(parser().parse_interval("2024-01-10T09:00:30").is_none());
    }

    #[test]
    fn test_interval_past_the_last_representable_day_is_refused() {
        let p = parser();
        assert!(p.parse_interval("+262142-12-31").is_none());
        assert!(p.parse_interval("+262142-12-31T23:59").is_none());
        assert!(p.parse_interval("+262142-12-31 11pm").is_none());
        assert!(Interval::starting_at(NaiveDateTime::MAX, Duration::seconds(1)).is_none());
    }

    #[test]
    fn test_split_stored_interval_rejects_extra_separators() {
        assert_eq!(split_stored_interval("a/b"), Some(("a", "b")));
        assert_eq!(split_stored_interval("a/b/c"), None);
        assert_eq!(split_stored_interval("ab"), None);
    }
}
