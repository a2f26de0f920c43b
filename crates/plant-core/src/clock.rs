//! Wall clock and local calendar
//!
//! Watering dates are stored in UTC but compared as local calendar dates.
//! `Clock` makes "now" injectable, `LocalZone` decides what "local" means.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's real-time clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock set to midnight UTC on the given date
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default();
        Self::new(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Time zone used to turn instants into calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// The host system's zone
    #[default]
    Host,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl LocalZone {
    /// UTC itself
    pub fn utc() -> Self {
        LocalZone::Fixed(Utc.fix())
    }

    /// Calendar date of `instant` in this zone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            LocalZone::Host => instant.with_timezone(&Local).date_naive(),
            LocalZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// First instant of `date` in this zone
    ///
    /// Falls back to midnight UTC when local midnight does not exist (a DST
    /// gap at 00:00).
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(chrono::NaiveTime::MIN);
        let local = match self {
            LocalZone::Host => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
            LocalZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
        };
        local.unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }

    /// First instant of the day after the one containing `instant`
    pub fn next_midnight(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = self
            .date_of(instant)
            .succ_opt()
            .unwrap_or(NaiveDate::MAX);
        self.start_of_day(tomorrow)
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalZone::Host => write!(f, "host"),
            LocalZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Parse a `±HH:MM` offset (`Z` is accepted for UTC)
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a stored or user-supplied timestamp
///
/// Accepts RFC 3339 date-times and bare `YYYY-MM-DD` dates. A bare date means
/// the start of that day in `zone`.
pub fn parse_timestamp(s: &str, zone: &LocalZone) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|date| zone.start_of_day(date))
}

/// Format a timestamp the way it is stored
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}
