//! Wall-clock access and local day-boundary math.
//!
//! Every "today", "end of business" and sweep-schedule computation goes through
//! the configured zone; stored timestamps are always UTC.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Source of the current time and the zone used for day boundaries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn zone(&self) -> Tz;

    /// Calendar date of `now` in the configured zone.
    fn today(&self) -> NaiveDate {
        local_date(self.zone(), self.now())
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    zone: Tz,
}

impl SystemClock {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> Tz {
        self.zone
    }
}

/// A settable clock for tests and one-off replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    zone: Tz,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            now: Mutex::new(now),
            zone,
        }
    }

    /// Fixed clock at a local wall-clock time in `zone`.
    pub fn at_local(zone: Tz, date: NaiveDate, hour: u32, minute: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        Self::new(local_to_utc(zone, date.and_time(time)), zone)
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

    fn zone(&self) -> Tz {
        self.zone
    }
}

/// Calendar date of an instant in `zone`.
pub fn local_date(zone: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// Convert a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times inside
/// a spring-forward gap move to the first valid instant after the gap.
pub fn local_to_utc(zone: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => local_to_utc(zone, naive + Duration::minutes(30)),
    }
}

/// First instant of `date` in `zone`.
pub fn start_of_day(zone: Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(zone, date.and_time(NaiveTime::MIN))
}

/// Last millisecond of `date` in `zone`.
pub fn end_of_day(zone: Tz, date: NaiveDate) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => start_of_day(zone, next) - Duration::milliseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// `hour:00` local on the calendar day `instant` falls on.
pub fn at_local_hour(zone: Tz, instant: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let date = local_date(zone, instant);
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    local_to_utc(zone, date.and_time(time))
}

/// Next `hour:00` local strictly after `now`.
pub fn next_local_hour(zone: Tz, now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = at_local_hour(zone, now, hour);
    if today > now {
        return today;
    }
    let tomorrow = local_date(zone, now)
        .succ_opt()
        .unwrap_or(NaiveDate::MAX);
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    local_to_utc(zone, tomorrow.and_time(time))
}
