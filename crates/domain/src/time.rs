//! Time and timestamp helpers.
//!
//! Every instant the scheduler handles is zoned: day arithmetic is done on
//! the local calendar date and wall-clock time, then re-resolved in the
//! zone, so a daylight-saving jump never drifts a 19:01 entry to 20:01.

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Zoned timestamp used for every schedule instant.
pub type Timestamp = DateTime<Tz>;

/// Return the current time in `tz`.
#[must_use]
pub fn now_in(tz: Tz) -> Timestamp {
    Utc::now().with_timezone(&tz)
}

/// Resolve a local wall-clock time on `date` to an instant.
///
/// Ambiguous times (autumn fold) take the earlier instant. Times that do not
/// exist (spring gap) move forward past the gap, like setting the hour on a
/// calendar would.
#[must_use]
pub fn local_at(tz: Tz, date: NaiveDate, time: NaiveTime) -> Timestamp {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at,
        LocalResult::None => (1..=3)
            .find_map(|hours| {
                tz.from_local_datetime(&(naive + TimeDelta::hours(hours)))
                    .earliest()
            })
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Move an instant by whole days, keeping its local hour and minute.
#[must_use]
pub fn shift_days(at: Timestamp, days: i64) -> Timestamp {
    let date = at
        .date_naive()
        .checked_add_signed(TimeDelta::days(days))
        .unwrap_or_else(|| at.date_naive());
    local_at(at.timezone(), date, at.time())
}

/// Drop seconds and sub-seconds; the scheduler works in whole minutes.
#[must_use]
pub fn truncate_to_minute(at: Timestamp) -> Timestamp {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Day of week with Sunday as `0`.
#[must_use]
pub fn weekday_index(at: Timestamp) -> u8 {
    // num_days_from_sunday is always 0..=6
    u8::try_from(at.weekday().num_days_from_sunday()).unwrap_or(0)
}

/// Short `Sun 19:01` rendering, `-` when absent.
#[must_use]
pub fn day_and_time(at: Option<Timestamp>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%a %H:%M").to_string())
}

/// Longer `Sun 8-Oct 19:01` rendering, `-` when absent.
#[must_use]
pub fn short_date_time(at: Option<Timestamp>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |t| t.format("%a %-d-%b %H:%M").to_string(),
    )
}
