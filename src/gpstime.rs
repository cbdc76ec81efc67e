//! GPS time conversions: leap-second table, UTC, and (week, time-of-week)
//! representations.
//!
//! The leap-second table below is a fixed historical record, not something
//! this crate can discover at runtime; a newly declared leap second requires
//! a new release, same as every other GPS-time library.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Epoch of GPS time: 1980-01-06T00:00:00 UTC.
pub fn gps_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 6)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Offset between the UNIX epoch and the GPS epoch, in seconds.
pub const GPS_EPOCH_TO_UNIX_EPOCH: i64 = 315_964_800;

/// Number of seconds in a GPS week.
pub const SECONDS_IN_WEEK: i64 = 604_800;

/// Dates (year, month, day) on which a leap second has been inserted since
/// the GPS epoch. Each entry represents 23:59:60 UTC on that day; consult
/// https://www.timeanddate.com/time/leap-seconds-future.html before adding
/// a new one.
const LEAP_DATES: &[(i32, u32, u32)] = &[
    (1981, 6, 30),
    (1982, 6, 30),
    (1983, 6, 30),
    (1985, 6, 30),
    (1987, 12, 31),
    (1989, 12, 31),
    (1990, 12, 31),
    (1992, 6, 30),
    (1993, 6, 30),
    (1994, 6, 30),
    (1995, 12, 31),
    (1997, 6, 30),
    (1998, 12, 31),
    (2005, 12, 31),
    (2008, 12, 31),
    (2012, 6, 30),
    (2015, 6, 30),
    (2016, 12, 31),
];

fn leap_instant(i: usize) -> NaiveDateTime {
    let (y, m, d) = LEAP_DATES[i];
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap()
}

/// Returns the number of leap seconds inserted since the GPS epoch, up to
/// and including `date`.
pub fn leap_seconds_since_1980(date: NaiveDateTime) -> i64 {
    // Equivalent to Python's `bisect.bisect(LEAP_DATES, date)`: the count of
    // table entries at or before `date`.
    let mut count = 0i64;
    for i in 0..LEAP_DATES.len() {
        if leap_instant(i) <= date {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// Converts a GPS timestamp (seconds since the GPS epoch) into a
/// timezone-aware UTC instant.
pub fn gps_tow_to_utc_from_seconds(timestamp: f64) -> chrono::DateTime<Utc> {
    let date_before_leaps =
        gps_epoch() + chrono::Duration::milliseconds((timestamp * 1000.0).round() as i64);
    let leaps = leap_seconds_since_1980(date_before_leaps);
    let result = date_before_leaps - chrono::Duration::seconds(leaps);
    Utc.from_utc_datetime(&result)
}

/// Converts GPS (week, time-of-week) into a timezone-aware UTC instant.
pub fn gps_tow_to_utc(seconds: f64, week: i64) -> chrono::DateTime<Utc> {
    gps_tow_to_utc_from_seconds(week as f64 * SECONDS_IN_WEEK as f64 + seconds)
}

/// Converts a timezone-aware UTC instant into a GPS timestamp, expressed as
/// seconds since the GPS epoch.
pub fn datetime_to_gps_time(dt: chrono::DateTime<Utc>) -> f64 {
    let naive = dt.naive_utc();
    let leaps = leap_seconds_since_1980(naive);
    let date_before_leaps = naive + chrono::Duration::seconds(leaps);
    (date_before_leaps - gps_epoch()).num_milliseconds() as f64 / 1000.0
}

/// Converts a timezone-aware UTC instant into GPS (week, time-of-week).
pub fn datetime_to_gps_tow(dt: chrono::DateTime<Utc>) -> (i64, f64) {
    let seconds = datetime_to_gps_time(dt);
    let week = (seconds / SECONDS_IN_WEEK as f64).floor() as i64;
    let tow = seconds - (week * SECONDS_IN_WEEK) as f64;
    (week, tow)
}

/// Converts a UNIX timestamp (seconds since 1970-01-01T00:00:00 UTC) into a
/// GPS timestamp.
pub fn unix_to_gps_time(seconds: f64) -> f64 {
    let unix_date = chrono::DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    let leaps = leap_seconds_since_1980(unix_date.naive_utc());
    seconds - GPS_EPOCH_TO_UNIX_EPOCH as f64 + leaps as f64
}

/// Converts a UNIX timestamp into GPS (week, time-of-week). Fractional
/// seconds in the time-of-week are preserved; the leap-second lookup itself
/// truncates to whole seconds.
pub fn unix_to_gps_tow(seconds: f64) -> (i64, f64) {
    let gps_seconds = unix_to_gps_time(seconds);
    let week = (gps_seconds / SECONDS_IN_WEEK as f64).floor() as i64;
    let tow = gps_seconds - (week * SECONDS_IN_WEEK) as f64;
    (week, tow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn gps_tow_to_utc_matches_reference_scenario() {
        let dt = gps_tow_to_utc(138_499.0, 2129);
        assert_eq!(dt, Utc.with_ymd_and_hms(2020, 10, 26, 14, 28, 1).unwrap());
    }

    #[test]
    fn datetime_to_gps_tow_matches_reference_scenario() {
        let dt = Utc.with_ymd_and_hms(2021, 3, 2, 2, 53, 14).unwrap();
        let (week, tow) = datetime_to_gps_tow(dt);
        assert_eq!(week, 2147);
        assert!((tow - 183_212.0).abs() < 1e-6);
    }

    #[test]
    fn leap_seconds_count_is_eighteen_after_2016() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(leap_seconds_since_1980(date), 18);
    }

    #[test]
    fn leap_seconds_count_is_zero_before_first_leap_second() {
        let date = NaiveDate::from_ymd_opt(1981, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(leap_seconds_since_1980(date), 0);
    }

    #[test]
    fn round_trips_through_utc_and_back() {
        let original = Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap();
        let (week, tow) = datetime_to_gps_tow(original);
        let recovered = gps_tow_to_utc(tow, week);
        assert_eq!(recovered, original);
    }
}
