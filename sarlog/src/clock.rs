/// Reconstruct absolute timestamps from the 12-hour wall clock times in sar records.
///
/// A sar file has one start date, and every record has a time like `11:59:01 PM`.  Files that run
/// past midnight just keep going with `12:00:01 AM`, so the date has to be inferred: we remember if
/// we have seen a PM record, and the first AM record after that moves the date forward by one day.
///
/// This models exactly one midnight crossing per PM-then-AM cycle.  A file that spans several
/// midnights is handled correctly only if it has AM and PM records on each of the days; there is no
/// attempt to do better than that, as the input has no other information to go by.
use crate::dates::{add_day, Timestamp};

use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl FromStr for Meridiem {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Meridiem, ()> {
        match s {
            "AM" => Ok(Meridiem::Am),
            "PM" => Ok(Meridiem::Pm),
            _ => Err(()),
        }
    }
}

impl Meridiem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

/// Parse "hh:mm:ss" together with its marker into a 24-hour time.  Returns None if either part is
/// malformed.

pub fn parse_clock_time(time: &str, meridiem: &str) -> Option<NaiveTime> {
    let m = Meridiem::from_str(meridiem).ok()?;
    NaiveTime::parse_from_str(&format!("{} {}", time, m.as_str()), "%I:%M:%S %p").ok()
}

/// The rollover state for a single pass over a single file.  Each pass owns its clock; clocks are
/// never shared between passes or files.

#[derive(Debug, Clone)]
pub struct ClockState {
    current_date: NaiveDate,
    saw_pm: bool,
}

impl ClockState {
    pub fn new(start_date: NaiveDate) -> ClockState {
        ClockState {
            current_date: start_date,
            saw_pm: false,
        }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// Produce the absolute timestamp for a record with the given time and marker, advancing the
    /// date if this record crosses midnight.  The time and marker are validated before the state
    /// is touched, so a malformed record (None) leaves the clock as it was.

    pub fn reconstruct(&mut self, time: &str, meridiem: &str) -> Option<Timestamp> {
        let t = parse_clock_time(time, meridiem)?;
        match Meridiem::from_str(meridiem) {
            Ok(Meridiem::Pm) => {
                self.saw_pm = true;
            }
            Ok(Meridiem::Am) => {
                if self.saw_pm {
                    self.current_date = add_day(self.current_date);
                    self.saw_pm = false;
                    tracing::debug!(date = %self.current_date, "Day rollover");
                }
            }
            Err(_) => return None,
        }
        Some(self.current_date.and_time(t))
    }
}

#[cfg(test)]
use crate::dates::format_timestamp;

#[cfg(test)]
fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

#[test]
fn test_clock_times() {
    assert!(parse_clock_time("12:00:01", "AM") == NaiveTime::from_hms_opt(0, 0, 1));
    assert!(parse_clock_time("12:30:00", "PM") == NaiveTime::from_hms_opt(12, 30, 0));
    assert!(parse_clock_time("01:10:00", "PM") == NaiveTime::from_hms_opt(13, 10, 0));
    assert!(parse_clock_time("11:59:59", "PM") == NaiveTime::from_hms_opt(23, 59, 59));
    assert!(parse_clock_time("13:00:00", "PM").is_none());
    assert!(parse_clock_time("01:10", "PM").is_none());
    assert!(parse_clock_time("01:10:00", "pm").is_none());
    assert!(parse_clock_time("01:10:00", "XM").is_none());
}

// The midnight crossing from the documentation of the format: two PM records dated D, two AM
// records dated D+1.

#[test]
fn test_rollover() {
    let mut clock = ClockState::new(start());
    let stamps = [
        ("11:58:00", "PM"),
        ("11:59:00", "PM"),
        ("12:01:00", "AM"),
        ("12:02:00", "AM"),
    ]
    .iter()
    .map(|(t, m)| format_timestamp(&clock.reconstruct(t, m).unwrap()))
    .collect::<Vec<String>>();
    assert!(
        stamps
            == vec![
                "2024-01-15T23:58:00",
                "2024-01-15T23:59:00",
                "2024-01-16T00:01:00",
                "2024-01-16T00:02:00"
            ]
    );
}

#[test]
fn test_no_rollover_without_pm() {
    let mut clock = ClockState::new(start());
    clock.reconstruct("12:00:01", "AM").unwrap();
    clock.reconstruct("11:50:01", "AM").unwrap();
    assert!(clock.current_date() == start());
    clock.reconstruct("12:00:01", "PM").unwrap();
    assert!(clock.current_date() == start());
}

#[test]
fn test_rollover_once_per_cycle() {
    let mut clock = ClockState::new(start());
    clock.reconstruct("10:00:00", "PM").unwrap();
    clock.reconstruct("01:00:00", "AM").unwrap();
    clock.reconstruct("02:00:00", "AM").unwrap();
    assert!(clock.current_date() == NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    clock.reconstruct("03:00:00", "PM").unwrap();
    let t = clock.reconstruct("04:00:00", "AM").unwrap();
    assert!(format_timestamp(&t) == "2024-01-17T04:00:00");
}

#[test]
fn test_malformed_leaves_clock_alone() {
    let mut clock = ClockState::new(start());
    clock.reconstruct("11:00:00", "PM").unwrap();
    // A bad time with an AM marker must not consume the pending rollover
    assert!(clock.reconstruct("99:00:00", "AM").is_none());
    assert!(clock.current_date() == start());
    let t = clock.reconstruct("12:10:00", "AM").unwrap();
    assert!(format_timestamp(&t) == "2024-01-16T00:10:00");
}
