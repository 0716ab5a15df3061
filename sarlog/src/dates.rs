/// Types and utilities for dates and timestamps in sar logs.
///
/// sar logs carry a single calendar date, on the first line of the file, and every record after that
/// carries only a 12-hour wall clock time.  Timestamps are therefore naive: there is no time zone
/// information anywhere in the input, and we do not invent one.
use crate::error::{Result, SarError};

use chrono::{Duration, NaiveDate, NaiveDateTime};

pub type Timestamp = NaiveDateTime;

/// Accepted formats for the start date, in priority order.  Note "%y" must precede "%Y" so that
/// "24-01-15" is the year 2024 and not the year 24.

pub const START_DATE_FORMATS: [&str; 4] = ["%y-%m-%d", "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// The rendering of timestamps in tables and reports.

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse the date at which a sar collection started.  The first format in START_DATE_FORMATS that
/// accepts the text wins; ambiguous dates like 01/02/2024 are thus month/day.

pub fn parse_start_date(text: &str) -> Result<NaiveDate> {
    for fmt in START_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(d);
        }
    }
    Err(SarError::UnrecognizedDateFormat(text.to_string()))
}

/// Extract the start date from the first line of a log file, which looks like this:
///
///   Linux 3.10.0-1160.el7.x86_64 (host.example.com)   01/15/2024   _x86_64_  (4 CPU)
///
/// Only the fourth whitespace-separated field is used.  A line without a fourth field is reported
/// as an unrecognized date, with the entire line as the payload.

pub fn parse_preamble(line: &str) -> Result<NaiveDate> {
    match line.split_whitespace().nth(3) {
        Some(date) => parse_start_date(date),
        None => Err(SarError::UnrecognizedDateFormat(line.trim_end().to_string())),
    }
}

pub fn add_day(d: NaiveDate) -> NaiveDate {
    d + Duration::days(1)
}

pub fn format_timestamp(t: &Timestamp) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_start_date_formats() {
    assert!(parse_start_date("24-01-15").unwrap() == ymd(2024, 1, 15));
    assert!(parse_start_date("2024-01-15").unwrap() == ymd(2024, 1, 15));
    assert!(parse_start_date("01/15/2024").unwrap() == ymd(2024, 1, 15));
    // Not a valid month/day, so falls through to day/month
    assert!(parse_start_date("15/01/2024").unwrap() == ymd(2024, 1, 15));
    // Ambiguous, month/day wins
    assert!(parse_start_date("02/03/2024").unwrap() == ymd(2024, 2, 3));
}

#[test]
fn test_start_date_errors() {
    match parse_start_date("13/13/2024") {
        Err(SarError::UnrecognizedDateFormat(s)) => assert!(s == "13/13/2024"),
        _ => assert!(false),
    }
    assert!(parse_start_date("").is_err());
    assert!(parse_start_date("Jan 15 2024").is_err());
    assert!(parse_start_date("2024.01.15").is_err());
}

#[test]
fn test_preamble() {
    let line = "Linux 3.10.0-1160.el7.x86_64 (node1.example.com) \t01/15/2024 \t_x86_64_\t(4 CPU)\n";
    assert!(parse_preamble(line).unwrap() == ymd(2024, 1, 15));
    match parse_preamble("Linux 3.10.0\n") {
        Err(SarError::UnrecognizedDateFormat(s)) => assert!(s == "Linux 3.10.0"),
        _ => assert!(false),
    }
    assert!(parse_preamble("").is_err());
}

#[test]
fn test_add_day() {
    assert!(add_day(ymd(2024, 2, 28)) == ymd(2024, 2, 29));
    assert!(add_day(ymd(2023, 12, 31)) == ymd(2024, 1, 1));
    let t = ymd(2024, 1, 15).and_hms_opt(13, 5, 9).unwrap();
    assert!(format_timestamp(&t) == "2024-01-15T13:05:09");
}
