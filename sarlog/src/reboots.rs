/// Scanner for restart markers in sar logs.
///
/// When the collector comes up after a reboot it writes a line like this into every report block
/// that it is part of:
///
///   01:30:01 PM       LINUX RESTART      (4 CPU)
///
/// The scanner knows nothing about sections; it looks only for the literal marker in the fourth
/// field.  It runs its own clock over the restart lines alone, so the dates of the events are only
/// as good as the restart lines make them.
use crate::clock::ClockState;
use crate::dates::Timestamp;
use crate::error::Result;
use crate::logfile::{is_ignorable, open_logfile, LineReader};

use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use ustr::Ustr;

pub const RESTART_MARKER: &str = "RESTART";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebootEvent {
    pub timestamp: Timestamp,

    /// The field before the marker, normally the OS name.
    pub origin: Ustr,

    /// The marker itself.
    pub action: Ustr,

    /// The rest of the line, eg "(4 CPU)".  May be empty.
    pub detail: String,
}

/// True iff the tokenized line is a restart marker line.

pub fn is_restart_marker(tokens: &[&str]) -> bool {
    tokens.len() >= 4 && tokens[3] == RESTART_MARKER
}

pub fn scan_reboots<P: AsRef<Path>>(file_name: P) -> Result<Vec<RebootEvent>> {
    let file_name = file_name.as_ref();
    tracing::debug!(file = %file_name.display(), "Scanning for reboots");
    let mut reader = open_logfile(file_name)?;
    scan_reboot_lines(&mut reader)
}

/// Find the restart events in a stream holding the text of a log file, in file order.  Fails only
/// if the start date cannot be decoded or on I/O errors; lines whose time cannot be decoded are
/// skipped.

pub fn scan_reboot_lines(reader: &mut dyn BufRead) -> Result<Vec<RebootEvent>> {
    let mut lines = LineReader::new(reader);
    let mut clock = ClockState::new(lines.start_date()?);
    let mut events = vec![];
    while let Some(line) = lines.next_line()? {
        if is_ignorable(&line) {
            continue;
        }
        let tokens = line.split_whitespace().collect::<Vec<&str>>();
        if !is_restart_marker(&tokens) {
            continue;
        }
        match clock.reconstruct(tokens[0], tokens[1]) {
            Some(timestamp) => events.push(RebootEvent {
                timestamp,
                origin: Ustr::from(tokens[2]),
                action: Ustr::from(tokens[3]),
                detail: tokens[4..].join(" "),
            }),
            None => {
                tracing::trace!(line = %line, "Dropping restart line with bad time");
            }
        }
    }
    Ok(events)
}

#[cfg(test)]
use crate::dates::format_timestamp;

#[cfg(test)]
use crate::error::SarError;

#[cfg(test)]
fn scan_text(text: &str) -> Result<Vec<RebootEvent>> {
    let mut bs = text.as_bytes();
    scan_reboot_lines(&mut bs)
}

#[test]
fn test_one_reboot() {
    let text = "Linux 5.15.0 (node7) 2024-03-02 _x86_64_ (8 CPU)\n\n\
                12:00:01 AM    proc/s   cswch/s\n\
                12:10:01 AM      1.00    100.00\n\
                03:15:42 AM       LINUX RESTART\t(8 CPU)\n\
                03:20:01 AM    proc/s   cswch/s\n";
    let events = scan_text(text).unwrap();
    assert!(events.len() == 1);
    assert!(format_timestamp(&events[0].timestamp) == "2024-03-02T03:15:42");
    assert!(events[0].origin.as_str() == "LINUX");
    assert!(events[0].action.as_str() == "RESTART");
    assert!(events[0].detail == "(8 CPU)");
}

#[test]
fn test_no_reboots() {
    let text = "Linux 5.15.0 (node7) 2024-03-02 _x86_64_ (8 CPU)\n\
                12:00:01 AM    proc/s   cswch/s\n\
                12:10:01 AM      1.00    100.00\n\
                12:10:01 AM      RESTART\n\
                Average:     LINUX RESTART\n";
    assert!(scan_text(text).unwrap().is_empty());
}

#[test]
fn test_reboot_rollover() {
    // The clock sees only restart lines
    let text = "Linux 5.15.0 (node7) 24-03-02 _x86_64_ (8 CPU)\n\
                11:40:01 PM       LINUX RESTART\n\
                11:50:01 PM      1.00    100.00\n\
                12:30:01 AM       LINUX RESTART\t(8 CPU)\n\
                1x:30:01 AM       LINUX RESTART\n";
    let events = scan_text(text).unwrap();
    assert!(events.len() == 2);
    assert!(format_timestamp(&events[0].timestamp) == "2024-03-02T23:40:01");
    assert!(events[0].detail == "");
    assert!(format_timestamp(&events[1].timestamp) == "2024-03-03T00:30:01");
}

#[test]
fn test_reboot_files() {
    let events = scan_reboots("../tests/sarlog/data/system1/sar15").unwrap();
    assert!(
        events
            .iter()
            .map(|e| format_timestamp(&e.timestamp))
            .collect::<Vec<String>>()
            == vec!["2024-01-15T00:00:01", "2024-01-15T13:30:01"]
    );
    let events = scan_reboots("../tests/sarlog/data/system2/sar15").unwrap();
    assert!(
        events
            .iter()
            .map(|e| format_timestamp(&e.timestamp))
            .collect::<Vec<String>>()
            == vec!["2024-01-15T23:40:01", "2024-01-16T00:30:01"]
    );
    match scan_reboots("../tests/sarlog/data/system1/sar01") {
        Err(SarError::FileNotFound(p)) => assert!(p.ends_with("sar01")),
        _ => assert!(false),
    }
}
