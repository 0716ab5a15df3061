/// A sar log is the text output of the sysstat `sar` reporter: a sequence of report blocks, one per
/// *section* (CPU, TASK, LOAD, network interfaces, ...), for one system and one day.  Every block is
/// introduced by a header line naming its columns, and is followed by *data lines* with the same
/// columns, and usually by an `Average:` line.  Data lines carry a 12-hour wall clock time and an
/// AM/PM marker but no date; the date is on the first line of the file only:
///
///   Linux 3.10.0-1160.el7.x86_64 (node1.example.com)   01/15/2024   _x86_64_  (4 CPU)
///
///   12:00:01 AM     CPU      %usr     %nice      %sys   %iowait    %steal      %irq ...
///   12:10:01 AM     all      1.50      0.00      0.75      0.10      0.00      0.00 ...
///   12:10:01 AM       0      2.00      0.00      1.00      0.20      0.00      0.00 ...
///   ...
///   01:30:01 PM       LINUX RESTART      (4 CPU)
///
///   01:40:01 PM     CPU      %usr     %nice      %sys   %iowait    %steal      %irq ...
///
/// When the collector restarts it writes a restart line and then prints the header again.
///
/// This library has as its task to turn such logs into tables, and breaks down as follows:
///
/// - Know the sections and their headers (sections.rs), and check that the registry is consistent.
///
/// - Parse the start date and reconstruct full timestamps from the 12-hour clock, inferring the
///   midnight crossing (dates.rs, clock.rs).
///
/// - Find the lines belonging to one section, keep the rows for the interesting sub-entities, and
///   assemble them into a table (logfile.rs, table.rs).
///
/// - Find restart events (reboots.rs).
///
/// - Find the log files for a set of systems on a given day (configs.rs, logtree.rs).
///
/// Every parse owns all of its state, so files can be parsed concurrently without coordination.
mod clock;
mod configs;
mod dates;
mod error;
mod load;
mod logfile;
mod logtree;
mod reboots;
mod sections;
mod table;

// Errors that make a file unusable, and a Result type carrying them.

pub use error::Result;
pub use error::SarError;

// Types and utilities for timestamps.

pub use dates::Timestamp;
pub use dates::format_timestamp;
pub use dates::parse_start_date;
pub use dates::START_DATE_FORMATS;

// Rollover tracking for the 12-hour clock.

pub use clock::ClockState;

// The closed set of sections, their schemas, and the startup check of the registry.

pub use sections::lookup;
pub use sections::validate_registry;
pub use sections::validate_schemas;
pub use sections::Section;
pub use sections::SectionSchema;

// The result of parsing a section.

pub use table::Column;
pub use table::ColumnKind;
pub use table::Row;
pub use table::Table;

// Parse one section from a log file, or from any stream holding one.

pub use logfile::parse_logfile;
pub use logfile::parse_section;

// The line classifier underneath parse_section, for clients that drive their own scan.

pub use logfile::is_header_shaped;
pub use logfile::is_ignorable;
pub use logfile::ScanState;
pub use logfile::SectionClassifier;

// Find restart events in a log file, or in any stream holding one.

pub use reboots::scan_reboot_lines;
pub use reboots::scan_reboots;
pub use reboots::RebootEvent;

// Add the derived percentages to a LOAD table.

pub use load::add_load_stats;

// The configured systems, and the log files for a day.

pub use configs::read_from_json;
pub use configs::System;
pub use logtree::find_logfiles;
pub use logtree::logfile_name;
pub use logtree::system_name_from_path;
