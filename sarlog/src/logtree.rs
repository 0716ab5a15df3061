/// Locate log files in a log tree.
///
/// Each system's logs live under a base path, and the log for a day of the month is that path with
/// the two-digit day appended, which is how sysstat names its files (`/var/log/sa/sar15`).  A
/// typical collection tree keeps one directory per system:
///
///   /data/sa/node1/sar01, /data/sa/node1/sar02, ...
///   /data/sa/node2/sar01, ...
use crate::configs::System;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use ustr::Ustr;

/// The file name for `day` (1..=31) under `base_path`.

pub fn logfile_name(base_path: &str, day: u32) -> Result<String> {
    if !(1..=31).contains(&day) {
        bail!("Day of month out of range: {day}");
    }
    Ok(format!("{base_path}{day:02}"))
}

/// The default name of a system: the name of the directory holding its log files.

pub fn system_name_from_path(base_path: &str) -> Option<Ustr> {
    let dir = Path::new(base_path).parent()?.file_name()?;
    Some(Ustr::from(dir.to_str()?))
}

/// The log files for `day` for all the systems, in the order given.  Whether the files exist is not
/// checked here, parsing a missing file reports FileNotFound.

pub fn find_logfiles(systems: &[System], day: u32) -> Result<Vec<(Ustr, PathBuf)>> {
    let mut files = vec![];
    for sys in systems {
        files.push((sys.name, PathBuf::from(logfile_name(&sys.base_path, day)?)));
    }
    Ok(files)
}

#[test]
fn test_logfile_name() {
    assert!(logfile_name("/data/sa/node1/sar", 5).unwrap() == "/data/sa/node1/sar05");
    assert!(logfile_name("/data/sa/node1/sar", 31).unwrap() == "/data/sa/node1/sar31");
    assert!(logfile_name("sa", 10).unwrap() == "sa10");
    assert!(logfile_name("/data/sa/node1/sar", 0).is_err());
    assert!(logfile_name("/data/sa/node1/sar", 32).is_err());
}

#[test]
fn test_system_name() {
    assert!(system_name_from_path("./data/system1/sar") == Some(Ustr::from("system1")));
    assert!(system_name_from_path("/data/sa/node1/sar") == Some(Ustr::from("node1")));
    assert!(system_name_from_path("sar").is_none());
    assert!(system_name_from_path("/sar").is_none());
}

#[test]
fn test_find_logfiles() {
    let systems = crate::configs::read_from_json("../tests/sarlog/config.json").unwrap();
    let files = find_logfiles(&systems, 15).unwrap();
    assert!(files.len() == 3);
    assert!(files[0].0 == Ustr::from("system1"));
    assert!(files[0].1 == PathBuf::from("../tests/sarlog/data/system1/sar15"));
    assert!(files[0].1.exists());
    assert!(files[1].0 == Ustr::from("system2"));
    assert!(files[2].0 == Ustr::from("system3"));
    assert!(!files[2].1.exists());
    assert!(find_logfiles(&systems, 40).is_err());
}
