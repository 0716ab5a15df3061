/// Print the LOAD section for the selected systems, with the run queue and blocked tasks also
/// given relative to the size of the task list.
use crate::collect::{collect, Source};
use crate::format;
use crate::parse::print_table;
use crate::PrintArgs;

use anyhow::Result;
use sarlog::{add_load_stats, parse_logfile, Section, Table};
use std::io;

pub fn aggregate_and_print_load(
    output: &mut dyn io::Write,
    sources: &[Source],
    print_args: &PrintArgs,
) -> Result<()> {
    let mut tables = collect(sources, |p| parse_logfile(p, Section::Load))?;
    for (_, t) in tables.iter_mut() {
        add_load_stats(t)?;
    }
    match Table::concat_with_system(tables) {
        Some(table) => print_table(output, &table, print_args),
        None => Ok(()),
    }
}

pub fn fmt_help() -> format::Help {
    crate::parse::fmt_help(Section::Load, &["pct_plist", "pct_blocked"])
}

#[test]
fn test_load() {
    use std::path::PathBuf;
    use ustr::Ustr;

    let sources = vec![
        (Ustr::from("system1"), PathBuf::from("../tests/sarlog/data/system1/sar15")),
        (Ustr::from("system2"), PathBuf::from("../tests/sarlog/data/system2/sar15")),
    ];
    let print_args = PrintArgs {
        fmt: Some("datetime,pct_plist,pct_blocked,system,awk".to_string()),
    };
    let mut out = vec![];
    aggregate_and_print_load(&mut out, &sources, &print_args).unwrap();
    let expected = "2024-01-15T00:20:01 0.40 0.00 system1
2024-01-15T00:30:01 2.00 10.00 system1
2024-01-15T23:50:01 0.50 1.00 system2
2024-01-16T00:00:01 * * system2
2024-01-16T00:10:01 0.24 0.24 system2
";
    assert!(String::from_utf8(out).unwrap() == expected);
}
