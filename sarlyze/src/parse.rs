/// Print one section, from the logs of all the selected systems, as a single table.
use crate::collect::{collect, Source};
use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use sarlog::{parse_logfile, Section, Table};
use std::collections::HashMap;
use std::io;

pub fn parse_and_print(
    output: &mut dyn io::Write,
    section: Section,
    sources: &[Source],
    print_args: &PrintArgs,
) -> Result<()> {
    let tables = collect(sources, |p| parse_logfile(p, section))?;
    for (system, t) in &tables {
        tracing::debug!(system = %system, rows = t.len(), "Parsed {section}");
    }
    match Table::concat_with_system(tables) {
        Some(table) => print_table(output, &table, print_args),
        None => Ok(()),
    }
}

/// Print a table according to the `--fmt` spec.  The default is all the columns.

pub fn print_table(output: &mut dyn io::Write, table: &Table, print_args: &PrintArgs) -> Result<()> {
    let aliases = table_aliases(table);
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) =
        format::parse_fields(spec, |x| table.column_index(x).is_some(), &aliases)?;
    let opts = format::standard_options(&others);
    format::format_table(output, &fields, &opts, table)
}

pub fn fmt_help(section: Section, extra: &[&str]) -> format::Help {
    let mut fields = section
        .schema()
        .columns()
        .iter()
        .map(|c| c.name.to_string())
        .collect::<Vec<String>>();
    fields.extend(extra.iter().map(|x| x.to_string()));
    fields.push("system".to_string());
    format::Help {
        aliases: vec![("all".to_string(), fields.clone())],
        fields,
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "all";

fn table_aliases(table: &Table) -> HashMap<String, Vec<String>> {
    let mut aliases = HashMap::new();
    aliases.insert(
        "all".to_string(),
        table
            .column_names()
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>(),
    );
    aliases
}

#[test]
fn test_parse_and_print() {
    use std::path::PathBuf;
    use ustr::Ustr;

    let sources = vec![
        (Ustr::from("system1"), PathBuf::from("../tests/sarlog/data/system1/sar15")),
        (Ustr::from("system2"), PathBuf::from("../tests/sarlog/data/system2/sar15")),
    ];
    let print_args = PrintArgs {
        fmt: Some("system,datetime,cswch/s,csv".to_string()),
    };
    let mut out = vec![];
    parse_and_print(&mut out, Section::Task, &sources, &print_args).unwrap();
    let expected = "system1,2024-01-15T00:20:01,310.50
system1,2024-01-15T00:30:01,298.12
system2,2024-01-15T23:50:01,512.00
system2,2024-01-16T00:00:01,480.25
system2,2024-01-16T00:10:01,455.75
system2,2024-01-16T00:40:01,1210.00
";
    assert!(String::from_utf8(out).unwrap() == expected);

    let print_args = PrintArgs { fmt: None };
    let mut out = vec![];
    parse_and_print(&mut out, Section::Cpu, &sources[1..], &print_args).unwrap();
    let out = String::from_utf8(out).unwrap();
    let lines = out.lines().collect::<Vec<&str>>();
    assert!(lines.len() == 5);
    assert!(lines[0].starts_with("datetime             CPU  %usr"));
    assert!(lines[0].ends_with("%idle  system"));
    assert!(lines[1].starts_with("2024-01-15T23:50:01  all  2.00"));
}
