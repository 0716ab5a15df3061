/// Print the restart events found in the logs of the selected systems.
use crate::collect::{collect, Source};
use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use sarlog::{format_timestamp, scan_reboots, RebootEvent};
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

pub fn scan_and_print_reboots(
    output: &mut dyn io::Write,
    sources: &[Source],
    print_args: &PrintArgs,
) -> Result<()> {
    let events = collect(sources, |p| scan_reboots(p))?
        .into_iter()
        .flat_map(|(system, evs)| evs.into_iter().map(move |e| (system, e)))
        .collect::<Vec<(Ustr, RebootEvent)>>();

    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, |x| formatters.contains_key(x), &aliases)?;
    let opts = format::standard_options(&others);
    format::format_data(output, &fields, &formatters, &opts, &events, ())
}

pub fn fmt_help() -> format::Help {
    let (formatters, aliases) = my_formatters();
    let mut fields = formatters.keys().cloned().collect::<Vec<String>>();
    fields.sort();
    format::Help {
        fields,
        aliases: aliases.into_iter().collect::<Vec<(String, Vec<String>)>>(),
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "system,datetime,os,action";

type RebootDatum<'a> = &'a (Ustr, RebootEvent);
type RebootCtx = ();

fn my_formatters() -> (
    HashMap<String, &'static dyn Fn(RebootDatum, RebootCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(RebootDatum, RebootCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("system".to_string(), &format_system);
    formatters.insert("datetime".to_string(), &format_datetime);
    formatters.insert("os".to_string(), &format_os);
    formatters.insert("action".to_string(), &format_action);
    formatters.insert("detail".to_string(), &format_detail);

    aliases.insert(
        "all".to_string(),
        vec![
            "system".to_string(),
            "datetime".to_string(),
            "os".to_string(),
            "action".to_string(),
            "detail".to_string(),
        ],
    );

    (formatters, aliases)
}

fn format_system(d: RebootDatum, _: RebootCtx) -> String {
    d.0.to_string()
}

fn format_datetime(d: RebootDatum, _: RebootCtx) -> String {
    format_timestamp(&d.1.timestamp)
}

fn format_os(d: RebootDatum, _: RebootCtx) -> String {
    d.1.origin.to_string()
}

fn format_action(d: RebootDatum, _: RebootCtx) -> String {
    d.1.action.to_string()
}

fn format_detail(d: RebootDatum, _: RebootCtx) -> String {
    d.1.detail.clone()
}

#[test]
fn test_reboots() {
    use std::path::PathBuf;

    let sources = vec![
        (Ustr::from("system1"), PathBuf::from("../tests/sarlog/data/system1/sar15")),
        (Ustr::from("system2"), PathBuf::from("../tests/sarlog/data/system2/sar15")),
    ];
    let print_args = PrintArgs {
        fmt: Some("all,csv".to_string()),
    };
    let mut out = vec![];
    scan_and_print_reboots(&mut out, &sources, &print_args).unwrap();
    let expected = "system1,2024-01-15T00:00:01,LINUX,RESTART,(2 CPU)
system1,2024-01-15T13:30:01,LINUX,RESTART,(2 CPU)
system2,2024-01-15T23:40:01,LINUX,RESTART,(2 CPU)
system2,2024-01-16T00:30:01,LINUX,RESTART,(2 CPU)
";
    assert!(String::from_utf8(out).unwrap() == expected);
}
