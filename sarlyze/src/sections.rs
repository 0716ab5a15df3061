/// Print the registered sections and how they are recognized.
use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use itertools::Itertools;
use sarlog::{Section, SectionSchema};
use std::collections::HashMap;
use std::io;

pub fn print_sections(output: &mut dyn io::Write, print_args: &PrintArgs) -> Result<()> {
    let schemas = Section::ALL
        .iter()
        .map(|s| s.schema())
        .collect::<Vec<&'static SectionSchema>>();
    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, |x| formatters.contains_key(x), &aliases)?;
    let opts = format::standard_options(&others);
    format::format_data(output, &fields, &formatters, &opts, &schemas, ())
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

const FMT_DEFAULTS: &str = "section,width,filter,fields";

type SectionDatum<'a> = &'a &'static SectionSchema;
type SectionCtx = ();

fn my_formatters() -> (
    HashMap<String, &'static dyn Fn(SectionDatum, SectionCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(SectionDatum, SectionCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("section".to_string(), &format_section);
    formatters.insert("width".to_string(), &format_width);
    formatters.insert("filter".to_string(), &format_filter);
    formatters.insert("competitors".to_string(), &format_competitors);
    formatters.insert("fields".to_string(), &format_fields);

    aliases.insert(
        "all".to_string(),
        vec![
            "section".to_string(),
            "width".to_string(),
            "filter".to_string(),
            "competitors".to_string(),
            "fields".to_string(),
        ],
    );

    (formatters, aliases)
}

fn format_section(d: SectionDatum, _: SectionCtx) -> String {
    d.section.to_string()
}

fn format_width(d: SectionDatum, _: SectionCtx) -> String {
    d.width().to_string()
}

fn format_filter(d: SectionDatum, _: SectionCtx) -> String {
    match d.identity_filter {
        Some(allowed) => allowed.iter().join(","),
        None => "".to_string(),
    }
}

fn format_competitors(d: SectionDatum, _: SectionCtx) -> String {
    d.competitors.iter().join(",")
}

fn format_fields(d: SectionDatum, _: SectionCtx) -> String {
    d.field_names().iter().join(" ")
}

#[test]
fn test_sections() {
    let print_args = PrintArgs {
        fmt: Some("section,filter,competitors,csv".to_string()),
    };
    let mut out = vec![];
    print_sections(&mut out, &print_args).unwrap();
    let out = String::from_utf8(out).unwrap();
    let lines = out.lines().collect::<Vec<&str>>();
    assert!(lines.len() == 18);
    assert!(lines[0] == "CPU,all,NFS_SERVER");
    assert!(lines[1] == "TASK,,SWAP_STATS");
    assert!(lines.contains(&"NETWORK_ACTIVITY,\"eth0,lo\","));
    assert!(lines.contains(&"LOAD,,\"NFS_CLIENT,SOCKETS\""));

    let print_args = PrintArgs {
        fmt: Some("cpu".to_string()),
    };
    let mut out = vec![];
    assert!(print_sections(&mut out, &print_args).is_err());
    assert!(out.is_empty());
}
