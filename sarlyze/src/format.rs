/// Generic formatting code for a set of data to be presented columnar, as csv, or as json, and
/// (except for json) with or without a header and with or without named fields.
///
/// Data come in two shapes: typed records with a formatter per field (`format_data`), and parsed
/// tables whose fields are the table's columns (`format_table`).  Both are printed the same way.
use anyhow::{bail, Result};
use sarlog::Table;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

pub struct Help {
    pub fields: Vec<String>,
    pub aliases: Vec<(String, Vec<String>)>,
    pub defaults: String,
}

pub fn maybe_help<F>(fmt: &Option<String>, f: F) -> bool
where
    F: Fn() -> Help,
{
    if let Some(ref s) = fmt {
        if s.starts_with("help") {
            let help = f();
            println!("Syntax:\n  --fmt=(field|alias|control),...");
            println!("\nFields:");
            for f in help.fields {
                println!("  {f}");
            }
            if !help.aliases.is_empty() {
                println!("\nAliases:");
                for (name, mut fields) in help.aliases {
                    fields.sort();
                    let explication = fields.join(",");
                    println!("  {name} --> {explication}");
                }
            }
            println!("\nDefaults:\n  {}", help.defaults);
            println!("\nControl:\n  csv\n  csvnamed\n  fixed\n  json\n  awk\n  header\n  noheader\n  tag:<tagvalue>");
            return true;
        }
    }
    false
}

/// Return a vector of the known fields in `spec`, and a HashSet of any other strings found in
/// `spec`.  `is_field` decides what is a field; aliases are expanded.  It returns an error if zero
/// output fields were selected.

pub fn parse_fields<'a, F>(
    spec: &'a str,
    is_field: F,
    aliases: &'a HashMap<String, Vec<String>>,
) -> Result<(Vec<&'a str>, HashSet<&'a str>)>
where
    F: Fn(&str) -> bool,
{
    let mut others = HashSet::new();
    let mut fields = vec![];
    for x in spec.split(',') {
        if is_field(x) {
            fields.push(x);
        } else if let Some(aliases) = aliases.get(x) {
            for alias in aliases {
                if is_field(alias) {
                    fields.push(alias.as_ref());
                } else {
                    others.insert(alias.as_ref());
                }
            }
        } else {
            others.insert(x);
        }
    }
    if fields.is_empty() {
        bail!("No output fields were selected")
    }
    Ok((fields, others))
}

pub struct FormatOptions {
    pub tag: Option<String>,
    pub json: bool,  // json explicitly requested
    pub csv: bool,   // csv or csvnamed explicitly requested
    pub awk: bool,   // awk explicitly requested
    pub fixed: bool, // fixed output explicitly requested
    pub named: bool, // csvnamed explicitly requested
    pub header: bool, // true if nothing requested b/c fixed+header is default
}

pub fn standard_options(others: &HashSet<&str>) -> FormatOptions {
    let csvnamed = others.contains("csvnamed");
    let csv = others.contains("csv") || csvnamed;
    let json = others.contains("json") && !csv;
    let awk = others.contains("awk") && !csv && !json;
    let fixed = others.contains("fixed") && !csv && !json && !awk;
    // json and awk get no header, even if one is requested
    let header = (!csv && !json && !awk && !others.contains("noheader"))
        || (csv && others.contains("header"));
    let mut tag: Option<String> = None;
    for x in others {
        if let Some(t) = x.strip_prefix("tag:") {
            tag = Some(t.to_string());
            break;
        }
    }
    FormatOptions {
        csv,
        json,
        awk,
        header,
        tag,
        fixed,
        named: csvnamed,
    }
}

/// The `fields` are the names of formatting functions to get from the `formatters`, these are
/// applied to the `data`.

pub fn format_data<'a, DataT, FmtT, CtxT>(
    output: &mut dyn io::Write,
    fields: &[&'a str],
    formatters: &HashMap<String, FmtT>,
    opts: &FormatOptions,
    data: &[DataT],
    ctx: CtxT,
) -> Result<()>
where
    FmtT: Fn(&DataT, CtxT) -> String,
    CtxT: Copy,
{
    let fmts = fields
        .iter()
        .filter_map(|kwd| formatters.get(*kwd))
        .collect::<Vec<&FmtT>>();
    let mut cols = Vec::<Vec<String>>::new();
    cols.resize(fields.len(), vec![]);
    for x in data {
        for (i, f) in fmts.iter().enumerate() {
            cols[i].push(f(x, ctx));
        }
    }
    format_columns(output, fields, opts, cols)
}

/// The `fields` are column names of the table, in the order to print them.  Unknown names print as
/// empty columns.

pub fn format_table(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    table: &Table,
) -> Result<()> {
    let cols = fields
        .iter()
        .map(|kwd| table.text_column(kwd).unwrap_or_else(|| vec!["".to_string(); table.len()]))
        .collect::<Vec<Vec<String>>>();
    format_columns(output, fields, opts, cols)
}

fn format_columns(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: Vec<Vec<String>>,
) -> Result<()> {
    if fields.is_empty() {
        return Ok(());
    }
    if opts.csv {
        format_csv(output, fields, opts, cols)
    } else if opts.json {
        format_json(output, fields, opts, cols)
    } else if opts.awk {
        format_awk(output, fields, opts, cols)
    } else {
        format_fixed_width(output, fields, opts, cols)
    }
}

fn format_fixed_width(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: Vec<Vec<String>>,
) -> Result<()> {
    // The column width is the max across all the entries in the column (including header,
    // if present).  If there's a tag, it is printed in the last column.
    let mut widths = vec![0; fields.len() + if opts.tag.is_some() { 1 } else { 0 }];

    if opts.header {
        for (i, kwd) in fields.iter().enumerate() {
            widths[i] = usize::max(widths[i], kwd.len());
        }
        if opts.tag.is_some() {
            widths[fields.len()] = usize::max(widths[fields.len()], "tag".len());
        }
    }

    let nrows = cols[0].len();
    for row in 0..nrows {
        for col in 0..fields.len() {
            widths[col] = usize::max(widths[col], cols[col][row].len());
        }
        if let Some(ref tag) = opts.tag {
            widths[fields.len()] = usize::max(widths[fields.len()], tag.len());
        }
    }

    if opts.header {
        let mut s = "".to_string();
        for (i, kwd) in fields.iter().enumerate() {
            let w = widths[i];
            s += format!("{:w$}  ", kwd).as_str();
        }
        if opts.tag.is_some() {
            let w = widths[fields.len()];
            s += format!("{:w$}  ", "tag").as_str();
        }
        writeln!(output, "{}", s.trim_end())?;
    }

    for row in 0..nrows {
        let mut s = "".to_string();
        for col in 0..fields.len() {
            let w = widths[col];
            s += format!("{:w$}  ", cols[col][row]).as_str();
        }
        if let Some(ref tag) = opts.tag {
            let w = widths[fields.len()];
            s += format!("{:w$}  ", tag).as_str();
        }
        writeln!(output, "{}", s.trim_end())?;
    }
    Ok(())
}

// Space-separated with no alignment, and with empty values shown as `*` so that every line has
// the same number of fields.

fn format_awk(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: Vec<Vec<String>>,
) -> Result<()> {
    for row in 0..cols[0].len() {
        let mut out_fields = (0..fields.len())
            .map(|col| {
                let v = cols[col][row].replace(' ', "_");
                if v.is_empty() {
                    "*".to_string()
                } else {
                    v
                }
            })
            .collect::<Vec<String>>();
        if let Some(ref tag) = opts.tag {
            out_fields.push(tag.clone());
        }
        writeln!(output, "{}", out_fields.join(" "))?;
    }
    Ok(())
}

fn format_csv(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: Vec<Vec<String>>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);

    if opts.header {
        let mut out_fields = fields.iter().map(|x| x.to_string()).collect::<Vec<String>>();
        if opts.tag.is_some() {
            out_fields.push("tag".to_string());
        }
        writer.write_record(out_fields)?;
    }

    for row in 0..cols[0].len() {
        let mut out_fields = Vec::new();
        for col in 0..fields.len() {
            if opts.named {
                out_fields.push(format!("{}={}", fields[col], cols[col][row]));
            } else {
                out_fields.push(cols[col][row].clone());
            }
        }
        if let Some(ref tag) = opts.tag {
            if opts.named {
                out_fields.push(format!("tag={tag}"));
            } else {
                out_fields.push(tag.clone());
            }
        }
        writer.write_record(out_fields)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_json(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    cols: Vec<Vec<String>>,
) -> Result<()> {
    let mut objects = vec![];
    for row in 0..cols[0].len() {
        let mut obj = json::JsonValue::new_object();
        for col in 0..fields.len() {
            obj[fields[col]] = cols[col][row].clone().into();
        }
        if let Some(ref tag) = opts.tag {
            obj["tag"] = tag.to_string().into();
        }
        objects.push(obj);
    }
    writeln!(output, "{}", json::stringify(objects))?;
    Ok(())
}

#[cfg(test)]
fn test_name(d: &(&str, &str), _: ()) -> String {
    d.0.to_string()
}

#[cfg(test)]
fn test_value(d: &(&str, &str), _: ()) -> String {
    d.1.to_string()
}

#[cfg(test)]
fn render(spec: &str, data: &[(&str, &str)]) -> String {
    let mut formatters: HashMap<String, &dyn Fn(&(&str, &str), ()) -> String> = HashMap::new();
    formatters.insert("name".to_string(), &test_name);
    formatters.insert("value".to_string(), &test_value);
    let mut aliases = HashMap::new();
    aliases.insert(
        "all".to_string(),
        vec!["name".to_string(), "value".to_string()],
    );
    let (fields, others) = parse_fields(spec, |x| formatters.contains_key(x), &aliases).unwrap();
    let opts = standard_options(&others);
    let mut out = vec![];
    format_data(&mut out, &fields, &formatters, &opts, data, ()).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_parse_fields() {
    let aliases = HashMap::from([("both".to_string(), vec!["a".to_string(), "b".to_string()])]);
    let (fields, others) =
        parse_fields("a,both,csv,tag:x,zappa", |x| x == "a" || x == "b", &aliases).unwrap();
    assert!(fields == vec!["a", "a", "b"]);
    assert!(others == HashSet::from(["csv", "tag:x", "zappa"]));
    let opts = standard_options(&others);
    assert!(opts.csv && !opts.json && !opts.header && !opts.named);
    assert!(opts.tag == Some("x".to_string()));

    // A misspelled field leaves nothing to print
    match parse_fields("cpu,csv", |x| x == "a" || x == "b", &aliases) {
        Err(e) => assert!(e.to_string() == "No output fields were selected"),
        Ok(_) => assert!(false),
    }
}

#[test]
fn test_formats() {
    let data = [("alpha", "1"), ("b", ""), ("c d", "300")];
    assert!(render("all", &data) == "name   value\nalpha  1\nb\nc d    300\n");
    assert!(render("all,noheader", &data) == "alpha  1\nb\nc d    300\n");
    assert!(render("value,name,csv", &data) == "1,alpha\n,b\n300,c d\n");
    assert!(render("all,csv,header", &data) == "name,value\nalpha,1\nb,\nc d,300\n");
    assert!(render("name,csvnamed", &data[0..1]) == "name=alpha\n");
    assert!(render("all,awk", &data) == "alpha 1\nb *\nc_d 300\n");
    assert!(
        render("all,json,tag:t", &data[0..1]) == "[{\"name\":\"alpha\",\"value\":\"1\",\"tag\":\"t\"}]\n"
    );
}
