/// Read the list of monitored systems from a json file.
///
/// The file format is an array [...] of objects { ... }, each with the following named fields and
/// value types:
///
///   base_path - string, the path prefix of the system's log files; the file for a day of the month
///               is the prefix with the two-digit day appended, eg "/data/sa/node1/sar" + "15"
///   name - string, optional, the unique name of the system; if absent it is derived from the
///          base path, see logtree::system_name_from_path
///   description - string, optional, arbitrary text describing the system
///
/// See ../../tests/sarlog/config.json for an example.
use crate::logtree::system_name_from_path;

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path;
use ustr::Ustr;

#[derive(Debug, Default, Clone)]
pub struct System {
    pub name: Ustr,
    pub base_path: String,
    pub description: String,
}

/// Returns the systems in the order listed in the file, or an error message.
///
/// As the file is written by hand, it is decoded from the generic JSON representation with explicit
/// checks of the fields rather than by a derived parser, to get sensible error messages.

pub fn read_from_json(filename: &str) -> Result<Vec<System>> {
    let file = File::open(path::Path::new(filename))?;
    let reader = BufReader::new(file);
    let v = serde_json::from_reader(reader)?;
    let mut systems = vec![];
    let mut names = HashSet::new();
    if let Value::Array(objs) = v {
        for obj in objs {
            if let Value::Object(fields) = obj {
                let mut sys: System = Default::default();
                if let Some(bp) = grab_string_opt(&fields, "base_path")? {
                    sys.base_path = bp;
                } else {
                    bail!("Field 'base_path' must be present and have a string value");
                }
                sys.name = match grab_string_opt(&fields, "name")? {
                    Some(name) => Ustr::from(&name),
                    None => match system_name_from_path(&sys.base_path) {
                        Some(name) => name,
                        None => bail!("No 'name' given and none can be derived from '{}'", sys.base_path),
                    },
                };
                sys.description = grab_string_opt(&fields, "description")?.unwrap_or_default();
                if !names.insert(sys.name) {
                    bail!("System {} already defined", sys.name);
                }
                systems.push(sys);
            } else {
                bail!("Expected an object value")
            }
        }
    } else {
        bail!("Expected an array value")
    }
    Ok(systems)
}

fn grab_string_opt(fields: &serde_json::Map<String, Value>, name: &str) -> Result<Option<String>> {
    if let Some(d) = fields.get(name) {
        if let Value::String(s) = d {
            Ok(Some(s.clone()))
        } else {
            bail!("Field '{name}' must have a string value");
        }
    } else {
        Ok(None)
    }
}

#[cfg(test)]
fn read_text(text: &str) -> Result<Vec<System>> {
    let name = std::env::temp_dir().join(format!("sarlog-config-{}.json", std::process::id()));
    std::fs::write(&name, text).unwrap();
    let r = read_from_json(name.to_str().unwrap());
    std::fs::remove_file(&name).unwrap();
    r
}

#[test]
fn test_config() {
    let conf = read_from_json("../tests/sarlog/config.json").unwrap();
    assert!(conf.len() == 3);
    assert!(conf[0].name.as_str() == "system1");
    assert!(conf[0].base_path == "../tests/sarlog/data/system1/sar");
    assert!(conf[0].description == "Login node, 2 cores");
    assert!(conf[1].name.as_str() == "system2");
    assert!(conf[1].description == "");
    assert!(conf[2].name.as_str() == "system3");
}

// One test function, as the temp file name is per-process.

#[test]
fn test_config_errors() {
    assert!(read_from_json("../tests/sarlog/no-such-config.json").is_err());
    assert!(read_text(r#"{"base_path": "/data/a/sar"}"#).is_err());
    assert!(read_text(r#"[17]"#).is_err());
    assert!(read_text(r#"[{"name": "a"}]"#).is_err());
    assert!(read_text(r#"[{"base_path": 3}]"#).is_err());
    assert!(read_text(r#"[{"base_path": "/data/a/sar", "description": true}]"#).is_err());
    assert!(read_text(r#"[{"base_path": "sar"}]"#).is_err());
    assert!(read_text(r#"[{"base_path": "/data/a/sar"}, {"base_path": "/other/a/sar"}]"#).is_err());
    let c = read_text(r#"[{"base_path": "/data/a/sar"}, {"base_path": "/other/a/sar", "name": "b"}]"#)
        .unwrap();
    assert!(c[0].name.as_str() == "a" && c[1].name.as_str() == "b");
}
