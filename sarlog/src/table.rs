/// The tabular result of parsing one section of one or more log files.
///
/// Values are kept as the text found in the log.  Every column has a declared kind, and numeric
/// views are only available for numeric columns: identity columns (CPU, DEV, IFACE, TTY, system)
/// stay textual even when their values happen to look like numbers, as CPU core numbers do.
use crate::dates::{format_timestamp, Timestamp};

use serde::Serialize;
use std::str::FromStr;
use ustr::Ustr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Timestamp,
    Identity,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: Ustr,
    pub kind: ColumnKind,
}

/// One data line: the reconstructed time and the data fields, in header order.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub timestamp: Timestamp,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    /// An empty table with the given columns.  The first column must be the timestamp.

    pub fn new(columns: Vec<Column>) -> Table {
        assert!(columns.first().map(|c| c.kind) == Some(ColumnKind::Timestamp));
        Table {
            columns,
            rows: vec![],
        }
    }

    /// Append a row.  Rows with the wrong number of values are a programming error.

    pub fn push(&mut self, timestamp: Timestamp, values: Vec<String>) {
        assert!(values.len() + 1 == self.columns.len());
        self.rows.push(Row { timestamp, values });
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The index of the named column, counting the timestamp as column zero.

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.as_str() == name)
    }

    /// The table as text: a header row followed by one row per record, the timestamp first.

    pub fn records(&self) -> Vec<Vec<String>> {
        let mut records = vec![self
            .columns
            .iter()
            .map(|c| c.name.to_string())
            .collect::<Vec<String>>()];
        for row in &self.rows {
            let mut r = vec![format_timestamp(&row.timestamp)];
            r.extend(row.values.iter().cloned());
            records.push(r);
        }
        records
    }

    /// The text values of a column.  The timestamp column is rendered.

    pub fn text_column(&self, name: &str) -> Option<Vec<String>> {
        let ix = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| {
                    if ix == 0 {
                        format_timestamp(&r.timestamp)
                    } else {
                        r.values[ix - 1].clone()
                    }
                })
                .collect(),
        )
    }

    /// The values of a numeric column, None for values that do not parse.  Returns None if the
    /// column does not exist or is not numeric.

    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let ix = self.column_index(name)?;
        if self.columns[ix].kind != ColumnKind::Numeric {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|r| f64::from_str(&r.values[ix - 1]).ok())
                .collect(),
        )
    }

    /// Append a derived numeric column.  `values` must have one entry per row.

    pub fn add_numeric_column(&mut self, name: &str, values: Vec<String>) {
        assert!(values.len() == self.rows.len());
        self.columns.push(Column {
            name: Ustr::from(name),
            kind: ColumnKind::Numeric,
        });
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.values.push(v);
        }
    }

    /// Catenate tables from several systems into one, in the order given, with a trailing textual
    /// `system` column naming the origin of each row.  The tables must all have the same columns
    /// (they come from the same section).  An empty input yields None.

    pub fn concat_with_system(tables: Vec<(Ustr, Table)>) -> Option<Table> {
        let mut columns = tables.first()?.1.columns.clone();
        columns.push(Column {
            name: Ustr::from("system"),
            kind: ColumnKind::Identity,
        });
        let mut result = Table::new(columns);
        for (system, table) in tables {
            assert!(table.columns.len() + 1 == result.columns.len());
            for mut row in table.rows {
                row.values.push(system.to_string());
                result.rows.push(row);
            }
        }
        Some(result)
    }
}

#[cfg(test)]
use crate::sections::Section;

#[cfg(test)]
fn at(h: u32, m: u32) -> Timestamp {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[cfg(test)]
fn strings(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

#[test]
fn test_records() {
    let mut t = Table::new(Section::Task.schema().columns());
    assert!(t.is_empty());
    assert!(t.records() == vec![strings(&["datetime", "proc/s", "cswch/s"])]);
    t.push(at(0, 10), strings(&["1.5", "300.25"]));
    t.push(at(0, 20), strings(&["2.0", "310.00"]));
    assert!(t.len() == 2);
    let r = t.records();
    assert!(r[1] == strings(&["2024-01-15T00:10:00", "1.5", "300.25"]));
    assert!(r[2] == strings(&["2024-01-15T00:20:00", "2.0", "310.00"]));
}

#[test]
fn test_numeric_column() {
    let mut t = Table::new(Section::Cpu.schema().columns());
    let mut vals = strings(&["all", "1.0", "0.0", "2.0", "0.5", "0.0", "0.0", "0.1", "0.0", "0.0"]);
    vals.push("96.4".to_string());
    t.push(at(1, 0), vals);
    assert!(t.numeric_column("%idle") == Some(vec![Some(96.4)]));
    assert!(t.numeric_column("%usr") == Some(vec![Some(1.0)]));
    // Identity and timestamp columns are not numeric, and unknown columns do not exist
    assert!(t.numeric_column("CPU").is_none());
    assert!(t.numeric_column("datetime").is_none());
    assert!(t.numeric_column("%bogus").is_none());
    assert!(t.text_column("CPU") == Some(strings(&["all"])));
    assert!(t.text_column("datetime") == Some(strings(&["2024-01-15T01:00:00"])));
}

#[test]
fn test_concat_with_system() {
    let mut a = Table::new(Section::Task.schema().columns());
    a.push(at(0, 10), strings(&["1", "2"]));
    let mut b = Table::new(Section::Task.schema().columns());
    b.push(at(0, 10), strings(&["3", "4"]));
    b.push(at(0, 20), strings(&["5", "6"]));
    let t = Table::concat_with_system(vec![(Ustr::from("alpha"), a), (Ustr::from("beta"), b)])
        .unwrap();
    assert!(t.column_names() == vec!["datetime", "proc/s", "cswch/s", "system"]);
    assert!(t.columns()[3].kind == ColumnKind::Identity);
    assert!(t.text_column("system") == Some(strings(&["alpha", "beta", "beta"])));
    assert!(t.numeric_column("cswch/s") == Some(vec![Some(2.0), Some(4.0), Some(6.0)]));
    assert!(Table::concat_with_system(vec![]).is_none());
}

#[test]
fn test_add_numeric_column() {
    let mut t = Table::new(Section::Task.schema().columns());
    t.push(at(0, 10), strings(&["1", "2"]));
    t.add_numeric_column("ratio", strings(&["50"]));
    assert!(t.numeric_column("ratio") == Some(vec![Some(50.0)]));
}

#[test]
fn test_serialize() {
    let mut t = Table::new(Section::Task.schema().columns());
    t.push(at(0, 10), strings(&["1", "2"]));
    let s = serde_json::to_string(&t).unwrap();
    assert!(s.contains(r#""name":"proc/s","kind":"numeric""#));
    assert!(s.contains(r#""timestamp":"2024-01-15T00:10:00""#));
}
