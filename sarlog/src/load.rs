/// Derived statistics for the LOAD section: the run queue and the number of blocked tasks as
/// percentages of the task list.
use crate::table::Table;

use anyhow::{bail, Result};

/// Append `pct_plist` (runq-sz / plist-sz * 100) and `pct_blocked` (blocked / plist-sz * 100) to a
/// table holding the LOAD section.  Values are rendered with two decimals; a row where a value does
/// not parse or plist-sz is zero gets empty cells.

pub fn add_load_stats(table: &mut Table) -> Result<()> {
    let (runq, plist, blocked) = match (
        table.numeric_column("runq-sz"),
        table.numeric_column("plist-sz"),
        table.numeric_column("blocked"),
    ) {
        (Some(r), Some(p), Some(b)) => (r, p, b),
        _ => bail!("Not a LOAD table"),
    };
    let pct = |x: &Option<f64>, total: &Option<f64>| match (x, total) {
        (Some(x), Some(total)) if *total != 0.0 => format!("{:.2}", x / total * 100.0),
        _ => "".to_string(),
    };
    let pct_plist = runq.iter().zip(&plist).map(|(r, p)| pct(r, p)).collect();
    let pct_blocked = blocked.iter().zip(&plist).map(|(b, p)| pct(b, p)).collect();
    table.add_numeric_column("pct_plist", pct_plist);
    table.add_numeric_column("pct_blocked", pct_blocked);
    Ok(())
}

#[test]
fn test_load_stats() {
    use crate::logfile::parse_logfile;
    use crate::sections::Section;

    let mut t = parse_logfile("../tests/sarlog/data/system2/sar15", Section::Load).unwrap();
    add_load_stats(&mut t).unwrap();
    assert!(t.text_column("pct_plist").unwrap() == vec!["0.50", "", "0.24"]);
    assert!(t.text_column("pct_blocked").unwrap() == vec!["1.00", "", "0.24"]);
    assert!(t.numeric_column("pct_plist").unwrap()[0] == Some(0.5));

    let mut t = parse_logfile("../tests/sarlog/data/system2/sar15", Section::Task).unwrap();
    assert!(add_load_stats(&mut t).is_err());
}
