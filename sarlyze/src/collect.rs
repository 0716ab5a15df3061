/// Run a per-file operation over the log files of several systems, one thread per file, and
/// collect the results in the order of the sources.
///
/// Files that do not exist are reported and skipped: a system may simply not have been up on the
/// day in question.  Every other error aborts the collection.
use anyhow::Result;
use sarlog::SarError;
use std::path::PathBuf;
use std::thread;
use ustr::Ustr;

pub type Source = (Ustr, PathBuf);

pub fn collect<T, F>(sources: &[Source], op: F) -> Result<Vec<(Ustr, T)>>
where
    T: Send,
    F: Fn(&PathBuf) -> sarlog::Result<T> + Sync,
{
    let results = thread::scope(|s| {
        let handles = sources
            .iter()
            .map(|(system, path)| {
                let op = &op;
                s.spawn(move || (*system, path, op(path)))
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join())
            .collect::<Vec<_>>()
    });

    let mut collected = vec![];
    for r in results {
        let (system, path, r) = match r {
            Ok(x) => x,
            Err(_) => anyhow::bail!("Worker thread panicked"),
        };
        match r {
            Ok(x) => collected.push((system, x)),
            Err(SarError::FileNotFound(_)) => {
                tracing::warn!(system = %system, file = %path.display(), "Log file not found, skipping");
            }
            Err(e) => anyhow::bail!("{}: {e}", path.display()),
        }
    }
    Ok(collected)
}

#[cfg(test)]
fn test_sources() -> Vec<Source> {
    vec![
        (Ustr::from("system1"), PathBuf::from("../tests/sarlog/data/system1/sar15")),
        (Ustr::from("system3"), PathBuf::from("../tests/sarlog/data/system3/sar15")),
        (Ustr::from("system2"), PathBuf::from("../tests/sarlog/data/system2/sar15")),
    ]
}

#[test]
fn test_collect() {
    let r = collect(&test_sources(), |p| sarlog::parse_logfile(p, sarlog::Section::Task)).unwrap();
    assert!(r.len() == 2);
    assert!(r[0].0 == Ustr::from("system1"));
    assert!(r[0].1.len() == 2);
    assert!(r[1].0 == Ustr::from("system2"));
    assert!(r[1].1.len() == 4);

    let mut sources = test_sources();
    sources.push((Ustr::from("bad"), PathBuf::from("../tests/sarlog/baddate")));
    assert!(collect(&sources, |p| sarlog::scan_reboots(p)).is_err());
}
