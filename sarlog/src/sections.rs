/// The registry of sar report sections.
///
/// A sar text log is a sequence of blocks, one per report type, each introduced by a header line and
/// followed by data lines with the same column layout.  Sections are recognized only by their
/// header lines, which must match the registered header *exactly* once split on whitespace: same
/// number of tokens, same tokens after the leading time and AM/PM marker.  A collector version that
/// changes the column layout therefore makes the section unrecognizable rather than misparsed.
///
/// Sections with the same number of header tokens are dangerous: the data lines of one look just
/// like the data lines of the other, so each such schema lists the others as `competitors`, and a
/// competitor's header ends the section.  `validate_registry` checks that these lists are complete.
use crate::error::SarError;
use crate::table::{Column, ColumnKind};

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use ustr::Ustr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    Cpu,
    Task,
    SwapStats,
    PageStats,
    IoStats,
    MemStats,
    MemUse,
    SwapUse,
    Hugepages,
    Inode,
    Load,
    Tty,
    Block,
    NetworkActivity,
    NetworkError,
    NfsClient,
    NfsServer,
    Sockets,
}

impl Section {
    pub const ALL: [Section; 18] = [
        Section::Cpu,
        Section::Task,
        Section::SwapStats,
        Section::PageStats,
        Section::IoStats,
        Section::MemStats,
        Section::MemUse,
        Section::SwapUse,
        Section::Hugepages,
        Section::Inode,
        Section::Load,
        Section::Tty,
        Section::Block,
        Section::NetworkActivity,
        Section::NetworkError,
        Section::NfsClient,
        Section::NfsServer,
        Section::Sockets,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Cpu => "CPU",
            Section::Task => "TASK",
            Section::SwapStats => "SWAP_STATS",
            Section::PageStats => "PAGE_STATS",
            Section::IoStats => "IO_STATS",
            Section::MemStats => "MEM_STATS",
            Section::MemUse => "MEM_USE",
            Section::SwapUse => "SWAP_USE",
            Section::Hugepages => "HUGEPAGES",
            Section::Inode => "INODE",
            Section::Load => "LOAD",
            Section::Tty => "TTY",
            Section::Block => "BLOCK",
            Section::NetworkActivity => "NETWORK_ACTIVITY",
            Section::NetworkError => "NETWORK_ERROR",
            Section::NfsClient => "NFS_CLIENT",
            Section::NfsServer => "NFS_SERVER",
            Section::Sockets => "SOCKETS",
        }
    }

    /// The schema for the section.  The match is exhaustive, so there is no section without one.

    pub fn schema(&self) -> &'static SectionSchema {
        match self {
            Section::Cpu => &CPU,
            Section::Task => &TASK,
            Section::SwapStats => &SWAP_STATS,
            Section::PageStats => &PAGE_STATS,
            Section::IoStats => &IO_STATS,
            Section::MemStats => &MEM_STATS,
            Section::MemUse => &MEM_USE,
            Section::SwapUse => &SWAP_USE,
            Section::Hugepages => &HUGEPAGES,
            Section::Inode => &INODE,
            Section::Load => &LOAD,
            Section::Tty => &TTY,
            Section::Block => &BLOCK,
            Section::NetworkActivity => &NETWORK_ACTIVITY,
            Section::NetworkError => &NETWORK_ERROR,
            Section::NfsClient => &NFS_CLIENT,
            Section::NfsServer => &NFS_SERVER,
            Section::Sockets => &SOCKETS,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = SarError;

    fn from_str(s: &str) -> std::result::Result<Section, SarError> {
        Section::ALL
            .iter()
            .find(|x| x.name() == s)
            .copied()
            .ok_or_else(|| SarError::UnknownSection(s.to_string()))
    }
}

/// Look up the schema for a section by its name, eg "CPU" or "NETWORK_ACTIVITY".

pub fn lookup(id: &str) -> std::result::Result<&'static SectionSchema, SarError> {
    Ok(Section::from_str(id)?.schema())
}

/// The column names that hold the identity of a sub-entity (core, device, interface, terminal).
/// These are textual and must never be coerced to numbers.

pub const IDENTITY_COLUMNS: [&str; 4] = ["CPU", "DEV", "IFACE", "TTY"];

pub fn column_kind(name: &str) -> ColumnKind {
    if IDENTITY_COLUMNS.contains(&name) {
        ColumnKind::Identity
    } else {
        ColumnKind::Numeric
    }
}

#[derive(Debug)]
pub struct SectionSchema {
    pub section: Section,

    /// The header line exactly as the collector prints it, including a sample time and marker.
    pub header: &'static str,

    /// If present, only rows whose identity field (the first data field) is in the list are kept.
    pub identity_filter: Option<&'static [&'static str]>,

    /// Sections whose header lines have the same number of tokens as this one.
    pub competitors: &'static [Section],
}

impl SectionSchema {
    /// All the header tokens, including the leading time and marker.

    pub fn header_tokens(&self) -> Vec<&'static str> {
        self.header.split_whitespace().collect::<Vec<&'static str>>()
    }

    /// The number of tokens in the header line, and hence in every data line.

    pub fn width(&self) -> usize {
        self.header.split_whitespace().count()
    }

    /// The names of the data fields, ie, the header without the time and marker.

    pub fn field_names(&self) -> Vec<&'static str> {
        self.header.split_whitespace().skip(2).collect::<Vec<&'static str>>()
    }

    /// The output columns: `datetime` followed by the data fields, with their declared kinds.

    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![Column {
            name: Ustr::from("datetime"),
            kind: ColumnKind::Timestamp,
        }];
        for name in self.field_names() {
            columns.push(Column {
                name: Ustr::from(name),
                kind: column_kind(name),
            });
        }
        columns
    }

    /// Row filter: true iff the row's identity field is admitted by this schema.  `fields` are the
    /// data fields of the row, without time and marker.

    pub fn admit(&self, fields: &[&str]) -> bool {
        match self.identity_filter {
            None => true,
            Some(allowed) => match fields.first() {
                Some(identity) => allowed.contains(identity),
                None => false,
            },
        }
    }
}

/// Pre-split header lines for all registered sections, for matching against input lines.

pub struct HeaderShapes {
    shapes: Vec<(Section, Vec<&'static str>)>,
}

impl HeaderShapes {
    pub fn new() -> HeaderShapes {
        HeaderShapes {
            shapes: Section::ALL
                .iter()
                .map(|s| (*s, s.schema().header_tokens()))
                .collect(),
        }
    }

    /// The section whose header the tokenized line is, if any.  The first two tokens (the time and
    /// marker) are not compared.

    pub fn find(&self, tokens: &[&str]) -> Option<Section> {
        self.shapes
            .iter()
            .find(|(_, header)| header.len() == tokens.len() && header[2..] == tokens[2..])
            .map(|(s, _)| *s)
    }

    pub fn get(&self, section: Section) -> &[&'static str] {
        // ALL is in declaration order, and so is `shapes`.
        &self.shapes[section as usize].1
    }
}

/// Check the registry for design defects and fail if there are any.  Run once at startup by
/// clients; failure means the registry must be fixed.

pub fn validate_registry() -> Result<()> {
    for (i, section) in Section::ALL.iter().enumerate() {
        if *section as usize != i {
            bail!("Section {section} is out of order in Section::ALL");
        }
        if section.schema().section != *section {
            bail!("Section {section} is bound to the schema for {}", section.schema().section);
        }
        if Section::from_str(section.name()).ok() != Some(*section) {
            bail!("Section {section} does not round-trip through its name");
        }
    }
    validate_schemas(&Section::ALL.iter().map(|s| s.schema()).collect::<Vec<&SectionSchema>>())
}

/// Check a set of schemas: every header must be well-formed and unique, same-width schemas must
/// list each other as competitors and list nothing else, and identity filters must be non-empty and
/// refer to an identity column.

pub fn validate_schemas(schemas: &[&SectionSchema]) -> Result<()> {
    let mut seen = HashSet::new();
    for schema in schemas {
        let section = schema.section;
        let tokens = schema.header_tokens();
        if tokens.len() < 3 {
            bail!("Header for {section} has no data fields");
        }
        if crate::clock::parse_clock_time(tokens[0], tokens[1]).is_none() {
            bail!("Header for {section} does not start with a time and AM/PM marker");
        }
        if !seen.insert(tokens[2..].to_vec()) {
            bail!("Header for {section} is not unique");
        }
        if schema.competitors.contains(&section) {
            bail!("Section {section} lists itself as a competitor");
        }
        for c in schema.competitors {
            match schemas.iter().find(|s| s.section == *c) {
                Some(other) if other.width() != schema.width() => {
                    bail!("Section {section} lists {c} as a competitor but their widths differ")
                }
                Some(_) => {}
                None => bail!("Section {section} lists {c} as a competitor but it is not registered"),
            }
        }
        for other in schemas {
            if other.section != section
                && other.width() == schema.width()
                && !schema.competitors.contains(&other.section)
            {
                bail!("Section {section} must list {} as a competitor", other.section);
            }
        }
        if let Some(allowed) = schema.identity_filter {
            if allowed.is_empty() {
                bail!("Identity filter for {section} admits nothing");
            }
            if column_kind(tokens[2]) != ColumnKind::Identity {
                bail!("Identity filter for {section} applies to non-identity field {}", tokens[2]);
            }
        }
    }
    Ok(())
}

// The headers below are what sysstat's `sar -A` prints with a 12-hour clock locale.  Spacing is
// irrelevant, only the tokens matter.

static CPU: SectionSchema = SectionSchema {
    section: Section::Cpu,
    header: "12:00:01 AM     CPU      %usr     %nice      %sys   %iowait    %steal      %irq     %soft    %guest    %gnice     %idle",
    identity_filter: Some(&["all"]),
    competitors: &[Section::NfsServer],
};

static TASK: SectionSchema = SectionSchema {
    section: Section::Task,
    header: "12:00:01 AM    proc/s   cswch/s",
    identity_filter: None,
    competitors: &[Section::SwapStats],
};

static SWAP_STATS: SectionSchema = SectionSchema {
    section: Section::SwapStats,
    header: "12:00:01 AM  pswpin/s pswpout/s",
    identity_filter: None,
    competitors: &[Section::Task],
};

static PAGE_STATS: SectionSchema = SectionSchema {
    section: Section::PageStats,
    header: "12:00:01 AM  pgpgin/s pgpgout/s   fault/s  majflt/s  pgfree/s pgscank/s pgscand/s pgsteal/s    %vmeff",
    identity_filter: None,
    competitors: &[Section::Block],
};

static IO_STATS: SectionSchema = SectionSchema {
    section: Section::IoStats,
    header: "12:00:01 AM       tps      rtps      wtps   bread/s   bwrtn/s",
    identity_filter: None,
    competitors: &[Section::SwapUse],
};

static MEM_STATS: SectionSchema = SectionSchema {
    section: Section::MemStats,
    header: "12:00:01 AM   frmpg/s   bufpg/s   campg/s",
    identity_filter: None,
    competitors: &[Section::Hugepages],
};

static MEM_USE: SectionSchema = SectionSchema {
    section: Section::MemUse,
    header: "12:00:01 AM kbmemfree kbmemused  %memused kbbuffers  kbcached  kbcommit   %commit  kbactive   kbinact   kbdirty",
    identity_filter: None,
    competitors: &[Section::NetworkError],
};

static SWAP_USE: SectionSchema = SectionSchema {
    section: Section::SwapUse,
    header: "12:00:01 AM kbswpfree kbswpused  %swpused  kbswpcad   %swpcad",
    identity_filter: None,
    competitors: &[Section::IoStats],
};

static HUGEPAGES: SectionSchema = SectionSchema {
    section: Section::Hugepages,
    header: "12:00:01 AM kbhugfree kbhugused  %hugused",
    identity_filter: None,
    competitors: &[Section::MemStats],
};

static INODE: SectionSchema = SectionSchema {
    section: Section::Inode,
    header: "12:00:01 AM dentunusd   file-nr  inode-nr    pty-nr",
    identity_filter: None,
    competitors: &[],
};

static LOAD: SectionSchema = SectionSchema {
    section: Section::Load,
    header: "12:00:01 AM   runq-sz  plist-sz   ldavg-1   ldavg-5  ldavg-15   blocked",
    identity_filter: None,
    competitors: &[Section::NfsClient, Section::Sockets],
};

static TTY: SectionSchema = SectionSchema {
    section: Section::Tty,
    header: "12:00:01 AM       TTY   rcvin/s   xmtin/s framerr/s prtyerr/s     brk/s   ovrun/s",
    identity_filter: None,
    competitors: &[],
};

static BLOCK: SectionSchema = SectionSchema {
    section: Section::Block,
    header: "12:00:01 AM       DEV       tps  rd_sec/s  wr_sec/s  avgrq-sz  avgqu-sz     await     svctm     %util",
    identity_filter: None,
    competitors: &[Section::PageStats],
};

static NETWORK_ACTIVITY: SectionSchema = SectionSchema {
    section: Section::NetworkActivity,
    header: "12:00:01 AM     IFACE   rxpck/s   txpck/s    rxkB/s    txkB/s   rxcmp/s   txcmp/s  rxmcst/s",
    identity_filter: Some(&["eth0", "lo"]),
    competitors: &[],
};

static NETWORK_ERROR: SectionSchema = SectionSchema {
    section: Section::NetworkError,
    header: "12:00:01 AM     IFACE   rxerr/s   txerr/s    coll/s  rxdrop/s  txdrop/s  txcarr/s  rxfram/s  rxfifo/s  txfifo/s",
    identity_filter: Some(&["eth0", "lo"]),
    competitors: &[Section::MemUse],
};

static NFS_CLIENT: SectionSchema = SectionSchema {
    section: Section::NfsClient,
    header: "12:00:01 AM    call/s retrans/s    read/s   write/s  access/s  getatt/s",
    identity_filter: None,
    competitors: &[Section::Load, Section::Sockets],
};

static NFS_SERVER: SectionSchema = SectionSchema {
    section: Section::NfsServer,
    header: "12:00:01 AM   scall/s badcall/s  packet/s     udp/s     tcp/s     hit/s    miss/s   sread/s  swrite/s saccess/s sgetatt/s",
    identity_filter: None,
    competitors: &[Section::Cpu],
};

static SOCKETS: SectionSchema = SectionSchema {
    section: Section::Sockets,
    header: "12:00:01 AM    totsck    tcpsck    udpsck    rawsck   ip-frag    tcp-tw",
    identity_filter: None,
    competitors: &[Section::Load, Section::NfsClient],
};

#[test]
fn test_registry_is_valid() {
    validate_registry().unwrap();
}

#[cfg(test)]
fn schema(
    section: Section,
    header: &'static str,
    identity_filter: Option<&'static [&'static str]>,
    competitors: &'static [Section],
) -> SectionSchema {
    SectionSchema {
        section,
        header,
        identity_filter,
        competitors,
    }
}

#[cfg(test)]
fn check(schemas: &[SectionSchema]) -> String {
    match validate_schemas(&schemas.iter().collect::<Vec<&SectionSchema>>()) {
        Ok(()) => "".to_string(),
        Err(e) => e.to_string(),
    }
}

#[test]
fn test_validate_schemas() {
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[Section::SwapStats]);
    let swap = schema(Section::SwapStats, "12:00:01 AM pswpin/s pswpout/s", None, &[Section::Task]);
    let inode = schema(Section::Inode, "12:00:01 AM dentunusd file-nr inode-nr pty-nr", None, &[]);
    assert!(check(&[task, swap, inode]) == "");

    // Same width, but TASK does not list SWAP_STATS
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[]);
    let swap = schema(Section::SwapStats, "12:00:01 AM pswpin/s pswpout/s", None, &[Section::Task]);
    assert!(check(&[task, swap]) == "Section TASK must list SWAP_STATS as a competitor");

    // Competitor of another width
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[Section::Inode]);
    let inode = schema(Section::Inode, "12:00:01 AM dentunusd file-nr inode-nr pty-nr", None, &[]);
    assert!(
        check(&[task, inode]) == "Section TASK lists INODE as a competitor but their widths differ"
    );

    // Competitor that is not there at all
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[Section::SwapStats]);
    assert!(
        check(&[task]) == "Section TASK lists SWAP_STATS as a competitor but it is not registered"
    );

    // Duplicate header, spacing and time do not matter
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[Section::SwapStats]);
    let swap = schema(Section::SwapStats, "01:00:00 PM  proc/s   cswch/s", None, &[Section::Task]);
    assert!(check(&[task, swap]) == "Header for SWAP_STATS is not unique");

    // Malformed headers
    let task = schema(Section::Task, "12:00:01 AM", None, &[]);
    assert!(check(&[task]) == "Header for TASK has no data fields");
    let task = schema(Section::Task, "proc/s cswch/s runq-sz", None, &[]);
    assert!(check(&[task]) == "Header for TASK does not start with a time and AM/PM marker");
    let task = schema(Section::Task, "12:00:01 AM proc/s cswch/s", None, &[Section::Task]);
    assert!(check(&[task]) == "Section TASK lists itself as a competitor");
}

#[test]
fn test_validate_filters() {
    let cpu_header = "12:00:01 AM CPU %usr %idle";
    let cpu = schema(Section::Cpu, cpu_header, Some(&["all"]), &[]);
    assert!(check(&[cpu]) == "");

    let cpu = schema(Section::Cpu, cpu_header, Some(&[]), &[]);
    assert!(check(&[cpu]) == "Identity filter for CPU admits nothing");

    let load = schema(Section::Load, "12:00:01 AM runq-sz plist-sz", Some(&["all"]), &[]);
    assert!(check(&[load]) == "Identity filter for LOAD applies to non-identity field runq-sz");
}

#[test]
fn test_lookup() {
    let s = lookup("CPU").unwrap();
    assert!(s.section == Section::Cpu);
    assert!(s.width() == 13);
    assert!(lookup("TASK").unwrap().field_names() == vec!["proc/s", "cswch/s"]);
    assert!(lookup("NETWORK_ERROR").unwrap().section == Section::NetworkError);
    match lookup("cpu") {
        Err(SarError::UnknownSection(s)) => assert!(s == "cpu"),
        _ => assert!(false),
    }
    assert!(lookup("DISK").is_err());
}

#[test]
fn test_columns() {
    let cols = Section::Block.schema().columns();
    assert!(cols.len() == 10);
    assert!(cols[0].name.as_str() == "datetime" && cols[0].kind == ColumnKind::Timestamp);
    assert!(cols[1].name.as_str() == "DEV" && cols[1].kind == ColumnKind::Identity);
    assert!(cols[2].name.as_str() == "tps" && cols[2].kind == ColumnKind::Numeric);
    let cols = Section::Load.schema().columns();
    assert!(cols
        .iter()
        .skip(1)
        .all(|c| c.kind == ColumnKind::Numeric));
}

#[test]
fn test_admit() {
    let cpu = Section::Cpu.schema();
    assert!(cpu.admit(&["all", "1.0"]));
    assert!(!cpu.admit(&["0", "1.0"]));
    assert!(!cpu.admit(&[]));
    let net = Section::NetworkActivity.schema();
    assert!(net.admit(&["eth0"]));
    assert!(net.admit(&["lo"]));
    assert!(!net.admit(&["eth1"]));
    // No filter: everything goes
    let block = Section::Block.schema();
    assert!(block.admit(&["sda"]));
    assert!(block.admit(&["dev8-0"]));
}

#[test]
fn test_header_shapes() {
    let shapes = HeaderShapes::new();
    let task = "01:10:01 PM    proc/s   cswch/s".split_whitespace().collect::<Vec<&str>>();
    assert!(shapes.find(&task) == Some(Section::Task));
    let swap = "01:10:01 PM pswpin/s pswpout/s".split_whitespace().collect::<Vec<&str>>();
    assert!(shapes.find(&swap) == Some(Section::SwapStats));
    let data = "01:10:01 PM 0.00 0.00".split_whitespace().collect::<Vec<&str>>();
    assert!(shapes.find(&data).is_none());
    assert!(shapes.get(Section::Hugepages).len() == 5);
}

#[test]
fn test_section_names() {
    for s in Section::ALL {
        assert!(Section::from_str(&s.to_string()).unwrap() == s);
    }
    assert!(Section::NetworkActivity.to_string() == "NETWORK_ACTIVITY");
}
