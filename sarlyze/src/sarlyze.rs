/// `sarlyze` -- Analyze `sar` activity report logs
///
/// Run with --help for brief help.
///
/// The logs to read are either named explicitly after `--`, or are found from a system list (see
/// sarlog's configs.rs) and a day of the month: every system's log for that day is read.  Each file
/// is parsed on its own thread.  A missing file is reported and skipped, any other problem with a
/// file is an error.
///
/// Quirks
///
/// A log's dates come from the log, not from the day used to find it, so a file that runs past
/// midnight yields rows for the next day too.
///
/// When log files are named explicitly, the name of the system is taken from the directory holding
/// the file, if there is one, as for the system list.  There is no --system filtering of explicit
/// files.
mod collect;
mod format;
mod load;
mod parse;
mod reboots;
mod sections;

use anyhow::{bail, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use collect::Source;
use sarlog::{self, Section};
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use ustr::Ustr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print information about the program
    Version,

    /// Print the known sections and how they are recognized
    Sections(SectionsCmdArgs),

    /// Parse one section from the logs and print it, for all selected systems
    Parse(ParseCmdArgs),

    /// Print the LOAD section with the run queue and blocked tasks relative to the task list
    Load(LoadCmdArgs),

    /// Print the restart events in the logs
    Reboots(RebootsCmdArgs),
}

#[derive(Args, Debug)]
pub struct SectionsCmdArgs {
    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct ParseCmdArgs {
    /// The section to print, eg CPU or NETWORK_ACTIVITY (see `sarlyze sections`)
    section: Section,

    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct LoadCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct RebootsCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// File containing JSON data with the list of systems [default: $SARLYZE_CONFIG]
    #[arg(long)]
    config_file: Option<String>,

    /// Day of the month of the logs to read, 1-31 [default: today]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
    day: Option<u32>,

    /// Select this system from the system list (repeatable) [default: all]
    #[arg(long)]
    system: Vec<String>,

    /// Log file names (overrides --config-file)
    #[arg(last = true)]
    logfiles: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct PrintArgs {
    /// Select fields and format for the output [default: command dependent].  Use --fmt=help to
    /// list fields and options
    #[arg(long)]
    fmt: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct MetaArgs {
    /// Print useful debugging information on stderr (RUST_LOG overrides)
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() {
    match sarlyze() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            process::exit(1);
        }
    }
}

fn sarlyze() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        // Syntax: components are space-separated, the keyword "sarlyze" is always first, every
        // other component is keyword(value).
        println!("sarlyze version({}) features()", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if match cli.command {
        Commands::Sections(ref args) => format::maybe_help(&args.print_args.fmt, sections::fmt_help),
        Commands::Parse(ref args) => {
            let section = args.section;
            format::maybe_help(&args.print_args.fmt, || parse::fmt_help(section, &[]))
        }
        Commands::Load(ref args) => format::maybe_help(&args.print_args.fmt, load::fmt_help),
        Commands::Reboots(ref args) => format::maybe_help(&args.print_args.fmt, reboots::fmt_help),
        Commands::Version => false,
    } {
        return Ok(());
    }

    let meta_args = match cli.command {
        Commands::Sections(ref args) => &args.meta_args,
        Commands::Parse(ref args) => &args.meta_args,
        Commands::Load(ref args) => &args.meta_args,
        Commands::Reboots(ref args) => &args.meta_args,
        Commands::Version => bail!("Unexpected"),
    };
    init_logging(meta_args.verbose);

    // The registry must be consistent before any log is read.
    sarlog::validate_registry()?;

    match cli.command {
        Commands::Sections(ref args) => sections::print_sections(&mut io::stdout(), &args.print_args),
        Commands::Parse(ref args) => {
            let sources = resolve_sources(&args.source_args)?;
            parse::parse_and_print(&mut io::stdout(), args.section, &sources, &args.print_args)
        }
        Commands::Load(ref args) => {
            let sources = resolve_sources(&args.source_args)?;
            load::aggregate_and_print_load(&mut io::stdout(), &sources, &args.print_args)
        }
        Commands::Reboots(ref args) => {
            let sources = resolve_sources(&args.source_args)?;
            reboots::scan_and_print_reboots(&mut io::stdout(), &sources, &args.print_args)
        }
        Commands::Version => bail!("Unexpected"),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// The (system, file) pairs to process, in order.

fn resolve_sources(source_args: &SourceArgs) -> Result<Vec<Source>> {
    if !source_args.logfiles.is_empty() {
        return Ok(source_args
            .logfiles
            .iter()
            .map(|f| {
                let system = sarlog::system_name_from_path(f).unwrap_or_else(|| Ustr::from(f.as_str()));
                (system, PathBuf::from(f))
            })
            .collect());
    }

    let config_file = if let Some(ref f) = source_args.config_file {
        f.clone()
    } else if let Ok(f) = env::var("SARLYZE_CONFIG") {
        f
    } else {
        bail!("No system list, use --config-file or set SARLYZE_CONFIG, or name log files after --");
    };
    tracing::debug!(config_file = %config_file, "Reading system list");
    let mut systems = sarlog::read_from_json(&config_file)?;

    if !source_args.system.is_empty() {
        for name in &source_args.system {
            if !systems.iter().any(|s| s.name.as_str() == name) {
                bail!("Unknown system {name}");
            }
        }
        systems.retain(|s| source_args.system.iter().any(|name| s.name.as_str() == name));
    }

    let day = match source_args.day {
        Some(d) => d,
        None => chrono::Local::now().day(),
    };
    let files = sarlog::find_logfiles(&systems, day)?;
    tracing::debug!(?files, "Log files");
    Ok(files)
}

#[test]
fn test_resolve_explicit() {
    let args = SourceArgs {
        logfiles: vec![
            "../tests/sarlog/data/system2/sar15".to_string(),
            "sar15".to_string(),
        ],
        ..Default::default()
    };
    let sources = resolve_sources(&args).unwrap();
    assert!(sources[0] == (Ustr::from("system2"), PathBuf::from("../tests/sarlog/data/system2/sar15")));
    assert!(sources[1] == (Ustr::from("sar15"), PathBuf::from("sar15")));
}

#[test]
fn test_resolve_config() {
    let args = SourceArgs {
        config_file: Some("../tests/sarlog/config.json".to_string()),
        day: Some(15),
        system: vec!["system3".to_string(), "system1".to_string()],
        ..Default::default()
    };
    let sources = resolve_sources(&args).unwrap();
    assert!(sources.len() == 2);
    assert!(sources[0] == (Ustr::from("system1"), PathBuf::from("../tests/sarlog/data/system1/sar15")));
    assert!(sources[1].0 == Ustr::from("system3"));

    let args = SourceArgs {
        config_file: Some("../tests/sarlog/config.json".to_string()),
        day: Some(15),
        system: vec!["system9".to_string()],
        ..Default::default()
    };
    assert!(resolve_sources(&args).is_err());
}

#[test]
fn test_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();

    let cli = Cli::try_parse_from(["sarlyze", "parse", "NETWORK_ERROR", "--day", "3", "--", "a", "b"]).unwrap();
    match cli.command {
        Commands::Parse(args) => {
            assert!(args.section == Section::NetworkError);
            assert!(args.source_args.day == Some(3));
            assert!(args.source_args.logfiles == vec!["a", "b"]);
        }
        _ => assert!(false),
    }
    assert!(Cli::try_parse_from(["sarlyze", "parse", "DISK"]).is_err());
    assert!(Cli::try_parse_from(["sarlyze", "load", "--day", "32"]).is_err());
}
