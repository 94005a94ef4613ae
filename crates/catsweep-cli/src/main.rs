//! Command-line front end: load a JSON snapshot, sweep it, print the report.
//!
//! Dry run is the default; only `--dry-run=false` commits, the same
//! default-safe asymmetry the engine itself has.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use catsweep_core::memory::{MemoryKeyGenerator, MemoryStore, Snapshot};
use catsweep_core::{CatalogKind, CatalogSpec, Mode, SweepConfig, Sweeper};
use catsweep_error::SweepError;

const ENV_LOG: &str = "CATSWEEP_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    snapshot_path: String,
    dry_run: Option<String>,
    out_path: Option<String>,
    json: bool,
    show_help: bool,
}

fn main() {
    init_tracing();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let exit_code = run(std::env::args_os(), &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    match run_sweep(&options, out) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            1
        }
    }
}

fn run_sweep<W: Write>(options: &CliOptions, out: &mut W) -> Result<(), SweepError> {
    let raw = std::fs::read_to_string(&options.snapshot_path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .map_err(|e| SweepError::snapshot(format!("{}: {e}", options.snapshot_path)))?;

    let store = MemoryStore::load(&snapshot);
    let generator = MemoryKeyGenerator::default();
    let config = config_from(&store);
    let sweeper = Sweeper::new(&store, &store, &generator, &store, config);

    let mode = Mode::from_param(options.dry_run.as_deref());
    let report = sweeper.sweep(mode)?;

    if options.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| SweepError::snapshot(format!("report encoding: {e}")))?;
        writeln!(out, "{rendered}")?;
    } else {
        writeln!(out, "{}", report.render())?;
    }

    if let Some(out_path) = &options.out_path {
        if !mode.commits() {
            return Err(SweepError::snapshot(
                "--out needs commit mode; a dry run leaves nothing to write",
            ));
        }
        store.checkpoint();
        let repaired = serde_json::to_string_pretty(&store.to_snapshot())
            .map_err(|e| SweepError::snapshot(format!("snapshot encoding: {e}")))?;
        std::fs::write(PathBuf::from(out_path), repaired)?;
    }
    Ok(())
}

/// Process every catalog the snapshot declares, in its order.
fn config_from(store: &MemoryStore) -> SweepConfig {
    SweepConfig {
        catalogs: store
            .catalog_kinds()
            .into_iter()
            .map(|(name, kind)| match kind {
                CatalogKind::Content => CatalogSpec::content(name),
                CatalogKind::Reference => CatalogSpec::reference(name),
            })
            .collect(),
        ..SweepConfig::default()
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut snapshot_path: Option<String> = None;
    let mut dry_run: Option<String> = None;
    let mut out_path: Option<String> = None;
    let mut json = false;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();
        match arg_str {
            "-h" | "--help" => show_help = true,
            "--json" => json = true,
            "--dry-run" => dry_run = Some("true".to_owned()),
            "--out" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--out needs a path".to_owned())?;
                out_path = Some(value.to_string_lossy().into_owned());
            }
            _ if arg_str.starts_with("--dry-run=") => {
                dry_run = Some(arg_str["--dry-run=".len()..].to_owned());
            }
            _ if arg_str.starts_with("--out=") => {
                out_path = Some(arg_str["--out=".len()..].to_owned());
            }
            _ if arg_str.starts_with('-') => {
                return Err(format!("unknown option: {arg_str}"));
            }
            _ => {
                if snapshot_path.is_some() {
                    return Err(format!("unexpected argument: {arg_str}"));
                }
                snapshot_path = Some(arg_str.to_owned());
            }
        }
    }

    if show_help {
        return Ok(CliOptions {
            snapshot_path: String::new(),
            dry_run,
            out_path,
            json,
            show_help,
        });
    }
    let snapshot_path = snapshot_path.ok_or_else(|| "missing snapshot path".to_owned())?;
    Ok(CliOptions {
        snapshot_path,
        dry_run,
        out_path,
        json,
        show_help,
    })
}

fn write_usage<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "usage: catsweep [OPTIONS] <snapshot.json>")?;
    writeln!(out)?;
    writeln!(out, "Audit the snapshot's catalogs against its object store.")?;
    writeln!(out)?;
    writeln!(out, "options:")?;
    writeln!(
        out,
        "  --dry-run=<value>  only the literal 'false' commits; everything else reports"
    )?;
    writeln!(
        out,
        "  --out <path>       write the repaired snapshot (commit mode only)"
    )?;
    writeln!(out, "  --json             emit the structured report as JSON")?;
    writeln!(out, "  -h, --help         show this help")?;
    Ok(())
}
