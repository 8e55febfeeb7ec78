// src/main.rs
//! Memtrace inspector
//!
//! Prints the header and aggregate counts of a recorded trace file.
//!
//! ```text
//! memtrace <trace-file> [--json] [--events N]
//! ```

use anyhow::{bail, Context, Result};
use memtrace::observability::init_tracing;
use memtrace::{BuildInfo, TraceReader};
use std::path::PathBuf;
use tracing::{debug, info};

struct Args {
    path: PathBuf,
    json: bool,
    events: usize,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut path = None;
        let mut json = false;
        let mut events = 0;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--events" => {
                    let value = args.next().context("--events needs a count")?;
                    events = value
                        .parse()
                        .with_context(|| format!("invalid event count {:?}", value))?;
                }
                "-h" | "--help" => {
                    println!("usage: memtrace <trace-file> [--json] [--events N]");
                    std::process::exit(0);
                }
                other if other.starts_with("--") => bail!("unknown option {}", other),
                other => {
                    if path.replace(PathBuf::from(other)).is_some() {
                        bail!("only one trace file may be given");
                    }
                }
            }
        }

        Ok(Self {
            path: path.context("usage: memtrace <trace-file> [--json] [--events N]")?,
            json,
            events,
        })
    }
}

fn main() -> Result<()> {
    init_tracing()?;

    let build = BuildInfo::current();
    debug!("memtrace v{} ({})", build.version, build.git_hash);

    let args = Args::parse()?;
    let reader = TraceReader::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;

    info!("Inspecting {}", args.path.display());
    let summary = reader.summarize()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("trace:          {}", args.path.display());
        println!("file size:      {} bytes", summary.file_bytes);
        println!("buffer:         {} events", summary.buffer_capacity);
        println!("address width:  {} bytes", summary.address_width);
        println!("batches:        {}", summary.batches);
        println!("records:        {}", summary.records);
        println!("  reads:        {}", summary.reads);
        println!("  writes:       {}", summary.writes);
        println!("  other:        {}", summary.other_ops);
        if let (Some(min), Some(max)) = (summary.min_address, summary.max_address) {
            println!("address range:  {:#x}..={:#x}", min, max);
        }
    }

    for record in reader.records().take(args.events) {
        let record = record?;
        if args.json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!(
                "{:>10}  {:#018x}  {}",
                record.instruction_id, record.address, record.operation as char
            );
        }
    }

    Ok(())
}
