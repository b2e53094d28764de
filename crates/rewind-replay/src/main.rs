#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rewind_atom::{DEFAULT_TEMP_BASE, DEFAULT_TEMP_SIZE};
use rewind_replay::{read_atoms, run_pass, write_atoms, ReplayConfig};

#[derive(Debug, Parser)]
#[command(about = "Replay a JSON-lines GLES atom stream through the transform pipeline")]
struct Args {
    /// Atom stream, one JSON atom per line.
    input: PathBuf,

    /// Paint a pattern wherever framebuffer contents are undefined.
    #[arg(long)]
    undefined_framebuffer: bool,

    /// Drop every atom after the atom with this id.
    #[arg(long, value_name = "N")]
    stop_after: Option<u64>,

    /// Write the rewritten stream here (JSON lines).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the final device state as JSON on stdout.
    #[arg(long)]
    dump_state: bool,

    /// Base address of the temporary-buffer arena.
    #[arg(long, default_value_t = DEFAULT_TEMP_BASE, value_parser = parse_u64)]
    memory_base: u64,

    /// Size in bytes of the temporary-buffer arena.
    #[arg(long, default_value_t = DEFAULT_TEMP_SIZE, value_parser = parse_u64)]
    memory_size: u64,
}

impl From<Args> for ReplayConfig {
    fn from(args: Args) -> Self {
        Self {
            input: args.input,
            undefined_framebuffer: args.undefined_framebuffer,
            stop_after: args.stop_after,
            output: args.output,
            dump_state: args.dump_state,
            memory_base: args.memory_base,
            memory_size: args.memory_size,
        }
    }
}

/// Accepts decimal or `0x`-prefixed hex.
fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = ReplayConfig::from(Args::parse());
    if let Err(err) = config.validate() {
        tracing::error!("invalid config: {err:#}");
        return Err(err);
    }

    let file = File::open(&config.input).with_context(|| format!("failed to open {}", config.input.display()))?;
    let atoms = read_atoms(BufReader::new(file))?;
    let replay = run_pass(&config, atoms)?;

    if let Some(path) = &config.output {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        write_atoms(BufWriter::new(file), &replay.output)?;
    }

    println!(
        "atoms in={} out={} synthesized={} sha256={}",
        replay.stats.atoms_in,
        replay.output.len(),
        replay.synthesized(),
        replay.digest()?
    );
    if config.dump_state {
        let json = serde_json::to_string_pretty(&replay.state.api).context("failed to serialize state")?;
        println!("{json}");
    }
    Ok(())
}
