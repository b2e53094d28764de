//! Runs one replay pass over a JSON-lines GLES atom stream.
//!
//! Each input line is one [`Atom`] serialized as JSON. Atoms without an `id` are numbered
//! by their line position.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use rewind_atom::{Allocator, Atom, AtomId, Command, DEFAULT_TEMP_BASE, DEFAULT_TEMP_SIZE};
use rewind_gles::{Cmd, Gles, GlesState, UndefinedFramebuffer};
use rewind_transform::{EarlyTerminator, PassStats, Recorder, State, Transforms};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Alignment required of the temporary-buffer arena.
const ARENA_ALIGNMENT: u64 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    pub input: PathBuf,
    /// Paint undefined framebuffer contents.
    pub undefined_framebuffer: bool,
    /// Drop every atom after this id.
    pub stop_after: Option<u64>,
    /// Where to write the rewritten stream.
    pub output: Option<PathBuf>,
    pub dump_state: bool,
    pub memory_base: u64,
    pub memory_size: u64,
}

impl ReplayConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            undefined_framebuffer: false,
            stop_after: None,
            output: None,
            dump_state: false,
            memory_base: DEFAULT_TEMP_BASE,
            memory_size: DEFAULT_TEMP_SIZE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.memory_size > 0, "temporary-buffer arena must not be empty");
        ensure!(
            self.memory_base != 0 && self.memory_base % ARENA_ALIGNMENT == 0,
            "temporary-buffer arena base {:#x} must be non-zero and {ARENA_ALIGNMENT}-byte aligned",
            self.memory_base
        );
        if self.memory_base.checked_add(self.memory_size).is_none() {
            bail!(
                "temporary-buffer arena {:#x}+{:#x} overflows the address space",
                self.memory_base,
                self.memory_size
            );
        }
        if let Some(stop) = self.stop_after {
            ensure!(!AtomId(stop).is_none(), "--stop-after {stop} is reserved for synthesized atoms");
        }
        if let Some(output) = &self.output {
            ensure!(output != &self.input, "output would overwrite the input stream");
        }
        Ok(())
    }
}

/// Parse a JSON-lines atom stream. Blank lines are skipped.
pub fn read_atoms(reader: impl BufRead) -> Result<Vec<Atom<Cmd>>> {
    let mut atoms = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut atom: Atom<Cmd> =
            serde_json::from_str(&line).with_context(|| format!("invalid atom on line {}", index + 1))?;
        if atom.id.is_none() {
            atom.id = AtomId(index as u64);
        }
        // Flags implied by the command are not trusted to the capture.
        let implied = atom.cmd.flags();
        atom.flags |= implied;
        atoms.push(atom);
    }
    Ok(atoms)
}

/// Serialize `atoms` as JSON lines.
pub fn write_atoms(mut writer: impl Write, atoms: &[Atom<Cmd>]) -> Result<()> {
    for atom in atoms {
        serde_json::to_writer(&mut writer, atom).context("failed to serialize atom")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Hex SHA-256 of the JSON-lines encoding of `atoms`.
pub fn digest(atoms: &[Atom<Cmd>]) -> Result<String> {
    let mut bytes = Vec::new();
    write_atoms(&mut bytes, atoms)?;
    Ok(hex(&Sha256::digest(&bytes)))
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Result of one pass.
#[derive(Debug)]
pub struct Replay {
    pub stats: PassStats,
    pub state: State<GlesState>,
    pub output: Vec<Atom<Cmd>>,
}

impl Replay {
    /// Atoms in the output that no capture produced.
    pub fn synthesized(&self) -> usize {
        self.output.iter().filter(|a| a.id.is_none()).count()
    }

    pub fn digest(&self) -> Result<String> {
        digest(&self.output)
    }
}

/// Build the stage list described by `config`.
pub fn transforms(config: &ReplayConfig) -> Transforms<Gles> {
    let mut transforms = Transforms::new();
    if let Some(last) = config.stop_after {
        transforms.add(EarlyTerminator::new(AtomId(last)));
    }
    if config.undefined_framebuffer {
        transforms.add(UndefinedFramebuffer::new());
    }
    transforms
}

pub fn run_pass(config: &ReplayConfig, atoms: Vec<Atom<Cmd>>) -> Result<Replay> {
    config.validate()?;
    let mut transforms = transforms(config);
    debug!(stages = ?transforms.names(), "starting pass");

    let mut out = Recorder::<Gles>::new(
        State::default(),
        Allocator::new(config.memory_base, config.memory_size),
    );
    let stats = transforms.transform(atoms, &mut out).context("replay pass failed")?;
    let (state, output) = out.into_parts();
    let replay = Replay { stats, state, output };
    info!(
        atoms_in = replay.stats.atoms_in,
        atoms_out = replay.output.len(),
        synthesized = replay.synthesized(),
        "replay finished"
    );
    Ok(replay)
}
