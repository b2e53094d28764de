use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::memory::Observation;

/// Position of an atom in the captured stream.
///
/// Atoms synthesized by a transform carry [`AtomId::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(pub u64);

impl AtomId {
    pub const NONE: Self = Self(u64::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for AtomId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AtomFlags: u32 {
        /// The atom presents the current frame.
        const END_OF_FRAME = 1 << 0;
        /// The atom issues a draw.
        const DRAW_CALL = 1 << 1;
    }
}

impl AtomFlags {
    pub fn is_end_of_frame(self) -> bool {
        self.contains(Self::END_OF_FRAME)
    }

    pub fn is_draw_call(self) -> bool {
        self.contains(Self::DRAW_CALL)
    }
}

/// Implemented by every command in an operation catalog.
pub trait Command: Clone + fmt::Debug {
    /// API entry-point name, e.g. `glBindBuffer`.
    fn name(&self) -> &'static str;

    /// Flags implied by the command kind.
    fn flags(&self) -> AtomFlags {
        AtomFlags::empty()
    }
}

/// Reads and writes of the shadow memory pool made by one atom.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<Observation>,
}

impl Observations {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }
}

/// One recorded or synthesized API invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom<C> {
    #[serde(default)]
    pub id: AtomId,
    pub cmd: C,
    #[serde(default, skip_serializing_if = "Observations::is_empty")]
    pub observations: Observations,
    #[serde(default)]
    pub flags: AtomFlags,
}

impl<C: Command> Atom<C> {
    /// Builds a synthesized atom (id [`AtomId::NONE`]).
    pub fn new(cmd: C) -> Self {
        Self::with_id(AtomId::NONE, cmd)
    }

    pub fn with_id(id: AtomId, cmd: C) -> Self {
        let flags = cmd.flags();
        Self {
            id,
            cmd,
            observations: Observations::default(),
            flags,
        }
    }

    pub fn name(&self) -> &'static str {
        self.cmd.name()
    }
}

impl<C> Atom<C> {
    pub fn with_read(mut self, observation: Observation) -> Self {
        self.observations.reads.push(observation);
        self
    }

    pub fn with_write(mut self, observation: Observation) -> Self {
        self.observations.writes.push(observation);
        self
    }

    pub fn with_flags(mut self, flags: AtomFlags) -> Self {
        self.flags |= flags;
        self
    }
}
