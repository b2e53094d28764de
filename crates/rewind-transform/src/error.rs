use rewind_atom::{AtomId, MemoryError};
use thiserror::Error;

/// Fatal conditions of a replay pass.
///
/// None of these are retried: the in-flight tweak or transform step is abandoned and the
/// pass terminates, reporting the offending atom through [`ReplayError::AtAtom`].
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the current state to decide a diff failed.
    #[error("state query failed: {0}")]
    StateQuery(String),

    #[error("no unused identifier in namespace '{tag}' after {searched} candidates")]
    IdExhausted { tag: char, searched: u32 },

    #[error("no namespace registered for tag '{0}'")]
    UnknownNamespace(char),

    /// The atom's arguments or observations disagree with its command's schema.
    #[error("schema mismatch in {cmd}: {reason}")]
    SchemaMismatch { cmd: &'static str, reason: String },

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Some restore actions failed; they remain on the undo stack.
    #[error("revert left {failed} restore action(s) pending: {first}")]
    Revert {
        failed: usize,
        first: Box<ReplayError>,
    },

    #[error("atom {id}: {source}")]
    AtAtom {
        id: AtomId,
        #[source]
        source: Box<ReplayError>,
    },
}

impl ReplayError {
    pub fn state_query(msg: impl Into<String>) -> Self {
        Self::StateQuery(msg.into())
    }

    pub fn schema_mismatch(cmd: &'static str, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            cmd,
            reason: reason.into(),
        }
    }

    /// Attach the stream position of the atom being processed. Already-located errors are
    /// returned unchanged so the innermost position wins.
    pub fn at(self, id: AtomId) -> Self {
        match self {
            located @ Self::AtAtom { .. } => located,
            other => Self::AtAtom {
                id,
                source: Box::new(other),
            },
        }
    }

    /// Position of the offending atom, if known.
    pub fn atom_id(&self) -> Option<AtomId> {
        match self {
            Self::AtAtom { id, .. } => Some(*id),
            _ => None,
        }
    }
}
