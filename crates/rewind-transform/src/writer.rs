use rewind_atom::{Allocator, Atom, Displaced};
use tracing::trace;

use crate::{Api, ReplayError, State};

/// The single gateway between atoms and [`State`].
///
/// [`Writer::mutate_and_write`] is the only way state changes: mutation order is exactly
/// commit order, with no buffering or reordering. [`Writer::state`] is a live view for
/// callers deciding what to change next.
pub trait Writer<A: Api> {
    fn state(&self) -> &State<A::State>;

    /// Allocator for temporary buffers carried by synthesized atoms.
    fn allocator(&mut self) -> &mut Allocator;

    /// Commit `atom` and pass it on to the next stage.
    fn mutate_and_write(&mut self, atom: Atom<A::Cmd>) -> Result<(), ReplayError>;
}

/// Terminal writer: applies atoms to the owned state and records the output stream.
pub struct Recorder<A: Api> {
    state: State<A::State>,
    allocator: Allocator,
    output: Vec<Atom<A::Cmd>>,
}

impl<A: Api> Recorder<A> {
    pub fn new(state: State<A::State>, allocator: Allocator) -> Self {
        Self {
            state,
            allocator,
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> &[Atom<A::Cmd>] {
        &self.output
    }

    pub fn allocator_ref(&self) -> &Allocator {
        &self.allocator
    }

    pub fn into_parts(self) -> (State<A::State>, Vec<Atom<A::Cmd>>) {
        (self.state, self.output)
    }
}

impl<A: Api> Writer<A> for Recorder<A> {
    fn state(&self) -> &State<A::State> {
        &self.state
    }

    fn allocator(&mut self) -> &mut Allocator {
        &mut self.allocator
    }

    /// The pool is left untouched when the atom fails.
    fn mutate_and_write(&mut self, atom: Atom<A::Cmd>) -> Result<(), ReplayError> {
        trace!(id = %atom.id, cmd = atom.name(), "commit");
        let observations = &atom.observations;
        for observation in observations.reads.iter().chain(&observations.writes) {
            observation.validate()?;
        }

        let mut displaced = Displaced::default();
        for read in &observations.reads {
            if let Err(err) = self.state.memory.apply_logged(read, &mut displaced) {
                self.state.memory.restore(displaced);
                return Err(err.into());
            }
        }
        if let Err(err) = A::mutate(&mut self.state.api, &self.state.memory, &atom) {
            self.state.memory.restore(displaced);
            return Err(err);
        }
        for write in &observations.writes {
            self.state.memory.apply(write)?;
        }
        self.output.push(atom);
        Ok(())
    }
}
