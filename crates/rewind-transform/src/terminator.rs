use rewind_atom::{Atom, AtomId};
use tracing::debug;

use crate::{Api, ReplayError, Transformer, Writer};

/// Drops every atom after the atom with id `last`.
///
/// The stream is still consumed to the end; later stages simply see nothing more.
pub struct EarlyTerminator {
    last: AtomId,
    done: bool,
}

impl EarlyTerminator {
    pub fn new(last: AtomId) -> Self {
        Self { last, done: false }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<A: Api> Transformer<A> for EarlyTerminator {
    fn name(&self) -> &str {
        "EarlyTerminator"
    }

    fn transform(&mut self, atom: Atom<A::Cmd>, out: &mut dyn Writer<A>) -> Result<(), ReplayError> {
        if self.done {
            return Ok(());
        }
        if atom.id == self.last {
            debug!(id = %atom.id, "terminating stream");
            self.done = true;
        }
        out.mutate_and_write(atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Counter, CounterCmd};
    use crate::{Recorder, State, Transforms};
    use rewind_atom::Allocator;

    #[test]
    fn drops_everything_after_last() {
        let mut transforms = Transforms::<Counter>::new();
        transforms.add(EarlyTerminator::new(AtomId(1)));
        let mut out = Recorder::<Counter>::new(State::default(), Allocator::default());
        let atoms = (0..4).map(|i| Atom::with_id(AtomId(i), CounterCmd::Add(1)));
        let stats = transforms.transform(atoms, &mut out).unwrap();
        assert_eq!(stats.atoms_in, 4);
        assert_eq!(out.output().len(), 2);
        assert_eq!(out.state().api.value, 2);
    }
}
