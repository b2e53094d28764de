use std::collections::HashMap;

use rewind_atom::{Atom, AtomId};

use crate::{Api, ReplayError, Transformer, Writer};

/// Inserts pre-built atoms immediately after given atoms of the stream.
pub struct Injector<A: Api> {
    after: HashMap<AtomId, Vec<Atom<A::Cmd>>>,
}

impl<A: Api> Default for Injector<A> {
    fn default() -> Self {
        Self {
            after: HashMap::new(),
        }
    }
}

impl<A: Api> Injector<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `atom` to be written after the atom with id `after`. Atoms queued for the same
    /// position keep their queue order.
    pub fn inject(&mut self, after: AtomId, atom: Atom<A::Cmd>) -> &mut Self {
        self.after.entry(after).or_default().push(atom);
        self
    }

    pub fn pending(&self) -> usize {
        self.after.values().map(Vec::len).sum()
    }
}

impl<A: Api> Transformer<A> for Injector<A> {
    fn name(&self) -> &str {
        "Injector"
    }

    fn transform(&mut self, atom: Atom<A::Cmd>, out: &mut dyn Writer<A>) -> Result<(), ReplayError> {
        let id = atom.id;
        out.mutate_and_write(atom)?;
        if id.is_none() {
            return Ok(());
        }
        if let Some(extra) = self.after.remove(&id) {
            for atom in extra {
                out.mutate_and_write(atom)?;
            }
        }
        Ok(())
    }
}
