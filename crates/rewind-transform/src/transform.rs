use rewind_atom::{Allocator, Atom};
use tracing::{debug, info};

use crate::{Api, ReplayError, State, Writer};

/// A named stage that observes and rewrites the atom stream.
///
/// A stage keeps an atom by calling `out.mutate_and_write(atom)` exactly once for it;
/// not calling it drops the atom. It may commit synthesized atoms before or after, and
/// read `out.state()` at any point.
pub trait Transformer<A: Api> {
    fn name(&self) -> &str;

    fn transform(&mut self, atom: Atom<A::Cmd>, out: &mut dyn Writer<A>) -> Result<(), ReplayError>;

    /// Called once after the last atom of the stream.
    fn flush(&mut self, _out: &mut dyn Writer<A>) -> Result<(), ReplayError> {
        Ok(())
    }
}

/// Closure-backed stage, see [`from_fn`].
pub struct FnTransform<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`Transformer`].
pub fn from_fn<A, F>(name: impl Into<String>, f: F) -> FnTransform<F>
where
    A: Api,
    F: FnMut(Atom<A::Cmd>, &mut dyn Writer<A>) -> Result<(), ReplayError>,
{
    FnTransform {
        name: name.into(),
        f,
    }
}

impl<A, F> Transformer<A> for FnTransform<F>
where
    A: Api,
    F: FnMut(Atom<A::Cmd>, &mut dyn Writer<A>) -> Result<(), ReplayError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&mut self, atom: Atom<A::Cmd>, out: &mut dyn Writer<A>) -> Result<(), ReplayError> {
        (self.f)(atom, out)
    }
}

/// Summary of one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub atoms_in: u64,
}

/// An ordered list of stages run as a single pass over the stream.
pub struct Transforms<A: Api> {
    stages: Vec<Box<dyn Transformer<A>>>,
}

impl<A: Api> Default for Transforms<A> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<A: Api> Transforms<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in insertion order.
    pub fn add(&mut self, stage: impl Transformer<A> + 'static) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every atom of `atoms` through the stages and into `out`, then flush the stages
    /// in order.
    ///
    /// Each atom is fully processed before the next is pulled. The first error stops the
    /// pass; state is left as applied so far.
    pub fn transform<I>(&mut self, atoms: I, out: &mut dyn Writer<A>) -> Result<PassStats, ReplayError>
    where
        I: IntoIterator<Item = Atom<A::Cmd>>,
    {
        let mut stats = PassStats::default();
        for atom in atoms {
            let id = atom.id;
            stats.atoms_in += 1;
            Chain {
                stages: self.stages.as_mut_slice(),
                out: &mut *out,
            }
            .mutate_and_write(atom)
            .map_err(|err| err.at(id))?;
        }

        for i in 0..self.stages.len() {
            let (head, tail) = self.stages[i..].split_at_mut(1);
            let stage = &mut head[0];
            debug!(stage = stage.name(), "flush");
            stage.flush(&mut Chain {
                stages: tail,
                out: &mut *out,
            })?;
        }

        info!(atoms = stats.atoms_in, stages = self.stages.len(), "transform pass complete");
        Ok(stats)
    }
}

/// The writer a stage sees: the remaining stages followed by the terminal writer.
struct Chain<'a, 'w, A: Api> {
    stages: &'a mut [Box<dyn Transformer<A>>],
    out: &'a mut (dyn Writer<A> + 'w),
}

impl<A: Api> Writer<A> for Chain<'_, '_, A> {
    fn state(&self) -> &State<A::State> {
        self.out.state()
    }

    fn allocator(&mut self) -> &mut Allocator {
        self.out.allocator()
    }

    fn mutate_and_write(&mut self, atom: Atom<A::Cmd>) -> Result<(), ReplayError> {
        match self.stages.split_first_mut() {
            Some((stage, rest)) => stage.transform(
                atom,
                &mut Chain {
                    stages: rest,
                    out: &mut *self.out,
                },
            ),
            None => self.out.mutate_and_write(atom),
        }
    }
}
