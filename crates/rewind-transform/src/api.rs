use std::fmt;

use rewind_atom::{Atom, Command, Pool};

use crate::ReplayError;

/// An operation catalog together with the device-state model it mutates.
///
/// This is the seam to generated API code: the catalog is a closed command enum and
/// [`Api::mutate`] is its deterministic state-mutation function. Nothing else in the
/// pipeline knows how a command changes state.
pub trait Api: 'static {
    type State: Clone + fmt::Debug;
    type Cmd: Command;

    /// Apply the effect of `atom` to `state`.
    ///
    /// Read observations have already been applied to `memory`; write observations are
    /// applied after this returns.
    fn mutate(state: &mut Self::State, memory: &Pool, atom: &Atom<Self::Cmd>) -> Result<(), ReplayError>;
}

/// Everything a replay session tracks: the API state and the shadow memory pool.
#[derive(Clone, Debug, Default)]
pub struct State<S> {
    pub memory: Pool,
    pub api: S,
}

impl<S> State<S> {
    pub fn new(api: S) -> Self {
        Self {
            memory: Pool::new(),
            api,
        }
    }
}
