//! A one-register API used by unit tests.

use rewind_atom::{Atom, Command, Pool};

use crate::{Api, ReplayError};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Counter;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CounterState {
    pub value: i64,
    pub label: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CounterCmd {
    Add(i64),
    Set(i64),
    Label(u32),
    Fail,
}

impl Command for CounterCmd {
    fn name(&self) -> &'static str {
        match self {
            CounterCmd::Add(_) => "add",
            CounterCmd::Set(_) => "set",
            CounterCmd::Label(_) => "label",
            CounterCmd::Fail => "fail",
        }
    }
}

impl Api for Counter {
    type State = CounterState;
    type Cmd = CounterCmd;

    fn mutate(state: &mut CounterState, _memory: &Pool, atom: &Atom<CounterCmd>) -> Result<(), ReplayError> {
        match atom.cmd {
            CounterCmd::Add(v) => state.value += v,
            CounterCmd::Set(v) => state.value = v,
            CounterCmd::Label(v) => state.label = v,
            CounterCmd::Fail => return Err(ReplayError::schema_mismatch("fail", "always fails")),
        }
        Ok(())
    }
}
