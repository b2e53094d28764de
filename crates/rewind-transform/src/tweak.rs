//! Temporary, self-reverting state changes.
//!
//! A [`Tweaker`] commits "do" atoms through a [`Writer`] and records one [`Restore`] per
//! change. [`Tweaker::revert`] replays the restores in LIFO order so every attribute it
//! touched reads back as it was when the tweaker was created.

use std::fmt;

use rewind_atom::{Atom, Range, TempAlloc};
use tracing::{debug, warn};

use crate::{Api, ReplayError, State, Writer};

/// Alignment of temporary buffers handed out by [`Tweaker::alloc_data`].
pub const TEMP_ALIGNMENT: u64 = 8;

/// One entry of the undo stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Restore<C> {
    /// Put a single scalar attribute back.
    SetScalar(Atom<C>),
    /// Put several fields of one struct back, committed in order.
    SetFields(Vec<Atom<C>>),
    /// Delete an object the tweaker created.
    DeleteObject(Atom<C>),
    /// Release a temporary buffer.
    ReleaseBuffer(Range),
}

impl<C> Restore<C> {
    pub fn kind(&self) -> &'static str {
        match self {
            Restore::SetScalar(_) => "set-scalar",
            Restore::SetFields(_) => "set-fields",
            Restore::DeleteObject(_) => "delete-object",
            Restore::ReleaseBuffer(_) => "release-buffer",
        }
    }
}

/// A settable piece of state that can be read back for comparison.
pub trait Attribute<A: Api> {
    type Value: Clone + PartialEq + fmt::Debug;

    fn name(&self) -> &'static str;

    /// Current value; an error here aborts the tweak.
    fn get(&self, state: &State<A::State>) -> Result<Self::Value, ReplayError>;

    /// Command that sets the attribute to `value`.
    fn set(&self, value: &Self::Value) -> A::Cmd;

    /// Attributes whose write has a device-visible effect even when the value is unchanged
    /// return `true` to opt out of the minimal-diff rule.
    fn always_write(&self) -> bool {
        false
    }
}

pub struct Tweaker<'w, A: Api> {
    out: &'w mut dyn Writer<A>,
    undo: Vec<Restore<A::Cmd>>,
}

impl<'w, A: Api> Tweaker<'w, A> {
    pub fn new(out: &'w mut dyn Writer<A>) -> Self {
        Self {
            out,
            undo: Vec::new(),
        }
    }

    pub fn state(&self) -> &State<A::State> {
        self.out.state()
    }

    /// Commit a synthesized command that needs no undo (e.g. it only touches an object
    /// this tweaker will delete).
    pub fn write(&mut self, cmd: A::Cmd) -> Result<(), ReplayError> {
        self.out.mutate_and_write(Atom::new(cmd))
    }

    /// Commit a fully built atom that needs no undo.
    pub fn write_atom(&mut self, atom: Atom<A::Cmd>) -> Result<(), ReplayError> {
        self.out.mutate_and_write(atom)
    }

    /// Set `attr` to `desired` if it differs from the current value.
    ///
    /// Returns whether a change was committed. Equal values commit nothing and push nothing.
    pub fn set_if_different<T: Attribute<A>>(&mut self, attr: T, desired: T::Value) -> Result<bool, ReplayError> {
        let old = attr.get(self.out.state())?;
        if old == desired && !attr.always_write() {
            return Ok(false);
        }
        debug!(attr = attr.name(), ?old, new = ?desired, "tweak");
        self.do_and_undo(
            Atom::new(attr.set(&desired)),
            Restore::SetScalar(Atom::new(attr.set(&old))),
        )?;
        Ok(true)
    }

    /// Always commit `action` and push `inverse`.
    pub fn apply_unconditional(&mut self, action: Atom<A::Cmd>, inverse: Restore<A::Cmd>) -> Result<(), ReplayError> {
        self.do_and_undo(action, inverse)
    }

    fn do_and_undo(&mut self, action: Atom<A::Cmd>, inverse: Restore<A::Cmd>) -> Result<(), ReplayError> {
        self.out.mutate_and_write(action)?;
        self.undo.push(inverse);
        Ok(())
    }

    /// Push a restore action without committing anything now.
    pub fn push_restore(&mut self, restore: Restore<A::Cmd>) {
        self.undo.push(restore);
    }

    /// Reserve a temporary buffer holding `data`; it is released on [`Tweaker::revert`].
    pub fn alloc_data(&mut self, data: Vec<u8>) -> Result<TempAlloc, ReplayError> {
        let tmp = self.out.allocator().alloc_data(data, TEMP_ALIGNMENT)?;
        self.undo.push(Restore::ReleaseBuffer(tmp.range()));
        Ok(tmp)
    }

    /// Undo stack, oldest first.
    pub fn pending(&self) -> &[Restore<A::Cmd>] {
        &self.undo
    }

    pub fn is_clean(&self) -> bool {
        self.undo.is_empty()
    }

    /// Unwind the undo stack in LIFO order.
    ///
    /// Failing restores do not stop the unwind; they stay on the stack (in their original
    /// order) so the caller may retry, and the first failure is returned. Reverting an
    /// empty stack does nothing.
    pub fn revert(&mut self) -> Result<(), ReplayError> {
        let mut residual = Vec::new();
        let mut first_err = None;

        while let Some(restore) = self.undo.pop() {
            debug!(kind = restore.kind(), "restore");
            if let Err((remaining, err)) = self.apply_restore(restore) {
                warn!(kind = remaining.kind(), error = %err, "restore failed");
                residual.push(remaining);
                first_err.get_or_insert(err);
            }
        }

        residual.reverse();
        self.undo = residual;
        match first_err {
            None => Ok(()),
            Some(first) => Err(ReplayError::Revert {
                failed: self.undo.len(),
                first: Box::new(first),
            }),
        }
    }

    /// On failure returns the part of `restore` that was not applied.
    fn apply_restore(&mut self, restore: Restore<A::Cmd>) -> Result<(), (Restore<A::Cmd>, ReplayError)> {
        match restore {
            Restore::SetScalar(atom) => self
                .out
                .mutate_and_write(atom.clone())
                .map_err(|err| (Restore::SetScalar(atom), err)),
            Restore::DeleteObject(atom) => self
                .out
                .mutate_and_write(atom.clone())
                .map_err(|err| (Restore::DeleteObject(atom), err)),
            Restore::SetFields(atoms) => {
                for (i, atom) in atoms.iter().enumerate() {
                    if let Err(err) = self.out.mutate_and_write(atom.clone()) {
                        return Err((Restore::SetFields(atoms[i..].to_vec()), err));
                    }
                }
                Ok(())
            }
            Restore::ReleaseBuffer(range) => self
                .out
                .allocator()
                .free(range)
                .map_err(|err| (Restore::ReleaseBuffer(range), err.into())),
        }
    }
}

impl<A: Api> Drop for Tweaker<'_, A> {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            warn!(pending = self.undo.len(), "tweaker dropped without revert");
        }
    }
}
