//! The command-stream mutation pipeline.
//!
//! - [`Writer`]: the only path by which atoms mutate [`State`].
//! - [`Transforms`]: ordered composition of [`Transformer`] stages into one pass.
//! - [`Tweaker`]: minimal-diff, transactional state changes with LIFO rollback.
//! - [`Namespaces`]: collision-free object ids, queried from state at call time.
//!
//! The API being replayed plugs in through [`Api`].

mod api;
mod error;
pub mod id;
mod injector;
mod terminator;
mod transform;
pub mod tweak;
mod writer;

#[cfg(test)]
mod testing;

pub use api::{Api, State};
pub use error::ReplayError;
pub use id::{unused_id, LivePredicate, Namespaces};
pub use injector::Injector;
pub use terminator::EarlyTerminator;
pub use transform::{from_fn, FnTransform, PassStats, Transformer, Transforms};
pub use tweak::{Attribute, Restore, Tweaker};
pub use writer::{Recorder, Writer};
