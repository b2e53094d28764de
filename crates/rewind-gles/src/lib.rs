//! GLES/EGL operation catalog, device-state model and state-aware transforms.
//!
//! [`Gles`] plugs the catalog into the `rewind-transform` pipeline. [`GlesTweaker`] makes
//! temporary, exactly-reverted state changes, and [`UndefinedFramebuffer`] uses it to paint
//! framebuffers whose contents are undefined.

mod cmd;
mod mutate;
pub mod names;
pub mod state;
pub mod tweaker;
pub mod types;
mod undefined_framebuffer;

#[cfg(test)]
mod testing;

pub use cmd::Cmd;
pub use mutate::Gles;
pub use names::namespaces;
pub use state::{Context, GlesState};
pub use tweaker::GlesTweaker;
pub use undefined_framebuffer::UndefinedFramebuffer;
