use rewind_atom::{Allocator, Atom};
use rewind_transform::{Recorder, State, Writer};

use crate::cmd::Cmd;
use crate::types::{ContextId, SurfaceId};
use crate::Gles;

pub const SURFACE: SurfaceId = SurfaceId(1);
pub const CONTEXT: ContextId = ContextId(1);

pub fn setup(major: u32) -> Vec<Cmd> {
    vec![
        Cmd::EglCreateContext {
            context: CONTEXT,
            major_version: major,
            minor_version: 0,
        },
        Cmd::EglCreateWindowSurface {
            surface: SURFACE,
            width: 320,
            height: 240,
        },
        Cmd::EglMakeCurrent {
            draw: SURFACE,
            read: SURFACE,
            context: CONTEXT,
        },
    ]
}

/// A recorder with a current, initialized GLES `major`.0 context.
pub fn session(major: u32) -> Recorder<Gles> {
    let mut out = Recorder::new(State::default(), Allocator::new(0x1000_0000, 1 << 20));
    for cmd in setup(major) {
        out.mutate_and_write(Atom::new(cmd)).unwrap();
    }
    out
}
