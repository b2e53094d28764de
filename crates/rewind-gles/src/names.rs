//! Id namespaces for synthesized GLES objects.

use rewind_transform::{LivePredicate, Namespaces};

use crate::state::Context;
use crate::types::*;

pub const BUFFERS: char = 'B';
pub const RENDERBUFFERS: char = 'R';
pub const FRAMEBUFFERS: char = 'F';
pub const TEXTURES: char = 'T';
pub const VERTEX_ARRAYS: char = 'V';
pub const PROGRAMS: char = 'P';
pub const SHADERS: char = 'S';

fn buffer(ctx: &Context, id: u32) -> bool {
    ctx.objects.buffers.contains_key(&BufferId(id))
}

fn renderbuffer(ctx: &Context, id: u32) -> bool {
    ctx.objects.renderbuffers.contains_key(&RenderbufferId(id))
}

fn framebuffer(ctx: &Context, id: u32) -> bool {
    ctx.objects.framebuffers.contains_key(&FramebufferId(id))
}

fn texture(ctx: &Context, id: u32) -> bool {
    ctx.objects.textures.contains_key(&TextureId(id))
}

fn vertex_array(ctx: &Context, id: u32) -> bool {
    ctx.objects.vertex_arrays.contains_key(&VertexArrayId(id))
}

fn program(ctx: &Context, id: u32) -> bool {
    ctx.objects.programs.contains_key(&ProgramId(id))
}

fn shader(ctx: &Context, id: u32) -> bool {
    ctx.objects.shaders.contains_key(&ShaderId(id))
}

/// The namespace table for one replay session.
///
/// Programs and shaders share a single GL name space, so both of their tags test both maps.
pub fn namespaces() -> Namespaces<Context> {
    let programs_and_shaders = vec![
        ("program", program as LivePredicate<Context>),
        ("shader", shader as LivePredicate<Context>),
    ];
    Namespaces::new()
        .register(BUFFERS, vec![("buffer", buffer as LivePredicate<Context>)])
        .register(RENDERBUFFERS, vec![("renderbuffer", renderbuffer as LivePredicate<Context>)])
        .register(FRAMEBUFFERS, vec![("framebuffer", framebuffer as LivePredicate<Context>)])
        .register(TEXTURES, vec![("texture", texture as LivePredicate<Context>)])
        .register(VERTEX_ARRAYS, vec![("vertex array", vertex_array as LivePredicate<Context>)])
        .register(PROGRAMS, programs_and_shaders.clone())
        .register(SHADERS, programs_and_shaders)
}
