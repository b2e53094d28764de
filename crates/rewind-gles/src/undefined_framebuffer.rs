//! Paints a recognisable pattern wherever the framebuffer contents are undefined.
//!
//! A freshly bound window surface and the back buffer after a non-preserving swap hold
//! whatever the driver left there. Drawing a stripe pattern at those points makes replay
//! output that depends on undefined contents obvious instead of silently device-specific.

use std::collections::HashSet;

use rewind_atom::{Atom, Pointer};
use rewind_transform::{Namespaces, ReplayError, Transformer, Writer};
use tracing::{debug, info};

use crate::cmd::Cmd;
use crate::names;
use crate::state::Context;
use crate::tweaker::GlesTweaker;
use crate::types::*;
use crate::Gles;

const SCREEN_COORDS_LOCATION: u32 = 0;
const SCREEN_COORDS: &str = "aScreenCoords";

const VERTEX_SHADER: &str = "
precision highp float;
attribute vec2 aScreenCoords;
varying vec2 uv;

void main() {
    uv = aScreenCoords;
    gl_Position = vec4(aScreenCoords.xy, 0., 1.);
}";

const FRAGMENT_SHADER: &str = "
precision highp float;
varying vec2 uv;

float F(float a) { return smoothstep(0.0, 0.1, a) * smoothstep(0.4, 0.3, a); }

void main() {
    vec2 v = uv * 5.0;
    gl_FragColor = vec4(0.8, 0.9, 0.6, 1.0) * F(fract(v.x + v.y));
}";

/// Full-screen triangle strip.
const SCREEN_QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Capabilities that would clip or discard the pattern.
const DISABLED_CAPS: [Capability; 5] = [
    Capability::Blend,
    Capability::CullFace,
    Capability::DepthTest,
    Capability::ScissorTest,
    Capability::StencilTest,
];

pub struct UndefinedFramebuffer {
    namespaces: Namespaces<Context>,
    seen_surfaces: HashSet<SurfaceId>,
    draws: u64,
}

impl Default for UndefinedFramebuffer {
    fn default() -> Self {
        Self {
            namespaces: names::namespaces(),
            seen_surfaces: HashSet::new(),
            draws: 0,
        }
    }
}

impl UndefinedFramebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns drawn so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn draw(&mut self, out: &mut dyn Writer<Gles>) -> Result<(), ReplayError> {
        self.draws += 1;
        debug!(draws = self.draws, "drawing undefined framebuffer pattern");
        let mut t = GlesTweaker::new(out, &self.namespaces);
        let drawn = draw_pattern(&mut t);
        let reverted = t.revert();
        drawn.and(reverted)
    }
}

impl Transformer<Gles> for UndefinedFramebuffer {
    fn name(&self) -> &str {
        "UndefinedFramebuffer"
    }

    fn transform(&mut self, atom: Atom<Cmd>, out: &mut dyn Writer<Gles>) -> Result<(), ReplayError> {
        let made_current = match atom.cmd {
            Cmd::EglMakeCurrent { draw, .. } => Some(draw),
            _ => None,
        };
        let end_of_frame = atom.flags.is_end_of_frame();
        out.mutate_and_write(atom)?;

        let Some(ctx) = out.state().api.current_context() else {
            return Ok(());
        };
        if !ctx.info.initialized {
            return Ok(());
        }
        let preserve = ctx.info.preserve_buffers_on_swap;

        if let Some(surface) = made_current {
            if self.seen_surfaces.insert(surface) {
                self.draw(out)?;
            }
        }
        if end_of_frame && !preserve {
            self.draw(out)?;
        }
        Ok(())
    }

    fn flush(&mut self, _out: &mut dyn Writer<Gles>) -> Result<(), ReplayError> {
        info!(
            draws = self.draws,
            surfaces = self.seen_surfaces.len(),
            "undefined framebuffer patterns drawn"
        );
        Ok(())
    }
}

fn draw_pattern(t: &mut GlesTweaker<'_, '_>) -> Result<(), ReplayError> {
    for cap in DISABLED_CAPS {
        t.disable(cap)?;
    }
    t.make_vertex_array(&[SCREEN_COORDS_LOCATION])?;

    let program = t.make_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
    t.write(Cmd::GlBindAttribLocation {
        program,
        location: SCREEN_COORDS_LOCATION,
        name: SCREEN_COORDS.to_owned(),
    })?;
    t.write(Cmd::GlLinkProgram { program })?;
    t.use_program(program)?;

    let buffer = t.gen_buffer()?;
    t.bind_array_buffer(buffer)?;
    let positions = t.alloc_data(bytemuck::cast_slice(&SCREEN_QUAD[..]).to_vec())?;
    t.write_atom(
        Atom::new(Cmd::GlBufferData {
            target: BufferTarget::Array,
            size: positions.bytes().len() as i64,
            data: positions.ptr(),
            usage: BufferUsage::StaticDraw,
        })
        .with_read(positions.observation()),
    )?;
    t.write(Cmd::GlVertexAttribPointer {
        location: SCREEN_COORDS_LOCATION,
        size: 2,
        ty: VertexType::Float,
        normalized: false,
        stride: 0,
        pointer: Pointer::NULL,
    })?;
    t.write(Cmd::GlDrawArrays {
        mode: DrawMode::TriangleStrip,
        first: 0,
        count: 4,
    })
}
