use rewind_atom::{Atom, Command, MemoryError, Pointer, Pool, Range};
use rewind_transform::{Api, ReplayError};
use tracing::{debug, warn};

use crate::cmd::Cmd;
use crate::state::{Context, GlesState, Program, Shader, Surface, VertexArray};
use crate::types::*;

/// Longest NUL-terminated shader string read from the pool.
const MAX_SOURCE_LEN: u64 = 1 << 20;

/// Largest buffer store the mirror will materialize; bigger `glBufferData` calls are
/// treated as `GL_OUT_OF_MEMORY`.
pub const MAX_BUFFER_LEN: u64 = 1 << 28;

/// The GLES/EGL API: [`Cmd`] atoms mutating a [`GlesState`].
///
/// Commands that would raise a GL or EGL error are logged and leave state untouched, like
/// the driver would. Atoms whose pointer arguments reference memory they do not observe
/// are a [`ReplayError::SchemaMismatch`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Gles;

impl Api for Gles {
    type State = GlesState;
    type Cmd = Cmd;

    fn mutate(state: &mut GlesState, memory: &Pool, atom: &Atom<Cmd>) -> Result<(), ReplayError> {
        let cmd = &atom.cmd;
        match cmd {
            Cmd::EglCreateContext {
                context,
                major_version,
                minor_version,
            } => {
                if context.is_none() || state.contexts.contains_key(context) {
                    return ignored(cmd, "EGL_BAD_CONTEXT");
                }
                if !(2..=3).contains(major_version) {
                    return ignored(cmd, "EGL_BAD_MATCH");
                }
                debug!(%context, major_version, minor_version, "context created");
                state
                    .contexts
                    .insert(*context, Context::new(*major_version, *minor_version));
            }
            Cmd::EglCreateWindowSurface {
                surface,
                width,
                height,
            } => {
                if surface.is_none() || *width < 0 || *height < 0 {
                    return ignored(cmd, "EGL_BAD_PARAMETER");
                }
                state.surfaces.insert(
                    *surface,
                    Surface {
                        width: *width,
                        height: *height,
                        swap_behavior: SwapBehavior::default(),
                    },
                );
            }
            Cmd::EglSurfaceAttrib {
                surface,
                swap_behavior,
            } => {
                let Some(s) = state.surfaces.get_mut(surface) else {
                    return ignored(cmd, "EGL_BAD_SURFACE");
                };
                s.swap_behavior = *swap_behavior;
                let preserve = *swap_behavior == SwapBehavior::BufferPreserved;
                for ctx in state.contexts.values_mut() {
                    if ctx.info.draw_surface == Some(*surface) {
                        ctx.info.preserve_buffers_on_swap = preserve;
                    }
                }
            }
            Cmd::EglMakeCurrent {
                draw,
                read,
                context,
            } => {
                if context.is_none() {
                    state.current = None;
                    return Ok(());
                }
                let surface = state.surfaces.get(draw).cloned();
                let Some(ctx) = state.contexts.get_mut(context) else {
                    return ignored(cmd, "EGL_BAD_CONTEXT");
                };
                if !ctx.info.initialized {
                    if let Some(s) = &surface {
                        let full = Rect::new(0, 0, s.width, s.height);
                        ctx.rasterization.viewport = full;
                        ctx.rasterization.scissor = full;
                    }
                    ctx.info.initialized = true;
                }
                ctx.info.draw_surface = (!draw.is_none()).then_some(*draw);
                ctx.info.read_surface = (!read.is_none()).then_some(*read);
                ctx.info.preserve_buffers_on_swap = surface
                    .is_some_and(|s| s.swap_behavior == SwapBehavior::BufferPreserved);
                state.current = Some(*context);
            }
            Cmd::EglSwapBuffers { surface } => {
                if !state.surfaces.contains_key(surface) {
                    return ignored(cmd, "EGL_BAD_SURFACE");
                }
            }
            _ => {
                let Some(ctx) = state.current_context_mut() else {
                    return ignored(cmd, "no current context");
                };
                mutate_context(ctx, memory, atom)?;
            }
        }
        Ok(())
    }
}

fn ignored(cmd: &Cmd, error: &'static str) -> Result<(), ReplayError> {
    warn!(cmd = cmd.name(), error, "command ignored");
    Ok(())
}

fn unobserved(cmd: &'static str) -> impl Fn(MemoryError) -> ReplayError {
    move |err| ReplayError::schema_mismatch(cmd, err.to_string())
}

/// Names produced by a `glGen*`, taken from the atom's write observations.
fn generated(atom: &Atom<Cmd>, count: i32, names: Pointer) -> Result<Vec<u32>, ReplayError> {
    let Ok(count) = usize::try_from(count) else {
        ignored(&atom.cmd, "GL_INVALID_VALUE")?;
        return Ok(Vec::new());
    };
    let mut written = Pool::new();
    for write in &atom.observations.writes {
        written.apply(write)?;
    }
    let ids = written
        .read_u32s(names, count)
        .map_err(unobserved(atom.name()))?;
    Ok(ids.into_iter().filter(|&id| id != 0).collect())
}

/// Names consumed by a `glDelete*`, read from the pool.
fn consumed(atom: &Atom<Cmd>, memory: &Pool, count: i32, names: Pointer) -> Result<Vec<u32>, ReplayError> {
    let Ok(count) = usize::try_from(count) else {
        ignored(&atom.cmd, "GL_INVALID_VALUE")?;
        return Ok(Vec::new());
    };
    let ids = memory.read_u32s(names, count).map_err(unobserved(atom.name()))?;
    Ok(ids.into_iter().filter(|&id| id != 0).collect())
}

fn mutate_context(ctx: &mut Context, memory: &Pool, atom: &Atom<Cmd>) -> Result<(), ReplayError> {
    let cmd = &atom.cmd;
    match cmd {
        Cmd::GlEnable { cap } | Cmd::GlDisable { cap } => {
            if !ctx.supports(*cap) {
                return ignored(cmd, "GL_INVALID_ENUM");
            }
            let enable = matches!(cmd, Cmd::GlEnable { .. });
            ctx.capabilities.set(cap.flag(), enable);
        }
        Cmd::GlDepthMask { enabled } => ctx.rasterization.depth_mask = *enabled,
        Cmd::GlDepthFunc { func } => ctx.rasterization.depth_func = *func,
        Cmd::GlBlendColor { color } => ctx.rasterization.blend_color = *color,
        Cmd::GlBlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        } => {
            let blend = &mut ctx.rasterization.blend;
            blend.src_rgb = *src_rgb;
            blend.dst_rgb = *dst_rgb;
            blend.src_alpha = *src_alpha;
            blend.dst_alpha = *dst_alpha;
        }
        Cmd::GlPolygonOffset { factor, units } => {
            ctx.rasterization.polygon_offset_factor = *factor;
            ctx.rasterization.polygon_offset_units = *units;
        }
        Cmd::GlLineWidth { width } => {
            if *width <= 0.0 {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            ctx.rasterization.line_width = *width;
        }
        Cmd::GlScissor { rect } | Cmd::GlViewport { rect } => {
            if rect.width < 0 || rect.height < 0 {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            if matches!(cmd, Cmd::GlScissor { .. }) {
                ctx.rasterization.scissor = *rect;
            } else {
                ctx.rasterization.viewport = *rect;
            }
        }

        Cmd::GlGenBuffers { count, buffers } => {
            for id in generated(atom, *count, *buffers)? {
                ctx.objects.buffers.entry(BufferId(id)).or_default();
            }
        }
        Cmd::GlGenRenderbuffers {
            count,
            renderbuffers,
        } => {
            for id in generated(atom, *count, *renderbuffers)? {
                ctx.objects.renderbuffers.entry(RenderbufferId(id)).or_default();
            }
        }
        Cmd::GlGenFramebuffers {
            count,
            framebuffers,
        } => {
            for id in generated(atom, *count, *framebuffers)? {
                ctx.objects.framebuffers.entry(FramebufferId(id)).or_default();
            }
        }
        Cmd::GlGenTextures { count, textures } => {
            for id in generated(atom, *count, *textures)? {
                ctx.objects.textures.entry(TextureId(id)).or_default();
            }
        }
        Cmd::GlGenVertexArrays { count, arrays } => {
            let attribs = ctx.constants.max_vertex_attribs;
            for id in generated(atom, *count, *arrays)? {
                ctx.objects
                    .vertex_arrays
                    .entry(VertexArrayId(id))
                    .or_insert_with(|| VertexArray::new(attribs));
            }
        }

        Cmd::GlDeleteBuffers { count, buffers } => {
            for id in consumed(atom, memory, *count, *buffers)?.into_iter().map(BufferId) {
                if ctx.objects.buffers.remove(&id).is_none() {
                    continue;
                }
                let bound = &mut ctx.bound_buffers;
                for slot in [&mut bound.array, &mut bound.pixel_pack, &mut bound.pixel_unpack] {
                    if *slot == id {
                        *slot = BufferId::NONE;
                    }
                }
                if let Some(vao) = ctx.vertex_array_mut() {
                    if vao.element_array_buffer == id {
                        vao.element_array_buffer = BufferId::NONE;
                    }
                    for attr in vao.attributes.iter_mut().filter(|a| a.buffer == id) {
                        attr.buffer = BufferId::NONE;
                    }
                }
            }
        }
        Cmd::GlDeleteRenderbuffers {
            count,
            renderbuffers,
        } => {
            for id in consumed(atom, memory, *count, *renderbuffers)?
                .into_iter()
                .map(RenderbufferId)
            {
                if ctx.objects.renderbuffers.remove(&id).is_some() && ctx.bound_renderbuffer == id {
                    ctx.bound_renderbuffer = RenderbufferId::NONE;
                }
            }
        }
        Cmd::GlDeleteFramebuffers {
            count,
            framebuffers,
        } => {
            for id in consumed(atom, memory, *count, *framebuffers)?
                .into_iter()
                .map(FramebufferId)
            {
                if ctx.objects.framebuffers.remove(&id).is_none() {
                    continue;
                }
                if ctx.bound_draw_framebuffer == id {
                    ctx.bound_draw_framebuffer = FramebufferId::NONE;
                }
                if ctx.bound_read_framebuffer == id {
                    ctx.bound_read_framebuffer = FramebufferId::NONE;
                }
            }
        }
        Cmd::GlDeleteTextures { count, textures } => {
            for id in consumed(atom, memory, *count, *textures)?.into_iter().map(TextureId) {
                if ctx.objects.textures.remove(&id).is_none() {
                    continue;
                }
                for unit in &mut ctx.texture_units {
                    if unit.texture_2d == id {
                        unit.texture_2d = TextureId::NONE;
                    }
                    if unit.cube_map == id {
                        unit.cube_map = TextureId::NONE;
                    }
                }
            }
        }
        Cmd::GlDeleteVertexArrays { count, arrays } => {
            for id in consumed(atom, memory, *count, *arrays)?.into_iter().map(VertexArrayId) {
                if ctx.objects.vertex_arrays.remove(&id).is_some() && ctx.bound_vertex_array == id {
                    ctx.bound_vertex_array = VertexArrayId::NONE;
                }
            }
        }

        Cmd::GlCreateProgram { result } => {
            if result.is_none() {
                return ignored(cmd, "creation failed");
            }
            if is_program_or_shader(ctx, result.0) {
                return Err(ReplayError::schema_mismatch(
                    cmd.name(),
                    format!("name {result} is already in use"),
                ));
            }
            ctx.objects.programs.insert(*result, Program::default());
        }
        Cmd::GlCreateShader { ty, result } => {
            if result.is_none() {
                return ignored(cmd, "creation failed");
            }
            if is_program_or_shader(ctx, result.0) {
                return Err(ReplayError::schema_mismatch(
                    cmd.name(),
                    format!("name {result} is already in use"),
                ));
            }
            ctx.objects.shaders.insert(
                *result,
                Shader {
                    ty: *ty,
                    source: String::new(),
                    compiled: false,
                },
            );
        }
        Cmd::GlDeleteProgram { program } => {
            if program.is_none() {
                return Ok(());
            }
            let Some(p) = ctx.objects.programs.get_mut(program) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            if ctx.bound_program == *program {
                p.delete_pending = true;
            } else {
                ctx.objects.programs.remove(program);
            }
        }
        Cmd::GlDeleteShader { shader } => {
            if shader.is_none() {
                return Ok(());
            }
            if ctx.objects.shaders.remove(shader).is_none() {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            for p in ctx.objects.programs.values_mut() {
                p.shaders.retain(|s| s != shader);
            }
        }
        Cmd::GlShaderSource {
            shader,
            count,
            strings,
            lengths,
        } => {
            let Ok(n) = usize::try_from(*count) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            if !ctx.objects.shaders.contains_key(shader) {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            let source = read_source(memory, cmd.name(), n, *strings, *lengths)?;
            if let Some(s) = ctx.objects.shaders.get_mut(shader) {
                s.source = source;
                s.compiled = false;
            }
        }
        Cmd::GlCompileShader { shader } => {
            let Some(s) = ctx.objects.shaders.get_mut(shader) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            s.compiled = true;
        }
        Cmd::GlAttachShader { program, shader } => {
            if !ctx.objects.shaders.contains_key(shader) {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            let Some(p) = ctx.objects.programs.get_mut(program) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            if p.shaders.contains(shader) {
                return ignored(cmd, "GL_INVALID_OPERATION");
            }
            p.shaders.push(*shader);
        }
        Cmd::GlBindAttribLocation {
            program,
            location,
            name,
        } => {
            if *location >= ctx.constants.max_vertex_attribs {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            let Some(p) = ctx.objects.programs.get_mut(program) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            p.attrib_bindings.insert(name.clone(), *location);
        }
        Cmd::GlLinkProgram { program } => {
            let Some(p) = ctx.objects.programs.get_mut(program) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            p.linked = true;
        }
        Cmd::GlUseProgram { program } => {
            if !program.is_none() && !ctx.objects.programs.contains_key(program) {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            let previous = std::mem::replace(&mut ctx.bound_program, *program);
            if previous != *program
                && ctx
                    .objects
                    .programs
                    .get(&previous)
                    .is_some_and(|p| p.delete_pending)
            {
                ctx.objects.programs.remove(&previous);
            }
        }

        Cmd::GlBindBuffer { target, buffer } => {
            if !buffer.is_none() {
                ctx.objects.buffers.entry(*buffer).or_default();
            }
            match target {
                BufferTarget::Array => ctx.bound_buffers.array = *buffer,
                BufferTarget::PixelPack => ctx.bound_buffers.pixel_pack = *buffer,
                BufferTarget::PixelUnpack => ctx.bound_buffers.pixel_unpack = *buffer,
                BufferTarget::ElementArray => match ctx.vertex_array_mut() {
                    Some(vao) => vao.element_array_buffer = *buffer,
                    None => return ignored(cmd, "GL_INVALID_OPERATION"),
                },
            }
        }
        Cmd::GlBufferData {
            target,
            size,
            data,
            usage,
        } => {
            let id = ctx.buffer_binding(*target)?;
            if id.is_none() {
                return ignored(cmd, "GL_INVALID_OPERATION");
            }
            let Ok(len) = u64::try_from(*size) else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            if len > MAX_BUFFER_LEN {
                return ignored(cmd, "GL_OUT_OF_MEMORY");
            }
            let bytes = if data.is_null() {
                vec![0; len as usize]
            } else {
                memory
                    .read(Range::new(data.0, len))
                    .map_err(unobserved(cmd.name()))?
            };
            if let Some(buffer) = ctx.objects.buffers.get_mut(&id) {
                buffer.data = bytes;
                buffer.usage = *usage;
            }
        }
        Cmd::GlBindFramebuffer {
            target,
            framebuffer,
        } => {
            if !framebuffer.is_none() {
                ctx.objects.framebuffers.entry(*framebuffer).or_default();
            }
            if matches!(target, FramebufferTarget::Framebuffer | FramebufferTarget::Draw) {
                ctx.bound_draw_framebuffer = *framebuffer;
            }
            if matches!(target, FramebufferTarget::Framebuffer | FramebufferTarget::Read) {
                ctx.bound_read_framebuffer = *framebuffer;
            }
        }
        Cmd::GlReadBuffer { mode } => {
            let Some(fb) = ctx.objects.framebuffers.get_mut(&ctx.bound_read_framebuffer) else {
                return ignored(cmd, "GL_INVALID_OPERATION");
            };
            fb.read_buffer = *mode;
        }
        Cmd::GlBindRenderbuffer { renderbuffer } => {
            if !renderbuffer.is_none() {
                ctx.objects.renderbuffers.entry(*renderbuffer).or_default();
            }
            ctx.bound_renderbuffer = *renderbuffer;
        }
        Cmd::GlActiveTexture { unit } => {
            if *unit >= ctx.constants.max_texture_units {
                return ignored(cmd, "GL_INVALID_ENUM");
            }
            ctx.active_texture_unit = *unit;
        }
        Cmd::GlBindTexture { target, texture } => {
            if !texture.is_none() {
                let tex = ctx.objects.textures.entry(*texture).or_default();
                match tex.target {
                    Some(existing) if existing != *target => {
                        return ignored(cmd, "GL_INVALID_OPERATION");
                    }
                    _ => tex.target = Some(*target),
                }
            }
            let Some(unit) = ctx.texture_units.get_mut(ctx.active_texture_unit as usize) else {
                return ignored(cmd, "GL_INVALID_OPERATION");
            };
            match target {
                TextureTarget::Texture2D => unit.texture_2d = *texture,
                TextureTarget::CubeMap => unit.cube_map = *texture,
            }
        }
        Cmd::GlBindVertexArray { array } => {
            if !ctx.objects.vertex_arrays.contains_key(array) {
                return ignored(cmd, "GL_INVALID_OPERATION");
            }
            ctx.bound_vertex_array = *array;
        }
        Cmd::GlEnableVertexAttribArray { location } | Cmd::GlDisableVertexAttribArray { location } => {
            let enable = matches!(cmd, Cmd::GlEnableVertexAttribArray { .. });
            let Some(attr) = ctx
                .vertex_array_mut()
                .and_then(|vao| vao.attributes.get_mut(*location as usize))
            else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            attr.enabled = enable;
        }
        Cmd::GlVertexAttribPointer {
            location,
            size,
            ty,
            normalized,
            stride,
            pointer,
        } => {
            if !(1..=4).contains(size) || *stride < 0 {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            let buffer = ctx.bound_buffers.array;
            let Some(attr) = ctx
                .vertex_array_mut()
                .and_then(|vao| vao.attributes.get_mut(*location as usize))
            else {
                return ignored(cmd, "GL_INVALID_VALUE");
            };
            attr.size = *size;
            attr.ty = *ty;
            attr.normalized = *normalized;
            attr.stride = *stride;
            attr.pointer = *pointer;
            attr.buffer = buffer;
        }
        Cmd::GlPixelStorei { param, value } => {
            let valid = match param {
                PixelStoreParam::UnpackAlignment | PixelStoreParam::PackAlignment => {
                    matches!(value, 1 | 2 | 4 | 8)
                }
                _ => *value >= 0,
            };
            if !valid {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            ctx.pixel_storage.set(*param, *value);
        }
        Cmd::GlDrawArrays { mode, first, count } => {
            if *first < 0 || *count < 0 {
                return ignored(cmd, "GL_INVALID_VALUE");
            }
            debug!(?mode, first, count, program = %ctx.bound_program, "draw");
        }

        Cmd::EglCreateContext { .. }
        | Cmd::EglCreateWindowSurface { .. }
        | Cmd::EglSurfaceAttrib { .. }
        | Cmd::EglMakeCurrent { .. }
        | Cmd::EglSwapBuffers { .. } => {}
    }
    Ok(())
}

/// Programs and shaders share one name space.
fn is_program_or_shader(ctx: &Context, id: u32) -> bool {
    ctx.objects.programs.contains_key(&ProgramId(id)) || ctx.objects.shaders.contains_key(&ShaderId(id))
}

fn read_source(
    memory: &Pool,
    cmd: &'static str,
    count: usize,
    strings: Pointer,
    lengths: Pointer,
) -> Result<String, ReplayError> {
    let pointers = memory
        .read_pointers(strings, count)
        .map_err(unobserved(cmd))?;
    let lengths = if lengths.is_null() {
        vec![-1; count]
    } else {
        memory.read_i32s(lengths, count).map_err(unobserved(cmd))?
    };

    let mut source = Vec::new();
    for (ptr, len) in pointers.into_iter().zip(lengths) {
        let bytes = match u64::try_from(len) {
            Ok(len) => memory.read(Range::new(ptr.0, len)),
            Err(_) => memory.read_cstr(ptr, MAX_SOURCE_LEN),
        }
        .map_err(unobserved(cmd))?;
        source.extend_from_slice(&bytes);
    }
    match String::from_utf8(source) {
        Ok(source) => Ok(source),
        Err(err) => {
            warn!(
                cmd,
                valid_up_to = err.utf8_error().valid_up_to(),
                "shader source is not UTF-8; replacing invalid bytes"
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_atom::Observation;

    fn current(major: u32) -> GlesState {
        let mut state = GlesState::default();
        let pool = Pool::new();
        for cmd in [
            Cmd::EglCreateContext {
                context: ContextId(1),
                major_version: major,
                minor_version: 0,
            },
            Cmd::EglCreateWindowSurface {
                surface: SurfaceId(1),
                width: 640,
                height: 480,
            },
            Cmd::EglMakeCurrent {
                draw: SurfaceId(1),
                read: SurfaceId(1),
                context: ContextId(1),
            },
        ] {
            Gles::mutate(&mut state, &pool, &Atom::new(cmd)).unwrap();
        }
        state
    }

    fn apply(state: &mut GlesState, atom: Atom<Cmd>) -> Result<(), ReplayError> {
        let mut pool = Pool::new();
        for read in &atom.observations.reads {
            pool.apply(read).unwrap();
        }
        Gles::mutate(state, &pool, &atom)
    }

    fn ctx(state: &GlesState) -> &Context {
        state.current_context().unwrap()
    }

    #[test]
    fn make_current_initializes_the_context() {
        let state = current(2);
        let ctx = ctx(&state);
        assert!(ctx.info.initialized);
        assert!(!ctx.info.preserve_buffers_on_swap);
        assert_eq!(ctx.rasterization.viewport, Rect::new(0, 0, 640, 480));
    }

    #[test]
    fn surface_attrib_updates_preserve_flag() {
        let mut state = current(2);
        apply(
            &mut state,
            Atom::new(Cmd::EglSurfaceAttrib {
                surface: SurfaceId(1),
                swap_behavior: SwapBehavior::BufferPreserved,
            }),
        )
        .unwrap();
        assert!(ctx(&state).info.preserve_buffers_on_swap);
    }

    #[test]
    fn gen_reads_names_from_write_observations() {
        let mut state = current(3);
        let names: Vec<u8> = [7u32, 9].iter().flat_map(|v| v.to_le_bytes()).collect();
        let atom = Atom::new(Cmd::GlGenBuffers {
            count: 2,
            buffers: Pointer(0x100),
        })
        .with_write(Observation::at(Pointer(0x100), names));
        apply(&mut state, atom).unwrap();
        let buffers: Vec<_> = ctx(&state).objects.buffers.keys().copied().collect();
        assert_eq!(buffers, vec![BufferId(7), BufferId(9)]);
    }

    #[test]
    fn gen_without_observation_is_a_schema_mismatch() {
        let mut state = current(3);
        let err = apply(
            &mut state,
            Atom::new(Cmd::GlGenTextures {
                count: 1,
                textures: Pointer(0x100),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::SchemaMismatch { cmd: "glGenTextures", .. }));
    }

    #[test]
    fn deleting_bound_buffer_unbinds_it() {
        let mut state = current(2);
        for cmd in [
            Cmd::GlBindBuffer {
                target: BufferTarget::Array,
                buffer: BufferId(5),
            },
            Cmd::GlVertexAttribPointer {
                location: 1,
                size: 2,
                ty: VertexType::Float,
                normalized: false,
                stride: 0,
                pointer: Pointer::NULL,
            },
            Cmd::GlBindBuffer {
                target: BufferTarget::ElementArray,
                buffer: BufferId(5),
            },
        ] {
            apply(&mut state, Atom::new(cmd)).unwrap();
        }
        let delete = Atom::new(Cmd::GlDeleteBuffers {
            count: 1,
            buffers: Pointer(0x40),
        })
        .with_read(Observation::at(Pointer(0x40), 5u32.to_le_bytes().to_vec()));
        apply(&mut state, delete).unwrap();

        let ctx = ctx(&state);
        assert!(ctx.objects.buffers.is_empty());
        assert_eq!(ctx.bound_buffers.array, BufferId::NONE);
        assert_eq!(ctx.buffer_binding(BufferTarget::ElementArray).unwrap(), BufferId::NONE);
        assert_eq!(ctx.vertex_attribute(1).unwrap().buffer, BufferId::NONE);
    }

    #[test]
    fn program_and_shader_names_collide() {
        let mut state = current(2);
        apply(&mut state, Atom::new(Cmd::GlCreateProgram { result: ProgramId(4) })).unwrap();
        let err = apply(
            &mut state,
            Atom::new(Cmd::GlCreateShader {
                ty: ShaderType::Vertex,
                result: ShaderId(4),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::SchemaMismatch { .. }));
    }

    #[test]
    fn current_program_deletion_is_deferred() {
        let mut state = current(2);
        for cmd in [
            Cmd::GlCreateProgram { result: ProgramId(4) },
            Cmd::GlUseProgram { program: ProgramId(4) },
            Cmd::GlDeleteProgram { program: ProgramId(4) },
        ] {
            apply(&mut state, Atom::new(cmd)).unwrap();
        }
        assert!(ctx(&state).objects.programs[&ProgramId(4)].delete_pending);
        apply(&mut state, Atom::new(Cmd::GlUseProgram { program: ProgramId::NONE })).unwrap();
        assert!(ctx(&state).objects.programs.is_empty());
    }

    #[test]
    fn shader_source_concatenates_strings() {
        let mut state = current(2);
        apply(
            &mut state,
            Atom::new(Cmd::GlCreateShader {
                ty: ShaderType::Fragment,
                result: ShaderId(2),
            }),
        )
        .unwrap();
        let atom = Atom::new(Cmd::GlShaderSource {
            shader: ShaderId(2),
            count: 2,
            strings: Pointer(0x10),
            lengths: Pointer(0x20),
        })
        .with_read(Observation::at(
            Pointer(0x10),
            [0x100u64, 0x200].iter().flat_map(|p| p.to_le_bytes()).collect(),
        ))
        .with_read(Observation::at(
            Pointer(0x20),
            [3i32, -1].iter().flat_map(|l| l.to_le_bytes()).collect(),
        ))
        .with_read(Observation::at(Pointer(0x100), b"abcdef".to_vec()))
        .with_read(Observation::at(Pointer(0x200), b"gh\0ij".to_vec()));
        apply(&mut state, atom).unwrap();
        assert_eq!(ctx(&state).objects.shaders[&ShaderId(2)].source, "abcgh");
    }

    #[test]
    fn oversized_arguments_fail_without_allocating() {
        let mut state = current(3);
        apply(
            &mut state,
            Atom::new(Cmd::GlBindBuffer {
                target: BufferTarget::Array,
                buffer: BufferId(3),
            }),
        )
        .unwrap();
        let before = state.clone();

        // Stores past the limit are an out-of-memory GL error.
        let null_store = Atom::new(Cmd::GlBufferData {
            target: BufferTarget::Array,
            size: i64::MAX,
            data: Pointer::NULL,
            usage: BufferUsage::StaticDraw,
        });
        let observed_store = Atom::new(Cmd::GlBufferData {
            target: BufferTarget::Array,
            size: 1 << 46,
            data: Pointer(0x100),
            usage: BufferUsage::StaticDraw,
        })
        .with_read(Observation::at(Pointer(0x100), vec![0; 4]));
        for atom in [null_store, observed_store] {
            apply(&mut state, atom).unwrap();
        }
        assert_eq!(state, before);

        let huge_store = Atom::new(Cmd::GlBufferData {
            target: BufferTarget::Array,
            size: MAX_BUFFER_LEN as i64,
            data: Pointer(0x100),
            usage: BufferUsage::StaticDraw,
        })
        .with_read(Observation::at(Pointer(0x100), vec![0; 4]));
        let huge_gen = Atom::new(Cmd::GlGenBuffers {
            count: i32::MAX,
            buffers: Pointer(0x10),
        })
        .with_write(Observation::at(Pointer(0x10), 7u32.to_le_bytes().to_vec()));
        let huge_delete = Atom::new(Cmd::GlDeleteBuffers {
            count: i32::MAX,
            buffers: Pointer(0x10),
        })
        .with_read(Observation::at(Pointer(0x10), 3u32.to_le_bytes().to_vec()));
        for atom in [huge_store, huge_gen, huge_delete] {
            assert!(matches!(
                apply(&mut state, atom),
                Err(ReplayError::SchemaMismatch { .. })
            ));
        }
        assert_eq!(state, before);
    }

    #[test]
    fn oversized_shader_source_length_is_a_schema_mismatch() {
        let mut state = current(2);
        apply(
            &mut state,
            Atom::new(Cmd::GlCreateShader {
                ty: ShaderType::Vertex,
                result: ShaderId(2),
            }),
        )
        .unwrap();
        let atom = Atom::new(Cmd::GlShaderSource {
            shader: ShaderId(2),
            count: 1,
            strings: Pointer(0x10),
            lengths: Pointer(0x20),
        })
        .with_read(Observation::at(Pointer(0x10), 0x100u64.to_le_bytes().to_vec()))
        .with_read(Observation::at(Pointer(0x20), i32::MAX.to_le_bytes().to_vec()))
        .with_read(Observation::at(Pointer(0x100), b"void".to_vec()));
        assert!(matches!(
            apply(&mut state, atom),
            Err(ReplayError::SchemaMismatch { cmd: "glShaderSource", .. })
        ));
        assert_eq!(ctx(&state).objects.shaders[&ShaderId(2)].source, "");
    }

    #[test]
    fn invalid_utf8_source_is_replaced_not_rejected() {
        let mut state = current(2);
        apply(
            &mut state,
            Atom::new(Cmd::GlCreateShader {
                ty: ShaderType::Vertex,
                result: ShaderId(2),
            }),
        )
        .unwrap();
        let atom = Atom::new(Cmd::GlShaderSource {
            shader: ShaderId(2),
            count: 1,
            strings: Pointer(0x10),
            lengths: Pointer::NULL,
        })
        .with_read(Observation::at(Pointer(0x10), 0x100u64.to_le_bytes().to_vec()))
        .with_read(Observation::at(Pointer(0x100), vec![b'a', 0xff, b'b', 0]));
        apply(&mut state, atom).unwrap();
        assert_eq!(ctx(&state).objects.shaders[&ShaderId(2)].source, "a\u{fffd}b");
    }

    #[test]
    fn gl_errors_leave_state_untouched() {
        let mut state = current(2);
        let before = state.clone();
        for cmd in [
            Cmd::GlEnable {
                cap: Capability::RasterizerDiscard,
            },
            Cmd::GlLineWidth { width: 0.0 },
            Cmd::GlActiveTexture { unit: 99 },
            Cmd::GlBindVertexArray {
                array: VertexArrayId(3),
            },
            Cmd::GlUseProgram { program: ProgramId(8) },
            Cmd::GlPixelStorei {
                param: PixelStoreParam::PackAlignment,
                value: 3,
            },
        ] {
            apply(&mut state, Atom::new(cmd)).unwrap();
        }
        assert_eq!(state, before);
    }

    #[test]
    fn gl_commands_without_context_are_ignored() {
        let mut state = GlesState::default();
        apply(&mut state, Atom::new(Cmd::GlDepthMask { enabled: false })).unwrap();
        assert_eq!(state, GlesState::default());
    }
}
