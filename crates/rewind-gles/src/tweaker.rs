//! Self-reverting GLES state changes for synthesized rendering.

use rewind_atom::{Atom, Pointer, TempAlloc};
use rewind_transform::tweak::{Attribute, Restore, Tweaker};
use rewind_transform::{Namespaces, ReplayError, State, Writer};
use tracing::debug;

use crate::cmd::Cmd;
use crate::names;
use crate::state::{BlendFunc, Context, GlesState, PixelStorage};
use crate::types::*;
use crate::Gles;

fn current_context(state: &State<GlesState>) -> Result<&Context, ReplayError> {
    state
        .api
        .current_context()
        .ok_or_else(|| ReplayError::state_query("no current context"))
}

macro_rules! context_attribute {
    ($(#[$meta:meta])* $ty:ident, $name:literal, $value:ty, |$ctx:ident| $get:expr, |$v:ident| $set:expr $(,)?) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        pub struct $ty;

        impl Attribute<Gles> for $ty {
            type Value = $value;

            fn name(&self) -> &'static str {
                $name
            }

            fn get(&self, state: &State<GlesState>) -> Result<$value, ReplayError> {
                let $ctx = current_context(state)?;
                $get
            }

            fn set(&self, $v: &$value) -> Cmd {
                $set
            }
        }
    };
}

context_attribute!(
    DepthMask, "depth mask", bool,
    |ctx| Ok(ctx.rasterization.depth_mask),
    |v| Cmd::GlDepthMask { enabled: *v },
);
context_attribute!(
    DepthFunc, "depth func", CompareFunc,
    |ctx| Ok(ctx.rasterization.depth_func),
    |v| Cmd::GlDepthFunc { func: *v },
);
context_attribute!(
    BlendColor, "blend color", Color,
    |ctx| Ok(ctx.rasterization.blend_color),
    |v| Cmd::GlBlendColor { color: *v },
);
context_attribute!(
    /// Blend factors of draw buffer 0.
    BlendFactors, "blend func", BlendFunc,
    |ctx| Ok(ctx.rasterization.blend),
    |v| Cmd::GlBlendFuncSeparate {
        src_rgb: v.src_rgb,
        dst_rgb: v.dst_rgb,
        src_alpha: v.src_alpha,
        dst_alpha: v.dst_alpha,
    },
);
context_attribute!(
    LineWidth, "line width", f32,
    |ctx| Ok(ctx.rasterization.line_width),
    |v| Cmd::GlLineWidth { width: *v },
);
context_attribute!(
    Scissor, "scissor box", Rect,
    |ctx| Ok(ctx.rasterization.scissor),
    |v| Cmd::GlScissor { rect: *v },
);
context_attribute!(
    ArrayBufferBinding, "array buffer binding", BufferId,
    |ctx| ctx.buffer_binding(BufferTarget::Array),
    |v| Cmd::GlBindBuffer { target: BufferTarget::Array, buffer: *v },
);
context_attribute!(
    /// Lives in the bound vertex array.
    ElementArrayBufferBinding, "element array buffer binding", BufferId,
    |ctx| ctx.buffer_binding(BufferTarget::ElementArray),
    |v| Cmd::GlBindBuffer { target: BufferTarget::ElementArray, buffer: *v },
);
context_attribute!(
    PixelPackBufferBinding, "pixel pack buffer binding", BufferId,
    |ctx| ctx.buffer_binding(BufferTarget::PixelPack),
    |v| Cmd::GlBindBuffer { target: BufferTarget::PixelPack, buffer: *v },
);
context_attribute!(
    PixelUnpackBufferBinding, "pixel unpack buffer binding", BufferId,
    |ctx| ctx.buffer_binding(BufferTarget::PixelUnpack),
    |v| Cmd::GlBindBuffer { target: BufferTarget::PixelUnpack, buffer: *v },
);
context_attribute!(
    DrawFramebufferBinding, "draw framebuffer binding", FramebufferId,
    |ctx| Ok(ctx.bound_draw_framebuffer),
    |v| Cmd::GlBindFramebuffer { target: FramebufferTarget::Draw, framebuffer: *v },
);
context_attribute!(
    ReadFramebufferBinding, "read framebuffer binding", FramebufferId,
    |ctx| Ok(ctx.bound_read_framebuffer),
    |v| Cmd::GlBindFramebuffer { target: FramebufferTarget::Read, framebuffer: *v },
);
context_attribute!(
    /// Read buffer of the bound read framebuffer.
    ReadBuffer, "read buffer", ReadBufferMode,
    |ctx| Ok(ctx.read_framebuffer()?.read_buffer),
    |v| Cmd::GlReadBuffer { mode: *v },
);
context_attribute!(
    RenderbufferBinding, "renderbuffer binding", RenderbufferId,
    |ctx| Ok(ctx.bound_renderbuffer),
    |v| Cmd::GlBindRenderbuffer { renderbuffer: *v },
);
context_attribute!(
    ActiveTexture, "active texture unit", u32,
    |ctx| Ok(ctx.active_texture_unit),
    |v| Cmd::GlActiveTexture { unit: *v },
);
context_attribute!(
    /// 2D binding of the active texture unit.
    Texture2DBinding, "texture 2d binding", TextureId,
    |ctx| Ok(ctx.texture_unit()?.texture_2d),
    |v| Cmd::GlBindTexture { target: TextureTarget::Texture2D, texture: *v },
);
context_attribute!(
    VertexArrayBinding, "vertex array binding", VertexArrayId,
    |ctx| Ok(ctx.bound_vertex_array),
    |v| Cmd::GlBindVertexArray { array: *v },
);
context_attribute!(
    CurrentProgram, "current program", ProgramId,
    |ctx| Ok(ctx.bound_program),
    |v| Cmd::GlUseProgram { program: *v },
);

/// One `glEnable` capability.
#[derive(Clone, Copy, Debug)]
pub struct Enabled(pub Capability);

impl Attribute<Gles> for Enabled {
    type Value = bool;

    fn name(&self) -> &'static str {
        "capability"
    }

    fn get(&self, state: &State<GlesState>) -> Result<bool, ReplayError> {
        current_context(state)?.is_enabled(self.0)
    }

    fn set(&self, value: &bool) -> Cmd {
        if *value {
            Cmd::GlEnable { cap: self.0 }
        } else {
            Cmd::GlDisable { cap: self.0 }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PixelStore(pub PixelStoreParam);

impl Attribute<Gles> for PixelStore {
    type Value = i32;

    fn name(&self) -> &'static str {
        "pixel store"
    }

    fn get(&self, state: &State<GlesState>) -> Result<i32, ReplayError> {
        Ok(current_context(state)?.pixel_storage.get(self.0))
    }

    fn set(&self, value: &i32) -> Cmd {
        Cmd::GlPixelStorei {
            param: self.0,
            value: *value,
        }
    }
}

/// Enable flag of one attribute array in the bound vertex array.
#[derive(Clone, Copy, Debug)]
pub struct VertexAttribArrayEnabled(pub u32);

impl Attribute<Gles> for VertexAttribArrayEnabled {
    type Value = bool;

    fn name(&self) -> &'static str {
        "vertex attrib array enabled"
    }

    fn get(&self, state: &State<GlesState>) -> Result<bool, ReplayError> {
        Ok(current_context(state)?.vertex_attribute(self.0)?.enabled)
    }

    fn set(&self, value: &bool) -> Cmd {
        if *value {
            Cmd::GlEnableVertexAttribArray { location: self.0 }
        } else {
            Cmd::GlDisableVertexAttribArray { location: self.0 }
        }
    }
}

/// A [`Tweaker`] with GLES helpers and the session's id namespaces.
///
/// Every helper either commits nothing (the attribute already holds the requested value)
/// or commits the change and pushes the matching restore; [`GlesTweaker::revert`] puts the
/// context back exactly as it was.
pub struct GlesTweaker<'w, 'n> {
    inner: Tweaker<'w, Gles>,
    namespaces: &'n Namespaces<Context>,
}

impl<'w, 'n> GlesTweaker<'w, 'n> {
    pub fn new(out: &'w mut dyn Writer<Gles>, namespaces: &'n Namespaces<Context>) -> Self {
        Self {
            inner: Tweaker::new(out),
            namespaces,
        }
    }

    /// The current context; its absence is a query failure.
    pub fn context(&self) -> Result<&Context, ReplayError> {
        current_context(self.inner.state())
    }

    pub fn set_if_different<T: Attribute<Gles>>(&mut self, attr: T, desired: T::Value) -> Result<bool, ReplayError> {
        self.inner.set_if_different(attr, desired)
    }

    pub fn apply_unconditional(&mut self, action: Atom<Cmd>, inverse: Restore<Cmd>) -> Result<(), ReplayError> {
        self.inner.apply_unconditional(action, inverse)
    }

    pub fn push_restore(&mut self, restore: Restore<Cmd>) {
        self.inner.push_restore(restore);
    }

    /// Commit a command that needs no restore.
    pub fn write(&mut self, cmd: Cmd) -> Result<(), ReplayError> {
        self.inner.write(cmd)
    }

    pub fn write_atom(&mut self, atom: Atom<Cmd>) -> Result<(), ReplayError> {
        self.inner.write_atom(atom)
    }

    pub fn alloc_data(&mut self, data: Vec<u8>) -> Result<TempAlloc, ReplayError> {
        self.inner.alloc_data(data)
    }

    pub fn pending(&self) -> &[Restore<Cmd>] {
        self.inner.pending()
    }

    pub fn is_clean(&self) -> bool {
        self.inner.is_clean()
    }

    pub fn revert(&mut self) -> Result<(), ReplayError> {
        self.inner.revert()
    }

    pub fn enable(&mut self, cap: Capability) -> Result<(), ReplayError> {
        self.set_if_different(Enabled(cap), true).map(drop)
    }

    pub fn disable(&mut self, cap: Capability) -> Result<(), ReplayError> {
        self.set_if_different(Enabled(cap), false).map(drop)
    }

    pub fn depth_mask(&mut self, enabled: bool) -> Result<(), ReplayError> {
        self.set_if_different(DepthMask, enabled).map(drop)
    }

    pub fn depth_func(&mut self, func: CompareFunc) -> Result<(), ReplayError> {
        self.set_if_different(DepthFunc, func).map(drop)
    }

    pub fn blend_color(&mut self, color: Color) -> Result<(), ReplayError> {
        self.set_if_different(BlendColor, color).map(drop)
    }

    pub fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<(), ReplayError> {
        self.blend_func_separate(src, dst, src, dst)
    }

    pub fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Result<(), ReplayError> {
        let desired = BlendFunc {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        };
        self.set_if_different(BlendFactors, desired).map(drop)
    }

    /// Adds to the current polygon offset. Always commits, even for a zero delta.
    pub fn polygon_offset(&mut self, factor: f32, units: f32) -> Result<(), ReplayError> {
        let raster = self.context()?.rasterization;
        let (old_factor, old_units) = (raster.polygon_offset_factor, raster.polygon_offset_units);
        self.apply_unconditional(
            Atom::new(Cmd::GlPolygonOffset {
                factor: old_factor + factor,
                units: old_units + units,
            }),
            Restore::SetScalar(Atom::new(Cmd::GlPolygonOffset {
                factor: old_factor,
                units: old_units,
            })),
        )
    }

    pub fn line_width(&mut self, width: f32) -> Result<(), ReplayError> {
        self.set_if_different(LineWidth, width).map(drop)
    }

    pub fn scissor(&mut self, rect: Rect) -> Result<(), ReplayError> {
        self.set_if_different(Scissor, rect).map(drop)
    }

    pub fn bind_array_buffer(&mut self, buffer: BufferId) -> Result<(), ReplayError> {
        self.set_if_different(ArrayBufferBinding, buffer).map(drop)
    }

    pub fn bind_element_array_buffer(&mut self, buffer: BufferId) -> Result<(), ReplayError> {
        self.set_if_different(ElementArrayBufferBinding, buffer).map(drop)
    }

    pub fn bind_draw_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), ReplayError> {
        self.set_if_different(DrawFramebufferBinding, framebuffer).map(drop)
    }

    pub fn bind_read_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), ReplayError> {
        self.set_if_different(ReadFramebufferBinding, framebuffer).map(drop)
    }

    pub fn read_buffer(&mut self, mode: ReadBufferMode) -> Result<(), ReplayError> {
        self.set_if_different(ReadBuffer, mode).map(drop)
    }

    pub fn bind_renderbuffer(&mut self, renderbuffer: RenderbufferId) -> Result<(), ReplayError> {
        self.set_if_different(RenderbufferBinding, renderbuffer).map(drop)
    }

    pub fn active_texture(&mut self, unit: u32) -> Result<(), ReplayError> {
        self.set_if_different(ActiveTexture, unit).map(drop)
    }

    pub fn bind_texture_2d(&mut self, texture: TextureId) -> Result<(), ReplayError> {
        self.set_if_different(Texture2DBinding, texture).map(drop)
    }

    pub fn bind_vertex_array(&mut self, array: VertexArrayId) -> Result<(), ReplayError> {
        self.set_if_different(VertexArrayBinding, array).map(drop)
    }

    pub fn use_program(&mut self, program: ProgramId) -> Result<(), ReplayError> {
        self.set_if_different(CurrentProgram, program).map(drop)
    }

    /// All twelve pack/unpack parameters plus the pixel pack and unpack buffer bindings.
    pub fn set_pixel_storage(
        &mut self,
        storage: &PixelStorage,
        pack_buffer: BufferId,
        unpack_buffer: BufferId,
    ) -> Result<(), ReplayError> {
        for param in PixelStoreParam::ALL {
            self.set_if_different(PixelStore(param), storage.get(param))?;
        }
        self.set_if_different(PixelPackBufferBinding, pack_buffer)?;
        self.set_if_different(PixelUnpackBufferBinding, unpack_buffer)?;
        Ok(())
    }

    fn unused_id(&self, tag: char) -> Result<u32, ReplayError> {
        self.namespaces.unused_id(tag, self.context()?)
    }

    /// Generate one object through a `glGen*`, deleted again on revert.
    fn gen_object(&mut self, tag: char, gen: fn(Pointer) -> Cmd, delete: fn(Pointer) -> Cmd) -> Result<u32, ReplayError> {
        let id = self.unused_id(tag)?;
        let name = self.alloc_data(id.to_le_bytes().to_vec())?;
        self.apply_unconditional(
            Atom::new(gen(name.ptr())).with_write(name.observation()),
            Restore::DeleteObject(Atom::new(delete(name.ptr())).with_read(name.observation())),
        )?;
        debug!(%tag, id, "object generated");
        Ok(id)
    }

    pub fn gen_buffer(&mut self) -> Result<BufferId, ReplayError> {
        self.gen_object(
            names::BUFFERS,
            |buffers| Cmd::GlGenBuffers { count: 1, buffers },
            |buffers| Cmd::GlDeleteBuffers { count: 1, buffers },
        )
        .map(BufferId)
    }

    pub fn gen_renderbuffer(&mut self) -> Result<RenderbufferId, ReplayError> {
        self.gen_object(
            names::RENDERBUFFERS,
            |renderbuffers| Cmd::GlGenRenderbuffers {
                count: 1,
                renderbuffers,
            },
            |renderbuffers| Cmd::GlDeleteRenderbuffers {
                count: 1,
                renderbuffers,
            },
        )
        .map(RenderbufferId)
    }

    pub fn gen_framebuffer(&mut self) -> Result<FramebufferId, ReplayError> {
        self.gen_object(
            names::FRAMEBUFFERS,
            |framebuffers| Cmd::GlGenFramebuffers {
                count: 1,
                framebuffers,
            },
            |framebuffers| Cmd::GlDeleteFramebuffers {
                count: 1,
                framebuffers,
            },
        )
        .map(FramebufferId)
    }

    pub fn gen_texture(&mut self) -> Result<TextureId, ReplayError> {
        self.gen_object(
            names::TEXTURES,
            |textures| Cmd::GlGenTextures { count: 1, textures },
            |textures| Cmd::GlDeleteTextures { count: 1, textures },
        )
        .map(TextureId)
    }

    pub fn gen_vertex_array(&mut self) -> Result<VertexArrayId, ReplayError> {
        self.gen_object(
            names::VERTEX_ARRAYS,
            |arrays| Cmd::GlGenVertexArrays { count: 1, arrays },
            |arrays| Cmd::GlDeleteVertexArrays { count: 1, arrays },
        )
        .map(VertexArrayId)
    }

    pub fn create_program(&mut self) -> Result<ProgramId, ReplayError> {
        let program = ProgramId(self.unused_id(names::PROGRAMS)?);
        self.apply_unconditional(
            Atom::new(Cmd::GlCreateProgram { result: program }),
            Restore::DeleteObject(Atom::new(Cmd::GlDeleteProgram { program })),
        )?;
        Ok(program)
    }

    pub fn create_shader(&mut self, ty: ShaderType) -> Result<ShaderId, ReplayError> {
        let shader = ShaderId(self.unused_id(names::SHADERS)?);
        self.apply_unconditional(
            Atom::new(Cmd::GlCreateShader { ty, result: shader }),
            Restore::DeleteObject(Atom::new(Cmd::GlDeleteShader { shader })),
        )?;
        Ok(shader)
    }

    /// Upload `source` to `shader` through three temporary buffers (text, length, pointer).
    pub fn shader_source(&mut self, shader: ShaderId, source: &str) -> Result<(), ReplayError> {
        let len = i32::try_from(source.len())
            .map_err(|_| ReplayError::schema_mismatch("glShaderSource", "source longer than i32::MAX"))?;
        let text = self.alloc_data(source.as_bytes().to_vec())?;
        let lengths = self.alloc_data(len.to_le_bytes().to_vec())?;
        let strings = self.alloc_data(text.ptr().0.to_le_bytes().to_vec())?;
        self.write_atom(
            Atom::new(Cmd::GlShaderSource {
                shader,
                count: 1,
                strings: strings.ptr(),
                lengths: lengths.ptr(),
            })
            .with_read(text.observation())
            .with_read(lengths.observation())
            .with_read(strings.observation()),
        )
    }

    /// Create a program with a compiled vertex and fragment shader attached. The program is
    /// not linked, so attribute locations can still be bound.
    pub fn make_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramId, ReplayError> {
        let program = self.create_program()?;
        let mut shaders = Vec::with_capacity(2);
        for (ty, source) in [
            (ShaderType::Vertex, vertex_source),
            (ShaderType::Fragment, fragment_source),
        ] {
            let shader = self.create_shader(ty)?;
            self.shader_source(shader, source)?;
            self.write(Cmd::GlCompileShader { shader })?;
            shaders.push(shader);
        }
        for shader in shaders {
            self.write(Cmd::GlAttachShader { program, shader })?;
        }
        Ok(program)
    }

    /// Make exactly `locations` the enabled vertex attribute arrays.
    ///
    /// On GLES 3+ a fresh vertex array is generated and bound, leaving the application's
    /// arrays untouched. On GLES 2 the default vertex array is edited in place: every
    /// enable flag is changed minimally, and the pointer state and array buffer binding of
    /// each requested location are snapshotted for restore.
    pub fn make_vertex_array(&mut self, locations: &[u32]) -> Result<(), ReplayError> {
        let ctx = self.context()?;
        let major = ctx.constants.major_version;
        let max = ctx.constants.max_vertex_attribs;
        if let Some(&bad) = locations.iter().find(|&&l| l >= max) {
            return Err(ReplayError::state_query(format!(
                "vertex attribute {bad} out of range (max {max})"
            )));
        }

        if major >= 3 {
            let array = self.gen_vertex_array()?;
            self.bind_vertex_array(array)?;
            for &location in locations {
                self.write(Cmd::GlEnableVertexAttribArray { location })?;
            }
            return Ok(());
        }

        let (attributes, array_buffer) = {
            let ctx = self.context()?;
            (ctx.vertex_array()?.attributes.clone(), ctx.bound_buffers.array)
        };
        for location in (0..max).filter(|l| !locations.contains(l)) {
            self.set_if_different(VertexAttribArrayEnabled(location), false)?;
        }
        for &location in locations {
            self.set_if_different(VertexAttribArrayEnabled(location), true)?;
            let original = attributes.get(location as usize).copied().ok_or_else(|| {
                ReplayError::state_query(format!("vertex attribute {location} out of range"))
            })?;
            self.push_restore(Restore::SetFields(vec![
                Atom::new(Cmd::GlBindBuffer {
                    target: BufferTarget::Array,
                    buffer: original.buffer,
                }),
                Atom::new(Cmd::GlVertexAttribPointer {
                    location,
                    size: original.size,
                    ty: original.ty,
                    normalized: original.normalized,
                    stride: original.stride,
                    pointer: original.pointer,
                }),
                Atom::new(Cmd::GlBindBuffer {
                    target: BufferTarget::Array,
                    buffer: array_buffer,
                }),
            ]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use pretty_assertions::assert_eq;
    use rewind_atom::Command;
    use rewind_transform::Recorder;

    fn names_of(out: &Recorder<Gles>, skip: usize) -> Vec<&'static str> {
        out.output()[skip..].iter().map(|a| a.cmd.name()).collect()
    }

    fn pending_kinds(t: &GlesTweaker<'_, '_>) -> Vec<&'static str> {
        t.pending().iter().map(|r| r.kind()).collect()
    }

    #[test]
    fn disabling_a_disabled_capability_commits_nothing() {
        let mut out = session(2);
        let ns = names::namespaces();
        let before = out.output().len();
        let mut t = GlesTweaker::new(&mut out, &ns);
        t.disable(Capability::Blend).unwrap();
        t.enable(Capability::Dither).unwrap();
        assert!(t.is_clean());
        drop(t);
        assert_eq!(out.output().len(), before);
    }

    #[test]
    fn polygon_offset_is_additive_and_unconditional() {
        let mut out = session(2);
        let ns = names::namespaces();
        let mut t = GlesTweaker::new(&mut out, &ns);
        t.polygon_offset(1.0, 2.0).unwrap();
        t.polygon_offset(0.0, 0.0).unwrap();
        t.polygon_offset(0.5, 0.5).unwrap();
        let raster = t.context().unwrap().rasterization;
        assert_eq!((raster.polygon_offset_factor, raster.polygon_offset_units), (1.5, 2.5));
        assert_eq!(t.pending().len(), 3);
        t.revert().unwrap();
        let raster = t.context().unwrap().rasterization;
        assert_eq!((raster.polygon_offset_factor, raster.polygon_offset_units), (0.0, 0.0));
    }

    #[test]
    fn generated_objects_are_deleted_on_revert() {
        let mut out = session(3);
        let ns = names::namespaces();
        let before = out.state().api.clone();
        let mut t = GlesTweaker::new(&mut out, &ns);
        let a = t.gen_buffer().unwrap();
        let b = t.gen_buffer().unwrap();
        assert_ne!(a, b);
        assert!(!a.is_none());
        let tex = t.gen_texture().unwrap();
        t.bind_texture_2d(tex).unwrap();
        t.revert().unwrap();
        drop(t);
        assert_eq!(out.state().api, before);
        assert_eq!(out.allocator_ref().live_count(), 0);
    }

    #[test]
    fn make_program_uses_the_shared_program_shader_namespace() {
        let mut out = session(2);
        let ns = names::namespaces();
        let mut t = GlesTweaker::new(&mut out, &ns);
        let program = t.make_program("void main() {}", "void main() {}").unwrap();
        let ctx = t.context().unwrap();
        let p = &ctx.objects.programs[&program];
        assert_eq!(p.shaders.len(), 2);
        for shader in &p.shaders {
            assert_ne!(shader.0, program.0);
            assert!(ctx.objects.shaders[shader].compiled);
            assert_eq!(ctx.objects.shaders[shader].source, "void main() {}");
        }
        t.revert().unwrap();
        assert!(t.context().unwrap().objects.programs.is_empty());
        assert!(t.context().unwrap().objects.shaders.is_empty());
    }

    #[test]
    fn make_vertex_array_gles3_binds_a_fresh_array() {
        let mut out = session(3);
        let ns = names::namespaces();
        let skip = out.output().len();
        let mut t = GlesTweaker::new(&mut out, &ns);
        t.make_vertex_array(&[0]).unwrap();
        let ctx = t.context().unwrap();
        assert!(!ctx.bound_vertex_array.is_none());
        assert!(ctx.vertex_attribute(0).unwrap().enabled);
        t.revert().unwrap();
        drop(t);
        assert_eq!(
            names_of(&out, skip),
            vec![
                "glGenVertexArrays",
                "glBindVertexArray",
                "glEnableVertexAttribArray",
                "glBindVertexArray",
                "glDeleteVertexArrays",
            ]
        );
    }

    #[test]
    fn make_vertex_array_gles2_edits_the_default_array_minimally() {
        let mut out = session(2);
        for location in [1, 3] {
            out.mutate_and_write(Atom::new(Cmd::GlEnableVertexAttribArray { location }))
                .unwrap();
        }
        let ns = names::namespaces();
        let before = out.state().api.clone();
        let skip = out.output().len();
        let mut t = GlesTweaker::new(&mut out, &ns);
        t.make_vertex_array(&[0, 1]).unwrap();
        let ctx = t.context().unwrap();
        assert!(ctx.bound_vertex_array.is_none());
        let enabled: Vec<u32> = (0..4)
            .filter(|&l| ctx.vertex_attribute(l).unwrap().enabled)
            .collect();
        assert_eq!(enabled, vec![0, 1]);
        // Disable 3, enable 0; location 1 is already enabled.
        assert_eq!(
            pending_kinds(&t),
            vec!["set-scalar", "set-scalar", "set-fields", "set-fields"]
        );
        t.revert().unwrap();
        drop(t);
        assert_eq!(out.state().api, before);
        assert_eq!(
            names_of(&out, skip)[..2].to_vec(),
            vec!["glDisableVertexAttribArray", "glEnableVertexAttribArray"]
        );
    }

    #[test]
    fn out_of_range_location_is_a_query_failure() {
        let mut out = session(2);
        let ns = names::namespaces();
        let mut t = GlesTweaker::new(&mut out, &ns);
        assert!(matches!(
            t.make_vertex_array(&[99]),
            Err(ReplayError::StateQuery(_))
        ));
        assert!(t.is_clean());
    }

    #[test]
    fn pixel_storage_round_trips() {
        let mut out = session(3);
        let ns = names::namespaces();
        let before = out.state().api.clone();
        let mut t = GlesTweaker::new(&mut out, &ns);
        let pack = t.gen_buffer().unwrap();
        let storage = PixelStorage {
            unpack_alignment: 1,
            pack_row_length: 64,
            ..PixelStorage::default()
        };
        t.set_pixel_storage(&storage, pack, BufferId::NONE).unwrap();
        let ctx = t.context().unwrap();
        assert_eq!(ctx.pixel_storage, storage);
        assert_eq!(ctx.bound_buffers.pixel_pack, pack);
        // gen (release + delete), two parameters, one binding.
        assert_eq!(t.pending().len(), 5);
        t.revert().unwrap();
        drop(t);
        assert_eq!(out.state().api, before);
    }

    #[test]
    fn missing_context_is_a_query_failure() {
        let mut out = Recorder::<Gles>::new(State::default(), Default::default());
        let ns = names::namespaces();
        let mut t = GlesTweaker::new(&mut out, &ns);
        assert!(matches!(t.disable(Capability::Blend), Err(ReplayError::StateQuery(_))));
        assert!(matches!(t.gen_buffer(), Err(ReplayError::StateQuery(_))));
        assert!(t.is_clean());
    }
}
