//! The closed GLES/EGL command catalog.

use rewind_atom::{AtomFlags, Command, Pointer};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// One GLES or EGL entry point with its arguments.
///
/// Array arguments are passed by [`Pointer`] into the shadow pool; the atom carrying the
/// command observes the memory it reads and writes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum Cmd {
    EglCreateContext {
        context: ContextId,
        major_version: u32,
        minor_version: u32,
    },
    EglCreateWindowSurface {
        surface: SurfaceId,
        width: i32,
        height: i32,
    },
    EglSurfaceAttrib {
        surface: SurfaceId,
        swap_behavior: SwapBehavior,
    },
    /// `context == ContextId::NONE` releases the current context.
    EglMakeCurrent {
        draw: SurfaceId,
        read: SurfaceId,
        context: ContextId,
    },
    EglSwapBuffers {
        surface: SurfaceId,
    },

    GlEnable {
        cap: Capability,
    },
    GlDisable {
        cap: Capability,
    },
    GlDepthMask {
        enabled: bool,
    },
    GlDepthFunc {
        func: CompareFunc,
    },
    GlBlendColor {
        color: Color,
    },
    GlBlendFuncSeparate {
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
    GlPolygonOffset {
        factor: f32,
        units: f32,
    },
    GlLineWidth {
        width: f32,
    },
    GlScissor {
        rect: Rect,
    },
    GlViewport {
        rect: Rect,
    },

    GlGenBuffers {
        count: i32,
        buffers: Pointer,
    },
    GlDeleteBuffers {
        count: i32,
        buffers: Pointer,
    },
    GlGenRenderbuffers {
        count: i32,
        renderbuffers: Pointer,
    },
    GlDeleteRenderbuffers {
        count: i32,
        renderbuffers: Pointer,
    },
    GlGenFramebuffers {
        count: i32,
        framebuffers: Pointer,
    },
    GlDeleteFramebuffers {
        count: i32,
        framebuffers: Pointer,
    },
    GlGenTextures {
        count: i32,
        textures: Pointer,
    },
    GlDeleteTextures {
        count: i32,
        textures: Pointer,
    },
    GlGenVertexArrays {
        count: i32,
        arrays: Pointer,
    },
    GlDeleteVertexArrays {
        count: i32,
        arrays: Pointer,
    },

    GlCreateProgram {
        result: ProgramId,
    },
    GlDeleteProgram {
        program: ProgramId,
    },
    GlCreateShader {
        ty: ShaderType,
        result: ShaderId,
    },
    GlDeleteShader {
        shader: ShaderId,
    },
    /// `strings` points at `count` 8-byte pointers; `lengths` is null or points at `count`
    /// `i32`s (negative = NUL-terminated).
    GlShaderSource {
        shader: ShaderId,
        count: i32,
        strings: Pointer,
        lengths: Pointer,
    },
    GlCompileShader {
        shader: ShaderId,
    },
    GlAttachShader {
        program: ProgramId,
        shader: ShaderId,
    },
    GlBindAttribLocation {
        program: ProgramId,
        location: u32,
        name: String,
    },
    GlLinkProgram {
        program: ProgramId,
    },
    GlUseProgram {
        program: ProgramId,
    },

    GlBindBuffer {
        target: BufferTarget,
        buffer: BufferId,
    },
    GlBufferData {
        target: BufferTarget,
        size: i64,
        data: Pointer,
        usage: BufferUsage,
    },
    GlBindFramebuffer {
        target: FramebufferTarget,
        framebuffer: FramebufferId,
    },
    GlReadBuffer {
        mode: ReadBufferMode,
    },
    GlBindRenderbuffer {
        renderbuffer: RenderbufferId,
    },
    /// `unit` is the zero-based unit index, not `GL_TEXTURE0 + n`.
    GlActiveTexture {
        unit: u32,
    },
    GlBindTexture {
        target: TextureTarget,
        texture: TextureId,
    },
    GlBindVertexArray {
        array: VertexArrayId,
    },
    GlEnableVertexAttribArray {
        location: u32,
    },
    GlDisableVertexAttribArray {
        location: u32,
    },
    GlVertexAttribPointer {
        location: u32,
        size: i32,
        ty: VertexType,
        normalized: bool,
        stride: i32,
        pointer: Pointer,
    },
    GlPixelStorei {
        param: PixelStoreParam,
        value: i32,
    },
    GlDrawArrays {
        mode: DrawMode,
        first: i32,
        count: i32,
    },
}

impl Command for Cmd {
    fn name(&self) -> &'static str {
        match self {
            Cmd::EglCreateContext { .. } => "eglCreateContext",
            Cmd::EglCreateWindowSurface { .. } => "eglCreateWindowSurface",
            Cmd::EglSurfaceAttrib { .. } => "eglSurfaceAttrib",
            Cmd::EglMakeCurrent { .. } => "eglMakeCurrent",
            Cmd::EglSwapBuffers { .. } => "eglSwapBuffers",
            Cmd::GlEnable { .. } => "glEnable",
            Cmd::GlDisable { .. } => "glDisable",
            Cmd::GlDepthMask { .. } => "glDepthMask",
            Cmd::GlDepthFunc { .. } => "glDepthFunc",
            Cmd::GlBlendColor { .. } => "glBlendColor",
            Cmd::GlBlendFuncSeparate { .. } => "glBlendFuncSeparate",
            Cmd::GlPolygonOffset { .. } => "glPolygonOffset",
            Cmd::GlLineWidth { .. } => "glLineWidth",
            Cmd::GlScissor { .. } => "glScissor",
            Cmd::GlViewport { .. } => "glViewport",
            Cmd::GlGenBuffers { .. } => "glGenBuffers",
            Cmd::GlDeleteBuffers { .. } => "glDeleteBuffers",
            Cmd::GlGenRenderbuffers { .. } => "glGenRenderbuffers",
            Cmd::GlDeleteRenderbuffers { .. } => "glDeleteRenderbuffers",
            Cmd::GlGenFramebuffers { .. } => "glGenFramebuffers",
            Cmd::GlDeleteFramebuffers { .. } => "glDeleteFramebuffers",
            Cmd::GlGenTextures { .. } => "glGenTextures",
            Cmd::GlDeleteTextures { .. } => "glDeleteTextures",
            Cmd::GlGenVertexArrays { .. } => "glGenVertexArrays",
            Cmd::GlDeleteVertexArrays { .. } => "glDeleteVertexArrays",
            Cmd::GlCreateProgram { .. } => "glCreateProgram",
            Cmd::GlDeleteProgram { .. } => "glDeleteProgram",
            Cmd::GlCreateShader { .. } => "glCreateShader",
            Cmd::GlDeleteShader { .. } => "glDeleteShader",
            Cmd::GlShaderSource { .. } => "glShaderSource",
            Cmd::GlCompileShader { .. } => "glCompileShader",
            Cmd::GlAttachShader { .. } => "glAttachShader",
            Cmd::GlBindAttribLocation { .. } => "glBindAttribLocation",
            Cmd::GlLinkProgram { .. } => "glLinkProgram",
            Cmd::GlUseProgram { .. } => "glUseProgram",
            Cmd::GlBindBuffer { .. } => "glBindBuffer",
            Cmd::GlBufferData { .. } => "glBufferData",
            Cmd::GlBindFramebuffer { .. } => "glBindFramebuffer",
            Cmd::GlReadBuffer { .. } => "glReadBuffer",
            Cmd::GlBindRenderbuffer { .. } => "glBindRenderbuffer",
            Cmd::GlActiveTexture { .. } => "glActiveTexture",
            Cmd::GlBindTexture { .. } => "glBindTexture",
            Cmd::GlBindVertexArray { .. } => "glBindVertexArray",
            Cmd::GlEnableVertexAttribArray { .. } => "glEnableVertexAttribArray",
            Cmd::GlDisableVertexAttribArray { .. } => "glDisableVertexAttribArray",
            Cmd::GlVertexAttribPointer { .. } => "glVertexAttribPointer",
            Cmd::GlPixelStorei { .. } => "glPixelStorei",
            Cmd::GlDrawArrays { .. } => "glDrawArrays",
        }
    }

    fn flags(&self) -> AtomFlags {
        match self {
            Cmd::EglSwapBuffers { .. } => AtomFlags::END_OF_FRAME,
            Cmd::GlDrawArrays { .. } => AtomFlags::DRAW_CALL,
            _ => AtomFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_atom::Atom;

    #[test]
    fn flags_follow_the_command_kind() {
        let swap = Atom::new(Cmd::EglSwapBuffers {
            surface: SurfaceId(1),
        });
        assert!(swap.flags.is_end_of_frame());
        let draw = Atom::new(Cmd::GlDrawArrays {
            mode: DrawMode::Triangles,
            first: 0,
            count: 3,
        });
        assert!(draw.flags.is_draw_call());
        assert!(Atom::new(Cmd::GlLineWidth { width: 1.0 }).flags.is_empty());
    }

    #[test]
    fn json_uses_entry_point_names() {
        let json = serde_json::to_value(Cmd::GlBindBuffer {
            target: BufferTarget::Array,
            buffer: BufferId(3),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "call": "glBindBuffer", "target": "Array", "buffer": 3 })
        );
        let back: Cmd = serde_json::from_value(json).unwrap();
        assert_eq!(back.name(), "glBindBuffer");
    }
}
