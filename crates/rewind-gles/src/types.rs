//! Object names and enumerations of the GLES/EGL command catalog.
//!
//! Enumerations are semantic (not raw `GLenum` values); anything the catalog cannot name
//! cannot appear in a stream.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! object_id {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u32);

            impl $name {
                /// The reserved zero name (default object / unbound).
                pub const NONE: Self = Self(0);

                pub fn is_none(self) -> bool {
                    self.0 == 0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

object_id! {
    BufferId;
    RenderbufferId;
    FramebufferId;
    TextureId;
    VertexArrayId;
    /// Shares its name space with [`ShaderId`].
    ProgramId;
    /// Shares its name space with [`ProgramId`].
    ShaderId;
    /// EGL context handle; zero is `EGL_NO_CONTEXT`.
    ContextId;
    /// EGL surface handle; zero is `EGL_NO_SURFACE`.
    SurfaceId;
}

/// Server-side capabilities toggled with `glEnable` / `glDisable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    Dither,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
    SampleCoverage,
    ScissorTest,
    StencilTest,
    /// GLES 3.0+.
    RasterizerDiscard,
    /// GLES 3.0+.
    PrimitiveRestartFixedIndex,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::Blend,
        Capability::CullFace,
        Capability::DepthTest,
        Capability::Dither,
        Capability::PolygonOffsetFill,
        Capability::SampleAlphaToCoverage,
        Capability::SampleCoverage,
        Capability::ScissorTest,
        Capability::StencilTest,
        Capability::RasterizerDiscard,
        Capability::PrimitiveRestartFixedIndex,
    ];

    /// First GLES major version that knows this capability.
    pub fn min_major_version(self) -> u32 {
        match self {
            Capability::RasterizerDiscard | Capability::PrimitiveRestartFixedIndex => 3,
            _ => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    Array,
    ElementArray,
    PixelPack,
    PixelUnpack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FramebufferTarget {
    /// Binds both draw and read.
    Framebuffer,
    Draw,
    Read,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadBufferMode {
    None,
    #[default]
    Back,
    ColorAttachment(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderType {
    Vertex,
    Fragment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Fixed,
    #[default]
    Float,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelStoreParam {
    UnpackAlignment,
    UnpackImageHeight,
    UnpackRowLength,
    UnpackSkipImages,
    UnpackSkipPixels,
    UnpackSkipRows,
    PackAlignment,
    PackImageHeight,
    PackRowLength,
    PackSkipImages,
    PackSkipPixels,
    PackSkipRows,
}

impl PixelStoreParam {
    pub const ALL: [PixelStoreParam; 12] = [
        PixelStoreParam::UnpackAlignment,
        PixelStoreParam::UnpackImageHeight,
        PixelStoreParam::UnpackRowLength,
        PixelStoreParam::UnpackSkipImages,
        PixelStoreParam::UnpackSkipPixels,
        PixelStoreParam::UnpackSkipRows,
        PixelStoreParam::PackAlignment,
        PixelStoreParam::PackImageHeight,
        PixelStoreParam::PackRowLength,
        PixelStoreParam::PackSkipImages,
        PixelStoreParam::PackSkipPixels,
        PixelStoreParam::PackSkipRows,
    ];
}

/// `EGL_SWAP_BEHAVIOR` of a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapBehavior {
    #[default]
    BufferDestroyed,
    BufferPreserved,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
