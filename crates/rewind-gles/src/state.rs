//! Shadow GLES/EGL device state.
//!
//! Maps are ordered so state dumps and digests are deterministic. Every object map holds
//! the live names of its kind; the default framebuffer and vertex array (name 0) always
//! exist.

use std::collections::BTreeMap;

use bitflags::bitflags;
use rewind_atom::Pointer;
use rewind_transform::ReplayError;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Texture units modelled per context.
pub const MAX_TEXTURE_UNITS: u32 = 8;
/// Generic vertex attribute locations per vertex array.
pub const MAX_VERTEX_ATTRIBS: u32 = 16;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        const BLEND = 1 << 0;
        const CULL_FACE = 1 << 1;
        const DEPTH_TEST = 1 << 2;
        const DITHER = 1 << 3;
        const POLYGON_OFFSET_FILL = 1 << 4;
        const SAMPLE_ALPHA_TO_COVERAGE = 1 << 5;
        const SAMPLE_COVERAGE = 1 << 6;
        const SCISSOR_TEST = 1 << 7;
        const STENCIL_TEST = 1 << 8;
        const RASTERIZER_DISCARD = 1 << 9;
        const PRIMITIVE_RESTART_FIXED_INDEX = 1 << 10;
    }
}

impl Default for Capabilities {
    /// Dithering is the only capability enabled in a fresh context.
    fn default() -> Self {
        Capabilities::DITHER
    }
}

impl Capability {
    pub fn flag(self) -> Capabilities {
        match self {
            Capability::Blend => Capabilities::BLEND,
            Capability::CullFace => Capabilities::CULL_FACE,
            Capability::DepthTest => Capabilities::DEPTH_TEST,
            Capability::Dither => Capabilities::DITHER,
            Capability::PolygonOffsetFill => Capabilities::POLYGON_OFFSET_FILL,
            Capability::SampleAlphaToCoverage => Capabilities::SAMPLE_ALPHA_TO_COVERAGE,
            Capability::SampleCoverage => Capabilities::SAMPLE_COVERAGE,
            Capability::ScissorTest => Capabilities::SCISSOR_TEST,
            Capability::StencilTest => Capabilities::STENCIL_TEST,
            Capability::RasterizerDiscard => Capabilities::RASTERIZER_DISCARD,
            Capability::PrimitiveRestartFixedIndex => Capabilities::PRIMITIVE_RESTART_FIXED_INDEX,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlesState {
    pub contexts: BTreeMap<ContextId, Context>,
    pub surfaces: BTreeMap<SurfaceId, Surface>,
    pub current: Option<ContextId>,
}

impl GlesState {
    pub fn current_context(&self) -> Option<&Context> {
        self.current.and_then(|id| self.contexts.get(&id))
    }

    pub fn current_context_mut(&mut self) -> Option<&mut Context> {
        let id = self.current?;
        self.contexts.get_mut(&id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub width: i32,
    pub height: i32,
    pub swap_behavior: SwapBehavior,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constants {
    pub major_version: u32,
    pub minor_version: u32,
    pub max_vertex_attribs: u32,
    pub max_texture_units: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    /// Set by the first `eglMakeCurrent` that binds the context.
    pub initialized: bool,
    /// Whether the draw surface keeps its contents across a swap.
    pub preserve_buffers_on_swap: bool,
    pub draw_surface: Option<SurfaceId>,
    pub read_surface: Option<SurfaceId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendFunc {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self {
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rasterization {
    pub depth_mask: bool,
    pub depth_func: CompareFunc,
    pub blend_color: Color,
    pub blend: BlendFunc,
    pub line_width: f32,
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,
    pub scissor: Rect,
    pub viewport: Rect,
}

impl Default for Rasterization {
    fn default() -> Self {
        Self {
            depth_mask: true,
            depth_func: CompareFunc::Less,
            blend_color: Color::default(),
            blend: BlendFunc::default(),
            line_width: 1.0,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            scissor: Rect::default(),
            viewport: Rect::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelStorage {
    pub unpack_alignment: i32,
    pub unpack_image_height: i32,
    pub unpack_row_length: i32,
    pub unpack_skip_images: i32,
    pub unpack_skip_pixels: i32,
    pub unpack_skip_rows: i32,
    pub pack_alignment: i32,
    pub pack_image_height: i32,
    pub pack_row_length: i32,
    pub pack_skip_images: i32,
    pub pack_skip_pixels: i32,
    pub pack_skip_rows: i32,
}

impl Default for PixelStorage {
    fn default() -> Self {
        Self {
            unpack_alignment: 4,
            unpack_image_height: 0,
            unpack_row_length: 0,
            unpack_skip_images: 0,
            unpack_skip_pixels: 0,
            unpack_skip_rows: 0,
            pack_alignment: 4,
            pack_image_height: 0,
            pack_row_length: 0,
            pack_skip_images: 0,
            pack_skip_pixels: 0,
            pack_skip_rows: 0,
        }
    }
}

impl PixelStorage {
    pub fn get(&self, param: PixelStoreParam) -> i32 {
        match param {
            PixelStoreParam::UnpackAlignment => self.unpack_alignment,
            PixelStoreParam::UnpackImageHeight => self.unpack_image_height,
            PixelStoreParam::UnpackRowLength => self.unpack_row_length,
            PixelStoreParam::UnpackSkipImages => self.unpack_skip_images,
            PixelStoreParam::UnpackSkipPixels => self.unpack_skip_pixels,
            PixelStoreParam::UnpackSkipRows => self.unpack_skip_rows,
            PixelStoreParam::PackAlignment => self.pack_alignment,
            PixelStoreParam::PackImageHeight => self.pack_image_height,
            PixelStoreParam::PackRowLength => self.pack_row_length,
            PixelStoreParam::PackSkipImages => self.pack_skip_images,
            PixelStoreParam::PackSkipPixels => self.pack_skip_pixels,
            PixelStoreParam::PackSkipRows => self.pack_skip_rows,
        }
    }

    pub fn set(&mut self, param: PixelStoreParam, value: i32) {
        let slot = match param {
            PixelStoreParam::UnpackAlignment => &mut self.unpack_alignment,
            PixelStoreParam::UnpackImageHeight => &mut self.unpack_image_height,
            PixelStoreParam::UnpackRowLength => &mut self.unpack_row_length,
            PixelStoreParam::UnpackSkipImages => &mut self.unpack_skip_images,
            PixelStoreParam::UnpackSkipPixels => &mut self.unpack_skip_pixels,
            PixelStoreParam::UnpackSkipRows => &mut self.unpack_skip_rows,
            PixelStoreParam::PackAlignment => &mut self.pack_alignment,
            PixelStoreParam::PackImageHeight => &mut self.pack_image_height,
            PixelStoreParam::PackRowLength => &mut self.pack_row_length,
            PixelStoreParam::PackSkipImages => &mut self.pack_skip_images,
            PixelStoreParam::PackSkipPixels => &mut self.pack_skip_pixels,
            PixelStoreParam::PackSkipRows => &mut self.pack_skip_rows,
        };
        *slot = value;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundBuffers {
    pub array: BufferId,
    pub pixel_pack: BufferId,
    pub pixel_unpack: BufferId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureUnit {
    pub texture_2d: TextureId,
    pub cube_map: TextureId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
    pub usage: BufferUsage,
    pub data: Vec<u8>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            usage: BufferUsage::StaticDraw,
            data: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shader {
    pub ty: ShaderType,
    pub source: String,
    pub compiled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub shaders: Vec<ShaderId>,
    pub attrib_bindings: BTreeMap<String, u32>,
    pub linked: bool,
    /// Deleted while current; removed once it stops being current.
    pub delete_pending: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framebuffer {
    pub read_buffer: ReadBufferMode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderbuffer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    /// Fixed by the first bind.
    pub target: Option<TextureTarget>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttributeArray {
    pub enabled: bool,
    pub size: i32,
    pub ty: VertexType,
    pub normalized: bool,
    pub stride: i32,
    pub pointer: Pointer,
    /// Array buffer bound when the pointer was specified.
    pub buffer: BufferId,
}

impl Default for VertexAttributeArray {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 4,
            ty: VertexType::Float,
            normalized: false,
            stride: 0,
            pointer: Pointer::NULL,
            buffer: BufferId::NONE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexArray {
    pub element_array_buffer: BufferId,
    pub attributes: Vec<VertexAttributeArray>,
}

impl VertexArray {
    pub fn new(attribs: u32) -> Self {
        Self {
            element_array_buffer: BufferId::NONE,
            attributes: vec![VertexAttributeArray::default(); attribs as usize],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Objects {
    pub buffers: BTreeMap<BufferId, Buffer>,
    pub renderbuffers: BTreeMap<RenderbufferId, Renderbuffer>,
    pub framebuffers: BTreeMap<FramebufferId, Framebuffer>,
    pub textures: BTreeMap<TextureId, Texture>,
    pub vertex_arrays: BTreeMap<VertexArrayId, VertexArray>,
    pub programs: BTreeMap<ProgramId, Program>,
    pub shaders: BTreeMap<ShaderId, Shader>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub constants: Constants,
    pub info: ContextInfo,
    pub capabilities: Capabilities,
    pub rasterization: Rasterization,
    pub pixel_storage: PixelStorage,
    pub bound_buffers: BoundBuffers,
    pub bound_vertex_array: VertexArrayId,
    pub bound_program: ProgramId,
    pub bound_draw_framebuffer: FramebufferId,
    pub bound_read_framebuffer: FramebufferId,
    pub bound_renderbuffer: RenderbufferId,
    pub active_texture_unit: u32,
    pub texture_units: Vec<TextureUnit>,
    pub objects: Objects,
}

impl Context {
    pub fn new(major_version: u32, minor_version: u32) -> Self {
        let mut objects = Objects::default();
        objects
            .framebuffers
            .insert(FramebufferId::NONE, Framebuffer::default());
        objects
            .vertex_arrays
            .insert(VertexArrayId::NONE, VertexArray::new(MAX_VERTEX_ATTRIBS));
        Self {
            constants: Constants {
                major_version,
                minor_version,
                max_vertex_attribs: MAX_VERTEX_ATTRIBS,
                max_texture_units: MAX_TEXTURE_UNITS,
            },
            info: ContextInfo::default(),
            capabilities: Capabilities::default(),
            rasterization: Rasterization::default(),
            pixel_storage: PixelStorage::default(),
            bound_buffers: BoundBuffers::default(),
            bound_vertex_array: VertexArrayId::NONE,
            bound_program: ProgramId::NONE,
            bound_draw_framebuffer: FramebufferId::NONE,
            bound_read_framebuffer: FramebufferId::NONE,
            bound_renderbuffer: RenderbufferId::NONE,
            active_texture_unit: 0,
            texture_units: vec![TextureUnit::default(); MAX_TEXTURE_UNITS as usize],
            objects,
        }
    }

    pub fn supports(&self, cap: Capability) -> bool {
        self.constants.major_version >= cap.min_major_version()
    }

    /// `glIsEnabled`; unknown capabilities for this version are a query failure.
    pub fn is_enabled(&self, cap: Capability) -> Result<bool, ReplayError> {
        if !self.supports(cap) {
            return Err(ReplayError::state_query(format!(
                "{cap:?} is not available in GLES {}.{}",
                self.constants.major_version, self.constants.minor_version
            )));
        }
        Ok(self.capabilities.contains(cap.flag()))
    }

    pub fn vertex_array(&self) -> Result<&VertexArray, ReplayError> {
        self.objects
            .vertex_arrays
            .get(&self.bound_vertex_array)
            .ok_or_else(|| {
                ReplayError::state_query(format!(
                    "bound vertex array {} does not exist",
                    self.bound_vertex_array
                ))
            })
    }

    pub fn vertex_array_mut(&mut self) -> Option<&mut VertexArray> {
        self.objects.vertex_arrays.get_mut(&self.bound_vertex_array)
    }

    pub fn vertex_attribute(&self, location: u32) -> Result<&VertexAttributeArray, ReplayError> {
        self.vertex_array()?
            .attributes
            .get(location as usize)
            .ok_or_else(|| {
                ReplayError::state_query(format!("vertex attribute {location} out of range"))
            })
    }

    pub fn texture_unit(&self) -> Result<&TextureUnit, ReplayError> {
        self.texture_units
            .get(self.active_texture_unit as usize)
            .ok_or_else(|| {
                ReplayError::state_query(format!(
                    "active texture unit {} out of range",
                    self.active_texture_unit
                ))
            })
    }

    pub fn read_framebuffer(&self) -> Result<&Framebuffer, ReplayError> {
        self.objects
            .framebuffers
            .get(&self.bound_read_framebuffer)
            .ok_or_else(|| {
                ReplayError::state_query(format!(
                    "bound read framebuffer {} does not exist",
                    self.bound_read_framebuffer
                ))
            })
    }

    pub fn buffer_binding(&self, target: BufferTarget) -> Result<BufferId, ReplayError> {
        Ok(match target {
            BufferTarget::Array => self.bound_buffers.array,
            BufferTarget::ElementArray => self.vertex_array()?.element_array_buffer,
            BufferTarget::PixelPack => self.bound_buffers.pixel_pack,
            BufferTarget::PixelUnpack => self.bound_buffers.pixel_unpack,
        })
    }
}
