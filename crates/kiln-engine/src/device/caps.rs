use core::fmt;

use bitflags::bitflags;

use crate::resource::ComponentType;

/// Optional backend features the render-state cache cares about.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Capability {
    AnisotropicFilter,
    ConditionalRendering,
    FP64,
    HardwareBuffer,
    Instancing,
    MultipleRenderTargets,
    OcclusionQuery,
    PixelBufferObject,
    RenderTexture,
    Texture3D,
    TextureCubemap,
    TextureMulti,
    TextureNPOT,
    /// Composite vertex-array objects. Without them attributes are re-specified per draw.
    VertexArrayObjects,
    /// Standalone sampler objects. Without them samplers are applied per texture.
    SamplerObjects,
    DoubleAttributes,
    IntegerAttributes,
}

impl Capability {
    pub const ALL: [Self; 17] = [
        Self::AnisotropicFilter,
        Self::ConditionalRendering,
        Self::FP64,
        Self::HardwareBuffer,
        Self::Instancing,
        Self::MultipleRenderTargets,
        Self::OcclusionQuery,
        Self::PixelBufferObject,
        Self::RenderTexture,
        Self::Texture3D,
        Self::TextureCubemap,
        Self::TextureMulti,
        Self::TextureNPOT,
        Self::VertexArrayObjects,
        Self::SamplerObjects,
        Self::DoubleAttributes,
        Self::IntegerAttributes,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AnisotropicFilter => "anisotropic filtering",
            Self::ConditionalRendering => "conditional rendering",
            Self::FP64 => "64-bit floats",
            Self::HardwareBuffer => "hardware buffers",
            Self::Instancing => "instancing",
            Self::MultipleRenderTargets => "multiple render targets",
            Self::OcclusionQuery => "occlusion queries",
            Self::PixelBufferObject => "pixel buffer objects",
            Self::RenderTexture => "render textures",
            Self::Texture3D => "3D textures",
            Self::TextureCubemap => "cubemap textures",
            Self::TextureMulti => "multitexturing",
            Self::TextureNPOT => "non-power-of-two textures",
            Self::VertexArrayObjects => "vertex array objects",
            Self::SamplerObjects => "sampler objects",
            Self::DoubleAttributes => "double vertex attributes",
            Self::IntegerAttributes => "integer vertex attributes",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Set of supported capabilities.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Capabilities: u32 {
        const ANISOTROPIC_FILTER = 1 << 0;
        const CONDITIONAL_RENDERING = 1 << 1;
        const FP64 = 1 << 2;
        const HARDWARE_BUFFER = 1 << 3;
        const INSTANCING = 1 << 4;
        const MULTIPLE_RENDER_TARGETS = 1 << 5;
        const OCCLUSION_QUERY = 1 << 6;
        const PIXEL_BUFFER_OBJECT = 1 << 7;
        const RENDER_TEXTURE = 1 << 8;
        const TEXTURE_3D = 1 << 9;
        const TEXTURE_CUBEMAP = 1 << 10;
        const TEXTURE_MULTI = 1 << 11;
        const TEXTURE_NPOT = 1 << 12;
        const VERTEX_ARRAY_OBJECTS = 1 << 13;
        const SAMPLER_OBJECTS = 1 << 14;
        const DOUBLE_ATTRIBUTES = 1 << 15;
        const INTEGER_ATTRIBUTES = 1 << 16;
    }
}

impl From<Capability> for Capabilities {
    fn from(cap: Capability) -> Self {
        match cap {
            Capability::AnisotropicFilter => Self::ANISOTROPIC_FILTER,
            Capability::ConditionalRendering => Self::CONDITIONAL_RENDERING,
            Capability::FP64 => Self::FP64,
            Capability::HardwareBuffer => Self::HARDWARE_BUFFER,
            Capability::Instancing => Self::INSTANCING,
            Capability::MultipleRenderTargets => Self::MULTIPLE_RENDER_TARGETS,
            Capability::OcclusionQuery => Self::OCCLUSION_QUERY,
            Capability::PixelBufferObject => Self::PIXEL_BUFFER_OBJECT,
            Capability::RenderTexture => Self::RENDER_TEXTURE,
            Capability::Texture3D => Self::TEXTURE_3D,
            Capability::TextureCubemap => Self::TEXTURE_CUBEMAP,
            Capability::TextureMulti => Self::TEXTURE_MULTI,
            Capability::TextureNPOT => Self::TEXTURE_NPOT,
            Capability::VertexArrayObjects => Self::VERTEX_ARRAY_OBJECTS,
            Capability::SamplerObjects => Self::SAMPLER_OBJECTS,
            Capability::DoubleAttributes => Self::DOUBLE_ATTRIBUTES,
            Capability::IntegerAttributes => Self::INTEGER_ATTRIBUTES,
        }
    }
}

impl Capabilities {
    /// Returns a copy with `cap` switched on or off.
    #[inline]
    pub fn with(mut self, cap: Capability, supported: bool) -> Self {
        self.set(cap.into(), supported);
        self
    }

    #[inline]
    pub fn has(&self, cap: Capability) -> bool {
        self.contains(cap.into())
    }

    /// Whether the backend can feed an attribute of type `ty`.
    pub fn is_component_type_supported(&self, ty: ComponentType) -> bool {
        match ty {
            ComponentType::Quaternion => false,
            ty if ty.is_double() => self.has(Capability::DoubleAttributes),
            ty if ty.is_integer() => self.has(Capability::IntegerAttributes),
            _ => true,
        }
    }
}

/// Device limits queried once at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Limits {
    pub max_anisotropy: u8,
    pub max_color_attachments: u32,
    pub max_render_targets: u32,
    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_vertex_attribs: u32,
}

impl Default for Limits {
    /// Conservative baseline every desktop backend meets.
    fn default() -> Self {
        Self {
            max_anisotropy: 1,
            max_color_attachments: 1,
            max_render_targets: 1,
            max_texture_size: 2048,
            max_texture_units: 8,
            max_vertex_attribs: 16,
        }
    }
}
