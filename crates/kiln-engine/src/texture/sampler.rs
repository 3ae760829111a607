/// Texel filtering between mip levels and texels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum SamplerFilter {
    Nearest,
    #[default]
    Bilinear,
    Trilinear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum SamplerWrap {
    Clamp,
    MirroredRepeat,
    #[default]
    Repeat,
}

/// Sampling parameters of one texture unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerConfig {
    pub filter: SamplerFilter,
    pub wrap: SamplerWrap,
    pub anisotropy: u8,
    use_mipmaps: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            filter: SamplerFilter::default(),
            wrap: SamplerWrap::default(),
            anisotropy: 1,
            use_mipmaps: false,
        }
    }
}

impl SamplerConfig {
    pub fn new(filter: SamplerFilter, wrap: SamplerWrap, anisotropy: u8) -> Self {
        Self {
            filter,
            wrap,
            anisotropy,
            use_mipmaps: false,
        }
    }

    /// Whether mip levels are sampled. Derived from the bound texture.
    #[inline]
    pub fn uses_mipmaps(&self) -> bool {
        self.use_mipmaps
    }

    /// Returns `true` if the flag changed.
    pub(crate) fn set_use_mipmaps(&mut self, use_mipmaps: bool) -> bool {
        let changed = self.use_mipmaps != use_mipmaps;
        self.use_mipmaps = use_mipmaps;
        changed
    }
}
