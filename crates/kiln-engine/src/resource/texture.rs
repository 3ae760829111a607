use crate::backend::TextureHandle;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum TextureKind {
    D1,
    #[default]
    D2,
    D3,
    Cubemap,
    D1Array,
    D2Array,
}

#[derive(Debug, Clone)]
pub struct Texture {
    handle: TextureHandle,
    kind: TextureKind,
    mipmaps: bool,
}

impl Texture {
    pub fn new(handle: TextureHandle, kind: TextureKind) -> Self {
        Self {
            handle,
            kind,
            mipmaps: false,
        }
    }

    pub fn with_mipmaps(mut self, mipmaps: bool) -> Self {
        self.mipmaps = mipmaps;
        self
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    #[inline]
    pub fn has_mipmaps(&self) -> bool {
        self.mipmaps
    }
}
