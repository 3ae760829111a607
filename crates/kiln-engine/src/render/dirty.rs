use bitflags::bitflags;

bitflags! {
    /// Categories of state waiting for the next reconciliation pass.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct DirtyFlags: u8 {
        const MATRICES = 1 << 0;
        const SHADER = 1 << 1;
        const TEXTURES = 1 << 2;
        const VERTEX_ARRAY = 1 << 3;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self::empty()
    }
}
