use bitflags::bitflags;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFunc {
    DestAlpha,
    DestColor,
    SrcAlpha,
    SrcColor,
    InvDestAlpha,
    InvDestColor,
    InvSrcAlpha,
    InvSrcColor,
    One,
    Zero,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparison {
    Always,
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Never,
    NotEqual,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FaceSide {
    Back,
    Front,
    FrontAndBack,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FaceFilling {
    Fill,
    Line,
    Point,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Decrement,
    DecrementNoClamp,
    Increment,
    IncrementNoClamp,
    Invert,
    Keep,
    Replace,
    Zero,
}

/// Boolean toggles of the fixed-function pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RendererParameter {
    Blend,
    ColorWrite,
    DepthBuffer,
    DepthWrite,
    FaceCulling,
    ScissorTest,
    StencilTest,
}

impl RendererParameter {
    pub const COUNT: usize = 7;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Blend,
        Self::ColorWrite,
        Self::DepthBuffer,
        Self::DepthWrite,
        Self::FaceCulling,
        Self::ScissorTest,
        Self::StencilTest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveMode {
    LineList,
    LineStrip,
    PointList,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// How a conditional-rendering block treats a pending query result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum QueryCondition {
    NoWait,
    RegionNoWait,
    RegionWait,
    Wait,
}

/// Integer rectangle in target pixels, origin top-left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

bitflags! {
    /// Set of framebuffer planes to clear.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ClearBuffers: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}
