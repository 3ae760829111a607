use super::{BlendFunc, Comparison, FaceFilling, FaceSide, RendererParameter, StencilOp};

/// Stencil configuration of one face.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StencilFace {
    pub compare: Comparison,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
    pub mask: u32,
    pub reference: u32,
}

impl Default for StencilFace {
    fn default() -> Self {
        Self {
            compare: Comparison::Always,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
            mask: 0xFFFF_FFFF,
            reference: 0,
        }
    }
}

/// Full fixed-function state applied before each draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStates {
    parameters: [bool; RendererParameter::COUNT],

    pub src_blend: BlendFunc,
    pub dst_blend: BlendFunc,
    pub depth_func: Comparison,
    pub face_culling: FaceSide,
    pub face_filling: FaceFilling,

    pub front_face: StencilFace,
    pub back_face: StencilFace,

    pub line_width: f32,
    pub point_size: f32,

    pub clear_color: [f32; 4],
    pub clear_depth: f64,
    pub clear_stencil: u32,
}

impl Default for RenderStates {
    fn default() -> Self {
        let mut parameters = [false; RendererParameter::COUNT];
        parameters[RendererParameter::ColorWrite.index()] = true;
        parameters[RendererParameter::DepthWrite.index()] = true;

        Self {
            parameters,
            src_blend: BlendFunc::One,
            dst_blend: BlendFunc::Zero,
            depth_func: Comparison::Less,
            face_culling: FaceSide::Back,
            face_filling: FaceFilling::Fill,
            front_face: StencilFace::default(),
            back_face: StencilFace::default(),
            line_width: 1.0,
            point_size: 1.0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

impl RenderStates {
    #[inline]
    pub fn parameter(&self, p: RendererParameter) -> bool {
        self.parameters[p.index()]
    }

    #[inline]
    pub fn set_parameter(&mut self, p: RendererParameter, enable: bool) {
        self.parameters[p.index()] = enable;
    }

    /// Applies `f` to every stencil face selected by `side`.
    pub fn for_faces(&mut self, side: FaceSide, mut f: impl FnMut(&mut StencilFace)) {
        if matches!(side, FaceSide::Front | FaceSide::FrontAndBack) {
            f(&mut self.front_face);
        }
        if matches!(side, FaceSide::Back | FaceSide::FrontAndBack) {
            f(&mut self.back_face);
        }
    }
}
