use crate::backend::ProgramHandle;

/// Uniforms the render-state cache feeds automatically.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderUniform {
    ProjMatrix,
    ViewMatrix,
    WorldMatrix,
    ViewProjMatrix,
    WorldViewMatrix,
    WorldViewProjMatrix,
    InvProjMatrix,
    InvViewMatrix,
    InvViewProjMatrix,
    InvWorldMatrix,
    InvWorldViewMatrix,
    InvWorldViewProjMatrix,
    TargetSize,
    InvTargetSize,
}

impl ShaderUniform {
    /// Conventional GLSL identifier.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProjMatrix => "ProjMatrix",
            Self::ViewMatrix => "ViewMatrix",
            Self::WorldMatrix => "WorldMatrix",
            Self::ViewProjMatrix => "ViewProjMatrix",
            Self::WorldViewMatrix => "WorldViewMatrix",
            Self::WorldViewProjMatrix => "WorldViewProjMatrix",
            Self::InvProjMatrix => "InvProjMatrix",
            Self::InvViewMatrix => "InvViewMatrix",
            Self::InvViewProjMatrix => "InvViewProjMatrix",
            Self::InvWorldMatrix => "InvWorldMatrix",
            Self::InvWorldViewMatrix => "InvWorldViewMatrix",
            Self::InvWorldViewProjMatrix => "InvWorldViewProjMatrix",
            Self::TargetSize => "TargetSize",
            Self::InvTargetSize => "InvTargetSize",
        }
    }
}

/// A compiled and linked shader program.
#[derive(Debug, Clone)]
pub struct Shader {
    program: ProgramHandle,
    linked: bool,
}

impl Shader {
    pub fn new(program: ProgramHandle) -> Self {
        Self {
            program,
            linked: true,
        }
    }

    /// A program whose link step failed or has not run yet. It can not be bound.
    pub fn unlinked(program: ProgramHandle) -> Self {
        Self {
            program,
            linked: false,
        }
    }

    #[inline]
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}
