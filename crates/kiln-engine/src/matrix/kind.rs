use crate::resource::ShaderUniform;

/// Matrix slot names.
///
/// The three base slots are set by callers; the nine others are derived on read.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MatrixType {
    Projection,
    View,
    World,

    ViewProj,
    WorldView,
    WorldViewProj,

    InvProjection,
    InvView,
    InvViewProj,
    InvWorld,
    InvWorldView,
    InvWorldViewProj,
}

/// How a slot obtains its value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Derivation {
    Base,
    /// `lhs · rhs`
    Concatenate(MatrixType, MatrixType),
    /// `lhs · rhs`, both treated as affine.
    ConcatenateAffine(MatrixType, MatrixType),
    Inverse(MatrixType),
}

use MatrixType::*;

/// Slots invalidated by a write to the indexed slot.
///
/// View also invalidates World. Nothing derives World from View; the edge is
/// kept so that code observing World's `updated` flag sees the same behavior as
/// before.
static DEPENDENTS: [&[MatrixType]; MatrixType::COUNT] = [
    // Projection
    &[InvProjection, InvViewProj, InvWorldViewProj, ViewProj, WorldViewProj],
    // View
    &[InvView, InvViewProj, InvWorld, InvWorldViewProj, ViewProj, World, WorldViewProj],
    // World
    &[InvWorld, InvWorldView, InvWorldViewProj, WorldView, WorldViewProj],
    // ViewProj
    &[InvViewProj],
    // WorldView
    &[InvWorldView, WorldViewProj],
    // WorldViewProj
    &[InvWorldViewProj],
    // inverses
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
];

impl MatrixType {
    pub const COUNT: usize = 12;

    pub const ALL: [Self; Self::COUNT] = [
        Projection,
        View,
        World,
        ViewProj,
        WorldView,
        WorldViewProj,
        InvProjection,
        InvView,
        InvViewProj,
        InvWorld,
        InvWorldView,
        InvWorldViewProj,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_base(self) -> bool {
        matches!(self, Projection | View | World)
    }

    /// Slots whose cached value is stale once this one changes.
    #[inline]
    pub fn dependents(self) -> &'static [MatrixType] {
        DEPENDENTS[self.index()]
    }

    pub const fn derivation(self) -> Derivation {
        match self {
            Projection | View | World => Derivation::Base,

            ViewProj => Derivation::Concatenate(View, Projection),
            WorldView => Derivation::ConcatenateAffine(World, View),
            WorldViewProj => Derivation::Concatenate(WorldView, Projection),

            InvProjection => Derivation::Inverse(Projection),
            InvView => Derivation::Inverse(View),
            InvViewProj => Derivation::Inverse(ViewProj),
            InvWorld => Derivation::Inverse(World),
            InvWorldView => Derivation::Inverse(WorldView),
            InvWorldViewProj => Derivation::Inverse(WorldViewProj),
        }
    }

    /// Shader uniform fed from this slot.
    pub const fn uniform(self) -> ShaderUniform {
        match self {
            Projection => ShaderUniform::ProjMatrix,
            View => ShaderUniform::ViewMatrix,
            World => ShaderUniform::WorldMatrix,
            ViewProj => ShaderUniform::ViewProjMatrix,
            WorldView => ShaderUniform::WorldViewMatrix,
            WorldViewProj => ShaderUniform::WorldViewProjMatrix,
            InvProjection => ShaderUniform::InvProjMatrix,
            InvView => ShaderUniform::InvViewMatrix,
            InvViewProj => ShaderUniform::InvViewProjMatrix,
            InvWorld => ShaderUniform::InvWorldMatrix,
            InvWorldView => ShaderUniform::InvWorldViewMatrix,
            InvWorldViewProj => ShaderUniform::InvWorldViewProjMatrix,
        }
    }
}
