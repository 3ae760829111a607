use thiserror::Error;

use crate::lifecycle::ResourceId;
use crate::resource::{ComponentType, VertexComponent};

use super::Capability;

/// Broad class of a [`RenderError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Caller-side misuse: missing binding, out-of-range value, invalid resource.
    Precondition,
    /// The backend lacks a required feature.
    Capability,
    /// A backend object or buffer could not be created.
    Construction,
}

/// Failure of a state-setting or draw operation.
///
/// The operation that reports it has been aborted; anything already issued to
/// the backend is left as is and overwritten by the next successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no active context")]
    NoActiveContext,

    #[error("no shader")]
    NoShader,

    #[error("no target")]
    NoTarget,

    #[error("no vertex buffer")]
    NoVertexBuffer,

    #[error("no index buffer")]
    NoIndexBuffer,

    #[error("texture unit out of range ({unit} >= {max})")]
    TextureUnitOutOfRange { unit: u32, max: u32 },

    #[error("invalid shader {0}: program is not linked")]
    ShaderNotLinked(ResourceId),

    #[error("buffer {0} must be hardware")]
    SoftwareBuffer(ResourceId),

    #[error("target {0} is not renderable")]
    TargetNotRenderable(ResourceId),

    #[error("failed to activate target {0}")]
    TargetActivation(ResourceId),

    #[error("{0} must be over zero")]
    NonPositive(&'static str),

    #[error("{0} not supported")]
    Unsupported(Capability),

    #[error(
        "invalid vertex layout {layout}: vertex component {component:?} (type {ty:?}) is not supported"
    )]
    UnsupportedComponent {
        layout: ResourceId,
        component: VertexComponent,
        ty: ComponentType,
    },

    #[error("instance count must be over zero")]
    ZeroInstances,

    #[error("instance count is over maximum instance count ({requested} > {max})")]
    TooManyInstances { requested: u32, max: u32 },

    #[error("instance data ({size} bytes) exceeds instance buffer size ({capacity} bytes)")]
    InstanceDataOverflow { size: u64, capacity: u64 },

    #[error("failed to allocate {0}")]
    BufferAllocation(&'static str),

    #[error("failed to create vertex array object")]
    VertexArrayCreation,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported(_) | Self::UnsupportedComponent { .. } => ErrorKind::Capability,
            Self::BufferAllocation(_) | Self::VertexArrayCreation => ErrorKind::Construction,
            _ => ErrorKind::Precondition,
        }
    }
}
