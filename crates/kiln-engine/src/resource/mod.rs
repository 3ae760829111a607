//! Resource descriptors consumed by the render-state cache.
//!
//! These types describe externally owned GPU objects. They carry the backend
//! handle plus the accessors the cache needs (stride, component layout, mipmap
//! presence, hardware backing). Creation and upload belong to the caller; wrap
//! each descriptor with [`LifecycleBroker::track`](crate::lifecycle::LifecycleBroker::track)
//! so releases reach the caches.

mod buffer;
mod layout;
mod shader;
mod target;
mod texture;

pub use buffer::{DataStorage, IndexBuffer, IndexFormat, VertexBuffer};
pub use layout::{ComponentType, LayoutComponent, VertexComponent, VertexLayout};
pub use shader::{Shader, ShaderUniform};
pub use target::{ContextId, RenderContext, RenderTarget};
pub use texture::{Texture, TextureKind};
