//! Seam between the render-state cache and a concrete graphics API.
//!
//! The cache never talks to a driver directly. Everything it issues goes
//! through [`Backend`], which keeps the cache logic testable against
//! [`RecordingBackend`].

mod recording;

pub use recording::{BackendCall, RecordingBackend};

use glam::{Mat4, Vec2};

use crate::device::{Capabilities, Limits};
use crate::resource::{ComponentType, ContextId, IndexFormat, RenderTarget, ShaderUniform, Texture};
use crate::states::{ClearBuffers, PrimitiveMode, QueryCondition, Rect, RenderStates};
use crate::texture::SamplerConfig;

/// Backend buffer name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferHandle(pub u32);

/// Backend vertex-array object name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Backend texture name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(pub u32);

/// Backend program name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub u32);

/// Backend occlusion-query name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct QueryHandle(pub u32);

/// Location of a uniform inside a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub i32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

/// How one vertex attribute reads the currently bound vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttributeBinding {
    pub ty: ComponentType,
    /// Byte offset of the first element, buffer start offset included.
    pub offset: u64,
    pub stride: u32,
    /// Advance once per instance instead of once per vertex.
    pub per_instance: bool,
}

/// Graphics API operations the render-state cache depends on.
///
/// Calls are assumed to target the context reported by
/// [`Backend::current_context`]. Methods returning `bool` or `Option` report
/// backend-side failures; the cache turns those into errors.
pub trait Backend {
    fn capabilities(&self) -> Capabilities;
    fn limits(&self) -> Limits;

    /// The backend context current on this thread, if any.
    fn current_context(&self) -> Option<ContextId>;

    // ── buffers ──

    fn create_buffer(&mut self, kind: BufferKind, size: u64, usage: BufferUsage) -> Option<BufferHandle>;
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> bool;
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    // ── targets ──

    fn activate_target(&mut self, target: &RenderTarget) -> bool;
    fn deactivate_target(&mut self);
    /// Resolves pending target work (multisample resolve, mip regeneration).
    fn ensure_target_updated(&mut self, target: &RenderTarget);

    // ── programs ──

    fn bind_program(&mut self, program: ProgramHandle);
    /// Location of `uniform` in `program`, looked up by [`ShaderUniform::name`].
    fn uniform_location(&self, program: ProgramHandle, uniform: ShaderUniform) -> Option<UniformLocation>;
    fn send_matrix(&mut self, location: UniformLocation, matrix: &Mat4);
    fn send_vec2(&mut self, location: UniformLocation, value: Vec2);

    // ── vertex arrays ──

    fn create_vertex_array(&mut self) -> Option<VertexArrayHandle>;
    fn bind_vertex_array(&mut self, vao: Option<VertexArrayHandle>);
    /// Deletes `vao`. Only called while `context` is current.
    fn delete_vertex_array(&mut self, context: ContextId, vao: VertexArrayHandle);

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle);
    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>);
    fn enable_attribute(&mut self, index: u32, binding: &AttributeBinding);
    fn disable_attribute(&mut self, index: u32);

    // ── textures ──

    fn bind_texture(&mut self, unit: u32, texture: &Texture);
    /// Sampler-object path: applies `config` to the unit's sampler.
    fn bind_sampler(&mut self, unit: u32, config: &SamplerConfig);
    /// Fallback path: applies `config` directly to `texture`.
    fn apply_sampler(&mut self, unit: u32, config: &SamplerConfig, texture: &Texture);

    // ── fixed function ──

    fn apply_states(&mut self, states: &RenderStates);
    fn clear(&mut self, buffers: ClearBuffers, states: &RenderStates);
    fn set_viewport(&mut self, rect: Rect);
    fn set_scissor(&mut self, rect: Rect);

    // ── draws ──

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32);
    fn draw_arrays_instanced(&mut self, mode: PrimitiveMode, first: u32, count: u32, instances: u32);
    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, format: IndexFormat, byte_offset: u64);
    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instances: u32,
    );

    fn begin_condition(&mut self, query: QueryHandle, condition: QueryCondition);
    fn end_condition(&mut self);
    fn flush(&mut self);
}
