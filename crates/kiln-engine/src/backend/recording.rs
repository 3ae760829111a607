use std::collections::HashMap;

use glam::{Mat4, Vec2};

use crate::device::{Capabilities, Limits};
use crate::resource::{ContextId, IndexFormat, RenderTarget, ShaderUniform, Texture};
use crate::states::{ClearBuffers, PrimitiveMode, QueryCondition, Rect, RenderStates};
use crate::texture::SamplerConfig;

use super::{
    AttributeBinding, Backend, BufferHandle, BufferKind, BufferUsage, ProgramHandle, QueryHandle,
    TextureHandle, UniformLocation, VertexArrayHandle,
};

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer { buffer: BufferHandle, kind: BufferKind, size: u64 },
    WriteBuffer { buffer: BufferHandle, offset: u64, len: usize },
    DestroyBuffer(BufferHandle),

    ActivateTarget { size: (u32, u32) },
    DeactivateTarget,
    EnsureTargetUpdated,

    BindProgram(ProgramHandle),
    SendMatrix { location: UniformLocation, matrix: Mat4 },
    SendVec2 { location: UniformLocation, value: Vec2 },

    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    DeleteVertexArray { context: ContextId, vao: VertexArrayHandle },
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(Option<BufferHandle>),
    EnableAttribute { index: u32, binding: AttributeBinding },
    DisableAttribute(u32),

    BindTexture { unit: u32, texture: TextureHandle },
    BindSampler { unit: u32, config: SamplerConfig },
    ApplySampler { unit: u32, config: SamplerConfig, texture: TextureHandle },

    ApplyStates,
    Clear(ClearBuffers),
    SetViewport(Rect),
    SetScissor(Rect),

    DrawArrays { mode: PrimitiveMode, first: u32, count: u32, instances: Option<u32> },
    DrawElements { mode: PrimitiveMode, count: u32, format: IndexFormat, byte_offset: u64, instances: Option<u32> },

    BeginCondition { query: QueryHandle, condition: QueryCondition },
    EndCondition,
    Flush,
}

/// Backend that records every call instead of driving a GPU.
///
/// Used by the test suite and by headless tools. Capabilities, limits, exposed
/// uniforms and allocation failures are all configurable.
#[derive(Debug)]
pub struct RecordingBackend {
    capabilities: Capabilities,
    limits: Limits,
    context: Option<ContextId>,

    // Active uniforms by name, as a linked program reports them.
    uniforms: HashMap<(ProgramHandle, &'static str), UniformLocation>,
    next_name: u32,

    fail_buffers: Option<BufferUsage>,
    fail_vertex_arrays: bool,
    fail_targets: bool,

    calls: Vec<BackendCall>,
    last_states: Option<RenderStates>,
}

impl RecordingBackend {
    pub fn new(capabilities: Capabilities, limits: Limits) -> Self {
        Self {
            capabilities,
            limits,
            context: None,
            uniforms: HashMap::new(),
            next_name: 1,
            fail_buffers: None,
            fail_vertex_arrays: false,
            fail_targets: false,
            calls: Vec::new(),
            last_states: None,
        }
    }

    /// Full capability set with default limits.
    pub fn full() -> Self {
        Self::new(Capabilities::all(), Limits::default())
    }

    pub fn set_current_context(&mut self, context: Option<ContextId>) {
        self.context = context;
    }

    /// Makes `program` report `location` for `uniform`.
    pub fn expose_uniform(&mut self, program: ProgramHandle, uniform: ShaderUniform, location: i32) {
        self.uniforms
            .insert((program, uniform.name()), UniformLocation(location));
    }

    /// Makes creation of buffers with `usage` fail. `None` restores normal behavior.
    pub fn fail_buffer_creation(&mut self, usage: Option<BufferUsage>) {
        self.fail_buffers = usage;
    }

    pub fn fail_vertex_array_creation(&mut self, fail: bool) {
        self.fail_vertex_arrays = fail;
    }

    pub fn fail_target_activation(&mut self, fail: bool) {
        self.fail_targets = fail;
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drains the log.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// States received by the latest `apply_states` call.
    pub fn last_states(&self) -> Option<&RenderStates> {
        self.last_states.as_ref()
    }

    fn next_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn record(&mut self, call: BackendCall) {
        log::trace!("backend: {call:?}");
        self.calls.push(call);
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::full()
    }
}

impl Backend for RecordingBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn limits(&self) -> Limits {
        self.limits
    }

    fn current_context(&self) -> Option<ContextId> {
        self.context
    }

    fn create_buffer(&mut self, kind: BufferKind, size: u64, usage: BufferUsage) -> Option<BufferHandle> {
        if self.fail_buffers == Some(usage) {
            return None;
        }
        let buffer = BufferHandle(self.next_name());
        self.record(BackendCall::CreateBuffer { buffer, kind, size });
        Some(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> bool {
        self.record(BackendCall::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        true
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCall::DestroyBuffer(buffer));
    }

    fn activate_target(&mut self, target: &RenderTarget) -> bool {
        if self.fail_targets {
            return false;
        }
        self.record(BackendCall::ActivateTarget {
            size: target.size(),
        });
        true
    }

    fn deactivate_target(&mut self) {
        self.record(BackendCall::DeactivateTarget);
    }

    fn ensure_target_updated(&mut self, _target: &RenderTarget) {
        self.record(BackendCall::EnsureTargetUpdated);
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        self.record(BackendCall::BindProgram(program));
    }

    fn uniform_location(&self, program: ProgramHandle, uniform: ShaderUniform) -> Option<UniformLocation> {
        self.uniforms.get(&(program, uniform.name())).copied()
    }

    fn send_matrix(&mut self, location: UniformLocation, matrix: &Mat4) {
        self.record(BackendCall::SendMatrix {
            location,
            matrix: *matrix,
        });
    }

    fn send_vec2(&mut self, location: UniformLocation, value: Vec2) {
        self.record(BackendCall::SendVec2 { location, value });
    }

    fn create_vertex_array(&mut self) -> Option<VertexArrayHandle> {
        if self.fail_vertex_arrays {
            return None;
        }
        let vao = VertexArrayHandle(self.next_name());
        self.record(BackendCall::CreateVertexArray(vao));
        Some(vao)
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayHandle>) {
        self.record(BackendCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&mut self, context: ContextId, vao: VertexArrayHandle) {
        if self.context != Some(context) {
            log::error!("vertex array {vao:?} of context {context} deleted while another context is current");
        }
        self.record(BackendCall::DeleteVertexArray { context, vao });
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCall::BindVertexBuffer(buffer));
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.record(BackendCall::BindIndexBuffer(buffer));
    }

    fn enable_attribute(&mut self, index: u32, binding: &AttributeBinding) {
        self.record(BackendCall::EnableAttribute {
            index,
            binding: *binding,
        });
    }

    fn disable_attribute(&mut self, index: u32) {
        self.record(BackendCall::DisableAttribute(index));
    }

    fn bind_texture(&mut self, unit: u32, texture: &Texture) {
        self.record(BackendCall::BindTexture {
            unit,
            texture: texture.handle(),
        });
    }

    fn bind_sampler(&mut self, unit: u32, config: &SamplerConfig) {
        self.record(BackendCall::BindSampler {
            unit,
            config: *config,
        });
    }

    fn apply_sampler(&mut self, unit: u32, config: &SamplerConfig, texture: &Texture) {
        self.record(BackendCall::ApplySampler {
            unit,
            config: *config,
            texture: texture.handle(),
        });
    }

    fn apply_states(&mut self, states: &RenderStates) {
        self.last_states = Some(states.clone());
        self.record(BackendCall::ApplyStates);
    }

    fn clear(&mut self, buffers: ClearBuffers, _states: &RenderStates) {
        self.record(BackendCall::Clear(buffers));
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.record(BackendCall::SetViewport(rect));
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.record(BackendCall::SetScissor(rect));
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) {
        self.record(BackendCall::DrawArrays {
            mode,
            first,
            count,
            instances: None,
        });
    }

    fn draw_arrays_instanced(&mut self, mode: PrimitiveMode, first: u32, count: u32, instances: u32) {
        self.record(BackendCall::DrawArrays {
            mode,
            first,
            count,
            instances: Some(instances),
        });
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, format: IndexFormat, byte_offset: u64) {
        self.record(BackendCall::DrawElements {
            mode,
            count,
            format,
            byte_offset,
            instances: None,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instances: u32,
    ) {
        self.record(BackendCall::DrawElements {
            mode,
            count,
            format,
            byte_offset,
            instances: Some(instances),
        });
    }

    fn begin_condition(&mut self, query: QueryHandle, condition: QueryCondition) {
        self.record(BackendCall::BeginCondition { query, condition });
    }

    fn end_condition(&mut self) {
        self.record(BackendCall::EndCondition);
    }

    fn flush(&mut self) {
        self.record(BackendCall::Flush);
    }
}
