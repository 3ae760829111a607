use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::backend::{Backend, BufferHandle, BufferKind, BufferUsage, ProgramHandle, QueryHandle, UniformLocation, VertexArrayHandle};
use crate::device::{Capabilities, Capability, Limits, RenderError, RendererConfig};
use crate::lifecycle::{Handle, LifecycleBroker};
use crate::matrix::{MatrixCache, MatrixType};
use crate::resource::{
    ComponentType, ContextId, IndexBuffer, RenderTarget, Shader, ShaderUniform, Texture,
    VertexBuffer, VertexLayout,
};
use crate::states::{
    BlendFunc, ClearBuffers, Comparison, FaceFilling, FaceSide, PrimitiveMode, QueryCondition,
    Rect, RenderStates, RendererParameter, StencilOp,
};
use crate::texture::{SamplerConfig, TextureUnitTable};
use crate::vao::{specify_attributes, VaoCacheStats, VaoKey, VertexArrayCache, VertexSource};

use super::bindings::{bound_get, bound_id, rebind, Bindings};
use super::DirtyFlags;

// ── fullscreen quad ───────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2], // clip space
}

// Triangle strip order.
const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0] },
    QuadVertex { pos: [1.0, -1.0] },
    QuadVertex { pos: [-1.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0] },
];

fn fail<T>(err: RenderError) -> Result<T, RenderError> {
    log::error!("{err}");
    Err(err)
}

/// Render-state tracker in front of one backend.
///
/// Owns the matrix cache, the texture unit table and the vertex-array cache,
/// and remembers every bound resource by reference. Any number of devices can
/// live side by side; each has its own state.
pub struct RenderDevice<B: Backend> {
    backend: B,
    config: RendererConfig,
    broker: LifecycleBroker,

    capabilities: Capabilities,
    limits: Limits,
    use_sampler_objects: bool,
    use_vertex_arrays: bool,

    bindings: Rc<RefCell<Bindings>>,
    matrices: MatrixCache,
    textures: Rc<RefCell<TextureUnitTable>>,
    vaos: Rc<RefCell<VertexArrayCache>>,
    states: RenderStates,

    instancing: bool,
    instance_buffer: Option<BufferHandle>,
    quad_buffer: Option<BufferHandle>,
    quad: Handle<VertexBuffer>,

    bound_program: Option<(ContextId, ProgramHandle)>,
    current_vao: Option<(ContextId, VertexArrayHandle)>,
    size_locations: [Option<UniformLocation>; 2],
    target_size: (u32, u32),
    viewport: Rect,
    scissor: Rect,
}

impl<B: Backend> RenderDevice<B> {
    /// Creates a device with its own lifecycle broker.
    pub fn new(backend: B, config: RendererConfig) -> Result<Self, RenderError> {
        Self::with_broker(backend, config, LifecycleBroker::new())
    }

    /// Creates a device whose caches listen to `broker`.
    ///
    /// Resources must be tracked by the same broker for their release to reach
    /// the device.
    pub fn with_broker(
        mut backend: B,
        config: RendererConfig,
        broker: LifecycleBroker,
    ) -> Result<Self, RenderError> {
        let mut capabilities = backend.capabilities();
        let limits = backend.limits();

        let unit_count = config.texture_units.unwrap_or(if capabilities.has(Capability::TextureMulti) {
            limits.max_texture_units
        } else {
            1
        });

        let quad_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let Some(quad_buffer) = backend.create_buffer(BufferKind::Vertex, quad_bytes.len() as u64, BufferUsage::Static) else {
            return fail(RenderError::BufferAllocation("fullscreen quad buffer"));
        };
        if !backend.write_buffer(quad_buffer, 0, quad_bytes) {
            backend.destroy_buffer(quad_buffer);
            return fail(RenderError::BufferAllocation("fullscreen quad buffer"));
        }
        let quad_layout = broker.track(VertexLayout::xy());
        let quad = broker.track(VertexBuffer::new(quad_buffer, quad_layout, QUAD_VERTICES.len() as u32));

        let mut instance_buffer = None;
        if capabilities.has(Capability::Instancing) {
            instance_buffer = backend.create_buffer(BufferKind::Vertex, config.instance_buffer_size, BufferUsage::Dynamic);
            if instance_buffer.is_none() {
                log::error!("{}", RenderError::BufferAllocation("instance buffer"));
                log::warn!("instancing disabled");
                capabilities.remove(Capabilities::INSTANCING);
            }
        }

        let use_vertex_arrays = capabilities.has(Capability::VertexArrayObjects);
        let use_sampler_objects = capabilities.has(Capability::SamplerObjects);

        log::info!(
            "render device ready: {unit_count} texture unit(s), vertex arrays {}, sampler objects {}, instancing {}",
            on_off(use_vertex_arrays),
            on_off(use_sampler_objects),
            on_off(capabilities.has(Capability::Instancing)),
        );

        Ok(Self {
            bindings: Bindings::shared(
                broker.clone(),
                DirtyFlags::MATRICES | DirtyFlags::SHADER | DirtyFlags::VERTEX_ARRAY,
            ),
            textures: TextureUnitTable::shared(unit_count, broker.clone()),
            vaos: VertexArrayCache::shared(broker.clone(), use_vertex_arrays),
            matrices: MatrixCache::new(),
            states: RenderStates::default(),

            backend,
            config,
            broker,
            capabilities,
            limits,
            use_sampler_objects,
            use_vertex_arrays,

            instancing: false,
            instance_buffer,
            quad_buffer: Some(quad_buffer),
            quad,

            bound_program: None,
            current_vao: None,
            size_locations: [None; 2],
            target_size: (0, 0),
            viewport: Rect::default(),
            scissor: Rect::default(),
        })
    }

    // ── accessors ──────────────────────────────────────────────────────────

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Broker the device's caches listen to.
    #[inline]
    pub fn broker(&self) -> &LifecycleBroker {
        &self.broker
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.has(cap)
    }

    #[inline]
    pub fn is_component_type_supported(&self, ty: ComponentType) -> bool {
        self.capabilities.is_component_type_supported(ty)
    }

    #[inline]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn texture_unit_count(&self) -> u32 {
        self.textures.borrow().unit_count()
    }

    pub fn shader(&self) -> Option<Handle<Shader>> {
        bound_get(&self.bindings.borrow().shader)
    }

    pub fn target(&self) -> Option<Handle<RenderTarget>> {
        bound_get(&self.bindings.borrow().target)
    }

    pub fn texture(&self, unit: u32) -> Option<Handle<Texture>> {
        self.textures.borrow().texture(unit)
    }

    /// Categories that the next draw will reconcile.
    pub fn dirty(&self) -> DirtyFlags {
        self.bindings.borrow().dirty
    }

    #[inline]
    pub fn render_states(&self) -> &RenderStates {
        &self.states
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    #[inline]
    pub fn scissor_rect(&self) -> Rect {
        self.scissor
    }

    #[inline]
    pub fn matrices(&self) -> &MatrixCache {
        &self.matrices
    }

    pub fn vao_stats(&self) -> VaoCacheStats {
        self.vaos.borrow().stats()
    }

    /// Vertex arrays cached across every context.
    pub fn vertex_array_count(&self) -> usize {
        self.vaos.borrow().len()
    }

    /// Largest instance count an instanced draw accepts with the current
    /// instancing layout.
    pub fn max_instance_count(&self) -> u32 {
        if self.instance_buffer.is_none() {
            return 0;
        }
        let Some(layout) = bound_get(&self.bindings.borrow().instancing_layout) else {
            return 0;
        };
        match layout.stride() {
            0 => 0,
            stride => u32::try_from(self.config.instance_buffer_size / u64::from(stride)).unwrap_or(u32::MAX),
        }
    }

    // ── resource bindings ──────────────────────────────────────────────────

    pub fn set_shader(&mut self, shader: Option<&Handle<Shader>>) -> Result<(), RenderError> {
        if self.config.validate {
            if let Some(shader) = shader.filter(|s| !s.is_linked()) {
                return fail(RenderError::ShaderNotLinked(shader.id()));
            }
        }

        let mut guard = self.bindings.borrow_mut();
        let bindings = &mut *guard;
        if rebind(&bindings.broker, &bindings.listener, &mut bindings.shader, shader) {
            bindings.dirty |= DirtyFlags::SHADER;
        }
        Ok(())
    }

    /// Makes `target` the destination of draws, deactivating the previous one.
    pub fn set_target(&mut self, target: Option<&Handle<RenderTarget>>) -> Result<(), RenderError> {
        let mut guard = self.bindings.borrow_mut();
        let bindings = &mut *guard;
        if bound_id(&bindings.target) == target.map(|t| t.id()) {
            return Ok(());
        }

        if bindings.target.is_some() {
            self.backend.deactivate_target();
            rebind(&bindings.broker, &bindings.listener, &mut bindings.target, None);
        }

        if let Some(target) = target {
            if self.config.validate && !target.is_renderable() {
                return fail(RenderError::TargetNotRenderable(target.id()));
            }
            if !self.backend.activate_target(target) {
                return fail(RenderError::TargetActivation(target.id()));
            }
            rebind(&bindings.broker, &bindings.listener, &mut bindings.target, Some(target));
        }
        Ok(())
    }

    pub fn set_index_buffer(&mut self, index_buffer: Option<&Handle<IndexBuffer>>) -> Result<(), RenderError> {
        if self.config.validate {
            if let Some(ib) = index_buffer.filter(|ib| !ib.is_hardware()) {
                return fail(RenderError::SoftwareBuffer(ib.id()));
            }
        }

        let mut guard = self.bindings.borrow_mut();
        let bindings = &mut *guard;
        if rebind(&bindings.broker, &bindings.listener, &mut bindings.index_buffer, index_buffer) {
            bindings.dirty |= DirtyFlags::VERTEX_ARRAY;
        }
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, vertex_buffer: &Handle<VertexBuffer>) -> Result<(), RenderError> {
        if self.config.validate && !vertex_buffer.is_hardware() {
            return fail(RenderError::SoftwareBuffer(vertex_buffer.id()));
        }

        let mut guard = self.bindings.borrow_mut();
        let bindings = &mut *guard;
        if rebind(&bindings.broker, &bindings.listener, &mut bindings.vertex_buffer, Some(vertex_buffer)) {
            bindings.dirty |= DirtyFlags::VERTEX_ARRAY;
        }
        Ok(())
    }

    /// Sets the layout of the per-instance data.
    pub fn set_instancing_layout(&mut self, layout: Option<&Handle<VertexLayout>>) -> Result<(), RenderError> {
        self.require(Capability::Instancing)?;

        let mut guard = self.bindings.borrow_mut();
        let bindings = &mut *guard;
        if rebind(&bindings.broker, &bindings.listener, &mut bindings.instancing_layout, layout) {
            bindings.dirty |= DirtyFlags::VERTEX_ARRAY;
        }
        Ok(())
    }

    /// Uploads per-instance data to the start of the instance buffer.
    pub fn write_instance_data(&mut self, data: &[u8]) -> Result<(), RenderError> {
        self.require(Capability::Instancing)?;
        let Some(buffer) = self.instance_buffer else {
            return fail(RenderError::Unsupported(Capability::Instancing));
        };

        let size = data.len() as u64;
        if size > self.config.instance_buffer_size {
            return fail(RenderError::InstanceDataOverflow {
                size,
                capacity: self.config.instance_buffer_size,
            });
        }

        if !self.backend.write_buffer(buffer, 0, data) {
            return fail(RenderError::BufferAllocation("instance data"));
        }
        self.bindings.borrow_mut().dirty |= DirtyFlags::VERTEX_ARRAY;
        Ok(())
    }

    pub fn set_texture(&mut self, unit: u32, texture: Option<&Handle<Texture>>) -> Result<(), RenderError> {
        if self.textures.borrow_mut().bind(unit, texture)? {
            self.bindings.borrow_mut().dirty |= DirtyFlags::TEXTURES;
        }
        Ok(())
    }

    pub fn set_texture_sampler(&mut self, unit: u32, sampler: SamplerConfig) -> Result<(), RenderError> {
        self.textures.borrow_mut().set_sampler(unit, sampler)?;
        self.bindings.borrow_mut().dirty |= DirtyFlags::TEXTURES;
        Ok(())
    }

    // ── matrices ───────────────────────────────────────────────────────────

    /// Writes a base matrix. Derived slots are read-only and left alone.
    pub fn set_matrix(&mut self, ty: MatrixType, matrix: Mat4) {
        if self.matrices.set(ty, matrix) {
            self.bindings.borrow_mut().dirty |= DirtyFlags::MATRICES;
        }
    }

    /// Current value of `ty`. Derived slots are recomputed if stale.
    pub fn matrix(&mut self, ty: MatrixType) -> Mat4 {
        self.matrices.get(ty)
    }

    // ── flat state ─────────────────────────────────────────────────────────

    pub fn set_render_states(&mut self, states: RenderStates) {
        self.states = states;
    }

    pub fn enable(&mut self, parameter: RendererParameter, enable: bool) {
        self.states.set_parameter(parameter, enable);
    }

    pub fn is_enabled(&self, parameter: RendererParameter) -> bool {
        self.states.parameter(parameter)
    }

    pub fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc) {
        self.states.src_blend = src;
        self.states.dst_blend = dst;
    }

    pub fn set_depth_func(&mut self, compare: Comparison) {
        self.states.depth_func = compare;
    }

    pub fn set_face_culling(&mut self, side: FaceSide) {
        self.states.face_culling = side;
    }

    pub fn set_face_filling(&mut self, filling: FaceFilling) {
        self.states.face_filling = filling;
    }

    pub fn set_line_width(&mut self, width: f32) -> Result<(), RenderError> {
        if self.config.validate && !(width > 0.0) {
            return fail(RenderError::NonPositive("width"));
        }
        self.states.line_width = width;
        Ok(())
    }

    pub fn set_point_size(&mut self, size: f32) -> Result<(), RenderError> {
        if self.config.validate && !(size > 0.0) {
            return fail(RenderError::NonPositive("size"));
        }
        self.states.point_size = size;
        Ok(())
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.states.clear_color = color;
    }

    pub fn set_clear_depth(&mut self, depth: f64) {
        self.states.clear_depth = depth;
    }

    pub fn set_clear_stencil(&mut self, value: u32) {
        self.states.clear_stencil = value;
    }

    pub fn set_stencil_compare_function(&mut self, compare: Comparison, side: FaceSide) {
        self.states.for_faces(side, |f| f.compare = compare);
    }

    pub fn set_stencil_fail_operation(&mut self, op: StencilOp, side: FaceSide) {
        self.states.for_faces(side, |f| f.fail = op);
    }

    pub fn set_stencil_pass_operation(&mut self, op: StencilOp, side: FaceSide) {
        self.states.for_faces(side, |f| f.pass = op);
    }

    pub fn set_stencil_zfail_operation(&mut self, op: StencilOp, side: FaceSide) {
        self.states.for_faces(side, |f| f.depth_fail = op);
    }

    pub fn set_stencil_mask(&mut self, mask: u32, side: FaceSide) {
        self.states.for_faces(side, |f| f.mask = mask);
    }

    pub fn set_stencil_reference_value(&mut self, reference: u32, side: FaceSide) {
        self.states.for_faces(side, |f| f.reference = reference);
    }

    // ── pass-through ───────────────────────────────────────────────────────

    /// Clears the selected planes of the current target with the current clear values.
    pub fn clear(&mut self, buffers: ClearBuffers) -> Result<(), RenderError> {
        self.require_context()?;
        if buffers.is_empty() {
            return Ok(());
        }

        let Some(target) = self.target() else {
            return fail(RenderError::NoTarget);
        };
        self.backend.ensure_target_updated(&target);
        // Write masks and scissor affect the clear.
        self.backend.apply_states(&self.states);
        self.backend.clear(buffers, &self.states);
        Ok(())
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        self.viewport = rect;
        self.backend.set_viewport(rect);
    }

    pub fn set_scissor_rect(&mut self, rect: Rect) {
        self.scissor = rect;
        self.backend.set_scissor(rect);
    }

    pub fn flush(&mut self) -> Result<(), RenderError> {
        self.require_context()?;
        self.backend.flush();
        Ok(())
    }

    /// Starts a block of draws that only run if `query` passed.
    pub fn begin_condition(&mut self, query: QueryHandle, condition: QueryCondition) -> Result<(), RenderError> {
        self.require_context()?;
        self.require(Capability::ConditionalRendering)?;
        self.backend.begin_condition(query, condition);
        Ok(())
    }

    pub fn end_condition(&mut self) -> Result<(), RenderError> {
        self.require_context()?;
        self.require(Capability::ConditionalRendering)?;
        self.backend.end_condition();
        Ok(())
    }

    // ── draws ──────────────────────────────────────────────────────────────

    pub fn draw_primitives(&mut self, mode: PrimitiveMode, first_vertex: u32, vertex_count: u32) -> Result<(), RenderError> {
        self.require_context()?;
        self.enable_instancing(false);
        self.ensure_state_update()?;

        self.backend.draw_arrays(mode, first_vertex, vertex_count);
        self.finish_draw();
        Ok(())
    }

    pub fn draw_primitives_instanced(
        &mut self,
        instance_count: u32,
        mode: PrimitiveMode,
        first_vertex: u32,
        vertex_count: u32,
    ) -> Result<(), RenderError> {
        self.require_context()?;
        self.check_instances(instance_count)?;
        self.enable_instancing(true);
        self.ensure_state_update()?;

        self.backend.draw_arrays_instanced(mode, first_vertex, vertex_count, instance_count);
        self.finish_draw();
        Ok(())
    }

    pub fn draw_indexed_primitives(&mut self, mode: PrimitiveMode, first_index: u32, index_count: u32) -> Result<(), RenderError> {
        self.require_context()?;
        let index_buffer = self.require_index_buffer()?;
        self.enable_instancing(false);
        self.ensure_state_update()?;

        self.backend.draw_elements(
            mode,
            index_count,
            index_buffer.format(),
            index_buffer.byte_offset(first_index),
        );
        self.finish_draw();
        Ok(())
    }

    pub fn draw_indexed_primitives_instanced(
        &mut self,
        instance_count: u32,
        mode: PrimitiveMode,
        first_index: u32,
        index_count: u32,
    ) -> Result<(), RenderError> {
        self.require_context()?;
        let index_buffer = self.require_index_buffer()?;
        self.check_instances(instance_count)?;
        self.enable_instancing(true);
        self.ensure_state_update()?;

        self.backend.draw_elements_instanced(
            mode,
            index_count,
            index_buffer.format(),
            index_buffer.byte_offset(first_index),
            instance_count,
        );
        self.finish_draw();
        Ok(())
    }

    /// Draws a quad covering the whole target. Replaces the bound vertex and index buffers.
    pub fn draw_fullscreen_quad(&mut self) -> Result<(), RenderError> {
        self.require_context()?;
        self.enable_instancing(false);
        self.set_index_buffer(None)?;
        let quad = Rc::clone(&self.quad);
        self.set_vertex_buffer(&quad)?;
        self.ensure_state_update()?;

        self.backend.draw_arrays(PrimitiveMode::TriangleStrip, 0, QUAD_VERTICES.len() as u32);
        self.finish_draw();
        Ok(())
    }

    // ── reconciliation ─────────────────────────────────────────────────────

    /// Applies every pending state change in a fixed order.
    ///
    /// Categories not fully applied stay dirty. Backend calls already issued
    /// are not undone on failure.
    fn ensure_state_update(&mut self) -> Result<(), RenderError> {
        let Some(context) = self.backend.current_context() else {
            return fail(RenderError::NoActiveContext);
        };

        let (shader, target) = {
            let bindings = self.bindings.borrow();
            (bound_get(&bindings.shader), bound_get(&bindings.target))
        };
        let Some(shader) = shader else {
            return fail(RenderError::NoShader);
        };
        let Some(target) = target else {
            return fail(RenderError::NoTarget);
        };

        let mut dirty = self.bindings.borrow_mut().take_dirty();
        let result = self.reconcile(context, &shader, &target, &mut dirty);
        self.bindings.borrow_mut().dirty |= dirty;

        if let Err(err) = &result {
            log::error!("failed to update states: {err}");
        }
        result
    }

    fn reconcile(
        &mut self,
        context: ContextId,
        shader: &Shader,
        target: &RenderTarget,
        dirty: &mut DirtyFlags,
    ) -> Result<(), RenderError> {
        // 1. target
        self.backend.ensure_target_updated(target);

        // 2. program
        let program = shader.program();
        if self.bound_program != Some((context, program)) {
            self.backend.bind_program(program);
            self.bound_program = Some((context, program));
        }

        // 3. uniform locations
        if dirty.contains(DirtyFlags::SHADER) {
            let backend = &self.backend;
            self.matrices
                .bind_locations(|uniform| backend.uniform_location(program, uniform));
            self.size_locations = [
                backend.uniform_location(program, ShaderUniform::TargetSize),
                backend.uniform_location(program, ShaderUniform::InvTargetSize),
            ];

            self.target_size = (0, 0);
            dirty.insert(DirtyFlags::MATRICES);
            dirty.remove(DirtyFlags::SHADER);
        }

        // 4. target size
        let size = target.size();
        if self.target_size != size {
            let size_vec = Vec2::new(size.0 as f32, size.1 as f32);
            if let Some(location) = self.size_locations[1] {
                self.backend.send_vec2(location, size_vec.recip());
            }
            if let Some(location) = self.size_locations[0] {
                self.backend.send_vec2(location, size_vec);
            }
            self.target_size = size;
        }

        // 5. textures
        if dirty.contains(DirtyFlags::TEXTURES) {
            self.textures
                .borrow_mut()
                .flush(&mut self.backend, self.use_sampler_objects);
            dirty.remove(DirtyFlags::TEXTURES);
        }

        // 6. matrices
        if dirty.contains(DirtyFlags::MATRICES) {
            let backend = &mut self.backend;
            self.matrices
                .upload(|location, matrix| backend.send_matrix(location, matrix));
            dirty.remove(DirtyFlags::MATRICES);
        }

        // 7. vertex array
        self.vaos.borrow_mut().collect_garbage(&mut self.backend, context);

        let stale_vao = self.use_vertex_arrays
            && self.current_vao.is_none_or(|(owner, _)| owner != context);
        if dirty.contains(DirtyFlags::VERTEX_ARRAY) || stale_vao {
            self.current_vao = None;
            if let Some(handle) = self.resolve_vertex_array(context)? {
                self.current_vao = Some((context, handle));
            }
            // Without vertex arrays the attributes are specified on every draw.
            if self.use_vertex_arrays {
                dirty.remove(DirtyFlags::VERTEX_ARRAY);
            }
        }

        if self.use_vertex_arrays {
            let Some((_, handle)) = self.current_vao else {
                return fail(RenderError::VertexArrayCreation);
            };
            self.backend.bind_vertex_array(Some(handle));
        }

        // Texture bindings may have been disturbed since the last draw.
        self.textures.borrow().bind_all(&mut self.backend);

        // 8. flat state
        self.backend.apply_states(&self.states);

        Ok(())
    }

    fn resolve_vertex_array(&mut self, context: ContextId) -> Result<Option<VertexArrayHandle>, RenderError> {
        let (vertex_buffer, index_buffer, instancing_layout) = {
            let bindings = self.bindings.borrow();
            (
                bound_get(&bindings.vertex_buffer),
                bound_get(&bindings.index_buffer),
                bound_get(&bindings.instancing_layout),
            )
        };
        let Some(vertex_buffer) = vertex_buffer else {
            return fail(RenderError::NoVertexBuffer);
        };

        let instances = match (self.instancing, self.instance_buffer, instancing_layout.as_ref()) {
            (true, Some(buffer), Some(layout)) => Some(VertexSource {
                buffer,
                start_offset: 0,
                layout,
                layout_id: layout.id(),
            }),
            _ => None,
        };

        let key = VaoKey {
            index_buffer: index_buffer.as_ref().map(|ib| ib.id()),
            vertex_buffer: vertex_buffer.id(),
            vertex_layout: vertex_buffer.layout_id(),
            instancing_layout: instances.as_ref().map(|i| i.layout_id),
        };

        let vertices = VertexSource {
            buffer: vertex_buffer.buffer(),
            start_offset: vertex_buffer.start_offset(),
            layout: vertex_buffer.layout(),
            layout_id: vertex_buffer.layout_id(),
        };
        let caps = self.capabilities;
        let index = index_buffer.as_ref().map(|ib| ib.buffer());

        self.vaos
            .borrow_mut()
            .resolve(&mut self.backend, context, key, |backend| {
                specify_attributes(backend, &caps, &vertices, instances.as_ref(), index)
            })
    }

    fn finish_draw(&mut self) {
        if self.use_vertex_arrays {
            self.backend.bind_vertex_array(None);
        }
    }

    fn enable_instancing(&mut self, instancing: bool) {
        if self.instancing != instancing {
            self.instancing = instancing;
            self.bindings.borrow_mut().dirty |= DirtyFlags::VERTEX_ARRAY;
        }
    }

    // ── teardown ───────────────────────────────────────────────────────────

    /// Forgets every cached vertex array and destroys the device-owned buffers.
    ///
    /// Vertex arrays of the current context are deleted; those of other
    /// contexts are left to their context. Runs on drop; calling it earlier is
    /// allowed, after which the device must not draw again.
    pub fn shutdown(&mut self) {
        if self.quad_buffer.is_none() {
            return;
        }

        let current = self.backend.current_context();
        match self.vaos.try_borrow_mut() {
            Ok(mut vaos) => vaos.clear(&mut self.backend, current),
            Err(_) => log::error!("vertex-array cache borrowed during teardown"),
        }
        self.current_vao = None;

        if let Some(buffer) = self.quad_buffer.take() {
            self.backend.destroy_buffer(buffer);
        }
        if let Some(buffer) = self.instance_buffer.take() {
            self.backend.destroy_buffer(buffer);
        }

        log::debug!("render device shut down");
    }

    // ── checks ─────────────────────────────────────────────────────────────

    fn require_context(&self) -> Result<ContextId, RenderError> {
        match self.backend.current_context() {
            Some(context) => Ok(context),
            None => fail(RenderError::NoActiveContext),
        }
    }

    fn require(&self, cap: Capability) -> Result<(), RenderError> {
        if self.capabilities.has(cap) {
            Ok(())
        } else {
            fail(RenderError::Unsupported(cap))
        }
    }

    fn require_index_buffer(&self) -> Result<Handle<IndexBuffer>, RenderError> {
        match bound_get(&self.bindings.borrow().index_buffer) {
            Some(index_buffer) => Ok(index_buffer),
            None => fail(RenderError::NoIndexBuffer),
        }
    }

    fn check_instances(&self, instance_count: u32) -> Result<(), RenderError> {
        self.require(Capability::Instancing)?;
        if instance_count == 0 {
            return fail(RenderError::ZeroInstances);
        }
        let max = self.max_instance_count();
        if instance_count > max {
            return fail(RenderError::TooManyInstances {
                requested: instance_count,
                max,
            });
        }
        Ok(())
    }
}

impl<B: Backend> Drop for RenderDevice<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
