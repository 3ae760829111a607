use glam::{Mat4, Vec2, Vec3};

use super::*;
use crate::backend::{BackendCall, BufferHandle, BufferUsage, ProgramHandle, QueryHandle, RecordingBackend, TextureHandle, UniformLocation};
use crate::device::{Capabilities, Capability, ErrorKind, Limits, RenderError, RendererConfig};
use crate::lifecycle::{Handle, LifecycleBroker};
use crate::matrix::MatrixType;
use crate::resource::{
    ComponentType, DataStorage, IndexBuffer, IndexFormat, RenderContext, RenderTarget, Shader,
    ShaderUniform, Texture, TextureKind, VertexBuffer, VertexComponent, VertexLayout,
};
use crate::states::{BlendFunc, ClearBuffers, FaceSide, PrimitiveMode, QueryCondition, StencilOp};
use crate::texture::SamplerConfig;

const PROGRAM: ProgramHandle = ProgramHandle(100);
const WVP: UniformLocation = UniformLocation(3);
const TARGET_SIZE: UniformLocation = UniformLocation(10);
const INV_TARGET_SIZE: UniformLocation = UniformLocation(11);

struct Scene {
    device: RenderDevice<RecordingBackend>,
    context: Handle<RenderContext>,
    shader: Handle<Shader>,
    target: Handle<RenderTarget>,
    vertices: Handle<VertexBuffer>,
}

impl Scene {
    fn new() -> Self {
        Self::with_backend(RecordingBackend::full())
    }

    fn with_capabilities(caps: Capabilities) -> Self {
        Self::with_backend(RecordingBackend::new(caps, Limits::default()))
    }

    fn with_backend(mut backend: RecordingBackend) -> Self {
        backend.expose_uniform(PROGRAM, ShaderUniform::WorldViewProjMatrix, WVP.0);
        backend.expose_uniform(PROGRAM, ShaderUniform::TargetSize, TARGET_SIZE.0);
        backend.expose_uniform(PROGRAM, ShaderUniform::InvTargetSize, INV_TARGET_SIZE.0);

        let broker = LifecycleBroker::new();
        let mut device = RenderDevice::with_broker(backend, RendererConfig::default(), broker.clone()).unwrap();

        let context = broker.track(RenderContext::new("main"));
        device.backend_mut().set_current_context(Some(context.id()));

        let shader = broker.track(Shader::new(PROGRAM));
        let target = broker.track(RenderTarget::new(640, 480));
        let vertices = vertex_buffer(&broker, 1, position_layout(&broker));

        device.set_shader(Some(&shader)).unwrap();
        device.set_target(Some(&target)).unwrap();
        device.set_vertex_buffer(&vertices).unwrap();
        device.backend_mut().take_calls();

        Self {
            device,
            context,
            shader,
            target,
            vertices,
        }
    }

    fn broker(&self) -> LifecycleBroker {
        self.device.broker().clone()
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        self.device.draw_primitives(PrimitiveMode::TriangleList, 0, 3)
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.device.backend().count(pred)
    }

    fn draws(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::DrawArrays { .. } | BackendCall::DrawElements { .. }))
    }

    fn take_calls(&mut self) -> Vec<BackendCall> {
        self.device.backend_mut().take_calls()
    }
}

fn position_layout(broker: &LifecycleBroker) -> Handle<VertexLayout> {
    broker.track(
        VertexLayout::new()
            .with(VertexComponent::Position, ComponentType::Float3)
            .with(VertexComponent::TexCoord, ComponentType::Float2),
    )
}

fn vertex_buffer(broker: &LifecycleBroker, name: u32, layout: Handle<VertexLayout>) -> Handle<VertexBuffer> {
    broker.track(VertexBuffer::new(BufferHandle(name), layout, 3))
}

fn position_of(calls: &[BackendCall], pred: impl Fn(&BackendCall) -> bool) -> usize {
    calls
        .iter()
        .position(pred)
        .unwrap_or_else(|| panic!("call not found in {calls:#?}"))
}

fn is_attribute_call(c: &BackendCall) -> bool {
    matches!(c, BackendCall::EnableAttribute { .. } | BackendCall::DisableAttribute(_))
}

// ── preconditions ─────────────────────────────────────────────────────────

#[test]
fn draw_without_context_is_rejected() {
    let mut scene = Scene::new();
    scene.device.backend_mut().set_current_context(None);

    assert_eq!(scene.draw(), Err(RenderError::NoActiveContext));
    assert_eq!(scene.draws(), 0);
}

#[test]
fn draw_without_shader_is_rejected() {
    let mut scene = Scene::new();
    scene.device.set_shader(None).unwrap();

    let err = scene.draw().unwrap_err();
    assert_eq!(err, RenderError::NoShader);
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(scene.draws(), 0);
}

#[test]
fn draw_without_target_is_rejected() {
    let mut scene = Scene::new();
    scene.device.set_target(None).unwrap();

    assert_eq!(scene.draw(), Err(RenderError::NoTarget));
    assert_eq!(scene.count(|c| matches!(c, BackendCall::DeactivateTarget)), 1);
}

#[test]
fn draw_without_vertex_buffer_is_rejected() {
    let mut scene = Scene::new();
    let broker = scene.broker();
    let vertices = std::mem::replace(&mut scene.vertices, vertex_buffer(&broker, 2, position_layout(&broker)));
    drop(vertices);

    assert_eq!(scene.draw(), Err(RenderError::NoVertexBuffer));
    assert_eq!(scene.draws(), 0);
}

#[test]
fn unlinked_shader_is_rejected() {
    let mut scene = Scene::new();
    let unlinked = scene.broker().track(Shader::unlinked(ProgramHandle(5)));

    assert_eq!(
        scene.device.set_shader(Some(&unlinked)),
        Err(RenderError::ShaderNotLinked(unlinked.id()))
    );
    assert_eq!(scene.device.shader().map(|s| s.id()), Some(scene.shader.id()));
}

#[test]
fn software_buffers_are_rejected() {
    let mut scene = Scene::new();
    let broker = scene.broker();
    let soft = broker.track(
        VertexBuffer::new(BufferHandle(9), position_layout(&broker), 3).with_storage(DataStorage::Software),
    );
    let soft_ib = broker.track(IndexBuffer::new(BufferHandle(8), IndexFormat::U16, 3).with_storage(DataStorage::Software));

    assert_eq!(scene.device.set_vertex_buffer(&soft), Err(RenderError::SoftwareBuffer(soft.id())));
    assert_eq!(scene.device.set_index_buffer(Some(&soft_ib)), Err(RenderError::SoftwareBuffer(soft_ib.id())));
}

#[test]
fn target_activation_failures() {
    let mut scene = Scene::new();
    let broker = scene.broker();

    let hidden = broker.track(RenderTarget::new(16, 16).with_renderable(false));
    assert_eq!(
        scene.device.set_target(Some(&hidden)),
        Err(RenderError::TargetNotRenderable(hidden.id()))
    );
    assert!(scene.device.target().is_none());

    let other = broker.track(RenderTarget::new(16, 16));
    scene.device.backend_mut().fail_target_activation(true);
    assert_eq!(
        scene.device.set_target(Some(&other)),
        Err(RenderError::TargetActivation(other.id()))
    );
}

#[test]
fn rebinding_the_same_target_is_free() {
    let mut scene = Scene::new();
    let target = scene.target.clone();

    scene.device.set_target(Some(&target)).unwrap();
    assert!(scene.device.backend().calls().is_empty());
}

// ── reconciliation ────────────────────────────────────────────────────────

#[test]
fn first_draw_follows_the_fixed_order() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    let calls = scene.take_calls();

    let target = position_of(&calls, |c| matches!(c, BackendCall::EnsureTargetUpdated));
    let program = position_of(&calls, |c| matches!(c, BackendCall::BindProgram(PROGRAM)));
    let size = position_of(&calls, |c| matches!(c, BackendCall::SendVec2 { .. }));
    let matrix = position_of(&calls, |c| matches!(c, BackendCall::SendMatrix { .. }));
    let create = position_of(&calls, |c| matches!(c, BackendCall::CreateVertexArray(_)));
    let states = position_of(&calls, |c| matches!(c, BackendCall::ApplyStates));
    let draw = position_of(&calls, |c| matches!(c, BackendCall::DrawArrays { .. }));

    assert!(target < program);
    assert!(program < size);
    assert!(size < matrix);
    assert!(matrix < create);
    assert!(create < states);
    assert!(states < draw);
    assert_eq!(calls.last(), Some(&BackendCall::BindVertexArray(None)));
    assert!(scene.device.dirty().is_empty());
}

#[test]
fn size_uniforms_are_sent() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let calls = scene.take_calls();
    assert!(calls.contains(&BackendCall::SendVec2 {
        location: TARGET_SIZE,
        value: Vec2::new(640.0, 480.0),
    }));
    assert!(calls.contains(&BackendCall::SendVec2 {
        location: INV_TARGET_SIZE,
        value: Vec2::new(1.0 / 640.0, 1.0 / 480.0),
    }));
}

#[test]
fn clean_second_draw_only_rebinds() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    scene.take_calls();

    scene.draw().unwrap();

    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindProgram(_))), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::SendMatrix { .. })), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::SendVec2 { .. })), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 0);
    assert_eq!(scene.count(is_attribute_call), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindVertexArray(Some(_)))), 1);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::ApplyStates)), 1);
    assert_eq!(scene.draws(), 1);
}

#[test]
fn matrix_write_resends_located_matrices() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    scene.take_calls();

    let world = Mat4::from_scale(Vec3::splat(2.0));
    scene.device.set_matrix(MatrixType::World, world);
    assert!(scene.device.dirty().contains(DirtyFlags::MATRICES));
    scene.draw().unwrap();

    let sent: Vec<_> = scene
        .take_calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::SendMatrix { .. }))
        .collect();
    assert_eq!(sent, vec![BackendCall::SendMatrix { location: WVP, matrix: world }]);
}

#[test]
fn shader_change_requeries_locations_and_resends() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let other = ProgramHandle(200);
    scene.device.backend_mut().expose_uniform(other, ShaderUniform::ViewMatrix, 7);
    scene.device.backend_mut().expose_uniform(other, ShaderUniform::TargetSize, 8);
    let shader = scene.broker().track(Shader::new(other));
    scene.device.set_shader(Some(&shader)).unwrap();
    scene.take_calls();

    scene.draw().unwrap();
    let calls = scene.take_calls();

    assert!(calls.contains(&BackendCall::BindProgram(other)));
    assert!(calls.contains(&BackendCall::SendMatrix {
        location: UniformLocation(7),
        matrix: Mat4::IDENTITY,
    }));
    assert!(!calls.iter().any(|c| matches!(c, BackendCall::SendMatrix { location: WVP, .. })));
    // Size uniforms are forced out after a program change.
    assert!(calls.contains(&BackendCall::SendVec2 {
        location: UniformLocation(8),
        value: Vec2::new(640.0, 480.0),
    }));
    // The vertex array does not depend on the program.
    assert!(!calls.iter().any(|c| matches!(c, BackendCall::CreateVertexArray(_))));
}

#[test]
fn target_resize_resends_size_uniforms() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    scene.take_calls();

    scene.target.resize(800, 600);
    scene.draw().unwrap();

    assert_eq!(scene.count(|c| matches!(c, BackendCall::SendVec2 { .. })), 2);
    assert!(scene.device.backend().calls().contains(&BackendCall::SendVec2 {
        location: TARGET_SIZE,
        value: Vec2::new(800.0, 600.0),
    }));
}

#[test]
fn flat_state_is_applied_every_draw() {
    let mut scene = Scene::new();
    scene.device.set_blend_func(BlendFunc::SrcAlpha, BlendFunc::InvSrcAlpha);
    scene.device.set_stencil_pass_operation(StencilOp::Replace, FaceSide::Back);
    scene.draw().unwrap();

    let states = scene.device.backend().last_states().cloned().unwrap();
    assert_eq!(states.src_blend, BlendFunc::SrcAlpha);
    assert_eq!(states.dst_blend, BlendFunc::InvSrcAlpha);
    assert_eq!(states.back_face.pass, StencilOp::Replace);
    assert_eq!(states.front_face.pass, StencilOp::Keep);

    scene.take_calls();
    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::ApplyStates)), 1);
}

#[test]
fn non_positive_widths_are_rejected() {
    let mut scene = Scene::new();
    assert_eq!(scene.device.set_line_width(0.0), Err(RenderError::NonPositive("width")));
    assert_eq!(scene.device.set_point_size(-1.0), Err(RenderError::NonPositive("size")));
    assert_eq!(scene.device.render_states().line_width, 1.0);

    scene.device.set_line_width(2.5).unwrap();
    assert_eq!(scene.device.render_states().line_width, 2.5);
}

#[test]
fn unvalidated_setters_still_get_draw_checks() {
    let broker = LifecycleBroker::new();
    let config = RendererConfig {
        validate: false,
        ..RendererConfig::default()
    };
    let mut device = RenderDevice::with_broker(RecordingBackend::full(), config, broker.clone()).unwrap();
    let context = broker.track(RenderContext::new("main"));
    device.backend_mut().set_current_context(Some(context.id()));

    let unlinked = broker.track(Shader::unlinked(PROGRAM));
    let soft = broker.track(
        VertexBuffer::new(BufferHandle(9), position_layout(&broker), 3).with_storage(DataStorage::Software),
    );
    device.set_shader(Some(&unlinked)).unwrap();
    device.set_vertex_buffer(&soft).unwrap();
    device.set_line_width(0.0).unwrap();
    assert_eq!(device.render_states().line_width, 0.0);

    assert_eq!(
        device.draw_primitives(PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::NoTarget)
    );

    let target = broker.track(RenderTarget::new(8, 8));
    device.set_target(Some(&target)).unwrap();
    assert_eq!(
        device.draw_primitives_instanced(0, PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::ZeroInstances)
    );
    device.backend_mut().set_current_context(None);
    assert_eq!(
        device.draw_primitives(PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::NoActiveContext)
    );
}

#[test]
fn derived_matrix_write_is_ignored() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    scene.device.set_matrix(MatrixType::WorldViewProj, Mat4::from_scale(Vec3::splat(4.0)));

    assert!(!scene.device.dirty().contains(DirtyFlags::MATRICES));
    assert_eq!(scene.device.matrix(MatrixType::WorldViewProj), Mat4::IDENTITY);
}

#[test]
fn world_view_proj_through_the_device() {
    let mut scene = Scene::new();
    let p = Mat4::perspective_rh(1.2, 4.0 / 3.0, 0.1, 50.0);
    let v = Mat4::from_translation(Vec3::new(0.0, -1.0, -4.0)).transpose();
    scene.device.set_matrix(MatrixType::Projection, p);
    scene.device.set_matrix(MatrixType::View, v);
    scene.device.set_matrix(MatrixType::World, Mat4::IDENTITY);

    assert!(scene.device.matrix(MatrixType::WorldViewProj).abs_diff_eq(v * p, 1e-5));
}

// ── vertex arrays ─────────────────────────────────────────────────────────

#[test]
fn identical_bindings_reuse_the_vertex_array() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    let built = scene.count(is_attribute_call);
    assert!(built > 0);

    // Switching away and back must find the cached object.
    let broker = scene.broker();
    let other = vertex_buffer(&broker, 2, position_layout(&broker));
    scene.device.set_vertex_buffer(&other).unwrap();
    scene.draw().unwrap();
    let vertices = scene.vertices.clone();
    scene.device.set_vertex_buffer(&vertices).unwrap();
    scene.take_calls();

    scene.draw().unwrap();

    assert_eq!(scene.count(is_attribute_call), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 0);
    let stats = scene.device.vao_stats();
    assert_eq!((stats.hits, stats.misses), (1, 2));
    assert_eq!(scene.device.vertex_array_count(), 2);
}

#[test]
fn released_vertex_buffer_purges_and_deletes() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let broker = scene.broker();
    let replacement = vertex_buffer(&broker, 2, position_layout(&broker));
    scene.device.set_vertex_buffer(&replacement).unwrap();
    let old = std::mem::replace(&mut scene.vertices, replacement);
    drop(old);

    assert_eq!(scene.device.vertex_array_count(), 0);
    scene.take_calls();

    scene.draw().unwrap();
    let calls = scene.take_calls();
    let delete = position_of(&calls, |c| matches!(c, BackendCall::DeleteVertexArray { .. }));
    let create = position_of(&calls, |c| matches!(c, BackendCall::CreateVertexArray(_)));
    assert!(delete < create);
}

#[test]
fn released_bound_index_buffer_marks_vertex_array_dirty() {
    let mut scene = Scene::new();
    let ib = scene.broker().track(IndexBuffer::new(BufferHandle(50), IndexFormat::U16, 6));
    scene.device.set_index_buffer(Some(&ib)).unwrap();
    scene.device.draw_indexed_primitives(PrimitiveMode::TriangleList, 0, 6).unwrap();
    assert!(scene.device.dirty().is_empty());

    drop(ib);

    assert!(scene.device.dirty().contains(DirtyFlags::VERTEX_ARRAY));
    assert_eq!(
        scene.device.draw_indexed_primitives(PrimitiveMode::TriangleList, 0, 6),
        Err(RenderError::NoIndexBuffer)
    );
    scene.draw().unwrap();
}

#[test]
fn context_switch_builds_a_new_vertex_array() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let second = scene.broker().track(RenderContext::new("second"));
    scene.device.backend_mut().set_current_context(Some(second.id()));
    scene.take_calls();
    scene.draw().unwrap();

    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 1);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindProgram(PROGRAM))), 1);
    assert_eq!(scene.device.vertex_array_count(), 2);

    // Back to the first context: cached there already.
    let first = scene.context.id();
    scene.device.backend_mut().set_current_context(Some(first));
    scene.take_calls();
    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 0);
}

#[test]
fn context_release_drops_its_vertex_arrays_only() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let second = scene.broker().track(RenderContext::new("second"));
    scene.device.backend_mut().set_current_context(Some(second.id()));
    scene.draw().unwrap();
    assert_eq!(scene.device.vertex_array_count(), 2);

    let first = scene.context.id();
    scene.device.backend_mut().set_current_context(Some(first));
    drop(second);

    assert_eq!(scene.device.vertex_array_count(), 1);
    scene.take_calls();
    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::DeleteVertexArray { .. })), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 0);
}

#[test]
fn purged_vertex_arrays_are_deleted_in_their_own_context() {
    let mut scene = Scene::new();
    let first = scene.context.id();
    scene.draw().unwrap();

    let second = scene.broker().track(RenderContext::new("second"));
    scene.device.backend_mut().set_current_context(Some(second.id()));
    scene.draw().unwrap();

    let broker = scene.broker();
    let replacement = vertex_buffer(&broker, 2, position_layout(&broker));
    scene.device.set_vertex_buffer(&replacement).unwrap();
    drop(std::mem::replace(&mut scene.vertices, replacement));
    assert_eq!(scene.device.vertex_array_count(), 0);

    // Back in the first context: only its own handle may go.
    scene.device.backend_mut().set_current_context(Some(first));
    scene.take_calls();
    scene.draw().unwrap();
    let deletes: Vec<_> = scene
        .take_calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::DeleteVertexArray { context, .. } => Some(context),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, vec![first]);

    // The second context collects its own once current.
    scene.device.backend_mut().set_current_context(Some(second.id()));
    scene.draw().unwrap();
    let deletes: Vec<_> = scene
        .take_calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::DeleteVertexArray { context, .. } => Some(context),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, vec![second.id()]);
}

#[test]
fn unsupported_component_aborts_and_retries() {
    let caps = Capabilities::all().with(Capability::DoubleAttributes, false);
    let mut scene = Scene::with_capabilities(caps);
    let broker = scene.broker();
    let layout = broker.track(VertexLayout::new().with(VertexComponent::Position, ComponentType::Double3));
    let doubles = vertex_buffer(&broker, 2, layout);
    scene.device.set_vertex_buffer(&doubles).unwrap();

    let err = scene.draw().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert!(matches!(err, RenderError::UnsupportedComponent { ty: ComponentType::Double3, .. }));
    assert_eq!(scene.draws(), 0);
    assert_eq!(scene.device.vertex_array_count(), 0);
    assert!(scene.device.dirty().contains(DirtyFlags::VERTEX_ARRAY));

    assert!(scene.draw().is_err());
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 2);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::DeleteVertexArray { .. })), 2);
}

#[test]
fn without_vertex_arrays_attributes_are_specified_every_draw() {
    let caps = Capabilities::all().with(Capability::VertexArrayObjects, false);
    let mut scene = Scene::with_capabilities(caps);

    scene.draw().unwrap();
    let per_draw = scene.count(is_attribute_call);
    scene.draw().unwrap();

    assert_eq!(scene.count(is_attribute_call), per_draw * 2);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::CreateVertexArray(_))), 0);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindVertexArray(_))), 0);
    assert_eq!(scene.device.vertex_array_count(), 0);
}

// ── textures ──────────────────────────────────────────────────────────────

#[test]
fn textures_are_rebound_every_draw() {
    let mut scene = Scene::new();
    let texture = scene.broker().track(Texture::new(TextureHandle(4), TextureKind::D2));
    scene.device.set_texture(2, Some(&texture)).unwrap();
    assert!(scene.device.dirty().contains(DirtyFlags::TEXTURES));

    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindSampler { unit: 2, .. })), 1);
    scene.take_calls();

    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindSampler { .. })), 0);
    assert_eq!(
        scene.count(|c| matches!(c, BackendCall::BindTexture { unit: 2, texture: TextureHandle(4) })),
        1
    );
}

#[test]
fn same_texture_twice_leaves_textures_clean() {
    let mut scene = Scene::new();
    let texture = scene.broker().track(Texture::new(TextureHandle(4), TextureKind::D2));
    scene.device.set_texture(0, Some(&texture)).unwrap();
    scene.draw().unwrap();

    scene.device.set_texture(0, Some(&texture)).unwrap();
    assert!(!scene.device.dirty().contains(DirtyFlags::TEXTURES));

    let other = scene.broker().track(Texture::new(TextureHandle(5), TextureKind::D2));
    scene.device.set_texture(0, Some(&other)).unwrap();
    assert!(scene.device.dirty().contains(DirtyFlags::TEXTURES));
}

#[test]
fn samplers_apply_directly_without_sampler_objects() {
    let caps = Capabilities::all().with(Capability::SamplerObjects, false);
    let mut scene = Scene::with_capabilities(caps);
    let texture = scene.broker().track(Texture::new(TextureHandle(4), TextureKind::D2));
    scene.device.set_texture(0, Some(&texture)).unwrap();
    scene.device.set_texture_sampler(0, SamplerConfig::default()).unwrap();

    scene.draw().unwrap();

    assert_eq!(scene.count(|c| matches!(c, BackendCall::ApplySampler { unit: 0, .. })), 1);
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindSampler { .. })), 0);
}

#[test]
fn released_texture_is_no_longer_bound() {
    let mut scene = Scene::new();
    let texture = scene.broker().track(Texture::new(TextureHandle(4), TextureKind::D2));
    scene.device.set_texture(0, Some(&texture)).unwrap();
    scene.draw().unwrap();

    drop(texture);
    assert!(scene.device.texture(0).is_none());
    scene.take_calls();

    scene.draw().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BindTexture { .. })), 0);
}

#[test]
fn texture_unit_out_of_range() {
    let mut scene = Scene::new();
    let units = scene.device.texture_unit_count();
    let texture = scene.broker().track(Texture::new(TextureHandle(4), TextureKind::D2));

    assert_eq!(
        scene.device.set_texture(units, Some(&texture)),
        Err(RenderError::TextureUnitOutOfRange { unit: units, max: units })
    );
}

// ── shader release ────────────────────────────────────────────────────────

#[test]
fn released_shader_unbinds_itself() {
    let mut scene = Scene::new();
    scene.draw().unwrap();

    let broker = scene.broker();
    let shader = std::mem::replace(&mut scene.shader, broker.track(Shader::new(ProgramHandle(1))));
    drop(shader);

    assert!(scene.device.shader().is_none());
    assert!(scene.device.dirty().contains(DirtyFlags::SHADER));
    assert_eq!(scene.draw(), Err(RenderError::NoShader));
}

// ── indexed and instanced draws ───────────────────────────────────────────

#[test]
fn indexed_draw_computes_byte_offset() {
    let mut scene = Scene::new();
    let ib = scene
        .broker()
        .track(IndexBuffer::new(BufferHandle(50), IndexFormat::U32, 36).with_start_offset(8));
    scene.device.set_index_buffer(Some(&ib)).unwrap();

    scene.device.draw_indexed_primitives(PrimitiveMode::TriangleList, 3, 30).unwrap();

    assert!(scene.device.backend().calls().contains(&BackendCall::DrawElements {
        mode: PrimitiveMode::TriangleList,
        count: 30,
        format: IndexFormat::U32,
        byte_offset: 8 + 3 * 4,
        instances: None,
    }));
    assert!(scene.device.backend().calls().contains(&BackendCall::BindIndexBuffer(Some(BufferHandle(50)))));
}

#[test]
fn indexed_draw_needs_an_index_buffer() {
    let mut scene = Scene::new();
    assert_eq!(
        scene.device.draw_indexed_primitives(PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::NoIndexBuffer)
    );
    assert_eq!(scene.draws(), 0);
}

fn instancing_layout(broker: &LifecycleBroker) -> Handle<VertexLayout> {
    broker.track(VertexLayout::new().with(VertexComponent::InstanceData0, ComponentType::Float4))
}

#[test]
fn instanced_draw_binds_per_instance_attributes() {
    let mut scene = Scene::new();
    let layout = instancing_layout(&scene.broker());
    scene.device.set_instancing_layout(Some(&layout)).unwrap();
    scene.device.write_instance_data(&[0u8; 64]).unwrap();

    scene.device.draw_primitives_instanced(4, PrimitiveMode::TriangleList, 0, 3).unwrap();

    let calls = scene.device.backend().calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        BackendCall::DrawArrays { instances: Some(4), .. }
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        BackendCall::EnableAttribute { index: 9, binding } if binding.per_instance && binding.stride == 16
    )));
}

#[test]
fn instance_count_is_bounded() {
    let mut scene = Scene::new();
    let layout = instancing_layout(&scene.broker());
    scene.device.set_instancing_layout(Some(&layout)).unwrap();

    let max = scene.device.max_instance_count();
    assert_eq!(u64::from(max), RendererConfig::default().instance_buffer_size / 16);

    assert_eq!(
        scene.device.draw_primitives_instanced(0, PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::ZeroInstances)
    );
    assert_eq!(
        scene.device.draw_primitives_instanced(max + 1, PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::TooManyInstances { requested: max + 1, max })
    );
    assert_eq!(scene.draws(), 0);

    scene.device.draw_primitives_instanced(max, PrimitiveMode::TriangleList, 0, 3).unwrap();
    assert_eq!(scene.draws(), 1);
}

#[test]
fn instance_data_is_bounded_by_the_buffer() {
    let mut scene = Scene::new();
    let capacity = RendererConfig::default().instance_buffer_size;
    let data = vec![0u8; capacity as usize + 1];

    assert_eq!(
        scene.device.write_instance_data(&data),
        Err(RenderError::InstanceDataOverflow { size: capacity + 1, capacity })
    );
}

#[test]
fn instancing_switch_rebuilds_the_vertex_array() {
    let mut scene = Scene::new();
    let layout = instancing_layout(&scene.broker());
    scene.device.set_instancing_layout(Some(&layout)).unwrap();

    scene.draw().unwrap();
    scene.device.draw_primitives_instanced(2, PrimitiveMode::TriangleList, 0, 3).unwrap();
    scene.draw().unwrap();

    let stats = scene.device.vao_stats();
    assert_eq!((stats.misses, stats.hits), (2, 1));
}

#[test]
fn instancing_needs_the_capability() {
    let caps = Capabilities::all().with(Capability::Instancing, false);
    let mut scene = Scene::with_capabilities(caps);
    let layout = instancing_layout(&scene.broker());

    let err = scene.device.set_instancing_layout(Some(&layout)).unwrap_err();
    assert_eq!(err, RenderError::Unsupported(Capability::Instancing));
    assert_eq!(
        scene.device.draw_primitives_instanced(1, PrimitiveMode::TriangleList, 0, 3),
        Err(RenderError::Unsupported(Capability::Instancing))
    );
}

#[test]
fn instance_buffer_failure_downgrades_instancing() {
    let mut backend = RecordingBackend::full();
    backend.fail_buffer_creation(Some(BufferUsage::Dynamic));

    let device = RenderDevice::new(backend, RendererConfig::default()).unwrap();
    assert!(!device.has_capability(Capability::Instancing));
}

#[test]
fn quad_buffer_failure_is_fatal() {
    let mut backend = RecordingBackend::full();
    backend.fail_buffer_creation(Some(BufferUsage::Static));

    let err = RenderDevice::new(backend, RendererConfig::default()).err();
    assert_eq!(err, Some(RenderError::BufferAllocation("fullscreen quad buffer")));
}

// ── fullscreen quad ───────────────────────────────────────────────────────

#[test]
fn fullscreen_quad_replaces_buffers() {
    let mut scene = Scene::new();
    let ib = scene.broker().track(IndexBuffer::new(BufferHandle(50), IndexFormat::U16, 6));
    scene.device.set_index_buffer(Some(&ib)).unwrap();

    scene.device.draw_fullscreen_quad().unwrap();

    let calls = scene.device.backend().calls();
    assert!(calls.contains(&BackendCall::DrawArrays {
        mode: PrimitiveMode::TriangleStrip,
        first: 0,
        count: 4,
        instances: None,
    }));
    assert!(calls.contains(&BackendCall::BindIndexBuffer(None)));
    assert_eq!(
        scene.device.draw_indexed_primitives(PrimitiveMode::TriangleList, 0, 6),
        Err(RenderError::NoIndexBuffer)
    );
}

// ── pass-through ──────────────────────────────────────────────────────────

#[test]
fn clear_updates_target_and_states_first() {
    let mut scene = Scene::new();
    scene.device.clear(ClearBuffers::COLOR | ClearBuffers::DEPTH).unwrap();

    assert_eq!(
        scene.take_calls(),
        vec![
            BackendCall::EnsureTargetUpdated,
            BackendCall::ApplyStates,
            BackendCall::Clear(ClearBuffers::COLOR | ClearBuffers::DEPTH),
        ]
    );

    scene.device.clear(ClearBuffers::empty()).unwrap();
    assert!(scene.device.backend().calls().is_empty());
}

#[test]
fn conditional_rendering_needs_the_capability() {
    let mut scene = Scene::new();
    scene.device.begin_condition(QueryHandle(1), QueryCondition::Wait).unwrap();
    scene.device.end_condition().unwrap();
    assert_eq!(scene.count(|c| matches!(c, BackendCall::BeginCondition { .. })), 1);

    let caps = Capabilities::all().with(Capability::ConditionalRendering, false);
    let mut scene = Scene::with_capabilities(caps);
    assert_eq!(
        scene.device.begin_condition(QueryHandle(1), QueryCondition::Wait),
        Err(RenderError::Unsupported(Capability::ConditionalRendering))
    );
}

// ── teardown ──────────────────────────────────────────────────────────────

#[test]
fn shutdown_deletes_in_current_context_only() {
    let mut scene = Scene::new();
    scene.draw().unwrap();
    let second = scene.broker().track(RenderContext::new("second"));
    scene.device.backend_mut().set_current_context(Some(second.id()));
    scene.draw().unwrap();
    scene.take_calls();

    scene.device.shutdown();

    assert_eq!(scene.count(|c| matches!(c, BackendCall::DeleteVertexArray { .. })), 1);
    assert_eq!(
        scene.count(|c| matches!(c, BackendCall::DeleteVertexArray { context, .. } if *context == second.id())),
        1
    );
    assert_eq!(scene.count(|c| matches!(c, BackendCall::DestroyBuffer(_))), 2);
    assert_eq!(scene.device.vertex_array_count(), 0);

    // Idempotent.
    scene.take_calls();
    scene.device.shutdown();
    assert!(scene.device.backend().calls().is_empty());
}

// ── independence ──────────────────────────────────────────────────────────

#[test]
fn devices_do_not_share_state() {
    let mut a = Scene::new();
    let mut b = Scene::new();

    a.device.set_matrix(MatrixType::World, Mat4::from_scale(Vec3::splat(3.0)));
    a.draw().unwrap();
    b.draw().unwrap();

    assert_eq!(b.device.matrix(MatrixType::World), Mat4::IDENTITY);
    assert_eq!(a.device.vertex_array_count(), 1);
    assert_eq!(b.device.vertex_array_count(), 1);
}
