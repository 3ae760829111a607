use anyhow::{Context, Result};
use glam::{Mat4, Vec3};

use kiln_engine::backend::{BackendCall, BufferHandle, ProgramHandle, RecordingBackend, TextureHandle};
use kiln_engine::device::{probe_adapter, ProbeInit, RendererConfig};
use kiln_engine::lifecycle::Handle;
use kiln_engine::logging::{init_logging, LoggingConfig};
use kiln_engine::matrix::MatrixType;
use kiln_engine::resource::{
    ComponentType, IndexBuffer, IndexFormat, RenderContext, RenderTarget, Shader, ShaderUniform,
    Texture, TextureKind, VertexBuffer, VertexComponent, VertexLayout,
};
use kiln_engine::states::{ClearBuffers, PrimitiveMode};
use kiln_engine::RenderDevice;

const FRAMES: u32 = 4;
const PROGRAM: ProgramHandle = ProgramHandle(1);

/// Headless frame driver.
///
/// Runs a few frames of a small scene against the recording backend and
/// prints what reached the backend. With `--probe`, capabilities and limits
/// come from a real wgpu adapter instead of the full default set.
fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let probe = std::env::args().skip(1).any(|arg| arg == "--probe");
    let mut backend = if probe {
        match pollster::block_on(probe_adapter(ProbeInit::default())) {
            Ok(profile) => {
                println!("adapter: {} ({:?})", profile.name, profile.backend);
                RecordingBackend::new(profile.capabilities, profile.limits)
            }
            Err(err) => {
                log::warn!("adapter probe failed, using full capabilities: {err:#}");
                RecordingBackend::full()
            }
        }
    } else {
        RecordingBackend::full()
    };

    backend.expose_uniform(PROGRAM, ShaderUniform::WorldViewProjMatrix, 0);
    backend.expose_uniform(PROGRAM, ShaderUniform::InvTargetSize, 1);

    let mut device = RenderDevice::new(backend, RendererConfig::default())
        .context("failed to create render device")?;
    let broker = device.broker().clone();

    let context = broker.track(RenderContext::new("studio"));
    device.backend_mut().set_current_context(Some(context.id()));
    log::info!("context {:?} current", context.label().unwrap_or("unnamed"));

    let shader = broker.track(Shader::new(PROGRAM));
    let target = broker.track(RenderTarget::new(1280, 720));
    let layout = broker.track(
        VertexLayout::new()
            .with(VertexComponent::Position, ComponentType::Float3)
            .with(VertexComponent::Normal, ComponentType::Float3)
            .with(VertexComponent::TexCoord, ComponentType::Float2),
    );
    let meshes: Vec<(Handle<VertexBuffer>, Handle<IndexBuffer>)> = (0..3)
        .map(|i| {
            let vertices = broker.track(VertexBuffer::new(BufferHandle(100 + i), layout.clone(), 24));
            let indices = broker.track(IndexBuffer::new(BufferHandle(200 + i), IndexFormat::U16, 36));
            (vertices, indices)
        })
        .collect();
    let texture = broker.track(Texture::new(TextureHandle(1), TextureKind::D2).with_mipmaps(true));

    device.set_shader(Some(&shader))?;
    device.set_target(Some(&target))?;
    device.set_texture(0, Some(&texture))?;
    // The cache composes row-vector matrices; glam builds column-vector ones.
    device.set_matrix(
        MatrixType::Projection,
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0).transpose(),
    );
    device.set_matrix(
        MatrixType::View,
        Mat4::from_translation(Vec3::new(0.0, 0.0, -6.0)).transpose(),
    );

    for frame in 0..FRAMES {
        device.clear(ClearBuffers::COLOR | ClearBuffers::DEPTH)?;

        for (i, (vertices, indices)) in meshes.iter().enumerate() {
            let angle = (frame as f32 + i as f32) * 0.25;
            device.set_matrix(
                MatrixType::World,
                (Mat4::from_rotation_y(angle) * Mat4::from_translation(Vec3::X * (i as f32 - 1.0) * 2.0))
                    .transpose(),
            );
            device.set_vertex_buffer(vertices)?;
            device.set_index_buffer(Some(indices))?;
            device.draw_indexed_primitives(PrimitiveMode::TriangleList, 0, indices.index_count())?;
        }

        // Outline of the first mesh, unindexed.
        let (outline, _) = &meshes[0];
        device.set_index_buffer(None)?;
        device.set_vertex_buffer(outline)?;
        device.draw_primitives(PrimitiveMode::LineStrip, 0, outline.vertex_count())?;

        // Post pass.
        device.draw_fullscreen_quad()?;

        let calls = device.backend_mut().take_calls();
        let count = |pred: fn(&BackendCall) -> bool| calls.iter().filter(|c| pred(c)).count();
        println!(
            "frame {frame}: {} backend calls, {} draws, {} matrix uploads, {} attribute changes",
            calls.len(),
            count(|c| matches!(c, BackendCall::DrawArrays { .. } | BackendCall::DrawElements { .. })),
            count(|c| matches!(c, BackendCall::SendMatrix { .. })),
            count(|c| matches!(c, BackendCall::EnableAttribute { .. } | BackendCall::DisableAttribute(_))),
        );
    }

    // Releasing a mesh evicts its vertex arrays.
    drop(meshes);
    let stats = device.vao_stats();
    println!(
        "vertex arrays: {} cached, {} hits, {} misses, {} evictions",
        device.vertex_array_count(),
        stats.hits,
        stats.misses,
        stats.evictions,
    );

    device.shutdown();
    Ok(())
}
