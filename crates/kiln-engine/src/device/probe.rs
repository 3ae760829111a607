use anyhow::{Context, Result};

use super::{Capabilities, Capability, Limits};

/// Parameters for [`probe_adapter`].
#[derive(Debug, Clone)]
pub struct ProbeInit {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Ask for the software fallback adapter (useful on CI machines).
    pub force_fallback_adapter: bool,
}

impl Default for ProbeInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}

/// What a physical adapter reports, translated into render-state terms.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub capabilities: Capabilities,
    pub limits: Limits,
}

/// Requests a headless adapter and reads its features and limits.
///
/// Adapter acquisition is asynchronous under wgpu; callers outside an async
/// runtime can drive it with `pollster::block_on`.
pub async fn probe_adapter(init: ProbeInit) -> Result<AdapterProfile> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: init.backends,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: None,
            force_fallback_adapter: init.force_fallback_adapter,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let info = adapter.get_info();
    let downlevel = adapter.get_downlevel_capabilities();

    let profile = AdapterProfile {
        name: info.name,
        backend: info.backend,
        capabilities: capabilities_from_wgpu(adapter.features(), &downlevel),
        limits: limits_from_wgpu(&adapter.limits(), &downlevel),
    };

    log::info!(
        "probed adapter '{}' ({:?}): {} texture units, {} vertex attributes",
        profile.name,
        profile.backend,
        profile.limits.max_texture_units,
        profile.limits.max_vertex_attribs,
    );

    Ok(profile)
}

pub(crate) fn capabilities_from_wgpu(
    features: wgpu::Features,
    downlevel: &wgpu::DownlevelCapabilities,
) -> Capabilities {
    let anisotropic = downlevel
        .flags
        .contains(wgpu::DownlevelFlags::ANISOTROPIC_FILTERING);

    Capabilities::empty()
        .with(Capability::AnisotropicFilter, anisotropic)
        .with(Capability::FP64, features.contains(wgpu::Features::SHADER_F64))
        .with(
            Capability::DoubleAttributes,
            features.contains(wgpu::Features::VERTEX_ATTRIBUTE_64BIT),
        )
        .with(Capability::HardwareBuffer, true)
        .with(Capability::Instancing, true)
        .with(Capability::IntegerAttributes, true)
        .with(Capability::MultipleRenderTargets, true)
        .with(Capability::OcclusionQuery, true)
        .with(Capability::RenderTexture, true)
        .with(Capability::SamplerObjects, true)
        .with(Capability::Texture3D, true)
        .with(Capability::TextureCubemap, true)
        .with(Capability::TextureMulti, true)
        .with(
            Capability::TextureNPOT,
            downlevel
                .flags
                .contains(wgpu::DownlevelFlags::NON_POWER_OF_TWO_MIPMAPPED_TEXTURES),
        )
        .with(Capability::VertexArrayObjects, true)
}

pub(crate) fn limits_from_wgpu(
    limits: &wgpu::Limits,
    downlevel: &wgpu::DownlevelCapabilities,
) -> Limits {
    let anisotropic = downlevel
        .flags
        .contains(wgpu::DownlevelFlags::ANISOTROPIC_FILTERING);

    Limits {
        // wgpu clamps sampler anisotropy to 16.
        max_anisotropy: if anisotropic { 16 } else { 1 },
        max_color_attachments: limits.max_color_attachments,
        max_render_targets: limits.max_color_attachments,
        max_texture_size: limits.max_texture_dimension_2d,
        max_texture_units: limits.max_sampled_textures_per_shader_stage,
        max_vertex_attribs: limits.max_vertex_attributes,
    }
}
