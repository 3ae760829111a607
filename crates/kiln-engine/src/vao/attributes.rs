use std::ops::RangeInclusive;

use crate::backend::{AttributeBinding, Backend, BufferHandle};
use crate::device::{Capabilities, RenderError};
use crate::lifecycle::ResourceId;
use crate::resource::{VertexComponent, VertexLayout};

/// One buffer feeding attributes, with the layout describing it.
#[derive(Debug, Copy, Clone)]
pub struct VertexSource<'a> {
    pub buffer: BufferHandle,
    pub start_offset: u32,
    pub layout: &'a VertexLayout,
    pub layout_id: ResourceId,
}

/// Specifies every attribute location from `vertices` and `instances`, then
/// binds `index_buffer`.
///
/// Every location is either enabled or explicitly disabled, so nothing left
/// over from a previous configuration survives. A component type the backend
/// cannot feed aborts the whole pass before any backend call.
pub fn specify_attributes<B: Backend>(
    backend: &mut B,
    caps: &Capabilities,
    vertices: &VertexSource<'_>,
    instances: Option<&VertexSource<'_>>,
    index_buffer: Option<BufferHandle>,
) -> Result<(), RenderError> {
    check_supported(caps, vertices, VertexComponent::VERTEX_RANGE)?;
    if let Some(instances) = instances {
        check_supported(caps, instances, VertexComponent::INSTANCE_RANGE)?;
    }

    bind_range(backend, vertices, VertexComponent::VERTEX_RANGE, false);

    match instances {
        Some(instances) => {
            bind_range(backend, instances, VertexComponent::INSTANCE_RANGE, true);
        }
        None => {
            for i in VertexComponent::INSTANCE_RANGE {
                backend.disable_attribute(VertexComponent::ALL[i].attribute_index());
            }
        }
    }

    backend.bind_index_buffer(index_buffer);
    Ok(())
}

fn check_supported(
    caps: &Capabilities,
    source: &VertexSource<'_>,
    range: RangeInclusive<usize>,
) -> Result<(), RenderError> {
    let unsupported = source
        .layout
        .enabled()
        .filter(|(component, _)| range.contains(&component.index()))
        .find(|(_, lc)| !caps.is_component_type_supported(lc.ty));

    match unsupported {
        Some((component, lc)) => {
            let err = RenderError::UnsupportedComponent {
                layout: source.layout_id,
                component,
                ty: lc.ty,
            };
            log::error!("{err}");
            Err(err)
        }
        None => Ok(()),
    }
}

fn bind_range<B: Backend>(
    backend: &mut B,
    source: &VertexSource<'_>,
    range: RangeInclusive<usize>,
    per_instance: bool,
) {
    backend.bind_vertex_buffer(source.buffer);

    let stride = source.layout.stride();
    for i in range {
        let component = VertexComponent::ALL[i];
        let location = component.attribute_index();

        let Some(lc) = source.layout.component(component) else {
            backend.disable_attribute(location);
            continue;
        };

        backend.enable_attribute(
            location,
            &AttributeBinding {
                ty: lc.ty,
                offset: u64::from(source.start_offset) + u64::from(lc.offset),
                stride,
                per_instance,
            },
        );
    }
}
