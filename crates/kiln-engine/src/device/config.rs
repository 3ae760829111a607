/// Renderer configuration.
///
/// Keep this structure stable and minimal. Add fields only when a concrete
/// backend requirement exists.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Size in bytes of the device-owned per-instance vertex buffer.
    ///
    /// The maximum instance count of an instanced draw is this size divided by
    /// the stride of the instancing layout.
    pub instance_buffer_size: u64,

    /// Check setter arguments: linked shaders, renderable targets, hardware
    /// buffers, positive line width and point size.
    ///
    /// Draw-time checks (current context, bound shader and target, instance
    /// limits) always run.
    pub validate: bool,

    /// Number of texture units to track.
    ///
    /// `None` uses the backend limit.
    pub texture_units: Option<u32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            instance_buffer_size: 8192 * 64,
            validate: true,
            texture_units: None,
        }
    }
}
