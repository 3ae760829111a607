//! Texture unit bindings and their samplers.

mod sampler;
mod units;

pub use sampler::{SamplerConfig, SamplerFilter, SamplerWrap};
pub use units::TextureUnitTable;
