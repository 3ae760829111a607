//! Kiln engine crate.
//!
//! Render-state caching in front of an immediate-mode graphics backend:
//! lazily derived matrices, texture unit tracking, per-context vertex-array
//! reuse, and release notifications that keep every cache consistent with
//! the resources it refers to.

pub mod backend;
pub mod device;
pub mod lifecycle;
pub mod logging;
pub mod matrix;
pub mod render;
pub mod resource;
pub mod states;
pub mod texture;
pub mod vao;

pub use device::{Capabilities, Capability, RenderError, RendererConfig};
pub use render::RenderDevice;
