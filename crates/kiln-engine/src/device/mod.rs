//! Device description and configuration.
//!
//! This module is responsible for:
//! - describing what the backend can do (`Capabilities`, `Limits`)
//! - renderer configuration (`RendererConfig`)
//! - probing a real adapter through wgpu to seed the above
//! - the error type shared by every render-state operation

mod caps;
mod config;
mod error;
mod probe;

pub use caps::{Capabilities, Capability, Limits};
pub use config::RendererConfig;
pub use error::{ErrorKind, RenderError};
pub use probe::{probe_adapter, AdapterProfile, ProbeInit};
