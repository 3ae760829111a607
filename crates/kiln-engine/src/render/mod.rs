//! Render-state tracking and draw submission.
//!
//! State setters only record what changed. The backend sees nothing until a
//! draw runs the reconciliation pass, which applies pending state in a fixed
//! order and then issues the draw.

mod bindings;
mod device;
mod dirty;

pub use device::RenderDevice;
pub use dirty::DirtyFlags;

#[cfg(test)]
mod tests;
