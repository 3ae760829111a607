//! Flat fixed-function state.
//!
//! `RenderStates` is plain data. The render device keeps one copy and hands it
//! to the backend in full on every draw; nothing here is diffed.

mod enums;
mod render_states;

pub use enums::{
    BlendFunc, ClearBuffers, Comparison, FaceFilling, FaceSide, PrimitiveMode, QueryCondition,
    Rect, RendererParameter, StencilOp,
};
pub use render_states::{RenderStates, StencilFace};
