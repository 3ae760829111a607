//! Per-context cache of vertex-array objects.
//!
//! A vertex-array object captures the attribute setup of one combination of
//! buffers and layouts. Building one costs a full pass over every attribute, so
//! they are kept per context and reused until one of their inputs goes away.

mod attributes;
mod cache;
mod key;

pub use attributes::{specify_attributes, VertexSource};
pub use cache::{VaoCacheStats, VertexArrayCache};
pub use key::VaoKey;
