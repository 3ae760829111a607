//! Named transform slots with lazily recomputed derived forms.

mod cache;
mod kind;

pub use cache::MatrixCache;
pub use kind::{Derivation, MatrixType};
