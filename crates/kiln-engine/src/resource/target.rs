use std::cell::Cell;

use crate::lifecycle::ResourceId;

/// Identity of a backend rendering context.
///
/// Contexts are tracked resources like any other; the identity is the one the
/// broker assigned to the `RenderContext` handle.
pub type ContextId = ResourceId;

/// One backend rendering context (owned by the windowing layer).
///
/// Composite objects created while a context is current are only valid inside
/// that context.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    label: Option<String>,
}

impl RenderContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Something draws can land in (window surface, render texture).
///
/// The size is interior-mutable so the owner can resize a target that the
/// tracker references.
#[derive(Debug)]
pub struct RenderTarget {
    size: Cell<(u32, u32)>,
    renderable: bool,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new((width, height)),
            renderable: true,
        }
    }

    pub fn with_renderable(mut self, renderable: bool) -> Self {
        self.renderable = renderable;
        self
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    #[inline]
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }
}
