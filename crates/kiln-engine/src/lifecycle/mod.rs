//! Resource lifetime tracking.
//!
//! Resources (buffers, layouts, contexts, shaders, textures) are wrapped in a
//! [`Tracked`] value created by a [`LifecycleBroker`]. When the last strong
//! [`Handle`] is dropped the broker notifies every subscribed
//! [`ReleaseListener`] synchronously, before the identity can be observed again.
//!
//! Caches keep [`ResourceRef`]s (non-owning) plus a [`Subscription`], never a
//! strong handle.

mod broker;
mod id;
mod tracked;

pub use broker::{LifecycleBroker, ReleaseListener, Subscription};
pub use id::ResourceId;
pub use tracked::{Handle, ResourceRef, Tracked};
