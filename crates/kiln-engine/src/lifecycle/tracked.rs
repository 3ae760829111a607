use core::fmt;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use super::broker::{LifecycleBroker, Registry};
use super::ResourceId;

/// Strong, shared handle to a tracked resource.
pub type Handle<T> = Rc<Tracked<T>>;

/// A resource value paired with its identity.
///
/// Dropping the value fires the release notification of the broker that
/// created it. If the broker is already gone the drop is silent.
pub struct Tracked<T> {
    id: ResourceId,
    registry: Weak<RefCell<Registry>>,
    value: T,
}

impl<T> Tracked<T> {
    pub(super) fn new(id: ResourceId, registry: Weak<RefCell<Registry>>, value: T) -> Self {
        Self {
            id,
            registry,
            value,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            LifecycleBroker::from_registry(registry).notify_release(self.id);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

/// Non-owning reference to a tracked resource.
///
/// Holding a `ResourceRef` never extends the lifetime of the resource.
pub struct ResourceRef<T> {
    id: ResourceId,
    ptr: Weak<Tracked<T>>,
}

impl<T> ResourceRef<T> {
    pub fn new(handle: &Handle<T>) -> Self {
        Self {
            id: handle.id(),
            ptr: Rc::downgrade(handle),
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Upgrades to a strong handle if the resource is still alive.
    #[inline]
    pub fn get(&self) -> Option<Handle<T>> {
        self.ptr.upgrade()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.ptr.strong_count() > 0
    }
}

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            ptr: Weak::clone(&self.ptr),
        }
    }
}

impl<T> fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
