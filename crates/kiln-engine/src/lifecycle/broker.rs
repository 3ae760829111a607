use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use super::tracked::Tracked;
use super::{Handle, ResourceId};

/// Observer of resource releases.
///
/// Called synchronously on the releasing thread. Implementations must not
/// panic; they may subscribe or unsubscribe through the broker while running.
pub trait ReleaseListener {
    fn on_release(&self, id: ResourceId);
}

/// Token identifying one listener attached to one resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Subscription {
    resource: ResourceId,
    token: u64,
}

struct Subscriber {
    token: u64,
    listener: Weak<dyn ReleaseListener>,
}

#[derive(Default)]
pub(super) struct Registry {
    next_token: u64,
    subscribers: HashMap<ResourceId, Vec<Subscriber>>,

    /// Tokens taken out of `subscribers` by an ongoing dispatch. Removing a token
    /// from here cancels its pending callback.
    in_flight: HashSet<u64>,
}

/// Subscription registry mapping resource identity to weak listeners.
///
/// The broker owns no resource. Cloning it yields another handle to the same
/// registry.
#[derive(Clone, Default)]
pub struct LifecycleBroker {
    registry: Rc<RefCell<Registry>>,
}

impl LifecycleBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_registry(registry: Rc<RefCell<Registry>>) -> Self {
        Self { registry }
    }

    /// Wraps `value` into a tracked resource whose drop notifies this broker.
    pub fn track<T>(&self, value: T) -> Handle<T> {
        Rc::new(Tracked::new(
            ResourceId::next(),
            Rc::downgrade(&self.registry),
            value,
        ))
    }

    /// Attaches `listener` to the release of `resource`.
    pub fn subscribe(
        &self,
        resource: ResourceId,
        listener: Weak<dyn ReleaseListener>,
    ) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let token = registry.next_token;
        registry.next_token += 1;

        registry
            .subscribers
            .entry(resource)
            .or_default()
            .push(Subscriber { token, listener });

        Subscription { resource, token }
    }

    /// Detaches a listener. Safe to call from inside a release callback,
    /// including for the subscription currently being dispatched.
    ///
    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry.borrow_mut();

        if registry.in_flight.remove(&subscription.token) {
            return true;
        }

        let Some(list) = registry.subscribers.get_mut(&subscription.resource) else {
            return false;
        };

        let before = list.len();
        list.retain(|s| s.token != subscription.token);
        let removed = list.len() != before;

        if list.is_empty() {
            registry.subscribers.remove(&subscription.resource);
        }

        removed
    }

    /// Number of live listeners attached to `resource`.
    pub fn subscriber_count(&self, resource: ResourceId) -> usize {
        self.registry
            .borrow()
            .subscribers
            .get(&resource)
            .map_or(0, |list| {
                list.iter().filter(|s| s.listener.strong_count() > 0).count()
            })
    }

    /// Fires the release event of `resource`.
    ///
    /// Every listener attached at the time of the call runs at most once; the
    /// subscription list is consumed, so a second notification is a no-op.
    pub fn notify_release(&self, resource: ResourceId) {
        let subscribers = {
            let mut registry = self.registry.borrow_mut();
            let Some(list) = registry.subscribers.remove(&resource) else {
                return;
            };
            registry.in_flight.extend(list.iter().map(|s| s.token));
            list
        };

        log::trace!(
            "releasing resource {resource} ({} listener(s))",
            subscribers.len()
        );

        for subscriber in subscribers {
            // Skip listeners detached by an earlier callback of this dispatch.
            if !self.registry.borrow_mut().in_flight.remove(&subscriber.token) {
                continue;
            }

            if let Some(listener) = subscriber.listener.upgrade() {
                listener.on_release(resource);
            }
        }
    }
}
