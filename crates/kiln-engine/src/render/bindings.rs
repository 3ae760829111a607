use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::lifecycle::{Handle, LifecycleBroker, ReleaseListener, ResourceId, ResourceRef, Subscription};
use crate::resource::{IndexBuffer, RenderTarget, Shader, VertexBuffer, VertexLayout};

use super::DirtyFlags;

pub(super) struct Bound<T> {
    resource: ResourceRef<T>,
    subscription: Subscription,
}

impl<T> Bound<T> {
    #[inline]
    fn id(&self) -> ResourceId {
        self.resource.id()
    }
}

/// Currently bound resources plus the pending dirty set.
///
/// Shared with the broker so that a released resource unbinds itself and
/// marks the state that depended on it.
pub(super) struct Bindings {
    pub(super) shader: Option<Bound<Shader>>,
    pub(super) target: Option<Bound<RenderTarget>>,
    pub(super) index_buffer: Option<Bound<IndexBuffer>>,
    pub(super) vertex_buffer: Option<Bound<VertexBuffer>>,
    pub(super) instancing_layout: Option<Bound<VertexLayout>>,
    pub(super) dirty: DirtyFlags,

    pub(super) broker: LifecycleBroker,
    pub(super) listener: Weak<dyn ReleaseListener>,
}

impl Bindings {
    pub(super) fn shared(broker: LifecycleBroker, dirty: DirtyFlags) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            let listener: Weak<dyn ReleaseListener> = weak.clone();
            RefCell::new(Self {
                shader: None,
                target: None,
                index_buffer: None,
                vertex_buffer: None,
                instancing_layout: None,
                dirty,
                broker,
                listener,
            })
        })
    }

    pub(super) fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    fn release(&mut self, id: ResourceId) {
        if clear_if(&mut self.shader, id) {
            self.dirty |= DirtyFlags::SHADER;
        }
        // Nothing to redo for a target; the next draw reports it missing.
        clear_if(&mut self.target, id);

        let vertex_array_inputs = [
            clear_if(&mut self.index_buffer, id),
            clear_if(&mut self.vertex_buffer, id),
            clear_if(&mut self.instancing_layout, id),
        ];
        if vertex_array_inputs.contains(&true) {
            self.dirty |= DirtyFlags::VERTEX_ARRAY;
        }
    }

    fn unbind_all(&mut self) {
        let broker = self.broker.clone();
        let subs = [
            self.shader.take().map(|b| b.subscription),
            self.target.take().map(|b| b.subscription),
            self.index_buffer.take().map(|b| b.subscription),
            self.vertex_buffer.take().map(|b| b.subscription),
            self.instancing_layout.take().map(|b| b.subscription),
        ];
        for sub in subs.into_iter().flatten() {
            broker.unsubscribe(sub);
        }
    }
}

/// Identity of the resource in `slot`.
#[inline]
pub(super) fn bound_id<T>(slot: &Option<Bound<T>>) -> Option<ResourceId> {
    slot.as_ref().map(Bound::id)
}

/// Strong handle to the resource in `slot`, if it is still alive.
#[inline]
pub(super) fn bound_get<T>(slot: &Option<Bound<T>>) -> Option<Handle<T>> {
    slot.as_ref().and_then(|b| b.resource.get())
}

/// Replaces the resource in `slot`, moving the release subscription along.
///
/// Returns `false` when `next` is already bound.
pub(super) fn rebind<T>(
    broker: &LifecycleBroker,
    listener: &Weak<dyn ReleaseListener>,
    slot: &mut Option<Bound<T>>,
    next: Option<&Handle<T>>,
) -> bool {
    if bound_id(slot) == next.map(|h| h.id()) {
        return false;
    }

    if let Some(old) = slot.take() {
        broker.unsubscribe(old.subscription);
    }

    *slot = next.map(|handle| Bound {
        resource: ResourceRef::new(handle),
        subscription: broker.subscribe(handle.id(), listener.clone()),
    });
    true
}

fn clear_if<T>(slot: &mut Option<Bound<T>>, id: ResourceId) -> bool {
    if bound_id(slot) == Some(id) {
        *slot = None;
        true
    } else {
        false
    }
}

impl ReleaseListener for RefCell<Bindings> {
    fn on_release(&self, id: ResourceId) {
        match self.try_borrow_mut() {
            Ok(mut bindings) => bindings.release(id),
            Err(_) => log::error!("resource {id} released while render bindings are borrowed"),
        }
    }
}

impl Drop for Bindings {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
