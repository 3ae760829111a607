use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::backend::{Backend, VertexArrayHandle};
use crate::device::RenderError;
use crate::lifecycle::{LifecycleBroker, ReleaseListener, ResourceId, Subscription};
use crate::resource::ContextId;

use super::VaoKey;

/// Counters of the vertex-array cache.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct VaoCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries purged because a resource in their key was released.
    pub evictions: u64,
    pub build_failures: u64,
}

struct VaoEntry {
    handle: VertexArrayHandle,
    subscriptions: Vec<Subscription>,
}

struct ContextEntry {
    vaos: HashMap<VaoKey, VaoEntry>,
    subscription: Subscription,
}

/// Vertex-array objects per context, keyed by the resources they capture.
///
/// Purged handles are not deleted on the spot: a release can fire while
/// another context is current, so they wait in a graveyard until the next
/// [`collect_garbage`](Self::collect_garbage).
pub struct VertexArrayCache {
    contexts: HashMap<ContextId, ContextEntry>,
    graveyard: Vec<(ContextId, VertexArrayHandle)>,
    enabled: bool,
    stats: VaoCacheStats,
    broker: LifecycleBroker,
    listener: Weak<dyn ReleaseListener>,
}

impl VertexArrayCache {
    /// Creates a cache registered as its own release listener.
    ///
    /// With `enabled == false` the cache stores nothing and every resolve
    /// re-specifies the attributes.
    pub fn shared(broker: LifecycleBroker, enabled: bool) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            let listener: Weak<dyn ReleaseListener> = weak.clone();
            RefCell::new(Self {
                contexts: HashMap::new(),
                graveyard: Vec::new(),
                enabled,
                stats: VaoCacheStats::default(),
                broker,
                listener,
            })
        })
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the vertex array for `key` in `context`, building it on a miss.
    ///
    /// On a miss `populate` specifies the attributes while the new object is
    /// bound, and it is unbound again afterwards. If `populate` fails the object
    /// is deleted and nothing is cached, so the next call with the same key
    /// builds again.
    ///
    /// In fallback mode `populate` runs on every call and `Ok(None)` is returned.
    pub fn resolve<B, F>(
        &mut self,
        backend: &mut B,
        context: ContextId,
        key: VaoKey,
        populate: F,
    ) -> Result<Option<VertexArrayHandle>, RenderError>
    where
        B: Backend,
        F: FnOnce(&mut B) -> Result<(), RenderError>,
    {
        if !self.enabled {
            populate(backend)?;
            return Ok(None);
        }

        if let Some(entry) = self.contexts.get(&context).and_then(|c| c.vaos.get(&key)) {
            self.stats.hits += 1;
            return Ok(Some(entry.handle));
        }

        self.stats.misses += 1;

        let Some(handle) = backend.create_vertex_array() else {
            self.stats.build_failures += 1;
            log::error!("{}", RenderError::VertexArrayCreation);
            return Err(RenderError::VertexArrayCreation);
        };

        backend.bind_vertex_array(Some(handle));
        if let Err(err) = populate(backend) {
            backend.bind_vertex_array(None);
            backend.delete_vertex_array(context, handle);
            self.stats.build_failures += 1;
            return Err(err);
        }
        backend.bind_vertex_array(None);

        let subscriptions = key
            .resources()
            .map(|id| self.broker.subscribe(id, self.listener.clone()))
            .collect();

        let entry = self.context_entry(context);
        entry.vaos.insert(key, VaoEntry { handle, subscriptions });

        log::debug!("built vertex array {handle:?} in context {context}");
        Ok(Some(handle))
    }

    /// Deletes the purged handles owned by `current`. Returns how many were deleted.
    ///
    /// Handles of other contexts stay queued until their context is current
    /// again, or are dropped when it is released.
    pub fn collect_garbage<B: Backend>(&mut self, backend: &mut B, current: ContextId) -> usize {
        let mut deleted = 0;
        self.graveyard.retain(|&(context, handle)| {
            if context != current {
                return true;
            }
            backend.delete_vertex_array(context, handle);
            deleted += 1;
            false
        });
        deleted
    }

    /// Forgets every cached vertex array.
    ///
    /// Those owned by `current` are deleted now, together with its queued
    /// handles. Those of other contexts move to the graveyard; their contexts
    /// stay subscribed so a release still discards them.
    pub fn clear<B: Backend>(&mut self, backend: &mut B, current: Option<ContextId>) {
        let mut emptied = Vec::new();
        for (&context, entry) in &mut self.contexts {
            for (_, vao) in entry.vaos.drain() {
                for sub in vao.subscriptions {
                    self.broker.unsubscribe(sub);
                }
                if Some(context) == current {
                    backend.delete_vertex_array(context, vao.handle);
                } else {
                    self.graveyard.push((context, vao.handle));
                }
            }
            if !self.graveyard.iter().any(|(owner, _)| *owner == context) {
                emptied.push(context);
            }
        }

        for context in emptied {
            if let Some(entry) = self.contexts.remove(&context) {
                self.broker.unsubscribe(entry.subscription);
            }
        }

        if let Some(current) = current {
            self.collect_garbage(backend, current);
        }
    }

    /// Number of cached vertex arrays across all contexts.
    pub fn len(&self) -> usize {
        self.contexts.values().map(|c| c.vaos.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached vertex arrays in `context`.
    pub fn context_len(&self, context: ContextId) -> usize {
        self.contexts.get(&context).map_or(0, |c| c.vaos.len())
    }

    pub fn contains(&self, context: ContextId, key: &VaoKey) -> bool {
        self.contexts
            .get(&context)
            .is_some_and(|c| c.vaos.contains_key(key))
    }

    /// Handles waiting for deletion.
    #[inline]
    pub fn pending_deletions(&self) -> usize {
        self.graveyard.len()
    }

    #[inline]
    pub fn stats(&self) -> VaoCacheStats {
        self.stats
    }

    fn context_entry(&mut self, context: ContextId) -> &mut ContextEntry {
        let broker = &self.broker;
        let listener = &self.listener;
        self.contexts.entry(context).or_insert_with(|| ContextEntry {
            vaos: HashMap::new(),
            subscription: broker.subscribe(context, listener.clone()),
        })
    }

    fn release(&mut self, id: ResourceId) {
        // A context takes its vertex arrays with it.
        if let Some(entry) = self.contexts.remove(&id) {
            log::debug!(
                "context {id} released, dropping {} vertex array(s)",
                entry.vaos.len()
            );
            for (_, vao) in entry.vaos {
                for sub in vao.subscriptions {
                    self.broker.unsubscribe(sub);
                }
            }
            self.graveyard.retain(|(context, _)| *context != id);
            return;
        }

        let mut purged = 0;
        for (&context, entry) in &mut self.contexts {
            entry.vaos.retain(|key, vao| {
                if !key.references(id) {
                    return true;
                }
                for sub in vao.subscriptions.drain(..) {
                    self.broker.unsubscribe(sub);
                }
                self.graveyard.push((context, vao.handle));
                purged += 1;
                false
            });
        }

        if purged > 0 {
            self.stats.evictions += purged;
            log::debug!("resource {id} released, purged {purged} vertex array(s)");
        }
    }
}

impl ReleaseListener for RefCell<VertexArrayCache> {
    fn on_release(&self, id: ResourceId) {
        match self.try_borrow_mut() {
            Ok(mut cache) => cache.release(id),
            Err(_) => log::error!("resource {id} released while the vertex-array cache is borrowed"),
        }
    }
}

impl Drop for VertexArrayCache {
    fn drop(&mut self) {
        for (_, entry) in self.contexts.drain() {
            self.broker.unsubscribe(entry.subscription);
            for (_, vao) in entry.vaos {
                for sub in vao.subscriptions {
                    self.broker.unsubscribe(sub);
                }
            }
        }
        if !self.graveyard.is_empty() {
            log::debug!(
                "{} vertex array(s) left to their contexts",
                self.graveyard.len()
            );
        }
    }
}
