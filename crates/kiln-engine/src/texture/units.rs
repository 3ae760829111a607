use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::backend::Backend;
use crate::device::RenderError;
use crate::lifecycle::{Handle, LifecycleBroker, ReleaseListener, ResourceId, ResourceRef, Subscription};
use crate::resource::Texture;

use super::SamplerConfig;

struct BoundTexture {
    texture: ResourceRef<Texture>,
    subscription: Subscription,
}

#[derive(Default)]
struct TextureUnit {
    texture: Option<BoundTexture>,
    sampler: SamplerConfig,
    sampler_applied: bool,
}

/// Per-unit texture and sampler state with a queue of units awaiting backend work.
///
/// Textures are referenced, never owned. A released texture is removed from
/// every unit holding it.
pub struct TextureUnitTable {
    units: Vec<TextureUnit>,
    dirty: Vec<u32>,
    broker: LifecycleBroker,
    listener: Weak<dyn ReleaseListener>,
}

impl TextureUnitTable {
    /// Creates a table with `unit_count` units, registered as its own release listener.
    pub fn shared(unit_count: u32, broker: LifecycleBroker) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            let listener: Weak<dyn ReleaseListener> = weak.clone();
            RefCell::new(Self {
                units: (0..unit_count).map(|_| TextureUnit::default()).collect(),
                dirty: Vec::new(),
                broker,
                listener,
            })
        })
    }

    #[inline]
    pub fn unit_count(&self) -> u32 {
        self.units.len() as u32
    }

    /// Binds `texture` to `unit`.
    ///
    /// Returns `Ok(false)` when the unit already holds that texture.
    pub fn bind(&mut self, unit: u32, texture: Option<&Handle<Texture>>) -> Result<bool, RenderError> {
        let index = self.check_unit(unit)?;

        let current = self.units[index].texture.as_ref().map(|b| b.texture.id());
        if current == texture.map(|t| t.id()) {
            return Ok(false);
        }

        if let Some(old) = self.units[index].texture.take() {
            self.broker.unsubscribe(old.subscription);
        }

        let slot = &mut self.units[index];
        if let Some(texture) = texture {
            if slot.sampler.set_use_mipmaps(texture.has_mipmaps()) {
                slot.sampler_applied = false;
            }
            slot.texture = Some(BoundTexture {
                texture: ResourceRef::new(texture),
                subscription: self.broker.subscribe(texture.id(), self.listener.clone()),
            });
        }

        self.enqueue(unit);
        Ok(true)
    }

    /// Replaces the sampler of `unit`. Always queues the unit, even for an identical config.
    pub fn set_sampler(&mut self, unit: u32, config: SamplerConfig) -> Result<(), RenderError> {
        let index = self.check_unit(unit)?;

        let slot = &mut self.units[index];
        slot.sampler = config;
        slot.sampler_applied = false;
        if let Some(texture) = slot.texture.as_ref().and_then(|b| b.texture.get()) {
            slot.sampler.set_use_mipmaps(texture.has_mipmaps());
        }

        self.enqueue(unit);
        Ok(())
    }

    pub fn texture(&self, unit: u32) -> Option<Handle<Texture>> {
        self.units
            .get(unit as usize)?
            .texture
            .as_ref()
            .and_then(|b| b.texture.get())
    }

    pub fn sampler(&self, unit: u32) -> Option<SamplerConfig> {
        self.units.get(unit as usize).map(|u| u.sampler)
    }

    pub fn is_sampler_applied(&self, unit: u32) -> bool {
        self.units
            .get(unit as usize)
            .is_some_and(|u| u.sampler_applied)
    }

    /// Units queued since the last flush, in queue order.
    #[inline]
    pub fn dirty_units(&self) -> &[u32] {
        &self.dirty
    }

    #[inline]
    pub fn has_dirty_units(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Applies pending samplers and drains the queue.
    ///
    /// Empty units are dequeued without backend work. Returns the number of
    /// samplers applied.
    pub fn flush<B: Backend>(&mut self, backend: &mut B, use_sampler_objects: bool) -> usize {
        let mut applied = 0;

        for unit in self.dirty.drain(..) {
            let slot = &mut self.units[unit as usize];
            if slot.sampler_applied {
                continue;
            }
            let Some(texture) = slot.texture.as_ref().and_then(|b| b.texture.get()) else {
                continue;
            };

            if use_sampler_objects {
                backend.bind_sampler(unit, &slot.sampler);
            } else {
                backend.apply_sampler(unit, &slot.sampler, &texture);
            }
            slot.sampler_applied = true;
            applied += 1;
        }

        applied
    }

    /// Re-binds every unit holding a live texture.
    pub fn bind_all<B: Backend>(&self, backend: &mut B) {
        for (unit, slot) in self.units.iter().enumerate() {
            if let Some(texture) = slot.texture.as_ref().and_then(|b| b.texture.get()) {
                backend.bind_texture(unit as u32, &texture);
            }
        }
    }

    fn check_unit(&self, unit: u32) -> Result<usize, RenderError> {
        if unit >= self.unit_count() {
            let err = RenderError::TextureUnitOutOfRange {
                unit,
                max: self.unit_count(),
            };
            log::error!("{err}");
            return Err(err);
        }
        Ok(unit as usize)
    }

    fn enqueue(&mut self, unit: u32) {
        if !self.dirty.contains(&unit) {
            self.dirty.push(unit);
        }
    }

    fn release(&mut self, id: ResourceId) {
        for slot in &mut self.units {
            if slot.texture.as_ref().is_some_and(|b| b.texture.id() == id) {
                slot.texture = None;
            }
        }
    }
}

impl ReleaseListener for RefCell<TextureUnitTable> {
    fn on_release(&self, id: ResourceId) {
        match self.try_borrow_mut() {
            Ok(mut table) => table.release(id),
            Err(_) => log::error!("texture {id} released while the unit table is borrowed"),
        }
    }
}

impl Drop for TextureUnitTable {
    fn drop(&mut self) {
        for slot in &mut self.units {
            if let Some(bound) = slot.texture.take() {
                self.broker.unsubscribe(bound.subscription);
            }
        }
    }
}
