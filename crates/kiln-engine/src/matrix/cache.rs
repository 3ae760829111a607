use glam::{Mat4, Vec4};

use crate::backend::UniformLocation;
use crate::resource::ShaderUniform;

use super::{Derivation, MatrixType};

#[derive(Debug, Copy, Clone)]
struct MatrixUnit {
    matrix: Mat4,
    updated: bool,
    location: Option<UniformLocation>,
}

impl Default for MatrixUnit {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            updated: true,
            location: None,
        }
    }
}

/// Base and derived transform slots.
///
/// Matrices follow the row-vector convention: a point is transformed as
/// `p · World · View · Proj`, so combined slots concatenate left to right.
#[derive(Debug, Default)]
pub struct MatrixCache {
    units: [MatrixUnit; MatrixType::COUNT],
    recomputes: [u32; MatrixType::COUNT],
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `matrix` in `ty` and invalidates every slot derived from it.
    ///
    /// Only Projection, View and World are writable. Returns `false`, leaving
    /// the cache untouched, for a derived slot.
    pub fn set(&mut self, ty: MatrixType, matrix: Mat4) -> bool {
        if !ty.is_base() {
            log::warn!("{ty:?} is derived and cannot be set");
            return false;
        }

        let unit = &mut self.units[ty.index()];
        unit.matrix = matrix;
        unit.updated = true;

        for dep in ty.dependents() {
            self.units[dep.index()].updated = false;
        }
        true
    }

    /// Current value of `ty`, recomputing stale inputs first.
    pub fn get(&mut self, ty: MatrixType) -> Mat4 {
        self.ensure_updated(ty);
        self.units[ty.index()].matrix
    }

    #[inline]
    pub fn is_updated(&self, ty: MatrixType) -> bool {
        self.units[ty.index()].updated
    }

    /// How many times `ty` has been recomputed since creation.
    #[inline]
    pub fn recompute_count(&self, ty: MatrixType) -> u32 {
        self.recomputes[ty.index()]
    }

    /// Re-queries every slot's uniform location, typically after a shader change.
    pub fn bind_locations(&mut self, mut query: impl FnMut(ShaderUniform) -> Option<UniformLocation>) {
        for ty in MatrixType::ALL {
            self.units[ty.index()].location = query(ty.uniform());
        }
    }

    #[inline]
    pub fn location(&self, ty: MatrixType) -> Option<UniformLocation> {
        self.units[ty.index()].location
    }

    /// Sends every slot the active shader reads. Returns the number of slots sent.
    pub fn upload(&mut self, mut send: impl FnMut(UniformLocation, &Mat4)) -> usize {
        let mut sent = 0;
        for ty in MatrixType::ALL {
            let Some(location) = self.units[ty.index()].location else {
                continue;
            };

            self.ensure_updated(ty);
            send(location, &self.units[ty.index()].matrix);
            sent += 1;
        }
        sent
    }

    fn ensure_updated(&mut self, ty: MatrixType) {
        if self.units[ty.index()].updated {
            return;
        }

        match ty.derivation() {
            // A stale base slot keeps its stored value.
            Derivation::Base => {}

            Derivation::Concatenate(lhs, rhs) => {
                let m = self.get(lhs) * self.get(rhs);
                self.store(ty, m);
            }

            Derivation::ConcatenateAffine(lhs, rhs) => {
                let mut m = self.get(lhs) * self.get(rhs);
                m.w_axis = Vec4::W;
                self.store(ty, m);
            }

            Derivation::Inverse(source) => {
                let m = self.get(source);
                match invert(&m) {
                    Some(inverse) => self.store(ty, inverse),
                    None => {
                        log::warn!("failed to invert {source:?} matrix, keeping previous {ty:?}");
                        self.recomputes[ty.index()] += 1;
                    }
                }
            }
        }

        self.units[ty.index()].updated = true;
    }

    fn store(&mut self, ty: MatrixType, matrix: Mat4) {
        self.units[ty.index()].matrix = matrix;
        self.recomputes[ty.index()] += 1;
    }
}

fn invert(m: &Mat4) -> Option<Mat4> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(m.inverse())
}
