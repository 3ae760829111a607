use crate::lifecycle::ResourceId;

/// Identity of everything a vertex-array object captures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VaoKey {
    pub index_buffer: Option<ResourceId>,
    pub vertex_buffer: ResourceId,
    pub vertex_layout: ResourceId,
    pub instancing_layout: Option<ResourceId>,
}

impl VaoKey {
    /// Whether releasing `id` invalidates this key.
    pub fn references(&self, id: ResourceId) -> bool {
        self.index_buffer == Some(id)
            || self.vertex_buffer == id
            || self.vertex_layout == id
            || self.instancing_layout == Some(id)
    }

    /// Distinct resources the key depends on.
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        let all = [
            self.index_buffer,
            Some(self.vertex_buffer),
            Some(self.vertex_layout),
            self.instancing_layout,
        ];
        all.into_iter()
            .enumerate()
            .filter_map(move |(i, id)| {
                let id = id?;
                // Skip repeats (the same layout in both slots).
                let seen = all[..i].contains(&Some(id));
                (!seen).then_some(id)
            })
    }
}
