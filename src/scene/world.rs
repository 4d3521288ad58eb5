use index_vec::IndexVec;

use super::GeometryId;
use crate::triangle_mesh::VertexBuffer;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveCounts {
    pub num_triangles: usize,
}

/// Aggregate primitive counts of all enabled geometries of a scene,
/// split by whether the geometry has motion blur.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct World {
    pub static_geometry: PrimitiveCounts,
    pub motion_blur: PrimitiveCounts,
}

impl World {
    /// Counts that a geometry with `time_steps` time steps contributes to.
    pub fn counts_mut(&mut self, time_steps: usize) -> &mut PrimitiveCounts {
        if time_steps == 1 {
            &mut self.static_geometry
        } else {
            &mut self.motion_blur
        }
    }
}

/// Committed vertex positions, indexed by geometry id.
#[derive(Clone, Debug, Default)]
pub struct VertexTable<'a> {
    entries: IndexVec<GeometryId, Option<VertexBuffer<'a>>>,
}

impl<'a> VertexTable<'a> {
    pub fn publish(&mut self, id: GeometryId, vertices: VertexBuffer<'a>) {
        while self.entries.len() <= id.index() {
            self.entries.push(None);
        }
        self.entries[id] = Some(vertices);
    }

    pub fn get(&self, id: GeometryId) -> Option<&VertexBuffer<'a>> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    pub fn clear(&mut self, id: GeometryId) {
        if let Some(entry) = self.entries.get_mut(id) {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn counts_by_time_steps() {
        let mut world = World::default();
        world.counts_mut(1).num_triangles += 3;
        world.counts_mut(2).num_triangles += 5;
        world.counts_mut(129).num_triangles += 1;
        assert!(world.static_geometry.num_triangles == 3);
        assert!(world.motion_blur.num_triangles == 6);
    }

    #[test]
    fn vertex_table_entries() {
        let mut table = VertexTable::default();
        let id = GeometryId::new(4);
        assert!(table.get(id).is_none());

        table.publish(id, VertexBuffer::allocate(7, 12).unwrap());
        assert!(table.get(id).map(VertexBuffer::len) == Some(7));
        assert!(table.get(GeometryId::new(2)).is_none());

        table.clear(id);
        assert!(table.get(id).is_none());
        table.clear(GeometryId::new(100));
    }
}
