//! Scene owning the triangle meshes, the primitive aggregate and the committed vertex table.

mod flags;
mod world;

use index_vec::IndexVec;
use tracing::{debug, warn};

use crate::{
    buffer::BufferView,
    error::{MeshError, Result},
    triangle_mesh::{BufferKind, InterpolationOutputs, InterpolationQuery, TriangleMesh},
};

pub use flags::SceneFlags;
pub use world::{PrimitiveCounts, VertexTable, World};

index_vec::define_index_type! {
    pub struct GeometryId = u32;
}

#[derive(Clone, Debug, Default)]
pub struct Scene<'a> {
    flags: SceneFlags,
    world: World,
    vertex_table: VertexTable<'a>,
    /// Detached geometries leave an empty slot, ids are never reused
    geometries: IndexVec<GeometryId, Option<TriangleMesh<'a>>>,
}

impl<'a> Scene<'a> {
    pub fn new(flags: SceneFlags) -> Self {
        Scene {
            flags,
            ..Default::default()
        }
    }

    pub fn flags(&self) -> &SceneFlags {
        &self.flags
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn vertex_table(&self) -> &VertexTable<'a> {
        &self.vertex_table
    }

    /// Takes ownership of a mesh. An enabled mesh is added to the world aggregate immediately.
    pub fn attach(&mut self, mut mesh: TriangleMesh<'a>) -> GeometryId {
        if mesh.is_enabled() {
            mesh.enabling(&mut self.world);
        }
        mesh.mark_modified();
        let id = self.geometries.push(Some(mesh));
        debug!(?id, "attached geometry");
        id
    }

    pub fn detach(&mut self, id: GeometryId) -> Result<TriangleMesh<'a>> {
        let mesh = self
            .geometries
            .get_mut(id)
            .and_then(Option::take)
            .ok_or_else(|| unknown_geometry(id))?;
        if mesh.is_enabled() {
            mesh.disabling(&mut self.world);
        }
        self.vertex_table.clear(id);
        debug!(?id, "detached geometry");
        Ok(mesh)
    }

    pub fn geometry(&self, id: GeometryId) -> Result<&TriangleMesh<'a>> {
        self.geometries
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| unknown_geometry(id))
    }

    pub fn enable(&mut self, id: GeometryId) -> Result<()> {
        let mesh = mesh_mut(&mut self.geometries, id)?;
        if !mesh.is_enabled() {
            mesh.enabling(&mut self.world);
            mesh.set_enabled(true);
        }
        Ok(())
    }

    pub fn disable(&mut self, id: GeometryId) -> Result<()> {
        let mesh = mesh_mut(&mut self.geometries, id)?;
        if mesh.is_enabled() {
            mesh.disabling(&mut self.world);
            mesh.set_enabled(false);
        }
        Ok(())
    }

    pub fn new_buffer(
        &mut self,
        id: GeometryId,
        kind: BufferKind,
        stride: usize,
        count: usize,
    ) -> Result<&mut [u8]> {
        mesh_mut(&mut self.geometries, id)?.new_buffer_with(kind, stride, count, Some(&mut self.world))
    }

    pub fn set_buffer(
        &mut self,
        id: GeometryId,
        kind: BufferKind,
        data: &'a [u8],
        offset: usize,
        stride: usize,
        count: Option<usize>,
    ) -> Result<()> {
        mesh_mut(&mut self.geometries, id)?.set_buffer_with(
            kind,
            data,
            offset,
            stride,
            count,
            Some(&mut self.world),
        )
    }

    pub fn get_buffer(&self, id: GeometryId, kind: BufferKind) -> Result<BufferView<'_>> {
        self.geometry(id)?.get_buffer(kind)
    }

    pub fn get_buffer_mut(&mut self, id: GeometryId, kind: BufferKind) -> Result<&mut [u8]> {
        mesh_mut(&mut self.geometries, id)?.get_buffer_mut(kind)
    }

    pub fn set_mask(&mut self, id: GeometryId, mask: u32) -> Result<()> {
        mesh_mut(&mut self.geometries, id)?.set_mask(mask);
        Ok(())
    }

    /// Interpolates attributes of a geometry. Debug builds reject scenes created
    /// without the `interpolate` flag.
    pub fn interpolate(
        &self,
        id: GeometryId,
        query: &InterpolationQuery,
        outputs: &mut InterpolationOutputs,
    ) -> Result<()> {
        if cfg!(debug_assertions) && !self.flags.interpolate() {
            return Err(MeshError::invalid_operation(
                "scene was not created with the interpolate flag",
            ));
        }
        self.geometry(id)?.interpolate(query, outputs)
    }

    /// Freezes all modified geometries. Nothing is published unless every one of
    /// them passes `pre_commit`.
    pub fn commit(&mut self) -> Result<()> {
        for (id, mesh) in self.modified_geometries() {
            if let Err(err) = mesh.pre_commit() {
                debug!(?id, %err, "commit aborted");
                return Err(err);
            }
        }

        let flags = self.flags;
        let mut committed = 0usize;
        for (id, slot) in self.geometries.iter_mut_enumerated() {
            let Some(mesh) = slot.as_mut().filter(|mesh| mesh.is_modified()) else {
                continue;
            };
            if let Err(defect) = mesh.validate() {
                warn!(?id, %defect, "committing invalid geometry");
            }
            mesh.post_commit(id, &mut self.vertex_table);
            if !flags.dynamic() {
                mesh.immutable(&flags);
                if !flags.need_triangle_vertices() {
                    self.vertex_table.clear(id);
                }
            }
            committed += 1;
        }
        debug!(committed, "scene committed");
        Ok(())
    }

    fn modified_geometries(&self) -> impl Iterator<Item = (GeometryId, &TriangleMesh<'a>)> {
        self.geometries
            .iter_enumerated()
            .filter_map(|(id, slot)| slot.as_ref().filter(|mesh| mesh.is_modified()).map(|mesh| (id, mesh)))
    }
}

fn mesh_mut<'s, 'a>(
    geometries: &'s mut IndexVec<GeometryId, Option<TriangleMesh<'a>>>,
    id: GeometryId,
) -> Result<&'s mut TriangleMesh<'a>> {
    geometries
        .get_mut(id)
        .and_then(Option::as_mut)
        .ok_or_else(|| unknown_geometry(id))
}

fn unknown_geometry(id: GeometryId) -> MeshError {
    MeshError::invalid_argument(format!("unknown geometry {}", id.index()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::BarycentricCoordinates,
        triangle_mesh::tests::quad_mesh,
    };
    use assert2::{assert, let_assert};

    fn two_triangle_indices() -> Vec<u32> {
        vec![0, 1, 2, 2, 3, 0]
    }

    #[test]
    fn attach_and_detach_round_trip() {
        let mut scene = Scene::default();
        let static_id = scene.attach(quad_mesh(1));
        let blurred_id = scene.attach(quad_mesh(2));
        assert!(scene.world().static_geometry.num_triangles == 2);
        assert!(scene.world().motion_blur.num_triangles == 2);

        let mesh = scene.detach(static_id).unwrap();
        assert!(mesh.num_primitives() == 2);
        scene.detach(blurred_id).unwrap();
        assert!(*scene.world() == World::default());

        let_assert!(Err(MeshError::InvalidArgument(_)) = scene.detach(static_id));
        let_assert!(Err(MeshError::InvalidArgument(_)) = scene.geometry(blurred_id));
    }

    #[test]
    fn attach_disabled_mesh() {
        let mut scene = Scene::default();
        let mut mesh = quad_mesh(1);
        mesh.disable();
        let id = scene.attach(mesh);
        assert!(scene.world().static_geometry.num_triangles == 0);

        scene.enable(id).unwrap();
        scene.enable(id).unwrap();
        assert!(scene.world().static_geometry.num_triangles == 2);
        assert!(scene.geometry(id).unwrap().is_enabled());
    }

    #[test]
    fn disable_enable_is_no_op_on_world() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(3));
        let before = *scene.world();

        scene.disable(id).unwrap();
        assert!(scene.world().motion_blur.num_triangles == 0);
        scene.disable(id).unwrap();
        scene.enable(id).unwrap();
        assert!(*scene.world() == before);
    }

    #[test]
    fn index_buffer_replacement_of_enabled_mesh() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(1));
        scene.new_buffer(id, BufferKind::Index, 12, 7).unwrap();
        assert!(scene.world().static_geometry.num_triangles == 7);
        assert!(scene.geometry(id).unwrap().num_primitives() == 7);
    }

    #[test]
    fn index_buffer_replacement_of_disabled_mesh() {
        let indices = two_triangle_indices();
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(1));
        scene.new_buffer(id, BufferKind::Index, 12, 5).unwrap();
        scene.disable(id).unwrap();

        scene
            .set_buffer(id, BufferKind::Index, bytemuck::cast_slice(&indices), 0, 12, Some(2))
            .unwrap();
        assert!(scene.world().static_geometry.num_triangles == 0);
        assert!(scene.geometry(id).unwrap().num_primitives() == 2);

        scene.enable(id).unwrap();
        assert!(scene.world().static_geometry.num_triangles == 2);
    }

    #[test]
    fn failed_buffer_replacement_keeps_world() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(1));
        let_assert!(Err(MeshError::InvalidOperation(_)) = scene.new_buffer(id, BufferKind::Index, 10, 7));
        let_assert!(Err(MeshError::InvalidArgument(_)) = scene.new_buffer(id, BufferKind::Vertex(1), 12, 7));
        assert!(scene.world().static_geometry.num_triangles == 2);
    }

    #[test]
    fn commit_publishes_first_time_step() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(2));
        scene.commit().unwrap();

        let published = scene.vertex_table().get(id).unwrap();
        assert!(published.len() == 4);
        assert!(published.get(1) == [1.0, 0.0, 0.0]);
        assert!(!scene.geometry(id).unwrap().is_modified());
    }

    #[test]
    fn published_vertices_survive_later_edits() {
        let mut scene = Scene::new(SceneFlags::builder().dynamic(true).build());
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();

        let bytes = scene.get_buffer_mut(id, BufferKind::Vertex(0)).unwrap();
        bytes[..12].copy_from_slice(bytemuck::cast_slice(&[5.0f32, 5.0, 5.0]));
        assert!(scene.vertex_table().get(id).unwrap().get(0) == [0.0, 0.0, 0.0]);
        assert!(scene.geometry(id).unwrap().is_modified());

        scene.commit().unwrap();
        assert!(scene.vertex_table().get(id).unwrap().get(0) == [5.0, 5.0, 5.0]);
    }

    #[test]
    fn failed_pre_commit_publishes_nothing() {
        let mut scene = Scene::default();
        let good = scene.attach(quad_mesh(1));
        let bad = scene.attach(quad_mesh(2));
        scene.new_buffer(bad, BufferKind::Vertex(1), 16, 4).unwrap();

        let_assert!(Err(MeshError::InvalidOperation(_)) = scene.commit());
        assert!(scene.vertex_table().get(good).is_none());
        assert!(scene.vertex_table().get(bad).is_none());
        assert!(scene.geometry(good).unwrap().is_modified());
        assert!(scene.geometry(good).unwrap().index_buffer().is_present());
    }

    #[test]
    fn commit_releases_unneeded_buffers() {
        let flags = SceneFlags::builder()
            .need_triangle_indices(false)
            .need_triangle_vertices(false)
            .build();
        let mut scene = Scene::new(flags);
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();

        let mesh = scene.geometry(id).unwrap();
        assert!(!mesh.index_buffer().is_present());
        assert!(!mesh.vertex_buffers()[0].is_present());
        assert!(mesh.num_primitives() == 2);
        assert!(scene.vertex_table().get(id).is_none());
    }

    #[test]
    fn fetches_after_commit_without_indices() {
        let flags = SceneFlags::builder()
            .interpolate(true)
            .need_triangle_indices(false)
            .build();
        let mut scene = Scene::new(flags);
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();

        let query = InterpolationQuery {
            primitive: 0,
            uv: BarycentricCoordinates::new(0.5, 0.25),
            buffer: BufferKind::Vertex(0),
            attribute_count: 3,
        };
        let mut position = [0.0f32; 3];
        let mut outputs = InterpolationOutputs {
            position: Some(&mut position[..]),
            ..Default::default()
        };
        let_assert!(Err(MeshError::InvalidOperation(_)) = scene.interpolate(id, &query, &mut outputs));
        assert!(position == [0.0; 3]);

        let mesh = scene.geometry(id).unwrap();
        let_assert!(Err(MeshError::InvalidOperation(_)) = mesh.triangle_vertices(0, 0));
        assert!(scene.world().static_geometry.num_triangles == 2);
    }

    #[test]
    fn dynamic_scene_keeps_buffers() {
        let flags = SceneFlags::builder().dynamic(true).need_triangle_vertices(false).build();
        let mut scene = Scene::new(flags);
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();

        assert!(scene.geometry(id).unwrap().vertex_buffers()[0].is_present());
        assert!(scene.vertex_table().get(id).is_some());
    }

    #[test]
    fn commit_skips_unmodified_geometry() {
        let mut scene = Scene::new(SceneFlags::builder().dynamic(true).build());
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();
        scene.detach(id).unwrap();
        assert!(scene.vertex_table().get(id).is_none());

        scene.commit().unwrap();
        assert!(scene.vertex_table().get(id).is_none());
    }

    #[test]
    fn set_mask_through_scene() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(1));
        scene.commit().unwrap();
        scene.set_mask(id, 0x10).unwrap();
        assert!(scene.geometry(id).unwrap().mask() == 0x10);
        assert!(scene.geometry(id).unwrap().is_modified());
    }

    #[test]
    fn interpolate_through_scene() {
        let mut scene = Scene::new(SceneFlags::builder().interpolate(true).build());
        let id = scene.attach(quad_mesh(1));
        let mut position = [0.0f32; 3];
        let mut outputs = InterpolationOutputs {
            position: Some(&mut position[..]),
            ..Default::default()
        };
        let query = InterpolationQuery {
            primitive: 0,
            uv: BarycentricCoordinates::new(1.0, 0.0),
            buffer: BufferKind::Vertex(0),
            attribute_count: 3,
        };
        scene.interpolate(id, &query, &mut outputs).unwrap();
        assert!(position == [1.0, 0.0, 0.0]);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn interpolate_requires_flag_in_debug_builds() {
        let mut scene = Scene::default();
        let id = scene.attach(quad_mesh(1));
        let query = InterpolationQuery {
            primitive: 0,
            uv: BarycentricCoordinates::new(0.0, 0.0),
            buffer: BufferKind::Vertex(0),
            attribute_count: 3,
        };
        let_assert!(
            Err(MeshError::InvalidOperation(_)) =
                scene.interpolate(id, &query, &mut InterpolationOutputs::default())
        );
    }
}
