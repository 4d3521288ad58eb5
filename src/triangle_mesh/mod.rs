mod buffers;
mod commit;
mod interpolation;

use std::num::NonZeroUsize;

use arrayvec::ArrayVec;

use crate::{
    buffer::TypedBuffer,
    error::{MeshError, Result},
    geometry::{Triangle, WorldPoint},
    scene::World,
};

pub use commit::{Defect, VALID_COORDINATE_LIMIT};
pub use interpolation::{
    FirstDerivatives, InterpolationOutputs, InterpolationQuery, SecondDerivatives,
};

pub const MAX_USER_VERTEX_BUFFERS: usize = 2;

/// One vertex index triple per primitive
pub type IndexBuffer<'a> = TypedBuffer<'a, [u32; 3]>;
/// One position per vertex
pub type VertexBuffer<'a> = TypedBuffer<'a, [f32; 3]>;
/// Rows of user defined float attributes, one row per vertex
pub type UserBuffer<'a> = TypedBuffer<'a, f32>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex positions of a motion blur time step
    Vertex(usize),
    Index,
    /// User attribute slot, below `MAX_USER_VERTEX_BUFFERS`
    UserVertex(usize),
}

/// Indexed triangle geometry with optional motion blur time steps.
#[derive(Clone, Debug)]
pub struct TriangleMesh<'a> {
    mask: u32,
    enabled: bool,
    modified: bool,
    num_primitives: usize,

    index_buffer: IndexBuffer<'a>,
    /// Exactly one buffer per time step
    vertex_buffers: Vec<VertexBuffer<'a>>,
    /// Empty buffers are unused slots
    user_buffers: ArrayVec<UserBuffer<'a>, MAX_USER_VERTEX_BUFFERS>,
}

impl<'a> TriangleMesh<'a> {
    /// Mesh without motion blur.
    pub fn new() -> Self {
        Self::with_time_steps(NonZeroUsize::MIN)
    }

    pub fn with_time_steps(time_steps: NonZeroUsize) -> Self {
        TriangleMesh {
            mask: u32::MAX,
            enabled: true,
            modified: true,
            num_primitives: 0,
            index_buffer: IndexBuffer::default(),
            vertex_buffers: vec![VertexBuffer::default(); time_steps.get()],
            user_buffers: ArrayVec::new(),
        }
    }

    pub fn time_steps(&self) -> usize {
        self.vertex_buffers.len()
    }

    pub fn num_primitives(&self) -> usize {
        self.num_primitives
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_buffers[0].len()
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
        self.modified = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True if the mesh changed since the last commit.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Enables a mesh that is not attached to a scene, see `Scene::enable` otherwise.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables a mesh that is not attached to a scene, see `Scene::disable` otherwise.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Adds this mesh's primitives to the world aggregate.
    pub fn enabling(&self, world: &mut World) {
        world.counts_mut(self.time_steps()).num_triangles += self.num_primitives;
    }

    /// Removes this mesh's primitives from the world aggregate.
    pub fn disabling(&self, world: &mut World) {
        world.counts_mut(self.time_steps()).num_triangles -= self.num_primitives;
    }

    pub fn index_buffer(&self) -> &IndexBuffer<'a> {
        &self.index_buffer
    }

    pub fn vertex_buffer(&self, time_step: usize) -> Option<&VertexBuffer<'a>> {
        self.vertex_buffers.get(time_step)
    }

    pub fn vertex_buffers(&self) -> &[VertexBuffer<'a>] {
        &self.vertex_buffers
    }

    /// User buffer in `slot`, `None` for unused slots.
    pub fn user_buffer(&self, slot: usize) -> Option<&UserBuffer<'a>> {
        self.user_buffers.get(slot).filter(|b| b.is_present())
    }

    /// Vertex indices of a primitive. Panics if `primitive` is out of range.
    pub fn triangle(&self, primitive: usize) -> Triangle<u32> {
        self.index_buffer.get(primitive).into()
    }

    /// Vertex indices of a primitive, checked against the stored index buffer.
    pub fn checked_triangle(&self, primitive: usize) -> Result<Triangle<u32>> {
        if !self.index_buffer.is_present() {
            return Err(MeshError::invalid_operation("index buffer was released"));
        }
        if primitive >= self.index_buffer.len() {
            return Err(MeshError::invalid_argument(format!(
                "primitive {primitive} out of range ({})",
                self.index_buffer.len()
            )));
        }
        Ok(self.triangle(primitive))
    }

    /// Vertex positions of a primitive at a time step.
    pub fn triangle_vertices(&self, primitive: usize, time_step: usize) -> Result<Triangle<WorldPoint>> {
        let triangle = self.checked_triangle(primitive)?;
        let vertices = self.vertex_buffer(time_step).ok_or_else(|| {
            MeshError::invalid_argument(format!("time step {time_step} out of range"))
        })?;
        triangle.try_map(|&i| {
            let i = i as usize;
            if i < vertices.len() {
                Ok(WorldPoint::from(vertices.get(i)))
            } else {
                Err(MeshError::invalid_argument(format!(
                    "primitive {primitive} references missing vertex {i}"
                )))
            }
        })
    }
}

impl Default for TriangleMesh<'_> {
    fn default() -> Self {
        Self::new()
    }
}
