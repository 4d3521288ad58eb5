use itertools::Itertools as _;
use thiserror::Error;
use tracing::debug;

use super::TriangleMesh;
use crate::{
    error::{MeshError, Result},
    scene::{GeometryId, SceneFlags, VertexTable},
};

/// Largest coordinate magnitude accepted for vertex positions.
pub const VALID_COORDINATE_LIMIT: f32 = 1.844e18;

/// First problem found while verifying committed mesh data.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Defect {
    #[error("Vertex buffer of time step {time_step} is missing")]
    MissingVertexBuffer { time_step: usize },

    #[error("Vertex buffer of time step {time_step} has {count} vertices, expected {expected}")]
    VertexCountMismatch {
        time_step: usize,
        count: usize,
        expected: usize,
    },

    #[error("User buffer {slot} has {count} rows, expected {expected}")]
    UserCountMismatch {
        slot: usize,
        count: usize,
        expected: usize,
    },

    #[error("Primitive {primitive} references vertex {vertex}, mesh has {num_vertices}")]
    IndexOutOfRange {
        primitive: usize,
        vertex: u32,
        num_vertices: usize,
    },

    #[error("Vertex {vertex} of time step {time_step} is invalid: {value:?}")]
    InvalidVertex {
        time_step: usize,
        vertex: usize,
        value: [f32; 3],
    },
}

impl<'a> TriangleMesh<'a> {
    /// Checks that the mesh can be frozen for traversal.
    pub fn pre_commit(&self) -> Result<()> {
        if !self.vertex_buffers.iter().map(|b| b.stride()).all_equal() {
            return Err(MeshError::invalid_operation(
                "stride of vertex buffers have to be identical for each time step",
            ));
        }
        Ok(())
    }

    /// Publishes the time step 0 vertices under the mesh's geometry id.
    pub fn post_commit(&mut self, id: GeometryId, vertices: &mut VertexTable<'a>) {
        debug!(?id, vertices = self.num_vertices(), "publishing vertices");
        vertices.publish(id, self.vertex_buffers[0].clone());
        self.modified = false;
    }

    /// Releases raw data the scene no longer needs. The released buffers stay empty
    /// until they are set again.
    pub fn immutable(&mut self, flags: &SceneFlags) {
        if !flags.need_triangle_indices() {
            debug!("releasing index buffer");
            self.index_buffer.release();
        }
        if !flags.need_triangle_vertices() {
            debug!("releasing vertex buffers");
            self.vertex_buffers.iter_mut().for_each(|b| b.release());
        }
    }

    /// Checks stored data for consistency, logs the defect if there is one.
    pub fn verify(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(defect) => {
                debug!(%defect, "mesh verification failed");
                false
            }
        }
    }

    pub fn validate(&self) -> Result<(), Defect> {
        let num_vertices = self.num_vertices();

        for (time_step, buffer) in self.vertex_buffers.iter().enumerate() {
            if !buffer.is_present() {
                return Err(Defect::MissingVertexBuffer { time_step });
            }
            if buffer.len() != num_vertices {
                return Err(Defect::VertexCountMismatch {
                    time_step,
                    count: buffer.len(),
                    expected: num_vertices,
                });
            }
        }

        for (slot, buffer) in self.user_buffers.iter().enumerate() {
            if buffer.is_present() && buffer.len() != num_vertices {
                return Err(Defect::UserCountMismatch {
                    slot,
                    count: buffer.len(),
                    expected: num_vertices,
                });
            }
        }

        for (primitive, triangle) in self.index_buffer.iter().enumerate() {
            if let Some(&vertex) = triangle.iter().find(|&&i| i as usize >= num_vertices) {
                return Err(Defect::IndexOutOfRange {
                    primitive,
                    vertex,
                    num_vertices,
                });
            }
        }

        for (time_step, buffer) in self.vertex_buffers.iter().enumerate() {
            if let Some((vertex, value)) = buffer
                .iter()
                .enumerate()
                .find(|(_, v)| !is_valid_position(v))
            {
                return Err(Defect::InvalidVertex {
                    time_step,
                    vertex,
                    value,
                });
            }
        }

        Ok(())
    }
}

fn is_valid_position(position: &[f32; 3]) -> bool {
    position
        .iter()
        .all(|x| x.is_finite() && x.abs() <= VALID_COORDINATE_LIMIT)
}
