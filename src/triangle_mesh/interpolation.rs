//! Barycentric interpolation of per-vertex attributes.

use arrayvec::ArrayVec;

use super::{BufferKind, TriangleMesh};
use crate::{
    buffer::BufferView,
    error::{MeshError, Result},
    geometry::BarycentricCoordinates,
    util::simd::{CHUNK_LANES, FloatChunk, load_masked, store_masked, tail_mask},
};

const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InterpolationQuery {
    pub primitive: usize,
    pub uv: BarycentricCoordinates<f32>,
    /// Vertex positions of a time step, or a user attribute slot
    pub buffer: BufferKind,
    /// Number of leading floats of each vertex row to interpolate
    pub attribute_count: usize,
}

#[derive(Debug)]
pub struct FirstDerivatives<'o> {
    pub du: &'o mut [f32],
    pub dv: &'o mut [f32],
}

#[derive(Debug)]
pub struct SecondDerivatives<'o> {
    pub dudu: &'o mut [f32],
    pub dvdv: &'o mut [f32],
    pub dudv: &'o mut [f32],
}

/// Requested outputs, each at least `attribute_count` long.
/// Only the first `attribute_count` values of each are written.
#[derive(Debug, Default)]
pub struct InterpolationOutputs<'o> {
    pub position: Option<&'o mut [f32]>,
    pub first_derivatives: Option<FirstDerivatives<'o>>,
    pub second_derivatives: Option<SecondDerivatives<'o>>,
}

impl InterpolationOutputs<'_> {
    fn check_len(&self, attribute_count: usize) -> Result<()> {
        let mut lens = ArrayVec::<usize, 6>::new();
        if let Some(position) = &self.position {
            lens.push(position.len());
        }
        if let Some(first) = &self.first_derivatives {
            lens.extend([first.du.len(), first.dv.len()]);
        }
        if let Some(second) = &self.second_derivatives {
            lens.extend([second.dudu.len(), second.dvdv.len(), second.dudv.len()]);
        }
        match lens.into_iter().find(|&len| len < attribute_count) {
            Some(len) => Err(MeshError::invalid_argument(format!(
                "output of {len} values cannot hold {attribute_count} attributes"
            ))),
            None => Ok(()),
        }
    }
}

impl TriangleMesh<'_> {
    /// Evaluates the attributes of `query.buffer` at a point of a primitive.
    pub fn interpolate(&self, query: &InterpolationQuery, outputs: &mut InterpolationOutputs) -> Result<()> {
        let source = self.interpolation_source(query.buffer)?;
        let triangle = self.checked_triangle(query.primitive)?;
        let attribute_count = query.attribute_count;
        if attribute_count * FLOAT_BYTES > source.stride() {
            return Err(MeshError::invalid_argument(format!(
                "{attribute_count} attributes do not fit the buffer stride {}",
                source.stride()
            )));
        }
        outputs.check_len(attribute_count)?;

        let rows = triangle.try_map(|&i| {
            source.element(i as usize).ok_or_else(|| {
                MeshError::invalid_argument(format!(
                    "primitive {} references missing vertex {i}",
                    query.primitive
                ))
            })
        })?;

        let [w, u, v] = query.uv.weights();
        let (w, u, v) = (FloatChunk::splat(w), FloatChunk::splat(u), FloatChunk::splat(v));

        for first in (0..attribute_count).step_by(CHUNK_LANES) {
            let mask = tail_mask(first, attribute_count);
            let start = first * FLOAT_BYTES;
            let p0 = load_masked(&rows[0][start..], mask);
            let p1 = load_masked(&rows[1][start..], mask);
            let p2 = load_masked(&rows[2][start..], mask);

            if let Some(position) = outputs.position.as_deref_mut() {
                store_masked(&mut position[first..], mask, p0.mul_add(w, p1.mul_add(u, p2 * v)));
            }
            if let Some(first_derivatives) = outputs.first_derivatives.as_mut() {
                store_masked(&mut first_derivatives.du[first..], mask, p1 - p0);
                store_masked(&mut first_derivatives.dv[first..], mask, p2 - p0);
            }
            if let Some(second_derivatives) = outputs.second_derivatives.as_mut() {
                let zero = FloatChunk::splat(0.0);
                store_masked(&mut second_derivatives.dudu[first..], mask, zero);
                store_masked(&mut second_derivatives.dvdv[first..], mask, zero);
                store_masked(&mut second_derivatives.dudv[first..], mask, zero);
            }
        }
        Ok(())
    }

    fn interpolation_source(&self, kind: BufferKind) -> Result<BufferView<'_>> {
        match kind {
            BufferKind::Vertex(t) => self.vertex_buffer(t).map(|b| b.view()),
            BufferKind::UserVertex(s) => self.user_buffer(s).map(|b| b.view()),
            BufferKind::Index => None,
        }
        .ok_or_else(|| MeshError::invalid_argument(format!("cannot interpolate {kind:?} buffer")))
    }
}
