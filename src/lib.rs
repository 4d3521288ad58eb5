//! Triangle mesh geometry for a SIMD ray tracing core.
//!
//! Meshes hold strided index, vertex and user attribute buffers, either
//! allocated internally or borrowed from the caller. A [`Scene`] owns attached
//! meshes, keeps the primitive aggregate in sync and publishes committed vertices.

pub mod buffer;
pub mod error;
pub mod geometry;
pub mod scene;
pub mod triangle_mesh;
pub mod util;

pub use buffer::{BufferView, TypedBuffer};
pub use error::{MeshError, Result};
pub use scene::{GeometryId, Scene, SceneFlags, World};
pub use triangle_mesh::{BufferKind, TriangleMesh};
