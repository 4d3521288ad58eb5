//! Buffer lifecycle: allocating, aliasing and looking up the mesh buffers.

use tracing::debug;

use super::{BufferKind, IndexBuffer, TriangleMesh, UserBuffer, VertexBuffer};
use crate::{
    buffer::{BUFFER_ALIGNMENT, BufferView, MAX_BUFFER_BYTES},
    error::{MeshError, Result},
    scene::World,
};

/// Validated kind of buffer slot.
#[derive(Copy, Clone, Debug)]
enum Slot {
    Vertex(usize),
    Index,
    User(usize),
}

impl<'a> TriangleMesh<'a> {
    /// Replaces the buffer of `kind` with a zero-initialized one,
    /// returns its element rows for the caller to fill.
    pub fn new_buffer(&mut self, kind: BufferKind, stride: usize, count: usize) -> Result<&mut [u8]> {
        self.new_buffer_with(kind, stride, count, None)
    }

    /// Replaces the buffer of `kind` with a view of caller memory.
    /// `count` of `None` keeps the element count of the buffer currently in the slot.
    pub fn set_buffer(
        &mut self,
        kind: BufferKind,
        data: &'a [u8],
        offset: usize,
        stride: usize,
        count: Option<usize>,
    ) -> Result<()> {
        self.set_buffer_with(kind, data, offset, stride, count, None)
    }

    /// Read only view of an index, vertex or user buffer.
    pub fn get_buffer(&self, kind: BufferKind) -> Result<BufferView<'_>> {
        match self.slot(kind)? {
            Slot::Index => Ok(self.index_buffer.view()),
            Slot::Vertex(t) => Ok(self.vertex_buffers[t].view()),
            Slot::User(s) => self
                .user_buffer(s)
                .map(UserBuffer::view)
                .ok_or_else(|| MeshError::invalid_argument(format!("user buffer {s} is not set"))),
        }
    }

    /// Writable element rows of an internally allocated buffer.
    pub fn get_buffer_mut(&mut self, kind: BufferKind) -> Result<&mut [u8]> {
        let bytes = match self.slot(kind)? {
            Slot::Index => self.index_buffer.bytes_mut(),
            Slot::Vertex(t) => self.vertex_buffers[t].bytes_mut(),
            Slot::User(s) => self.user_buffers.get_mut(s).and_then(UserBuffer::bytes_mut),
        };
        match bytes {
            Some(bytes) => {
                self.modified = true;
                Ok(bytes)
            }
            None => Err(MeshError::invalid_operation(format!(
                "{kind:?} buffer is not allocated by the mesh"
            ))),
        }
    }

    pub(crate) fn new_buffer_with(
        &mut self,
        kind: BufferKind,
        stride: usize,
        count: usize,
        world: Option<&mut World>,
    ) -> Result<&mut [u8]> {
        if stride % BUFFER_ALIGNMENT != 0 {
            return Err(MeshError::invalid_operation("data must be 4 bytes aligned"));
        }
        let slot = self.slot(kind)?;
        debug!(?kind, stride, count, "allocating buffer");

        let bytes = match slot {
            Slot::Vertex(t) => {
                check_vertex_buffer_size(stride, count)?;
                let buffer = VertexBuffer::allocate(count, stride)?;
                self.modified = true;
                let stored = &mut self.vertex_buffers[t];
                *stored = buffer;
                stored.bytes_mut()
            }
            Slot::Index => {
                let buffer = IndexBuffer::allocate(count, stride)?;
                self.modified = true;
                self.replace_index_buffer(buffer, world);
                self.index_buffer.bytes_mut()
            }
            Slot::User(s) => {
                let buffer = UserBuffer::allocate(count, stride)?;
                self.modified = true;
                self.replace_user_buffer(s, buffer).bytes_mut()
            }
        };
        bytes.ok_or_else(|| MeshError::invalid_operation("allocated buffer is not writable"))
    }

    pub(crate) fn set_buffer_with(
        &mut self,
        kind: BufferKind,
        data: &'a [u8],
        offset: usize,
        stride: usize,
        count: Option<usize>,
        world: Option<&mut World>,
    ) -> Result<()> {
        if (data.as_ptr() as usize).wrapping_add(offset) % BUFFER_ALIGNMENT != 0
            || stride % BUFFER_ALIGNMENT != 0
        {
            return Err(MeshError::invalid_operation("data must be 4 bytes aligned"));
        }
        let slot = self.slot(kind)?;
        debug!(?kind, offset, stride, ?count, "setting shared buffer");

        match slot {
            Slot::Vertex(t) => {
                let count = count.unwrap_or(self.vertex_buffers[t].len());
                check_vertex_buffer_size(stride, count)?;
                self.vertex_buffers[t] =
                    VertexBuffer::alias(data, offset, stride, count)?.require_padding()?;
            }
            Slot::Index => {
                let count = count.unwrap_or(self.index_buffer.len());
                let buffer = IndexBuffer::alias(data, offset, stride, count)?;
                self.replace_index_buffer(buffer, world);
            }
            Slot::User(s) => {
                let count = count.unwrap_or_else(|| self.user_buffer(s).map_or(0, UserBuffer::len));
                let buffer = UserBuffer::alias(data, offset, stride, count)?.require_padding()?;
                self.replace_user_buffer(s, buffer);
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Swaps in a new index buffer, keeping the world aggregate in sync when the
    /// mesh is attached and enabled.
    fn replace_index_buffer(&mut self, buffer: IndexBuffer<'a>, world: Option<&mut World>) {
        match world {
            Some(world) if self.enabled => {
                self.disabling(world);
                self.num_primitives = buffer.len();
                self.index_buffer = buffer;
                self.enabling(world);
            }
            _ => {
                self.num_primitives = buffer.len();
                self.index_buffer = buffer;
            }
        }
    }

    fn replace_user_buffer(&mut self, slot: usize, buffer: UserBuffer<'a>) -> &mut UserBuffer<'a> {
        while self.user_buffers.len() <= slot {
            self.user_buffers.push(UserBuffer::default());
        }
        let stored = &mut self.user_buffers[slot];
        *stored = buffer;
        stored
    }

    fn slot(&self, kind: BufferKind) -> Result<Slot> {
        match kind {
            BufferKind::Vertex(t) if t < self.time_steps() => Ok(Slot::Vertex(t)),
            BufferKind::Index => Ok(Slot::Index),
            BufferKind::UserVertex(s) if s < super::MAX_USER_VERTEX_BUFFERS => Ok(Slot::User(s)),
            _ => Err(MeshError::invalid_argument(format!("unknown buffer type {kind:?}"))),
        }
    }
}

/// Vertex buffers have their own cap, independent of generic buffer validation,
/// because traversal premultiplies vertex indices by the stride.
fn check_vertex_buffer_size(stride: usize, count: usize) -> Result<()> {
    if (stride as u64).saturating_mul(count as u64) > MAX_BUFFER_BYTES {
        return Err(MeshError::invalid_operation(
            "vertex buffer can be at most 16GB large",
        ));
    }
    Ok(())
}
