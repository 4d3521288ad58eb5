//! Strided element views over geometry data.
//!
//! A buffer either owns zero-initialized storage, or borrows a region of
//! caller memory without copying it. Both kinds are described by the same
//! offset / stride / count triple, elements of type `T` are read from the start
//! of each stride sized row.

use std::{fmt, marker::PhantomData, mem::size_of, sync::Arc};

use bytemuck::Pod;

use crate::error::{MeshError, Result};

/// Required alignment of buffer start, offset and stride, in bytes.
pub const BUFFER_ALIGNMENT: usize = 4;

/// Readable bytes required from the start of the last element, so that it can be
/// fetched with one 4-wide float load.
pub const VECTOR_PADDING: usize = 16;

/// Buffers above this size break the premultiplied index addressing of the traversal kernels.
pub const MAX_BUFFER_BYTES: u64 = 16 * 1024 * 1024 * 1024;

#[derive(Clone, Default)]
enum Storage<'a> {
    #[default]
    Empty,
    /// Words keep the allocation 4 byte aligned
    Owned(Arc<[u32]>),
    Aliased(&'a [u8]),
}

impl Storage<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Empty => &[],
            Storage::Owned(words) => bytemuck::cast_slice(words),
            Storage::Aliased(bytes) => bytes,
        }
    }
}

pub struct TypedBuffer<'a, T> {
    storage: Storage<'a>,
    offset: usize,
    stride: usize,
    count: usize,
    _element: PhantomData<fn() -> T>,
}

impl<'a, T: Pod> TypedBuffer<'a, T> {
    /// Allocates zero-initialized storage for `count` elements.
    pub fn allocate(count: usize, stride: usize) -> Result<Self> {
        let bytes = Self::check_layout(stride, count)?;
        let words = (bytes + VECTOR_PADDING).div_ceil(BUFFER_ALIGNMENT);
        Ok(TypedBuffer {
            storage: Storage::Owned(Arc::from(vec![0u32; words])),
            offset: 0,
            stride,
            count,
            _element: PhantomData,
        })
    }

    /// Views `count` elements of `data` starting at `offset`, without copying.
    pub fn alias(data: &'a [u8], offset: usize, stride: usize, count: usize) -> Result<Self> {
        if (data.as_ptr() as usize).wrapping_add(offset) % BUFFER_ALIGNMENT != 0 {
            return Err(MeshError::invalid_operation("data must be 4 bytes aligned"));
        }
        let bytes = Self::check_layout(stride, count)?;
        match offset.checked_add(bytes) {
            Some(end) if end <= data.len() => {}
            _ => {
                return Err(MeshError::invalid_operation(format!(
                    "buffer of {} bytes cannot hold {count} elements of stride {stride} at offset {offset}",
                    data.len()
                )));
            }
        }
        Ok(TypedBuffer {
            storage: Storage::Aliased(data),
            offset,
            stride,
            count,
            _element: PhantomData,
        })
    }

    /// Checks that the last element can be read with a full vector load.
    pub fn require_padding(self) -> Result<Self> {
        if self.count > 0 {
            let required = self.offset + (self.count - 1) * self.stride + VECTOR_PADDING;
            let available = self.storage.bytes().len();
            if required > available {
                return Err(MeshError::invalid_operation(format!(
                    "buffer needs {} bytes of padding after the last element",
                    required - available
                )));
            }
        }
        Ok(self)
    }

    /// Validates stride and size, returns the size of the element rows in bytes.
    fn check_layout(stride: usize, count: usize) -> Result<usize> {
        if stride % BUFFER_ALIGNMENT != 0 {
            return Err(MeshError::invalid_operation("data must be 4 bytes aligned"));
        }
        if stride < size_of::<T>() {
            return Err(MeshError::invalid_operation(format!(
                "stride {stride} is smaller than the element size {}",
                size_of::<T>()
            )));
        }
        let bytes = (stride as u64).saturating_mul(count as u64);
        if bytes > MAX_BUFFER_BYTES {
            return Err(MeshError::invalid_operation(
                "buffer can be at most 16GB large",
            ));
        }
        usize::try_from(bytes)
            .map_err(|_| MeshError::invalid_operation("buffer does not fit the address space"))
    }

    /// Reads element `index`. Panics if out of range.
    pub fn get(&self, index: usize) -> T {
        bytemuck::pod_read_unaligned(&self.element_bytes(index)[..size_of::<T>()])
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.count).map(|i| self.get(i))
    }
}

impl<'a, T> TypedBuffer<'a, T> {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True if the storage was allocated by the buffer, false if it borrows caller memory or is empty.
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// False for buffers that were never set, or were released.
    pub fn is_present(&self) -> bool {
        !matches!(self.storage, Storage::Empty)
    }

    /// Bytes of all element rows.
    pub fn bytes(&self) -> &[u8] {
        let bytes = self.storage.bytes();
        if bytes.is_empty() {
            return bytes;
        }
        &bytes[self.offset..self.offset + self.count * self.stride]
    }

    /// Row of element `index`, `stride` bytes long. Panics if out of range.
    pub fn element_bytes(&self, index: usize) -> &[u8] {
        assert!(index < self.count, "element {index} out of range ({})", self.count);
        let start = index * self.stride;
        &self.bytes()[start..start + self.stride]
    }

    /// Writable element rows of owned storage, `None` for aliased or empty buffers.
    /// Owned storage shared with a published copy is detached first.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.offset..self.offset + self.count * self.stride;
        match &mut self.storage {
            Storage::Owned(words) => {
                if Arc::get_mut(words).is_none() {
                    *words = Arc::from(&words[..]);
                }
                let words = Arc::get_mut(words)?;
                Some(&mut bytemuck::cast_slice_mut(words)[range])
            }
            Storage::Empty | Storage::Aliased(_) => None,
        }
    }

    pub fn view(&self) -> BufferView<'_> {
        BufferView {
            bytes: self.bytes(),
            stride: self.stride,
            count: self.count,
        }
    }

    /// Drops the storage. The buffer reads as empty until it is replaced.
    pub fn release(&mut self) {
        self.storage = Storage::Empty;
        self.offset = 0;
        self.count = 0;
    }
}

impl<T> Default for TypedBuffer<'_, T> {
    fn default() -> Self {
        TypedBuffer {
            storage: Storage::Empty,
            offset: 0,
            stride: 0,
            count: 0,
            _element: PhantomData,
        }
    }
}

impl<T> Clone for TypedBuffer<'_, T> {
    fn clone(&self) -> Self {
        TypedBuffer {
            storage: self.storage.clone(),
            offset: self.offset,
            stride: self.stride,
            count: self.count,
            _element: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedBuffer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            Storage::Empty => "empty",
            Storage::Owned(_) => "owned",
            Storage::Aliased(_) => "aliased",
        };
        f.debug_struct("TypedBuffer")
            .field("element", &std::any::type_name::<T>())
            .field("storage", &storage)
            .field("offset", &self.offset)
            .field("stride", &self.stride)
            .field("count", &self.count)
            .finish()
    }
}

/// Untyped read-only view of a buffer's element rows.
#[derive(Copy, Clone, Debug)]
pub struct BufferView<'b> {
    bytes: &'b [u8],
    stride: usize,
    count: usize,
}

impl<'b> BufferView<'b> {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn bytes(&self) -> &'b [u8] {
        self.bytes
    }

    /// Row of element `index`, or `None` if out of range.
    pub fn element(&self, index: usize) -> Option<&'b [u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.stride;
        self.bytes.get(start..start + self.stride)
    }
}
