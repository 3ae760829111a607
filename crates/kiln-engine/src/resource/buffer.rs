use crate::backend::BufferHandle;
use crate::lifecycle::{Handle, ResourceId};

use super::VertexLayout;

/// Where the buffer contents live. Only hardware buffers can be drawn from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DataStorage {
    #[default]
    Hardware,
    Software,
}

/// Width of one index.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Vertex data plus the layout that describes it.
#[derive(Debug)]
pub struct VertexBuffer {
    buffer: BufferHandle,
    layout: Handle<VertexLayout>,
    start_offset: u32,
    vertex_count: u32,
    storage: DataStorage,
}

impl VertexBuffer {
    pub fn new(buffer: BufferHandle, layout: Handle<VertexLayout>, vertex_count: u32) -> Self {
        Self {
            buffer,
            layout,
            start_offset: 0,
            vertex_count,
            storage: DataStorage::Hardware,
        }
    }

    pub fn with_start_offset(mut self, start_offset: u32) -> Self {
        self.start_offset = start_offset;
        self
    }

    pub fn with_storage(mut self, storage: DataStorage) -> Self {
        self.storage = storage;
        self
    }

    #[inline]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    #[inline]
    pub fn layout(&self) -> &Handle<VertexLayout> {
        &self.layout
    }

    #[inline]
    pub fn layout_id(&self) -> ResourceId {
        self.layout.id()
    }

    #[inline]
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn is_hardware(&self) -> bool {
        self.storage == DataStorage::Hardware
    }
}

#[derive(Debug)]
pub struct IndexBuffer {
    buffer: BufferHandle,
    format: IndexFormat,
    start_offset: u32,
    index_count: u32,
    storage: DataStorage,
}

impl IndexBuffer {
    pub fn new(buffer: BufferHandle, format: IndexFormat, index_count: u32) -> Self {
        Self {
            buffer,
            format,
            start_offset: 0,
            index_count,
            storage: DataStorage::Hardware,
        }
    }

    pub fn with_start_offset(mut self, start_offset: u32) -> Self {
        self.start_offset = start_offset;
        self
    }

    pub fn with_storage(mut self, storage: DataStorage) -> Self {
        self.storage = storage;
        self
    }

    #[inline]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    #[inline]
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    #[inline]
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn is_hardware(&self) -> bool {
        self.storage == DataStorage::Hardware
    }

    /// Byte offset of `first_index` inside the backend buffer.
    #[inline]
    pub fn byte_offset(&self, first_index: u32) -> u64 {
        u64::from(self.start_offset) + u64::from(first_index) * self.format.byte_size()
    }
}
