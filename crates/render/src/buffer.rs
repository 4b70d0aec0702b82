use crate::attribute::VertexAttribute;
use crate::context::{BufferId, BufferKind, Context};
use crate::error::RenderError;
use bytemuck::Pod;

/// GPU-resident per-vertex data plus the attributes that describe it.
///
/// Contents are immutable after creation. Share it between vertex arrays as
/// `Rc<VertexBuffer>`; the GPU allocation is released when the last
/// reference drops.
pub struct VertexBuffer {
    context: Context,
    id: BufferId,
    size: usize,
    attributes: Vec<VertexAttribute>,
}

impl VertexBuffer {
    /// Allocate GPU storage and upload `data`.
    pub fn create<T: Pod>(context: &Context, data: &[T]) -> Result<Self, RenderError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let id = context.create_buffer(BufferKind::Vertex, bytes)?;
        tracing::debug!(buffer = id.0, size = bytes.len(), "vertex buffer created");
        Ok(Self {
            context: context.clone(),
            id,
            size: bytes.len(),
            attributes: Vec::new(),
        })
    }

    /// Append an attribute. Insertion order is binding order.
    ///
    /// Slot uniqueness is checked when the buffer is attached to a vertex
    /// array, not here.
    pub fn add_attribute(&mut self, attribute: VertexAttribute) -> Result<(), RenderError> {
        attribute.validate()?;
        self.attributes.push(attribute);
        Ok(())
    }

    /// Builder form of [`add_attribute`](Self::add_attribute).
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Result<Self, RenderError> {
        self.add_attribute(attribute)?;
        Ok(self)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Size of the GPU allocation in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        tracing::debug!(buffer = self.id.0, "vertex buffer released");
        self.context.delete_buffer(self.id);
    }
}

/// GPU-resident `u32` element indices.
pub struct IndexBuffer {
    context: Context,
    id: BufferId,
    count: u32,
}

impl IndexBuffer {
    /// Allocate storage for exactly `indices.len()` indices and upload them.
    pub fn create(context: &Context, indices: &[u32]) -> Result<Self, RenderError> {
        let count = u32::try_from(indices.len())
            .map_err(|_| RenderError::Backend(format!("{} indices overflow u32", indices.len())))?;
        let id = context.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))?;
        tracing::debug!(buffer = id.0, count, "index buffer created");
        Ok(Self {
            context: context.clone(),
            id,
            count,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Number of indices.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        tracing::debug!(buffer = self.id.0, "index buffer released");
        self.context.delete_buffer(self.id);
    }
}
