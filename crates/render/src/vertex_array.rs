use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::context::{BufferKind, Context, VertexArrayId};
use crate::error::RenderError;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Bindable aggregate of vertex buffers, their attribute bindings and an
/// optional index buffer.
///
/// Attaching a vertex buffer materializes its attributes into context state
/// immediately. Composition is write-once: buffers cannot be detached.
///
/// # Invariants
/// - Attribute slots are unique across every attached vertex buffer.
/// - At most one index buffer; setting a new one replaces the old.
pub struct VertexArray {
    context: Context,
    id: VertexArrayId,
    vertex_buffers: Vec<Rc<VertexBuffer>>,
    index_buffer: Option<Rc<IndexBuffer>>,
    slots: BTreeSet<u32>,
}

impl VertexArray {
    /// Allocate an empty binding configuration.
    pub fn create(context: &Context) -> Result<Self, RenderError> {
        let id = context.create_vertex_array()?;
        tracing::debug!(vertex_array = id.0, "vertex array created");
        Ok(Self {
            context: context.clone(),
            id,
            vertex_buffers: Vec::new(),
            index_buffer: None,
            slots: BTreeSet::new(),
        })
    }

    /// Attach `buffer` and configure one input slot per attribute.
    ///
    /// Fails with [`RenderError::DuplicateAttributeSlot`] before any state is
    /// touched if a slot is already configured on this array (or repeated
    /// within `buffer` itself).
    pub fn add_vertex_buffer(&mut self, buffer: Rc<VertexBuffer>) -> Result<(), RenderError> {
        let mut incoming = BTreeSet::new();
        for attribute in buffer.attributes() {
            if self.slots.contains(&attribute.slot) || !incoming.insert(attribute.slot) {
                return Err(RenderError::DuplicateAttributeSlot {
                    slot: attribute.slot,
                });
            }
        }

        self.context.bind_vertex_array(Some(self.id));
        self.context
            .bind_buffer(BufferKind::Vertex, Some(buffer.id()))?;
        for attribute in buffer.attributes() {
            self.context.enable_vertex_attribute(attribute.slot)?;
            self.context.vertex_attribute_pointer(attribute)?;
        }

        tracing::debug!(
            vertex_array = self.id.0,
            buffer = buffer.id().0,
            slots = ?incoming,
            "vertex buffer attached"
        );
        self.slots.extend(incoming);
        self.vertex_buffers.push(buffer);
        Ok(())
    }

    /// Associate `buffer` as this array's index buffer, replacing any previous one.
    pub fn set_index_buffer(&mut self, buffer: Rc<IndexBuffer>) -> Result<(), RenderError> {
        self.context.bind_vertex_array(Some(self.id));
        self.context
            .bind_buffer(BufferKind::Index, Some(buffer.id()))?;
        tracing::debug!(
            vertex_array = self.id.0,
            buffer = buffer.id().0,
            count = buffer.count(),
            "index buffer set"
        );
        self.index_buffer = Some(buffer);
        Ok(())
    }

    /// Make this array the context's current vertex array.
    pub fn bind(&self) {
        self.context.bind_vertex_array(Some(self.id));
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    pub fn vertex_buffers(&self) -> &[Rc<VertexBuffer>] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&Rc<IndexBuffer>> {
        self.index_buffer.as_ref()
    }

    /// Index count of the current index buffer.
    pub fn index_count(&self) -> Option<u32> {
        self.index_buffer.as_ref().map(|b| b.count())
    }

    /// Configured attribute slots, ascending.
    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().copied()
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        tracing::debug!(vertex_array = self.id.0, "vertex array released");
        self.context.delete_vertex_array(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{VertexAttribute, VertexAttributeBaseType};
    use crate::headless::HeadlessContext;

    fn setup() -> (Rc<HeadlessContext>, Context) {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        (headless, ctx)
    }

    fn float3(slot: u32, stride: u32, offset: u32) -> VertexAttribute {
        VertexAttribute::new(slot, VertexAttributeBaseType::Float3, false, stride, offset)
    }

    #[test]
    fn attach_materializes_every_attribute() {
        let (headless, ctx) = setup();
        let vbo = VertexBuffer::create(&ctx, &[0.0f32; 48])
            .unwrap()
            .with_attribute(float3(0, 24, 0))
            .unwrap()
            .with_attribute(float3(1, 24, 12))
            .unwrap();
        let vbo = Rc::new(vbo);

        let mut vao = VertexArray::create(&ctx).unwrap();
        vao.add_vertex_buffer(vbo.clone()).unwrap();

        assert_eq!(headless.enabled_slots(vao.id()), vec![0, 1]);
        let position = ctx.attribute_binding(vao.id(), 0).unwrap();
        assert!(position.enabled);
        assert_eq!(position.stride, 24);
        assert_eq!(position.offset, 0);
        assert_eq!(position.buffer, Some(vbo.id()));
        let color = ctx.attribute_binding(vao.id(), 1).unwrap();
        assert_eq!(color.offset, 12);
        assert_eq!(color.stride, 24);
    }

    #[test]
    fn duplicate_slot_across_buffers_is_rejected() {
        let (headless, ctx) = setup();
        let first = VertexBuffer::create(&ctx, &[0.0f32; 9])
            .unwrap()
            .with_attribute(float3(0, 12, 0))
            .unwrap();
        let second = VertexBuffer::create(&ctx, &[1.0f32; 9])
            .unwrap()
            .with_attribute(float3(0, 12, 0))
            .unwrap();
        let first = Rc::new(first);
        let second = Rc::new(second);

        let mut vao = VertexArray::create(&ctx).unwrap();
        vao.add_vertex_buffer(first.clone()).unwrap();
        let err = vao.add_vertex_buffer(second).unwrap_err();
        assert!(matches!(err, RenderError::DuplicateAttributeSlot { slot: 0 }));

        // The first buffer's binding survives untouched.
        let binding = ctx.attribute_binding(vao.id(), 0).unwrap();
        assert_eq!(binding.buffer, Some(first.id()));
        assert_eq!(vao.vertex_buffers().len(), 1);
        assert_eq!(headless.enabled_slots(vao.id()), vec![0]);
    }

    #[test]
    fn duplicate_slot_within_one_buffer_is_rejected() {
        let (_headless, ctx) = setup();
        let vbo = VertexBuffer::create(&ctx, &[0.0f32; 6])
            .unwrap()
            .with_attribute(float3(2, 24, 0))
            .unwrap()
            .with_attribute(float3(2, 24, 12))
            .unwrap();
        let mut vao = VertexArray::create(&ctx).unwrap();
        let err = vao.add_vertex_buffer(Rc::new(vbo)).unwrap_err();
        assert!(matches!(err, RenderError::DuplicateAttributeSlot { slot: 2 }));
        assert_eq!(vao.slots().count(), 0);
    }

    #[test]
    fn buffers_with_disjoint_slots_combine() {
        let (headless, ctx) = setup();
        let positions = VertexBuffer::create(&ctx, &[0.0f32; 9])
            .unwrap()
            .with_attribute(float3(0, 0, 0))
            .unwrap();
        let colors = VertexBuffer::create(&ctx, &[0.5f32; 9])
            .unwrap()
            .with_attribute(float3(1, 0, 0))
            .unwrap();
        let mut vao = VertexArray::create(&ctx).unwrap();
        vao.add_vertex_buffer(Rc::new(positions)).unwrap();
        vao.add_vertex_buffer(Rc::new(colors)).unwrap();

        assert_eq!(headless.enabled_slots(vao.id()), vec![0, 1]);
        let color = ctx.attribute_binding(vao.id(), 1).unwrap();
        assert_eq!(color.stride, 12);
        assert_ne!(
            color.buffer,
            ctx.attribute_binding(vao.id(), 0).unwrap().buffer
        );
    }

    #[test]
    fn index_buffer_last_write_wins() {
        let (headless, ctx) = setup();
        let mut vao = VertexArray::create(&ctx).unwrap();
        let first = Rc::new(IndexBuffer::create(&ctx, &[0, 1, 2]).unwrap());
        let second = Rc::new(IndexBuffer::create(&ctx, &[0, 1, 2, 2, 3, 0]).unwrap());

        vao.set_index_buffer(first).unwrap();
        vao.set_index_buffer(second.clone()).unwrap();

        assert_eq!(vao.index_count(), Some(6));
        assert_eq!(headless.element_buffer(vao.id()), Some(second.id()));
        // The replaced buffer had no other owner and is gone.
        assert_eq!(headless.live_buffers(), 1);
    }

    #[test]
    fn shared_vertex_buffer_outlives_one_array() {
        let (headless, ctx) = setup();
        let vbo = Rc::new(
            VertexBuffer::create(&ctx, &[0.0f32; 9])
                .unwrap()
                .with_attribute(float3(0, 12, 0))
                .unwrap(),
        );
        let mut a = VertexArray::create(&ctx).unwrap();
        let mut b = VertexArray::create(&ctx).unwrap();
        a.add_vertex_buffer(vbo.clone()).unwrap();
        b.add_vertex_buffer(vbo.clone()).unwrap();
        drop(vbo);

        drop(a);
        assert_eq!(headless.live_buffers(), 1);
        drop(b);
        assert_eq!(headless.live_buffers(), 0);
    }
}
