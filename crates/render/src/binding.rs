use crate::attribute::{VertexAttribute, VertexAttributeBaseType};
use crate::context::{AttributeBinding, BufferId, BufferKind, ProgramId, VertexArrayId};
use crate::error::RenderError;
use std::collections::{BTreeMap, HashMap};

/// Attribute and index bindings recorded on one vertex array.
#[derive(Debug, Clone, Default)]
pub struct VertexArrayBindings {
    pub attributes: BTreeMap<u32, AttributeBinding>,
    pub element_buffer: Option<BufferId>,
}

impl VertexArrayBindings {
    /// Enabled attribute slots, ascending.
    pub fn enabled_slots(&self) -> Vec<u32> {
        self.attributes
            .values()
            .filter(|a| a.enabled)
            .map(|a| a.slot)
            .collect()
    }
}

/// Resources a validated draw reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTarget {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_buffer: BufferId,
}

#[derive(Debug, Clone, Copy)]
struct BufferMeta {
    kind: BufferKind,
    len: usize,
}

/// Bind-then-operate state machine shared by every backend.
///
/// Tracks which vertex array, vertex buffer and program are current and what
/// each vertex array has materialized. Backends own the actual GPU objects
/// and consult this state to build and validate draws.
#[derive(Debug, Default)]
pub struct BindingState {
    buffers: HashMap<BufferId, BufferMeta>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayBindings>,
    bound_vertex_array: Option<VertexArrayId>,
    bound_vertex_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
}

impl BindingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_buffer(&mut self, buffer: BufferId, kind: BufferKind, len: usize) {
        self.buffers.insert(buffer, BufferMeta { kind, len });
    }

    /// Forget `buffer`. Returns `false` if it was unknown.
    pub fn remove_buffer(&mut self, buffer: BufferId) -> bool {
        if self.bound_vertex_buffer == Some(buffer) {
            self.bound_vertex_buffer = None;
        }
        self.buffers.remove(&buffer).is_some()
    }

    /// Byte length of a live buffer.
    pub fn buffer_len(&self, buffer: BufferId) -> Option<usize> {
        self.buffers.get(&buffer).map(|b| b.len)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn bind_buffer(
        &mut self,
        kind: BufferKind,
        buffer: Option<BufferId>,
    ) -> Result<(), RenderError> {
        if let Some(id) = buffer {
            let meta = self.buffers.get(&id).ok_or(RenderError::UnknownHandle {
                kind: "buffer",
                id: id.0,
            })?;
            if meta.kind != kind {
                return Err(RenderError::Backend(format!(
                    "buffer {} was created as {:?}, not {kind:?}",
                    id.0, meta.kind
                )));
            }
        }
        match kind {
            BufferKind::Vertex => self.bound_vertex_buffer = buffer,
            BufferKind::Index => self.bound_array_mut()?.element_buffer = buffer,
        }
        Ok(())
    }

    pub fn add_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays
            .insert(vertex_array, VertexArrayBindings::default());
    }

    pub fn remove_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn vertex_array(&self, vertex_array: VertexArrayId) -> Option<&VertexArrayBindings> {
        self.vertex_arrays.get(&vertex_array)
    }

    pub fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn enable_vertex_attribute(&mut self, slot: u32) -> Result<(), RenderError> {
        let array = self.bound_array_mut()?;
        array
            .attributes
            .entry(slot)
            .or_insert(AttributeBinding {
                slot,
                enabled: false,
                buffer: None,
                base_type: VertexAttributeBaseType::Float4,
                normalized: false,
                stride: 0,
                offset: 0,
            })
            .enabled = true;
        Ok(())
    }

    /// Point `attribute.slot` of the bound vertex array at the bound vertex buffer.
    pub fn vertex_attribute_pointer(
        &mut self,
        attribute: &VertexAttribute,
    ) -> Result<(), RenderError> {
        let source = self.bound_vertex_buffer.ok_or_else(|| {
            RenderError::Backend(format!(
                "no vertex buffer bound for attribute slot {}",
                attribute.slot
            ))
        })?;
        let array = self.bound_array_mut()?;
        let enabled = array
            .attributes
            .get(&attribute.slot)
            .is_some_and(|b| b.enabled);
        array.attributes.insert(
            attribute.slot,
            AttributeBinding {
                slot: attribute.slot,
                enabled,
                buffer: Some(source),
                base_type: attribute.base_type,
                normalized: attribute.normalized,
                stride: attribute.effective_stride(),
                offset: attribute.offset,
            },
        );
        Ok(())
    }

    pub fn attribute_binding(
        &self,
        vertex_array: VertexArrayId,
        slot: u32,
    ) -> Option<AttributeBinding> {
        self.vertex_arrays
            .get(&vertex_array)?
            .attributes
            .get(&slot)
            .copied()
    }

    pub fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Unbind `program` if it is current.
    pub fn forget_program(&mut self, program: ProgramId) {
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    /// Check that an indexed draw of `count` indices can run with the current
    /// bindings. `vertex_inputs` are the locations the current program reads.
    pub fn validate_draw(&self, count: u32, vertex_inputs: &[u32]) -> Result<DrawTarget, RenderError> {
        let program = self.current_program.ok_or(RenderError::NoProgramBound)?;
        let vertex_array = self
            .bound_vertex_array
            .ok_or(RenderError::NoVertexArrayBound)?;
        let array = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or(RenderError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;
        let index_buffer = array
            .element_buffer
            .ok_or(RenderError::MissingIndexBuffer)?;

        if let Some(slot) = vertex_inputs
            .iter()
            .find(|slot| !array.attributes.get(slot).is_some_and(|a| a.enabled))
        {
            return Err(RenderError::MissingVertexInput { slot: *slot });
        }

        let available = self
            .buffer_len(index_buffer)
            .map(|len| (len / 4) as u32)
            .unwrap_or(0);
        if count > available {
            return Err(RenderError::IndexOutOfRange { count, available });
        }

        Ok(DrawTarget {
            program,
            vertex_array,
            index_buffer,
        })
    }

    fn bound_array_mut(&mut self) -> Result<&mut VertexArrayBindings, RenderError> {
        let id = self
            .bound_vertex_array
            .ok_or(RenderError::NoVertexArrayBound)?;
        self.vertex_arrays
            .get_mut(&id)
            .ok_or(RenderError::UnknownHandle {
                kind: "vertex array",
                id: id.0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_array() -> (BindingState, VertexArrayId) {
        let mut state = BindingState::new();
        let vao = VertexArrayId(1);
        state.add_vertex_array(vao);
        state.bind_vertex_array(Some(vao));
        (state, vao)
    }

    #[test]
    fn attribute_calls_need_a_bound_vertex_array() {
        let mut state = BindingState::new();
        assert!(matches!(
            state.enable_vertex_attribute(0),
            Err(RenderError::NoVertexArrayBound)
        ));
    }

    #[test]
    fn pointer_captures_bound_vertex_buffer() {
        let (mut state, vao) = with_array();
        state.add_buffer(BufferId(9), BufferKind::Vertex, 32);
        state
            .bind_buffer(BufferKind::Vertex, Some(BufferId(9)))
            .unwrap();
        let attr = VertexAttribute::new(4, VertexAttributeBaseType::Float2, false, 16, 8);
        state.vertex_attribute_pointer(&attr).unwrap();

        let binding = state.attribute_binding(vao, 4).unwrap();
        assert!(!binding.enabled);
        assert_eq!(binding.buffer, Some(BufferId(9)));
        state.enable_vertex_attribute(4).unwrap();
        assert_eq!(state.vertex_array(vao).unwrap().enabled_slots(), vec![4]);
    }

    #[test]
    fn pointer_without_vertex_buffer_fails() {
        let (mut state, _vao) = with_array();
        let attr = VertexAttribute::new(0, VertexAttributeBaseType::Float3, false, 0, 0);
        assert!(state.vertex_attribute_pointer(&attr).is_err());
    }

    #[test]
    fn index_buffer_kind_is_checked() {
        let (mut state, _vao) = with_array();
        state.add_buffer(BufferId(2), BufferKind::Vertex, 4);
        assert!(state
            .bind_buffer(BufferKind::Index, Some(BufferId(2)))
            .is_err());
    }

    #[test]
    fn index_binding_is_recorded_per_vertex_array() {
        let (mut state, vao) = with_array();
        state.add_buffer(BufferId(3), BufferKind::Index, 12);
        state
            .bind_buffer(BufferKind::Index, Some(BufferId(3)))
            .unwrap();
        state.bind_vertex_array(None);
        assert_eq!(
            state.vertex_array(vao).unwrap().element_buffer,
            Some(BufferId(3))
        );
    }

    #[test]
    fn draw_validation_order() {
        let (mut state, _vao) = with_array();
        assert!(matches!(
            state.validate_draw(3, &[]),
            Err(RenderError::NoProgramBound)
        ));
        state.use_program(Some(ProgramId(5)));
        assert!(matches!(
            state.validate_draw(3, &[]),
            Err(RenderError::MissingIndexBuffer)
        ));

        state.add_buffer(BufferId(3), BufferKind::Index, 12);
        state
            .bind_buffer(BufferKind::Index, Some(BufferId(3)))
            .unwrap();
        assert!(matches!(
            state.validate_draw(6, &[]),
            Err(RenderError::IndexOutOfRange {
                count: 6,
                available: 3
            })
        ));
        assert!(matches!(
            state.validate_draw(3, &[0]),
            Err(RenderError::MissingVertexInput { slot: 0 })
        ));
        let target = state.validate_draw(3, &[]).unwrap();
        assert_eq!(target.index_buffer, BufferId(3));
    }

    #[test]
    fn removing_bound_objects_unbinds_them() {
        let (mut state, vao) = with_array();
        state.use_program(Some(ProgramId(1)));
        state.forget_program(ProgramId(1));
        state.remove_vertex_array(vao);
        assert_eq!(state.current_program(), None);
        assert_eq!(state.bound_vertex_array(), None);
        assert_eq!(state.vertex_array_count(), 0);
    }
}
