use crate::attribute::VertexAttribute;
use crate::binding::BindingState;
use crate::context::{
    AttributeBinding, BufferId, BufferKind, ContextInfo, GraphicsContext, PolygonMode, ProgramId,
    UniformLocation, UniformValue, VertexArrayId,
};
use crate::error::RenderError;
use crate::reflect::ProgramLayout;
use glam::UVec2;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

/// One recorded indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub polygon_mode: PolygonMode,
}

impl DrawRecord {
    pub fn triangles(&self) -> u32 {
        self.index_count / 3
    }
}

struct ProgramRecord {
    layout: ProgramLayout,
    values: BTreeMap<u32, UniformValue>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    bindings: BindingState,
    programs: HashMap<ProgramId, ProgramRecord>,
    clear_color: [f32; 4],
    polygon_mode: PolygonMode,
    viewport: UVec2,
    vsync: bool,
    clears: u64,
    frames_presented: u64,
    draws: Vec<DrawRecord>,
    deleted_buffers: u64,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Graphics context that keeps all state in memory and records every draw.
///
/// Runs without a GPU or display. It follows the same binding rules as a
/// real backend and compiles shaders through the same reflection, so it
/// backs the headless window, the CLI and the test suite. Inspection methods
/// expose the materialized state.
pub struct HeadlessContext {
    state: RefCell<State>,
    uniform_lookups: Cell<u64>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                vsync: true,
                ..State::default()
            }),
            uniform_lookups: Cell::new(0),
        }
    }

    /// Every draw issued so far, oldest first.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.state.borrow().draws.last().copied()
    }

    /// Enabled attribute slots of `vertex_array`, ascending.
    pub fn enabled_slots(&self, vertex_array: VertexArrayId) -> Vec<u32> {
        self.state
            .borrow()
            .bindings
            .vertex_array(vertex_array)
            .map(|va| va.enabled_slots())
            .unwrap_or_default()
    }

    pub fn element_buffer(&self, vertex_array: VertexArrayId) -> Option<BufferId> {
        self.state
            .borrow()
            .bindings
            .vertex_array(vertex_array)
            .and_then(|va| va.element_buffer)
    }

    /// Byte length of a live buffer.
    pub fn buffer_len(&self, buffer: BufferId) -> Option<usize> {
        self.state.borrow().bindings.buffer_len(buffer)
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().bindings.buffer_count()
    }

    pub fn deleted_buffers(&self) -> u64 {
        self.state.borrow().deleted_buffers
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().bindings.vertex_array_count()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Last value uploaded to the uniform `name` of `program`.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let record = state.programs.get(&program)?;
        let info = record.layout.uniform(name)?;
        record.values.get(&info.binding).copied()
    }

    /// Number of uniform location queries made against this context.
    pub fn uniform_lookups(&self) -> u64 {
        self.uniform_lookups.get()
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.state.borrow().bindings.bound_vertex_array()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().bindings.current_program()
    }

    pub fn viewport(&self) -> UVec2 {
        self.state.borrow().viewport
    }

    pub fn vsync(&self) -> bool {
        self.state.borrow().vsync
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.state.borrow().polygon_mode
    }

    pub fn clears(&self) -> u64 {
        self.state.borrow().clears
    }

    pub fn frames_presented(&self) -> u64 {
        self.state.borrow().frames_presented
    }
}

impl GraphicsContext for HeadlessContext {
    fn info(&self) -> ContextInfo {
        ContextInfo {
            backend: "headless".into(),
            version: concat!("slim-render ", env!("CARGO_PKG_VERSION")).into(),
        }
    }

    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> Result<BufferId, RenderError> {
        let mut state = self.state.borrow_mut();
        let id = BufferId(state.next());
        state.bindings.add_buffer(id, kind, data.len());
        Ok(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.bindings.remove_buffer(buffer) {
            state.deleted_buffers += 1;
        }
    }

    fn bind_buffer(&self, kind: BufferKind, buffer: Option<BufferId>) -> Result<(), RenderError> {
        self.state.borrow_mut().bindings.bind_buffer(kind, buffer)
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, RenderError> {
        let mut state = self.state.borrow_mut();
        let id = VertexArrayId(state.next());
        state.bindings.add_vertex_array(id);
        Ok(id)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        self.state
            .borrow_mut()
            .bindings
            .remove_vertex_array(vertex_array);
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        self.state
            .borrow_mut()
            .bindings
            .bind_vertex_array(vertex_array);
    }

    fn enable_vertex_attribute(&self, slot: u32) -> Result<(), RenderError> {
        self.state
            .borrow_mut()
            .bindings
            .enable_vertex_attribute(slot)
    }

    fn vertex_attribute_pointer(&self, attribute: &VertexAttribute) -> Result<(), RenderError> {
        self.state
            .borrow_mut()
            .bindings
            .vertex_attribute_pointer(attribute)
    }

    fn attribute_binding(
        &self,
        vertex_array: VertexArrayId,
        slot: u32,
    ) -> Option<AttributeBinding> {
        self.state
            .borrow()
            .bindings
            .attribute_binding(vertex_array, slot)
    }

    fn create_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        let layout = ProgramLayout::link(vertex, fragment)?;
        let mut state = self.state.borrow_mut();
        let id = ProgramId(state.next());
        state.programs.insert(
            id,
            ProgramRecord {
                layout,
                values: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.bindings.forget_program(program);
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().bindings.use_program(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniform_lookups.set(self.uniform_lookups.get() + 1);
        let state = self.state.borrow();
        let info = state.programs.get(&program)?.layout.uniform(name)?;
        Some(UniformLocation(info.binding))
    }

    fn set_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.programs.get_mut(&program) else {
            tracing::warn!(program = program.0, "set_uniform on unknown program");
            return;
        };
        let Some(info) = record.layout.uniform_at(location.0) else {
            tracing::warn!(binding = location.0, "set_uniform on unknown location");
            return;
        };
        if info.ty != value.ty() {
            tracing::warn!(
                "uniform `{}` is {:?}, ignoring {:?} value",
                info.name,
                info.ty,
                value.ty()
            );
            return;
        }
        record.values.insert(location.0, value);
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear_color = color;
    }

    fn set_polygon_mode(&self, mode: PolygonMode) {
        self.state.borrow_mut().polygon_mode = mode;
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.state.borrow_mut().viewport = UVec2::new(width, height);
    }

    fn set_swap_interval(&self, vsync: bool) {
        self.state.borrow_mut().vsync = vsync;
    }

    fn clear(&self) {
        self.state.borrow_mut().clears += 1;
    }

    fn draw_indexed(&self, count: u32) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        let program = state
            .bindings
            .current_program()
            .ok_or(RenderError::NoProgramBound)?;
        let record = state.programs.get(&program).ok_or(RenderError::UnknownHandle {
            kind: "program",
            id: program.0,
        })?;
        let target = state
            .bindings
            .validate_draw(count, &record.layout.vertex_inputs)?;

        let record = DrawRecord {
            program: target.program,
            vertex_array: target.vertex_array,
            index_buffer: target.index_buffer,
            index_count: count,
            polygon_mode: state.polygon_mode,
        };
        state.draws.push(record);
        Ok(())
    }

    fn present(&self) {
        self.state.borrow_mut().frames_presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_without_program_fails() {
        let ctx = HeadlessContext::new();
        assert!(matches!(
            ctx.draw_indexed(3),
            Err(RenderError::NoProgramBound)
        ));
    }

    #[test]
    fn deleting_bound_vertex_array_unbinds_it() {
        let ctx = HeadlessContext::new();
        let vao = ctx.create_vertex_array().unwrap();
        ctx.bind_vertex_array(Some(vao));
        ctx.delete_vertex_array(vao);
        assert_eq!(ctx.bound_vertex_array(), None);
        assert_eq!(ctx.live_vertex_arrays(), 0);
    }
}
