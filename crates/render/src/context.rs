use crate::attribute::{VertexAttribute, VertexAttributeBaseType};
use crate::error::RenderError;
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::rc::Rc;

/// Shared handle to the graphics context.
///
/// `Rc` keeps the handle on the thread that created the context: every
/// graphics call in the process goes through this one writer.
pub type Context = Rc<dyn GraphicsContext>;

/// Backend-assigned buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Backend-assigned vertex array handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub u32);

/// Backend-assigned shader program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Location of an active uniform within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Binding target of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex data, sourced by attribute pointers.
    Vertex,
    /// `u32` element indices. Binding one records it in the bound vertex array.
    Index,
}

/// Rasterization mode for triangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Type of a uniform as declared by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Mat4,
    Vec2,
    Vec3,
    Vec4,
    Float,
    Int,
}

impl UniformType {
    /// Size of the value in bytes, padded to uniform buffer alignment.
    pub fn padded_size(self) -> u64 {
        match self {
            Self::Mat4 => 64,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 => 16,
            Self::Float | Self::Int => 4,
        }
    }
}

/// A value uploaded to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Float(f32),
    Int(i32),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Mat4(_) => UniformType::Mat4,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Float(_) => UniformType::Float,
            Self::Int(_) => UniformType::Int,
        }
    }

    /// Bytes in uniform buffer layout, padded to [`UniformType::padded_size`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            Self::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
            Self::Vec2(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            Self::Vec3(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            Self::Vec4(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            Self::Float(f) => bytemuck::bytes_of(f).to_vec(),
            Self::Int(i) => bytemuck::bytes_of(i).to_vec(),
        };
        bytes.resize(self.ty().padded_size() as usize, 0);
        bytes
    }
}

/// Materialized state of one attribute slot of a vertex array, as reported
/// by [`GraphicsContext::attribute_binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub slot: u32,
    pub enabled: bool,
    /// Buffer that was bound as the vertex source when the pointer was set.
    pub buffer: Option<BufferId>,
    pub base_type: VertexAttributeBaseType,
    pub normalized: bool,
    /// Stride in bytes, tightly-packed shorthand resolved.
    pub stride: u32,
    pub offset: u32,
}

/// Identification of a live context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Backend name, e.g. `Vulkan` or `headless`.
    pub backend: String,
    /// Adapter / driver description.
    pub version: String,
}

/// Stateful graphics API seam.
///
/// Calls mirror a classic bind-then-operate API: binding a vertex array or a
/// program replaces the previous binding of that category, and attribute
/// configuration applies to whatever vertex array and vertex buffer are
/// currently bound. Implementations keep their mutable state behind interior
/// mutability; the context is only ever used from one thread.
pub trait GraphicsContext {
    fn info(&self) -> ContextInfo;

    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> Result<BufferId, RenderError>;
    fn delete_buffer(&self, buffer: BufferId);
    /// Bind `buffer` to `kind`. Binding an index buffer requires a bound
    /// vertex array, which then remembers it.
    fn bind_buffer(&self, kind: BufferKind, buffer: Option<BufferId>) -> Result<(), RenderError>;

    fn create_vertex_array(&self) -> Result<VertexArrayId, RenderError>;
    fn delete_vertex_array(&self, vertex_array: VertexArrayId);
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>);
    /// Enable `slot` on the bound vertex array.
    fn enable_vertex_attribute(&self, slot: u32) -> Result<(), RenderError>;
    /// Point `attribute.slot` of the bound vertex array at the bound vertex buffer.
    fn vertex_attribute_pointer(&self, attribute: &VertexAttribute) -> Result<(), RenderError>;
    /// Query the materialized state of `slot` on `vertex_array`.
    fn attribute_binding(&self, vertex_array: VertexArrayId, slot: u32)
    -> Option<AttributeBinding>;

    /// Compile both stages and link them into a program.
    fn create_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError>;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);
    /// `None` when `name` is not an active uniform of `program`.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue);

    fn set_clear_color(&self, color: [f32; 4]);
    fn set_polygon_mode(&self, mode: PolygonMode);
    fn set_viewport(&self, width: u32, height: u32);
    fn set_swap_interval(&self, vsync: bool);

    /// Clear color and depth of the current frame.
    fn clear(&self);
    /// Draw `count` indices from the bound vertex array's index buffer as
    /// triangles, with the current program.
    fn draw_indexed(&self, count: u32) -> Result<(), RenderError>;
    /// Present the current frame.
    fn present(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bytes_are_padded() {
        assert_eq!(UniformValue::Vec3(Vec3::ONE).to_bytes().len(), 16);
        assert_eq!(UniformValue::Mat4(Mat4::IDENTITY).to_bytes().len(), 64);
        assert_eq!(UniformValue::Int(-3).to_bytes(), (-3i32).to_ne_bytes().to_vec());
    }

    #[test]
    fn mat4_bytes_are_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let bytes = UniformValue::Mat4(m).to_bytes();
        let expected: &[u8] = bytemuck::cast_slice(&[1.0f32, 2.0, 3.0]);
        assert_eq!(&bytes[48..60], expected);
    }
}
