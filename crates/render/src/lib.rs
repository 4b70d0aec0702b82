//! Rendering core: renderer-agnostic GPU resource ownership and binding model.
//!
//! Vertex data, index data and attribute layouts are described once and
//! mapped into a stateful bind-then-operate sequence on a [`GraphicsContext`].
//! Concrete backends (`slim-render-wgpu`, [`HeadlessContext`]) implement the
//! trait; consumers never talk to a graphics API directly.
//!
//! # Invariants
//! - Attribute slots are unique within one [`VertexArray`].
//! - GPU allocations are released exactly once, when the last owner drops.
//! - Buffer contents are immutable after creation.
//! - All graphics calls happen on the thread that owns the [`Context`].

mod attribute;
mod binding;
mod buffer;
mod camera;
mod context;
mod error;
mod frame;
mod headless;
pub mod mesh;
pub mod reflect;
mod shader;
mod vertex_array;

pub use attribute::{VERTEX_ALIGNMENT, VertexAttribute, VertexAttributeBaseType};
pub use binding::{BindingState, DrawTarget, VertexArrayBindings};
pub use buffer::{IndexBuffer, VertexBuffer};
pub use camera::Camera;
pub use context::{
    AttributeBinding, BufferId, BufferKind, Context, ContextInfo, GraphicsContext, PolygonMode,
    ProgramId, UniformLocation, UniformType, UniformValue, VertexArrayId,
};
pub use error::{RenderError, ShaderStage};
pub use frame::{FrameRenderer, FrameStats};
pub use headless::{DrawRecord, HeadlessContext};
pub use shader::Shader;
pub use vertex_array::VertexArray;

pub fn crate_info() -> &'static str {
    concat!("slim-render v", env!("CARGO_PKG_VERSION"))
}
