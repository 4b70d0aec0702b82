use crate::attribute::{VertexAttribute, VertexAttributeBaseType};
use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::context::Context;
use crate::error::RenderError;
use crate::vertex_array::VertexArray;
use std::rc::Rc;

/// Floats per cube vertex: position xyz, color rgb.
pub const CUBE_VERTEX_FLOATS: usize = 6;

/// Unit cube centred on the origin, one color per corner.
#[rustfmt::skip]
pub const CUBE_VERTICES: [f32; 48] = [
    -0.5, -0.5, -0.5,   0.0, 0.0, 0.0, // back bottom left
     0.5, -0.5, -0.5,   0.0, 1.0, 0.0, // back bottom right
     0.5,  0.5, -0.5,   0.0, 1.0, 1.0, // back top right
    -0.5,  0.5, -0.5,   0.0, 0.0, 1.0, // back top left
    -0.5, -0.5,  0.5,   1.0, 0.0, 0.0, // front bottom left
     0.5, -0.5,  0.5,   1.0, 1.0, 0.0, // front bottom right
     0.5,  0.5,  0.5,   1.0, 1.0, 1.0, // front top right
    -0.5,  0.5,  0.5,   1.0, 0.0, 1.0, // front top left
];

#[rustfmt::skip]
pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 3, 3, 1, 2, // back
    1, 5, 2, 2, 5, 6, // right
    5, 4, 6, 6, 4, 7, // front
    4, 0, 7, 7, 0, 3, // left
    3, 2, 7, 7, 2, 6, // top
    4, 5, 0, 0, 5, 1, // bottom
];

/// Vertex buffer for [`CUBE_VERTICES`] with position at slot 0 and color at
/// slot 1, interleaved.
pub fn cube_vertex_buffer(context: &Context) -> Result<VertexBuffer, RenderError> {
    let float = std::mem::size_of::<f32>() as u32;
    let stride = CUBE_VERTEX_FLOATS as u32 * float;
    VertexBuffer::create(context, &CUBE_VERTICES)?
        .with_attribute(VertexAttribute::new(
            0,
            VertexAttributeBaseType::Float3,
            false,
            stride,
            0,
        ))?
        .with_attribute(VertexAttribute::new(
            1,
            VertexAttributeBaseType::Float3,
            false,
            stride,
            3 * float,
        ))
}

/// Vertex array drawing the colored cube.
pub fn cube(context: &Context) -> Result<VertexArray, RenderError> {
    let mut vertex_array = VertexArray::create(context)?;
    vertex_array.add_vertex_buffer(Rc::new(cube_vertex_buffer(context)?))?;
    vertex_array.set_index_buffer(Rc::new(IndexBuffer::create(context, &CUBE_INDICES)?))?;
    Ok(vertex_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GraphicsContext;
    use crate::headless::HeadlessContext;

    #[test]
    fn cube_binding_state() {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        let vao = cube(&ctx).unwrap();

        assert_eq!(vao.index_count(), Some(36));
        assert_eq!(headless.enabled_slots(vao.id()), vec![0, 1]);
        let color = ctx.attribute_binding(vao.id(), 1).unwrap();
        assert_eq!(color.stride, 24);
        assert_eq!(color.offset, 12);
        assert_eq!(headless.buffer_len(vao.vertex_buffers()[0].id()), Some(192));
    }

    #[test]
    fn indices_stay_in_range() {
        let vertices = (CUBE_VERTICES.len() / CUBE_VERTEX_FLOATS) as u32;
        assert!(CUBE_INDICES.iter().all(|&i| i < vertices));
    }
}
