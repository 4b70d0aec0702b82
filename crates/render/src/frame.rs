use crate::context::{Context, PolygonMode};
use crate::error::RenderError;
use crate::shader::Shader;
use crate::vertex_array::VertexArray;

/// What one frame drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub index_count: u32,
    pub triangles: u32,
}

/// Issues the per-frame draw sequence: clear, bind program, bind vertex
/// array, one indexed draw over the full index buffer.
///
/// Presenting is the window's job (`Window::update`).
pub struct FrameRenderer {
    context: Context,
}

impl FrameRenderer {
    pub fn new(context: &Context, clear_color: [f32; 4], polygon_mode: PolygonMode) -> Self {
        context.set_clear_color(clear_color);
        context.set_polygon_mode(polygon_mode);
        Self {
            context: context.clone(),
        }
    }

    pub fn set_polygon_mode(&self, mode: PolygonMode) {
        self.context.set_polygon_mode(mode);
    }

    /// Draw one frame of `vertex_array` with `shader`.
    pub fn render(
        &self,
        shader: &Shader,
        vertex_array: &VertexArray,
    ) -> Result<FrameStats, RenderError> {
        let index_count = vertex_array
            .index_count()
            .ok_or(RenderError::MissingIndexBuffer)?;

        self.context.clear();
        shader.bind();
        vertex_array.bind();
        self.context.draw_indexed(index_count)?;

        Ok(FrameStats {
            index_count,
            triangles: index_count / 3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{VertexAttribute, VertexAttributeBaseType};
    use crate::buffer::{IndexBuffer, VertexBuffer};
    use crate::headless::HeadlessContext;
    use crate::mesh::{CUBE_INDICES, CUBE_VERTICES, cube};
    use crate::reflect::tests::{FRAGMENT, VERTEX};
    use std::rc::Rc;

    #[test]
    fn cube_frame_draws_twelve_triangles() {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        let shader = Shader::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        let vao = cube(&ctx).unwrap();
        let renderer = FrameRenderer::new(&ctx, [0.1, 0.1, 0.1, 1.0], PolygonMode::Line);

        let stats = renderer.render(&shader, &vao).unwrap();
        assert_eq!(stats.index_count, 36);
        assert_eq!(stats.triangles, 12);

        let draws = headless.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].triangles(), 12);
        assert_eq!(draws[0].program, shader.id());
        assert_eq!(draws[0].vertex_array, vao.id());
        assert_eq!(draws[0].polygon_mode, PolygonMode::Line);
        assert_eq!(headless.clears(), 1);
        assert_eq!(headless.enabled_slots(vao.id()), vec![0, 1]);
    }

    #[test]
    fn draw_count_follows_latest_index_buffer() {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        let shader = Shader::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        let mut vao = cube(&ctx).unwrap();
        vao.set_index_buffer(Rc::new(IndexBuffer::create(&ctx, &CUBE_INDICES[..6]).unwrap()))
            .unwrap();

        let renderer = FrameRenderer::new(&ctx, [0.0; 4], PolygonMode::Fill);
        let stats = renderer.render(&shader, &vao).unwrap();
        assert_eq!(stats.index_count, 6);
        assert_eq!(headless.last_draw().unwrap().index_count, 6);
    }

    #[test]
    fn vertex_array_without_indices_is_an_error() {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        let shader = Shader::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        let vao = VertexArray::create(&ctx).unwrap();
        let renderer = FrameRenderer::new(&ctx, [0.0; 4], PolygonMode::Fill);

        assert!(matches!(
            renderer.render(&shader, &vao),
            Err(RenderError::MissingIndexBuffer)
        ));
        assert!(headless.draws().is_empty());
    }

    #[test]
    fn program_inputs_must_be_enabled() {
        let headless = Rc::new(HeadlessContext::new());
        let ctx: Context = headless.clone();
        let shader = Shader::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();

        let vbo = VertexBuffer::create(&ctx, &CUBE_VERTICES)
            .unwrap()
            .with_attribute(VertexAttribute::new(
                0,
                VertexAttributeBaseType::Float3,
                false,
                24,
                0,
            ))
            .unwrap();
        let mut vao = VertexArray::create(&ctx).unwrap();
        vao.add_vertex_buffer(Rc::new(vbo)).unwrap();
        vao.set_index_buffer(Rc::new(IndexBuffer::create(&ctx, &CUBE_INDICES).unwrap()))
            .unwrap();

        let renderer = FrameRenderer::new(&ctx, [0.0; 4], PolygonMode::Fill);
        assert!(matches!(
            renderer.render(&shader, &vao),
            Err(RenderError::MissingVertexInput { slot: 1 })
        ));
    }
}
