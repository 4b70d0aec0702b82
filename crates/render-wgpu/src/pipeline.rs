use slim_render::{AttributeBinding, BufferId, RenderError, VertexAttributeBaseType};
use std::collections::BTreeMap;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One wgpu vertex buffer slot: every enabled attribute that reads from the
/// same buffer with the same stride.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexSource {
    pub buffer: BufferId,
    pub stride: u32,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexSource {
    pub fn layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

pub(crate) fn vertex_format(base_type: VertexAttributeBaseType) -> wgpu::VertexFormat {
    match base_type {
        VertexAttributeBaseType::Float1 => wgpu::VertexFormat::Float32,
        VertexAttributeBaseType::Float2 => wgpu::VertexFormat::Float32x2,
        VertexAttributeBaseType::Float3 => wgpu::VertexFormat::Float32x3,
        VertexAttributeBaseType::Float4 => wgpu::VertexFormat::Float32x4,
        VertexAttributeBaseType::Int1 => wgpu::VertexFormat::Sint32,
        VertexAttributeBaseType::Int2 => wgpu::VertexFormat::Sint32x2,
        VertexAttributeBaseType::Int3 => wgpu::VertexFormat::Sint32x3,
        VertexAttributeBaseType::Int4 => wgpu::VertexFormat::Sint32x4,
    }
}

/// Group the enabled attribute bindings of a vertex array into wgpu vertex
/// buffer slots, in ascending order of their first attribute slot.
pub(crate) fn vertex_sources(
    attributes: &BTreeMap<u32, AttributeBinding>,
) -> Result<Vec<VertexSource>, RenderError> {
    let mut sources: Vec<VertexSource> = Vec::new();
    for binding in attributes.values().filter(|b| b.enabled) {
        let buffer = binding.buffer.ok_or_else(|| {
            RenderError::Backend(format!(
                "attribute slot {} is enabled but has no source buffer",
                binding.slot
            ))
        })?;
        let attribute = wgpu::VertexAttribute {
            format: vertex_format(binding.base_type),
            offset: binding.offset as u64,
            shader_location: binding.slot,
        };
        match sources
            .iter_mut()
            .find(|s| s.buffer == buffer && s.stride == binding.stride)
        {
            Some(source) => source.attributes.push(attribute),
            None => sources.push(VertexSource {
                buffer,
                stride: binding.stride,
                attributes: vec![attribute],
            }),
        }
    }
    Ok(sources)
}

pub(crate) fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
