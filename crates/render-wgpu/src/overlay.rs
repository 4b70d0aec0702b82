/// Everything an overlay needs to paint on top of the finished scene.
pub struct OverlayTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Color target of the frame being presented.
    pub view: &'a wgpu::TextureView,
    pub size_in_pixels: [u32; 2],
}

/// Hook painted after the scene pass of every presented frame, e.g. an
/// immediate-mode UI. The overlay must load, not clear, the color target.
pub trait Overlay {
    fn paint(&mut self, target: OverlayTarget<'_>);
}
