use glam::UVec2;

/// Startup configuration of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowProperties {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowProperties {
    fn default() -> Self {
        Self {
            title: "slim".into(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl WindowProperties {
    pub fn new(title: impl Into<String>, width: u32, height: u32, vsync: bool) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            vsync,
        }
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}
