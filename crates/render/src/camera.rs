use glam::{Mat4, UVec2, Vec3};

/// Perspective camera looking down -Z from `position`.
///
/// The aspect ratio follows the window: feed it every resize through
/// [`Camera::set_viewport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            fov: 65.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Camera whose aspect matches `dimensions`.
    pub fn for_viewport(dimensions: UVec2) -> Self {
        let mut camera = Self::default();
        camera.set_viewport(dimensions);
        camera
    }

    /// Update the aspect ratio. Zero-sized dimensions are ignored.
    pub fn set_viewport(&mut self, dimensions: UVec2) {
        if dimensions.x == 0 || dimensions.y == 0 {
            return;
        }
        self.aspect = dimensions.x as f32 / dimensions.y as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    /// Right-handed projection with a [0, 1] depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = Camera::default();
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
        assert_eq!(cam.view_matrix().w_axis.z, -3.0);
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut cam = Camera::for_viewport(UVec2::new(800, 400));
        assert_eq!(cam.aspect, 2.0);
        cam.set_viewport(UVec2::new(0, 400));
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn origin_projects_inside_clip_volume() {
        let cam = Camera::default();
        let clip = cam.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
