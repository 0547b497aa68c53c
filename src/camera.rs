//! Perspective camera and its uniform.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4, perspective};

use crate::config::CameraConfig;

/// cgmath builds OpenGL clip space (z in -1..1); wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    /// Point the camera looks at. Orbit controls rotate around it.
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Point3::from(config.position),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: config.fovy.into(),
            aspect: 1.0,
            znear: config.znear,
            zfar: config.zfar,
        };
        camera.resize(width, height);
        camera
    }

    /// Matches the aspect ratio to a new viewport. Zero sizes are clamped to one pixel.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Projects a world-space point to normalized device coordinates.
    ///
    /// Returns `None` for points behind the camera.
    pub fn project(&self, point: Point3<f32>) -> Option<Vector3<f32>> {
        let clip = self.view_projection() * Vector4::new(point.x, point.y, point.z, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_follow_the_config() {
        let camera = PerspectiveCamera::new(&CameraConfig::default(), 1600, 800);
        assert_relative_eq!(camera.aspect, 2.0);
        assert_relative_eq!(camera.fovy.0, 75f32.to_radians(), epsilon = 1e-6);
        assert_eq!((camera.znear, camera.zfar), (1.0, 1000.0));
        assert_relative_eq!(camera.distance_to_target(), 400.0);
    }

    #[test]
    fn resize_updates_aspect_and_clamps_zero() {
        let mut camera = PerspectiveCamera::new(&CameraConfig::default(), 100, 100);
        camera.resize(300, 150);
        assert_relative_eq!(camera.aspect, 2.0);
        camera.resize(0, 0);
        assert_relative_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn target_projects_to_the_centre() {
        let camera = PerspectiveCamera::new(&CameraConfig::default(), 800, 600);
        let ndc = camera.project(Point3::origin()).unwrap();
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn points_behind_are_not_projected() {
        let camera = PerspectiveCamera::new(&CameraConfig::default(), 800, 600);
        assert!(camera.project(Point3::new(0.0, 0.0, 500.0)).is_none());
    }
}
