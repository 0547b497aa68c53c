//! Orbit navigation around the camera target.
//!
//! Pointer input is accumulated into pending deltas; [`OrbitControls::update`]
//! applies them once per frame in spherical coordinates around the camera
//! target, clamped to the limits in [`OrbitConfig`].

use std::f32::consts::{PI, TAU};

use cgmath::{EuclideanSpace, InnerSpace, Rad, Vector3};
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{camera::PerspectiveCamera, config::OrbitConfig};

const EPS: f32 = 1e-6;
/// Closest approach to the target, in units of f32 precision at the target.
const MIN_RADIUS_ULPS: f32 = 1024.0;
/// Pixels a single wheel "line" counts for.
const LINE_HEIGHT_PX: f32 = 100.0;
/// Pixels one arrow-key press pans by at `key_pan_speed == 1.0`.
const KEY_PAN_PX: f32 = 7.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius < EPS {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_r = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_r * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_r * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragMode {
    None,
    Rotate,
    Pan,
}

#[derive(Debug)]
pub struct OrbitControls {
    pub config: OrbitConfig,
    pub enabled: bool,
    viewport: (u32, u32),
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vector3<f32>,
    drag: DragMode,
    cursor: Option<(f32, f32)>,
}

impl OrbitControls {
    pub fn new(config: OrbitConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            enabled: true,
            viewport: (width.max(1), height.max(1)),
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: DragMode::None,
            cursor: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    fn client_height(&self) -> f32 {
        self.viewport.1 as f32
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Moves the camera towards the target; `factor` < 1.
    pub fn dolly_out(&mut self, factor: f32) {
        self.scale *= factor;
    }

    pub fn dolly_in(&mut self, factor: f32) {
        self.scale /= factor;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.config.zoom_speed)
    }

    /// Pans by a screen-space delta in pixels.
    pub fn pan(&mut self, camera: &PerspectiveCamera, dx: f32, dy: f32) {
        let offset = camera.position - camera.target;
        // half the visible height at the target plane
        let target_distance = offset.magnitude() * (camera.fovy.0 / 2.0).tan();
        let h = self.client_height();
        let left = 2.0 * dx * target_distance / h;
        let up = 2.0 * dy * target_distance / h;

        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(camera.up).normalize();
        let up_axis = if self.config.screen_space_panning {
            right.cross(forward).normalize()
        } else {
            // stay parallel to the ground plane
            camera.up.cross(right).normalize()
        };
        self.pan_offset += right * -left;
        self.pan_offset += up_axis * up;
    }

    pub fn pointer_down(&mut self, button: MouseButton) {
        if !self.enabled {
            return;
        }
        self.drag = match button {
            MouseButton::Left if self.config.enable_rotate => DragMode::Rotate,
            MouseButton::Right | MouseButton::Middle if self.config.enable_pan => DragMode::Pan,
            _ => DragMode::None,
        };
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragMode::None;
    }

    pub fn pointer_move(&mut self, camera: &PerspectiveCamera, x: f32, y: f32) {
        let previous = self.cursor.replace((x, y));
        let Some((px, py)) = previous else {
            return;
        };
        if !self.enabled {
            return;
        }
        let (dx, dy) = (x - px, y - py);
        match self.drag {
            DragMode::Rotate => {
                let h = self.client_height();
                self.rotate_left(TAU * dx / h * self.config.rotate_speed);
                self.rotate_up(TAU * dy / h * self.config.rotate_speed);
            }
            DragMode::Pan => {
                let speed = self.config.pan_speed;
                self.pan(camera, dx * speed, dy * speed);
            }
            DragMode::None => (),
        }
    }

    /// Positive `delta_y` scrolls away from the user, like the DOM wheel event.
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enabled || !self.config.enable_zoom {
            return;
        }
        if delta_y < 0.0 {
            self.dolly_out(self.zoom_scale());
        } else if delta_y > 0.0 {
            self.dolly_in(self.zoom_scale());
        }
    }

    pub fn key(&mut self, camera: &PerspectiveCamera, key: KeyCode) {
        if !self.enabled || !self.config.enable_keys || !self.config.enable_pan {
            return;
        }
        let step = KEY_PAN_PX * self.config.key_pan_speed;
        match key {
            KeyCode::ArrowUp => self.pan(camera, 0.0, step),
            KeyCode::ArrowDown => self.pan(camera, 0.0, -step),
            KeyCode::ArrowLeft => self.pan(camera, step, 0.0),
            KeyCode::ArrowRight => self.pan(camera, -step, 0.0),
            _ => (),
        }
    }

    /// Feeds a winit window event into the controls.
    ///
    /// Pointer positions arrive in physical pixels and are converted to
    /// logical ones with `scale_factor`, the unit the viewport is sized in.
    pub fn handle_window_event(
        &mut self,
        camera: &PerspectiveCamera,
        event: &WindowEvent,
        scale_factor: f64,
    ) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.pointer_down(*button),
                ElementState::Released => self.pointer_up(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale_factor);
                self.pointer_move(camera, logical.x, logical.y)
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.pointer_up();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports "towards the user" as positive, the DOM the opposite
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT_PX,
                    MouseScrollDelta::PixelDelta(pos) => -pos.to_logical::<f32>(scale_factor).y,
                };
                self.wheel(dy);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.key(camera, code);
                }
            }
            _ => (),
        }
    }

    fn clamp_azimuth(&self, theta: f32) -> f32 {
        let mut min = Rad::from(self.config.min_azimuth_angle).0;
        let mut max = Rad::from(self.config.max_azimuth_angle).0;
        if !min.is_finite() || !max.is_finite() {
            return theta;
        }
        if min < -PI {
            min += TAU;
        } else if min > PI {
            min -= TAU;
        }
        if max < -PI {
            max += TAU;
        } else if max > PI {
            max -= TAU;
        }
        if min <= max {
            theta.clamp(min, max)
        } else if theta > (min + max) / 2.0 {
            theta.max(min)
        } else {
            theta.min(max)
        }
    }

    fn clamp_polar(&self, phi: f32) -> f32 {
        let min = Rad::from(self.config.min_polar_angle).0;
        let max = Rad::from(self.config.max_polar_angle).0;
        phi.clamp(min, max).clamp(EPS, PI - EPS)
    }

    /// Smallest camera-target distance that survives `target + offset` in f32.
    fn min_radius(camera: &PerspectiveCamera) -> f32 {
        let scale = camera.target.to_vec().magnitude().max(camera.znear);
        scale * f32::EPSILON * MIN_RADIUS_ULPS
    }

    /// Applies pending input to `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let before = camera.position;
        let mut spherical = Spherical::from_offset(camera.position - camera.target);

        if self.config.auto_rotate && self.drag == DragMode::None {
            self.rotate_left(TAU / 60.0 / 60.0 * self.config.auto_rotate_speed);
        }

        let damping = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.theta * damping;
        spherical.phi += self.spherical_delta.phi * damping;

        // keep theta in -PI..PI before clamping so wrapped angles compare correctly
        if spherical.theta > PI {
            spherical.theta -= TAU;
        } else if spherical.theta < -PI {
            spherical.theta += TAU;
        }
        spherical.theta = self.clamp_azimuth(spherical.theta);
        spherical.phi = self.clamp_polar(spherical.phi);

        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.config.min_distance, self.config.max_distance)
            .max(Self::min_radius(camera));

        camera.target += self.pan_offset * damping;
        camera.position = camera.target + spherical.to_offset();

        if self.config.enable_damping {
            let keep = 1.0 - self.config.damping_factor;
            self.spherical_delta.theta *= keep;
            self.spherical_delta.phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        (camera.position - before).magnitude2() > EPS
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformSpace {
    Local,
    World,
}

/// Settings of the transform gizmo. It is created alongside the orbit
/// controls but not attached to any node and ignores input.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformControls {
    pub size: f32,
    pub space: TransformSpace,
    pub attached: Option<u64>,
}

impl Default for TransformControls {
    fn default() -> Self {
        Self {
            size: 0.75,
            space: TransformSpace::Local,
            attached: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use approx::assert_relative_eq;
    use cgmath::Point3;

    #[test]
    fn transform_gizmo_defaults() {
        let gizmo = TransformControls::default();
        assert_eq!(gizmo.size, 0.75);
        assert_eq!(gizmo.space, TransformSpace::Local);
        assert!(gizmo.attached.is_none());
    }

    fn setup() -> (OrbitControls, PerspectiveCamera) {
        let camera = PerspectiveCamera::new(&CameraConfig::default(), 800, 600);
        (OrbitControls::new(OrbitConfig::default(), 800, 600), camera)
    }

    #[test]
    fn idle_update_keeps_the_camera() {
        let (mut controls, mut camera) = setup();
        assert!(!controls.update(&mut camera));
        assert_relative_eq!(camera.position.z, 400.0, epsilon = 1e-3);
    }

    #[test]
    fn spherical_round_trip() {
        let offset = Vector3::new(3.0, 4.0, -5.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert_relative_eq!(back.x, offset.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, offset.y, epsilon = 1e-4);
        assert_relative_eq!(back.z, offset.z, epsilon = 1e-4);
    }

    #[test]
    fn wheel_zooms_and_respects_max_distance() {
        let (mut controls, mut camera) = setup();
        controls.wheel(-1.0);
        controls.update(&mut camera);
        assert!(camera.distance_to_target() < 400.0);

        controls.config.max_distance = 410.0;
        for _ in 0..20 {
            controls.wheel(1.0);
        }
        controls.update(&mut camera);
        assert_relative_eq!(camera.distance_to_target(), 410.0, epsilon = 1e-2);
    }

    #[test]
    fn zooming_out_recovers_after_full_zoom_in_off_origin() {
        let (mut controls, mut camera) = setup();
        camera.target = Point3::new(300.0, 0.0, 300.0);
        camera.position = Point3::new(300.0, 0.0, 700.0);
        for _ in 0..2000 {
            controls.wheel(-1.0);
            controls.update(&mut camera);
        }
        let closest = camera.distance_to_target();
        assert!(closest > 0.0);
        assert!(closest < 1.0);

        for _ in 0..2000 {
            controls.wheel(1.0);
            controls.update(&mut camera);
        }
        assert!(camera.distance_to_target() > 1.0);

        controls.pan(&camera, 10.0, 10.0);
        controls.update(&mut camera);
        assert!((camera.target - Point3::new(300.0, 0.0, 300.0)).magnitude() > 1e-3);
    }

    #[test]
    fn dragging_rotates_around_the_target() {
        let (mut controls, mut camera) = setup();
        controls.pointer_move(&camera, 100.0, 300.0);
        controls.pointer_down(MouseButton::Left);
        controls.pointer_move(&camera, 150.0, 300.0);
        assert!(controls.update(&mut camera));
        assert_relative_eq!(camera.distance_to_target(), 400.0, epsilon = 1e-2);
        assert!(camera.position.x.abs() > 1.0);
    }

    #[test]
    fn polar_angle_is_clamped_to_the_upper_hemisphere() {
        let (mut controls, mut camera) = setup();
        // pushing down past the equator is blocked by max_polar_angle = 90°
        controls.rotate_up(-1.0);
        controls.update(&mut camera);
        assert!(camera.position.y >= -1e-3);

        // and going over the top stops just short of the pole
        controls.rotate_up(10.0);
        controls.update(&mut camera);
        let phi = Spherical::from_offset(camera.position - camera.target).phi;
        assert!(phi > 0.0);
        assert!(phi < 1e-2);
    }

    #[test]
    fn disabled_rotate_ignores_drags() {
        let (mut controls, mut camera) = setup();
        controls.config.enable_rotate = false;
        controls.pointer_move(&camera, 0.0, 0.0);
        controls.pointer_down(MouseButton::Left);
        controls.pointer_move(&camera, 300.0, 0.0);
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn ground_panning_moves_the_target_horizontally() {
        let (mut controls, mut camera) = setup();
        controls.pan(&camera, 0.0, 50.0);
        controls.update(&mut camera);
        assert_relative_eq!(camera.target.y, 0.0, epsilon = 1e-4);
        assert!(camera.target.z.abs() > 1.0);
    }

    #[test]
    fn arrow_keys_pan() {
        let (mut controls, mut camera) = setup();
        controls.key(&camera, KeyCode::ArrowLeft);
        controls.update(&mut camera);
        assert!(camera.target.x.abs() > 0.1);
    }
}
