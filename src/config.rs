//! Viewer configuration.
//!
//! Every constant the viewer starts with lives here as a `Default` impl, so a
//! host can override single fields before calling [`crate::flow::run`] or
//! [`crate::context::ViewerContext::new`].

use cgmath::Deg;

use crate::data_structures::light::DirectionalLight;

/// Top-level configuration bundle.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Id of the DOM element the canvas and label layer get appended to (wasm only).
    pub container_id: String,
    /// Initial viewport size in logical (CSS) pixels.
    pub width: u32,
    pub height: u32,
    pub camera: CameraConfig,
    pub renderer: RendererOptions,
    pub orbit: OrbitConfig,
    pub particles: ParticleConfig,
    pub labels: LabelConfig,
    pub lights: Vec<DirectionalLight>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            container_id: "container-3d".to_string(),
            width: 1280,
            height: 720,
            camera: CameraConfig::default(),
            renderer: RendererOptions::default(),
            orbit: OrbitConfig::default(),
            particles: ParticleConfig::default(),
            labels: LabelConfig::default(),
            lights: DirectionalLight::default_rig(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(75.0),
            znear: 1.0,
            zfar: 1000.0,
            position: [0.0, 0.0, 400.0],
        }
    }
}

/// Options of the primary (GPU) renderer.
#[derive(Clone, Debug)]
pub struct RendererOptions {
    pub antialias: bool,
    pub alpha: bool,
    /// Drawing-buffer pixels per logical pixel; `None` means "ask the window".
    pub pixel_ratio: Option<f64>,
    pub clear_colour: wgpu::Color,
    /// When false `render` only clears after an explicit `SceneRenderer::clear`,
    /// which the frame issues once at its start.
    pub auto_clear: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            pixel_ratio: None,
            clear_colour: wgpu::Color::TRANSPARENT,
            auto_clear: false,
        }
    }
}

impl RendererOptions {
    /// MSAA sample count derived from the antialias flag.
    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}

/// The fixed orbit-control table.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitConfig {
    pub enable_pan: bool,
    pub pan_speed: f32,
    pub screen_space_panning: bool,

    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    pub enable_rotate: bool,
    pub rotate_speed: f32,

    pub min_polar_angle: Deg<f32>,
    pub max_polar_angle: Deg<f32>,
    pub min_azimuth_angle: Deg<f32>,
    pub max_azimuth_angle: Deg<f32>,

    pub enable_keys: bool,
    pub key_pan_speed: f32,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_pan: true,
            pan_speed: 0.4,
            screen_space_panning: false,

            enable_zoom: true,
            zoom_speed: 1.5,
            min_distance: 0.0,
            max_distance: 25000.0,

            enable_rotate: true,
            rotate_speed: 0.75,

            min_polar_angle: Deg(-90.0),
            max_polar_angle: Deg(90.0),
            min_azimuth_angle: Deg(-180.0),
            max_azimuth_angle: Deg(180.0),

            enable_keys: true,
            key_pan_speed: 1.0,

            enable_damping: false,
            damping_factor: 0.1,

            auto_rotate: false,
            auto_rotate_speed: 0.5,
        }
    }
}

/// Decorative particle field parameters.
#[derive(Clone, Debug)]
pub struct ParticleConfig {
    pub count: usize,
    pub min_radius: f32,
    /// Added on top of `min_radius`, scaled by a uniform random number.
    pub radius_spread: f32,
    /// Upper bound of the random Euler angle per axis, in radians.
    pub max_rotation: f32,
    /// Rotation applied to the whole field every frame, in radians.
    pub spin_per_frame: [f32; 2],
    /// Fixed seed for a reproducible field. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            min_radius: 90.0,
            radius_spread: 700.0,
            max_rotation: 2.0,
            spin_per_frame: [0.0, -0.002],
            seed: None,
        }
    }
}

/// Styling of the HTML label overlay.
#[derive(Clone, Debug)]
pub struct LabelConfig {
    pub font_size_px: u32,
    pub class_name: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_size_px: 10,
            class_name: "label".to_string(),
        }
    }
}
