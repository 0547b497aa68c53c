//! The viewer context: one owner for everything a running viewer needs.
//!
//! [`ViewerContext::new`] is the scene initializer. It builds the light rig,
//! camera, controls, label renderer and particle field around a primary
//! renderer the caller provides. [`ViewerContext::frame`] is the only
//! per-frame entry point and [`ViewerContext::reset_scene`] the only way to
//! empty the scene.

use crate::{
    camera::PerspectiveCamera,
    config::ViewerConfig,
    controls::{OrbitControls, TransformControls},
    data_structures::scene_graph::{Object3D, Scene},
    dispose,
    error::Result,
    flow::LoopHandle,
    label::LabelRenderer,
    particles::{self, PARTICLE_GROUP},
    render::SceneRenderer,
    resources::{ResourceInfo, ResourceTracker},
};

#[derive(Debug)]
pub struct ViewerContext<R: SceneRenderer> {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub transforms: TransformControls,
    pub renderer: R,
    pub label_renderer: LabelRenderer,
    pub resources: ResourceTracker,
    pub loop_handle: LoopHandle,
    pub config: ViewerConfig,
}

impl<R: SceneRenderer> ViewerContext<R> {
    /// Builds the default scene around `renderer`.
    ///
    /// `resources` must be the tracker the renderer drains, so releases made
    /// through the context reach the GPU side.
    pub fn new(config: ViewerConfig, mut renderer: R, resources: ResourceTracker) -> Self {
        let (width, height) = (config.width.max(1), config.height.max(1));
        if config.width == 0 || config.height == 0 {
            log::warn!(
                "viewport {}x{} clamped to {width}x{height}",
                config.width,
                config.height
            );
        }

        let mut scene = Scene::new();
        dispose::add_lights(&mut scene, &config.lights);

        let camera = PerspectiveCamera::new(&config.camera, width, height);
        let controls = OrbitControls::new(config.orbit.clone(), width, height);

        if let Some(ratio) = config.renderer.pixel_ratio {
            renderer.set_pixel_ratio(ratio);
        }
        renderer.set_size(width, height);
        let label_renderer = LabelRenderer::new(config.labels.clone(), width, height);

        scene.add(particles::build_particle_field(&resources, &config.particles));

        log::info!(
            "viewer initialized: {width}x{height}, {} lights, {} particles",
            config.lights.len(),
            config.particles.count
        );

        Self {
            scene,
            camera,
            controls,
            transforms: TransformControls::default(),
            renderer,
            label_renderer,
            resources,
            loop_handle: LoopHandle::new(),
            config,
        }
    }

    /// Keeps camera aspect, both renderers and the controls in step with the
    /// viewport. Sizes are logical pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.camera.resize(width, height);
        self.controls.resize(width, height);
        self.renderer.set_size(width, height);
        self.label_renderer.set_size(width, height);
        log::debug!("resized to {width}x{height}");
    }

    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    /// One frame: controls, particle spin, scene render, label render.
    pub fn frame(&mut self) -> Result<()> {
        self.controls.update(&mut self.camera);
        let spin = self.config.particles.spin_per_frame;
        if let Some(field) = self.particle_field_mut() {
            particles::spin(field, spin);
        }
        self.renderer.clear();
        self.renderer.render(&self.scene, &self.camera)?;
        self.label_renderer.render(&self.scene, &self.camera);
        Ok(())
    }

    pub fn particle_field(&self) -> Option<&Object3D> {
        self.scene.find_by_name(PARTICLE_GROUP)
    }

    pub fn particle_field_mut(&mut self) -> Option<&mut Object3D> {
        self.scene.find_by_name_mut(PARTICLE_GROUP)
    }

    /// Releases everything in the scene, empties it and re-adds the default lights.
    ///
    /// The particle field goes too; the frame loop keeps running.
    pub fn reset_scene(&mut self) -> ResourceInfo {
        dispose::reset_scene(&mut self.scene, &self.resources, &self.config.lights)
    }
}
