use std::sync::Arc;

use orbit_viewer::{
    HeadlessRenderer, ResourceTracker, ViewerConfig, ViewerContext,
    config::ParticleConfig,
    data_structures::{
        geometry::Geometry,
        material::{Material, MaterialMaps},
        scene_graph::Object3D,
        texture::Texture,
    },
};

#[allow(dead_code)]
pub fn headless_viewer(width: u32, height: u32) -> ViewerContext<HeadlessRenderer> {
    let config = ViewerConfig {
        width,
        height,
        particles: ParticleConfig {
            seed: Some(42),
            ..Default::default()
        },
        ..Default::default()
    };
    let tracker = ResourceTracker::new();
    let renderer = HeadlessRenderer::new(config.renderer.clone(), tracker.clone(), width, height);
    ViewerContext::new(config, renderer, tracker)
}

#[allow(dead_code)]
/// A mesh with its own geometry and a material carrying a base and a normal map.
pub fn textured_mesh(tracker: &ResourceTracker, name: &str) -> Object3D {
    let geometry = Arc::new(Geometry::tetrahedron(tracker, 5.0));
    let maps = MaterialMaps {
        map: Some(Arc::new(Texture::solid(tracker, [200, 10, 10, 255], "base"))),
        normal_map: Some(Arc::new(Texture::solid(tracker, [127, 127, 255, 255], "normal"))),
        ..Default::default()
    };
    let material = Arc::new(Material::new(tracker, name, [1.0; 3]).with_maps(maps));
    Object3D::mesh(name, geometry, material)
}
