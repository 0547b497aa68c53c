//! Scene disposal.
//!
//! GPU memory is not reclaimed when a node is dropped. Before content leaves
//! the scene, every geometry, material and texture it references has to be
//! disposed so the renderer can free the backing buffers. [`reset_scene`] does
//! that for the whole scene and leaves the root with only the default lights.

use crate::{
    data_structures::{
        light::DirectionalLight,
        material::{Material, MaterialSlot},
        scene_graph::{Object3D, Scene},
    },
    resources::{ResourceInfo, ResourceTracker},
};

/// What a disposal pass actually released. Handles that were already
/// disposed (e.g. shared by several nodes) are not counted twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeStats {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl std::ops::AddAssign for DisposeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.geometries += rhs.geometries;
        self.materials += rhs.materials;
        self.textures += rhs.textures;
    }
}

/// Releases a material's texture slots (base, light, bump, normal, specular,
/// environment) and then the material itself.
pub fn dispose_material(material: &Material) -> DisposeStats {
    let mut stats = DisposeStats::default();
    for texture in material.maps.iter() {
        if texture.dispose() {
            stats.textures += 1;
        }
    }
    if material.handle.dispose() {
        stats.materials += 1;
    }
    stats
}

fn dispose_node(node: &Object3D) -> DisposeStats {
    let mut stats = DisposeStats::default();
    if let Some(geometry) = &node.geometry {
        if geometry.dispose() {
            stats.geometries += 1;
        }
    }
    match &node.material {
        Some(MaterialSlot::Multi(materials)) => {
            for material in materials {
                stats += dispose_material(material);
            }
        }
        Some(MaterialSlot::Single(material)) => stats += dispose_material(material),
        None => (),
    }
    stats
}

/// Releases every GPU resource referenced by `object` and its descendants.
/// The tree itself is left untouched.
pub fn dispose_object(object: &Object3D) -> DisposeStats {
    let mut stats = DisposeStats::default();
    object.traverse(&mut |node| stats += dispose_node(node));
    stats
}

/// Releases everything reachable from the root, then detaches all top-level
/// children. The root is kept and stays empty.
pub fn dispose_scene(scene: &mut Scene) -> DisposeStats {
    let mut stats = DisposeStats::default();
    scene.traverse(&mut |node| stats += dispose_node(node));
    let removed = scene.drain_children();
    log::debug!(
        "disposed {} geometries, {} materials, {} textures; detached {} nodes",
        stats.geometries,
        stats.materials,
        stats.textures,
        removed.len()
    );
    stats
}

/// Adds one scene node per light.
pub fn add_lights(scene: &mut Scene, lights: &[DirectionalLight]) {
    for (i, light) in lights.iter().enumerate() {
        scene.add(Object3D::light(&format!("light-{i}"), light.clone()));
    }
}

/// Empties the scene, re-adds `lights` and reports what is still alive in the backend.
pub fn reset_scene(
    scene: &mut Scene,
    tracker: &ResourceTracker,
    lights: &[DirectionalLight],
) -> ResourceInfo {
    dispose_scene(scene);
    add_lights(scene, lights);
    let info = tracker.info();
    log::info!(
        "scene reset: {} geometries, {} programs, {} textures alive",
        info.geometries,
        info.programs,
        info.textures
    );
    info
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        data_structures::{
            geometry::Geometry,
            material::MaterialMaps,
            scene_graph::Label,
            texture::Texture,
        },
        resources::ResourceKind,
    };

    fn texture(tracker: &ResourceTracker, label: &str) -> Option<Arc<Texture>> {
        Some(Arc::new(Texture::solid(tracker, [255; 4], label)))
    }

    #[test]
    fn material_with_all_maps_releases_seven_handles() {
        let tracker = ResourceTracker::new();
        let maps = MaterialMaps {
            map: texture(&tracker, "map"),
            light_map: texture(&tracker, "light"),
            bump_map: texture(&tracker, "bump"),
            normal_map: texture(&tracker, "normal"),
            specular_map: texture(&tracker, "specular"),
            env_map: texture(&tracker, "env"),
        };
        let material = Material::new(&tracker, "full", [1.0; 3]).with_maps(maps);

        let stats = dispose_material(&material);
        assert_eq!(
            stats,
            DisposeStats {
                geometries: 0,
                materials: 1,
                textures: 6
            }
        );
        assert_eq!(tracker.info().textures, 0);
        assert!(material.maps.iter().all(|t| t.handle.is_disposed()));
    }

    #[test]
    fn material_without_maps_only_releases_itself() {
        let tracker = ResourceTracker::new();
        let material = Material::new(&tracker, "plain", [1.0; 3]);
        let stats = dispose_material(&material);
        assert_eq!(stats.materials, 1);
        assert_eq!(stats.textures, 0);
    }

    #[test]
    fn multi_material_node_releases_each_member() {
        let tracker = ResourceTracker::new();
        let geometry = Arc::new(Geometry::tetrahedron(&tracker, 1.0));
        let materials: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| Arc::new(Material::new(&tracker, name, [1.0; 3])))
            .collect();
        let node = Object3D::mesh("multi", geometry, materials.clone());

        let stats = dispose_object(&node);
        assert_eq!(stats.materials, 3);
        assert_eq!(stats.geometries, 1);
        assert!(materials.iter().all(|m| m.handle.is_disposed()));
    }

    #[test]
    fn empty_nodes_release_nothing() {
        let tracker = ResourceTracker::new();
        let mut group = Object3D::group("empty");
        group.add_child(Object3D::label("l", Label::new("x")));
        assert_eq!(dispose_object(&group), DisposeStats::default());
        assert_eq!(tracker.released(ResourceKind::Geometry), 0);
    }

    #[test]
    fn shared_handles_are_released_once() {
        let tracker = ResourceTracker::new();
        let geometry = Arc::new(Geometry::tetrahedron(&tracker, 1.0));
        let material = Arc::new(Material::new(&tracker, "shared", [1.0; 3]));
        let mut group = Object3D::group("many");
        for i in 0..50 {
            group.add_child(Object3D::mesh(&format!("m{i}"), geometry.clone(), material.clone()));
        }

        let stats = dispose_object(&group);
        assert_eq!(stats.geometries, 1);
        assert_eq!(stats.materials, 1);
        assert_eq!(tracker.released(ResourceKind::Geometry), 1);
        assert_eq!(tracker.released(ResourceKind::Material), 1);
    }

    #[test]
    fn reset_leaves_only_the_lights() {
        let tracker = ResourceTracker::new();
        let mut scene = Scene::new();
        let lights = DirectionalLight::default_rig();
        add_lights(&mut scene, &lights);
        for i in 0..4 {
            let geometry = Arc::new(Geometry::tetrahedron(&tracker, 1.0));
            let material = Arc::new(
                Material::new(&tracker, "m", [1.0; 3]).with_maps(MaterialMaps {
                    map: texture(&tracker, "base"),
                    ..Default::default()
                }),
            );
            scene.add(Object3D::mesh(&format!("content-{i}"), geometry, material));
        }
        assert_eq!(tracker.info().geometries, 4);
        assert_eq!(tracker.info().textures, 4);

        let info = reset_scene(&mut scene, &tracker, &lights);

        assert_eq!(info, ResourceInfo::default());
        assert_eq!(scene.children().len(), 3);
        assert!(scene.find_by_name("content-0").is_none());
    }

    #[test]
    fn dispose_scene_leaves_the_root_empty() {
        let tracker = ResourceTracker::new();
        let mut scene = Scene::new();
        let geometry = Arc::new(Geometry::tetrahedron(&tracker, 1.0));
        let material = Arc::new(Material::new(&tracker, "m", [1.0; 3]));
        scene.add(Object3D::mesh("a", geometry.clone(), material.clone()));
        scene.add(Object3D::mesh("b", geometry, material));

        dispose_scene(&mut scene);
        assert!(scene.children().is_empty());
        // disposing again finds nothing left to release
        assert_eq!(dispose_scene(&mut scene), DisposeStats::default());
    }
}
