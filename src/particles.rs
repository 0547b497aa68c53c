//! Decorative particle field: small flat-shaded tetrahedra scattered on a
//! spherical shell around the origin, spun slowly every frame.

use std::sync::Arc;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    config::ParticleConfig,
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        material::{Material, hex_to_linear},
        scene_graph::Object3D,
    },
    resources::ResourceTracker,
};

/// Name of the group node holding the particles.
pub const PARTICLE_GROUP: &str = "particles";

/// Radius of each tetrahedron.
const PARTICLE_SIZE: f32 = 1.0;

/// Uniform random direction drawn from the cube [-0.5, 0.5]^3.
fn random_direction(rng: &mut impl Rng) -> Vector3<f32> {
    loop {
        let v = Vector3::new(
            rng.r#gen::<f32>() - 0.5,
            rng.r#gen::<f32>() - 0.5,
            rng.r#gen::<f32>() - 0.5,
        );
        // the zero vector has no direction
        if v.magnitude2() > 1e-12 {
            return v.normalize();
        }
    }
}

/// Builds the particle group. All meshes share one geometry and one material.
pub fn build_particle_field(tracker: &ResourceTracker, config: &ParticleConfig) -> Object3D {
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let geometry = Arc::new(Geometry::tetrahedron(tracker, PARTICLE_SIZE));
    let material = Arc::new(
        Material::new(tracker, "particle", hex_to_linear(0xffffff)).with_flat_shading(true),
    );

    let mut group = Object3D::group(PARTICLE_GROUP);
    for i in 0..config.count {
        let radius = config.min_radius + rng.r#gen::<f32>() * config.radius_spread;
        let position = random_direction(&mut rng) * radius;
        let transform = Instance::from(position).with_euler(
            rng.r#gen::<f32>() * config.max_rotation,
            rng.r#gen::<f32>() * config.max_rotation,
            rng.r#gen::<f32>() * config.max_rotation,
        );
        group.add_child(
            Object3D::mesh(&format!("particle-{i}"), geometry.clone(), material.clone())
                .with_transform(transform),
        );
    }
    log::debug!("built particle field with {} meshes", config.count);
    group
}

/// Advances the field's rotation by one frame.
pub fn spin(group: &mut Object3D, spin_per_frame: [f32; 2]) {
    let [x, y] = spin_per_frame;
    let step = Quaternion::from_angle_x(Rad(x)) * Quaternion::from_angle_y(Rad(y));
    group.transform.rotation = (group.transform.rotation * step).normalize();
}
