//! Materials and their optional texture slots.

use std::sync::Arc;

use crate::{
    data_structures::texture::Texture,
    resources::{ResourceHandle, ResourceKind, ResourceTracker},
};

/// The six texture slots a material may carry. Every slot is optional.
#[derive(Debug, Default, Clone)]
pub struct MaterialMaps {
    pub map: Option<Arc<Texture>>,
    pub light_map: Option<Arc<Texture>>,
    pub bump_map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub specular_map: Option<Arc<Texture>>,
    pub env_map: Option<Arc<Texture>>,
}

impl MaterialMaps {
    /// Present slots in release order: base, light, bump, normal, specular, environment.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Texture>> {
        [
            &self.map,
            &self.light_map,
            &self.bump_map,
            &self.normal_map,
            &self.specular_map,
            &self.env_map,
        ]
        .into_iter()
        .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Phong-style surface description.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub handle: ResourceHandle,
    /// Linear RGB.
    pub colour: [f32; 3],
    pub opacity: f32,
    pub flat_shading: bool,
    pub maps: MaterialMaps,
}

impl Material {
    pub fn new(tracker: &ResourceTracker, name: &str, colour: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            handle: tracker.register(ResourceKind::Material),
            colour,
            opacity: 1.0,
            flat_shading: false,
            maps: MaterialMaps::default(),
        }
    }

    pub fn with_flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }

    pub fn with_maps(mut self, maps: MaterialMaps) -> Self {
        self.maps = maps;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// What a node references as its material: one, or one per geometry group.
#[derive(Debug, Clone)]
pub enum MaterialSlot {
    Single(Arc<Material>),
    Multi(Vec<Arc<Material>>),
}

impl MaterialSlot {
    pub fn materials(&self) -> &[Arc<Material>] {
        match self {
            MaterialSlot::Single(material) => std::slice::from_ref(material),
            MaterialSlot::Multi(materials) => materials,
        }
    }

    /// The material used when a node is drawn as a single batch.
    pub fn primary(&self) -> Option<&Arc<Material>> {
        self.materials().first()
    }
}

impl From<Arc<Material>> for MaterialSlot {
    fn from(material: Arc<Material>) -> Self {
        MaterialSlot::Single(material)
    }
}

impl From<Vec<Arc<Material>>> for MaterialSlot {
    fn from(materials: Vec<Arc<Material>>) -> Self {
        MaterialSlot::Multi(materials)
    }
}

/// Converts a `0xRRGGBB` colour from sRGB into linear RGB.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}
