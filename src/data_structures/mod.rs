//! Viewer data structures: scene graph, geometry, materials, textures and transforms.
//!
//! - `scene_graph` holds the node tree and the scene root
//! - `geometry` holds vertex data and geometry handles
//! - `material` holds materials, their six optional texture slots and material slots
//! - `texture` holds decoded texture data
//! - `light` holds the directional light type and the default rig
//! - `instance` holds node transforms and their GPU layout

pub mod geometry;
pub mod instance;
pub mod light;
pub mod material;
pub mod scene_graph;
pub mod texture;
