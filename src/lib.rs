//! orbit-viewer
//!
//! A small 3D scene viewer for native windows and the browser. It sets up a
//! wgpu renderer, a perspective camera with orbit controls, a three-light rig,
//! an HTML label overlay and a decorative particle field, then drives one
//! cancellable frame loop. Content added to the scene can be torn down again
//! with [`dispose::reset_scene`], which releases every GPU resource it
//! references.
//!
//! High-level modules
//! - `config`: every default the viewer starts with
//! - `context`: [`context::ViewerContext`], the owner of scene, camera, controls and renderers
//! - `data_structures`: scene graph, geometry, materials, textures, lights, transforms
//! - `dispose`: releasing scene content and resetting the scene
//! - `flow`: the winit event loop, container mounting and the loop handle
//! - `label`: the HTML label overlay
//! - `render`: primary renderers (wgpu and headless)
//! - `resources`: GPU resource tracking and asset loading
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod dispose;
pub mod error;
pub mod flow;
pub mod label;
pub mod particles;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use config::ViewerConfig;
pub use context::ViewerContext;
pub use error::{Result, ViewerError};
pub use flow::{LoopHandle, run};
pub use render::{HeadlessRenderer, SceneRenderer, WgpuRenderer};
pub use resources::{ResourceInfo, ResourceTracker};
pub use winit::event::WindowEvent;
