//! Error types shared by the viewer.

use thiserror::Error;

/// Everything that can go wrong while setting up or driving the viewer.
///
/// Disposal has no failure mode and therefore no variant here.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The DOM element the canvas and label layer are mounted into does not exist.
    #[error("container element #{0} not found in the document")]
    ContainerMissing(String),

    #[error("DOM operation failed: {0}")]
    Dom(String),

    #[error("GPU setup failed: {0}")]
    Gpu(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("could not decode texture: {0}")]
    Texture(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
