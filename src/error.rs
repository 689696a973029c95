//! Error types shared across the crate.
//!
//! None of these are fatal to the render loop: asset errors are replaced by
//! fallbacks, gesture errors disable gesture control, and render errors skip
//! a frame or reconfigure the surface.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to fetch or decode an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {0} has no pixels")]
    EmptyImage(PathBuf),

    #[error("failed to parse font {path}: {source}")]
    Font {
        path: PathBuf,
        #[source]
        source: ab_glyph::InvalidFont,
    },
}

/// Failure in the camera / hand-pose pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GestureError {
    #[error("hand-pose model failed to load: {0}")]
    ModelLoad(String),

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("hand-pose model is not ready")]
    NotReady,
}

/// Failure in the GPU render collaborator.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface has no supported formats")]
    NoSurfaceFormat,

    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}
