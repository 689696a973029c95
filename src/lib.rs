// src/lib.rs
//! Memory Tree
//!
//! An interactive 3D tree of ornaments and photos that morphs between a
//! scattered cloud and an assembled tree. The mix is driven by the space bar
//! or by an open/closed hand seen through a camera.
//!
//! The core (`layout`, `blend`, `gesture`, `scene`) is independent of the
//! window and GPU; `gfx` and `app` wire it to winit and wgpu.

pub mod app;
pub mod assets;
pub mod blend;
pub mod config;
pub mod error;
pub mod gesture;
pub mod gfx;
pub mod layout;
pub mod prelude;
pub mod scene;

// Re-export main types for convenience
pub use app::{run, MemoryTreeApp};
pub use config::AppConfig;

/// Runs the app with defaults and environment overrides.
pub fn default() -> anyhow::Result<()> {
    run(AppConfig::from_env())
}
