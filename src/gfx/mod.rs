//! # Graphics Module
//!
//! GPU side of the memory tree: an orbit camera, procedural meshes for every
//! ornament shape, and a renderer that draws each frame's poses as one
//! instanced batch per shape.
//!
//! - **Camera** ([`camera`]) - orbit camera, mouse controller, hand pointer offset
//! - **Geometry** ([`geometry`]) - sphere, cube, star, icosahedron, cone meshes
//! - **Renderer** ([`render_engine`]) - surface, depth buffer, lit instanced pipeline
//!
//! The scene never talks to wgpu directly; it pushes poses through
//! [`RenderSurface`](crate::scene::RenderSurface), which [`RenderEngine`]
//! implements.

pub mod camera;
pub mod geometry;
pub mod globals;
pub mod instanced;
pub mod render_engine;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use render_engine::RenderEngine;
