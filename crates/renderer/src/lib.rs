//! Rendering system using wgpu for Chromalock.

pub mod camera;
pub mod lighting;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod vertex;

pub use camera::*;
pub use lighting::*;
pub use mesh::*;
pub use renderer::*;
pub use scene::*;
pub use vertex::*;
