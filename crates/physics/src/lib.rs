//! Physics system using Rapier3D for Chromalock.

pub mod collision;
pub mod grounding;
pub mod physics_world;
pub mod sensor;

pub use collision::*;
pub use grounding::*;
pub use physics_world::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
