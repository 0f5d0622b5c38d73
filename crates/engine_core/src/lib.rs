//! Core engine types and utilities for Chromalock.
//!
//! This crate provides the foundational types used across all engine systems:
//! - Transform and spatial components
//! - Time management (frame delta + fixed physics steps)
//! - Tag components shared by the game and physics layers

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
