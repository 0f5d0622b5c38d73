//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for different body types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (floor, walls, gates)
    Environment = 1 << 0,
    /// Player capsule
    Player = 1 << 1,
    /// Crates and other simulated props
    Dynamic = 1 << 2,
    /// Triggers and sensors
    Trigger = 1 << 3,
}

impl CollisionGroup {
    fn bits(groups: &[CollisionGroup]) -> Group {
        Group::from_bits_retain(groups.iter().fold(0, |acc, g| acc | *g as u32))
    }

    /// Environment: collides with everything.
    pub fn environment() -> InteractionGroups {
        InteractionGroups::new(Self::bits(&[Self::Environment]), Group::ALL)
    }

    /// Player: blocked by the world and props, detected by triggers.
    pub fn player() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::Player]),
            Self::bits(&[Self::Environment, Self::Dynamic, Self::Trigger]),
        )
    }

    /// Props: same as the player, plus each other and the player.
    pub fn dynamic() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::Dynamic]),
            Self::bits(&[Self::Environment, Self::Player, Self::Dynamic, Self::Trigger]),
        )
    }

    /// Triggers only look for the player and props.
    pub fn trigger() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::Trigger]),
            Self::bits(&[Self::Player, Self::Dynamic]),
        )
    }
}
