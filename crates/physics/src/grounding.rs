//! Slope-based ground detection from the player's contact manifolds.
//!
//! Every step the contacts touching the player are scanned, each normal is
//! oriented to point from the touched surface toward the player, and the one
//! closest to straight up decides whether the player stands on something.
//! The state is recomputed from scratch each step.

use crate::PhysicsWorld;
use engine_core::Vec3;
use rapier3d::prelude::RigidBodyHandle;

/// One contact point seen by the player body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// World-space normal pointing from the other surface toward the player.
    pub normal: Vec3,
    /// Signed distance between the surfaces (negative while penetrating).
    pub distance: f32,
}

/// Ground test parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundProbe {
    /// Contacts farther apart than this are ignored.
    pub max_contact_distance: f32,
    /// Steepest walkable slope, in radians from the up axis.
    pub max_slope_angle: f32,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self {
            max_contact_distance: 1.0,
            max_slope_angle: 45.0_f32.to_radians(),
        }
    }
}

/// Result of one ground test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundState {
    pub grounded: bool,
    /// Most upward-facing contact normal, if any contact qualified.
    pub normal: Option<Vec3>,
    /// Angle between `normal` and +Y (π when there is no contact).
    pub slope_angle: f32,
}

impl GroundState {
    pub const AIRBORNE: GroundState = GroundState {
        grounded: false,
        normal: None,
        slope_angle: std::f32::consts::PI,
    };
}

impl Default for GroundState {
    fn default() -> Self {
        Self::AIRBORNE
    }
}

/// Angle between a direction and +Y.
pub fn angle_from_up(normal: Vec3) -> f32 {
    normal.normalize_or_zero().y.clamp(-1.0, 1.0).acos()
}

/// Normal with the smallest angle from up among contacts within `max_distance`.
///
/// The search starts from straight down, so a normal only wins if it is
/// strictly more upward than everything seen before.
pub fn best_ground_normal(contacts: &[GroundContact], max_distance: f32) -> Option<Vec3> {
    let mut best: Option<Vec3> = None;
    let mut best_angle = std::f32::consts::PI;

    for contact in contacts.iter().filter(|c| c.distance <= max_distance) {
        let angle = angle_from_up(contact.normal);
        if angle < best_angle {
            best_angle = angle;
            best = Some(contact.normal);
        }
    }
    best
}

impl GroundProbe {
    pub fn evaluate(&self, contacts: &[GroundContact]) -> GroundState {
        match best_ground_normal(contacts, self.max_contact_distance) {
            Some(normal) => {
                let slope_angle = angle_from_up(normal);
                GroundState {
                    grounded: slope_angle < self.max_slope_angle,
                    normal: Some(normal),
                    slope_angle,
                }
            }
            None => GroundState::AIRBORNE,
        }
    }
}

impl PhysicsWorld {
    /// Every contact point between `body`'s colliders and anything else, with
    /// normals oriented toward `body`.
    pub fn player_contacts(&self, body: RigidBodyHandle) -> Vec<GroundContact> {
        let Some(rigid_body) = self.rigid_body_set.get(body) else {
            return Vec::new();
        };

        let mut contacts = Vec::new();
        for &collider in rigid_body.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                // Manifold normals point from collider1 toward collider2.
                let sign = if pair.collider1 == collider { -1.0 } else { 1.0 };
                for manifold in &pair.manifolds {
                    let n = manifold.data.normal;
                    let normal = Vec3::new(n.x, n.y, n.z) * sign;
                    contacts.extend(manifold.points.iter().map(|point| GroundContact {
                        normal,
                        distance: point.dist,
                    }));
                }
            }
        }
        contacts
    }

    pub fn ground_state(&self, body: RigidBodyHandle, probe: &GroundProbe) -> GroundState {
        probe.evaluate(&self.player_contacts(body))
    }
}
