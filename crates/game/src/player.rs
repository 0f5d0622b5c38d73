//! Player controller: a force-driven capsule that can only push itself
//! around while standing on something walkable.

use crate::engine::{Engine, EngineError, ObjectDesc};
use engine_core::Vec3;
use glam::Vec2;
use hecs::Entity;
use physics::{BodyDesc, CollisionGroup, GroundProbe, GroundState, Shape};
use serde::{Deserialize, Serialize};

/// Movement constants. Every field can be overridden from `config.ron`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    /// Half the length of the capsule's cylindrical section.
    pub half_height: f32,
    pub mass: f32,
    /// Horizontal force while grounded.
    pub move_force: f32,
    /// Fraction of `move_force` available in the air.
    pub air_control: f32,
    /// Horizontal velocity multiplier applied every grounded step.
    pub ground_damping: f32,
    pub jump_impulse: f32,
    /// Camera height above the body center.
    pub eye_height: f32,
    /// Steepest walkable slope in degrees.
    pub max_slope_degrees: f32,
    /// Contacts farther apart than this do not count as ground.
    pub max_contact_distance: f32,
    /// How far along +X a dropped crate appears.
    pub crate_drop_distance: f32,
    pub crate_size: f32,
    pub crate_mass: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: 1.0,
            half_height: 1.0,
            mass: 8.0,
            move_force: 288.0,
            air_control: 0.1,
            ground_damping: 0.95,
            jump_impulse: 60.0,
            eye_height: 1.0,
            max_slope_degrees: 45.0,
            max_contact_distance: 1.0,
            crate_drop_distance: 2.0,
            crate_size: 1.0,
            crate_mass: 8.0,
        }
    }
}

impl PlayerTuning {
    pub fn probe(&self) -> GroundProbe {
        GroundProbe {
            max_contact_distance: self.max_contact_distance,
            max_slope_angle: self.max_slope_degrees.to_radians(),
        }
    }

    /// Frictionless, upright, never-sleeping capsule.
    pub fn body(&self, position: Vec3) -> BodyDesc {
        BodyDesc::dynamic(
            Shape::Capsule {
                half_height: self.half_height,
                radius: self.radius,
            },
            position,
            self.mass,
        )
        .with_friction(0.0)
        .with_groups(CollisionGroup::player())
        .locked_rotations()
        .always_awake()
    }
}

/// What the player asked for this step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    /// x = strafe right, y = forward; length at most 1.
    pub axes: Vec2,
    /// Horizontal camera forward.
    pub forward: Vec3,
    /// Horizontal camera right.
    pub right: Vec3,
}

pub struct PlayerController {
    pub tuning: PlayerTuning,
    probe: GroundProbe,
    ground: GroundState,
    jump_requested: bool,
}

impl PlayerController {
    pub fn new(tuning: PlayerTuning) -> Self {
        Self {
            probe: tuning.probe(),
            tuning,
            ground: GroundState::AIRBORNE,
            jump_requested: false,
        }
    }

    pub fn spawn(&self, engine: &mut Engine, position: Vec3) -> Result<Entity, EngineError> {
        engine.spawn_player(ObjectDesc::new(self.tuning.body(position)).named("player"))
    }

    /// Latch a jump; the next fixed step consumes it whether or not it fires.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    pub fn ground(&self) -> GroundState {
        self.ground
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.grounded
    }

    /// One fixed step of movement, applied before the physics step. Ground
    /// state comes from the contacts of the previous step.
    pub fn fixed_update(&mut self, engine: &mut Engine, intent: MoveIntent) {
        self.ground = engine.player_ground_state(&self.probe);
        let jump = std::mem::take(&mut self.jump_requested);
        let Some(body) = engine.player_body() else {
            return;
        };

        let mut speed = self.tuning.move_force;
        if self.ground.grounded {
            if let Some(velocity) = engine.physics.linear_velocity(body) {
                let damping = self.tuning.ground_damping;
                let damped = Vec3::new(velocity.x * damping, velocity.y, velocity.z * damping);
                engine.physics.set_linear_velocity(body, damped);
            }
        } else {
            speed *= self.tuning.air_control;
        }

        let force = (intent.forward * intent.axes.y + intent.right * intent.axes.x) * speed;
        engine.physics.apply_force(body, force);

        if jump && self.ground.grounded {
            engine
                .physics
                .apply_impulse(body, Vec3::Y * self.tuning.jump_impulse);
            log::debug!("Jump");
        }
    }

    /// Where the camera sits.
    pub fn eye_position(&self, engine: &Engine) -> Option<Vec3> {
        let player = engine.player()?;
        engine
            .transform_of(player)
            .map(|pose| pose.position + Vec3::Y * self.tuning.eye_height)
    }

    /// Drop point for a new crate next to the player.
    pub fn crate_drop_point(&self, engine: &Engine) -> Option<Vec3> {
        let player = engine.player()?;
        engine
            .transform_of(player)
            .map(|pose| pose.position + Vec3::X * self.tuning.crate_drop_distance)
    }
}
