//! Physics world management with Rapier3D.

use crate::collision::CollisionGroup;
use engine_core::{Quat, Transform, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// Default gravity (m/s²).
pub const DEFAULT_GRAVITY: f32 = -10.0;

/// Collider shape for a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
    /// Y-aligned capsule. `half_height` is half the length of the cylindrical part.
    Capsule { half_height: f32, radius: f32 },
}

impl Shape {
    fn collider_builder(&self) -> ColliderBuilder {
        match *self {
            Shape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape::Ball { radius } => ColliderBuilder::ball(radius),
            Shape::Capsule { half_height, radius } => ColliderBuilder::capsule_y(half_height, radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
    Kinematic,
}

/// Everything needed to create one rigid body with a single collider.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: Shape,
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
    /// Zero friction uses the `Min` combine rule so the contact stays frictionless.
    pub friction: f32,
    pub restitution: f32,
    pub lock_rotations: bool,
    /// Never put the body to sleep (the player must always react to input).
    pub always_awake: bool,
    pub sensor: bool,
    pub groups: InteractionGroups,
}

impl BodyDesc {
    /// Fixed body when `mass` is zero or negative, dynamic otherwise.
    pub fn from_mass(shape: Shape, position: Vec3, mass: f32) -> Self {
        if mass > 0.0 {
            Self::dynamic(shape, position, mass)
        } else {
            Self::fixed(shape, position)
        }
    }

    pub fn fixed(shape: Shape, position: Vec3) -> Self {
        Self {
            kind: BodyKind::Fixed,
            shape,
            position,
            rotation: Quat::IDENTITY,
            mass: 0.0,
            friction: 0.5,
            restitution: 0.0,
            lock_rotations: false,
            always_awake: false,
            sensor: false,
            groups: CollisionGroup::environment(),
        }
    }

    pub fn dynamic(shape: Shape, position: Vec3, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass,
            groups: CollisionGroup::dynamic(),
            ..Self::fixed(shape, position)
        }
    }

    /// Non-colliding volume on a fixed body.
    pub fn sensor(shape: Shape, position: Vec3) -> Self {
        Self {
            sensor: true,
            groups: CollisionGroup::trigger(),
            ..Self::fixed(shape, position)
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_groups(mut self, groups: InteractionGroups) -> Self {
        self.groups = groups;
        self
    }

    pub fn locked_rotations(mut self) -> Self {
        self.lock_rotations = true;
        self
    }

    pub fn always_awake(mut self) -> Self {
        self.always_awake = true;
        self
    }
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default gravity.
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, DEFAULT_GRAVITY, 0.0))
    }

    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![gravity.x, gravity.y, gravity.z],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Advance the simulation by one step of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Create a rigid body and its collider.
    pub fn add_body(&mut self, desc: &BodyDesc) -> (RigidBodyHandle, ColliderHandle) {
        let builder = match desc.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        let mut builder = builder
            .position(to_isometry(desc.position, desc.rotation))
            .can_sleep(!desc.always_awake);
        if desc.lock_rotations {
            builder = builder.lock_rotations();
        }
        let body_handle = self.rigid_body_set.insert(builder.build());

        let friction_rule = if desc.friction <= 0.0 {
            CoefficientCombineRule::Min
        } else {
            CoefficientCombineRule::Average
        };
        let mut collider = desc
            .shape
            .collider_builder()
            .friction(desc.friction.max(0.0))
            .friction_combine_rule(friction_rule)
            .restitution(desc.restitution)
            .collision_groups(desc.groups)
            .sensor(desc.sensor);
        if desc.kind == BodyKind::Dynamic {
            collider = collider.mass(desc.mass);
        }
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider.build(), body_handle, &mut self.rigid_body_set);

        (body_handle, collider_handle)
    }

    /// Get the transform of a rigid body.
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            let rot = body.rotation();
            Transform::from_position_rotation(
                Vec3::new(pos.x, pos.y, pos.z),
                Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
            )
        })
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| {
            let v = body.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    /// Move a body instantly and stop it.
    pub fn teleport(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(vector![position.x, position.y, position.z], true);
            body.set_linvel(Vector::zeros(), true);
            body.set_angvel(Vector::zeros(), true);
        }
    }

    /// Apply a force for the next step. Rapier keeps user forces until reset,
    /// so the previous frame's force is cleared first.
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.reset_forces(false);
            body.add_force(vector![force.x, force.y, force.z], true);
        }
    }

    /// Apply an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
        }
    }

    /// Switch a body to kinematic so it can be driven by `set_kinematic_target`.
    pub fn make_kinematic(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_body_type(RigidBodyType::KinematicPositionBased, true);
        }
    }

    /// Set the position a kinematic body reaches at the end of the next step.
    pub fn set_kinematic_target(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_next_kinematic_translation(vector![position.x, position.y, position.z]);
        }
    }

    /// Body a collider is attached to.
    pub fn collider_parent(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.collider_set.get(collider).and_then(|c| c.parent())
    }

    /// Remove a rigid body and its colliders. Returns false if it was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }
}

fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn zero_mass_creates_fixed_body() {
        let mut world = PhysicsWorld::new();
        let shape = Shape::Cuboid { half_extents: Vec3::splat(0.5) };
        let (fixed, _) = world.add_body(&BodyDesc::from_mass(shape, Vec3::ZERO, 0.0));
        let (dynamic, _) = world.add_body(&BodyDesc::from_mass(shape, Vec3::Y * 5.0, 8.0));
        world.step(DT);
        assert!(world.rigid_body_set[fixed].is_fixed());
        assert!(world.rigid_body_set[dynamic].is_dynamic());
        assert!((world.rigid_body_set[dynamic].mass() - 8.0).abs() < 1e-3);
    }

    #[test]
    fn body_transform_reports_initial_pose() {
        let mut world = PhysicsWorld::new();
        let rotation = Quat::from_rotation_y(0.5);
        let desc = BodyDesc::fixed(Shape::Ball { radius: 1.0 }, Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(rotation);
        let (body, _) = world.add_body(&desc);
        let t = world.body_transform(body).unwrap();
        assert!((t.position - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!(t.rotation.angle_between(rotation) < 1e-4);
    }

    #[test]
    fn dynamic_body_falls() {
        let mut world = PhysicsWorld::new();
        let (body, _) = world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::Y * 10.0, 1.0));
        for _ in 0..30 {
            world.step(DT);
        }
        let y = world.body_transform(body).unwrap().position.y;
        assert!(y < 10.0);
        assert!(world.linear_velocity(body).unwrap().y < 0.0);
    }

    #[test]
    fn apply_force_replaces_previous_force() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (body, _) = world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::ZERO, 1.0));
        world.apply_force(body, Vec3::X * 100.0);
        world.apply_force(body, Vec3::ZERO);
        world.step(DT);
        assert!(world.linear_velocity(body).unwrap().length() < 1e-5);

        world.apply_force(body, Vec3::X * 60.0);
        world.step(DT);
        let v = world.linear_velocity(body).unwrap();
        assert!((v.x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn restitution_makes_bodies_bounce() {
        let bounce_peak = |restitution: f32| {
            let mut world = PhysicsWorld::new();
            world.add_body(
                &BodyDesc::fixed(Shape::Cuboid { half_extents: Vec3::new(10.0, 0.5, 10.0) }, Vec3::ZERO)
                    .with_restitution(restitution),
            );
            let (ball, _) = world.add_body(
                &BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::Y * 3.0, 1.0)
                    .with_restitution(restitution),
            );
            let mut peak = f32::MIN;
            for _ in 0..90 {
                world.step(DT);
                peak = peak.max(world.linear_velocity(ball).unwrap().y);
            }
            peak
        };
        assert!(bounce_peak(0.0) < 0.5);
        assert!(bounce_peak(0.9) > 2.0);
    }

    #[test]
    fn remove_body_twice_is_noop() {
        let mut world = PhysicsWorld::new();
        let (body, collider) = world.add_body(&BodyDesc::fixed(Shape::Ball { radius: 1.0 }, Vec3::ZERO));
        assert_eq!(world.collider_parent(collider), Some(body));
        assert!(world.remove_body(body));
        assert!(!world.remove_body(body));
        assert_eq!(world.collider_set.len(), 0);
        assert!(world.body_transform(body).is_none());
    }

    #[test]
    fn kinematic_target_moves_body() {
        let mut world = PhysicsWorld::new();
        let (body, _) = world.add_body(&BodyDesc::fixed(
            Shape::Cuboid { half_extents: Vec3::ONE },
            Vec3::ZERO,
        ));
        world.make_kinematic(body);
        world.set_kinematic_target(body, Vec3::Y * 2.0);
        world.step(DT);
        let y = world.body_transform(body).unwrap().position.y;
        assert!((y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn teleport_moves_and_stops_body() {
        let mut world = PhysicsWorld::new();
        let (body, _) = world.add_body(&BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::ZERO, 1.0));
        for _ in 0..10 {
            world.step(DT);
        }
        world.teleport(body, Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(world.body_transform(body).unwrap().position, Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(world.linear_velocity(body), Some(Vec3::ZERO));
    }
}
