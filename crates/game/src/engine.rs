//! Objects (a scene node driven by a rigid body) and triggers (sensor
//! volumes with a callback), kept in one hecs world.
//!
//! Each frame the game steps physics, calls [`Engine::sync_objects`] to copy
//! body poses onto their nodes, then [`Engine::dispatch_triggers`] to run
//! trigger callbacks for everything currently overlapping a trigger.

use crate::game_event::GameEvent;
use engine_core::{Name, Player, Quat, Transform, Vec3};
use hecs::{Entity, EntityBuilder, World};
use physics::{
    BodyDesc, ColliderHandle, GroundProbe, GroundState, PhysicsWorld, RigidBodyHandle, Shape,
};
use renderer::{MeshData, MeshId, NodeId, Scene, SceneError};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Rigid body backing an entity.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub handle: RigidBodyHandle,
}

/// Scene node drawing an entity.
#[derive(Debug, Clone, Copy)]
pub struct Visual {
    pub node: NodeId,
}

pub type TriggerCallback = Box<dyn FnMut(&Overlap, &mut Commands) + Send + Sync>;

struct TriggerVolume {
    collider: ColliderHandle,
    callback: TriggerCallback,
}

/// One body found inside a trigger during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub trigger: Entity,
    pub other: Entity,
    pub other_body: RigidBodyHandle,
    pub is_player: bool,
}

/// Deferred world changes requested by trigger callbacks.
#[derive(Debug, Default)]
pub struct Commands {
    destroyed: Vec<Entity>,
    events: Vec<GameEvent>,
}

impl Commands {
    /// Schedule `entity` for destruction once every callback has run.
    pub fn destroy(&mut self, entity: Entity) {
        if !self.destroyed.contains(&entity) {
            self.destroyed.push(entity);
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn is_destroyed(&self, entity: Entity) -> bool {
        self.destroyed.contains(&entity)
    }
}

/// Where an entity's mesh comes from.
#[derive(Debug, Clone)]
pub enum MeshSource {
    /// Geometry owned by this entity, released with it.
    Owned(MeshData),
    /// A mesh registered once and shared by many entities.
    Shared(MeshId),
}

impl MeshSource {
    /// Geometry that matches a collider shape.
    pub fn for_shape(shape: &Shape) -> Self {
        MeshSource::Owned(mesh_for_shape(shape))
    }
}

pub fn mesh_for_shape(shape: &Shape) -> MeshData {
    match *shape {
        Shape::Cuboid { half_extents } => MeshData::cuboid(half_extents),
        Shape::Ball { radius } => MeshData::sphere(radius, 24, 16),
        Shape::Capsule { half_height, radius } => MeshData::capsule(radius, half_height, 24, 8),
    }
}

#[derive(Debug, Clone)]
pub struct VisualDesc {
    pub mesh: MeshSource,
    pub color: [f32; 4],
    pub scale: Vec3,
}

impl VisualDesc {
    pub fn new(mesh: MeshSource, color: [f32; 4]) -> Self {
        Self {
            mesh,
            color,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

/// A physical object, optionally drawn.
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    pub body: BodyDesc,
    pub visual: Option<VisualDesc>,
    pub name: Option<String>,
}

impl ObjectDesc {
    /// Invisible object.
    pub fn new(body: BodyDesc) -> Self {
        Self {
            body,
            visual: None,
            name: None,
        }
    }

    /// Object drawn with a mesh matching its collider.
    pub fn shaped(body: BodyDesc, color: [f32; 4]) -> Self {
        let visual = VisualDesc::new(MeshSource::for_shape(&body.shape), color);
        Self::new(body).with_visual(visual)
    }

    pub fn with_visual(mut self, visual: VisualDesc) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TriggerDesc {
    pub shape: Shape,
    pub position: Vec3,
    pub rotation: Quat,
    pub visual: Option<VisualDesc>,
    pub name: Option<String>,
}

impl TriggerDesc {
    pub fn new(shape: Shape, position: Vec3) -> Self {
        Self {
            shape,
            position,
            rotation: Quat::IDENTITY,
            visual: None,
            name: None,
        }
    }

    pub fn with_visual(mut self, visual: VisualDesc) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

pub struct Engine {
    pub world: World,
    pub physics: PhysicsWorld,
    pub scene: Scene,
    bodies: HashMap<RigidBodyHandle, Entity>,
    player: Option<Entity>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_physics(PhysicsWorld::new())
    }

    pub fn with_physics(physics: PhysicsWorld) -> Self {
        Self {
            world: World::new(),
            physics,
            scene: Scene::new(),
            bodies: HashMap::new(),
            player: None,
        }
    }

    fn add_visual(&mut self, visual: VisualDesc, pose: Transform) -> Result<NodeId, EngineError> {
        let mesh = match visual.mesh {
            MeshSource::Owned(data) => self.scene.add_mesh(data),
            MeshSource::Shared(id) => id,
        };
        Ok(self.scene.add_node(mesh, pose.with_scale(visual.scale), visual.color)?)
    }

    /// Create a body and its visual. The initial pose comes from the body
    /// descriptor.
    pub fn spawn_object(&mut self, desc: ObjectDesc) -> Result<Entity, EngineError> {
        self.spawn_body(desc, false)
    }

    fn spawn_body(&mut self, desc: ObjectDesc, is_player: bool) -> Result<Entity, EngineError> {
        let pose = Transform::from_position_rotation(desc.body.position, desc.body.rotation);
        let node = desc
            .visual
            .map(|visual| self.add_visual(visual, pose))
            .transpose()?;
        let (handle, _) = self.physics.add_body(&desc.body);

        let mut builder = EntityBuilder::new();
        builder.add(Body { handle });
        if let Some(node) = node {
            builder.add(Visual { node });
        }
        if let Some(name) = desc.name {
            builder.add(Name::new(name));
        }
        if is_player {
            builder.add(Player);
        }
        let entity = self.world.spawn(builder.build());
        self.bodies.insert(handle, entity);
        log::debug!("Spawned {:?} object {entity:?}", desc.body.kind);
        Ok(entity)
    }

    /// Spawn the player object and remember it for ground tests.
    pub fn spawn_player(&mut self, desc: ObjectDesc) -> Result<Entity, EngineError> {
        if let Some(previous) = self.player {
            self.destroy(previous);
        }
        let entity = self.spawn_body(desc, true)?;
        self.player = Some(entity);
        Ok(entity)
    }

    /// A drawn entity with no physical presence.
    pub fn spawn_visual(
        &mut self,
        mesh: MeshSource,
        transform: Transform,
        color: [f32; 4],
    ) -> Result<Entity, EngineError> {
        let mesh = match mesh {
            MeshSource::Owned(data) => self.scene.add_mesh(data),
            MeshSource::Shared(id) => id,
        };
        let node = self.scene.add_node(mesh, transform, color)?;
        Ok(self.world.spawn((Visual { node },)))
    }

    /// A sensor volume on a fixed body. `callback` runs once per overlapping
    /// body each time triggers are dispatched.
    pub fn spawn_trigger<F>(&mut self, desc: TriggerDesc, callback: F) -> Result<Entity, EngineError>
    where
        F: FnMut(&Overlap, &mut Commands) + Send + Sync + 'static,
    {
        let pose = Transform::from_position_rotation(desc.position, desc.rotation);
        let node = desc
            .visual
            .map(|visual| self.add_visual(visual, pose))
            .transpose()?;
        let body = BodyDesc::sensor(desc.shape, desc.position).with_rotation(desc.rotation);
        let (handle, collider) = self.physics.add_body(&body);

        let mut builder = EntityBuilder::new();
        builder.add(Body { handle });
        builder.add(TriggerVolume {
            collider,
            callback: Box::new(callback),
        });
        if let Some(node) = node {
            builder.add(Visual { node });
        }
        if let Some(name) = desc.name {
            builder.add(Name::new(name));
        }
        let entity = self.world.spawn(builder.build());
        self.bodies.insert(handle, entity);
        log::debug!("Spawned trigger {entity:?}");
        Ok(entity)
    }

    /// Remove an entity's body, node and components. Returns false (and does
    /// nothing) if it was already destroyed.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.world.contains(entity) {
            return false;
        }

        if let Ok(handle) = self.world.get::<&Body>(entity).map(|body| body.handle) {
            self.physics.remove_body(handle);
            self.bodies.remove(&handle);
        }
        if let Ok(node) = self.world.get::<&Visual>(entity).map(|visual| visual.node) {
            self.scene.remove_node(node);
        }
        if self.player == Some(entity) {
            self.player = None;
        }
        let _ = self.world.despawn(entity);
        log::debug!("Destroyed {entity:?}");
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Copy every body's position and orientation onto its node; node scale
    /// is left alone.
    pub fn sync_objects(&mut self) {
        for (_, (body, visual)) in self.world.query::<(&Body, &Visual)>().iter() {
            let Some(pose) = self.physics.body_transform(body.handle) else {
                continue;
            };
            if let Some(mut transform) = self.scene.node(visual.node).map(|node| node.transform) {
                transform.set_pose(&pose);
                self.scene.set_transform(visual.node, transform);
            }
        }
    }

    /// Run trigger callbacks for every (trigger, overlapping body) pair and
    /// return the events they emitted.
    ///
    /// Overlaps are collected for all triggers before any callback runs.
    /// Destruction requested by a callback happens after the last callback;
    /// until then, pairs involving an entity scheduled for destruction are
    /// skipped.
    pub fn dispatch_triggers(&mut self) -> Vec<GameEvent> {
        let mut overlaps = Vec::new();
        for (trigger, volume) in self.world.query::<&TriggerVolume>().iter() {
            for other_body in self.physics.overlapping_bodies(volume.collider) {
                let Some(&other) = self.bodies.get(&other_body) else {
                    continue;
                };
                if other == trigger {
                    continue;
                }
                overlaps.push(Overlap {
                    trigger,
                    other,
                    other_body,
                    is_player: self.player == Some(other),
                });
            }
        }

        let mut commands = Commands::default();
        for overlap in &overlaps {
            if commands.is_destroyed(overlap.trigger) || commands.is_destroyed(overlap.other) {
                continue;
            }
            if let Ok(mut volume) = self.world.get::<&mut TriggerVolume>(overlap.trigger) {
                (volume.callback)(overlap, &mut commands);
            }
        }

        let Commands { destroyed, events } = commands;
        for entity in destroyed {
            self.destroy(entity);
        }
        events
    }

    pub fn step(&mut self, dt: f32) {
        self.physics.step(dt);
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn body_of(&self, entity: Entity) -> Option<RigidBodyHandle> {
        self.world.get::<&Body>(entity).ok().map(|body| body.handle)
    }

    pub fn entity_of(&self, body: RigidBodyHandle) -> Option<Entity> {
        self.bodies.get(&body).copied()
    }

    pub fn player_body(&self) -> Option<RigidBodyHandle> {
        self.player.and_then(|player| self.body_of(player))
    }

    /// Ground state of the player from the contacts of the last step.
    pub fn player_ground_state(&self, probe: &GroundProbe) -> GroundState {
        match self.player_body() {
            Some(body) => self.physics.ground_state(body, probe),
            None => GroundState::AIRBORNE,
        }
    }

    /// Current pose of an entity's body.
    pub fn transform_of(&self, entity: Entity) -> Option<Transform> {
        self.body_of(entity)
            .and_then(|body| self.physics.body_transform(body))
    }

    pub fn name_of(&self, entity: Entity) -> Option<String> {
        self.world
            .get::<&Name>(entity)
            .ok()
            .map(|name| name.as_str().to_owned())
    }

    pub fn set_color(&mut self, entity: Entity, color: [f32; 4]) -> bool {
        match self.world.get::<&Visual>(entity).map(|visual| visual.node) {
            Ok(node) => self.scene.set_color(node, color),
            Err(_) => false,
        }
    }

    /// Hand an entity's body over to scripted motion.
    pub fn make_kinematic(&mut self, entity: Entity) -> bool {
        match self.body_of(entity) {
            Some(body) => {
                self.physics.make_kinematic(body);
                true
            }
            None => false,
        }
    }

    pub fn set_kinematic_target(&mut self, entity: Entity, position: Vec3) -> bool {
        match self.body_of(entity) {
            Some(body) => {
                self.physics.set_kinematic_target(body, position);
                true
            }
            None => false,
        }
    }

    pub fn teleport(&mut self, entity: Entity, position: Vec3) -> bool {
        match self.body_of(entity) {
            Some(body) => {
                self.physics.teleport(body, position);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::CollisionGroup;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const DT: f32 = 1.0 / 60.0;
    const WHITE: [f32; 4] = [1.0; 4];

    fn zero_g() -> Engine {
        Engine::with_physics(PhysicsWorld::with_gravity(Vec3::ZERO))
    }

    fn ball(engine: &mut Engine, position: Vec3) -> Entity {
        engine
            .spawn_object(ObjectDesc::shaped(
                BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, position, 1.0),
                WHITE,
            ))
            .unwrap()
    }

    fn counting_trigger(engine: &mut Engine, position: Vec3, calls: Arc<AtomicUsize>) -> Entity {
        engine
            .spawn_trigger(
                TriggerDesc::new(Shape::Cuboid { half_extents: Vec3::splat(2.0) }, position),
                move |_, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap()
    }

    #[test]
    fn falling_object_drags_its_node_along() {
        let mut engine = Engine::new();
        let entity = engine
            .spawn_object(
                ObjectDesc::shaped(BodyDesc::dynamic(Shape::Ball { radius: 0.5 }, Vec3::Y * 5.0, 1.0), WHITE)
                    .named("ball"),
            )
            .unwrap();
        assert_eq!(engine.name_of(entity).as_deref(), Some("ball"));

        for _ in 0..30 {
            engine.step(DT);
        }
        engine.sync_objects();

        let node = engine.world.get::<&Visual>(entity).unwrap().node;
        let drawn = engine.scene.node(node).unwrap().transform;
        let body = engine.transform_of(entity).unwrap();
        assert!(drawn.position.y < 5.0);
        assert_eq!(drawn.position, body.position);
        assert_eq!(drawn.rotation, body.rotation);
    }

    #[test]
    fn sync_keeps_visual_scale() {
        let mut engine = Engine::new();
        let visual = VisualDesc::new(MeshSource::Owned(MeshData::cuboid(Vec3::splat(0.5))), WHITE)
            .with_scale(Vec3::splat(2.0));
        let entity = engine
            .spawn_object(
                ObjectDesc::new(BodyDesc::dynamic(Shape::Cuboid { half_extents: Vec3::ONE }, Vec3::ZERO, 1.0))
                    .with_visual(visual),
            )
            .unwrap();
        engine.step(DT);
        engine.sync_objects();
        let node = engine.world.get::<&Visual>(entity).unwrap().node;
        assert_eq!(engine.scene.node(node).unwrap().transform.scale, Vec3::splat(2.0));
    }

    #[test]
    fn destroy_releases_body_and_mesh_once() {
        let mut engine = Engine::new();
        let entity = ball(&mut engine, Vec3::ZERO);
        assert_eq!(engine.scene.take_uploads().len(), 1);
        let body = engine.body_of(entity).unwrap();

        assert!(engine.destroy(entity));
        assert!(engine.physics.body_transform(body).is_none());
        assert_eq!(engine.entity_of(body), None);
        assert_eq!(engine.scene.node_count(), 0);
        assert_eq!(engine.scene.take_releases().len(), 1);

        assert!(!engine.destroy(entity));
        assert!(engine.scene.take_releases().is_empty());
    }

    #[test]
    fn shared_mesh_outlives_its_objects() {
        let mut engine = Engine::new();
        let mesh = engine.scene.add_shared_mesh(MeshData::cuboid(Vec3::splat(0.5)));
        let body = BodyDesc::dynamic(Shape::Cuboid { half_extents: Vec3::splat(0.5) }, Vec3::ZERO, 8.0);
        let a = engine
            .spawn_object(ObjectDesc::new(body.clone()).with_visual(VisualDesc::new(MeshSource::Shared(mesh), WHITE)))
            .unwrap();
        engine.destroy(a);
        assert!(engine.scene.take_releases().is_empty());
        assert!(engine
            .spawn_object(ObjectDesc::new(body).with_visual(VisualDesc::new(MeshSource::Shared(mesh), WHITE)))
            .is_ok());
    }

    #[test]
    fn unknown_shared_mesh_spawns_nothing() {
        let mut engine = Engine::new();
        let mesh = engine.scene.add_mesh(MeshData::cuboid(Vec3::ONE));
        let node_owner = engine
            .spawn_visual(MeshSource::Shared(mesh), Transform::default(), WHITE)
            .unwrap();
        engine.destroy(node_owner); // releases the owned mesh

        let result = engine.spawn_object(
            ObjectDesc::new(BodyDesc::fixed(Shape::Ball { radius: 1.0 }, Vec3::ZERO))
                .with_visual(VisualDesc::new(MeshSource::Shared(mesh), WHITE)),
        );
        assert!(matches!(result, Err(EngineError::Scene(SceneError::UnknownMesh(_)))));
        assert_eq!(engine.physics.rigid_body_set.len(), 0);
        assert_eq!(engine.world.len(), 0);
    }

    #[test]
    fn trigger_fires_once_per_overlapping_body() {
        let mut engine = zero_g();
        let calls = Arc::new(AtomicUsize::new(0));
        counting_trigger(&mut engine, Vec3::ZERO, calls.clone());
        ball(&mut engine, Vec3::ZERO);
        ball(&mut engine, Vec3::new(1.0, 0.0, 0.0));
        ball(&mut engine, Vec3::new(20.0, 0.0, 0.0));

        engine.step(DT);
        assert!(engine.dispatch_triggers().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        engine.dispatch_triggers();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn trigger_destroying_itself_stops_further_callbacks() {
        let mut engine = zero_g();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let trigger = engine
            .spawn_trigger(
                TriggerDesc::new(Shape::Ball { radius: 3.0 }, Vec3::ZERO),
                move |overlap, commands| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    commands.emit(GameEvent::GoalReached);
                    commands.destroy(overlap.trigger);
                },
            )
            .unwrap();
        ball(&mut engine, Vec3::ZERO);
        ball(&mut engine, Vec3::X);

        engine.step(DT);
        let events = engine.dispatch_triggers();
        assert_eq!(events, vec![GameEvent::GoalReached]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!engine.contains(trigger));

        engine.step(DT);
        assert!(engine.dispatch_triggers().is_empty());
    }

    #[test]
    fn body_destroyed_by_one_trigger_is_skipped_by_the_next() {
        let mut engine = zero_g();
        let calls = Arc::new(AtomicUsize::new(0));
        for x in [-0.5, 0.5] {
            let seen = calls.clone();
            engine
                .spawn_trigger(
                    TriggerDesc::new(Shape::Ball { radius: 2.0 }, Vec3::new(x, 0.0, 0.0)),
                    move |overlap, commands| {
                        seen.fetch_add(1, Ordering::SeqCst);
                        commands.destroy(overlap.other);
                    },
                )
                .unwrap();
        }
        let target = ball(&mut engine, Vec3::ZERO);

        engine.step(DT);
        engine.dispatch_triggers();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!engine.contains(target));
    }

    #[test]
    fn overlaps_flag_the_player() {
        let mut engine = zero_g();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        engine
            .spawn_trigger(
                TriggerDesc::new(Shape::Ball { radius: 3.0 }, Vec3::ZERO),
                move |overlap, _| {
                    if overlap.is_player {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                },
            )
            .unwrap();
        ball(&mut engine, Vec3::X);
        engine
            .spawn_player(ObjectDesc::new(
                BodyDesc::dynamic(Shape::Capsule { half_height: 1.0, radius: 1.0 }, Vec3::ZERO, 8.0)
                    .with_groups(CollisionGroup::player()),
            ))
            .unwrap();

        engine.step(DT);
        engine.dispatch_triggers();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_the_latest_player_is_tagged() {
        let mut engine = zero_g();
        let crate_entity = ball(&mut engine, Vec3::X * 5.0);
        let capsule = || {
            ObjectDesc::new(BodyDesc::dynamic(
                Shape::Capsule { half_height: 1.0, radius: 1.0 },
                Vec3::ZERO,
                8.0,
            ))
        };
        let first = engine.spawn_player(capsule()).unwrap();
        let second = engine.spawn_player(capsule()).unwrap();

        assert!(!engine.contains(first));
        assert_eq!(engine.player(), Some(second));
        let tagged: Vec<Entity> = engine.world.query::<&Player>().iter().map(|(e, _)| e).collect();
        assert_eq!(tagged, vec![second]);
        assert!(engine.world.get::<&Player>(crate_entity).is_err());
    }

    #[test]
    fn player_ground_state_follows_the_floor() {
        let mut engine = Engine::new();
        assert_eq!(engine.player_ground_state(&GroundProbe::default()), GroundState::AIRBORNE);

        engine
            .spawn_object(ObjectDesc::new(BodyDesc::fixed(
                Shape::Cuboid { half_extents: Vec3::new(50.0, 0.5, 50.0) },
                Vec3::new(0.0, -2.0, 0.0),
            )))
            .unwrap();
        let player = engine
            .spawn_player(ObjectDesc::new(
                BodyDesc::dynamic(Shape::Capsule { half_height: 1.0, radius: 1.0 }, Vec3::ZERO, 8.0)
                    .with_friction(0.0)
                    .with_groups(CollisionGroup::player())
                    .locked_rotations()
                    .always_awake(),
            ))
            .unwrap();
        assert_eq!(engine.player(), Some(player));
        assert!(engine.world.get::<&Player>(player).is_ok());

        for _ in 0..120 {
            engine.step(DT);
        }
        assert!(engine.player_ground_state(&GroundProbe::default()).grounded);

        engine.destroy(player);
        assert_eq!(engine.player(), None);
        assert!(!engine.player_ground_state(&GroundProbe::default()).grounded);
    }

    #[test]
    fn kinematic_bodies_move_to_their_target() {
        let mut engine = Engine::new();
        let gate = engine
            .spawn_object(ObjectDesc::new(BodyDesc::fixed(
                Shape::Cuboid { half_extents: Vec3::new(2.0, 2.0, 0.25) },
                Vec3::ZERO,
            )))
            .unwrap();
        assert!(engine.make_kinematic(gate));
        assert!(engine.set_kinematic_target(gate, Vec3::Y * 0.5));
        engine.step(DT);
        let position = engine.transform_of(gate).unwrap().position;
        assert!((position - Vec3::Y * 0.5).length() < 1e-4);
    }

    #[test]
    fn visuals_without_bodies_are_left_alone() {
        let mut engine = Engine::new();
        let at = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let entity = engine
            .spawn_visual(MeshSource::Owned(MeshData::plane(2.0)), at, WHITE)
            .unwrap();
        engine.step(DT);
        engine.sync_objects();
        let node = engine.world.get::<&Visual>(entity).unwrap().node;
        assert_eq!(engine.scene.node(node).unwrap().transform, at);
        assert!(engine.set_color(entity, [0.0, 0.0, 0.0, 1.0]));
        assert!(engine.destroy(entity));
        assert_eq!(engine.scene.take_releases().len(), 0); // never uploaded
    }
}
