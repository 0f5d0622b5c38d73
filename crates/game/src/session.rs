//! One play-through of a level, independent of the window and GPU.
//!
//! The session owns the [`Engine`] and all game rules: it builds the level,
//! drives the player and gates every fixed step, and turns trigger events into
//! inventory, puzzle, gate and dialog changes once per rendered frame.

use crate::dialogue::DialogQueue;
use crate::engine::{Engine, EngineError, MeshSource, ObjectDesc, TriggerDesc, VisualDesc};
use crate::game_event::GameEvent;
use crate::gate::{Gate, GateState};
use crate::level::{vec3, CrateDesc, Level};
use crate::player::{MoveIntent, PlayerController, PlayerTuning};
use crate::puzzle::{ColorCode, PadColor, PressOutcome};
use crate::state::{GameMessages, Inventory};
use engine_core::{Quat, Transform, Vec3};
use hecs::Entity;
use physics::{BodyDesc, Shape};
use renderer::{hex_color, MeshData, MeshId};
use std::collections::HashSet;

/// The player is returned to the spawn point below this height; crates are
/// removed.
pub const KILL_HEIGHT: f32 = -50.0;

const ITEM_PICKUP_RADIUS: f32 = 1.0;
const ITEM_VISUAL_RADIUS: f32 = 0.4;
const PAD_HALF_EXTENTS: Vec3 = Vec3::new(1.4, 0.05, 1.4);
/// Pad sensors reach a little below the pad and well above it.
const PAD_SENSOR_HALF_EXTENTS: Vec3 = Vec3::new(1.4, 0.5, 1.4);
const PAD_SENSOR_OFFSET: f32 = 0.3;

pub struct Session {
    pub engine: Engine,
    pub player: PlayerController,
    pub code: ColorCode,
    pub inventory: Inventory,
    pub dialogs: DialogQueue,
    pub messages: GameMessages,
    level_name: String,
    goal_text: String,
    spawn: Vec3,
    total_items: usize,
    gates: Vec<(Gate, Entity)>,
    crates: Vec<Entity>,
    occupied_pads: HashSet<PadColor>,
    crate_mesh: MeshId,
    finished: bool,
}

impl Session {
    pub fn new(level: &Level, tuning: PlayerTuning) -> Result<Self, EngineError> {
        let mut engine = Engine::new();
        let crate_mesh = engine
            .scene
            .add_shared_mesh(MeshData::cuboid(Vec3::splat(0.5)));

        for block in &level.blocks {
            let body = BodyDesc::fixed(
                Shape::Cuboid {
                    half_extents: vec3(block.half_extents),
                },
                vec3(block.position),
            )
            .with_rotation(block.rotation());
            engine.spawn_object(ObjectDesc::shaped(body, hex_color(block.color)))?;
        }

        for prop in &level.props {
            match MeshData::from_gltf(&prop.path) {
                Ok(mesh) => {
                    let transform = Transform::from_position_rotation(
                        vec3(prop.position),
                        Quat::from_rotation_y(prop.yaw_degrees.to_radians()),
                    )
                    .with_scale(Vec3::splat(prop.scale));
                    engine.spawn_visual(MeshSource::Owned(mesh), transform, [1.0; 4])?;
                }
                Err(e) => log::warn!("Skipping prop {:?}: {e}", prop.path),
            }
        }

        for item in &level.items {
            let name = item.name.clone();
            let hint = item.hint.clone();
            let desc = TriggerDesc::new(
                Shape::Ball {
                    radius: ITEM_PICKUP_RADIUS,
                },
                vec3(item.position),
            )
            .with_visual(VisualDesc::new(
                MeshSource::Owned(MeshData::sphere(ITEM_VISUAL_RADIUS, 16, 12)),
                hex_color(item.color),
            ))
            .named(item.name.clone());
            engine.spawn_trigger(desc, move |overlap, commands| {
                if overlap.is_player {
                    commands.emit(GameEvent::ItemCollected {
                        name: name.clone(),
                        hint: hint.clone(),
                    });
                    commands.destroy(overlap.trigger);
                }
            })?;
        }

        for pad in &level.pads {
            let base = vec3(pad.position);
            engine.spawn_visual(
                MeshSource::Owned(MeshData::cuboid(PAD_HALF_EXTENTS)),
                Transform::from_position(base + Vec3::Y * PAD_HALF_EXTENTS.y),
                hex_color(pad.color.hex()),
            )?;
            let color = pad.color;
            let desc = TriggerDesc::new(
                Shape::Cuboid {
                    half_extents: PAD_SENSOR_HALF_EXTENTS,
                },
                base + Vec3::Y * PAD_SENSOR_OFFSET,
            )
            .named(format!("{color} pad"));
            // Crates can hold a pad down too.
            engine.spawn_trigger(desc, move |_, commands| {
                commands.emit(GameEvent::PadPressed(color));
            })?;
        }

        let mut gates = Vec::with_capacity(level.gates.len());
        for gate_desc in &level.gates {
            let position = vec3(gate_desc.position);
            let body = BodyDesc::fixed(
                Shape::Cuboid {
                    half_extents: vec3(gate_desc.half_extents),
                },
                position,
            );
            let entity = engine
                .spawn_object(ObjectDesc::shaped(body, hex_color(gate_desc.color)).named(gate_desc.name.clone()))?;
            let gate = Gate::new(
                gate_desc.name.clone(),
                gate_desc.open_when,
                position,
                vec3(gate_desc.open_offset),
                gate_desc.speed,
            );
            gates.push((gate, entity));
        }

        for story in &level.stories {
            let title = story.title.clone();
            let text = story.text.clone();
            let desc = TriggerDesc::new(
                Shape::Cuboid {
                    half_extents: vec3(story.half_extents),
                },
                vec3(story.position),
            )
            .named(story.title.clone());
            engine.spawn_trigger(desc, move |overlap, commands| {
                if overlap.is_player {
                    commands.emit(GameEvent::Story {
                        title: title.clone(),
                        text: text.clone(),
                    });
                    commands.destroy(overlap.trigger);
                }
            })?;
        }

        if let Some(goal) = &level.goal {
            let desc = TriggerDesc::new(
                Shape::Cuboid {
                    half_extents: vec3(goal.half_extents),
                },
                vec3(goal.position),
            )
            .named("goal");
            engine.spawn_trigger(desc, move |overlap, commands| {
                if overlap.is_player {
                    commands.emit(GameEvent::GoalReached);
                    commands.destroy(overlap.trigger);
                }
            })?;
        }

        let spawn = vec3(level.spawn.position);
        let player = PlayerController::new(tuning);
        player.spawn(&mut engine, spawn)?;

        let mut session = Self {
            engine,
            player,
            code: ColorCode::new(level.code.clone()),
            inventory: Inventory::new(),
            dialogs: DialogQueue::new(),
            messages: GameMessages::new(),
            level_name: level.name.clone(),
            goal_text: level
                .goal
                .as_ref()
                .map(|goal| goal.text.clone())
                .unwrap_or_default(),
            spawn,
            total_items: level.items.len(),
            gates,
            crates: Vec::new(),
            occupied_pads: HashSet::new(),
            crate_mesh,
            finished: false,
        };
        for crate_desc in &level.crates {
            session.spawn_crate_at(crate_desc)?;
        }
        session.open_ready_gates();
        log::info!(
            "Level {:?}: {} items, {}-color code, {} gates",
            session.level_name,
            session.total_items,
            session.code.len(),
            session.gates.len()
        );
        Ok(session)
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Player input is ignored while a dialog is on screen.
    pub fn input_suspended(&self) -> bool {
        self.dialogs.is_open()
    }

    pub fn gate_states(&self) -> impl Iterator<Item = (&str, GateState)> {
        self.gates
            .iter()
            .map(|(gate, _)| (gate.name.as_str(), gate.state()))
    }

    pub fn request_jump(&mut self) {
        if !self.input_suspended() {
            self.player.request_jump();
        }
    }

    /// Close the dialog on screen. Returns false if none was open.
    pub fn confirm_dialog(&mut self) -> bool {
        self.dialogs.dismiss().is_some()
    }

    /// Drop a crate next to the player.
    pub fn spawn_crate(&mut self) -> Result<Option<Entity>, EngineError> {
        if self.input_suspended() {
            return Ok(None);
        }
        let Some(point) = self.player.crate_drop_point(&self.engine) else {
            return Ok(None);
        };
        let tuning = self.player.tuning;
        let crate_desc = CrateDesc {
            position: point.to_array(),
            size: tuning.crate_size,
            mass: tuning.crate_mass,
            color: 0x00ff00,
            restitution: 0.0,
        };
        self.spawn_crate_at(&crate_desc).map(Some)
    }

    fn spawn_crate_at(&mut self, crate_desc: &CrateDesc) -> Result<Entity, EngineError> {
        let size = crate_desc.size;
        let body = BodyDesc::dynamic(
            Shape::Cuboid {
                half_extents: Vec3::splat(size * 0.5),
            },
            vec3(crate_desc.position),
            crate_desc.mass,
        )
        .with_restitution(crate_desc.restitution);
        let visual = VisualDesc::new(MeshSource::Shared(self.crate_mesh), hex_color(crate_desc.color))
            .with_scale(Vec3::splat(size));
        let entity = self
            .engine
            .spawn_object(ObjectDesc::new(body).with_visual(visual).named("crate"))?;
        self.crates.push(entity);
        Ok(entity)
    }

    pub fn crate_count(&self) -> usize {
        self.crates.len()
    }

    /// One fixed simulation step: gates, player forces, physics.
    pub fn fixed_update(&mut self, dt: f32, intent: MoveIntent) {
        for (gate, entity) in &mut self.gates {
            if let Some(position) = gate.advance(dt) {
                self.engine.set_kinematic_target(*entity, position);
                if gate.state() == GateState::Open {
                    log::info!("The {} is open", gate.name);
                }
            }
        }

        let intent = if self.input_suspended() {
            MoveIntent::default()
        } else {
            intent
        };
        self.player.fixed_update(&mut self.engine, intent);
        self.engine.step(dt);
        self.recover_fallen_player();
        self.remove_fallen_crates();
    }

    fn remove_fallen_crates(&mut self) {
        let engine = &mut self.engine;
        self.crates.retain(|&entity| {
            let fallen = engine
                .transform_of(entity)
                .map_or(true, |pose| pose.position.y < KILL_HEIGHT);
            if fallen {
                engine.destroy(entity);
                log::debug!("Removed fallen crate {entity:?}");
            }
            !fallen
        });
    }

    fn recover_fallen_player(&mut self) {
        let Some(player) = self.engine.player() else {
            return;
        };
        let fallen = self
            .engine
            .transform_of(player)
            .is_some_and(|pose| pose.position.y < KILL_HEIGHT);
        if fallen {
            self.engine.teleport(player, self.spawn);
            self.messages.warning("You fell. Back to the start.");
        }
    }

    /// Per rendered frame: sync visuals, run triggers, apply their events.
    pub fn frame(&mut self, dt: f32) {
        self.engine.sync_objects();
        let events = self.engine.dispatch_triggers();

        // Pads report every frame while held; only a newly held pad counts.
        let mut held = HashSet::new();
        for event in events {
            match event {
                GameEvent::PadPressed(color) => {
                    if held.insert(color) && !self.occupied_pads.contains(&color) {
                        self.handle_event(GameEvent::PadPressed(color));
                    }
                }
                other => self.handle_event(other),
            }
        }
        self.occupied_pads = held;
        self.messages.update(dt);
    }

    pub fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::ItemCollected { name, hint } => {
                self.inventory.add(name.clone());
                self.messages.success(format!(
                    "Picked up the {name} ({}/{})",
                    self.inventory.count(),
                    self.total_items
                ));
                if !hint.is_empty() {
                    self.dialogs.push(name, hint);
                }
                self.open_ready_gates();
            }
            GameEvent::PadPressed(color) => self.press_pad(color),
            GameEvent::Story { title, text } => self.dialogs.push(title, text),
            GameEvent::GoalReached => {
                if self.finished {
                    return;
                }
                self.finished = true;
                self.messages.success("Level complete");
                self.dialogs
                    .push(self.level_name.clone(), self.goal_text.clone());
            }
        }
    }

    fn press_pad(&mut self, color: PadColor) {
        match self.code.press(color) {
            PressOutcome::Advanced { progress } => {
                log::info!("Code progress {progress}/{}", self.code.len());
                self.messages.info(format!("{color} ({progress}/{})", self.code.len()));
            }
            PressOutcome::Reset { progress } => {
                log::info!("Wrong pad {color}, code progress back to {progress}");
                self.messages.warning("Wrong pad. The code resets.");
            }
            PressOutcome::Solved => {
                log::info!("Color code solved");
                self.messages.success("The code is accepted");
                self.open_ready_gates();
            }
            PressOutcome::Ignored => {}
        }
    }

    fn open_ready_gates(&mut self) {
        let items = self.inventory.count();
        let solved = self.code.is_solved();
        for (gate, entity) in &mut self.gates {
            if gate.try_open(items, solved) {
                self.engine.make_kinematic(*entity);
                log::info!("Opening the {}", gate.name);
                self.messages.info(format!("The {} opens", gate.name));
            }
        }
    }

    /// One-line summary for the window title.
    pub fn status_line(&self) -> String {
        if let Some(dialog) = self.dialogs.current() {
            return format!("{}: {}  [Enter]", dialog.title, dialog.text);
        }
        let mut line = format!(
            "{} | items {}/{} | code {}/{}",
            self.level_name,
            self.inventory.count(),
            self.total_items,
            self.code.progress(),
            self.code.len()
        );
        if let Some(message) = self.messages.visible().next() {
            line.push_str(" | ");
            line.push_str(&message.text);
        }
        line
    }
}
