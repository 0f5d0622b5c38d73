//! Gates that slide out of the way once their condition is met.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenCondition {
    /// Open once at least this many items have been collected.
    ItemsCollected(usize),
    /// Open once the color code is solved.
    CodeSolved,
}

impl OpenCondition {
    pub fn is_met(self, items_collected: usize, code_solved: bool) -> bool {
        match self {
            OpenCondition::ItemsCollected(needed) => items_collected >= needed,
            OpenCondition::CodeSolved => code_solved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Opening,
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub name: String,
    pub condition: OpenCondition,
    open_position: Vec3,
    /// Units per second.
    speed: f32,
    position: Vec3,
    state: GateState,
}

impl Gate {
    pub fn new(
        name: impl Into<String>,
        condition: OpenCondition,
        closed_position: Vec3,
        open_offset: Vec3,
        speed: f32,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            open_position: closed_position + open_offset,
            speed,
            position: closed_position,
            state: GateState::Closed,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Start opening if closed and the condition holds. Returns true on the
    /// transition.
    pub fn try_open(&mut self, items_collected: usize, code_solved: bool) -> bool {
        if self.state != GateState::Closed || !self.condition.is_met(items_collected, code_solved) {
            return false;
        }
        self.state = GateState::Opening;
        true
    }

    /// Move toward the open position. Returns the new position while opening.
    pub fn advance(&mut self, dt: f32) -> Option<Vec3> {
        if self.state != GateState::Opening {
            return None;
        }
        let to_go = self.open_position - self.position;
        let step = self.speed * dt;
        // A gate without a usable speed opens at once.
        if self.speed.is_nan() || self.speed <= 0.0 || to_go.length() <= step {
            self.position = self.open_position;
            self.state = GateState::Open;
        } else {
            self.position += to_go.normalize() * step;
        }
        Some(self.position)
    }
}
