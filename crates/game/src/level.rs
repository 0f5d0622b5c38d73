//! Level description loaded from RON. A level only lists what is where;
//! [`crate::session::Session::new`] turns it into bodies, nodes and triggers.

use crate::gate::OpenCondition;
use crate::puzzle::PadColor;
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("could not read level {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid level file: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("the level has an empty color code")]
    EmptyCode,
    #[error("the color code uses {0} but no {0} pad exists")]
    CodeColorWithoutPad(PadColor),
    #[error("gate {gate:?} needs {needed} items but the level only has {available}")]
    GateNeedsTooManyItems {
        gate: String,
        needed: usize,
        available: usize,
    },
    #[error("gate {gate:?} has speed {speed}; it must be positive")]
    GateSpeedNotPositive { gate: String, speed: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    pub position: [f32; 3],
    /// Initial camera yaw. 180 looks down +Z.
    #[serde(default)]
    pub yaw_degrees: f32,
}

/// Static scenery: floors, walls, ramps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    /// XYZ Euler angles.
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default = "default_block_color")]
    pub color: u32,
}

/// A dynamic box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateDesc {
    pub position: [f32; 3],
    /// Edge length.
    #[serde(default = "default_crate_size")]
    pub size: f32,
    #[serde(default = "default_crate_mass")]
    pub mass: f32,
    #[serde(default = "default_crate_color")]
    pub color: u32,
    /// Bounciness; 0 does not bounce.
    #[serde(default)]
    pub restitution: f32,
}

/// Drawn-only glTF model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub path: String,
    pub position: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub yaw_degrees: f32,
}

/// Collectible. `hint` is shown as a dialog when picked up, if not empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub hint: String,
    pub position: [f32; 3],
    #[serde(default = "default_item_color")]
    pub color: u32,
}

/// Color pad; `position` is the point on the floor it rests on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub color: PadColor,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDesc {
    pub name: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default = "default_gate_color")]
    pub color: u32,
    pub open_when: OpenCondition,
    /// Where the gate ends up relative to its closed position.
    pub open_offset: [f32; 3],
    #[serde(default = "default_gate_speed")]
    pub speed: f32,
}

/// One-shot dialog volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDesc {
    pub title: String,
    pub text: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default = "default_goal_text")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    #[serde(default = "default_level_name")]
    pub name: String,
    pub spawn: Spawn,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub crates: Vec<CrateDesc>,
    #[serde(default)]
    pub props: Vec<Prop>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub code: Vec<PadColor>,
    #[serde(default)]
    pub gates: Vec<GateDesc>,
    #[serde(default)]
    pub stories: Vec<StoryDesc>,
    #[serde(default)]
    pub goal: Option<Goal>,
}

fn default_level_name() -> String {
    "Untitled".to_owned()
}
fn default_block_color() -> u32 {
    0x8a8d91
}
fn default_crate_size() -> f32 {
    1.0
}
fn default_crate_mass() -> f32 {
    8.0
}
fn default_crate_color() -> u32 {
    0x00ff00
}
fn default_scale() -> f32 {
    1.0
}
fn default_item_color() -> u32 {
    0xffd24a
}
fn default_gate_color() -> u32 {
    0x5a4632
}
fn default_gate_speed() -> f32 {
    2.0
}
fn default_goal_text() -> String {
    "You made it out.".to_owned()
}

pub fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

impl Block {
    pub fn rotation(&self) -> Quat {
        let [x, y, z] = self.rotation_degrees.map(f32::to_radians);
        Quat::from_euler(EulerRot::XYZ, x, y, z)
    }
}

impl Level {
    /// Parse and validate a level.
    pub fn from_ron(source: &str) -> Result<Self, LevelError> {
        let level: Level = ron::from_str(source)?;
        level.validate()?;
        Ok(level)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_ron(&source)?;
        log::info!("Loaded level {:?} from {:?}", level.name, path);
        Ok(level)
    }

    /// Load `path`, or fall back to [`Level::builtin`] with a warning.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(level) => level,
            Err(e) => {
                log::warn!("{e}, using the built-in level");
                Self::builtin()
            }
        }
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        if self.code.is_empty() {
            return Err(LevelError::EmptyCode);
        }
        if let Some(&color) = self
            .code
            .iter()
            .find(|color| !self.pads.iter().any(|pad| pad.color == **color))
        {
            return Err(LevelError::CodeColorWithoutPad(color));
        }
        for gate in &self.gates {
            if gate.speed.is_nan() || gate.speed <= 0.0 {
                return Err(LevelError::GateSpeedNotPositive {
                    gate: gate.name.clone(),
                    speed: gate.speed,
                });
            }
            if let OpenCondition::ItemsCollected(needed) = gate.open_when {
                if needed > self.items.len() {
                    return Err(LevelError::GateNeedsTooManyItems {
                        gate: gate.name.clone(),
                        needed,
                        available: self.items.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The courtyard and vault shipped in `assets/level.ron`.
    pub fn builtin() -> Self {
        let wall = 0x6f7378;
        let block = |position: [f32; 3], half_extents: [f32; 3]| Block {
            position,
            half_extents,
            rotation_degrees: [0.0; 3],
            color: wall,
        };
        let ramp = |position: [f32; 3], angle: f32, color: u32| Block {
            position,
            half_extents: [3.0, 0.25, 6.0],
            rotation_degrees: [angle, 0.0, 0.0],
            color,
        };
        let pad = |color, x| Pad {
            color,
            position: [x, -1.5, 20.0],
        };

        Level {
            name: "Courtyard".to_owned(),
            spawn: Spawn {
                position: [0.0, 0.5, -8.0],
                yaw_degrees: 180.0,
            },
            blocks: vec![
                Block {
                    color: 0x4d5052,
                    ..block([0.0, -2.0, 0.0], [50.0, 0.5, 50.0])
                },
                // Vault front wall, either side of the inner gate.
                block([-7.0, 1.0, 14.0], [3.0, 2.5, 0.5]),
                block([7.0, 1.0, 14.0], [3.0, 2.5, 0.5]),
                block([-10.5, 1.0, 22.25], [0.5, 2.5, 8.75]),
                block([10.5, 1.0, 22.25], [0.5, 2.5, 8.75]),
                // Back wall, either side of the vault door.
                block([-6.5, 1.0, 30.5], [4.5, 2.5, 0.5]),
                block([6.5, 1.0, 30.5], [4.5, 2.5, 0.5]),
                ramp([-18.0, -1.0, 0.0], -30.0, 0x7d8a6a),
                ramp([18.0, -1.0, 0.0], -60.0, 0x8a6a6a),
            ],
            crates: vec![CrateDesc {
                position: [0.0, 0.0, 0.0],
                size: 2.0,
                mass: 8.0,
                color: 0xc8a064,
                restitution: 0.0,
            }],
            props: Vec::new(),
            items: vec![
                Item {
                    name: "brass key".to_owned(),
                    hint: "Scratched into the key: red first, then yellow.".to_owned(),
                    position: [-8.0, -0.5, 4.0],
                    color: 0xd9a441,
                },
                Item {
                    name: "glass lens".to_owned(),
                    hint: "Through the lens, a faint note: blue, and green last.".to_owned(),
                    position: [8.0, -0.5, 4.0],
                    color: 0x9fd8e8,
                },
            ],
            pads: vec![
                pad(PadColor::Blue, -6.0),
                pad(PadColor::Red, -2.0),
                pad(PadColor::Green, 2.0),
                pad(PadColor::Yellow, 6.0),
            ],
            code: vec![PadColor::Red, PadColor::Yellow, PadColor::Blue, PadColor::Green],
            gates: vec![
                GateDesc {
                    name: "inner gate".to_owned(),
                    position: [0.0, 1.0, 14.0],
                    half_extents: [4.0, 2.5, 0.5],
                    color: default_gate_color(),
                    open_when: OpenCondition::ItemsCollected(2),
                    open_offset: [0.0, 5.5, 0.0],
                    speed: 2.0,
                },
                GateDesc {
                    name: "vault door".to_owned(),
                    position: [0.0, 1.0, 30.5],
                    half_extents: [2.0, 2.5, 0.5],
                    color: 0x3c4a5a,
                    open_when: OpenCondition::CodeSolved,
                    open_offset: [0.0, 5.5, 0.0],
                    speed: 1.5,
                },
            ],
            stories: vec![
                StoryDesc {
                    title: "The Courtyard".to_owned(),
                    text: "The vault is sealed. Two keepsakes lie somewhere in the yard; \
                           together they should open the inner gate."
                        .to_owned(),
                    position: [0.0, 0.0, -4.0],
                    half_extents: [4.0, 2.0, 1.0],
                },
                StoryDesc {
                    title: "The Pads".to_owned(),
                    text: "Four colored pads. Step on them in the right order.".to_owned(),
                    position: [0.0, 0.0, 16.0],
                    half_extents: [4.0, 2.0, 1.0],
                },
            ],
            goal: Some(Goal {
                position: [0.0, 0.0, 36.0],
                half_extents: [3.0, 2.0, 3.0],
                text: default_goal_text(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_level_is_valid() {
        Level::builtin().validate().unwrap();
    }

    #[test]
    fn bundled_level_file_parses_and_matches_builtin() {
        let level = Level::from_ron(include_str!("../../../assets/level.ron")).unwrap();
        assert_eq!(level, Level::builtin());
    }

    #[test]
    fn minimal_level_uses_defaults() {
        let level = Level::from_ron(
            "(spawn: (position: (0.0, 1.0, 0.0)), pads: [(color: Red, position: (0.0, 0.0, 0.0))], code: [Red])",
        )
        .unwrap();
        assert_eq!(level.name, "Untitled");
        assert!(level.blocks.is_empty());
        assert!(level.goal.is_none());
        assert_eq!(level.spawn.yaw_degrees, 0.0);
    }

    #[test]
    fn rejects_empty_code() {
        let mut level = Level::builtin();
        level.code.clear();
        assert!(matches!(level.validate(), Err(LevelError::EmptyCode)));
    }

    #[test]
    fn rejects_code_color_without_pad() {
        let mut level = Level::builtin();
        level.pads.retain(|pad| pad.color != PadColor::Yellow);
        assert!(matches!(
            level.validate(),
            Err(LevelError::CodeColorWithoutPad(PadColor::Yellow))
        ));
    }

    #[test]
    fn rejects_gate_needing_more_items_than_exist() {
        let mut level = Level::builtin();
        level.items.pop();
        match level.validate() {
            Err(LevelError::GateNeedsTooManyItems {
                gate,
                needed,
                available,
            }) => {
                assert_eq!(gate, "inner gate");
                assert_eq!((needed, available), (2, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_gate_that_cannot_move() {
        let mut level = Level::builtin();
        level.gates[0].speed = 0.0;
        assert!(matches!(
            level.validate(),
            Err(LevelError::GateSpeedNotPositive { speed, .. }) if speed == 0.0
        ));
        level.gates[0].speed = f32::NAN;
        assert!(matches!(level.validate(), Err(LevelError::GateSpeedNotPositive { .. })));
    }

    #[test]
    fn parse_errors_are_reported() {
        assert!(matches!(Level::from_ron("(spawn: "), Err(LevelError::Parse(_))));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let level = Level::load_or_builtin("does/not/exist.ron");
        assert_eq!(level.name, "Courtyard");
    }

    #[test]
    fn block_rotation_is_in_degrees() {
        let mut block = Level::builtin().blocks[0].clone();
        block.rotation_degrees = [0.0, 90.0, 0.0];
        let turned = block.rotation() * Vec3::X;
        assert!((turned - Vec3::NEG_Z).length() < 1e-5);
    }
}
