//! Color-code puzzle: step on the colored pads in the right order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PadColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl PadColor {
    pub const ALL: [PadColor; 4] = [PadColor::Red, PadColor::Green, PadColor::Blue, PadColor::Yellow];

    pub fn name(self) -> &'static str {
        match self {
            PadColor::Red => "red",
            PadColor::Green => "green",
            PadColor::Blue => "blue",
            PadColor::Yellow => "yellow",
        }
    }

    /// sRGB display color.
    pub fn hex(self) -> u32 {
        match self {
            PadColor::Red => 0xd94040,
            PadColor::Green => 0x40b050,
            PadColor::Blue => 0x4060d9,
            PadColor::Yellow => 0xe0c040,
        }
    }
}

impl std::fmt::Display for PadColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single pad press did to the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Correct color; `progress` colors of the code are now entered.
    Advanced { progress: usize },
    /// Wrong color; progress fell back to `progress`.
    Reset { progress: usize },
    /// The last color of the code was entered.
    Solved,
    /// The code was already solved.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCode {
    sequence: Vec<PadColor>,
    progress: usize,
    solved: bool,
}

impl ColorCode {
    pub fn new(sequence: Vec<PadColor>) -> Self {
        Self {
            sequence,
            progress: 0,
            solved: false,
        }
    }

    pub fn press(&mut self, color: PadColor) -> PressOutcome {
        let Some(&expected) = self.sequence.get(self.progress) else {
            return PressOutcome::Ignored;
        };
        if self.solved {
            return PressOutcome::Ignored;
        }

        if color == expected {
            self.progress += 1;
            if self.progress == self.sequence.len() {
                self.solved = true;
                return PressOutcome::Solved;
            }
            return PressOutcome::Advanced {
                progress: self.progress,
            };
        }

        // A wrong press can still be the start of a fresh attempt.
        self.progress = usize::from(self.sequence.first() == Some(&color));
        PressOutcome::Reset {
            progress: self.progress,
        }
    }

    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn sequence(&self) -> &[PadColor] {
        &self.sequence
    }
}
