//! Events raised by trigger callbacks and consumed by the session.

use crate::puzzle::PadColor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The player walked into a collectible.
    ItemCollected { name: String, hint: String },
    /// Something is standing on a color pad. Raised every frame while occupied.
    PadPressed(PadColor),
    /// A one-shot story volume was entered.
    Story { title: String, text: String },
    /// The player reached the end of the level.
    GoalReached,
}
