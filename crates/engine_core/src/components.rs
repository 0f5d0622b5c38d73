//! Tag components shared across crates.

/// Tag component for the player entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Player;

/// Display name attached to spawned objects (level authoring / debug logs).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
