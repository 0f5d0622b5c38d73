//! Game state types: collected items and transient on-screen messages.

/// Names of the items picked up so far, in pickup order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>) {
        self.items.push(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item == name)
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

// ── Messages ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameMessage {
    pub text: String,
    pub kind: MessageKind,
    pub time_remaining: f32,
}

/// Short-lived notifications ("Picked up the brass key").
#[derive(Debug)]
pub struct GameMessages {
    pub messages: Vec<GameMessage>,
    pub max_visible: usize,
    default_duration: f32,
}

impl Default for GameMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMessages {
    const MAX_STORED: usize = 20;

    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            max_visible: 3,
            default_duration: 4.0,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, kind: MessageKind) {
        let text = text.into();
        match kind {
            MessageKind::Warning => log::warn!("{text}"),
            MessageKind::Info | MessageKind::Success => log::info!("{text}"),
        }
        self.messages.push(GameMessage {
            text,
            kind,
            time_remaining: self.default_duration,
        });
        if self.messages.len() > Self::MAX_STORED {
            self.messages.remove(0);
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Info);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Success);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Warning);
    }

    pub fn update(&mut self, dt: f32) {
        for msg in &mut self.messages {
            msg.time_remaining -= dt;
        }
        self.messages.retain(|m| m.time_remaining > 0.0);
    }

    /// Newest messages first, at most `max_visible`.
    pub fn visible(&self) -> impl Iterator<Item = &GameMessage> {
        self.messages.iter().rev().take(self.max_visible)
    }
}
