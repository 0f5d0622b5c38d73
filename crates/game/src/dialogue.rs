//! Modal story dialogs, shown one at a time in arrival order.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub text: String,
}

/// FIFO of pending dialogs. The front dialog is the one on screen.
#[derive(Debug, Default)]
pub struct DialogQueue {
    queue: VecDeque<Dialog>,
}

impl DialogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, title: impl Into<String>, text: impl Into<String>) {
        let dialog = Dialog {
            title: title.into(),
            text: text.into(),
        };
        log::info!("Dialog queued: {}", dialog.title);
        self.queue.push_back(dialog);
    }

    pub fn is_open(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&Dialog> {
        self.queue.front()
    }

    /// Close the dialog on screen, revealing the next one if any.
    pub fn dismiss(&mut self) -> Option<Dialog> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
