//! Keyboard and mouse input state, sampled once per rendered frame.

use glam::Vec2;
use std::collections::HashSet;

/// Manages input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame (auto-repeat excluded).
    keys_pressed: HashSet<KeyCode>,
    /// Keys released this frame.
    keys_released: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,

    /// Mouse movement delta published for this frame.
    mouse_delta: Vec2,
    /// Raw motion gathered since the last `begin_frame`.
    accumulated_delta: Vec2,

    /// Whether the cursor is captured/locked.
    cursor_locked: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state and publish the mouse motion gathered so far.
    /// Call once at the end of each update.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_pressed.clear();
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // A held key reports Pressed repeatedly; only the first counts.
                if self.keys_held.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
                self.keys_released.insert(key);
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.mouse_held.insert(button) {
                    self.mouse_pressed.insert(button);
                }
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Process raw mouse motion. Ignored while the cursor is free.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if self.cursor_locked {
            self.accumulated_delta.x += delta.0 as f32;
            self.accumulated_delta.y += delta.1 as f32;
        }
    }

    /// Drop everything held, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_held.clear();
        self.mouse_held.clear();
        self.accumulated_delta = Vec2::ZERO;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.cursor_locked = locked;
        if !locked {
            self.accumulated_delta = Vec2::ZERO;
        }
    }

    /// WASD as a normalized vector: x = strafe (D positive), y = forward (W positive).
    pub fn movement_input(&self) -> Vec2 {
        let axis = |positive: KeyCode, negative: KeyCode| {
            self.is_key_held(positive) as i32 as f32 - self.is_key_held(negative) as i32 as f32
        };
        Vec2::new(
            axis(KeyCode::KeyD, KeyCode::KeyA),
            axis(KeyCode::KeyW, KeyCode::KeyS),
        )
        .normalize_or_zero()
    }

    /// Jump (Space).
    pub fn is_jump_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::Space)
    }

    /// Drop a crate next to the player (E).
    pub fn is_spawn_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::KeyE)
    }

    /// Dismiss a dialog (Enter, Space or left click).
    pub fn is_confirm_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::Enter)
            || self.is_key_pressed(KeyCode::NumpadEnter)
            || self.is_key_pressed(KeyCode::Space)
            || self.is_mouse_pressed(MouseButton::Left)
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_lasts_one_frame_and_ignores_repeat() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(input.is_jump_pressed());

        input.begin_frame();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(!input.is_jump_pressed());
        assert!(input.is_key_held(KeyCode::Space));

        input.process_keyboard(KeyCode::Space, ElementState::Released);
        assert!(input.is_key_released(KeyCode::Space));
        assert!(!input.is_key_held(KeyCode::Space));
    }

    #[test]
    fn opposing_keys_cancel_and_diagonals_normalize() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyA, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);
        assert_eq!(input.movement_input(), Vec2::ZERO);

        input.process_keyboard(KeyCode::KeyA, ElementState::Released);
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        let m = input.movement_input();
        assert!((m.length() - 1.0).abs() < 1e-6);
        assert!(m.x > 0.0 && m.y > 0.0);
    }

    #[test]
    fn mouse_motion_needs_locked_cursor() {
        let mut input = InputState::new();
        input.process_mouse_motion((5.0, 5.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.set_cursor_locked(true);
        input.process_mouse_motion((3.0, -1.0));
        input.process_mouse_motion((1.0, 0.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, -1.0));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn click_confirms() {
        let mut input = InputState::new();
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.is_confirm_pressed());
        input.begin_frame();
        assert!(!input.is_confirm_pressed());
    }
}
