//! Per-frame game advancement: fixed physics steps, then trigger dispatch and
//! camera follow.

use crate::player::MoveIntent;
use crate::GameState;

impl GameState {
    pub(crate) fn update(&mut self) {
        self.time.update();
        let dt = self.time.delta_seconds();

        if self.session.input_suspended() {
            // Re-capture the mouse once the last dialog is closed.
            if self.input.is_confirm_pressed()
                && self.session.confirm_dialog()
                && !self.session.input_suspended()
            {
                self.grab_cursor();
            }
        } else {
            if self.input.is_cursor_locked() {
                let delta = self.input.mouse_delta() * self.config.sensitivity;
                self.camera.look(delta.x, delta.y);
            }
            if self.input.is_jump_pressed() {
                self.session.request_jump();
            }
            if self.input.is_spawn_pressed() {
                if let Err(e) = self.session.spawn_crate() {
                    log::error!("Could not spawn crate: {e}");
                }
            }
        }

        let intent = MoveIntent {
            axes: self.input.movement_input(),
            forward: self.camera.flat_forward(),
            right: self.camera.flat_right(),
        };
        let fixed_dt = self.time.fixed_timestep_seconds();
        while self.time.should_fixed_update() {
            self.session.fixed_update(fixed_dt, intent);
        }

        let was_suspended = self.session.input_suspended();
        self.session.frame(dt);
        if !was_suspended && self.session.input_suspended() {
            self.release_cursor();
            self.input.release_all();
        }

        if let Some(eye) = self.session.player.eye_position(&self.session.engine) {
            self.camera.set_position(eye);
        }

        let title = format!("Chromalock | {}", self.session.status_line());
        if title != self.title {
            self.renderer.window.set_title(&title);
            self.title = title;
        }

        // Clear input for next frame
        self.input.begin_frame();
    }
}
