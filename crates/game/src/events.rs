//! Window and device event handling for GameState.

use winit::event::{DeviceEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::CursorGrabMode;

impl crate::GameState {
    /// Handle a window event. Returns true if the app should exit.
    pub(crate) fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.running = false;
                true
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(size);
                self.camera.set_aspect(size.width, size.height);
                false
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);

                    if key == KeyCode::Escape && event.state.is_pressed() {
                        self.release_cursor();
                    }
                    if key == KeyCode::F5 && event.state.is_pressed() {
                        self.config.save();
                        log::info!("Saved config.ron");
                    }
                }
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.process_mouse_button(button, state);
                if state.is_pressed()
                    && !self.input.is_cursor_locked()
                    && !self.session.input_suspended()
                {
                    self.grab_cursor();
                }
                false
            }
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = self.render() {
                    log::error!("Render error: {}", e);
                }
                self.renderer.window.request_redraw();
                false
            }
            _ => false,
        }
    }

    /// Handle device events (e.g. raw mouse motion).
    pub(crate) fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.is_cursor_locked() {
                self.input.process_mouse_motion(delta);
            }
        }
    }

    pub(crate) fn grab_cursor(&mut self) {
        let window = &self.renderer.window;
        let _ = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        window.set_cursor_visible(false);
        self.input.set_cursor_locked(true);
    }

    pub(crate) fn release_cursor(&mut self) {
        let _ = self.renderer.window.set_cursor_grab(CursorGrabMode::None);
        self.renderer.window.set_cursor_visible(true);
        self.input.set_cursor_locked(false);
    }
}
