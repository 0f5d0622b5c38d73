//! Chromalock: a first-person physics puzzle game.

mod config;
mod dialogue;
mod engine;
mod events;
mod game_event;
mod gate;
mod level;
mod player;
mod puzzle;
mod session;
mod state;
mod update;

use anyhow::Result;
use config::GameConfig;
use engine_core::Time;
use input::InputState;
use level::Level;
use renderer::{Camera, Renderer};
use session::Session;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

/// Everything alive while the window is open.
pub struct GameState {
    pub renderer: Renderer,
    pub camera: Camera,
    pub input: InputState,
    pub time: Time,
    pub config: GameConfig,
    pub session: Session,
    pub running: bool,
    /// Last title pushed to the window.
    title: String,
}

impl GameState {
    async fn new(window: Arc<Window>, config: GameConfig) -> Result<Self> {
        let renderer = Renderer::new(window, config.vsync, config.pixel_size).await?;
        let level = Level::load_or_builtin(&config.level_path);
        let session = Session::new(&level, config.player)?;

        let mut camera = Camera::default();
        let (width, height) = renderer.dimensions();
        camera.set_aspect(width, height);
        camera.set_yaw_pitch(level.spawn.yaw_degrees.to_radians(), 0.0);
        if let Some(eye) = session.player.eye_position(&session.engine) {
            camera.set_position(eye);
        }

        Ok(Self {
            renderer,
            camera,
            input: InputState::new(),
            time: Time::new(),
            config,
            session,
            running: true,
            title: String::new(),
        })
    }

    fn render(&mut self) -> Result<()> {
        self.renderer.prepare(&mut self.session.engine.scene);
        self.renderer.render(&self.session.engine.scene, &self.camera)
    }
}

struct App {
    state: Option<GameState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = GameConfig::load();
            let mut window_attrs = Window::default_attributes()
                .with_title("Chromalock")
                .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));
            if config.fullscreen {
                window_attrs = window_attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
            }

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            match pollster::block_on(GameState::new(window.clone(), config)) {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize game: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔════════════════════════════════════════════════╗");
    println!("║                   CHROMALOCK                   ║");
    println!("╠════════════════════════════════════════════════╣");
    println!("║  WASD   - Move         │  Mouse  - Look        ║");
    println!("║  Space  - Jump         │  E      - Drop crate  ║");
    println!("║  Enter  - Close dialog │  Escape - Free cursor ║");
    println!("║  F5     - Save config.ron                      ║");
    println!("╚════════════════════════════════════════════════╝");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
