use crate::console::{Action, Console};
use crate::render::PanelRenderer;
use ab_glyph::FontVec;
use anyhow::Result;
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId, WindowLevel},
};

/// Upper bound between repaints, so run state changes show up without input.
const REFRESH: Duration = Duration::from_millis(250);

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<PanelRenderer>,
    font: Option<FontVec>,
    console: Option<Console>,
    cursor: Option<PhysicalPosition<f64>>,
    next_refresh: Instant,
    dirty: bool,
    should_exit: bool,
}

impl App {
    pub fn new(console: Console, font: Option<FontVec>) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            font,
            console: Some(console),
            cursor: None,
            next_refresh: Instant::now(),
            dirty: true,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        log::info!(
            "Platform: {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        log::info!("F1-F8 press the panel buttons, Enter sends the typed message");

        let result = event_loop.run_app(&mut self);
        self.shutdown();
        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Marker Console")
            .with_inner_size(LogicalSize::new(760.0, 520.0))
            .with_min_inner_size(LogicalSize::new(480.0, 320.0))
            .with_window_level(WindowLevel::AlwaysOnTop);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        log::info!(
            "Window {}x{} at scale {:.2}",
            physical_size.width,
            physical_size.height,
            window.scale_factor()
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(PanelRenderer::new(
            physical_size.width,
            physical_size.height,
            self.font.take(),
        )?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer), Some(console)) =
            (self.pixels.as_mut(), self.renderer.as_mut(), self.console.as_ref())
        else {
            return Ok(());
        };
        renderer.render(console, pixels.frame_mut())?;
        pixels.render()?;
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        let Some(console) = self.console.as_mut() else {
            return;
        };
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let action = match code {
            KeyCode::F1 => Some(Action::Trigger),
            KeyCode::F2 => Some(Action::Beep),
            KeyCode::F3 => Some(Action::AutoBeep),
            KeyCode::F4 => Some(Action::Recording),
            KeyCode::F5 => Some(Action::P300),
            KeyCode::F6 => Some(Action::Dribble),
            KeyCode::F7 => Some(Action::Shot),
            KeyCode::F8 => Some(Action::Release),
            KeyCode::Enter | KeyCode::NumpadEnter => Some(Action::Send),
            KeyCode::Backspace => {
                console.backspace();
                None
            }
            KeyCode::Escape => {
                console.clear_input();
                None
            }
            _ => {
                if let Some(text) = &event.text {
                    text.chars().for_each(|c| console.type_char(c));
                }
                None
            }
        };
        if let Some(action) = action {
            console.handle(action);
        }
        self.dirty = true;
    }

    fn handle_click(&mut self) {
        let (Some(position), Some(renderer), Some(console)) =
            (self.cursor, self.renderer.as_ref(), self.console.as_mut())
        else {
            return;
        };
        if let Some(action) = renderer.action_at(position.x as f32, position.y as f32) {
            console.handle(action);
            self.dirty = true;
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                log::error!("Failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                log::error!("Failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                log::error!("Failed to resize panel: {e}");
            }
        }
        self.dirty = true;
        log::debug!("Window resized to {}x{}", new_size.width, new_size.height);
    }

    fn shutdown(&mut self) {
        if let Some(console) = self.console.take() {
            console.shutdown();
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("Failed to create window and surface: {e}");
                self.cleanup_and_exit(event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    log::error!("Render failed: {e}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(&event);
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor = Some(position),
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.handle_click(),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }
        let Some(console) = self.console.as_mut() else {
            return;
        };

        let now = Instant::now();
        console.tick(now);
        let fresh = console.pump();
        if fresh || self.dirty || now >= self.next_refresh {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.dirty = false;
            self.next_refresh = now + REFRESH;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(
            console.next_heartbeat().min(self.next_refresh),
        ));
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
        log::debug!("Application resources cleaned up");
    }
}
