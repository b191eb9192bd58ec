//! Terminal host for sketching on 3D models

use crossterm::{
    cursor,
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
        KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use meshmark_core::projection::screen_to_ndc;
use meshmark_core::{
    AnnotationEngine, Camera, EngineConfig, Layer, Mesh, ModelLoader, OrbitControls, PointerEvent,
    Representation, Scene, SceneNode,
};
use nalgebra::Point2;
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Radians of orbit per dragged cell
const DRAG_SENSITIVITY: f32 = 0.05;
const KEY_ROTATE_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 1.1;

/// Main application struct for terminal sketching
pub struct TerminalApp {
    scene: Scene,
    engine: AnnotationEngine,
    controls: OrbitControls,
    camera: Camera,
    renderer: AsciiRenderer,
    /// Pointer position in normalized device coordinates
    pointer: Point2<f32>,
    /// Last cell seen while orbiting with the button held
    drag_from: Option<(u16, u16)>,
    status: Option<String>,
    running: bool,
    target_frame_time: Duration,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: Mesh, config: &EngineConfig, fps: u32) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(mesh, config, fps, width, height))
    }

    /// Build the app for a given surface size without touching the terminal
    pub fn with_size(mesh: Mesh, config: &EngineConfig, fps: u32, width: u16, height: u16) -> Self {
        let mut app = Self {
            scene: Scene::new(),
            engine: AnnotationEngine::new(config),
            controls: OrbitControls::default(),
            camera: Camera::default(),
            renderer: AsciiRenderer::new(width as usize, height as usize),
            pointer: Point2::origin(),
            drag_from: None,
            status: None,
            running: true,
            target_frame_time: Duration::from_millis(1000 / u64::from(fps.max(1))),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        };
        app.resize(width, height);
        app.load_model(mesh);
        app
    }

    pub fn engine(&self) -> &AnnotationEngine {
        &self.engine
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Replace the model and start a fresh annotation session
    pub fn load_model(&mut self, mesh: Mesh) {
        self.engine.reset(&mut self.scene, &mut self.controls);
        self.scene.clear_layer(Layer::Model);
        self.scene.add(Layer::Model, SceneNode::Mesh(mesh));
        if let Some(bounds) = self.scene.model_bounds() {
            self.controls.frame(&bounds);
        }
        self.controls.sync(&mut self.camera);
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            cursor::Show,
            DisableBracketedPaste,
            DisableMouseCapture,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        while self.running {
            let frame_start = Instant::now();

            // Drain pending input before the frame
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            self.frame();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.target_frame_time {
                std::thread::sleep(self.target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    /// One engine frame against the current camera and pointer
    pub fn frame(&mut self) {
        self.controls.sync(&mut self.camera);
        self.engine.on_frame(&mut self.scene, &self.camera, &self.pointer);
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Paste(text) => self.handle_drop(&text),
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
    }

    fn handle_key(&mut self, KeyEvent { code, kind, .. }: KeyEvent) {
        if kind != KeyEventKind::Press {
            return;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Up => {
                self.controls.rotate(0.0, KEY_ROTATE_STEP);
            }
            KeyCode::Down => {
                self.controls.rotate(0.0, -KEY_ROTATE_STEP);
            }
            KeyCode::Left => {
                self.controls.rotate(-KEY_ROTATE_STEP, 0.0);
            }
            KeyCode::Right => {
                self.controls.rotate(KEY_ROTATE_STEP, 0.0);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.controls.zoom(1.0 / ZOOM_STEP);
            }
            KeyCode::Char('-') => {
                self.controls.zoom(ZOOM_STEP);
            }
            KeyCode::Char(c) => {
                if let Some(change) = self.engine.handle_key(c, &mut self.controls) {
                    debug!(?change, "mode key");
                    // A half-finished orbit drag must not carry into Draw mode
                    self.drag_from = None;
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, MouseEvent { kind, column, row, .. }: MouseEvent) {
        self.pointer = screen_to_ndc(
            column as f32,
            row as f32,
            self.renderer.width() as u32,
            self.renderer.height() as u32,
        );

        match kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.engine.pointer(PointerEvent::Press);
                self.drag_from = Some((column, row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.engine.pointer(PointerEvent::Release);
                self.drag_from = None;
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                // Orbit only applies while navigation is enabled
                if let Some((from_col, from_row)) = self.drag_from {
                    let d_yaw = (from_col as f32 - column as f32) * DRAG_SENSITIVITY;
                    let d_pitch = (row as f32 - from_row as f32) * DRAG_SENSITIVITY;
                    self.controls.rotate(d_yaw, d_pitch);
                    self.drag_from = Some((column, row));
                }
            }
            MouseEventKind::ScrollUp => {
                self.controls.zoom(1.0 / ZOOM_STEP);
            }
            MouseEventKind::ScrollDown => {
                self.controls.zoom(ZOOM_STEP);
            }
            _ => {}
        }
    }

    /// Files dropped on a terminal arrive as pasted paths
    fn handle_drop(&mut self, text: &str) {
        let Some(path) = dropped_path(text) else {
            return;
        };
        let Some(handle) = ModelLoader::accept(&path) else {
            return;
        };
        match handle.load() {
            Ok(mesh) => {
                info!(path = %handle.path.display(), "loaded dropped model");
                self.status = Some(format!("Loaded {}", handle.path.display()));
                self.load_model(mesh);
            }
            Err(e) => {
                warn!(path = %handle.path.display(), error = %e, "failed to load dropped model");
                self.status = Some(format!("Failed to load {}: {}", handle.path.display(), e));
            }
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.renderer.resize(width as usize, height as usize);
        // Terminal cells are roughly twice as tall as they are wide
        self.camera.aspect = width as f32 / (2.0 * height.max(1) as f32);
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer.render_scene(&self.scene, &self.camera);

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(self.status_line()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }

    pub fn status_line(&self) -> String {
        let mode = if self.engine.draw_enabled() { "DRAW" } else { "NAVIGATE" };
        let representation = match self.engine.representation() {
            Representation::Line => "line",
            Representation::Tube => "tube",
        };
        let mut line = format!(
            "meshmark | FPS: {:.1} | {} | {} | points: {} | D=draw T=tube drag/arrows=orbit +/-=zoom Q=quit",
            self.fps,
            mode,
            representation,
            self.engine.path().len()
        );
        if let Some(status) = &self.status {
            line.push_str(" | ");
            line.push_str(status);
        }
        line
    }
}

/// Interpret pasted text as a single file path
fn dropped_path(text: &str) -> Option<PathBuf> {
    let trimmed = text.trim().trim_matches(|c| c == '\'' || c == '"');
    let trimmed = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed.contains('\n') {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
