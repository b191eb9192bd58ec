//! meshmark Web - annotation engine bindings for browser hosts
//!
//! The page owns rendering and its orbit camera. Each animation frame it
//! hands the camera and pointer to [`WebAnnotator::frame`], then draws the
//! geometry read back from [`WebAnnotator::display_positions`] and friends.

use std::cell::RefCell;
use std::rc::Rc;

use meshmark_core::{
    AnnotationEngine, Camera, CameraControl, DisplayGeometry, EngineConfig, Layer, Mesh, ModelLoader,
    PointerEvent, Scene, SceneNode,
};
use nalgebra::{Point2, Point3, Vector3};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Navigation flag shared with the page's own camera controller
#[derive(Debug, Clone, Copy)]
struct PageControls {
    enabled: bool,
}

impl CameraControl for PageControls {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Everything one annotation session touches
struct Session {
    scene: Scene,
    engine: AnnotationEngine,
    camera: Camera,
    controls: PageControls,
}

impl Session {
    fn new(config: &EngineConfig) -> Self {
        Self {
            scene: Scene::new(),
            engine: AnnotationEngine::new(config),
            camera: Camera::default(),
            controls: PageControls { enabled: true },
        }
    }

    fn load(&mut self, mesh: Mesh) {
        self.engine.reset(&mut self.scene, &mut self.controls);
        self.scene.clear_layer(Layer::Model);
        self.scene.add(Layer::Model, SceneNode::Mesh(mesh));
    }

    fn key(&mut self, key: &str) -> bool {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.engine.handle_key(c, &mut self.controls).is_some(),
            // Named keys such as "Shift" or "ArrowUp"
            _ => false,
        }
    }

    fn display(&self) -> Option<&DisplayGeometry> {
        match self.scene.get(self.engine.display_object()?)? {
            SceneNode::Path(geometry) => Some(geometry),
            _ => None,
        }
    }
}

#[wasm_bindgen]
pub struct WebAnnotator {
    session: Rc<RefCell<Session>>,
    listeners: Registration<WindowListeners>,
}

#[wasm_bindgen]
impl WebAnnotator {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebAnnotator {
        WebAnnotator {
            session: Rc::new(RefCell::new(Session::new(&EngineConfig::default()))),
            listeners: Registration::default(),
        }
    }

    /// Build from a TOML settings document
    pub fn with_config(toml: &str) -> Result<WebAnnotator, JsError> {
        let config = EngineConfig::from_toml(toml)?;
        Ok(WebAnnotator {
            session: Rc::new(RefCell::new(Session::new(&config))),
            listeners: Registration::default(),
        })
    }

    /// Whether a dropped file would be accepted, by name alone
    pub fn accepts_file(name: &str) -> bool {
        ModelLoader::accept(name).is_some()
    }

    /// Load dropped `.gltf`/`.glb` contents and start a fresh session
    pub fn load_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), JsError> {
        let mesh = ModelLoader::load_bytes(name, bytes).map_err(|e| {
            warn!(name, error = %e, "rejected dropped model");
            e
        })?;
        self.session.borrow_mut().load(mesh);
        Ok(())
    }

    /// Load a triangle soup supplied by the page (xyz triples, 3 indices per face)
    pub fn load_mesh(&mut self, positions: &[f32], indices: &[u32]) {
        let points: Vec<Point3<f32>> = positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();
        self.session
            .borrow_mut()
            .load(Mesh::from_indexed(&points, None, indices));
    }

    /// Mirror the page camera (perspective, `fov` in radians)
    #[allow(clippy::too_many_arguments)]
    pub fn set_camera(&mut self, eye_x: f32, eye_y: f32, eye_z: f32, target_x: f32, target_y: f32, target_z: f32, fov: f32, aspect: f32) {
        let mut session = self.session.borrow_mut();
        let camera = &mut session.camera;
        camera.position = Point3::new(eye_x, eye_y, eye_z);
        camera.target = Point3::new(target_x, target_y, target_z);
        camera.up = Vector3::y();
        camera.fov = fov;
        camera.aspect = aspect;
    }

    /// One frame with the pointer at normalized device coordinates.
    /// Returns whether a point was captured.
    pub fn frame(&mut self, ndc_x: f32, ndc_y: f32) -> bool {
        let mut guard = self.session.borrow_mut();
        let session = &mut *guard;
        let pointer = Point2::new(ndc_x, ndc_y);
        session
            .engine
            .on_frame(&mut session.scene, &session.camera, &pointer)
            .captured
    }

    /// Apply a `KeyboardEvent.key` value
    pub fn key(&mut self, key: &str) -> bool {
        self.session.borrow_mut().key(key)
    }

    pub fn pointer_down(&mut self) {
        self.session.borrow_mut().engine.pointer(PointerEvent::Press);
    }

    pub fn pointer_up(&mut self) {
        self.session.borrow_mut().engine.pointer(PointerEvent::Release);
    }

    /// The page should gate its orbit controls on this
    pub fn navigation_enabled(&self) -> bool {
        self.session.borrow().controls.is_enabled()
    }

    pub fn draw_enabled(&self) -> bool {
        self.session.borrow().engine.draw_enabled()
    }

    pub fn tube_enabled(&self) -> bool {
        self.session.borrow().engine.modes().tube_enabled()
    }

    pub fn path_len(&self) -> usize {
        self.session.borrow().engine.path().len()
    }

    pub fn marker_position(&self) -> Option<Vec<f32>> {
        let p = self.session.borrow().engine.marker().position()?;
        Some(vec![p.x, p.y, p.z])
    }

    /// Line points or tube vertices, flattened xyz
    pub fn display_positions(&self) -> Vec<f32> {
        let session = self.session.borrow();
        match session.display() {
            Some(DisplayGeometry::Polyline(line)) => line.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
            Some(DisplayGeometry::Tube(tube)) => tube.positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
            None => Vec::new(),
        }
    }

    /// Tube vertex normals, flattened xyz; empty for a line
    pub fn display_normals(&self) -> Vec<f32> {
        let session = self.session.borrow();
        match session.display() {
            Some(DisplayGeometry::Tube(tube)) => tube.normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect(),
            _ => Vec::new(),
        }
    }

    /// Tube triangle indices; empty for a line
    pub fn display_indices(&self) -> Vec<u32> {
        let session = self.session.borrow();
        match session.display() {
            Some(DisplayGeometry::Tube(tube)) => tube.indices.clone(),
            _ => Vec::new(),
        }
    }

    /// Route window-wide pointer and key events into this annotator until
    /// [`WebAnnotator::unlisten`] or `free()`. Calling it again while
    /// listening changes nothing and returns false.
    pub fn listen(&mut self) -> Result<bool, JsError> {
        let session = &self.session;
        self.listeners
            .ensure(|| WindowListeners::attach(Rc::clone(session)))
    }

    /// Remove the window listeners. Returns false when none were attached.
    pub fn unlisten(&mut self) -> bool {
        self.listeners.release()
    }

    pub fn is_listening(&self) -> bool {
        self.listeners.is_active()
    }
}

/// Holds at most one live registration at a time
#[derive(Debug)]
struct Registration<T> {
    active: Option<T>,
}

impl<T> Default for Registration<T> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<T> Registration<T> {
    /// Attach unless already attached. True when `attach` ran and succeeded.
    fn ensure<E>(&mut self, attach: impl FnOnce() -> Result<T, E>) -> Result<bool, E> {
        if self.active.is_some() {
            debug!("listeners already attached");
            return Ok(false);
        }
        self.active = Some(attach()?);
        Ok(true)
    }

    fn release(&mut self) -> bool {
        self.active.take().is_some()
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl Default for WebAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Window event listeners. Dropping unregisters all of them.
struct WindowListeners {
    window: web_sys::Window,
    pointer_down: Closure<dyn FnMut(web_sys::PointerEvent)>,
    pointer_up: Closure<dyn FnMut(web_sys::PointerEvent)>,
    key_down: Closure<dyn FnMut(web_sys::KeyboardEvent)>,
}

impl WindowListeners {
    fn attach(session: Rc<RefCell<Session>>) -> Result<Self, JsError> {
        let window = web_sys::window().ok_or_else(|| JsError::new("no window"))?;

        let down = session.clone();
        let pointer_down = Closure::<dyn FnMut(web_sys::PointerEvent)>::new(move |_event: web_sys::PointerEvent| {
            down.borrow_mut().engine.pointer(PointerEvent::Press);
        });
        let up = session.clone();
        let pointer_up = Closure::<dyn FnMut(web_sys::PointerEvent)>::new(move |_event: web_sys::PointerEvent| {
            up.borrow_mut().engine.pointer(PointerEvent::Release);
        });
        let key_down = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(move |event: web_sys::KeyboardEvent| {
            if event.repeat() {
                return;
            }
            if session.borrow_mut().key(&event.key()) {
                debug!(key = %event.key(), "mode key");
            }
        });

        let listeners = Self {
            window,
            pointer_down,
            pointer_up,
            key_down,
        };
        listeners.register()?;
        Ok(listeners)
    }

    fn register(&self) -> Result<(), JsError> {
        let target: &web_sys::EventTarget = self.window.as_ref();
        for (kind, callback) in self.callbacks() {
            target
                .add_event_listener_with_callback(kind, callback.unchecked_ref())
                .map_err(|_| JsError::new("failed to add window listener"))?;
        }
        Ok(())
    }

    fn callbacks(&self) -> [(&'static str, &JsValue); 3] {
        [
            ("pointerdown", self.pointer_down.as_ref()),
            ("pointerup", self.pointer_up.as_ref()),
            ("keydown", self.key_down.as_ref()),
        ]
    }
}

impl Drop for WindowListeners {
    fn drop(&mut self) {
        let target: &web_sys::EventTarget = self.window.as_ref();
        for (kind, callback) in self.callbacks() {
            let _ = target.remove_event_listener_with_callback(kind, callback.unchecked_ref());
        }
    }
}
