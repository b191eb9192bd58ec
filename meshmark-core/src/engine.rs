//! The per-frame annotation engine.
//!
//! A host drives it with three kinds of calls:
//! - [`AnnotationEngine::handle_key`] for keyboard toggles,
//! - [`AnnotationEngine::pointer`] for press/release anywhere on its input surface,
//! - [`AnnotationEngine::on_frame`] exactly once per presented frame.
//!
//! Within a frame the order is fixed: raycast, marker update, capture, and a
//! geometry rebuild when the path or the representation changed.

use nalgebra::Point2;
use tracing::{debug, info};

use crate::capture::{Path, PointCapture};
use crate::config::EngineConfig;
use crate::controls::CameraControl;
use crate::input::{PointerEvent, PointerHub};
use crate::marker::AnnotationMarker;
use crate::mode::{InputModeController, ModeChange, ModeCommand, Representation};
use crate::projection::Camera;
use crate::raycast::{Intersection, Raycaster};
use crate::render::CurveRenderer;
use crate::scene::{ObjectId, Scene};

/// What happened during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub hit: Option<Intersection>,
    pub captured: bool,
    pub rebuilt: bool,
}

#[derive(Debug)]
pub struct AnnotationEngine {
    raycaster: Raycaster,
    marker: AnnotationMarker,
    modes: InputModeController,
    capture: PointCapture,
    renderer: CurveRenderer,
    pointer: PointerHub,
    path: Path,
    /// Set by mode changes; the next frame rebuilds even without a new point
    needs_rebuild: bool,
}

impl Default for AnnotationEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl AnnotationEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            raycaster: Raycaster::new(),
            marker: AnnotationMarker::new(config.marker_bias),
            modes: InputModeController::new(),
            capture: PointCapture::with_min_spacing(config.min_point_spacing),
            renderer: CurveRenderer::new(config.tube_radius)
                .with_point_sprites(config.point_sprites.then_some(config.marker_bias)),
            pointer: PointerHub::new(),
            path: Path::new(),
            needs_rebuild: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modes(&self) -> &InputModeController {
        &self.modes
    }

    pub fn draw_enabled(&self) -> bool {
        self.modes.draw_enabled()
    }

    pub fn navigation_enabled(&self) -> bool {
        self.modes.navigation_enabled()
    }

    pub fn representation(&self) -> Representation {
        self.modes.representation()
    }

    pub fn marker(&self) -> &AnnotationMarker {
        &self.marker
    }

    /// The path object currently attached to the scene, if any
    pub fn display_object(&self) -> Option<ObjectId> {
        self.renderer.attached()
    }

    /// The point-sprite object, when enabled and the path is not empty
    pub fn sprite_object(&self) -> Option<ObjectId> {
        self.renderer.sprites()
    }

    pub fn pointer_listeners(&self) -> usize {
        self.pointer.listener_count()
    }

    /// Apply a key press. Unknown keys are ignored.
    pub fn handle_key(&mut self, key: char, camera: &mut dyn CameraControl) -> Option<ModeChange> {
        let command = ModeCommand::from_key(key)?;
        let change = self
            .modes
            .apply(command, &self.pointer, &mut self.path, camera);
        // Leaving Draw keeps the stroke on screen until the next entry
        if change != ModeChange::DrawExited {
            self.needs_rebuild = true;
        }
        Some(change)
    }

    /// Forward a window-wide pointer button event
    pub fn pointer(&mut self, event: PointerEvent) {
        self.pointer.dispatch(event);
    }

    /// Run one frame against the host's scene, camera and pointer position (NDC)
    pub fn on_frame(&mut self, scene: &mut Scene, camera: &Camera, pointer: &Point2<f32>) -> FrameReport {
        let hit = self.raycaster.cast(camera, pointer, scene);

        self.marker.update(hit.as_ref(), scene);

        let captured = self
            .capture
            .capture(self.modes.is_capturing(), hit.as_ref(), &mut self.path);

        let rebuilt = captured || self.needs_rebuild;
        if rebuilt {
            self.renderer
                .rebuild(scene, self.path.points(), self.modes.representation());
            self.needs_rebuild = false;
        }

        FrameReport {
            hit,
            captured,
            rebuilt,
        }
    }

    /// Start a fresh session for a newly loaded model
    pub fn reset(&mut self, scene: &mut Scene, camera: &mut dyn CameraControl) {
        self.renderer.release(scene);
        self.marker.detach(scene);
        self.modes.reset(camera);
        self.path.clear();
        self.needs_rebuild = false;
        debug!("annotation session reset");
    }

    /// Drop everything the engine attached to the scene
    pub fn teardown(mut self, scene: &mut Scene, camera: &mut dyn CameraControl) {
        self.reset(scene, camera);
        info!("annotation engine torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::OrbitControls;
    use crate::geometry::Mesh;
    use crate::scene::{Layer, SceneNode};
    use nalgebra::Point3;

    fn front_camera() -> Camera {
        Camera {
            position: Point3::new(0.0, 0.0, 5.0),
            ..Camera::default()
        }
    }

    #[test]
    fn test_frame_without_model_is_a_no_op() {
        let mut engine = AnnotationEngine::default();
        let mut scene = Scene::new();
        let mut controls = OrbitControls::default();
        engine.handle_key('d', &mut controls);
        engine.pointer(PointerEvent::Press);
        let report = engine.on_frame(&mut scene, &Camera::default(), &Point2::origin());
        assert!(report.hit.is_none());
        assert!(!report.captured);
        assert!(engine.path().is_empty());
        assert!(engine.display_object().is_none());
    }

    #[test]
    fn test_unknown_key_changes_nothing() {
        let mut engine = AnnotationEngine::default();
        let mut controls = OrbitControls::default();
        assert!(engine.handle_key('x', &mut controls).is_none());
        assert!(engine.navigation_enabled());
    }

    #[test]
    fn test_reset_detaches_overlays() {
        let mut engine = AnnotationEngine::default();
        let mut scene = Scene::new();
        let mut controls = OrbitControls::default();
        scene.add(Layer::Model, SceneNode::Mesh(Mesh::cube(2.0)));
        let camera = front_camera();

        engine.handle_key('d', &mut controls);
        engine.pointer(PointerEvent::Press);
        for _ in 0..3 {
            engine.on_frame(&mut scene, &camera, &Point2::origin());
        }
        assert_eq!(scene.count(Layer::Overlay), 2);

        engine.reset(&mut scene, &mut controls);
        assert_eq!(scene.count(Layer::Overlay), 0);
        assert_eq!(scene.count(Layer::Model), 1);
        assert!(engine.path().is_empty());
        assert!(controls.is_enabled());
        assert_eq!(engine.pointer_listeners(), 0);
    }

    #[test]
    fn test_point_sprites_are_opt_in() {
        let config = EngineConfig {
            point_sprites: true,
            ..EngineConfig::default()
        };
        let mut engine = AnnotationEngine::new(&config);
        let mut scene = Scene::new();
        let mut controls = OrbitControls::default();
        scene.add(Layer::Model, SceneNode::Mesh(Mesh::cube(2.0)));
        let camera = front_camera();
        let pointer = Point2::new(0.01, 0.02);

        engine.handle_key('d', &mut controls);
        engine.pointer(PointerEvent::Press);
        for _ in 0..3 {
            engine.on_frame(&mut scene, &camera, &pointer);
        }
        let sprites = engine.sprite_object().unwrap();
        let Some(SceneNode::Points(points)) = scene.get(sprites) else {
            panic!("expected point sprites");
        };
        assert_eq!(points.len(), 3);
        let hit = engine.path().points()[0];
        assert_eq!(points[0], hit + nalgebra::Vector3::repeat(config.marker_bias));
        // Marker, path and sprites
        assert_eq!(scene.count(Layer::Overlay), 3);

        engine.reset(&mut scene, &mut controls);
        assert_eq!(scene.count(Layer::Overlay), 0);
    }
}
