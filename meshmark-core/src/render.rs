//! Rebuilds the displayed path geometry from the captured points.

use nalgebra::{Point3, Vector3};
use tracing::{debug, trace};

use crate::curve::{CatmullRomCurve, Polyline, TubeGeometry, DEFAULT_TUBE_RADIUS};
use crate::mode::Representation;
use crate::scene::{Layer, ObjectId, Scene, SceneNode};

/// The rendered form of a path
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayGeometry {
    Polyline(Polyline),
    Tube(TubeGeometry),
}

impl DisplayGeometry {
    /// Build the geometry for `points`, or nothing with fewer than two points
    pub fn build(points: &[Point3<f32>], representation: Representation, tube_radius: f32) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        match representation {
            Representation::Line => Some(Self::Polyline(Polyline::new(points.to_vec()))),
            Representation::Tube => {
                let curve = CatmullRomCurve::new(points.to_vec())?;
                Some(Self::Tube(TubeGeometry::sweep(&curve, tube_radius)))
            }
        }
    }

    pub fn representation(&self) -> Representation {
        match self {
            Self::Polyline(_) => Representation::Line,
            Self::Tube(_) => Representation::Tube,
        }
    }
}

/// Owns at most one path object in the scene at a time, plus an optional
/// point-sprite object marking each captured point.
///
/// Every rebuild detaches and drops the previous objects before new ones
/// are attached.
#[derive(Debug)]
pub struct CurveRenderer {
    tube_radius: f32,
    /// Per-axis offset of the point sprites; `None` draws no sprites
    sprite_bias: Option<f32>,
    attached: Option<ObjectId>,
    sprites: Option<ObjectId>,
}

impl Default for CurveRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TUBE_RADIUS)
    }
}

impl CurveRenderer {
    pub fn new(tube_radius: f32) -> Self {
        Self {
            tube_radius,
            sprite_bias: None,
            attached: None,
            sprites: None,
        }
    }

    pub fn with_point_sprites(mut self, bias: Option<f32>) -> Self {
        self.sprite_bias = bias;
        self
    }

    pub fn attached(&self) -> Option<ObjectId> {
        self.attached
    }

    pub fn sprites(&self) -> Option<ObjectId> {
        self.sprites
    }

    /// Replace whatever is attached with the geometry for `points`.
    ///
    /// Returns true when a path object is attached afterwards.
    pub fn rebuild(&mut self, scene: &mut Scene, points: &[Point3<f32>], representation: Representation) -> bool {
        self.release(scene);

        if let Some(bias) = self.sprite_bias.filter(|_| !points.is_empty()) {
            let offset = Vector3::repeat(bias);
            let sprites = points.iter().map(|p| p + offset).collect();
            self.sprites = Some(scene.add(Layer::Overlay, SceneNode::Points(sprites)));
        }

        let Some(geometry) = DisplayGeometry::build(points, representation, self.tube_radius) else {
            return false;
        };
        let id = scene.add(Layer::Overlay, SceneNode::Path(geometry));
        trace!(?id, points = points.len(), ?representation, "path geometry attached");
        self.attached = Some(id);
        true
    }

    /// Detach and drop the attached objects, if any
    pub fn release(&mut self, scene: &mut Scene) {
        if let Some(id) = self.attached.take() {
            if scene.remove(id).is_some() {
                debug!(?id, "path geometry released");
            }
        }
        if let Some(id) = self.sprites.take() {
            scene.remove(id);
        }
    }
}
