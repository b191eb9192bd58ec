//! Hover marker that follows the pointer across the model surface.

use nalgebra::{Point3, Vector3};

use crate::raycast::Intersection;
use crate::scene::{Layer, ObjectId, Scene, SceneNode};

pub const DEFAULT_MARKER_BIAS: f32 = 0.1;

/// A single point shown just off the surface under the pointer.
///
/// It keeps its last position when the pointer leaves the model.
#[derive(Debug)]
pub struct AnnotationMarker {
    bias: f32,
    object: Option<ObjectId>,
    position: Option<Point3<f32>>,
}

impl Default for AnnotationMarker {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_BIAS)
    }
}

impl AnnotationMarker {
    pub fn new(bias: f32) -> Self {
        Self {
            bias,
            object: None,
            position: None,
        }
    }

    pub fn position(&self) -> Option<Point3<f32>> {
        self.position
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Move the marker to this frame's hit. Attaches the (empty) marker object
    /// on first use.
    pub fn update(&mut self, hit: Option<&Intersection>, scene: &mut Scene) {
        let id = self.attach(scene);
        let Some(hit) = hit else {
            return;
        };
        let position = hit.point + Vector3::repeat(self.bias);
        self.position = Some(position);
        scene.replace(id, SceneNode::Points(vec![position]));
    }

    /// Remove the marker object from the scene and forget its position
    pub fn detach(&mut self, scene: &mut Scene) {
        if let Some(id) = self.object.take() {
            scene.remove(id);
        }
        self.position = None;
    }

    fn attach(&mut self, scene: &mut Scene) -> ObjectId {
        match self.object {
            Some(id) if scene.contains(id) => id,
            _ => {
                let points = self.position.into_iter().collect();
                let id = scene.add(Layer::Overlay, SceneNode::Points(points));
                self.object = Some(id);
                id
            }
        }
    }
}
