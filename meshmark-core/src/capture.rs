//! Stroke capture: turning held-button frames into an ordered point path.

use nalgebra::Point3;
use tracing::trace;

use crate::raycast::Intersection;

/// Ordered world-space points of the current stroke
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    points: Vec<Point3<f32>>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point3<f32>> {
        self.points.last()
    }

    pub(crate) fn push(&mut self, point: Point3<f32>) {
        self.points.push(point);
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }
}

impl From<Vec<Point3<f32>>> for Path {
    fn from(points: Vec<Point3<f32>>) -> Self {
        Self { points }
    }
}

/// Appends the frame's hit point to the path while a stroke is active.
///
/// Without a spacing filter a point is appended on every active frame with
/// a hit, including repeats while the pointer stands still.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCapture {
    min_spacing: Option<f32>,
}

impl PointCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_spacing(min_spacing: Option<f32>) -> Self {
        Self {
            min_spacing: min_spacing.filter(|s| *s > 0.0),
        }
    }

    /// Returns true when the path grew
    pub fn capture(&self, active: bool, hit: Option<&Intersection>, path: &mut Path) -> bool {
        if !active {
            return false;
        }
        let Some(hit) = hit else {
            return false;
        };

        if let (Some(spacing), Some(last)) = (self.min_spacing, path.last()) {
            if (hit.point - last).norm() < spacing {
                return false;
            }
        }

        path.push(hit.point);
        trace!(len = path.len(), point = ?hit.point, "captured point");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Layer, Scene, SceneNode};
    use crate::geometry::Mesh;

    fn hit_at(x: f32) -> Intersection {
        let mut scene = Scene::new();
        let target = scene.add(Layer::Model, SceneNode::Mesh(Mesh::new()));
        Intersection {
            point: Point3::new(x, 0.0, 0.0),
            distance: 1.0,
            target,
            face: 0,
        }
    }

    #[test]
    fn test_inactive_capture_ignores_hits() {
        let mut path = Path::new();
        let hit = hit_at(0.0);
        assert!(!PointCapture::new().capture(false, Some(&hit), &mut path));
        assert!(path.is_empty());
    }

    #[test]
    fn test_no_hit_appends_nothing() {
        let mut path = Path::new();
        assert!(!PointCapture::new().capture(true, None, &mut path));
        assert!(path.is_empty());
    }

    #[test]
    fn test_stationary_hold_appends_every_frame() {
        let mut path = Path::new();
        let hit = hit_at(1.0);
        let capture = PointCapture::new();
        for _ in 0..5 {
            assert!(capture.capture(true, Some(&hit), &mut path));
        }
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_spacing_filter_drops_near_duplicates() {
        let mut path = Path::new();
        let capture = PointCapture::with_min_spacing(Some(0.5));
        assert!(capture.capture(true, Some(&hit_at(0.0)), &mut path));
        assert!(!capture.capture(true, Some(&hit_at(0.2)), &mut path));
        assert!(capture.capture(true, Some(&hit_at(0.6)), &mut path));
        assert_eq!(path.points(), &[Point3::new(0.0, 0.0, 0.0), Point3::new(0.6, 0.0, 0.0)]);
    }

    #[test]
    fn test_non_positive_spacing_is_ignored() {
        let mut path = Path::new();
        let capture = PointCapture::with_min_spacing(Some(0.0));
        let hit = hit_at(0.0);
        capture.capture(true, Some(&hit), &mut path);
        capture.capture(true, Some(&hit), &mut path);
        assert_eq!(path.len(), 2);
    }
}
