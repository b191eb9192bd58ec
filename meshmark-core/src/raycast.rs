//! Pointer raycasting against the intersectable part of the scene.

use nalgebra::{Point2, Point3, Vector3};

use crate::geometry::{Aabb, Mesh, Triangle};
use crate::projection::Camera;
use crate::scene::{ObjectId, Scene};

const EPSILON: f32 = 1e-8;

/// A half-line in world space. `direction` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore, double sided. Returns the ray parameter of the hit.
    pub fn intersect_triangle(&self, triangle: &Triangle) -> Option<f32> {
        let [v0, v1, v2] = triangle.vertices.map(|v| v.position);
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > EPSILON).then_some(t)
    }

    /// Slab test. True when the ray passes through the box at `t >= 0`.
    pub fn hits_aabb(&self, aabb: &Aabb) -> bool {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            if dir.abs() < EPSILON {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (aabb.min[axis] - origin) * inv;
            let mut t1 = (aabb.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }

    /// Nearest hit against a whole mesh as `(t, triangle index)`
    pub fn intersect_mesh(&self, mesh: &Mesh) -> Option<(f32, usize)> {
        self.intersect_mesh_within(mesh, 0.0, f32::INFINITY)
    }

    /// Nearest hit with `near <= t <= far`. Faces outside the range never
    /// shadow faces inside it.
    pub fn intersect_mesh_within(&self, mesh: &Mesh, near: f32, far: f32) -> Option<(f32, usize)> {
        mesh.triangles
            .iter()
            .enumerate()
            .filter_map(|(i, triangle)| self.intersect_triangle(triangle).map(|t| (t, i)))
            .filter(|(t, _)| (near..=far).contains(t))
            // Strict comparison keeps the first triangle on ties
            .fold(None, |best, (t, i)| match best {
                Some((best_t, _)) if best_t <= t => best,
                _ => Some((t, i)),
            })
    }
}

/// Nearest surface hit for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Point3<f32>,
    pub distance: f32,
    pub target: ObjectId,
    pub face: usize,
}

/// Converts a pointer position and camera into the nearest scene intersection.
///
/// Only objects on the model layer are tested, so the marker and the drawn
/// path never intercept the pointer.
#[derive(Debug, Clone, Copy)]
pub struct Raycaster {
    pub near: f32,
    pub far: f32,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f32::INFINITY,
        }
    }
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(&self, camera: &Camera, pointer: &Point2<f32>, scene: &Scene) -> Option<Intersection> {
        let ray = camera.ray_from_ndc(pointer)?;
        self.intersect(&ray, scene)
    }

    pub fn intersect(&self, ray: &Ray, scene: &Scene) -> Option<Intersection> {
        let mut nearest: Option<Intersection> = None;

        // Scene iteration is ordered by id, which makes ties deterministic
        for (id, mesh, bounds) in scene.intersectables() {
            if let Some(bounds) = bounds {
                if !ray.hits_aabb(bounds) {
                    continue;
                }
            }
            let Some((t, face)) = ray.intersect_mesh_within(mesh, self.near, self.far) else {
                continue;
            };
            if nearest.map_or(true, |n| t < n.distance) {
                nearest = Some(Intersection {
                    point: ray.at(t),
                    distance: t,
                    target: id,
                    face,
                });
            }
        }

        nearest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Layer, SceneNode};
    use approx::assert_relative_eq;

    fn unit_quad_at_z(z: f32) -> Mesh {
        let a = Point3::new(-1.0, -1.0, z);
        let b = Point3::new(1.0, -1.0, z);
        let c = Point3::new(1.0, 1.0, z);
        let d = Point3::new(-1.0, 1.0, z);
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::from_positions(a, b, c));
        mesh.add_triangle(Triangle::from_positions(a, c, d));
        mesh
    }

    #[test]
    fn test_ray_hits_triangle_from_both_sides() {
        let quad = unit_quad_at_z(0.0);
        let down = Ray::new(Point3::new(0.2, 0.3, 5.0), -Vector3::z());
        let up = Ray::new(Point3::new(0.2, 0.3, -5.0), Vector3::z());
        assert_relative_eq!(down.intersect_mesh(&quad).unwrap().0, 5.0);
        assert_relative_eq!(up.intersect_mesh(&quad).unwrap().0, 5.0);
    }

    #[test]
    fn test_ray_misses_outside_triangle() {
        let quad = unit_quad_at_z(0.0);
        let ray = Ray::new(Point3::new(3.0, 0.0, 5.0), -Vector3::z());
        assert!(ray.intersect_mesh(&quad).is_none());
    }

    #[test]
    fn test_ray_ignores_hits_behind_origin() {
        let quad = unit_quad_at_z(0.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::z());
        assert!(ray.intersect_mesh(&quad).is_none());
    }

    #[test]
    fn test_aabb_slab_test() {
        let aabb = Aabb {
            min: Point3::new(-1.0, -1.0, -1.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        assert!(Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z()).hits_aabb(&aabb));
        assert!(!Ray::new(Point3::new(2.0, 0.0, 5.0), -Vector3::z()).hits_aabb(&aabb));
        assert!(!Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::z()).hits_aabb(&aabb));
    }

    #[test]
    fn test_nearest_object_wins() {
        let mut scene = Scene::new();
        let far = scene.add(Layer::Model, SceneNode::Mesh(unit_quad_at_z(-2.0)));
        let near = scene.add(Layer::Model, SceneNode::Mesh(unit_quad_at_z(1.0)));
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let hit = Raycaster::new().intersect(&ray, &scene).unwrap();
        assert_eq!(hit.target, near);
        assert_ne!(hit.target, far);
        assert_relative_eq!(hit.point, Point3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(hit.distance, 4.0);
    }

    #[test]
    fn test_overlay_objects_are_not_intersected() {
        let mut scene = Scene::new();
        scene.add(Layer::Overlay, SceneNode::Mesh(unit_quad_at_z(1.0)));
        let model = scene.add(Layer::Model, SceneNode::Mesh(unit_quad_at_z(0.0)));
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let hit = Raycaster::new().intersect(&ray, &scene).unwrap();
        assert_eq!(hit.target, model);
        assert_relative_eq!(hit.point.z, 0.0);
    }

    #[test]
    fn test_far_limit() {
        let mut scene = Scene::new();
        scene.add(Layer::Model, SceneNode::Mesh(unit_quad_at_z(0.0)));
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let raycaster = Raycaster {
            near: 0.0,
            far: 4.0,
        };
        assert!(raycaster.intersect(&ray, &scene).is_none());
    }

    #[test]
    fn test_near_limit_skips_to_farther_face_of_same_mesh() {
        let mut mesh = unit_quad_at_z(4.0);
        mesh.merge(unit_quad_at_z(0.0));
        let mut scene = Scene::new();
        scene.add(Layer::Model, SceneNode::Mesh(mesh));
        let ray = Ray::new(Point3::new(0.2, 0.3, 5.0), -Vector3::z());
        let raycaster = Raycaster {
            near: 2.0,
            far: f32::INFINITY,
        };
        let hit = raycaster.intersect(&ray, &scene).unwrap();
        assert_relative_eq!(hit.distance, 5.0);
        assert_relative_eq!(hit.point.z, 0.0);
        assert!(hit.face >= 2);
    }

    #[test]
    fn test_cast_is_deterministic() {
        let mut scene = Scene::new();
        scene.add(Layer::Model, SceneNode::Mesh(Mesh::cube(2.0)));
        let camera = Camera::new(800, 600);
        let pointer = Point2::new(0.013, -0.071);
        let raycaster = Raycaster::new();
        let a = raycaster.cast(&camera, &pointer, &scene).unwrap();
        let b = raycaster.cast(&camera, &pointer, &scene).unwrap();
        assert_eq!(a.point.coords.map(f32::to_bits), b.point.coords.map(f32::to_bits));
        assert_eq!(a, b);
    }
}
