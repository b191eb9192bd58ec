//! Curves through captured points and the geometry swept along them.

use nalgebra::{Point3, Rotation3, Unit, Vector3};

use crate::geometry::{Mesh, Triangle, Vertex};

/// Number of samples along the tube, independent of the path length
pub const TUBULAR_SEGMENTS: usize = 20;
/// Number of sides of the tube cross-section
pub const RADIAL_SEGMENTS: usize = 8;
pub const DEFAULT_TUBE_RADIUS: f32 = 0.05;

const TENSION: f32 = 0.5;
const ARC_LENGTH_DIVISIONS: usize = 200;
const TANGENT_DELTA: f32 = 1e-4;

/// Straight segments through points in order
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point3<f32>>,
}

impl Polyline {
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        Self { points }
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn segments(&self) -> impl Iterator<Item = (&Point3<f32>, &Point3<f32>)> {
        self.points.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// Uniform Catmull-Rom spline that passes through every control point.
///
/// The missing neighbours of the first and last points are mirrored, so
/// the curve starts and ends exactly on them.
#[derive(Debug, Clone, PartialEq)]
pub struct CatmullRomCurve {
    points: Vec<Point3<f32>>,
    /// Cumulative arc lengths at `ARC_LENGTH_DIVISIONS + 1` even steps of `t`
    lengths: Vec<f32>,
}

impl CatmullRomCurve {
    /// Needs at least two control points
    pub fn new(points: Vec<Point3<f32>>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let mut curve = Self {
            points,
            lengths: Vec::new(),
        };
        curve.lengths = curve.arc_lengths();
        Some(curve)
    }

    pub fn control_points(&self) -> &[Point3<f32>] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at parameter `t` in `[0, 1]`, spread evenly over control point spans
    pub fn point(&self, t: f32) -> Point3<f32> {
        let n = self.points.len();
        let p = (n - 1) as f32 * t.clamp(0.0, 1.0);
        let mut index = p.floor() as usize;
        let mut weight = p - index as f32;
        if index >= n - 1 {
            index = n - 2;
            weight = 1.0;
        }

        let p1 = self.points[index];
        let p2 = self.points[index + 1];
        let p0 = if index > 0 {
            self.points[index - 1]
        } else {
            p1 + (p1 - p2)
        };
        let p3 = if index + 2 < n {
            self.points[index + 2]
        } else {
            p2 + (p2 - p1)
        };

        let coords = catmull_rom(p0.coords, p1.coords, p2.coords, p3.coords, weight);
        Point3::from(coords)
    }

    /// Point at fraction `u` of the total arc length
    pub fn point_at(&self, u: f32) -> Point3<f32> {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at arc-length fraction `u`
    pub fn tangent_at(&self, u: f32) -> Vector3<f32> {
        let t = self.u_to_t(u);
        let t1 = (t - TANGENT_DELTA).max(0.0);
        let t2 = (t + TANGENT_DELTA).min(1.0);
        (self.point(t2) - self.point(t1))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| self.fallback_direction())
    }

    fn fallback_direction(&self) -> Vector3<f32> {
        let first = self.points[0];
        self.points
            .iter()
            .find_map(|p| (p - first).try_normalize(f32::EPSILON))
            .unwrap_or_else(Vector3::x)
    }

    fn arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut last = self.point(0.0);
        let mut sum = 0.0;
        lengths.push(0.0);
        for i in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(i as f32 / ARC_LENGTH_DIVISIONS as f32);
            sum += (current - last).norm();
            lengths.push(sum);
            last = current;
        }
        lengths
    }

    /// Map an arc-length fraction onto the curve parameter
    fn u_to_t(&self, u: f32) -> f32 {
        let total = self.length();
        if total <= f32::EPSILON {
            return u.clamp(0.0, 1.0);
        }
        let target = u.clamp(0.0, 1.0) * total;

        // First sample whose cumulative length reaches the target
        let i = self.lengths.partition_point(|&l| l < target);
        if i == 0 {
            return 0.0;
        }
        if i >= self.lengths.len() {
            return 1.0;
        }
        let before = self.lengths[i - 1];
        let segment = self.lengths[i] - before;
        let fraction = if segment > 0.0 {
            (target - before) / segment
        } else {
            0.0
        };
        (i as f32 - 1.0 + fraction) / ARC_LENGTH_DIVISIONS as f32
    }
}

fn catmull_rom(
    p0: Vector3<f32>,
    p1: Vector3<f32>,
    p2: Vector3<f32>,
    p3: Vector3<f32>,
    t: f32,
) -> Vector3<f32> {
    let m1 = (p2 - p0) * TENSION;
    let m2 = (p3 - p1) * TENSION;
    let c0 = p1;
    let c1 = m1;
    let c2 = p1 * -3.0 + p2 * 3.0 - m1 * 2.0 - m2;
    let c3 = p1 * 2.0 - p2 * 2.0 + m1 + m2;
    let t2 = t * t;
    c0 + c1 * t + c2 * t2 + c3 * t2 * t
}

/// Circular cross-section swept along a curve, stored as indexed buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct TubeGeometry {
    pub tubular_segments: usize,
    pub radial_segments: usize,
    pub radius: f32,
    pub closed: bool,
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub indices: Vec<u32>,
}

impl TubeGeometry {
    /// Sweep an open tube with the fixed segment counts
    pub fn sweep(curve: &CatmullRomCurve, radius: f32) -> Self {
        Self::with_segments(curve, radius, TUBULAR_SEGMENTS, RADIAL_SEGMENTS)
    }

    pub fn with_segments(
        curve: &CatmullRomCurve,
        radius: f32,
        tubular_segments: usize,
        radial_segments: usize,
    ) -> Self {
        let tubular_segments = tubular_segments.max(1);
        let radial_segments = radial_segments.max(3);
        let frames = FrenetFrames::compute(curve, tubular_segments);

        let ring = radial_segments + 1;
        let mut positions = Vec::with_capacity((tubular_segments + 1) * ring);
        let mut normals = Vec::with_capacity((tubular_segments + 1) * ring);

        for i in 0..=tubular_segments {
            let center = curve.point_at(i as f32 / tubular_segments as f32);
            let (n, b) = (frames.normals[i], frames.binormals[i]);
            for j in 0..=radial_segments {
                let v = j as f32 / radial_segments as f32 * std::f32::consts::TAU;
                let (sin, cos) = v.sin_cos();
                let normal = (n * -cos + b * sin).normalize();
                normals.push(normal);
                positions.push(center + normal * radius);
            }
        }

        let mut indices = Vec::with_capacity(tubular_segments * radial_segments * 6);
        for j in 1..=tubular_segments {
            for i in 1..=radial_segments {
                let a = (ring * (j - 1) + (i - 1)) as u32;
                let b = (ring * j + (i - 1)) as u32;
                let c = (ring * j + i) as u32;
                let d = (ring * (j - 1) + i) as u32;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            tubular_segments,
            radial_segments,
            radius,
            closed: false,
            positions,
            normals,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flatten into a triangle soup for rasterisation
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::with_capacity(self.triangle_count());
        for face in self.indices.chunks_exact(3) {
            let [a, b, c] = [face[0], face[1], face[2]].map(|i| {
                let i = i as usize;
                Vertex::from_parts(self.positions[i], self.normals[i])
            });
            mesh.add_triangle(Triangle::new(a, b, c));
        }
        mesh
    }
}

/// Tangent/normal/binormal triples along a curve, parallel transported from
/// the first sample to avoid sudden twists.
struct FrenetFrames {
    normals: Vec<Vector3<f32>>,
    binormals: Vec<Vector3<f32>>,
}

impl FrenetFrames {
    fn compute(curve: &CatmullRomCurve, segments: usize) -> Self {
        let tangents: Vec<Vector3<f32>> = (0..=segments)
            .map(|i| curve.tangent_at(i as f32 / segments as f32))
            .collect();

        let mut normals = Vec::with_capacity(segments + 1);
        let mut binormals = Vec::with_capacity(segments + 1);

        // Seed the first normal from the axis least aligned with the tangent
        let t0 = tangents[0];
        let axis = {
            let (x, y, z) = (t0.x.abs(), t0.y.abs(), t0.z.abs());
            if x <= y && x <= z {
                Vector3::x()
            } else if y <= z {
                Vector3::y()
            } else {
                Vector3::z()
            }
        };
        let seed = t0.cross(&axis).normalize();
        normals.push(t0.cross(&seed));
        binormals.push(t0.cross(&normals[0]));

        for i in 1..=segments {
            let mut normal = normals[i - 1];
            if let Some(axis) = Unit::try_new(tangents[i - 1].cross(&tangents[i]), f32::EPSILON) {
                let theta = tangents[i - 1].dot(&tangents[i]).clamp(-1.0, 1.0).acos();
                normal = Rotation3::from_axis_angle(&axis, theta) * normal;
            }
            binormals.push(tangents[i].cross(&normal));
            normals.push(normal);
        }

        Self { normals, binormals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bent_path() -> Vec<Point3<f32>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 2.0),
        ]
    }

    #[test]
    fn test_curve_needs_two_points() {
        assert!(CatmullRomCurve::new(vec![]).is_none());
        assert!(CatmullRomCurve::new(vec![Point3::origin()]).is_none());
        assert!(CatmullRomCurve::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]).is_some());
    }

    #[test]
    fn test_curve_interpolates_control_points() {
        let points = bent_path();
        let curve = CatmullRomCurve::new(points.clone()).unwrap();
        let spans = (points.len() - 1) as f32;
        for (i, p) in points.iter().enumerate() {
            assert_relative_eq!(curve.point(i as f32 / spans), *p, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_two_point_curve_is_straight() {
        let curve =
            CatmullRomCurve::new(vec![Point3::origin(), Point3::new(2.0, 0.0, 0.0)]).unwrap();
        assert_relative_eq!(curve.point_at(0.5), Point3::new(1.0, 0.0, 0.0), epsilon = 1e-3);
        assert_relative_eq!(curve.length(), 2.0, epsilon = 1e-3);
        assert_relative_eq!(curve.tangent_at(0.3), Vector3::x(), epsilon = 1e-4);
    }

    #[test]
    fn test_polyline_segments() {
        let polyline = Polyline::new(bent_path());
        assert_eq!(polyline.segment_count(), 3);
        let first = polyline.segments().next().unwrap();
        assert_eq!(first, (&Point3::origin(), &Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_tube_segment_counts_are_fixed() {
        for len in [2, 3, 17, 120] {
            let points: Vec<_> = (0..len)
                .map(|i| Point3::new(i as f32 * 0.1, (i as f32 * 0.7).sin(), 0.0))
                .collect();
            let curve = CatmullRomCurve::new(points).unwrap();
            let tube = TubeGeometry::sweep(&curve, DEFAULT_TUBE_RADIUS);
            assert_eq!(tube.tubular_segments, 20);
            assert_eq!(tube.radial_segments, 8);
            assert!(!tube.closed);
            assert_eq!(tube.positions.len(), 21 * 9);
            assert_eq!(tube.indices.len(), 20 * 8 * 6);
        }
    }

    #[test]
    fn test_tube_vertices_sit_at_radius() {
        let curve = CatmullRomCurve::new(bent_path()).unwrap();
        let tube = TubeGeometry::sweep(&curve, 0.25);
        for (i, ring) in tube.positions.chunks(RADIAL_SEGMENTS + 1).enumerate() {
            let center = curve.point_at(i as f32 / TUBULAR_SEGMENTS as f32);
            for p in ring {
                assert_relative_eq!((p - center).norm(), 0.25, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_tube_frames_stay_perpendicular() {
        let curve = CatmullRomCurve::new(bent_path()).unwrap();
        let frames = FrenetFrames::compute(&curve, TUBULAR_SEGMENTS);
        for i in 0..=TUBULAR_SEGMENTS {
            let t = curve.tangent_at(i as f32 / TUBULAR_SEGMENTS as f32);
            assert!(frames.normals[i].dot(&t).abs() < 1e-3);
            assert!(frames.binormals[i].dot(&t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_tube_is_finite_for_repeated_points() {
        let p = Point3::new(0.5, 0.5, 0.5);
        let curve = CatmullRomCurve::new(vec![p, p, p]).unwrap();
        let tube = TubeGeometry::sweep(&curve, 0.1);
        assert!(tube
            .positions
            .iter()
            .all(|v| v.coords.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn test_tube_to_mesh() {
        let curve = CatmullRomCurve::new(bent_path()).unwrap();
        let tube = TubeGeometry::sweep(&curve, 0.1);
        assert_eq!(tube.to_mesh().triangles.len(), 20 * 8 * 2);
    }
}
