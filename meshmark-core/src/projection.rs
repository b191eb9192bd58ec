//! Camera and projection utilities

use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::raycast::Ray;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(5.0, 5.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 1000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z())
    }

    /// Project a world-space point to normalized device coordinates.
    ///
    /// Returns `None` for points behind the camera.
    pub fn project_to_ndc(&self, point: &Point3<f32>) -> Option<Point3<f32>> {
        let eye = self.view_matrix().transform_point(point);
        if self.mode == ProjectionMode::Perspective && eye.z > -self.near {
            return None;
        }
        Some(self.projection_matrix().transform_point(&eye))
    }

    /// Project a 3D point to 2D screen space as `(x, y, depth)`
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let ndc = self.project_to_ndc(point)?;

        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }

    /// Build the world-space ray passing through a pointer position given in NDC.
    ///
    /// Perspective rays start at the eye; orthographic rays start on the near
    /// plane and run parallel to the view direction.
    pub fn ray_from_ndc(&self, ndc: &Point2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        match self.mode {
            ProjectionMode::Perspective => {
                let through = inverse.transform_point(&Point3::new(ndc.x, ndc.y, 0.5));
                let direction = (through - self.position).try_normalize(f32::EPSILON)?;
                Some(Ray::new(self.position, direction))
            }
            ProjectionMode::Orthographic => {
                let origin = inverse.transform_point(&Point3::new(ndc.x, ndc.y, -1.0));
                Some(Ray::new(origin, self.forward()))
            }
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Convert a cell/pixel position on a `width` x `height` surface into NDC.
///
/// Positions address the centre of the cell.
pub fn screen_to_ndc(x: f32, y: f32, width: u32, height: u32) -> Point2<f32> {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Point2::new((x + 0.5) / w * 2.0 - 1.0, 1.0 - (y + 0.5) / h * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::new(800, 600);
        let ray = camera.ray_from_ndc(&Point2::origin()).unwrap();
        assert_relative_eq!(ray.origin, camera.position);
        assert_relative_eq!(ray.direction, camera.forward(), epsilon = 1e-5);
    }

    #[test]
    fn test_project_target_to_screen_center() {
        let camera = Camera::new(80, 40);
        let (x, y, _) = camera.project_to_screen(&camera.target, 80, 40).unwrap();
        assert!((x - 40.0).abs() < 1e-3);
        assert!((y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_point_behind_camera_is_culled() {
        let camera = Camera::new(800, 600);
        let behind = camera.position - camera.forward() * 3.0;
        assert!(camera.project_to_ndc(&behind).is_none());
    }

    #[test]
    fn test_projection_and_ray_agree() {
        let camera = Camera::new(800, 600);
        let point = Point3::new(0.5, -0.25, 0.75);
        let ndc = camera.project_to_ndc(&point).unwrap();
        let ray = camera.ray_from_ndc(&Point2::new(ndc.x, ndc.y)).unwrap();
        let expected = (point - camera.position).normalize();
        assert_relative_eq!(ray.direction, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_rays_are_parallel() {
        let mut camera = Camera::new(800, 600);
        camera.mode = ProjectionMode::Orthographic;
        let a = camera.ray_from_ndc(&Point2::new(-0.5, 0.5)).unwrap();
        let b = camera.ray_from_ndc(&Point2::new(0.5, -0.5)).unwrap();
        assert_relative_eq!(a.direction, b.direction, epsilon = 1e-6);
        assert!((a.origin - b.origin).norm() > 0.1);
    }

    #[test]
    fn test_screen_to_ndc_corners() {
        let ndc = screen_to_ndc(0.0, 0.0, 2, 2);
        assert_relative_eq!(ndc, Point2::new(-0.5, 0.5));
        let ndc = screen_to_ndc(1.0, 1.0, 2, 2);
        assert_relative_eq!(ndc, Point2::new(0.5, -0.5));
    }
}
