//! Orbit camera navigation

use nalgebra::{Point3, Vector3};

use crate::geometry::Aabb;
use crate::projection::Camera;

const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
const MIN_DISTANCE: f32 = 0.05;

/// The enabled flag of whatever drives camera navigation.
///
/// The annotation engine only reads and writes this flag; it never moves the
/// camera itself.
pub trait CameraControl {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
}

/// Orbit around a target point (yaw / pitch in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    enabled: bool,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>, yaw: f32, pitch: f32, distance: f32) -> Self {
        Self {
            target,
            yaw,
            pitch: pitch.clamp(-MAX_PITCH, MAX_PITCH),
            distance: distance.max(MIN_DISTANCE),
            enabled: true,
        }
    }

    /// Pick up the orbit that reproduces the camera's current placement
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.norm().max(MIN_DISTANCE);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw = offset.x.atan2(offset.z);
        Self::new(camera.target, yaw, pitch, distance)
    }

    /// Rotate by delta amounts. Ignored while disabled.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-MAX_PITCH, MAX_PITCH);
        true
    }

    /// Multiply the orbit distance. Ignored while disabled.
    pub fn zoom(&mut self, factor: f32) -> bool {
        if !self.enabled || factor <= 0.0 {
            return false;
        }
        self.distance = (self.distance * factor).max(MIN_DISTANCE);
        true
    }

    /// Centre the orbit on `bounds` at a distance that keeps it in view
    pub fn frame(&mut self, bounds: &Aabb) {
        self.target = bounds.center();
        self.distance = (bounds.extent() * 1.5).max(MIN_DISTANCE);
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
        self.target + offset * self.distance
    }

    /// Write the orbit into the camera
    pub fn sync(&self, camera: &mut Camera) {
        camera.position = self.eye();
        camera.target = self.target;
    }
}

impl CameraControl for OrbitControls {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::from_camera(&Camera::default())
    }
}
