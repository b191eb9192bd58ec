//! meshmark core - free-hand annotation of 3D meshes
//!
//! This library holds everything a host needs to let a user sketch on a
//! loaded model: pointer raycasting, the hover marker, the Navigate/Draw and
//! Line/Tube mode machine, stroke capture and the polyline/tube geometry
//! rebuilt from the stroke. Hosts own the window, the frame loop and the
//! presentation; they call into [`AnnotationEngine`] once per frame.

pub mod capture;
pub mod config;
pub mod controls;
pub mod curve;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod loader;
pub mod marker;
pub mod mode;
pub mod projection;
pub mod raycast;
pub mod render;
pub mod scene;

// Re-export commonly used types
pub use capture::{Path, PointCapture};
pub use config::EngineConfig;
pub use controls::{CameraControl, OrbitControls};
pub use curve::{CatmullRomCurve, Polyline, TubeGeometry};
pub use engine::{AnnotationEngine, FrameReport};
pub use error::{Error, Result};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use input::PointerEvent;
pub use loader::{ModelFormat, ModelHandle, ModelLoader};
pub use mode::{ModeChange, Representation};
pub use projection::{Camera, ProjectionMode};
pub use raycast::{Intersection, Ray, Raycaster};
pub use render::DisplayGeometry;
pub use scene::{Layer, ObjectId, Scene, SceneNode};
