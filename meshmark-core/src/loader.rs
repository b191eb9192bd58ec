//! Model intake: extension filtering and glTF loading.

use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, Point3};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Gltf,
    Glb,
}

impl ModelFormat {
    /// Detect format by extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }
}

/// A file accepted for loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    pub path: PathBuf,
    pub format: ModelFormat,
}

impl ModelHandle {
    /// Read the file and flatten every triangle primitive of its scene into
    /// one world-space mesh
    pub fn load(&self) -> Result<Mesh> {
        let (document, buffers, _images) = gltf::import(&self.path)?;
        let mesh = flatten(&document, &buffers).ok_or_else(|| Error::EmptyModel(self.path.clone()))?;
        info!(path = %self.path.display(), triangles = mesh.triangles.len(), "model loaded");
        Ok(mesh)
    }
}

/// Every triangle primitive of the document's scene as one world-space mesh
fn flatten(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Option<Mesh> {
    let mut mesh = Mesh::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, &Matrix4::identity(), buffers, &mut mesh);
            }
        }
        // No scene graph at all: take meshes as authored
        None => {
            for gltf_mesh in document.meshes() {
                collect_mesh(&gltf_mesh, &Matrix4::identity(), buffers, &mut mesh);
            }
        }
    }
    (!mesh.is_empty()).then_some(mesh)
}

/// Accepts `.gltf` and `.glb` files and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelLoader;

impl ModelLoader {
    /// Rejection is silent: anything else simply yields `None`
    pub fn accept(path: impl AsRef<Path>) -> Option<ModelHandle> {
        let path = path.as_ref();
        let Some(format) = ModelFormat::from_path(path) else {
            debug!(path = %path.display(), "ignoring unsupported file");
            return None;
        };
        Some(ModelHandle {
            path: path.to_path_buf(),
            format,
        })
    }

    /// Like [`ModelLoader::accept`] but reports the rejection
    pub fn open(path: impl AsRef<Path>) -> Result<ModelHandle> {
        let path = path.as_ref();
        Self::accept(path).ok_or_else(|| Error::UnsupportedFormat(path.to_path_buf()))
    }

    /// Load from bytes already in memory, for hosts that receive file
    /// contents rather than paths. `name` is only used for filtering and errors.
    pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<Mesh> {
        let handle = Self::open(name)?;
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        let mesh = flatten(&document, &buffers).ok_or(Error::EmptyModel(handle.path))?;
        info!(name, triangles = mesh.triangles.len(), "model loaded from memory");
        Ok(mesh)
    }
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    out: &mut Mesh,
) {
    let world = parent * Matrix4::from(node.transform().matrix());
    if let Some(gltf_mesh) = node.mesh() {
        collect_mesh(&gltf_mesh, &world, buffers, out);
    }
    for child in node.children() {
        collect_node(&child, &world, buffers, out);
    }
}

fn collect_mesh(
    gltf_mesh: &gltf::Mesh<'_>,
    transform: &Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    out: &mut Mesh,
) {
    for primitive in gltf_mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            debug!(mode = ?primitive.mode(), "skipping non-triangle primitive");
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Point3<f32>> = positions
            .map(|p| transform.transform_point(&Point3::from(p)))
            .collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        out.merge(Mesh::from_indexed(&positions, None, &indices));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    // One triangle (0,0,0) (1,0,0) (0,1,0)
    const TRIANGLE_BASE64: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA";

    fn document(buffer: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "mesh": 0, "translation": [0.0, 0.0, 2.0] }}],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }} }}] }}],
  "buffers": [{buffer}],
  "bufferViews": [{{ "buffer": 0, "byteLength": 36 }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
  }}]
}}"#
        )
    }

    fn triangle_bytes() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn test_accepts_only_gltf_and_glb() {
        assert_eq!(ModelLoader::accept("scan.gltf").unwrap().format, ModelFormat::Gltf);
        assert_eq!(ModelLoader::accept("scan.GLB").unwrap().format, ModelFormat::Glb);
        assert!(ModelLoader::accept("scan.obj").is_none());
        assert!(ModelLoader::accept("scan.stl").is_none());
        assert!(ModelLoader::accept("gltf").is_none());
    }

    #[test]
    fn test_open_reports_rejection() {
        let err = ModelLoader::open("notes.txt").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_gltf_applies_node_transform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.gltf");
        let buffer = format!(
            r#"{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{TRIANGLE_BASE64}" }}"#
        );
        std::fs::write(&path, document(&buffer)).unwrap();

        let mesh = ModelLoader::accept(&path).unwrap().load().unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        let positions: Vec<_> = mesh.triangles[0].vertices.iter().map(|v| v.position).collect();
        assert_relative_eq!(positions[0], Point3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(positions[1], Point3::new(1.0, 0.0, 2.0));
        assert_relative_eq!(positions[2], Point3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn test_load_glb() {
        let mut file = tempfile::Builder::new().suffix(".glb").tempfile().unwrap();
        let json = document(r#"{ "byteLength": 36 }"#);
        file.write_all(&glb(&json, &triangle_bytes())).unwrap();
        file.flush().unwrap();

        let mesh = ModelLoader::accept(file.path()).unwrap().load().unwrap();
        assert_eq!(mesh.triangles.len(), 1);
    }

    #[test]
    fn test_load_bytes() {
        let json = document(r#"{ "byteLength": 36 }"#);
        let mesh = ModelLoader::load_bytes("drop.glb", &glb(&json, &triangle_bytes())).unwrap();
        assert_eq!(mesh.triangles.len(), 1);

        let err = ModelLoader::load_bytes("drop.obj", b"o cube").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let handle = ModelLoader::accept("/no/such/model.glb").unwrap();
        assert!(handle.load().is_err());
    }
}
