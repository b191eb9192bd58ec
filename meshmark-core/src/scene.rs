//! Minimal scene graph shared between the host and the annotation engine.
//!
//! The host owns the model layer; the engine only ever adds, replaces and
//! removes its own overlay objects.

use std::collections::BTreeMap;

use nalgebra::Point3;

use crate::geometry::{Aabb, Mesh};
use crate::render::DisplayGeometry;

/// Stable handle to an object in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

/// Which part of the scene an object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Loaded model geometry, the only intersectable layer
    Model,
    /// Helper objects drawn on top of the model (marker, annotation path)
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Mesh(Mesh),
    Points(Vec<Point3<f32>>),
    Path(DisplayGeometry),
}

#[derive(Debug)]
struct Entry {
    layer: Layer,
    node: SceneNode,
    bounds: Option<Aabb>,
}

impl Entry {
    fn new(layer: Layer, node: SceneNode) -> Self {
        let bounds = match &node {
            SceneNode::Mesh(mesh) => mesh.bounds(),
            _ => None,
        };
        Self {
            layer,
            node,
            bounds,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<ObjectId, Entry>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, layer: Layer, node: SceneNode) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Entry::new(layer, node));
        id
    }

    /// Detach an object and hand it back to the caller
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneNode> {
        self.nodes.remove(&id).map(|entry| entry.node)
    }

    /// Swap the contents of an existing object, keeping its id and layer.
    ///
    /// Returns the previous contents, or `None` (dropping `node`) when the id
    /// is unknown.
    pub fn replace(&mut self, id: ObjectId, node: SceneNode) -> Option<SceneNode> {
        let entry = self.nodes.get_mut(&id)?;
        let fresh = Entry::new(entry.layer, node);
        Some(std::mem::replace(entry, fresh).node)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneNode> {
        self.nodes.get(&id).map(|entry| &entry.node)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count(&self, layer: Layer) -> usize {
        self.nodes.values().filter(|e| e.layer == layer).count()
    }

    /// Remove every object on `layer`
    pub fn clear_layer(&mut self, layer: Layer) {
        self.nodes.retain(|_, entry| entry.layer != layer);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, Layer, &SceneNode)> {
        self.nodes
            .iter()
            .map(|(id, entry)| (*id, entry.layer, &entry.node))
    }

    /// Model-layer meshes with their cached bounds, in id order
    pub fn intersectables(&self) -> impl Iterator<Item = (ObjectId, &Mesh, Option<&Aabb>)> {
        self.nodes.iter().filter_map(|(id, entry)| match (&entry.layer, &entry.node) {
            (Layer::Model, SceneNode::Mesh(mesh)) => Some((*id, mesh, entry.bounds.as_ref())),
            _ => None,
        })
    }

    /// Combined bounds of the model layer
    pub fn model_bounds(&self) -> Option<Aabb> {
        self.intersectables()
            .filter_map(|(_, _, bounds)| bounds.copied())
            .reduce(|a, b| Aabb {
                min: a.min.inf(&b.min),
                max: a.max.sup(&b.max),
            })
    }
}
