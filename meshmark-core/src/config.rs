//! Engine configuration, read from TOML

use std::path::Path;

use serde::Deserialize;

use crate::curve::DEFAULT_TUBE_RADIUS;
use crate::error::Result;
use crate::marker::DEFAULT_MARKER_BIAS;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Offset added to each axis of the hover marker position
    pub marker_bias: f32,
    pub tube_radius: f32,
    /// Minimum distance between consecutive captured points. Unset keeps
    /// every held frame.
    pub min_point_spacing: Option<f32>,
    /// Mark every captured point with a sprite, offset like the marker
    pub point_sprites: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marker_bias: DEFAULT_MARKER_BIAS,
            tube_radius: DEFAULT_TUBE_RADIUS,
            min_point_spacing: None,
            point_sprites: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}
