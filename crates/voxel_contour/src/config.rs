//! Grid and layer configuration.
//!
//! ```toml
//! voxel_resolution = 8
//! chunk_resolution = 2
//! chunk_size = 8.0
//! extrusion_height = 1.0
//! material_mode = "double_index"
//!
//! [[layers]]
//! surface = true
//! extrusion = true
//! rim_thickness = 0.25
//! rim_subdivisions = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_FEATURE_ANGLE, DEFAULT_MAX_PARALLEL_ANGLE};
use crate::material::MaterialMode;

/// Errors raised while building or loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("voxel resolution must be at least 1, got {0}")]
  VoxelResolution(usize),
  #[error("chunk resolution must be at least 1, got {0}")]
  ChunkResolution(usize),
  #[error("chunk size must be positive, got {0}")]
  ChunkSize(f32),
  #[error("extrusion height must not be negative, got {0}")]
  ExtrusionHeight(f32),
  #[error("{name} must lie in (0, 180) degrees, got {value}")]
  Angle { name: &'static str, value: f32 },
  #[error("layer {layer}: {reason}")]
  Layer { layer: usize, reason: &'static str },
  #[error("too many layers: {0} (fill ids are 8-bit)")]
  TooManyLayers(usize),
  #[error("failed to read configuration: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse configuration: {0}")]
  Parse(#[from] toml::de::Error),
}

/// Output flags of one fill layer. Layer `L` (fill id `L`) is `layers[L - 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
  /// Emit the top cap.
  pub surface: bool,
  /// Emit the back cap and side walls.
  pub extrusion: bool,
  /// Grid-global instead of chunk-local cap UVs.
  pub uv_remap: bool,
  /// Rim ribbon width; zero disables the rim.
  pub rim_thickness: f32,
  /// Rim rows across the ribbon width.
  pub rim_subdivisions: u32,
}

impl Default for LayerConfig {
  fn default() -> Self {
    Self {
      surface: true,
      extrusion: false,
      uv_remap: false,
      rim_thickness: 0.0,
      rim_subdivisions: 1,
    }
  }
}

impl LayerConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_surface(mut self, surface: bool) -> Self {
    self.surface = surface;
    self
  }

  pub fn with_extrusion(mut self, extrusion: bool) -> Self {
    self.extrusion = extrusion;
    self
  }

  pub fn with_uv_remap(mut self, uv_remap: bool) -> Self {
    self.uv_remap = uv_remap;
    self
  }

  pub fn with_rim(mut self, thickness: f32, subdivisions: u32) -> Self {
    self.rim_thickness = thickness;
    self.rim_subdivisions = subdivisions;
    self
  }

  #[inline]
  pub fn has_rim(&self) -> bool {
    self.rim_thickness > 0.0 && self.rim_subdivisions > 0
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
  /// Voxels per chunk side.
  pub voxel_resolution: usize,
  /// Chunks per grid side.
  pub chunk_resolution: usize,
  /// World size of one chunk side.
  pub chunk_size: f32,
  pub extrusion_height: f32,
  /// Degrees; tighter corners become sharp features.
  pub max_feature_angle: f32,
  /// Degrees; normals closer than this count as parallel.
  pub max_parallel_angle: f32,
  pub material_mode: MaterialMode,
  pub layers: Vec<LayerConfig>,
}

impl Default for GridConfig {
  fn default() -> Self {
    Self {
      voxel_resolution: 8,
      chunk_resolution: 2,
      chunk_size: 8.0,
      extrusion_height: 1.0,
      max_feature_angle: DEFAULT_MAX_FEATURE_ANGLE,
      max_parallel_angle: DEFAULT_MAX_PARALLEL_ANGLE,
      material_mode: MaterialMode::default(),
      layers: vec![LayerConfig::default()],
    }
  }
}

impl GridConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_voxel_resolution(mut self, resolution: usize) -> Self {
    self.voxel_resolution = resolution;
    self
  }

  pub fn with_chunk_resolution(mut self, resolution: usize) -> Self {
    self.chunk_resolution = resolution;
    self
  }

  pub fn with_chunk_size(mut self, size: f32) -> Self {
    self.chunk_size = size;
    self
  }

  pub fn with_extrusion_height(mut self, height: f32) -> Self {
    self.extrusion_height = height;
    self
  }

  pub fn with_feature_angles(mut self, max_feature: f32, max_parallel: f32) -> Self {
    self.max_feature_angle = max_feature;
    self.max_parallel_angle = max_parallel;
    self
  }

  pub fn with_material_mode(mut self, mode: MaterialMode) -> Self {
    self.material_mode = mode;
    self
  }

  pub fn with_layers(mut self, layers: Vec<LayerConfig>) -> Self {
    self.layers = layers;
    self
  }

  /// Parse a TOML document. The result is validated.
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let config: GridConfig = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.voxel_resolution < 1 {
      return Err(ConfigError::VoxelResolution(self.voxel_resolution));
    }
    if self.chunk_resolution < 1 {
      return Err(ConfigError::ChunkResolution(self.chunk_resolution));
    }
    if !(self.chunk_size > 0.0) {
      return Err(ConfigError::ChunkSize(self.chunk_size));
    }
    if !(self.extrusion_height >= 0.0) {
      return Err(ConfigError::ExtrusionHeight(self.extrusion_height));
    }
    for (name, value) in [
      ("max_feature_angle", self.max_feature_angle),
      ("max_parallel_angle", self.max_parallel_angle),
    ] {
      if !(value > 0.0 && value < 180.0) {
        return Err(ConfigError::Angle { name, value });
      }
    }
    if self.layers.len() > u8::MAX as usize {
      return Err(ConfigError::TooManyLayers(self.layers.len()));
    }
    for (k, layer) in self.layers.iter().enumerate() {
      if !(layer.rim_thickness >= 0.0) {
        return Err(ConfigError::Layer {
          layer: k + 1,
          reason: "rim thickness must not be negative",
        });
      }
    }
    Ok(())
  }

  #[inline]
  pub fn voxel_size(&self) -> f32 {
    self.chunk_size / self.voxel_resolution as f32
  }

  /// World extent of the whole grid along one side.
  #[inline]
  pub fn grid_size(&self) -> f32 {
    self.chunk_size * self.chunk_resolution as f32
  }

  pub fn sharp_threshold(&self) -> f32 {
    self.max_feature_angle.to_radians().cos()
  }

  pub fn parallel_threshold(&self) -> f32 {
    self.max_parallel_angle.to_radians().cos()
  }

  /// Flags of the layer drawn for fill id `fill`.
  pub fn layer(&self, fill: u8) -> Option<&LayerConfig> {
    (fill as usize).checked_sub(1).and_then(|k| self.layers.get(k))
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
