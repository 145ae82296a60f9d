//! Voxel sample: fill id, material and the two forward edge crossings.
//!
//! Each voxel owns the crossing on the edge towards its +X neighbor and the
//! one towards its +Y neighbor. A crossing is meaningful only while the two
//! voxels on that edge hold different fill ids.
//!
//! Stored crossing normals point from the voxel with the higher fill id to
//! the one with the lower fill id. A layer that sits on the lower side flips
//! the normal to get its own outward direction.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::material::Material;

/// Fill id of empty space.
pub const EMPTY: u8 = 0;

/// Contour crossing on a voxel edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
  /// Fraction of the voxel size along the edge, in [0, 1].
  pub t: f32,
  /// Unit normal in stored (higher → lower fill id) orientation.
  pub normal: Vec2,
}

impl Crossing {
  pub fn new(t: f32, normal: Vec2) -> Self {
    Self {
      t: t.clamp(0.0, 1.0),
      normal: normal.normalize_or(Vec2::X),
    }
  }

  /// Crossing whose normal is re-validated against the edge axis.
  ///
  /// `axis` runs from the edge's first voxel to its second. The normal is
  /// flipped when it would point towards the higher fill id.
  pub fn oriented(t: f32, normal: Vec2, axis: Vec2, first_fill: u8, second_fill: u8) -> Self {
    let mut crossing = Self::new(t, normal);
    let towards_second = crossing.normal.dot(axis) >= 0.0;
    if towards_second != (first_fill > second_fill) {
      crossing.normal = -crossing.normal;
    }
    crossing
  }

  /// Normal oriented away from a voxel holding `from_fill`.
  #[inline]
  pub fn normal_from(&self, from_fill: u8, other_fill: u8) -> Vec2 {
    if from_fill > other_fill {
      self.normal
    } else {
      -self.normal
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
  pub fill: u8,
  pub material: Material,
  /// Crossing towards the +X neighbor.
  pub x_crossing: Option<Crossing>,
  /// Crossing towards the +Y neighbor.
  pub y_crossing: Option<Crossing>,
  /// Voxel center, chunk-local.
  pub position: Vec2,
}

impl Voxel {
  /// Empty voxel centered in cell `(x, y)` of a chunk.
  pub fn new(x: usize, y: usize, voxel_size: f32) -> Self {
    Self {
      fill: EMPTY,
      material: Material::default(),
      x_crossing: None,
      y_crossing: None,
      position: Vec2::new((x as f32 + 0.5) * voxel_size, (y as f32 + 0.5) * voxel_size),
    }
  }

  #[inline]
  pub fn is_filled(&self) -> bool {
    self.fill != EMPTY
  }

  /// Reset fill, material and crossings, keeping the position.
  pub fn reset(&mut self) {
    self.fill = EMPTY;
    self.material = Material::default();
    self.x_crossing = None;
    self.y_crossing = None;
  }

  /// Copy of this voxel shifted by `offset`, used to read one voxel deep
  /// into a neighboring chunk.
  #[inline]
  pub fn dummy(&self, offset: Vec2) -> Voxel {
    Voxel {
      position: self.position + offset,
      ..*self
    }
  }

  /// Point on the +X edge, falling back to the midpoint without a crossing.
  #[inline]
  pub fn x_edge_point(&self, voxel_size: f32) -> Vec2 {
    let t = self.x_crossing.map_or(0.5, |c| c.t);
    self.position + Vec2::new(t * voxel_size, 0.0)
  }

  /// Point on the +Y edge, falling back to the midpoint without a crossing.
  #[inline]
  pub fn y_edge_point(&self, voxel_size: f32) -> Vec2 {
    let t = self.y_crossing.map_or(0.5, |c| c.t);
    self.position + Vec2::new(0.0, t * voxel_size)
  }

  /// Stored-orientation normal of the +X edge towards `next`.
  pub fn x_edge_normal(&self, next: &Voxel) -> Vec2 {
    match self.x_crossing {
      Some(c) => c.normal,
      None => axis_normal(Vec2::X, self.fill, next.fill),
    }
  }

  /// Stored-orientation normal of the +Y edge towards `next`.
  pub fn y_edge_normal(&self, next: &Voxel) -> Vec2 {
    match self.y_crossing {
      Some(c) => c.normal,
      None => axis_normal(Vec2::Y, self.fill, next.fill),
    }
  }
}

/// Axis-aligned stored normal for an edge without crossing data.
fn axis_normal(axis: Vec2, first_fill: u8, second_fill: u8) -> Vec2 {
  if first_fill > second_fill {
    axis
  } else {
    -axis
  }
}

#[cfg(test)]
#[path = "voxel_test.rs"]
mod voxel_test;
