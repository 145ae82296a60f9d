//! Core output types shared by the surface builder, chunks and the grid.

use glam::Vec2;

use crate::material::Material;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// 2D world rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect2 {
  pub min: Vec2,
  pub max: Vec2,
}

impl Rect2 {
  pub fn new(min: Vec2, max: Vec2) -> Self {
    Self { min, max }
  }

  pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
    Self {
      min: origin,
      max: origin + size,
    }
  }

  #[inline]
  pub fn contains(&self, p: Vec2) -> bool {
    p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
  }

  pub fn overlaps(&self, other: &Rect2) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
  }

  pub fn size(&self) -> Vec2 {
    self.max - self.min
  }
}

/// One triangle mesh stream: cap, extrusion or rim.
///
/// All attribute vectors are parallel to `positions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffer {
  pub positions: Vec<[f32; 3]>,
  pub uvs: Vec<[f32; 2]>,
  pub materials: Vec<Material>,
  /// Packed per-vertex data, see the builder for the per-stream layout.
  pub tangents: Vec<[f32; 4]>,
  /// Triangle indices (3 per triangle, counter-clockwise seen from +Z for
  /// the cap).
  pub indices: Vec<u32>,
  pub bounds: MinMaxAABB,
}

impl MeshBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.positions.clear();
    self.uvs.clear();
    self.materials.clear();
    self.tangents.clear();
    self.indices.clear();
    self.bounds = MinMaxAABB::empty();
  }

  /// Append a vertex and return its index.
  #[inline]
  pub fn push_vertex(
    &mut self,
    position: [f32; 3],
    uv: [f32; 2],
    material: Material,
    tangent: [f32; 4],
  ) -> u32 {
    let index = self.positions.len() as u32;
    self.positions.push(position);
    self.uvs.push(uv);
    self.materials.push(material);
    self.tangents.push(tangent);
    self.bounds.encapsulate(position);
    index
  }

  #[inline]
  pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
    self.indices.extend_from_slice(&[a, b, c]);
  }

  /// Two triangles `a b c` and `a c d`.
  #[inline]
  pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
    self.indices.extend_from_slice(&[a, b, c, a, c, d]);
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Signed area of triangle `t` projected onto the XY plane.
  pub fn triangle_area_xy(&self, t: usize) -> f32 {
    let p = |k: usize| {
      let v = self.positions[self.indices[t * 3 + k] as usize];
      Vec2::new(v[0], v[1])
    };
    let (a, b, c) = (p(0), p(1), p(2));
    0.5 * (b - a).perp_dot(c - a)
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
