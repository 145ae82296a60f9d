//! Row cache of shared vertex indices.
//!
//! ```text
//!   corners_max[i] ── x_edges_max[i] ── corners_max[i+1]     row y + 1
//!        │                                    │
//!    y_edge_min            cell i         y_edge_max
//!        │                                    │
//!   corners_min[i] ── x_edges_min[i] ── corners_min[i+1]     row y
//! ```
//!
//! The "max" arrays are filled for the upper row while a row of cells is
//! swept, then swapped into "min" for the next row.

pub const NO_VERTEX: u32 = u32::MAX;

#[derive(Clone, Debug, Default)]
pub struct VertexCache {
  pub corners_min: Vec<u32>,
  pub corners_max: Vec<u32>,
  pub x_edges_min: Vec<u32>,
  pub x_edges_max: Vec<u32>,
  pub y_edge_min: u32,
  pub y_edge_max: u32,
}

impl VertexCache {
  /// Size the cache for rows of `corners` voxels and invalidate everything.
  pub fn reset(&mut self, corners: usize) {
    for row in [
      &mut self.corners_min,
      &mut self.corners_max,
      &mut self.x_edges_min,
      &mut self.x_edges_max,
    ] {
      row.clear();
      row.resize(corners, NO_VERTEX);
    }
    self.y_edge_min = NO_VERTEX;
    self.y_edge_max = NO_VERTEX;
  }

  /// Move the upper row down and clear it for the next one.
  pub fn prepare_next_row(&mut self) {
    std::mem::swap(&mut self.corners_min, &mut self.corners_max);
    std::mem::swap(&mut self.x_edges_min, &mut self.x_edges_max);
    self.corners_max.fill(NO_VERTEX);
    self.x_edges_max.fill(NO_VERTEX);
    self.y_edge_min = NO_VERTEX;
    self.y_edge_max = NO_VERTEX;
  }

  /// Shift the right y-edge of the previous cell into the left slot.
  #[inline]
  pub fn prepare_next_cell(&mut self, right_edge: u32) {
    self.y_edge_min = self.y_edge_max;
    self.y_edge_max = right_edge;
  }
}
