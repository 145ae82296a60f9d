//! Boundary edge-loops and their cross-chunk sync records.

use glam::Vec2;

use crate::constants::HASH_STEPS_PER_VOXEL;

/// Quantized world position of a loop endpoint.
///
/// Two 32-bit fixed-point coordinates at 1/4096 voxel packed into one key.
/// Endpoints produced by neighboring chunks for the same edge crossing hash
/// identically.
pub type BoundaryHash = u64;

pub fn boundary_hash(world: Vec2, voxel_size: f32) -> BoundaryHash {
  let scale = HASH_STEPS_PER_VOXEL / voxel_size;
  let qx = (world.x * scale).round() as i32 as u32;
  let qy = (world.y * scale).round() as i32 as u32;
  (qx as u64) << 32 | qy as u64
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopPoint {
  /// World position.
  pub position: Vec2,
  /// Outward unit normal, interpolated between adjacent segments.
  pub normal: Vec2,
  /// Arc length from the first point.
  pub distance: f32,
}

/// Ordered boundary contour. Filled space lies to the left of the
/// direction of travel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeLoop {
  pub points: Vec<LoopPoint>,
  /// The last point connects back to the first.
  pub closed: bool,
}

/// Points closer than this are the same loop point.
#[inline]
pub(crate) fn same_point(p: Vec2, q: Vec2) -> bool {
  p.distance_squared(q) <= f32::EPSILON * f32::EPSILON
}

#[inline]
fn segment_normal(from: Vec2, to: Vec2) -> Vec2 {
  let dir = (to - from).normalize_or_zero();
  Vec2::new(dir.y, -dir.x)
}

impl EdgeLoop {
  /// Build a loop from world positions. Consecutive duplicates are dropped.
  pub fn from_positions(positions: &[Vec2], closed: bool) -> Self {
    let mut unique: Vec<Vec2> = Vec::with_capacity(positions.len());
    for &p in positions {
      if unique.last().map_or(true, |&q| !same_point(q, p)) {
        unique.push(p);
      }
    }
    let n = unique.len();
    let closed = closed && n > 2;

    let mut points = Vec::with_capacity(n);
    let mut distance = 0.0;
    for k in 0..n {
      if k > 0 {
        distance += unique[k - 1].distance(unique[k]);
      }
      let prev = if k > 0 {
        Some(segment_normal(unique[k - 1], unique[k]))
      } else if closed {
        Some(segment_normal(unique[n - 1], unique[0]))
      } else {
        None
      };
      let next = if k + 1 < n {
        Some(segment_normal(unique[k], unique[k + 1]))
      } else if closed {
        Some(segment_normal(unique[n - 1], unique[0]))
      } else {
        None
      };
      let normal = match (prev, next) {
        (Some(p), Some(q)) => (p + q).try_normalize().unwrap_or(q),
        (Some(p), None) => p,
        (None, Some(q)) => q,
        (None, None) => Vec2::ZERO,
      };
      points.push(LoopPoint {
        position: unique[k],
        normal,
        distance,
      });
    }
    Self { points, closed }
  }

  /// Total arc length, including the closing segment of closed loops.
  pub fn length(&self) -> f32 {
    let open = self.points.last().map_or(0.0, |p| p.distance);
    match (self.closed, self.points.first(), self.points.last()) {
      (true, Some(first), Some(last)) => open + last.position.distance(first.position),
      _ => open,
    }
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

/// Summary of one chunk-local loop fragment used for stitching.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSync {
  pub head: BoundaryHash,
  pub tail: BoundaryHash,
  /// Arc length of the fragment.
  pub length: f32,
  pub closed: bool,
  pub point_count: usize,
  /// Index of the loop within its builder.
  pub fragment: usize,
}

impl EdgeSync {
  pub fn new(edge_loop: &EdgeLoop, fragment: usize, voxel_size: f32) -> Self {
    let hash = |p: Option<&LoopPoint>| p.map_or(0, |p| boundary_hash(p.position, voxel_size));
    let head = hash(edge_loop.points.first());
    let tail = if edge_loop.closed {
      head
    } else {
      hash(edge_loop.points.last())
    };
    Self {
      head,
      tail,
      length: edge_loop.length(),
      closed: edge_loop.closed,
      point_count: edge_loop.points.len(),
      fragment,
    }
  }
}

#[cfg(test)]
#[path = "edge_loop_test.rs"]
mod edge_loop_test;
