//! Shape edits: which voxels change fill, crossing and material.
//!
//! An edit runs in three passes over the chunks it touches:
//!
//! ```text
//!   fill      voxels whose center lies inside the shape take the fill id
//!   crossing  edges with exactly one endpoint inside get the shape boundary
//!   material  filled voxels inside the shape are painted
//! ```
//!
//! The crossing pass also covers a one-voxel halo on the negative side,
//! since a voxel owns the crossings towards its +X and +Y neighbors.
//!
//! Crossings follow a union rule: when an edge already carries a crossing,
//! the one that leaves the filled side larger wins. The kept crossing's
//! normal is re-oriented for the current pair of fill ids.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::chunk::NeighborBorders;
use crate::constants::voxel_index;
use crate::material::{paint, MaterialMode, MaterialPaint};
use crate::types::Rect2;
use crate::voxel::{Crossing, Voxel, EMPTY};

// =============================================================================
// Shapes
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
  Box { center: Vec2, half_size: Vec2 },
  Circle { center: Vec2, radius: f32 },
  /// Vertices are stored counter-clockwise.
  Triangle { vertices: [Vec2; 3] },
}

impl Shape {
  pub fn rect(center: Vec2, half_size: Vec2) -> Self {
    Shape::Box {
      center,
      half_size: half_size.abs(),
    }
  }

  pub fn circle(center: Vec2, radius: f32) -> Self {
    Shape::Circle {
      center,
      radius: radius.abs(),
    }
  }

  pub fn triangle(a: Vec2, b: Vec2, c: Vec2) -> Self {
    let vertices = if (b - a).perp_dot(c - a) < 0.0 {
      [a, c, b]
    } else {
      [a, b, c]
    };
    Shape::Triangle { vertices }
  }

  pub fn bounds(&self) -> Rect2 {
    match *self {
      Shape::Box { center, half_size } => Rect2::new(center - half_size, center + half_size),
      Shape::Circle { center, radius } => {
        Rect2::new(center - Vec2::splat(radius), center + Vec2::splat(radius))
      }
      Shape::Triangle { vertices: [a, b, c] } => Rect2::new(a.min(b).min(c), a.max(b).max(c)),
    }
  }

  pub fn contains(&self, p: Vec2) -> bool {
    match *self {
      Shape::Box { center, half_size } => {
        let d = (p - center).abs();
        d.x <= half_size.x && d.y <= half_size.y
      }
      Shape::Circle { center, radius } => p.distance_squared(center) <= radius * radius,
      Shape::Triangle { vertices } => triangle_edges(&vertices)
        .iter()
        .all(|&(v0, n)| n.dot(p - v0) <= 0.0),
    }
  }

  /// Where the segment from `inside` to `outside` leaves the shape, as a
  /// fraction of the segment, plus the outward boundary normal there.
  pub fn exit(&self, inside: Vec2, outside: Vec2) -> (f32, Vec2) {
    let dir = outside - inside;
    let fallback = dir.normalize_or(Vec2::X);
    let (t, normal) = match *self {
      Shape::Box { center, half_size } => {
        let mut best = (1.0, fallback);
        for (axis, unit) in [(0, Vec2::X), (1, Vec2::Y)] {
          let (t, n) = if dir[axis] > 0.0 {
            ((center[axis] + half_size[axis] - inside[axis]) / dir[axis], unit)
          } else if dir[axis] < 0.0 {
            ((center[axis] - half_size[axis] - inside[axis]) / dir[axis], -unit)
          } else {
            continue;
          };
          if t < best.0 {
            best = (t, n);
          }
        }
        best
      }
      Shape::Circle { center, radius } => {
        let m = inside - center;
        let a = dir.dot(dir);
        if a <= f32::EPSILON {
          (0.0, fallback)
        } else {
          let b = 2.0 * m.dot(dir);
          let c = m.dot(m) - radius * radius;
          let disc = (b * b - 4.0 * a * c).max(0.0);
          let t = (-b + disc.sqrt()) / (2.0 * a);
          let hit = inside + dir * t;
          (t, (hit - center).normalize_or(fallback))
        }
      }
      Shape::Triangle { vertices } => {
        let mut best = (1.0, fallback);
        for (v0, n) in triangle_edges(&vertices) {
          let rate = n.dot(dir);
          if rate <= 0.0 {
            continue;
          }
          let t = -n.dot(inside - v0) / rate;
          if t < best.0 {
            best = (t, n);
          }
        }
        best
      }
    };
    (t.clamp(0.0, 1.0), normal)
  }
}

/// Edge origins and outward normals of a counter-clockwise triangle.
fn triangle_edges(v: &[Vec2; 3]) -> [(Vec2, Vec2); 3] {
  let edge = |p: Vec2, q: Vec2| {
    let e = (q - p).normalize_or_zero();
    (p, Vec2::new(e.y, -e.x))
  };
  [edge(v[0], v[1]), edge(v[1], v[2]), edge(v[2], v[0])]
}

// =============================================================================
// Stencil
// =============================================================================

/// A shape writing one fill id, optionally painting a material.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stencil {
  pub shape: Shape,
  /// Fill id written inside the shape; [`EMPTY`] erases.
  pub fill: u8,
  pub paint: Option<MaterialPaint>,
}

impl Stencil {
  pub fn new(shape: Shape, fill: u8) -> Self {
    Self {
      shape,
      fill,
      paint: None,
    }
  }

  pub fn erase(shape: Shape) -> Self {
    Self::new(shape, EMPTY)
  }

  pub fn with_paint(mut self, paint: MaterialPaint) -> Self {
    self.paint = Some(paint);
    self
  }
}

// =============================================================================
// Affected ranges
// =============================================================================

/// Inclusive rectangle of chunk-local voxel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelRange {
  pub min: [usize; 2],
  pub max: [usize; 2],
}

impl VoxelRange {
  pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> {
    let [x0, y0] = self.min;
    let [x1, y1] = self.max;
    (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
  }

  pub fn contains(&self, x: usize, y: usize) -> bool {
    (self.min[0]..=self.max[0]).contains(&x) && (self.min[1]..=self.max[1]).contains(&y)
  }
}

/// Voxel ranges of one chunk touched by a stencil.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffectedChunk {
  pub chunk: usize,
  /// Voxels whose fill and material may change.
  pub fill: Option<VoxelRange>,
  /// Voxels whose crossings may change, including the halo.
  pub crossing: VoxelRange,
}

/// Chunks touched by `bounds`, with clamped chunk-local voxel ranges.
///
/// Chunks are indexed row-major, `chunk_resolution` per side, each holding
/// `voxel_resolution` voxels per side.
pub fn affected_chunks(
  bounds: Rect2,
  voxel_size: f32,
  voxel_resolution: usize,
  chunk_resolution: usize,
) -> Vec<AffectedChunk> {
  let total = (voxel_resolution * chunk_resolution) as i64;
  // Voxel centers sit at (i + 0.5) * voxel_size.
  let first = |v: f32| (v / voxel_size - 0.5).ceil() as i64;
  let last = |v: f32| (v / voxel_size - 0.5).floor() as i64;
  let fx = (first(bounds.min.x).max(0), last(bounds.max.x).min(total - 1));
  let fy = (first(bounds.min.y).max(0), last(bounds.max.y).min(total - 1));
  if fx.0 > fx.1 || fy.0 > fy.1 {
    return Vec::new();
  }
  let cx = ((fx.0 - 1).max(0), fx.1);
  let cy = ((fy.0 - 1).max(0), fy.1);

  let res = voxel_resolution as i64;
  let clip = |span: (i64, i64), chunk: i64| -> Option<[usize; 2]> {
    let lo = span.0.max(chunk * res);
    let hi = span.1.min(chunk * res + res - 1);
    (lo <= hi).then(|| [(lo - chunk * res) as usize, (hi - chunk * res) as usize])
  };

  let mut out = Vec::new();
  for chunk_y in cy.0 / res..=cy.1 / res {
    for chunk_x in cx.0 / res..=cx.1 / res {
      let (Some(crossing_x), Some(crossing_y)) = (clip(cx, chunk_x), clip(cy, chunk_y)) else {
        continue;
      };
      let fill = match (clip(fx, chunk_x), clip(fy, chunk_y)) {
        (Some(x), Some(y)) => Some(VoxelRange {
          min: [x[0], y[0]],
          max: [x[1], y[1]],
        }),
        _ => None,
      };
      out.push(AffectedChunk {
        chunk: chunk_y as usize * chunk_resolution + chunk_x as usize,
        fill,
        crossing: VoxelRange {
          min: [crossing_x[0], crossing_y[0]],
          max: [crossing_x[1], crossing_y[1]],
        },
      });
    }
  }
  out
}

// =============================================================================
// Passes
// =============================================================================

/// Write the stencil's fill id into voxels inside the shape. Returns how
/// many voxels changed.
pub fn fill_pass(
  voxels: &mut [Voxel],
  resolution: usize,
  origin: Vec2,
  range: VoxelRange,
  stencil: &Stencil,
) -> usize {
  let mut changed = 0;
  for (x, y) in range.iter() {
    let voxel = &mut voxels[voxel_index(x, y, resolution)];
    if voxel.fill != stencil.fill && stencil.shape.contains(origin + voxel.position) {
      voxel.fill = stencil.fill;
      changed += 1;
    }
  }
  changed
}

/// Recompute the crossings owned by voxels in `range`.
///
/// Edges leaving the chunk read the neighbor's first column / row from
/// `borders`; without a neighbor the edge is left alone.
pub fn crossing_pass(
  voxels: &mut [Voxel],
  resolution: usize,
  chunk_size: f32,
  origin: Vec2,
  range: VoxelRange,
  borders: &NeighborBorders,
  stencil: &Stencil,
) {
  for (x, y) in range.iter() {
    let index = voxel_index(x, y, resolution);
    let next_x = if x + 1 < resolution {
      Some(voxels[index + 1])
    } else {
      borders
        .x
        .as_ref()
        .and_then(|column| column.get(y))
        .map(|v| v.dummy(Vec2::new(chunk_size, 0.0)))
    };
    let next_y = if y + 1 < resolution {
      Some(voxels[voxel_index(x, y + 1, resolution)])
    } else {
      borders
        .y
        .as_ref()
        .and_then(|row| row.get(x))
        .map(|v| v.dummy(Vec2::new(0.0, chunk_size)))
    };

    let voxel = voxels[index];
    if let Some(next) = next_x {
      let crossing = update_crossing(voxel.x_crossing, &voxel, &next, origin, Vec2::X, stencil);
      voxels[index].x_crossing = crossing;
    }
    if let Some(next) = next_y {
      let crossing = update_crossing(voxel.y_crossing, &voxel, &next, origin, Vec2::Y, stencil);
      voxels[index].y_crossing = crossing;
    }
  }
}

fn update_crossing(
  current: Option<Crossing>,
  first: &Voxel,
  second: &Voxel,
  origin: Vec2,
  axis: Vec2,
  stencil: &Stencil,
) -> Option<Crossing> {
  if first.fill == second.fill {
    return None;
  }
  let revalidate = |c: Crossing| Crossing::oriented(c.t, c.normal, axis, first.fill, second.fill);

  let p0 = origin + first.position;
  let p1 = origin + second.position;
  let (in0, in1) = (stencil.shape.contains(p0), stencil.shape.contains(p1));
  if in0 == in1 {
    return current.map(revalidate);
  }

  let (t, normal) = if in0 {
    stencil.shape.exit(p0, p1)
  } else {
    let (t, normal) = stencil.shape.exit(p1, p0);
    (1.0 - t, normal)
  };
  // Union: keep whichever crossing lies farther from the painted side.
  let keep = match current {
    Some(c) if in0 => c.t >= t,
    Some(c) => c.t <= t,
    None => false,
  };
  match current {
    Some(c) if keep => Some(revalidate(c)),
    _ => Some(Crossing::oriented(t, normal, axis, first.fill, second.fill)),
  }
}

/// Paint the stencil material into filled voxels inside the shape.
pub fn material_pass(
  voxels: &mut [Voxel],
  resolution: usize,
  origin: Vec2,
  range: VoxelRange,
  stencil: &Stencil,
  mode: MaterialMode,
) {
  let Some(material) = stencil.paint.as_ref() else {
    return;
  };
  for (x, y) in range.iter() {
    let voxel = &mut voxels[voxel_index(x, y, resolution)];
    if voxel.fill == stencil.fill && stencil.shape.contains(origin + voxel.position) {
      voxel.material = paint(&voxel.material, material, mode);
    }
  }
}

#[cfg(test)]
#[path = "stencil_test.rs"]
mod stencil_test;
