//! 2×2 voxel window: case classification, sharp features and saddle topology.
//!
//! # Case Classification
//!
//! Per layer, a cell is keyed by which corners carry the layer's fill id:
//!
//! ```text
//!   bit 0 = a   bit 1 = b   bit 2 = c   bit 3 = d
//!
//!   c ── top ── d
//!   │           │
//!  left       right
//!   │           │
//!   a ─ bottom ─ b
//! ```
//!
//! # Feature Points
//!
//! Two crossings bounding a corner define two tangent lines. When the angle
//! between the walls is tight enough the contour gets an extra vertex at the
//! intersection of those lines:
//!
//! ```text
//!   sharp  ⇔  sharp_threshold <= dot(n1, -n2) < 0.999
//!   solve     n1 · q = n1 · p1
//!             n2 · q = n2 · p2
//! ```
//!
//! Solutions outside the cell are rejected.
//!
//! # Saddles
//!
//! When one diagonal pair shares an id the other pair lacks, the cell is
//! ambiguous. [`Cell::topology`] resolves it once for every layer:
//!
//! 1. a corner cut whose two normals are parallel is a straight wall; a
//!    straight cut around an off-diagonal corner connects the diagonal, a
//!    straight cut around an on-diagonal corner isolates it
//! 2. otherwise each off-diagonal cut's candidate point must lie beyond the
//!    other cut's contour
//! 3. otherwise the higher fill id connects
//!
//! Cells with three or more ids and no connecting diagonal get a junction:
//! the average of their edge crossings, shared by every layer's fan.

use glam::Vec2;
use smallvec::SmallVec;

use crate::constants::{FEATURE_BOUNDS_EPSILON, FEATURE_DOT_LIMIT};
use crate::material::Material;
use crate::voxel::Voxel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
  A,
  B,
  C,
  D,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
  Bottom,
  Top,
  Left,
  Right,
}

impl Edge {
  pub const ALL: [Edge; 4] = [Edge::Bottom, Edge::Right, Edge::Top, Edge::Left];
}

impl Corner {
  /// The two edges meeting at this corner.
  pub fn edges(self) -> (Edge, Edge) {
    match self {
      Corner::A => (Edge::Bottom, Edge::Left),
      Corner::B => (Edge::Bottom, Edge::Right),
      Corner::C => (Edge::Left, Edge::Top),
      Corner::D => (Edge::Right, Edge::Top),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Diagonal {
  /// Bottom-left to top-right.
  AD,
  /// Bottom-right to top-left.
  BC,
}

/// Marching-squares configuration of one layer in one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellCase {
  Empty,
  A,
  B,
  AB,
  C,
  AC,
  BC,
  ABC,
  D,
  AD,
  BD,
  ABD,
  CD,
  ACD,
  BCD,
  Full,
}

impl CellCase {
  const TABLE: [CellCase; 16] = [
    CellCase::Empty,
    CellCase::A,
    CellCase::B,
    CellCase::AB,
    CellCase::C,
    CellCase::AC,
    CellCase::BC,
    CellCase::ABC,
    CellCase::D,
    CellCase::AD,
    CellCase::BD,
    CellCase::ABD,
    CellCase::CD,
    CellCase::ACD,
    CellCase::BCD,
    CellCase::Full,
  ];

  #[inline]
  pub fn from_mask(mask: u8) -> Self {
    Self::TABLE[(mask & 0xf) as usize]
  }

  #[inline]
  pub fn mask(self) -> u8 {
    self as u8
  }
}

/// Solved point inside a cell together with the material it carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeaturePoint {
  pub position: Vec2,
  pub material: Material,
}

impl FeaturePoint {
  pub fn new(position: Vec2, material: Material) -> Self {
    Self { position, material }
  }
}

/// Saddle and junction resolution shared by every layer of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellTopology {
  /// Diagonal whose corners are joined through the cell center.
  pub connection: Option<Diagonal>,
  /// Meeting point of three or more regions.
  pub junction: Option<Vec2>,
}

/// Four corner voxels plus the thresholds used for feature solving.
#[derive(Clone, Copy, Debug)]
pub struct Cell<'a> {
  pub a: &'a Voxel,
  pub b: &'a Voxel,
  pub c: &'a Voxel,
  pub d: &'a Voxel,
  /// Column of the cell within its row.
  pub index: usize,
  pub voxel_size: f32,
  /// Cosine of the maximum feature angle.
  pub sharp_threshold: f32,
  /// Cosine of the maximum parallel angle.
  pub parallel_threshold: f32,
}

impl<'a> Cell<'a> {
  #[inline]
  pub fn corner(&self, corner: Corner) -> &'a Voxel {
    match corner {
      Corner::A => self.a,
      Corner::B => self.b,
      Corner::C => self.c,
      Corner::D => self.d,
    }
  }

  /// Case of the layer holding `fill`.
  pub fn case(&self, fill: u8) -> CellCase {
    let mask = (self.a.fill == fill) as u8
      | ((self.b.fill == fill) as u8) << 1
      | ((self.c.fill == fill) as u8) << 2
      | ((self.d.fill == fill) as u8) << 3;
    CellCase::from_mask(mask)
  }

  #[inline]
  pub fn is_uniform(&self) -> bool {
    let f = self.a.fill;
    self.b.fill == f && self.c.fill == f && self.d.fill == f
  }

  pub fn distinct_fills(&self) -> usize {
    let mut seen: SmallVec<[u8; 4]> = SmallVec::new();
    for v in [self.a, self.b, self.c, self.d] {
      if !seen.contains(&v.fill) {
        seen.push(v.fill);
      }
    }
    seen.len()
  }

  /// Voxels on an edge, in +X / +Y order.
  #[inline]
  pub fn edge_voxels(&self, edge: Edge) -> (&'a Voxel, &'a Voxel) {
    match edge {
      Edge::Bottom => (self.a, self.b),
      Edge::Top => (self.c, self.d),
      Edge::Left => (self.a, self.c),
      Edge::Right => (self.b, self.d),
    }
  }

  #[inline]
  pub fn has_crossing(&self, edge: Edge) -> bool {
    let (first, second) = self.edge_voxels(edge);
    first.fill != second.fill
  }

  pub fn edge_point(&self, edge: Edge) -> Vec2 {
    match edge {
      Edge::Bottom => self.a.x_edge_point(self.voxel_size),
      Edge::Top => self.c.x_edge_point(self.voxel_size),
      Edge::Left => self.a.y_edge_point(self.voxel_size),
      Edge::Right => self.b.y_edge_point(self.voxel_size),
    }
  }

  /// Crossing normal of `edge`, pointing away from the voxel at `from`.
  pub fn edge_normal_from(&self, edge: Edge, from: Corner) -> Vec2 {
    let (first, second) = self.edge_voxels(edge);
    let stored = match edge {
      Edge::Bottom | Edge::Top => first.x_edge_normal(second),
      Edge::Left | Edge::Right => first.y_edge_normal(second),
    };
    let from_first = matches!(
      (edge, from),
      (Edge::Bottom, Corner::A) | (Edge::Top, Corner::C) | (Edge::Left, Corner::A) | (Edge::Right, Corner::B)
    );
    let (own, other) = if from_first { (first, second) } else { (second, first) };
    if own.fill > other.fill {
      stored
    } else {
      -stored
    }
  }

  /// Intersection of the tangent lines of two crossings, if it lies inside
  /// the cell. No sharpness test.
  pub fn solve_tangents(&self, p1: Vec2, n1: Vec2, p2: Vec2, n2: Vec2) -> Option<Vec2> {
    let det = n1.perp_dot(n2);
    if det.abs() < f32::EPSILON {
      return None;
    }
    let d1 = n1.dot(p1);
    let d2 = n2.dot(p2);
    let q = Vec2::new((d1 * n2.y - d2 * n1.y) / det, (n1.x * d2 - n2.x * d1) / det);
    // Points within the tolerance band are snapped onto the cell.
    self
      .contains(q)
      .then(|| q.clamp(self.a.position, self.d.position))
  }

  /// Sharp feature between two crossings whose normals point out of the
  /// same region.
  pub fn feature(&self, e1: Edge, from1: Corner, e2: Edge, from2: Corner) -> Option<Vec2> {
    let n1 = self.edge_normal_from(e1, from1);
    let n2 = self.edge_normal_from(e2, from2);
    let dot = n1.dot(-n2);
    if dot < self.sharp_threshold || dot >= FEATURE_DOT_LIMIT {
      return None;
    }
    self.solve_tangents(self.edge_point(e1), n1, self.edge_point(e2), n2)
  }

  /// Sharp feature of the contour cutting off `corner`.
  pub fn corner_feature(&self, corner: Corner) -> Option<Vec2> {
    let (e1, e2) = corner.edges();
    self.feature(e1, corner, e2, corner)
  }

  /// Tangent intersection around `corner`, sharp or not.
  fn cut_candidate(&self, corner: Corner) -> Option<Vec2> {
    let (e1, e2) = corner.edges();
    self.solve_tangents(
      self.edge_point(e1),
      self.edge_normal_from(e1, corner),
      self.edge_point(e2),
      self.edge_normal_from(e2, corner),
    )
  }

  /// Whether the contour around `corner` is a straight wall.
  fn cut_is_straight(&self, corner: Corner) -> bool {
    let (e1, e2) = corner.edges();
    let n1 = self.edge_normal_from(e1, corner);
    let n2 = self.edge_normal_from(e2, corner);
    n1.dot(n2) > self.parallel_threshold
  }

  /// Whether `p` lies on the far side of the contour around `corner`.
  fn beyond_cut(&self, p: Vec2, corner: Corner, tip: Vec2) -> bool {
    let (e1, e2) = corner.edges();
    let origin = self.corner(corner).position;
    [(self.edge_point(e1), tip), (tip, self.edge_point(e2))]
      .iter()
      .all(|&(s, e)| {
        let dir = e - s;
        dir.perp_dot(p - s) * dir.perp_dot(origin - s) < 0.0
      })
  }

  fn contains(&self, q: Vec2) -> bool {
    let eps = FEATURE_BOUNDS_EPSILON * self.voxel_size;
    let min = self.a.position - Vec2::splat(eps);
    let max = self.d.position + Vec2::splat(eps);
    q.x >= min.x && q.y >= min.y && q.x <= max.x && q.y <= max.y
  }

  /// Resolve saddle connectivity and the junction point.
  pub fn topology(&self) -> CellTopology {
    if self.is_uniform() {
      return CellTopology::default();
    }
    let (a, b, c, d) = (self.a.fill, self.b.fill, self.c.fill, self.d.fill);
    let connection = if a == d && b != a && c != a {
      self.resolve(Diagonal::AD)
    } else if b == c && a != b && d != b {
      self.resolve(Diagonal::BC)
    } else {
      None
    };

    let junction = if connection.is_none() && self.distinct_fills() >= 3 {
      let mut sum = Vec2::ZERO;
      let mut count = 0;
      for edge in Edge::ALL {
        if self.has_crossing(edge) {
          sum += self.edge_point(edge);
          count += 1;
        }
      }
      (count > 0).then(|| sum / count as f32)
    } else {
      None
    };

    CellTopology {
      connection,
      junction,
    }
  }

  fn resolve(&self, diagonal: Diagonal) -> Option<Diagonal> {
    let (on, off, other) = match diagonal {
      Diagonal::AD => ([Corner::A, Corner::D], [Corner::B, Corner::C], Diagonal::BC),
      Diagonal::BC => ([Corner::B, Corner::C], [Corner::A, Corner::D], Diagonal::AD),
    };
    let off_pair_equal = self.corner(off[0]).fill == self.corner(off[1]).fill;

    let connected = if off.iter().any(|&k| self.cut_is_straight(k)) {
      true
    } else if on.iter().any(|&k| self.cut_is_straight(k)) {
      false
    } else if let (Some(f0), Some(f1)) = (self.cut_candidate(off[0]), self.cut_candidate(off[1])) {
      self.beyond_cut(f0, off[1], f1) && self.beyond_cut(f1, off[0], f0)
    } else if off_pair_equal {
      self.corner(on[0]).fill > self.corner(off[0]).fill
    } else {
      true
    };

    match (connected, off_pair_equal) {
      (true, _) => Some(diagonal),
      (false, true) => Some(other),
      (false, false) => None,
    }
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
