//! Polygon emission for the sixteen cell cases.
//!
//! Every polygon is counter-clockwise. Polygons with a solved point are
//! fanned from that point, the others from their first vertex. `X` below is the cell junction when there is one, otherwise the solved
//! feature point of that cut (omitted when the cut is not sharp).
//!
//! ```text
//!   A     A, bottom, X, left              AB   A, B, right, X, left
//!   B     B, right, X, bottom             AC   A, bottom, X, top, C
//!   C     C, left, X, top                 BD   B, D, top, X, bottom
//!   D     D, top, X, right                CD   C, left, X, right, D
//!
//!   ABC   A, B, right, X(d), top, C       ABD  B, D, top, X(c), left, A
//!   ACD   C, A, bottom, X(b), right, D    BCD  D, C, left, X(a), bottom, B
//! ```

use glam::Vec2;
use smallvec::SmallVec;

use super::SurfaceBuilder;
use crate::cell::{Cell, CellCase, CellTopology, Corner, Diagonal, Edge};
use crate::material::Material;

/// Polygon vertex: a mesh index plus whether it sits on a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolyVertex {
  pub index: u32,
  /// Corner vertices never bound a wall.
  pub corner: bool,
}

type Polygon = SmallVec<[PolyVertex; 6]>;

/// One entry of a polygon template.
#[derive(Clone, Copy)]
enum Slot {
  Corner(Corner),
  Edge(Edge),
  /// Feature point or junction, solved per polygon.
  Point(Option<Vec2>),
}

/// Feature of the cut around `corner` in a saddle joined along `from`-`to`.
/// A feature across that diagonal would fold the pentagon, so it is dropped.
fn cut_feature(cell: &Cell, corner: Corner, from: Corner, to: Corner) -> Option<Vec2> {
  let origin = cell.corner(from).position;
  let diagonal = cell.corner(to).position - origin;
  let side = diagonal.perp_dot(cell.corner(corner).position - origin);
  cell
    .corner_feature(corner)
    .filter(|&p| diagonal.perp_dot(p - origin) * side > 0.0)
}

impl SurfaceBuilder {
  /// Emit the polygons of this builder's layer for one cell.
  pub(crate) fn triangulate_cell(&mut self, i: usize, cell: &Cell, topology: &CellTopology) {
    use Corner::*;
    use Edge::*;

    let center = |corner: Corner| topology.junction.or_else(|| cell.corner_feature(corner));
    let side = |e1: Edge, k1: Corner, e2: Edge, k2: Corner| {
      topology.junction.or_else(|| cell.feature(e1, k1, e2, k2))
    };

    match cell.case(self.fill()) {
      CellCase::Empty => {}
      CellCase::Full => {
        self.emit(i, cell.a.material, &[
          Slot::Corner(A),
          Slot::Corner(B),
          Slot::Corner(D),
          Slot::Corner(C),
        ]);
      }

      CellCase::A => self.corner_fan(i, cell, A, center(A)),
      CellCase::B => self.corner_fan(i, cell, B, center(B)),
      CellCase::C => self.corner_fan(i, cell, C, center(C)),
      CellCase::D => self.corner_fan(i, cell, D, center(D)),

      CellCase::AB => {
        let x = side(Left, A, Right, B);
        self.emit(i, cell.a.material, &[
          Slot::Corner(A),
          Slot::Corner(B),
          Slot::Edge(Right),
          Slot::Point(x),
          Slot::Edge(Left),
        ]);
      }
      CellCase::AC => {
        let x = side(Bottom, A, Top, C);
        self.emit(i, cell.a.material, &[
          Slot::Corner(A),
          Slot::Edge(Bottom),
          Slot::Point(x),
          Slot::Edge(Top),
          Slot::Corner(C),
        ]);
      }
      CellCase::BD => {
        let x = side(Bottom, B, Top, D);
        self.emit(i, cell.b.material, &[
          Slot::Corner(B),
          Slot::Corner(D),
          Slot::Edge(Top),
          Slot::Point(x),
          Slot::Edge(Bottom),
        ]);
      }
      CellCase::CD => {
        let x = side(Left, C, Right, D);
        self.emit(i, cell.c.material, &[
          Slot::Corner(C),
          Slot::Edge(Left),
          Slot::Point(x),
          Slot::Edge(Right),
          Slot::Corner(D),
        ]);
      }

      CellCase::ABC => {
        let x = cell.corner_feature(D);
        self.emit(i, cell.a.material, &[
          Slot::Corner(A),
          Slot::Corner(B),
          Slot::Edge(Right),
          Slot::Point(x),
          Slot::Edge(Top),
          Slot::Corner(C),
        ]);
      }
      CellCase::ABD => {
        let x = cell.corner_feature(C);
        self.emit(i, cell.a.material, &[
          Slot::Corner(B),
          Slot::Corner(D),
          Slot::Edge(Top),
          Slot::Point(x),
          Slot::Edge(Left),
          Slot::Corner(A),
        ]);
      }
      CellCase::ACD => {
        let x = cell.corner_feature(B);
        self.emit(i, cell.a.material, &[
          Slot::Corner(C),
          Slot::Corner(A),
          Slot::Edge(Bottom),
          Slot::Point(x),
          Slot::Edge(Right),
          Slot::Corner(D),
        ]);
      }
      CellCase::BCD => {
        let x = cell.corner_feature(A);
        self.emit(i, cell.b.material, &[
          Slot::Corner(D),
          Slot::Corner(C),
          Slot::Edge(Left),
          Slot::Point(x),
          Slot::Edge(Bottom),
          Slot::Corner(B),
        ]);
      }

      CellCase::AD => {
        if topology.connection == Some(Diagonal::AD) {
          self.emit(i, cell.a.material, &[
            Slot::Corner(A),
            Slot::Edge(Bottom),
            Slot::Point(cut_feature(cell, B, A, D)),
            Slot::Edge(Right),
            Slot::Corner(D),
          ]);
          self.emit(i, cell.d.material, &[
            Slot::Corner(D),
            Slot::Edge(Top),
            Slot::Point(cut_feature(cell, C, A, D)),
            Slot::Edge(Left),
            Slot::Corner(A),
          ]);
        } else {
          self.corner_fan(i, cell, A, center(A));
          self.corner_fan(i, cell, D, center(D));
        }
      }
      CellCase::BC => {
        if topology.connection == Some(Diagonal::BC) {
          self.emit(i, cell.b.material, &[
            Slot::Corner(B),
            Slot::Edge(Right),
            Slot::Point(cut_feature(cell, D, B, C)),
            Slot::Edge(Top),
            Slot::Corner(C),
          ]);
          self.emit(i, cell.c.material, &[
            Slot::Corner(C),
            Slot::Edge(Left),
            Slot::Point(cut_feature(cell, A, B, C)),
            Slot::Edge(Bottom),
            Slot::Corner(B),
          ]);
        } else {
          self.corner_fan(i, cell, B, center(B));
          self.corner_fan(i, cell, C, center(C));
        }
      }
    }
  }

  fn corner_fan(&mut self, i: usize, cell: &Cell, corner: Corner, x: Option<Vec2>) {
    let (first, second) = match corner {
      Corner::A => (Edge::Bottom, Edge::Left),
      Corner::B => (Edge::Right, Edge::Bottom),
      Corner::C => (Edge::Left, Edge::Top),
      Corner::D => (Edge::Top, Edge::Right),
    };
    let material = cell.corner(corner).material;
    self.emit(i, material, &[
      Slot::Corner(corner),
      Slot::Edge(first),
      Slot::Point(x),
      Slot::Edge(second),
    ]);
  }

  fn cached_corner(&self, i: usize, corner: Corner) -> u32 {
    match corner {
      Corner::A => self.cache.corners_min[i],
      Corner::B => self.cache.corners_min[i + 1],
      Corner::C => self.cache.corners_max[i],
      Corner::D => self.cache.corners_max[i + 1],
    }
  }

  fn cached_edge(&self, i: usize, edge: Edge) -> u32 {
    match edge {
      Edge::Bottom => self.cache.x_edges_min[i],
      Edge::Top => self.cache.x_edges_max[i],
      Edge::Left => self.cache.y_edge_min,
      Edge::Right => self.cache.y_edge_max,
    }
  }

  /// Resolve a template against the cache and emit it. `material` is used
  /// for solved points.
  fn emit(&mut self, i: usize, material: Material, template: &[Slot]) {
    let mut polygon = Polygon::new();
    let mut apex = 0;
    for slot in template {
      let vertex = match *slot {
        Slot::Corner(k) => PolyVertex {
          index: self.cached_corner(i, k),
          corner: true,
        },
        Slot::Edge(e) => PolyVertex {
          index: self.cached_edge(i, e),
          corner: false,
        },
        Slot::Point(None) => continue,
        Slot::Point(Some(p)) => {
          apex = polygon.len();
          PolyVertex {
            index: self.add_vertex(p, material),
            corner: false,
          }
        }
      };
      polygon.push(vertex);
    }
    // A solved point sees the whole cell boundary, so it fans without
    // inverting even when it is a reflex vertex.
    polygon.rotate_left(apex);
    self.fill_polygon(&polygon);
  }
}
