//! Incremental mesh assembly for one fill layer of one chunk.
//!
//! # Overview
//!
//! The chunk sweeps its cells row by row and hands each cell to every
//! builder. A builder keeps only the vertices of its own layer:
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────┐
//!   │ sweep                                                      │
//!   │   cache_first_corner / cache_next_edge_and_corner  (row)   │
//!   │   cache_next_middle_edge                           (cell)  │
//!   │   triangulate_cell ──► fill_polygon ──► wall edges         │
//!   └────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!   ┌────────────────────────────────────────────────────────────┐
//!   │ finalize                                                   │
//!   │   chains ──► EdgeLoop + EdgeSync                           │
//!   │   walls (extrusion), rim ribbon, per-material sub-meshes   │
//!   └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Buffers
//!
//! - surface: the cap at z = 0, counter-clockwise seen from +Z
//! - extrusion: the cap mirrored to z = -height with reversed winding
//!   (vertex `i` of both buffers is the same point), then wall quads
//! - rim: a ribbon inset from every loop by the layer's rim thickness
//!
//! Packed tangents: cap `[1, 0, 0, -1]`, wall `[dir.x, dir.y, 0, -1]`,
//! rim `[normal.x, normal.y, arc_length, ribbon_fraction]`.

pub mod cache;
pub mod edge_chain;
pub mod edge_loop;
mod polygon;
pub mod sub_mesh;

use std::collections::BTreeMap;
use std::ops::Range;

use glam::Vec2;
use tracing::trace;

use self::cache::{VertexCache, NO_VERTEX};
use self::edge_chain::EdgeChains;
pub use self::edge_loop::{boundary_hash, BoundaryHash, EdgeLoop, EdgeSync, LoopPoint};
pub use self::polygon::PolyVertex;
use crate::config::LayerConfig;
use crate::material::{BlendKey, Material, MaterialMode};
use crate::types::MeshBuffer;
use crate::voxel::Voxel;

pub const CAP_TANGENT: [f32; 4] = [1.0, 0.0, 0.0, -1.0];

/// Twice the signed area, in squared voxels, below which a fan triangle
/// counts as folded.
const FAN_AREA_EPSILON: f32 = 1e-6;

/// Everything a builder needs to know about its layer and chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct BuilderSettings {
  /// Fill id of the layer.
  pub fill: u8,
  pub layer: LayerConfig,
  pub voxel_size: f32,
  pub chunk_size: f32,
  /// World position of the chunk's lower-left corner.
  pub origin: Vec2,
  /// World extent of the grid, for remapped UVs.
  pub grid_size: f32,
  pub extrusion_height: f32,
  pub material_mode: MaterialMode,
}

/// Vertex ranges generated for one loop fragment.
#[derive(Clone, Debug, Default)]
struct FragmentSpan {
  walls: Range<usize>,
  rim: Range<usize>,
  /// U offset currently baked into the span.
  u_offset: f32,
}

/// Loop point in chunk-local space, with the data walls and rims need.
#[derive(Clone, Copy)]
struct Column {
  position: Vec2,
  normal: Vec2,
  distance: f32,
  material: Material,
}

#[derive(Clone, Debug)]
pub struct SurfaceBuilder {
  settings: BuilderSettings,
  cache: VertexCache,
  chains: EdgeChains,
  surface: MeshBuffer,
  extrusion: Option<MeshBuffer>,
  rim: MeshBuffer,
  sub_meshes: BTreeMap<BlendKey, MeshBuffer>,
  loops: Vec<EdgeLoop>,
  syncs: Vec<EdgeSync>,
  spans: Vec<FragmentSpan>,
}

impl SurfaceBuilder {
  pub fn new(settings: BuilderSettings) -> Self {
    let extrusion = settings.layer.extrusion.then(MeshBuffer::new);
    Self {
      settings,
      cache: VertexCache::default(),
      chains: EdgeChains::new(),
      surface: MeshBuffer::new(),
      extrusion,
      rim: MeshBuffer::new(),
      sub_meshes: BTreeMap::new(),
      loops: Vec::new(),
      syncs: Vec::new(),
      spans: Vec::new(),
    }
  }

  #[inline]
  pub fn fill(&self) -> u8 {
    self.settings.fill
  }

  pub fn settings(&self) -> &BuilderSettings {
    &self.settings
  }

  /// Cap at z = 0. Empty after finalize when the layer has no surface.
  pub fn surface(&self) -> &MeshBuffer {
    &self.surface
  }

  /// Back cap and walls, when the layer extrudes.
  pub fn extrusion(&self) -> Option<&MeshBuffer> {
    self.extrusion.as_ref()
  }

  pub fn rim(&self) -> &MeshBuffer {
    &self.rim
  }

  pub fn sub_meshes(&self) -> &BTreeMap<BlendKey, MeshBuffer> {
    &self.sub_meshes
  }

  pub fn loops(&self) -> &[EdgeLoop] {
    &self.loops
  }

  pub fn syncs(&self) -> &[EdgeSync] {
    &self.syncs
  }

  /// Drop all output and size the vertex cache for rows of `corners`.
  pub fn begin(&mut self, corners: usize) {
    self.cache.reset(corners);
    self.chains.clear();
    self.surface.clear();
    if let Some(extrusion) = self.extrusion.as_mut() {
      extrusion.clear();
    }
    self.rim.clear();
    self.sub_meshes.clear();
    self.loops.clear();
    self.syncs.clear();
    self.spans.clear();
  }

  // ---------------------------------------------------------------------------
  // Vertex cache
  // ---------------------------------------------------------------------------

  #[inline]
  fn crosses(&self, min: &Voxel, max: &Voxel) -> bool {
    let fill = self.settings.fill;
    min.fill != max.fill && (min.fill == fill || max.fill == fill)
  }

  /// Material of whichever side of an edge belongs to this layer.
  #[inline]
  fn side_material(&self, min: &Voxel, max: &Voxel) -> Material {
    if min.fill == self.settings.fill {
      min.material
    } else {
      max.material
    }
  }

  fn corner_vertex(&mut self, voxel: &Voxel) -> u32 {
    if voxel.fill == self.settings.fill {
      self.add_vertex(voxel.position, voxel.material)
    } else {
      NO_VERTEX
    }
  }

  pub fn cache_first_corner(&mut self, voxel: &Voxel) {
    self.cache.corners_max[0] = self.corner_vertex(voxel);
  }

  /// Cache the x-edge between `min` and `max` and the corner at `max`.
  pub fn cache_next_edge_and_corner(&mut self, i: usize, min: &Voxel, max: &Voxel) {
    self.cache.x_edges_max[i] = if self.crosses(min, max) {
      let point = min.x_edge_point(self.settings.voxel_size);
      let material = self.side_material(min, max);
      self.add_vertex(point, material)
    } else {
      NO_VERTEX
    };
    self.cache.corners_max[i + 1] = self.corner_vertex(max);
  }

  /// Cache the y-edge between `min` and `max` as the right edge of the next
  /// cell; the previous right edge becomes its left edge.
  pub fn cache_next_middle_edge(&mut self, min: &Voxel, max: &Voxel) {
    let index = if self.crosses(min, max) {
      let point = min.y_edge_point(self.settings.voxel_size);
      let material = self.side_material(min, max);
      self.add_vertex(point, material)
    } else {
      NO_VERTEX
    };
    self.cache.prepare_next_cell(index);
  }

  pub fn prepare_next_row(&mut self) {
    self.cache.prepare_next_row();
  }

  // ---------------------------------------------------------------------------
  // Geometry
  // ---------------------------------------------------------------------------

  fn cap_uv(&self, local: Vec2) -> [f32; 2] {
    let uv = if self.settings.layer.uv_remap {
      (self.settings.origin + local) / self.settings.grid_size
    } else {
      local / self.settings.chunk_size
    };
    uv.to_array()
  }

  /// New cap vertex, mirrored into the back cap when extruding.
  pub(crate) fn add_vertex(&mut self, local: Vec2, material: Material) -> u32 {
    let uv = self.cap_uv(local);
    let index = self
      .surface
      .push_vertex([local.x, local.y, 0.0], uv, material, CAP_TANGENT);
    if let Some(extrusion) = self.extrusion.as_mut() {
      extrusion.push_vertex(
        [local.x, local.y, -self.settings.extrusion_height],
        uv,
        material,
        CAP_TANGENT,
      );
    }
    index
  }

  /// Emit a counter-clockwise polygon as a fan.
  ///
  /// The fan starts at the first vertex unless that would fold a triangle
  /// over, in which case the first vertex that fans cleanly is used.
  /// Edges between two non-corner vertices are boundary walls.
  pub(crate) fn fill_polygon(&mut self, polygon: &[PolyVertex]) {
    debug_assert!(
      polygon.iter().all(|v| v.index != NO_VERTEX),
      "polygon references an uncached vertex: {polygon:?}"
    );
    if polygon.len() < 3 || polygon.iter().any(|v| v.index == NO_VERTEX) {
      return;
    }
    let n = polygon.len();
    let start = (0..n).find(|&s| self.fans_cleanly(polygon, s)).unwrap_or(0);
    let v0 = polygon[start].index;
    for k in 1..n - 1 {
      let (b, c) = (polygon[(start + k) % n].index, polygon[(start + k + 1) % n].index);
      self.surface.push_triangle(v0, b, c);
      if let Some(extrusion) = self.extrusion.as_mut() {
        extrusion.push_triangle(v0, c, b);
      }
    }
    for k in 0..n {
      let (from, to) = (polygon[k], polygon[(k + 1) % n]);
      if !from.corner && !to.corner {
        self.chains.add(from.index, to.index);
      }
    }
  }

  /// Whether the fan from `polygon[start]` has no clockwise triangle.
  fn fans_cleanly(&self, polygon: &[PolyVertex], start: usize) -> bool {
    let n = polygon.len();
    let at = |k: usize| {
      let p = self.surface.positions[polygon[(start + k) % n].index as usize];
      Vec2::new(p[0], p[1])
    };
    let apex = at(0);
    let tolerance = -FAN_AREA_EPSILON * self.settings.voxel_size * self.settings.voxel_size;
    (1..n - 1).all(|k| (at(k) - apex).perp_dot(at(k + 1) - apex) >= tolerance)
  }

  // ---------------------------------------------------------------------------
  // Finalize
  // ---------------------------------------------------------------------------

  /// Turn the wall chains into loops, walls and rims, and split the cap by
  /// material.
  pub fn finalize(&mut self) {
    let chains: Vec<Vec<u32>> = self.chains.chains().to_vec();
    for chain in &chains {
      self.finalize_chain(chain);
    }

    if self.settings.layer.surface {
      self.sub_meshes = sub_mesh::split_by_blend(&self.surface, self.settings.material_mode);
    } else {
      self.surface.clear();
    }

    trace!(
      fill = self.settings.fill,
      triangles = self.surface.triangle_count(),
      loops = self.loops.len(),
      "finalized layer"
    );
  }

  fn finalize_chain(&mut self, chain: &[u32]) {
    let closed = chain.len() > 2 && chain.first() == chain.last();
    let indices = if closed { &chain[..chain.len() - 1] } else { chain };

    let mut local: Vec<Vec2> = Vec::with_capacity(indices.len());
    let mut materials: Vec<Material> = Vec::with_capacity(indices.len());
    for &i in indices {
      let p = self.surface.positions[i as usize];
      let p = Vec2::new(p[0], p[1]);
      if local.last().map_or(false, |&q| edge_loop::same_point(q, p)) {
        continue;
      }
      local.push(p);
      materials.push(self.surface.materials[i as usize]);
    }

    let origin = self.settings.origin;
    let world: Vec<Vec2> = local.iter().map(|&p| p + origin).collect();
    let edge_loop = EdgeLoop::from_positions(&world, closed);

    let mut columns: Vec<Column> = edge_loop
      .points
      .iter()
      .zip(&local)
      .zip(&materials)
      .map(|((point, &position), &material)| Column {
        position,
        normal: point.normal,
        distance: point.distance,
        material,
      })
      .collect();
    if edge_loop.closed {
      if let Some(&first) = columns.first() {
        columns.push(Column {
          distance: edge_loop.length(),
          ..first
        });
      }
    }

    let walls = self.emit_walls(&columns);
    let rim = self.emit_rim(&columns);
    let fragment = self.loops.len();
    self.spans.push(FragmentSpan {
      walls,
      rim,
      u_offset: 0.0,
    });
    self
      .syncs
      .push(EdgeSync::new(&edge_loop, fragment, self.settings.voxel_size));
    self.loops.push(edge_loop);
  }

  fn emit_walls(&mut self, columns: &[Column]) -> Range<usize> {
    let height = self.settings.extrusion_height;
    let Some(extrusion) = self.extrusion.as_mut() else {
      return 0..0;
    };
    let start = extrusion.vertex_count();
    for pair in columns.windows(2) {
      let (c0, c1) = (pair[0], pair[1]);
      let dir = (c1.position - c0.position).normalize_or_zero();
      let tangent = [dir.x, dir.y, 0.0, -1.0];
      let (p0, p1) = (c0.position, c1.position);
      let top0 = extrusion.push_vertex([p0.x, p0.y, 0.0], [c0.distance, 0.0], c0.material, tangent);
      let top1 = extrusion.push_vertex([p1.x, p1.y, 0.0], [c1.distance, 0.0], c1.material, tangent);
      let bot1 = extrusion.push_vertex([p1.x, p1.y, -height], [c1.distance, 1.0], c1.material, tangent);
      let bot0 = extrusion.push_vertex([p0.x, p0.y, -height], [c0.distance, 1.0], c0.material, tangent);
      // Outward facing: the wall normal is the loop's outward normal.
      extrusion.push_quad(top0, bot0, bot1, top1);
    }
    start..extrusion.vertex_count()
  }

  fn emit_rim(&mut self, columns: &[Column]) -> Range<usize> {
    let layer = &self.settings.layer;
    if !layer.has_rim() || columns.len() < 2 {
      let at = self.rim.vertex_count();
      return at..at;
    }
    let thickness = layer.rim_thickness;
    let rows = layer.rim_subdivisions as usize;
    let start = self.rim.vertex_count();
    for s in 0..=rows {
      let frac = s as f32 / rows as f32;
      for c in columns {
        let p = c.position - c.normal * thickness * frac;
        self.rim.push_vertex(
          [p.x, p.y, 0.0],
          [c.distance, frac],
          c.material,
          [c.normal.x, c.normal.y, c.distance, frac],
        );
      }
    }
    let cols = columns.len() as u32;
    let base = start as u32;
    for s in 0..rows as u32 {
      for k in 0..cols - 1 {
        let p0 = base + s * cols + k;
        let p3 = base + (s + 1) * cols + k;
        self.rim.push_quad(p0, p0 + 1, p3 + 1, p3);
      }
    }
    start..self.rim.vertex_count()
  }

  /// Shift the U coordinate of one fragment's walls and rim so it starts at
  /// `offset` along its stitched loop.
  pub fn apply_u_offset(&mut self, fragment: usize, offset: f32) {
    let Some(span) = self.spans.get_mut(fragment) else {
      return;
    };
    let delta = offset - span.u_offset;
    span.u_offset = offset;
    if delta == 0.0 {
      return;
    }
    if let Some(extrusion) = self.extrusion.as_mut() {
      for uv in &mut extrusion.uvs[span.walls.clone()] {
        uv[0] += delta;
      }
    }
    for i in span.rim.clone() {
      self.rim.uvs[i][0] += delta;
      self.rim.tangents[i][2] += delta;
    }
  }

  /// U offset currently applied to `fragment`.
  pub fn u_offset(&self, fragment: usize) -> f32 {
    self.spans.get(fragment).map_or(0.0, |s| s.u_offset)
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
