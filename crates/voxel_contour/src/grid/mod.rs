//! Chunk ownership, edit dispatch and cross-chunk loop stitching.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Grid                                                                    │
//! │                                                                         │
//! │  apply_stencil                                                          │
//! │    affected chunks ──► fill pass (par_iter, joined)                     │
//! │                    ──► border copies ──► crossing + material per chunk  │
//! │                                                                         │
//! │  triangulate                                                            │
//! │    join all ──► border copies ──► dirty chunks sweep (serial / tasks)   │
//! │             ──► join all ──► stitch every layer                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Chunks are stored row-major. A chunk's forward neighbors always have a
//! larger index, so border copies taken in index order never observe a
//! neighbor mid-edit.

pub mod stitch;

use std::sync::Arc;

use glam::Vec2;
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};
use web_time::Instant;

use self::stitch::{StitchPlan, SyncRecord};
use crate::chunk::{Chunk, ChunkNeighbors, ChunkParams, ChunkSnapshot, Dispatch, NeighborBorders};
use crate::config::{ConfigError, GridConfig};
use crate::stencil::{affected_chunks, Stencil};
use crate::surface::{boundary_hash, LoopPoint};
use crate::types::Rect2;
use crate::voxel::{Voxel, EMPTY};

/// Fragment of a stitched loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentRef {
  pub chunk: usize,
  /// Loop index within the chunk's builder.
  pub fragment: usize,
}

/// Boundary loop of one layer across the whole grid, in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StitchedLoop {
  pub points: Vec<LoopPoint>,
  pub closed: bool,
  pub length: f32,
  pub fragments: Vec<FragmentRef>,
}

#[derive(Debug, Default)]
pub struct Grid {
  config: GridConfig,
  chunks: Vec<Chunk>,
  /// Chunks whose meshes are stale.
  dirty: Vec<bool>,
  /// Stitched loops of fill id `k + 1` at index `k`.
  loops: Vec<Vec<StitchedLoop>>,
}

impl Grid {
  /// Empty grid. Call [`Grid::initialize`] before use.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: GridConfig) -> Result<Self, ConfigError> {
    let mut grid = Self::new();
    grid.initialize(config)?;
    Ok(grid)
  }

  /// (Re)build all chunks. On error the grid is left empty.
  pub fn initialize(&mut self, config: GridConfig) -> Result<(), ConfigError> {
    self.wait_all();
    self.chunks.clear();
    self.dirty.clear();
    self.loops.clear();
    if let Err(err) = config.validate() {
      warn!(%err, "rejected grid configuration");
      return Err(err);
    }

    let params = Arc::new(ChunkParams::from_config(&config));
    let n = config.chunk_resolution;
    self.chunks = (0..n * n)
      .map(|i| {
        let (x, y) = (i % n, i / n);
        let mut chunk = Chunk::new(i, [x, y], Arc::clone(&params));
        chunk.neighbors = ChunkNeighbors {
          x: (x + 1 < n).then(|| i + 1),
          y: (y + 1 < n).then(|| i + n),
          xy: (x + 1 < n && y + 1 < n).then(|| i + n + 1),
        };
        chunk
      })
      .collect();
    self.dirty = vec![true; self.chunks.len()];
    self.loops = vec![Vec::new(); config.layers.len()];
    debug!(
      chunks = self.chunks.len(),
      voxels_per_chunk = config.voxel_resolution * config.voxel_resolution,
      layers = config.layers.len(),
      "initialized grid"
    );
    self.config = config;
    Ok(())
  }

  pub fn config(&self) -> &GridConfig {
    &self.config
  }

  pub fn chunks(&self) -> &[Chunk] {
    &self.chunks
  }

  /// Panics when `index` is not a chunk of this grid.
  pub fn chunk(&self, index: usize) -> &Chunk {
    assert!(index < self.chunks.len(), "chunk index {index} out of range");
    &self.chunks[index]
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  // ---------------------------------------------------------------------------
  // Lookups
  // ---------------------------------------------------------------------------

  /// Chunk containing a world position.
  pub fn chunk_index_at(&self, world: Vec2) -> Option<usize> {
    if self.chunks.is_empty() {
      return None;
    }
    let n = self.config.chunk_resolution;
    let cell = (world / self.config.chunk_size).floor();
    if cell.x < 0.0 || cell.y < 0.0 || cell.x >= n as f32 || cell.y >= n as f32 {
      return None;
    }
    Some(cell.y as usize * n + cell.x as usize)
  }

  pub fn chunk_origin(&self, index: usize) -> Vec2 {
    self.chunk(index).origin()
  }

  pub fn chunk_rect(&self, index: usize) -> Rect2 {
    self.chunk(index).rect()
  }

  /// Voxel whose square contains a world position.
  pub fn voxel_at(&self, world: Vec2) -> Option<Voxel> {
    let chunk = &self.chunks[self.chunk_index_at(world)?];
    let res = self.config.voxel_resolution;
    let local = ((world - chunk.origin()) / self.config.voxel_size()).floor();
    let x = (local.x.max(0.0) as usize).min(res - 1);
    let y = (local.y.max(0.0) as usize).min(res - 1);
    Some(chunk.voxel(x, y))
  }

  // ---------------------------------------------------------------------------
  // Scheduling
  // ---------------------------------------------------------------------------

  /// Block until every chunk is idle.
  pub fn wait_all(&self) {
    for chunk in &self.chunks {
      chunk.wait();
    }
  }

  /// Copies of the voxels a chunk reads from its forward neighbors.
  pub fn borders(&self, index: usize) -> NeighborBorders {
    let neighbors = self.chunks[index].neighbors;
    NeighborBorders {
      x: neighbors.x.map(|i| self.chunks[i].first_column()),
      y: neighbors.y.map(|i| self.chunks[i].first_row()),
      xy: neighbors.xy.map(|i| self.chunks[i].first_voxel()),
    }
  }

  /// Mark every chunk stale, e.g. after changing layer flags.
  pub fn invalidate_all(&mut self) {
    self.dirty.fill(true);
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty.iter().any(|&d| d)
  }

  // ---------------------------------------------------------------------------
  // Edits
  // ---------------------------------------------------------------------------

  /// Apply a stencil. Returns the number of chunks it touched.
  ///
  /// A fill id without an output layer is ignored.
  pub fn apply_stencil(&mut self, stencil: &Stencil, dispatch: Dispatch) -> usize {
    let _span = debug_span!("apply_stencil", fill = stencil.fill).entered();
    if stencil.fill != EMPTY && self.config.layer(stencil.fill).is_none() {
      debug!(fill = stencil.fill, "stencil fill id has no layer");
      return 0;
    }
    if self.chunks.is_empty() {
      return 0;
    }

    let affected = affected_chunks(
      stencil.shape.bounds(),
      self.config.voxel_size(),
      self.config.voxel_resolution,
      self.config.chunk_resolution,
    );

    let chunks = &self.chunks;
    let changed: usize = match dispatch {
      Dispatch::Serial => affected
        .iter()
        .filter_map(|a| a.fill.map(|range| chunks[a.chunk].apply_fill(stencil, range)))
        .sum(),
      Dispatch::Parallel => affected
        .par_iter()
        .filter_map(|a| a.fill.map(|range| chunks[a.chunk].apply_fill(stencil, range)))
        .sum(),
    };

    let borders: Vec<NeighborBorders> = affected.iter().map(|a| self.borders(a.chunk)).collect();
    for (a, borders) in affected.iter().zip(borders) {
      self.chunks[a.chunk].apply_edit(stencil, a, borders, dispatch);
      self.dirty[a.chunk] = true;
    }

    debug!(chunks = affected.len(), voxels = changed, "applied stencil");
    affected.len()
  }

  // ---------------------------------------------------------------------------
  // Triangulation
  // ---------------------------------------------------------------------------

  /// Rebuild stale chunks and restitch. Blocks until done.
  pub fn triangulate(&mut self, dispatch: Dispatch) {
    match dispatch {
      Dispatch::Serial => {
        let _span = debug_span!("triangulate_grid").entered();
        let start = Instant::now();
        let targets = self.take_dirty();
        if targets.is_empty() {
          return;
        }
        let borders: Vec<NeighborBorders> = targets.iter().map(|&i| self.borders(i)).collect();
        for (&i, borders) in targets.iter().zip(&borders) {
          self.chunks[i].triangulate(borders);
        }
        self.stitch();
        debug!(
          chunks = targets.len(),
          elapsed_us = start.elapsed().as_micros() as u64,
          "triangulated grid"
        );
      }
      Dispatch::Parallel => {
        if self.begin_triangulation() > 0 {
          self.finish_triangulation();
        }
      }
    }
  }

  /// Schedule one task per stale chunk and return how many were scheduled.
  ///
  /// Call [`Grid::finish_triangulation`] to join and restitch.
  pub fn begin_triangulation(&mut self) -> usize {
    let targets = self.take_dirty();
    let borders: Vec<NeighborBorders> = targets.iter().map(|&i| self.borders(i)).collect();
    for (&i, borders) in targets.iter().zip(borders) {
      self.chunks[i].triangulate_async(borders);
    }
    targets.len()
  }

  /// Join all outstanding tasks and restitch every layer.
  pub fn finish_triangulation(&mut self) {
    let _span = debug_span!("finish_triangulation").entered();
    self.wait_all();
    self.stitch();
  }

  fn take_dirty(&mut self) -> Vec<usize> {
    self.wait_all();
    let targets: Vec<usize> = (0..self.dirty.len()).filter(|&i| self.dirty[i]).collect();
    self.dirty.fill(false);
    targets
  }

  // ---------------------------------------------------------------------------
  // Stitching
  // ---------------------------------------------------------------------------

  /// Stitched loops of a layer.
  /// Panics when `fill` has no output layer.
  pub fn loops(&self, fill: u8) -> &[StitchedLoop] {
    let layer = fill as usize;
    assert!(
      (1..=self.loops.len()).contains(&layer),
      "fill id {fill} has no output layer"
    );
    &self.loops[layer - 1]
  }

  /// Rebuild the stitched loops of every layer and push each fragment's
  /// start distance back into its chunk's walls and rim.
  pub fn stitch(&mut self) {
    let _span = debug_span!("stitch").entered();
    self.wait_all();
    for k in 0..self.loops.len() {
      let fill = (k + 1) as u8;
      let mut records = Vec::new();
      for chunk in &self.chunks {
        chunk.with_builder(fill, |b| {
          records.extend(b.syncs().iter().map(|&sync| SyncRecord {
            chunk: chunk.index(),
            sync,
          }));
        });
      }
      let loops: Vec<StitchedLoop> = stitch::stitch(&records)
        .iter()
        .map(|plan| self.assemble(fill, &records, plan))
        .collect();
      debug!(fill, fragments = records.len(), loops = loops.len(), "stitched layer");
      self.loops[k] = loops;
    }
  }

  fn assemble(&self, fill: u8, records: &[SyncRecord], plan: &StitchPlan) -> StitchedLoop {
    let voxel_size = self.config.voxel_size();
    let mut out = StitchedLoop {
      closed: plan.closed,
      length: plan.length,
      ..Default::default()
    };
    for (&r, &offset) in plan.records.iter().zip(&plan.offsets) {
      let record = records[r];
      let fragment = record.sync.fragment;
      let edge_loop = self.chunks[record.chunk]
        .with_builder_mut(fill, |b| {
          b.apply_u_offset(fragment, offset);
          b.loops().get(fragment).cloned()
        })
        .flatten();
      let Some(edge_loop) = edge_loop else {
        continue;
      };
      let mut points = edge_loop.points.iter().map(|p| LoopPoint {
        distance: p.distance + offset,
        ..*p
      });
      // Adjacent fragments share their joint point.
      if let (Some(last), Some(first)) = (out.points.last(), edge_loop.points.first()) {
        if boundary_hash(last.position, voxel_size) == boundary_hash(first.position, voxel_size) {
          points.next();
        }
      }
      out.points.extend(points);
      out.fragments.push(FragmentRef {
        chunk: record.chunk,
        fragment,
      });
    }
    if plan.closed && plan.records.len() > 1 {
      let first = out.points.first().map(|p| boundary_hash(p.position, voxel_size));
      let last = out.points.last().map(|p| boundary_hash(p.position, voxel_size));
      if out.points.len() > 1 && first == last {
        out.points.pop();
      }
    }
    out
  }

  // ---------------------------------------------------------------------------
  // Session state
  // ---------------------------------------------------------------------------

  pub fn snapshot(&self) -> Vec<ChunkSnapshot> {
    self.chunks.iter().map(Chunk::snapshot).collect()
  }

  /// Restore every chunk from `snapshots`, in chunk order.
  pub fn restore(&mut self, snapshots: &[ChunkSnapshot]) {
    assert_eq!(snapshots.len(), self.chunks.len(), "snapshot chunk count mismatch");
    for (chunk, snapshot) in self.chunks.iter().zip(snapshots) {
      chunk.restore(snapshot);
    }
    self.invalidate_all();
  }

  /// Reset all voxels and geometry, keeping the configuration.
  pub fn clear(&mut self) {
    for chunk in &self.chunks {
      chunk.clear();
    }
    for loops in &mut self.loops {
      loops.clear();
    }
    self.invalidate_all();
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
