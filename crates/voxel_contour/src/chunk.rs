//! One square block of voxels and its per-layer surface builders.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Chunk                                                                   │
//! │                                                                         │
//! │  Arc<Mutex<ChunkState>>  voxels + one SurfaceBuilder per layer          │
//! │  TaskSlot                at most one outstanding task                   │
//! │  ChunkNeighbors          +X, +Y and diagonal chunk indices              │
//! │                                                                         │
//! │  triangulate(borders)                                                   │
//! │    rows = own voxels + copied first column / row / corner of the        │
//! │           neighbors, shifted by the chunk size                          │
//! │    sweep rows ──► every builder ──► finalize                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neighbor voxels are never read in place: the grid copies them into
//! [`NeighborBorders`] before any work is scheduled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug_span, trace};
use web_time::Instant;

use crate::cell::Cell;
use crate::config::{GridConfig, LayerConfig};
use crate::constants::voxel_index;
use crate::material::MaterialMode;
use crate::stencil::{self, AffectedChunk, Stencil, VoxelRange};
use crate::surface::{BuilderSettings, SurfaceBuilder};
use crate::task::TaskSlot;
use crate::types::Rect2;
use crate::voxel::Voxel;

/// Whether work runs on the calling thread or on the thread pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
  #[default]
  Serial,
  Parallel,
}

/// Grid-wide parameters every chunk shares.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkParams {
  /// Voxels per chunk side.
  pub resolution: usize,
  pub voxel_size: f32,
  pub chunk_size: f32,
  pub grid_size: f32,
  pub extrusion_height: f32,
  pub sharp_threshold: f32,
  pub parallel_threshold: f32,
  pub material_mode: MaterialMode,
  pub layers: Vec<LayerConfig>,
}

impl ChunkParams {
  pub fn from_config(config: &GridConfig) -> Self {
    Self {
      resolution: config.voxel_resolution,
      voxel_size: config.voxel_size(),
      chunk_size: config.chunk_size,
      grid_size: config.grid_size(),
      extrusion_height: config.extrusion_height,
      sharp_threshold: config.sharp_threshold(),
      parallel_threshold: config.parallel_threshold(),
      material_mode: config.material_mode,
      layers: config.layers.clone(),
    }
  }
}

/// Indices of the forward neighbors in the grid's chunk list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkNeighbors {
  pub x: Option<usize>,
  pub y: Option<usize>,
  pub xy: Option<usize>,
}

/// Copied voxels of the forward neighbors, in the neighbor's own space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborBorders {
  /// First column of the +X neighbor, indexed by y.
  pub x: Option<Vec<Voxel>>,
  /// First row of the +Y neighbor, indexed by x.
  pub y: Option<Vec<Voxel>>,
  /// First voxel of the diagonal neighbor.
  pub xy: Option<Voxel>,
}

/// Voxel block of one chunk, enough to resume an edit session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkSnapshot {
  pub resolution: usize,
  pub voxels: Vec<Voxel>,
}

#[derive(Debug)]
pub struct ChunkState {
  pub voxels: Vec<Voxel>,
  /// Builder for fill id `k + 1` at index `k`.
  pub builders: Vec<SurfaceBuilder>,
  /// Duration of the last triangulation.
  pub timing_us: u64,
}

#[derive(Debug)]
pub struct Chunk {
  index: usize,
  coord: [usize; 2],
  origin: Vec2,
  pub neighbors: ChunkNeighbors,
  params: Arc<ChunkParams>,
  state: Arc<Mutex<ChunkState>>,
  task: TaskSlot,
}

fn lock(state: &Mutex<ChunkState>) -> MutexGuard<'_, ChunkState> {
  state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Chunk {
  pub fn new(index: usize, coord: [usize; 2], params: Arc<ChunkParams>) -> Self {
    let res = params.resolution;
    let origin = Vec2::new(coord[0] as f32, coord[1] as f32) * params.chunk_size;
    let voxels = (0..res * res)
      .map(|i| Voxel::new(i % res, i / res, params.voxel_size))
      .collect();
    let builders = params
      .layers
      .iter()
      .enumerate()
      .map(|(k, layer)| {
        SurfaceBuilder::new(BuilderSettings {
          fill: (k + 1) as u8,
          layer: layer.clone(),
          voxel_size: params.voxel_size,
          chunk_size: params.chunk_size,
          origin,
          grid_size: params.grid_size,
          extrusion_height: params.extrusion_height,
          material_mode: params.material_mode,
        })
      })
      .collect();
    Self {
      index,
      coord,
      origin,
      neighbors: ChunkNeighbors::default(),
      params,
      state: Arc::new(Mutex::new(ChunkState {
        voxels,
        builders,
        timing_us: 0,
      })),
      task: TaskSlot::new(),
    }
  }

  #[inline]
  pub fn index(&self) -> usize {
    self.index
  }

  #[inline]
  pub fn coord(&self) -> [usize; 2] {
    self.coord
  }

  /// World position of the lower-left corner.
  #[inline]
  pub fn origin(&self) -> Vec2 {
    self.origin
  }

  pub fn rect(&self) -> Rect2 {
    Rect2::from_origin_size(self.origin, Vec2::splat(self.params.chunk_size))
  }

  #[inline]
  pub fn resolution(&self) -> usize {
    self.params.resolution
  }

  /// Block until the outstanding task finishes.
  pub fn wait(&self) {
    self.task.wait();
  }

  pub fn is_busy(&self) -> bool {
    self.task.is_busy()
  }

  fn state(&self) -> MutexGuard<'_, ChunkState> {
    self.task.wait();
    lock(&self.state)
  }

  pub fn voxel(&self, x: usize, y: usize) -> Voxel {
    let res = self.params.resolution;
    assert!(x < res && y < res, "voxel ({x}, {y}) outside chunk of {res}");
    self.state().voxels[voxel_index(x, y, res)]
  }

  /// First column, read by the -X neighbor.
  pub fn first_column(&self) -> Vec<Voxel> {
    let res = self.params.resolution;
    let state = self.state();
    (0..res).map(|y| state.voxels[voxel_index(0, y, res)]).collect()
  }

  /// First row, read by the -Y neighbor.
  pub fn first_row(&self) -> Vec<Voxel> {
    let res = self.params.resolution;
    self.state().voxels[..res].to_vec()
  }

  /// First voxel, read by the diagonal neighbor.
  pub fn first_voxel(&self) -> Voxel {
    self.state().voxels[0]
  }

  /// Duration of the last triangulation in microseconds.
  pub fn timing_us(&self) -> u64 {
    self.state().timing_us
  }

  // ---------------------------------------------------------------------------
  // Triangulation
  // ---------------------------------------------------------------------------

  /// Rebuild every layer's meshes on the calling thread.
  pub fn triangulate(&self, borders: &NeighborBorders) {
    let mut state = self.state();
    triangulate_state(&self.params, self.index, &mut state, borders);
  }

  /// Rebuild every layer's meshes on the thread pool.
  pub fn triangulate_async(&self, borders: NeighborBorders) {
    let params = Arc::clone(&self.params);
    let state = Arc::clone(&self.state);
    let index = self.index;
    self.task.spawn(move || {
      let mut state = lock(&state);
      triangulate_state(&params, index, &mut state, &borders);
    });
  }

  /// Read one layer's builder. `None` for fill ids without a layer.
  pub fn with_builder<R>(&self, fill: u8, f: impl FnOnce(&SurfaceBuilder) -> R) -> Option<R> {
    let state = self.state();
    let k = (fill as usize).checked_sub(1)?;
    state.builders.get(k).map(f)
  }

  pub fn with_builder_mut<R>(&self, fill: u8, f: impl FnOnce(&mut SurfaceBuilder) -> R) -> Option<R> {
    let mut state = self.state();
    let k = (fill as usize).checked_sub(1)?;
    state.builders.get_mut(k).map(f)
  }

  // ---------------------------------------------------------------------------
  // Edits
  // ---------------------------------------------------------------------------

  /// Fill pass of a stencil. Returns the number of voxels that changed.
  pub fn apply_fill(&self, stencil: &Stencil, range: VoxelRange) -> usize {
    let mut state = self.state();
    stencil::fill_pass(&mut state.voxels, self.params.resolution, self.origin, range, stencil)
  }

  /// Crossing and material passes of a stencil.
  pub fn apply_edit(
    &self,
    stencil: &Stencil,
    affected: &AffectedChunk,
    borders: NeighborBorders,
    dispatch: Dispatch,
  ) {
    match dispatch {
      Dispatch::Serial => {
        let mut state = self.state();
        edit_state(&self.params, self.origin, &mut state, stencil, affected, &borders);
      }
      Dispatch::Parallel => {
        let params = Arc::clone(&self.params);
        let state = Arc::clone(&self.state);
        let origin = self.origin;
        let stencil = *stencil;
        let affected = *affected;
        self.task.spawn(move || {
          let mut state = lock(&state);
          edit_state(&params, origin, &mut state, &stencil, &affected, &borders);
        });
      }
    }
  }

  // ---------------------------------------------------------------------------
  // Session state
  // ---------------------------------------------------------------------------

  pub fn snapshot(&self) -> ChunkSnapshot {
    ChunkSnapshot {
      resolution: self.params.resolution,
      voxels: self.state().voxels.clone(),
    }
  }

  /// Replace the voxel block. Positions are recomputed for this chunk.
  pub fn restore(&self, snapshot: &ChunkSnapshot) {
    let res = self.params.resolution;
    assert_eq!(snapshot.resolution, res, "snapshot resolution mismatch");
    assert_eq!(snapshot.voxels.len(), res * res, "snapshot voxel count mismatch");
    let mut state = self.state();
    for (i, (voxel, saved)) in state.voxels.iter_mut().zip(&snapshot.voxels).enumerate() {
      *voxel = Voxel {
        position: Voxel::new(i % res, i / res, self.params.voxel_size).position,
        ..*saved
      };
    }
  }

  /// Reset every voxel in place and drop all generated geometry.
  pub fn clear(&self) {
    let mut state = self.state();
    state.voxels.iter_mut().for_each(Voxel::reset);
    for builder in &mut state.builders {
      builder.begin(0);
    }
  }
}

fn edit_state(
  params: &ChunkParams,
  origin: Vec2,
  state: &mut ChunkState,
  stencil: &Stencil,
  affected: &AffectedChunk,
  borders: &NeighborBorders,
) {
  let res = params.resolution;
  stencil::crossing_pass(
    &mut state.voxels,
    res,
    params.chunk_size,
    origin,
    affected.crossing,
    borders,
    stencil,
  );
  if let Some(range) = affected.fill {
    stencil::material_pass(&mut state.voxels, res, origin, range, stencil, params.material_mode);
  }
}

/// Rows of the sweep: own voxels extended by the neighbor borders.
fn build_rows(params: &ChunkParams, voxels: &[Voxel], borders: &NeighborBorders) -> Vec<Vec<Voxel>> {
  let res = params.resolution;
  let size = params.chunk_size;
  // Without the diagonal voxel the top-right gap cell cannot be formed.
  let extend_x = borders.x.is_some() && (borders.y.is_none() || borders.xy.is_some());
  let column = borders.x.as_deref().filter(|_| extend_x);

  let mut rows: Vec<Vec<Voxel>> = (0..res)
    .map(|y| {
      let mut row = voxels[y * res..(y + 1) * res].to_vec();
      if let Some(v) = column.and_then(|c| c.get(y)) {
        row.push(v.dummy(Vec2::new(size, 0.0)));
      }
      row
    })
    .collect();

  if let Some(top) = borders.y.as_deref() {
    let mut row: Vec<Voxel> = top.iter().map(|v| v.dummy(Vec2::new(0.0, size))).collect();
    if let (true, Some(v)) = (extend_x, borders.xy) {
      row.push(v.dummy(Vec2::new(size, size)));
    }
    rows.push(row);
  }
  rows
}

fn cache_row(builders: &mut [SurfaceBuilder], row: &[Voxel]) {
  for builder in builders.iter_mut() {
    builder.cache_first_corner(&row[0]);
    for i in 0..row.len() - 1 {
      builder.cache_next_edge_and_corner(i, &row[i], &row[i + 1]);
    }
  }
}

fn triangulate_state(params: &ChunkParams, index: usize, state: &mut ChunkState, borders: &NeighborBorders) {
  let _span = debug_span!("triangulate_chunk", chunk = index).entered();
  let start = Instant::now();

  let rows = build_rows(params, &state.voxels, borders);
  let corners = rows.first().map_or(0, Vec::len);
  let builders = &mut state.builders;
  for builder in builders.iter_mut() {
    builder.begin(corners);
  }

  if corners > 0 {
    cache_row(builders, &rows[0]);
  }
  for pair in rows.windows(2) {
    let (lower, upper) = (&pair[0], &pair[1]);
    for builder in builders.iter_mut() {
      builder.prepare_next_row();
    }
    cache_row(builders, upper);
    for builder in builders.iter_mut() {
      builder.cache_next_middle_edge(&lower[0], &upper[0]);
    }
    for x in 0..corners - 1 {
      for builder in builders.iter_mut() {
        builder.cache_next_middle_edge(&lower[x + 1], &upper[x + 1]);
      }
      let cell = Cell {
        a: &lower[x],
        b: &lower[x + 1],
        c: &upper[x],
        d: &upper[x + 1],
        index: x,
        voxel_size: params.voxel_size,
        sharp_threshold: params.sharp_threshold,
        parallel_threshold: params.parallel_threshold,
      };
      let topology = cell.topology();
      for builder in builders.iter_mut() {
        builder.triangulate_cell(x, &cell, &topology);
      }
    }
  }

  for builder in builders.iter_mut() {
    builder.finalize();
  }

  state.timing_us = start.elapsed().as_micros() as u64;
  trace!(chunk = index, timing_us = state.timing_us, rows = rows.len(), "triangulated chunk");
}

#[cfg(test)]
#[path = "chunk_test.rs"]
mod chunk_test;
