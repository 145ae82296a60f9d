//! Shared constants for the contouring engine.
//!
//! # Chunk Layout
//!
//! ```text
//!   voxel centers sit at (i + 0.5) * voxel_size inside a chunk
//!
//!   y
//!   ▲   c ─────── d          a = (x,   y)     bottom-left
//!   │   │  cell   │          b = (x+1, y)     bottom-right
//!   │   │ (x, y)  │          c = (x,   y+1)   top-left
//!   │   a ─────── b          d = (x+1, y+1)   top-right
//!   └──────────────► x
//!
//!   a.x_edge: crossing on a ─ b      a.y_edge: crossing on a ─ c
//! ```
//!
//! The last column and row of a chunk form "gap" cells whose right/top
//! corners live in the forward neighbor chunks.

/// Default maximum angle (degrees) between two crossing tangents that still
/// produces a sharp feature point.
pub const DEFAULT_MAX_FEATURE_ANGLE: f32 = 135.0;

/// Default angle (degrees) under which two normals count as parallel when
/// resolving ambiguous saddle cells.
pub const DEFAULT_MAX_PARALLEL_ANGLE: f32 = 8.0;

/// Upper bound on `dot(n1, -n2)` for feature solving. Above this the two
/// tangents are (anti)parallel and the intersection is ill-conditioned.
pub const FEATURE_DOT_LIMIT: f32 = 0.999;

/// Slack (in voxel units) allowed when validating that a solved feature point
/// lies inside its cell.
pub const FEATURE_BOUNDS_EPSILON: f32 = 1e-4;

/// Boundary-hash quantization steps per voxel.
pub const HASH_STEPS_PER_VOXEL: f32 = 4096.0;

/// Full weight of a material slot.
pub const FULL_WEIGHT: u8 = 255;

/// Palette indices representable in the packed triple encoding (5 bits).
pub const PACKED_TRIPLE_MAX_INDEX: u8 = 31;

/// Linear voxel index inside a chunk (row-major, x fastest).
#[inline(always)]
pub const fn voxel_index(x: usize, y: usize, resolution: usize) -> usize {
  y * resolution + x
}

/// Inverse of [`voxel_index`].
#[inline(always)]
pub const fn voxel_coord(index: usize, resolution: usize) -> (usize, usize) {
  (index % resolution, index / resolution)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
