//! voxel_contour - chunked 2D voxel contouring
//!
//! Turns a grid of filled cells into polygonal caps, extruded side walls,
//! rim ribbons and continuous boundary loops. The grid is split into square
//! chunks that triangulate independently (optionally on rayon's pool) and
//! are stitched back together per fill layer.
//!
//! # Features
//!
//! - **Feature-preserving marching squares**: 16 cases per layer with
//!   analytic sharp corners, saddle resolution and multi-material junctions
//! - **Extrusion and rims**: back cap, side walls and inset ribbons with
//!   arc-length UVs that stay continuous across chunks
//! - **Material blending**: color, single, double and triple palette
//!   encodings reduced to per-face keys and per-vertex weights
//! - **Stencils**: box, circle and triangle edits with fill, crossing and
//!   paint passes
//!
//! # Example
//!
//! ```ignore
//! use voxel_contour::{Dispatch, Grid, GridConfig, LayerConfig, Shape, Stencil};
//!
//! let config = GridConfig::new().with_layers(vec![LayerConfig::new().with_extrusion(true)]);
//! let mut grid = Grid::from_config(config)?;
//!
//! grid.apply_stencil(&Stencil::new(Shape::circle(Vec2::splat(8.0), 3.0), 1), Dispatch::Parallel);
//! grid.triangulate(Dispatch::Parallel);
//!
//! for edge_loop in grid.loops(1) {
//!     println!("{} points, closed: {}", edge_loop.points.len(), edge_loop.closed);
//! }
//! ```

pub mod constants;
pub mod types;
pub mod voxel;

pub use types::{MeshBuffer, MinMaxAABB, Rect2};
pub use voxel::{Crossing, Voxel, EMPTY};

// Material encodings and blending
pub mod material;
pub use material::{BlendKey, BlendPolicy, Material, MaterialMode, MaterialPaint, PaintTarget};

// Configuration
pub mod config;
pub use config::{ConfigError, GridConfig, LayerConfig};

// Cell classification and surface assembly
pub mod cell;
pub mod surface;
pub use cell::{Cell, CellCase, CellTopology};
pub use surface::{EdgeLoop, EdgeSync, LoopPoint, SurfaceBuilder};

// Single-slot background tasks
pub mod task;
pub use task::TaskSlot;

// Chunks, stencils and the grid
pub mod chunk;
pub mod grid;
pub mod stencil;
pub use chunk::{Chunk, ChunkSnapshot, Dispatch, NeighborBorders};
pub use grid::{Grid, StitchedLoop};
pub use stencil::{Shape, Stencil};
