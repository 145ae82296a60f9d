use super::*;
use crate::config::LayerConfig;
use crate::stencil::Shape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn config() -> GridConfig {
  GridConfig::new()
    .with_voxel_resolution(8)
    .with_chunk_resolution(2)
    .with_chunk_size(8.0)
    .with_layers(vec![LayerConfig::new().with_extrusion(true).with_rim(0.25, 1)])
}

fn grid() -> Grid {
  Grid::from_config(config()).expect("valid config")
}

/// Rectangle straddling the boundary between chunks 0 and 1.
fn straddling_box() -> Stencil {
  Stencil::new(Shape::rect(Vec2::new(8.0, 4.0), Vec2::new(2.2, 1.2)), 1)
}

#[test]
fn test_invalid_config_leaves_grid_empty() {
  let mut grid = grid();
  let err = grid.initialize(config().with_voxel_resolution(0));
  assert!(matches!(err, Err(ConfigError::VoxelResolution(0))));
  assert_eq!(grid.chunk_count(), 0);
  assert_eq!(grid.chunk_index_at(Vec2::ONE), None);
  assert_eq!(grid.apply_stencil(&straddling_box(), Dispatch::Serial), 0);
}

#[test]
fn test_neighbor_links() {
  let grid = grid();
  assert_eq!(grid.chunk_count(), 4);
  let n = |i: usize| grid.chunk(i).neighbors;
  assert_eq!(
    n(0),
    ChunkNeighbors {
      x: Some(1),
      y: Some(2),
      xy: Some(3),
    }
  );
  assert_eq!(
    n(1),
    ChunkNeighbors {
      x: None,
      y: Some(3),
      xy: None,
    }
  );
  assert_eq!(n(3), ChunkNeighbors::default());
}

#[test]
fn test_lookups() {
  let grid = grid();
  assert_eq!(grid.chunk_index_at(Vec2::new(1.0, 1.0)), Some(0));
  assert_eq!(grid.chunk_index_at(Vec2::new(9.0, 1.0)), Some(1));
  assert_eq!(grid.chunk_index_at(Vec2::new(1.0, 9.0)), Some(2));
  assert_eq!(grid.chunk_index_at(Vec2::new(16.0, 1.0)), None);
  assert_eq!(grid.chunk_index_at(Vec2::new(-0.5, 1.0)), None);
  assert_eq!(grid.chunk_origin(3), Vec2::splat(8.0));
  assert_eq!(grid.chunk_rect(1), Rect2::new(Vec2::new(8.0, 0.0), Vec2::new(16.0, 8.0)));
  assert_eq!(grid.voxel_at(Vec2::new(9.2, 2.7)).map(|v| v.position), Some(Vec2::new(1.5, 2.5)));
}

#[test]
fn test_unknown_layer_is_ignored() {
  let mut grid = grid();
  grid.triangulate(Dispatch::Serial);
  let stencil = Stencil::new(Shape::circle(Vec2::splat(4.0), 2.0), 7);
  assert_eq!(grid.apply_stencil(&stencil, Dispatch::Serial), 0);
  assert!(!grid.is_dirty());
}

#[test]
#[should_panic(expected = "chunk index 4 out of range")]
fn test_chunk_index_out_of_range_panics() {
  grid().chunk_rect(4);
}

#[test]
#[should_panic(expected = "fill id 7 has no output layer")]
fn test_loops_of_unknown_layer_panics() {
  grid().loops(7);
}

#[test]
#[should_panic(expected = "fill id 0 has no output layer")]
fn test_loops_of_empty_fill_panics() {
  grid().loops(0);
}

#[test]
fn test_straddling_box_stitches_into_one_loop() {
  let mut grid = grid();
  assert_eq!(grid.apply_stencil(&straddling_box(), Dispatch::Serial), 2);
  grid.triangulate(Dispatch::Serial);

  let loops = grid.loops(1);
  assert_eq!(loops.len(), 1);
  let stitched = &loops[0];
  assert!(stitched.closed);
  assert_eq!(stitched.fragments.len(), 2);
  assert!((stitched.length - 13.6).abs() < 1e-3);
  assert_eq!(stitched.points.len(), 16);
  // World space: the loop spans both chunks.
  assert!(stitched.points.iter().any(|p| p.position.x > 9.0));
  assert!(stitched.points.iter().any(|p| p.position.x < 7.0));
  // Arc length keeps increasing across the joint.
  assert!(stitched.points.windows(2).all(|w| w[1].distance > w[0].distance));

  // The second fragment's walls start where the first one ends.
  let second = stitched.fragments[1];
  let offset = grid.chunks()[second.chunk]
    .with_builder(1, |b| b.u_offset(second.fragment))
    .expect("layer 1 exists");
  assert!(offset > 0.0);
  let first = stitched.fragments[0];
  let first_length = grid.chunks()[first.chunk]
    .with_builder(1, |b| b.loops()[first.fragment].length())
    .expect("layer 1 exists");
  assert!((offset - first_length).abs() < 1e-4);
}

#[test]
fn test_parallel_matches_serial() {
  let mut serial = grid();
  serial.apply_stencil(&straddling_box(), Dispatch::Serial);
  serial.triangulate(Dispatch::Serial);

  let mut parallel = grid();
  parallel.apply_stencil(&straddling_box(), Dispatch::Parallel);
  assert_eq!(parallel.begin_triangulation(), 4);
  parallel.finish_triangulation();

  assert_eq!(parallel.loops(1), serial.loops(1));
  for (a, b) in parallel.chunks().iter().zip(serial.chunks()) {
    assert_eq!(
      a.with_builder(1, |x| x.surface().clone()),
      b.with_builder(1, |x| x.surface().clone())
    );
  }
}

#[test]
fn test_retriangulation_is_stable() {
  let mut grid = grid();
  let mut rng = StdRng::seed_from_u64(0x5eed);
  for _ in 0..6 {
    let center = Vec2::new(rng.random_range(1.0..15.0), rng.random_range(1.0..15.0));
    let radius = rng.random_range(0.8..3.5);
    let fill = if rng.random_bool(0.25) { EMPTY } else { 1 };
    grid.apply_stencil(&Stencil::new(Shape::circle(center, radius), fill), Dispatch::Serial);
  }
  grid.triangulate(Dispatch::Serial);
  let surfaces: Vec<_> = grid
    .chunks()
    .iter()
    .map(|c| c.with_builder(1, |b| (b.surface().clone(), b.extrusion().cloned(), b.rim().clone())))
    .collect();
  let loops = grid.loops(1).to_vec();

  grid.invalidate_all();
  grid.triangulate(Dispatch::Parallel);
  let again: Vec<_> = grid
    .chunks()
    .iter()
    .map(|c| c.with_builder(1, |b| (b.surface().clone(), b.extrusion().cloned(), b.rim().clone())))
    .collect();
  assert_eq!(again, surfaces);
  assert_eq!(grid.loops(1), loops.as_slice());
}

#[test]
fn test_only_touched_chunks_are_dirty() {
  let mut grid = grid();
  grid.triangulate(Dispatch::Serial);
  assert!(!grid.is_dirty());
  // Inside chunk 3, away from its lower and left borders.
  let stencil = Stencil::new(Shape::circle(Vec2::new(12.0, 12.0), 1.0), 1);
  assert_eq!(grid.apply_stencil(&stencil, Dispatch::Serial), 1);
  assert!(grid.is_dirty());
  assert_eq!(grid.begin_triangulation(), 1);
  grid.finish_triangulation();
  assert_eq!(grid.loops(1).len(), 1);
}

#[test]
fn test_snapshot_restore_round_trip() {
  let mut grid = grid();
  grid.apply_stencil(&straddling_box(), Dispatch::Serial);
  grid.triangulate(Dispatch::Serial);
  let loops = grid.loops(1).to_vec();
  let snapshot = grid.snapshot();

  grid.clear();
  grid.triangulate(Dispatch::Serial);
  assert!(grid.loops(1).is_empty());

  grid.restore(&snapshot);
  grid.triangulate(Dispatch::Serial);
  assert_eq!(grid.loops(1), loops.as_slice());
}

#[test]
fn test_random_edits_never_fold_cap_triangles() {
  let mut grid = grid();
  let mut rng = StdRng::seed_from_u64(40);
  for round in 0..40 {
    let center = Vec2::new(rng.random_range(0.5..15.5), rng.random_range(0.5..15.5));
    let shape = match rng.random_range(0..3) {
      0 => Shape::circle(center, rng.random_range(0.6..4.0)),
      1 => Shape::rect(center, Vec2::new(rng.random_range(0.4..3.0), rng.random_range(0.4..3.0))),
      _ => {
        let r = rng.random_range(1.0..4.0);
        let a = Vec2::new(rng.random_range(-r..r), rng.random_range(-r..r));
        let b = Vec2::new(rng.random_range(-r..r), rng.random_range(-r..r));
        Shape::triangle(center, center + a, center + b)
      }
    };
    let fill = if rng.random_bool(0.3) { EMPTY } else { 1 };
    grid.apply_stencil(&Stencil::new(shape, fill), Dispatch::Serial);
    grid.triangulate(Dispatch::Serial);

    for chunk in grid.chunks() {
      chunk.with_builder(1, |b| {
        let surface = b.surface();
        for t in 0..surface.triangle_count() {
          let area = surface.triangle_area_xy(t);
          assert!(area > -1e-4, "round {round}, chunk {}, triangle {t}: area {area}", chunk.index());
        }
      });
    }
  }
}
