use super::*;
use crate::cell::Cell;
use crate::voxel::Crossing;

const SHARP: f32 = -0.70710677;
const PARALLEL: f32 = 0.9902681;

fn settings(layer: LayerConfig) -> BuilderSettings {
  BuilderSettings {
    fill: 1,
    layer,
    voxel_size: 1.0,
    chunk_size: 2.0,
    origin: Vec2::ZERO,
    grid_size: 2.0,
    extrusion_height: 1.0,
    material_mode: MaterialMode::DoubleIndex,
  }
}

fn voxels(fills: [u8; 4]) -> [Voxel; 4] {
  let mut out = [
    Voxel::new(0, 0, 1.0),
    Voxel::new(1, 0, 1.0),
    Voxel::new(0, 1, 1.0),
    Voxel::new(1, 1, 1.0),
  ];
  for (v, f) in out.iter_mut().zip(fills) {
    v.fill = f;
  }
  out
}

/// Corner `a` filled, cut by a straight diagonal wall.
fn straight_corner() -> [Voxel; 4] {
  let mut v = voxels([1, 0, 0, 0]);
  let n = Vec2::new(1.0, 1.0).normalize();
  v[0].x_crossing = Some(Crossing::new(0.5, n));
  v[0].y_crossing = Some(Crossing::new(0.5, n));
  v
}

/// Sweep a single cell the way a chunk sweeps its rows.
fn build(layer: LayerConfig, v: &[Voxel; 4]) -> SurfaceBuilder {
  build_fill(1, layer, v)
}

fn build_fill(fill: u8, layer: LayerConfig, v: &[Voxel; 4]) -> SurfaceBuilder {
  let mut builder = SurfaceBuilder::new(BuilderSettings {
    fill,
    ..settings(layer)
  });
  builder.begin(2);
  builder.cache_first_corner(&v[0]);
  builder.cache_next_edge_and_corner(0, &v[0], &v[1]);
  builder.prepare_next_row();
  builder.cache_first_corner(&v[2]);
  builder.cache_next_edge_and_corner(0, &v[2], &v[3]);
  builder.cache_next_middle_edge(&v[0], &v[2]);
  builder.cache_next_middle_edge(&v[1], &v[3]);
  let cell = Cell {
    a: &v[0],
    b: &v[1],
    c: &v[2],
    d: &v[3],
    index: 0,
    voxel_size: 1.0,
    sharp_threshold: SHARP,
    parallel_threshold: PARALLEL,
  };
  builder.triangulate_cell(0, &cell, &cell.topology());
  builder.finalize();
  builder
}

fn has_position(buffer: &MeshBuffer, p: [f32; 3]) -> bool {
  buffer
    .positions
    .iter()
    .any(|q| (Vec2::new(q[0], q[1]) - Vec2::new(p[0], p[1])).length() < 1e-5 && (q[2] - p[2]).abs() < 1e-5)
}

#[test]
fn test_full_cell_is_one_quad() {
  let builder = build(LayerConfig::new(), &voxels([1, 1, 1, 1]));
  assert_eq!(builder.surface().vertex_count(), 4);
  assert_eq!(builder.surface().triangle_count(), 2);
  assert!(builder.loops().is_empty());
  for t in 0..2 {
    assert!(builder.surface().triangle_area_xy(t) > 0.0);
  }
}

#[test]
fn test_straight_corner_is_one_triangle() {
  let builder = build(LayerConfig::new(), &straight_corner());
  let surface = builder.surface();
  assert_eq!(surface.vertex_count(), 3);
  assert_eq!(surface.triangle_count(), 1);
  assert!(surface.triangle_area_xy(0) > 0.0);

  assert_eq!(builder.loops().len(), 1);
  let edge_loop = &builder.loops()[0];
  assert!(!edge_loop.closed);
  assert_eq!(edge_loop.len(), 2);
  // Outward normal points away from the filled corner.
  let n = edge_loop.points[0].normal;
  assert!(n.x > 0.0 && n.y > 0.0);
}

#[test]
fn test_sharp_corner_is_quad_with_feature() {
  let builder = build(LayerConfig::new(), &voxels([1, 0, 0, 0]));
  let surface = builder.surface();
  assert_eq!(surface.vertex_count(), 4);
  assert_eq!(surface.triangle_count(), 2);
  assert!(has_position(surface, [1.0, 1.0, 0.0]));
  for t in 0..2 {
    assert!(surface.triangle_area_xy(t) > 0.0);
  }
  assert_eq!(builder.loops()[0].len(), 3);
}

#[test]
fn test_other_layer_ignores_cell() {
  let mut builder = SurfaceBuilder::new(BuilderSettings {
    fill: 2,
    ..settings(LayerConfig::new())
  });
  let v = voxels([1, 1, 1, 1]);
  builder.begin(2);
  builder.cache_first_corner(&v[0]);
  builder.cache_next_edge_and_corner(0, &v[0], &v[1]);
  assert!(builder.surface().is_empty());
}

#[test]
fn test_extrusion_mirrors_cap_and_adds_walls() {
  let builder = build(LayerConfig::new().with_extrusion(true), &straight_corner());
  let extrusion = builder.extrusion().expect("layer extrudes");
  // Three back-cap vertices plus one wall quad.
  assert_eq!(extrusion.vertex_count(), 7);
  assert_eq!(extrusion.triangle_count(), 3);
  for k in 0..3 {
    assert_eq!(extrusion.positions[k][2], -1.0);
  }
  assert_eq!(&builder.surface().indices[..], &[0, 1, 2]);
  assert_eq!(&extrusion.indices[..3], &[0, 2, 1]);

  assert_eq!(extrusion.uvs[3], [0.0, 0.0]);
  assert_eq!(extrusion.uvs[6], [0.0, 1.0]);
  assert!((extrusion.uvs[4][0] - 0.5f32.sqrt()).abs() < 1e-5);
  assert_eq!(extrusion.positions[5][2], -1.0);
}

#[test]
fn test_extrusion_only_layer_drops_surface() {
  let layer = LayerConfig::new().with_surface(false).with_extrusion(true);
  let builder = build(layer, &straight_corner());
  assert!(builder.surface().is_empty());
  assert!(builder.sub_meshes().is_empty());
  assert_eq!(builder.extrusion().map(|e| e.triangle_count()), Some(3));
  assert_eq!(builder.loops().len(), 1);
}

#[test]
fn test_rim_rows_inset_along_normal() {
  let builder = build(LayerConfig::new().with_rim(0.25, 2), &straight_corner());
  let rim = builder.rim();
  assert_eq!(rim.vertex_count(), 6);
  assert_eq!(rim.triangle_count(), 4);
  let n = Vec2::new(1.0, 1.0).normalize();
  let inner = Vec2::new(1.0, 0.5) - n * 0.25;
  assert!((Vec2::new(rim.positions[4][0], rim.positions[4][1]) - inner).length() < 1e-5);
  assert_eq!(rim.uvs[4][1], 1.0);
  assert_eq!(rim.tangents[2][3], 0.5);
  for t in 0..rim.triangle_count() {
    assert!(rim.triangle_area_xy(t) > 0.0);
  }
}

#[test]
fn test_apply_u_offset_is_absolute() {
  let layer = LayerConfig::new().with_extrusion(true).with_rim(0.25, 1);
  let mut builder = build(layer, &straight_corner());
  builder.apply_u_offset(0, 2.0);
  builder.apply_u_offset(0, 2.0);
  assert_eq!(builder.u_offset(0), 2.0);

  let extrusion = builder.extrusion().expect("layer extrudes");
  assert_eq!(extrusion.uvs[3][0], 2.0);
  assert!((extrusion.uvs[4][0] - (2.0 + 0.5f32.sqrt())).abs() < 1e-5);
  // Back cap UVs are untouched.
  assert_eq!(extrusion.uvs[0], builder.surface().uvs[0]);
  assert_eq!(builder.rim().uvs[0][0], 2.0);
  assert_eq!(builder.rim().tangents[0][2], 2.0);

  // Unknown fragments are ignored.
  builder.apply_u_offset(9, 1.0);
}

#[test]
fn test_cap_uv_modes() {
  let v = straight_corner();
  let local = build(LayerConfig::new(), &v);
  assert_eq!(local.surface().uvs[0], [0.25, 0.25]);

  let mut builder = SurfaceBuilder::new(BuilderSettings {
    origin: Vec2::new(2.0, 0.0),
    grid_size: 4.0,
    ..settings(LayerConfig::new().with_uv_remap(true))
  });
  builder.begin(2);
  builder.cache_first_corner(&v[0]);
  assert_eq!(builder.surface().uvs[0], [0.625, 0.125]);
}

#[test]
fn test_open_saddle_pinches_into_two_fans() {
  let builder = build(LayerConfig::new(), &voxels([1, 0, 0, 1]));
  assert_eq!(builder.surface().triangle_count(), 4);
  assert_eq!(builder.loops().len(), 2);
  assert_eq!(builder.syncs().len(), 2);
}

#[test]
fn test_sub_meshes_cover_surface() {
  let builder = build(LayerConfig::new(), &voxels([1, 1, 1, 1]));
  let total: usize = builder.sub_meshes().values().map(|m| m.triangle_count()).sum();
  assert_eq!(total, builder.surface().triangle_count());
}

fn assert_all_ccw(surface: &MeshBuffer) {
  for t in 0..surface.triangle_count() {
    let area = surface.triangle_area_xy(t);
    assert!(area > 0.0, "triangle {t} has area {area}");
  }
}

fn total_area(surface: &MeshBuffer) -> f32 {
  (0..surface.triangle_count()).map(|t| surface.triangle_area_xy(t)).sum()
}

#[test]
fn test_three_corner_cases_are_hexagons() {
  // Empty corner d, c, b and a in turn, notched square at the cell center.
  for fills in [[1, 1, 1, 0], [1, 1, 0, 1], [1, 0, 1, 1], [0, 1, 1, 1]] {
    let builder = build(LayerConfig::new(), &voxels(fills));
    let surface = builder.surface();
    assert_eq!(surface.triangle_count(), 4, "{fills:?}");
    assert_all_ccw(surface);
    assert!((total_area(surface) - 0.75).abs() < 1e-5, "{fills:?}");
    assert_eq!(builder.loops().len(), 1, "{fills:?}");
    assert_eq!(builder.loops()[0].len(), 3, "{fills:?}");
  }
}

#[test]
fn test_reflex_feature_fans_from_the_feature() {
  // Thin empty wedge around b reaching into the cell up to (0.9, 0.9).
  let mut v = voxels([1, 0, 1, 1]);
  v[0].x_crossing = Some(Crossing::new(0.9, Vec2::new(0.4, 0.5).normalize()));
  v[1].y_crossing = Some(Crossing::new(0.1, Vec2::new(-0.3, -0.6).normalize()));
  let builder = build(LayerConfig::new().with_extrusion(true), &v);
  let surface = builder.surface();

  assert!(has_position(surface, [0.9, 0.9, 0.0]));
  assert_eq!(surface.triangle_count(), 4);
  assert_all_ccw(surface);
  assert!((total_area(surface) - 0.95).abs() < 1e-4);

  // The back cap mirrors every cap triangle.
  let extrusion = builder.extrusion().expect("layer extrudes");
  for t in 0..4 {
    assert!(extrusion.triangle_area_xy(t) < 0.0);
  }

  assert_eq!(builder.loops().len(), 1);
  assert_eq!(builder.loops()[0].len(), 3);
}

#[test]
fn test_connected_saddle_is_two_pentagons() {
  // Square notches of 0.2 around b and c, joined along a-d.
  let mut v = voxels([1, 0, 0, 1]);
  v[0].x_crossing = Some(Crossing::new(0.8, Vec2::X));
  v[1].y_crossing = Some(Crossing::new(0.2, -Vec2::Y));
  v[0].y_crossing = Some(Crossing::new(0.8, Vec2::Y));
  v[2].x_crossing = Some(Crossing::new(0.2, -Vec2::X));
  let builder = build(LayerConfig::new(), &v);
  let surface = builder.surface();

  assert!(has_position(surface, [1.3, 0.7, 0.0]));
  assert!(has_position(surface, [0.7, 1.3, 0.0]));
  assert_eq!(surface.triangle_count(), 6);
  assert_all_ccw(surface);
  assert!((total_area(surface) - 0.92).abs() < 1e-4);

  assert_eq!(builder.loops().len(), 2);
  assert!(builder.loops().iter().all(|l| l.len() == 3 && !l.closed));
}

#[test]
fn test_fill_fallback_saddle_connects_higher_fill() {
  // Fills 2 on a-d, 1 on b-c. The cut around b has no in-cell solution,
  // so the higher fill decides and a-d connects.
  let mut v = voxels([2, 1, 1, 2]);
  v[0].x_crossing = Some(Crossing::new(0.9, Vec2::new(1.0, -1.0).normalize()));
  v[1].y_crossing = Some(Crossing::new(0.9, -Vec2::Y));
  v[0].y_crossing = Some(Crossing::new(0.7, Vec2::Y));
  v[2].x_crossing = Some(Crossing::new(0.3, -Vec2::X));
  let builder = build_fill(2, LayerConfig::new(), &v);
  let surface = builder.surface();

  // Quad through the unsolved b side, pentagon through the c feature.
  assert!(has_position(surface, [0.8, 1.2, 0.0]));
  assert_eq!(surface.triangle_count(), 5);
  assert_all_ccw(surface);

  let mut lengths: Vec<usize> = builder.loops().iter().map(|l| l.len()).collect();
  lengths.sort_unstable();
  assert_eq!(lengths, vec![2, 3]);
}

#[test]
fn test_saddle_feature_across_diagonal_is_dropped() {
  // Straight cut at c joins a-d; the square notch at b would reach past
  // the a-d diagonal to (0.6, 1.4).
  let mut v = voxels([1, 0, 0, 1]);
  let straight = Vec2::new(-1.0, 1.0);
  v[0].x_crossing = Some(Crossing::new(0.1, Vec2::X));
  v[1].y_crossing = Some(Crossing::new(0.9, -Vec2::Y));
  v[0].y_crossing = Some(Crossing::new(0.9, straight));
  v[2].x_crossing = Some(Crossing::new(0.1, straight));
  let builder = build(LayerConfig::new(), &v);
  let surface = builder.surface();

  assert!(!has_position(surface, [0.6, 1.4, 0.0]));
  assert_eq!(surface.triangle_count(), 4);
  assert_all_ccw(surface);
  assert_eq!(builder.loops().len(), 2);
  assert!(builder.loops().iter().all(|l| l.len() == 2));
}
