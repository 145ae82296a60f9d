use super::*;
use crate::voxel::Crossing;

const SHARP: f32 = -0.70710677; // cos(135°)
const PARALLEL: f32 = 0.9902681; // cos(8°)

/// Unit cell with corner fills `[a, b, c, d]` and no crossing data.
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

fn cell(v: &[Voxel; 4]) -> Cell<'_> {
  Cell {
    a: &v[0],
    b: &v[1],
    c: &v[2],
    d: &v[3],
    index: 0,
    voxel_size: 1.0,
    sharp_threshold: SHARP,
    parallel_threshold: PARALLEL,
  }
}

#[test]
fn test_case_mask_roundtrip() {
  for mask in 0..16u8 {
    assert_eq!(CellCase::from_mask(mask).mask(), mask);
  }
}

#[test]
fn test_case_per_layer() {
  let v = voxels([1, 0, 0, 2]);
  let c = cell(&v);
  assert_eq!(c.case(1), CellCase::A);
  assert_eq!(c.case(2), CellCase::D);
  assert_eq!(c.case(0), CellCase::BC);
  assert_eq!(c.distinct_fills(), 3);
}

#[test]
fn test_square_corner_is_sharp() {
  let mut v = voxels([1, 0, 0, 0]);
  v[0].x_crossing = Some(Crossing::new(0.5, Vec2::X));
  v[0].y_crossing = Some(Crossing::new(0.5, Vec2::Y));
  let c = cell(&v);
  let f = c.corner_feature(Corner::A).expect("square corner is sharp");
  assert!((f - Vec2::new(1.0, 1.0)).length() < 1e-5);
}

#[test]
fn test_straight_wall_has_no_feature() {
  let mut v = voxels([1, 0, 0, 0]);
  let n = Vec2::new(1.0, 1.0).normalize();
  v[0].x_crossing = Some(Crossing::new(0.5, n));
  v[0].y_crossing = Some(Crossing::new(0.5, n));
  assert_eq!(cell(&v).corner_feature(Corner::A), None);
}

#[test]
fn test_feature_outside_cell_is_rejected() {
  let mut v = voxels([1, 0, 0, 0]);
  v[0].x_crossing = Some(Crossing::new(0.9, Vec2::new(1.0, -1.0)));
  v[0].y_crossing = Some(Crossing::new(0.95, Vec2::Y));
  assert_eq!(cell(&v).corner_feature(Corner::A), None);
}

#[test]
fn test_uniform_cell_has_no_topology() {
  let v = voxels([3, 3, 3, 3]);
  assert_eq!(cell(&v).topology(), CellTopology::default());
}

#[test]
fn test_straight_off_diagonal_cut_connects() {
  let mut v = voxels([1, 0, 0, 1]);
  let toward_b = Vec2::new(1.0, -1.0).normalize();
  v[0].x_crossing = Some(Crossing::new(0.5, toward_b));
  v[1].y_crossing = Some(Crossing::new(0.5, toward_b));
  assert_eq!(cell(&v).topology().connection, Some(Diagonal::AD));
}

/// Square cuts around b and c with the given edge fractions.
fn square_cut_saddle(t_near: f32, t_far: f32) -> [Voxel; 4] {
  let mut v = voxels([1, 0, 0, 1]);
  // bottom and left are measured from a, right and top from b / c.
  v[0].x_crossing = Some(Crossing::new(t_far, Vec2::X));
  v[1].y_crossing = Some(Crossing::new(t_near, -Vec2::Y));
  v[0].y_crossing = Some(Crossing::new(t_far, Vec2::Y));
  v[2].x_crossing = Some(Crossing::new(t_near, -Vec2::X));
  v
}

#[test]
fn test_small_corner_cuts_connect_diagonal() {
  let v = square_cut_saddle(0.2, 0.8);
  let topo = cell(&v).topology();
  assert_eq!(topo.connection, Some(Diagonal::AD));
  assert_eq!(topo.junction, None);
}

#[test]
fn test_overlapping_corner_cuts_connect_other_diagonal() {
  let v = square_cut_saddle(0.8, 0.2);
  assert_eq!(cell(&v).topology().connection, Some(Diagonal::BC));
}

#[test]
fn test_three_ids_without_connection_get_junction() {
  let v = voxels([1, 2, 0, 0]);
  let topo = cell(&v).topology();
  assert_eq!(topo.connection, None);
  let j = topo.junction.expect("three ids meet");
  assert!((j - Vec2::new(1.0, 2.5 / 3.0)).length() < 1e-5);
}

#[test]
fn test_disconnected_three_id_saddle_gets_junction() {
  let v = voxels([1, 2, 3, 1]);
  let topo = cell(&v).topology();
  assert_eq!(topo.connection, None);
  let j = topo.junction.expect("four regions meet");
  assert!((j - Vec2::new(1.0, 1.0)).length() < 1e-5);
}

/// Saddle whose cut around b has no tangent intersection inside the cell.
fn unsolvable_b_saddle(fills: [u8; 4]) -> [Voxel; 4] {
  let mut v = voxels(fills);
  v[0].x_crossing = Some(Crossing::new(0.9, Vec2::new(1.0, -1.0)));
  v[1].y_crossing = Some(Crossing::new(0.9, -Vec2::Y));
  v[0].y_crossing = Some(Crossing::new(0.7, Vec2::Y));
  v[2].x_crossing = Some(Crossing::new(0.3, -Vec2::X));
  v
}

#[test]
fn test_unsolvable_saddle_falls_back_to_fill_order() {
  let v = unsolvable_b_saddle([2, 1, 1, 2]);
  let c = cell(&v);
  assert!([Corner::A, Corner::B, Corner::C, Corner::D]
    .iter()
    .all(|&k| !c.cut_is_straight(k)));
  assert_eq!(c.cut_candidate(Corner::B), None);
  assert!(c.cut_candidate(Corner::C).is_some());
  let topo = c.topology();
  assert_eq!(topo.connection, Some(Diagonal::AD));
  assert_eq!(topo.junction, None);

  // Same geometry with the ids swapped: the b-c pair is now higher.
  let v = unsolvable_b_saddle([1, 2, 2, 1]);
  assert_eq!(cell(&v).topology().connection, Some(Diagonal::BC));
}

#[test]
fn test_solved_feature_stays_inside_cell() {
  // Tangents meet just past the top edge, inside the tolerance band.
  let v = voxels([1, 0, 0, 0]);
  let c = cell(&v);
  let f = c
    .solve_tangents(Vec2::new(1.0, 0.5), Vec2::X, Vec2::new(0.5, 1.5 + 0.5e-4), Vec2::Y)
    .expect("within tolerance");
  assert!(f.y <= 1.5);
  assert!((f - Vec2::new(1.0, 1.5)).length() < 1e-3);
}
