use super::*;

#[test]
fn test_aabb_encapsulate() {
  let mut aabb = MinMaxAABB::empty();
  assert!(!aabb.is_valid());
  aabb.encapsulate([1.0, 2.0, 3.0]);
  aabb.encapsulate([-1.0, -2.0, -3.0]);

  assert_eq!(aabb.min, [-1.0, -2.0, -3.0]);
  assert_eq!(aabb.max, [1.0, 2.0, 3.0]);
  assert!(aabb.is_valid());
}

#[test]
fn test_mesh_buffer_push_and_clear() {
  let mut buffer = MeshBuffer::new();
  let a = buffer.push_vertex([0.0, 0.0, 0.0], [0.0, 0.0], Material::Single(1), [1.0, 0.0, 0.0, -1.0]);
  let b = buffer.push_vertex([1.0, 0.0, 0.0], [1.0, 0.0], Material::Single(1), [1.0, 0.0, 0.0, -1.0]);
  let c = buffer.push_vertex([0.0, 1.0, 0.0], [0.0, 1.0], Material::Single(1), [1.0, 0.0, 0.0, -1.0]);
  buffer.push_triangle(a, b, c);

  assert_eq!((a, b, c), (0, 1, 2));
  assert_eq!(buffer.triangle_count(), 1);
  assert!((buffer.triangle_area_xy(0) - 0.5).abs() < 1e-6);
  assert_eq!(buffer.bounds.max, [1.0, 1.0, 0.0]);

  buffer.clear();
  assert!(buffer.is_empty());
  assert_eq!(buffer.triangle_count(), 0);
  assert!(!buffer.bounds.is_valid());
}

#[test]
fn test_rect_overlap_and_contains() {
  let r = Rect2::from_origin_size(Vec2::ZERO, Vec2::splat(2.0));
  assert!(r.contains(Vec2::new(1.0, 2.0)));
  assert!(!r.contains(Vec2::new(2.1, 0.0)));
  assert!(r.overlaps(&Rect2::new(Vec2::splat(1.5), Vec2::splat(3.0))));
  assert!(!r.overlaps(&Rect2::new(Vec2::splat(2.5), Vec2::splat(3.0))));
}
