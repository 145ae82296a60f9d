//! Per-material split of the surface cap.

use std::collections::BTreeMap;

use crate::material::{blend_face, vertex_contribution, BlendKey, MaterialMode};
use crate::types::MeshBuffer;

/// Route every cap triangle to the sub-mesh of its face blend key.
///
/// Vertices are duplicated per triangle because a vertex contributes
/// different weights to faces with different keys.
pub fn split_by_blend(surface: &MeshBuffer, mode: MaterialMode) -> BTreeMap<BlendKey, MeshBuffer> {
  let mut out: BTreeMap<BlendKey, MeshBuffer> = BTreeMap::new();
  for tri in surface.indices.chunks_exact(3) {
    let ids = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
    let materials = ids.map(|i| surface.materials[i]);
    let face = blend_face(mode, &materials);
    let buffer = out.entry(face.key).or_default();
    let base: [u32; 3] = std::array::from_fn(|k| {
      buffer.push_vertex(
        surface.positions[ids[k]],
        surface.uvs[ids[k]],
        vertex_contribution(&materials[k], &face),
        surface.tangents[ids[k]],
      )
    });
    buffer.push_triangle(base[0], base[1], base[2]);
  }
  out
}

#[cfg(test)]
#[path = "sub_mesh_test.rs"]
mod sub_mesh_test;
