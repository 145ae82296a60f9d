//! Face material resolution.
//!
//! A triangle carries three vertex materials but is rendered with one
//! palette combination (the blend key). Resolution works on a strength table:
//!
//! ```text
//!   vertex 0: (3, 200) (7, 55)
//!   vertex 1: (3, 255)              ──►  3: 255   7: 90   9: 30
//!   vertex 2: (7, 90)  (9, 30)           (max strength per palette id)
//! ```
//!
//! The strongest ids become the key; every vertex then gets weights expressed
//! in the key's slot layout so the shader can blend inside the face.

use smallvec::SmallVec;

use super::{fix_residue, Material, MaterialMode, Slot};
use crate::constants::FULL_WEIGHT;

/// Palette combination shared by every vertex of a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlendKey {
  /// Vertex colors, no palette lookup.
  Color,
  Single(u8),
  Double(u8, u8),
  Triple(u8, u8, u8),
}

impl BlendKey {
  /// Palette indices of the key in ascending order.
  pub fn indices(&self) -> SmallVec<[u8; 3]> {
    match *self {
      BlendKey::Color => SmallVec::new(),
      BlendKey::Single(a) => SmallVec::from_slice(&[a]),
      BlendKey::Double(a, b) => SmallVec::from_slice(&[a, b]),
      BlendKey::Triple(a, b, c) => SmallVec::from_slice(&[a, b, c]),
    }
  }

  /// Express `weight_of` in this key's layout.
  fn material_with(&self, weight_of: impl Fn(u8) -> u8) -> Material {
    match *self {
      BlendKey::Color => Material::Color([FULL_WEIGHT; 4]),
      BlendKey::Single(a) => Material::Single(a),
      BlendKey::Double(a, b) => {
        let mut slots = [(a, weight_of(a)), (b, weight_of(b))];
        fix_residue(&mut slots, FULL_WEIGHT as i32);
        Material::Double {
          a,
          b,
          blend: slots[1].1,
        }
      }
      BlendKey::Triple(a, b, c) => {
        let mut slots = [(a, weight_of(a)), (b, weight_of(b)), (c, weight_of(c))];
        fix_residue(&mut slots, FULL_WEIGHT as i32);
        Material::Triple {
          indices: [a, b, c],
          weights: [slots[0].1, slots[1].1],
        }
      }
    }
  }
}

/// Resolved face material: the key and the face-wide blend in key layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBlend {
  pub key: BlendKey,
  pub material: Material,
}

/// Max-strength table keyed by palette id, in first-seen order.
#[derive(Default)]
struct StrengthTable {
  entries: SmallVec<[Slot; 9]>,
}

impl StrengthTable {
  fn insert(&mut self, index: u8, strength: u8) {
    match self.entries.iter_mut().find(|(i, _)| *i == index) {
      Some(entry) => entry.1 = entry.1.max(strength),
      None => self.entries.push((index, strength)),
    }
  }

  fn insert_material(&mut self, material: &Material, max_slots: usize) {
    match *material {
      Material::Color(_) => {}
      Material::Single(i) => self.insert(i, FULL_WEIGHT),
      Material::Double { a, b, blend } => {
        self.insert(a, FULL_WEIGHT - blend);
        self.insert(b, blend);
      }
      Material::Triple { .. } => {
        for (i, w) in material.slots().into_iter().take(max_slots) {
          self.insert(i, w);
        }
      }
    }
  }

  /// The `n` strongest entries. A later entry only displaces an earlier one
  /// when strictly stronger, so ties favour the first-seen id.
  fn top(&self, n: usize) -> SmallVec<[Slot; 3]> {
    let mut taken = [false; 9];
    let mut out = SmallVec::new();
    for _ in 0..n {
      let mut best: Option<usize> = None;
      for (k, entry) in self.entries.iter().enumerate() {
        if taken[k] {
          continue;
        }
        match best {
          Some(b) if self.entries[b].1 >= entry.1 => {}
          _ => best = Some(k),
        }
      }
      match best {
        Some(k) => {
          taken[k] = true;
          out.push(self.entries[k]);
        }
        None => break,
      }
    }
    out
  }
}

/// Pairwise blend from the strongest and second-strongest entries.
fn pair_blend(first: Slot, second: Slot) -> FaceBlend {
  let blend = (((FULL_WEIGHT - first.1) as u16 + second.1 as u16) / 2) as u8;
  let (a, b, blend) = super::sort_double_index(first.0, second.0, blend);
  FaceBlend {
    key: BlendKey::Double(a, b),
    material: Material::Double { a, b, blend },
  }
}

fn single_blend(index: u8) -> FaceBlend {
  FaceBlend {
    key: BlendKey::Single(index),
    material: Material::Single(index),
  }
}

/// Resolve a face key from three double-index (or single) vertex materials.
pub fn blend_double(materials: &[Material; 3]) -> FaceBlend {
  let mut table = StrengthTable::default();
  for m in materials {
    table.insert_material(m, 2);
  }
  let top = table.top(2);
  match top.len() {
    0 => single_blend(0),
    1 => single_blend(top[0].0),
    _ => pair_blend(top[0], top[1]),
  }
}

/// Resolve a face key from three triple-index (or narrower) vertex materials.
pub fn blend_triple(materials: &[Material; 3]) -> FaceBlend {
  let mut table = StrengthTable::default();
  for m in materials {
    table.insert_material(m, 3);
  }
  let top = table.top(3);
  match top.len() {
    0 => single_blend(0),
    1 => single_blend(top[0].0),
    2 => pair_blend(top[0], top[1]),
    _ => {
      let mut ids = [top[0].0, top[1].0, top[2].0];
      let mut strengths = [top[0].1 as u32, top[1].1 as u32, top[2].1 as u32];
      // Sort ascending, swapping strengths with their ids.
      for (l, r) in [(0, 1), (1, 2), (0, 1)] {
        if ids[l] > ids[r] {
          ids.swap(l, r);
          strengths.swap(l, r);
        }
      }
      let total: u32 = strengths.iter().sum();
      let mut slots: [Slot; 3] = if total == 0 {
        [(ids[0], 85), (ids[1], 85), (ids[2], 85)]
      } else {
        std::array::from_fn(|k| {
          let w = (strengths[k] * FULL_WEIGHT as u32 + total / 2) / total;
          (ids[k], w as u8)
        })
      };
      fix_residue(&mut slots, FULL_WEIGHT as i32);
      FaceBlend {
        key: BlendKey::Triple(ids[0], ids[1], ids[2]),
        material: Material::Triple {
          indices: ids,
          weights: [slots[0].1, slots[1].1],
        },
      }
    }
  }
}

/// Resolve the face blend for the grid's material mode.
pub fn blend_face(mode: MaterialMode, materials: &[Material; 3]) -> FaceBlend {
  match mode {
    MaterialMode::Color => FaceBlend {
      key: BlendKey::Color,
      material: materials[0],
    },
    MaterialMode::SingleIndex => {
      let mut table = StrengthTable::default();
      for m in materials {
        table.insert_material(m, 1);
      }
      single_blend(table.top(1).first().map(|&(i, _)| i).unwrap_or(0))
    }
    MaterialMode::DoubleIndex => blend_double(materials),
    MaterialMode::TripleIndex => blend_triple(materials),
  }
}

/// Weights a single vertex contributes to a face resolved as `face`.
///
/// - the vertex's own id set equals the key: reuse its native blend;
/// - the vertex collapses to one id contained in the key: full weight there;
/// - anything else: the face-wide blend.
pub fn vertex_contribution(vertex: &Material, face: &FaceBlend) -> Material {
  if face.key == BlendKey::Color {
    return *vertex;
  }
  let key_ids = face.key.indices();
  let own = vertex.active_indices();
  if own == key_ids {
    return face.key.material_with(|i| vertex.weight_of(i));
  }
  if let Some(dominant) = vertex.dominant_index() {
    if key_ids.contains(&dominant) {
      return face
        .key
        .material_with(|i| if i == dominant { FULL_WEIGHT } else { 0 });
    }
  }
  face.material
}

#[cfg(test)]
#[path = "blend_test.rs"]
mod blend_test;
