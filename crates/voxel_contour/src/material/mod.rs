//! Per-voxel material encodings.
//!
//! A material is one of four interpretations of the same voxel slot:
//!
//! ```text
//! Color   RGBA                      vertex colors, no palette
//! Single  i                         one palette index at full weight
//! Double  a <= b, blend             a weighs 255 - blend, b weighs blend
//! Triple  i0 <= i1 <= i2, w0, w1    i2 weighs 255 - w0 - w1
//! ```
//!
//! Palette indices are kept sorted ascending at all times. Every mutation
//! goes through [`Material::from_slots`] or one of the `sort_*` helpers so the
//! invariant can never be observed broken.

pub mod blend;
pub mod packed;
pub mod paint;

pub use blend::{blend_double, blend_face, blend_triple, vertex_contribution, BlendKey, FaceBlend};
pub use paint::{paint, BlendPolicy, MaterialPaint, PaintTarget};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::FULL_WEIGHT;

/// Palette index with its weight (0-255).
pub type Slot = (u8, u8);

/// Up to three weighted palette slots.
pub type Slots = SmallVec<[Slot; 3]>;

/// How voxel materials are interpreted by the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialMode {
  /// Raw RGBA vertex colors.
  Color,
  /// One palette index per voxel.
  SingleIndex,
  /// Two palette indices and a blend.
  #[default]
  DoubleIndex,
  /// Three palette indices and two blends.
  TripleIndex,
}

impl MaterialMode {
  /// Maximum number of palette slots a voxel may hold in this mode.
  pub fn max_slots(self) -> usize {
    match self {
      MaterialMode::Color => 0,
      MaterialMode::SingleIndex => 1,
      MaterialMode::DoubleIndex => 2,
      MaterialMode::TripleIndex => 3,
    }
  }
}

/// Material value stored per voxel and per vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
  Color([u8; 4]),
  Single(u8),
  Double { a: u8, b: u8, blend: u8 },
  Triple { indices: [u8; 3], weights: [u8; 2] },
}

impl Default for Material {
  fn default() -> Self {
    Material::Single(0)
  }
}

/// Order a double-index pair ascending.
///
/// Swapping the indices inverts the blend so the weights stay attached to
/// their index. Already sorted input is returned unchanged.
#[inline]
pub fn sort_double_index(a: u8, b: u8, blend: u8) -> (u8, u8, u8) {
  if a > b {
    (b, a, FULL_WEIGHT - blend)
  } else {
    (a, b, blend)
  }
}

/// Order a triple-index set ascending, carrying the full weights along.
pub fn sort_triple_index(indices: [u8; 3], weights: [u8; 3]) -> ([u8; 3], [u8; 3]) {
  let mut pairs = [
    (indices[0], weights[0]),
    (indices[1], weights[1]),
    (indices[2], weights[2]),
  ];
  // Three elements: a fixed compare-swap network keeps this branch-light.
  if pairs[0].0 > pairs[1].0 {
    pairs.swap(0, 1);
  }
  if pairs[1].0 > pairs[2].0 {
    pairs.swap(1, 2);
  }
  if pairs[0].0 > pairs[1].0 {
    pairs.swap(0, 1);
  }
  (
    [pairs[0].0, pairs[1].0, pairs[2].0],
    [pairs[0].1, pairs[1].1, pairs[2].1],
  )
}

impl Material {
  /// Double-index material, sorted on construction.
  pub fn double(a: u8, b: u8, blend: u8) -> Self {
    let (a, b, blend) = sort_double_index(a, b, blend);
    Material::Double { a, b, blend }
  }

  /// Triple-index material from three full weights, sorted on construction.
  ///
  /// The weights must sum to 255; the third one is implied once stored.
  pub fn triple(indices: [u8; 3], weights: [u8; 3]) -> Self {
    debug_assert_eq!(
      weights.iter().map(|&w| w as u32).sum::<u32>(),
      FULL_WEIGHT as u32,
      "triple weights must sum to 255"
    );
    let (indices, weights) = sort_triple_index(indices, weights);
    Material::Triple {
      indices,
      weights: [weights[0], weights[1]],
    }
  }

  /// Narrow a wider integer into a material byte.
  ///
  /// # Panics
  /// Values outside 0-255 are programming errors.
  pub fn narrow(value: i32) -> u8 {
    assert!(
      (0..=FULL_WEIGHT as i32).contains(&value),
      "material byte out of range: {value}"
    );
    value as u8
  }

  pub fn is_color(&self) -> bool {
    matches!(self, Material::Color(_))
  }

  /// Weighted palette slots in ascending index order.
  ///
  /// Duplicate indices are merged; zero-weight slots are kept so callers can
  /// see the full encoding. Color materials have no slots.
  pub fn slots(&self) -> Slots {
    let mut slots = Slots::new();
    match *self {
      Material::Color(_) => {}
      Material::Single(i) => slots.push((i, FULL_WEIGHT)),
      Material::Double { a, b, blend } => {
        if a == b {
          slots.push((a, FULL_WEIGHT));
        } else {
          slots.push((a, FULL_WEIGHT - blend));
          slots.push((b, blend));
        }
      }
      Material::Triple { indices, weights } => {
        let w2 = FULL_WEIGHT
          .saturating_sub(weights[0])
          .saturating_sub(weights[1]);
        let full = [weights[0], weights[1], w2];
        for (k, &index) in indices.iter().enumerate() {
          match slots.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = slot.1.saturating_add(full[k]),
            None => slots.push((index, full[k])),
          }
        }
      }
    }
    slots
  }

  /// Sorted palette indices carrying a non-zero weight.
  pub fn active_indices(&self) -> SmallVec<[u8; 3]> {
    self
      .slots()
      .into_iter()
      .filter(|&(_, w)| w > 0)
      .map(|(i, _)| i)
      .collect()
  }

  /// Weight of `index` in this material (0 when absent).
  pub fn weight_of(&self, index: u8) -> u8 {
    self
      .slots()
      .iter()
      .find(|(i, _)| *i == index)
      .map(|&(_, w)| w)
      .unwrap_or(0)
  }

  /// The index holding all of the weight, if the blend collapses to one id.
  pub fn dominant_index(&self) -> Option<u8> {
    let active = self.active_indices();
    if active.len() == 1 {
      Some(active[0])
    } else {
      None
    }
  }

  /// Build the tightest encoding for a set of weighted slots.
  ///
  /// Zero-weight slots are dropped, indices are sorted, and weights are
  /// expected to sum to 255.
  pub fn from_slots(slots: &[Slot]) -> Self {
    let mut live: Slots = slots.iter().copied().filter(|&(_, w)| w > 0).collect();
    live.sort_unstable_by_key(|&(i, _)| i);
    match live.len() {
      0 => Material::default(),
      1 => Material::Single(live[0].0),
      2 => Material::Double {
        a: live[0].0,
        b: live[1].0,
        blend: live[1].1,
      },
      _ => {
        debug_assert!(live.len() == 3, "at most three material slots");
        Material::Triple {
          indices: [live[0].0, live[1].0, live[2].0],
          weights: [live[0].1, live[1].1],
        }
      }
    }
  }

  /// Re-sort in place after a direct field mutation.
  pub fn resort(&mut self) {
    match *self {
      Material::Double { a, b, blend } => {
        let (a, b, blend) = sort_double_index(a, b, blend);
        *self = Material::Double { a, b, blend };
      }
      Material::Triple { indices, weights } => {
        let w2 = FULL_WEIGHT
          .saturating_sub(weights[0])
          .saturating_sub(weights[1]);
        let (indices, full) = sort_triple_index(indices, [weights[0], weights[1], w2]);
        *self = Material::Triple {
          indices,
          weights: [full[0], full[1]],
        };
      }
      Material::Color(_) | Material::Single(_) => {}
    }
  }

  /// Replace the palette index in `slot`, keeping its weight, then re-sort.
  pub fn set_index(&mut self, slot: usize, index: u8) {
    match self {
      Material::Single(i) => {
        assert!(slot == 0, "single material has one slot");
        *i = index;
      }
      Material::Double { a, b, .. } => match slot {
        0 => *a = index,
        1 => *b = index,
        _ => panic!("double material slot out of range: {slot}"),
      },
      Material::Triple { indices, .. } => {
        assert!(slot < 3, "triple material slot out of range: {slot}");
        indices[slot] = index;
      }
      Material::Color(_) => panic!("color material has no palette slots"),
    }
    self.resort();
  }

  /// Convert into the representation used by `mode`.
  ///
  /// Narrowing keeps the heaviest slots and renormalizes the kept weights.
  pub fn to_mode(&self, mode: MaterialMode) -> Material {
    match (mode, self) {
      (MaterialMode::Color, Material::Color(_)) => *self,
      (MaterialMode::Color, _) => {
        let i = self.slots().first().map(|&(i, _)| i).unwrap_or(0);
        Material::Color([i, i, i, FULL_WEIGHT])
      }
      (_, Material::Color(rgba)) => Material::Single(rgba[0]),
      (mode, _) => {
        let mut slots = self.slots();
        if slots.len() <= mode.max_slots() {
          return *self;
        }
        // Heaviest first, earlier slot wins ties.
        slots.sort_by(|l, r| r.1.cmp(&l.1));
        slots.truncate(mode.max_slots());
        Material::from_slots(&normalize_slots(&slots))
      }
    }
  }
}

/// Rescale slot weights so they sum to exactly 255.
///
/// Rounding residue goes to the heaviest slot. All-zero input spreads the
/// weight onto the first slot.
pub fn normalize_slots(slots: &[Slot]) -> Slots {
  let mut out: Slots = slots.iter().copied().collect();
  if out.is_empty() {
    return out;
  }
  let total: u32 = out.iter().map(|&(_, w)| w as u32).sum();
  if total == 0 {
    out[0].1 = FULL_WEIGHT;
    return out;
  }
  for slot in out.iter_mut() {
    slot.1 = ((slot.1 as u32 * FULL_WEIGHT as u32 + total / 2) / total) as u8;
  }
  fix_residue(&mut out, FULL_WEIGHT as i32);
  out
}

/// Push the difference between `target` and the slot sum onto the heaviest
/// slot so the weights add up exactly.
pub(crate) fn fix_residue(slots: &mut [Slot], target: i32) {
  let sum: i32 = slots.iter().map(|&(_, w)| w as i32).sum();
  let diff = target - sum;
  if diff == 0 || slots.is_empty() {
    return;
  }
  let heaviest = slots
    .iter()
    .enumerate()
    .fold(0, |best, (k, s)| if s.1 > slots[best].1 { k } else { best });
  let fixed = (slots[heaviest].1 as i32 + diff).clamp(0, FULL_WEIGHT as i32);
  slots[heaviest].1 = fixed as u8;
}
