//! Painting a target material into existing voxel material state.

use serde::{Deserialize, Serialize};

use super::{fix_residue, Material, MaterialMode, Slot, Slots};
use crate::constants::FULL_WEIGHT;

/// How a painted weight combines with the weight already present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendPolicy {
  /// Keep the larger of the old and new weight.
  #[default]
  Max,
  /// Move the old weight towards full weight (255) by alpha. Unlike `Max`
  /// and `Copy`, alpha is the step size here, not the target weight.
  Lerp,
  /// Take the new weight outright.
  Copy,
}

/// What a stencil paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaintTarget {
  Index(u8),
  Color([u8; 4]),
}

/// Material descriptor carried by a stencil.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialPaint {
  pub target: PaintTarget,
  pub policy: BlendPolicy,
  /// Paint strength in [0, 1].
  pub alpha: f32,
}

impl MaterialPaint {
  pub fn index(index: u8) -> Self {
    Self {
      target: PaintTarget::Index(index),
      policy: BlendPolicy::default(),
      alpha: 1.0,
    }
  }

  pub fn color(rgba: [u8; 4]) -> Self {
    Self {
      target: PaintTarget::Color(rgba),
      policy: BlendPolicy::default(),
      alpha: 1.0,
    }
  }

  pub fn with_policy(mut self, policy: BlendPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_alpha(mut self, alpha: f32) -> Self {
    self.alpha = alpha;
    self
  }
}

#[inline]
fn alpha_weight(alpha: f32) -> u8 {
  (alpha.clamp(0.0, 1.0) * FULL_WEIGHT as f32).round() as u8
}

fn apply_policy(old: u8, alpha: f32, policy: BlendPolicy) -> u8 {
  let new = alpha_weight(alpha);
  match policy {
    BlendPolicy::Max => old.max(new),
    BlendPolicy::Lerp => {
      let t = alpha.clamp(0.0, 1.0);
      (old as f32 + (FULL_WEIGHT - old) as f32 * t).round() as u8
    }
    BlendPolicy::Copy => new,
  }
}

fn paint_color(current: &Material, rgba: [u8; 4], paint: &MaterialPaint) -> Material {
  let old = match current {
    Material::Color(c) => *c,
    _ => return Material::Color(rgba),
  };
  let t = paint.alpha.clamp(0.0, 1.0);
  let lerped: [u8; 4] =
    std::array::from_fn(|k| (old[k] as f32 + (rgba[k] as f32 - old[k] as f32) * t).round() as u8);
  let out = match paint.policy {
    BlendPolicy::Copy => rgba,
    BlendPolicy::Lerp => lerped,
    BlendPolicy::Max => std::array::from_fn(|k| old[k].max(lerped[k])),
  };
  Material::Color(out)
}

/// Slot evicted when a full material receives a new index: the lowest
/// weight, with ties resolved by checking slot 2, then 1, then 0.
fn eviction_slot(slots: &[Slot]) -> usize {
  let mut victim = slots.len() - 1;
  for k in (0..slots.len()).rev() {
    if slots[k].1 < slots[victim].1 {
      victim = k;
    }
  }
  victim
}

/// Paint `paint` into `current` under the grid's material mode.
///
/// The result is compacted (zero weights dropped), sorted ascending and its
/// weights sum to exactly 255.
pub fn paint(current: &Material, paint: &MaterialPaint, mode: MaterialMode) -> Material {
  let target = match paint.target {
    PaintTarget::Color(rgba) => return paint_color(current, rgba, paint),
    PaintTarget::Index(i) => i,
  };
  if mode == MaterialMode::Color {
    return paint_color(current, [target, target, target, FULL_WEIGHT], paint);
  }
  if mode == MaterialMode::SingleIndex {
    // One slot: the index flips once the paint dominates.
    return if paint.alpha >= 0.5 {
      Material::Single(target)
    } else {
      current.to_mode(mode)
    };
  }

  let mut slots: Slots = current.to_mode(mode).slots();
  let target_slot = match slots.iter().position(|&(i, _)| i == target) {
    Some(k) => k,
    None if slots.len() < mode.max_slots() => {
      slots.push((target, 0));
      slots.len() - 1
    }
    None => {
      let k = eviction_slot(&slots);
      slots[k] = (target, 0);
      k
    }
  };

  let old = slots[target_slot].1;
  let painted = apply_policy(old, paint.alpha, paint.policy);
  let remaining = (FULL_WEIGHT - painted) as u32;
  let others_total: u32 = slots
    .iter()
    .enumerate()
    .filter(|&(k, _)| k != target_slot)
    .map(|(_, &(_, w))| w as u32)
    .sum();

  if others_total == 0 {
    slots[target_slot].1 = FULL_WEIGHT;
    for (k, slot) in slots.iter_mut().enumerate() {
      if k != target_slot {
        slot.1 = 0;
      }
    }
  } else {
    for (k, slot) in slots.iter_mut().enumerate() {
      slot.1 = if k == target_slot {
        painted
      } else {
        ((slot.1 as u32 * remaining + others_total / 2) / others_total) as u8
      };
    }
    // Keep the painted weight exact; residue lands on the other slots.
    let mut others: Slots = slots
      .iter()
      .enumerate()
      .filter(|&(k, _)| k != target_slot)
      .map(|(_, &s)| s)
      .collect();
    fix_residue(&mut others, remaining as i32);
    let mut it = others.into_iter();
    for (k, slot) in slots.iter_mut().enumerate() {
      if k != target_slot {
        if let Some(fixed) = it.next() {
          *slot = fixed;
        }
      }
    }
  }

  Material::from_slots(&slots)
}

#[cfg(test)]
#[path = "paint_test.rs"]
mod paint_test;
