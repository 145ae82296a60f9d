//! 32-bit material packing for renderer interop.
//!
//! ```text
//! Color   r | g << 8 | b << 16 | a << 24
//! Single  i
//! Double  a | b << 8 | blend << 16
//! Triple  1 << 31 | i0 | i1 << 5 | i2 << 10 | w0 << 15 | w1 << 23
//! ```
//!
//! Color and index encodings overlap, so unpacking needs the material mode.

use super::{Material, MaterialMode};
use crate::constants::PACKED_TRIPLE_MAX_INDEX;

const TRIPLE_FLAG: u32 = 1 << 31;
const INDEX_MASK: u32 = 0x1f;

pub fn pack(material: &Material) -> u32 {
  match *material {
    Material::Color(rgba) => u32::from_le_bytes(rgba),
    Material::Single(i) => i as u32,
    Material::Double { a, b, blend } => a as u32 | (b as u32) << 8 | (blend as u32) << 16,
    Material::Triple { indices, weights } => {
      assert!(
        indices.iter().all(|&i| i <= PACKED_TRIPLE_MAX_INDEX),
        "packed triple indices are limited to 5 bits: {indices:?}"
      );
      TRIPLE_FLAG
        | indices[0] as u32
        | (indices[1] as u32) << 5
        | (indices[2] as u32) << 10
        | (weights[0] as u32) << 15
        | (weights[1] as u32) << 23
    }
  }
}

pub fn unpack(bits: u32, mode: MaterialMode) -> Material {
  if mode == MaterialMode::Color {
    return Material::Color(bits.to_le_bytes());
  }
  if bits & TRIPLE_FLAG != 0 {
    return Material::Triple {
      indices: [
        (bits & INDEX_MASK) as u8,
        (bits >> 5 & INDEX_MASK) as u8,
        (bits >> 10 & INDEX_MASK) as u8,
      ],
      weights: [(bits >> 15) as u8, (bits >> 23) as u8],
    };
  }
  if bits >> 8 == 0 {
    return Material::Single(bits as u8);
  }
  Material::Double {
    a: bits as u8,
    b: (bits >> 8) as u8,
    blend: (bits >> 16) as u8,
  }
}

impl Material {
  pub fn to_packed(&self) -> u32 {
    pack(self)
  }
}

#[cfg(test)]
#[path = "packed_test.rs"]
mod packed_test;
