//! Fixed-size little-endian record for replicating destruction shapes.
//!
//! ```text
//! offset  size  field
//!      0     1  version (1)
//!      1     1  shape type
//!      2    12  center_mm        (i32 x, y, z)
//!     14     4  radius_mm
//!     18    12  box_extent_mm
//!     30    12  rotation_cdeg
//!     42    12  line_end_mm
//!     54     4  line_thickness_mm
//! ```
//!
//! Fields are copied verbatim; decoding never rejects negative extents.

use glam::IVec3;

use super::{QuantizedDestructionInput, ShapeType};
use crate::error::WireError;

pub const WIRE_VERSION: u8 = 1;

/// Encoded size of one record in bytes.
pub const WIRE_RECORD_SIZE: usize = 2 + 14 * 4;

fn take<const N: usize>(inp: &mut &[u8]) -> Result<[u8; N], WireError> {
  if inp.len() < N {
    return Err(WireError::ShortRead {
      needed: N,
      available: inp.len(),
    });
  }
  let (head, rest) = inp.split_at(N);
  *inp = rest;
  let mut buf = [0u8; N];
  buf.copy_from_slice(head);
  Ok(buf)
}

fn take_i32(inp: &mut &[u8]) -> Result<i32, WireError> {
  Ok(i32::from_le_bytes(take::<4>(inp)?))
}

fn take_ivec3(inp: &mut &[u8]) -> Result<IVec3, WireError> {
  Ok(IVec3::new(take_i32(inp)?, take_i32(inp)?, take_i32(inp)?))
}

fn put_ivec3(out: &mut Vec<u8>, v: IVec3) {
  for c in v.to_array() {
    out.extend_from_slice(&c.to_le_bytes());
  }
}

impl QuantizedDestructionInput {
  /// Append the record to `out`.
  pub fn encode(&self, out: &mut Vec<u8>) {
    out.reserve(WIRE_RECORD_SIZE);
    out.push(WIRE_VERSION);
    out.push(self.shape.as_u8());
    put_ivec3(out, self.center_mm);
    out.extend_from_slice(&self.radius_mm.to_le_bytes());
    put_ivec3(out, self.box_extent_mm);
    put_ivec3(out, self.rotation_cdeg);
    put_ivec3(out, self.line_end_mm);
    out.extend_from_slice(&self.line_thickness_mm.to_le_bytes());
  }

  /// Read one record from the front of `inp`, advancing it.
  pub fn decode(inp: &mut &[u8]) -> Result<Self, WireError> {
    // Whole record or nothing
    if inp.len() < WIRE_RECORD_SIZE {
      return Err(WireError::ShortRead {
        needed: WIRE_RECORD_SIZE,
        available: inp.len(),
      });
    }
    let [version] = take::<1>(inp)?;
    if version != WIRE_VERSION {
      return Err(WireError::UnknownVersion(version));
    }
    let [shape] = take::<1>(inp)?;
    let shape = ShapeType::from_u8(shape).ok_or(WireError::UnknownShape(shape))?;

    Ok(Self {
      shape,
      center_mm: take_ivec3(inp)?,
      radius_mm: take_i32(inp)?,
      box_extent_mm: take_ivec3(inp)?,
      rotation_cdeg: take_ivec3(inp)?,
      line_end_mm: take_ivec3(inp)?,
      line_thickness_mm: take_i32(inp)?,
    })
  }

  pub fn to_bytes(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(WIRE_RECORD_SIZE);
    self.encode(&mut out);
    out
  }
}
