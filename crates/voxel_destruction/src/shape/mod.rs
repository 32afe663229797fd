//! Quantized destruction shapes.
//!
//! A destruction event travels as a [`QuantizedDestructionInput`]: integer
//! millimeters and centidegrees, so every replica starts from the same bits.
//! Evaluation dequantizes once into a [`DestructionShape`] and runs the exact
//! predicates in [`intersect`] against world-space boxes.
//!
//! # Field usage per shape
//!
//! ```text
//! Sphere    center_mm, radius_mm
//! Box       center_mm, box_extent_mm (half size), rotation_cdeg
//! Cylinder  center_mm, radius_mm, box_extent_mm.z (half height), rotation_cdeg
//! Line      center_mm (start), line_end_mm, line_thickness_mm (capsule radius)
//! ```
//!
//! Rotations are `x = roll`, `y = pitch`, `z = yaw`, applied yaw first.

pub mod intersect;
pub mod wire;

use glam::{EulerRot, IVec3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::constants::{CENTIDEGREES_PER_DEGREE, MM_PER_WORLD_UNIT, WORLD_UNITS_PER_MM};

/// Destruction volume kind. The discriminant is the wire byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShapeType {
  #[default]
  Sphere = 0,
  Box = 1,
  Cylinder = 2,
  Line = 3,
}

impl ShapeType {
  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::Sphere),
      1 => Some(Self::Box),
      2 => Some(Self::Cylinder),
      3 => Some(Self::Line),
      _ => None,
    }
  }

  #[inline]
  pub fn as_u8(self) -> u8 {
    self as u8
  }
}

/// Fixed-point destruction volume, the network-replicated payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedDestructionInput {
  pub shape: ShapeType,
  pub center_mm: IVec3,
  pub radius_mm: i32,
  pub box_extent_mm: IVec3,
  pub rotation_cdeg: IVec3,
  pub line_end_mm: IVec3,
  pub line_thickness_mm: i32,
}

#[inline]
fn quantize_mm(value: f32) -> i32 {
  (value * MM_PER_WORLD_UNIT as f32).round() as i32
}

#[inline]
fn quantize_vec_mm(value: Vec3) -> IVec3 {
  IVec3::new(quantize_mm(value.x), quantize_mm(value.y), quantize_mm(value.z))
}

#[inline]
fn quantize_degrees(value: Vec3) -> IVec3 {
  (value * CENTIDEGREES_PER_DEGREE as f32).round().as_ivec3()
}

#[inline]
fn mm_to_world(value: i32) -> f32 {
  value as f32 * WORLD_UNITS_PER_MM
}

#[inline]
fn vec_mm_to_world(value: IVec3) -> Vec3 {
  value.as_vec3() * WORLD_UNITS_PER_MM
}

/// Rotation from centidegrees (roll about X, pitch about Y, yaw about Z).
pub fn rotation_from_centidegrees(rotation_cdeg: IVec3) -> Quat {
  let radians = rotation_cdeg.as_vec3() / CENTIDEGREES_PER_DEGREE as f32;
  Quat::from_euler(
    EulerRot::ZYX,
    radians.z.to_radians(),
    radians.y.to_radians(),
    radians.x.to_radians(),
  )
}

impl QuantizedDestructionInput {
  fn blank(shape: ShapeType, center: Vec3) -> Self {
    Self {
      shape,
      center_mm: quantize_vec_mm(center),
      radius_mm: 0,
      box_extent_mm: IVec3::ZERO,
      rotation_cdeg: IVec3::ZERO,
      line_end_mm: IVec3::ZERO,
      line_thickness_mm: 0,
    }
  }

  /// Sphere in world units.
  pub fn sphere(center: Vec3, radius: f32) -> Self {
    Self {
      radius_mm: quantize_mm(radius),
      ..Self::blank(ShapeType::Sphere, center)
    }
  }

  /// Box with half extents and rotation in degrees (roll, pitch, yaw).
  pub fn cuboid(center: Vec3, half_extents: Vec3, rotation_degrees: Vec3) -> Self {
    Self {
      box_extent_mm: quantize_vec_mm(half_extents),
      rotation_cdeg: quantize_degrees(rotation_degrees),
      ..Self::blank(ShapeType::Box, center)
    }
  }

  /// Cylinder along its local Z axis.
  pub fn cylinder(center: Vec3, radius: f32, half_height: f32, rotation_degrees: Vec3) -> Self {
    Self {
      radius_mm: quantize_mm(radius),
      box_extent_mm: IVec3::new(0, 0, quantize_mm(half_height)),
      rotation_cdeg: quantize_degrees(rotation_degrees),
      ..Self::blank(ShapeType::Cylinder, center)
    }
  }

  /// Segment from `start` to `end` swept by `thickness`.
  pub fn line(start: Vec3, end: Vec3, thickness: f32) -> Self {
    Self {
      line_end_mm: quantize_vec_mm(end),
      line_thickness_mm: quantize_mm(thickness),
      ..Self::blank(ShapeType::Line, start)
    }
  }

  /// Float geometry for exact tests.
  ///
  /// Negative radii and extents are not rejected; they collapse to zero.
  pub fn dequantize(&self) -> DestructionShape {
    let center = vec_mm_to_world(self.center_mm);
    match self.shape {
      ShapeType::Sphere => DestructionShape::Sphere {
        center,
        radius: mm_to_world(self.radius_mm).max(0.0),
      },
      ShapeType::Box => DestructionShape::Box {
        center,
        rotation: rotation_from_centidegrees(self.rotation_cdeg),
        half_extents: vec_mm_to_world(self.box_extent_mm).max(Vec3::ZERO),
        axis_aligned: self.rotation_cdeg == IVec3::ZERO,
      },
      ShapeType::Cylinder => DestructionShape::Cylinder {
        center,
        rotation: rotation_from_centidegrees(self.rotation_cdeg),
        radius: mm_to_world(self.radius_mm).max(0.0),
        half_height: mm_to_world(self.box_extent_mm.z).max(0.0),
      },
      ShapeType::Line => DestructionShape::Capsule {
        start: center,
        end: vec_mm_to_world(self.line_end_mm),
        radius: mm_to_world(self.line_thickness_mm).max(0.0),
      },
    }
  }
}

/// Dequantized destruction volume in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DestructionShape {
  Sphere {
    center: Vec3,
    radius: f32,
  },
  Box {
    center: Vec3,
    rotation: Quat,
    half_extents: Vec3,
    /// Zero rotation on the wire; enables the AABB fast path.
    axis_aligned: bool,
  },
  Cylinder {
    center: Vec3,
    rotation: Quat,
    radius: f32,
    half_height: f32,
  },
  Capsule {
    start: Vec3,
    end: Vec3,
    radius: f32,
  },
}

impl DestructionShape {
  /// Point debris is pushed away from.
  pub fn center(&self) -> Vec3 {
    match *self {
      Self::Sphere { center, .. } | Self::Box { center, .. } | Self::Cylinder { center, .. } => center,
      Self::Capsule { start, end, .. } => (start + end) * 0.5,
    }
  }

  /// World-space broad-phase envelope.
  pub fn aabb(&self) -> Aabb {
    match *self {
      Self::Sphere { center, radius } => Aabb::from_center_half_extents(center, Vec3::splat(radius)),
      Self::Box {
        center,
        rotation,
        half_extents,
        axis_aligned,
      } => {
        if axis_aligned {
          Aabb::from_center_half_extents(center, half_extents)
        } else {
          rotated_envelope(center, rotation, half_extents)
        }
      }
      Self::Cylinder {
        center,
        rotation,
        radius,
        half_height,
      } => rotated_envelope(center, rotation, Vec3::new(radius, radius, half_height)),
      Self::Capsule { start, end, radius } => {
        Aabb::from_points([start, end]).expanded(radius)
      }
    }
  }
}

/// Envelope of the eight rotated corners of a centered box.
fn rotated_envelope(center: Vec3, rotation: Quat, half_extents: Vec3) -> Aabb {
  let local = Aabb::from_center_half_extents(Vec3::ZERO, half_extents);
  Aabb::from_points(local.corners().map(|c| center + rotation * c))
}

/// Broad-phase world AABB of a quantized shape.
pub fn compute_shape_aabb(input: &QuantizedDestructionInput) -> Aabb {
  input.dequantize().aabb()
}
