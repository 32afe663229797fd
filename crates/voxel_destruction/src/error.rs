//! Error types for building, running and decoding destruction.

use thiserror::Error;

/// Reasons the builder produces no cache.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
  #[error("source has no triangles and no collision elements")]
  EmptySource,

  #[error("source bounds are degenerate: min {min:?}, max {max:?}")]
  DegenerateBounds { min: [f32; 3], max: [f32; 3] },

  #[error("cell size must be positive and finite on every axis, got {0:?}")]
  InvalidCellSize([f32; 3]),

  #[error("grid of {dims:?} cells exceeds the limit of {limit}")]
  TooManyCells { dims: [u32; 3], limit: usize },
}

/// Failures of runtime destruction operations.
///
/// A shape that misses the grid is not an error: it yields an empty result.
#[derive(Debug, Error, PartialEq)]
pub enum DestructionError {
  #[error("grid cell layout is unbuilt or degenerate")]
  InvalidLayout,

  #[error("invalid destruction config: {0}")]
  InvalidConfig(String),
}

/// Failures decoding a quantized shape record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
  #[error("short read: needed {needed} bytes, {available} available")]
  ShortRead { needed: usize, available: usize },

  #[error("unknown wire version {0}")]
  UnknownVersion(u8),

  #[error("unknown shape type {0}")]
  UnknownShape(u8),
}
