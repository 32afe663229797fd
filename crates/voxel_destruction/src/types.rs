//! Core data types shared by the destruction pipeline.

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{
  DEFAULT_NARROW_SUBDIVISION, DEFAULT_SUB_CELL_DIVISION, DEFAULT_SUPERCELL_SIZE, FACE_OFFSETS,
  MAX_SUB_CELL_DIVISION,
};
use crate::error::DestructionError;

/// Flat cell identifier (`x + y·Nx + z·Nx·Ny`).
pub type CellId = u32;

/// Sub-cell index inside a cell (`sx + sy·N + sz·N²`).
pub type SubCellId = u32;

/// One of the six cell faces, in traversal order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
  NegX,
  PosX,
  NegY,
  PosY,
  NegZ,
  PosZ,
}

impl Direction {
  /// All directions in the fixed traversal order (−X, +X, −Y, +Y, −Z, +Z).
  pub const ALL: [Direction; 6] = [
    Direction::NegX,
    Direction::PosX,
    Direction::NegY,
    Direction::PosY,
    Direction::NegZ,
    Direction::PosZ,
  ];

  /// Position in [`Direction::ALL`] and in neighbor link arrays.
  #[inline]
  pub const fn index(self) -> usize {
    self as usize
  }

  /// Axis this face is perpendicular to (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub const fn axis(self) -> usize {
    self.index() / 2
  }

  /// True for +X, +Y and +Z.
  #[inline]
  pub const fn is_positive(self) -> bool {
    self.index() % 2 == 1
  }

  #[inline]
  pub const fn opposite(self) -> Direction {
    Direction::ALL[self.index() ^ 1]
  }

  /// Grid offset of the neighbor across this face.
  #[inline]
  pub fn offset(self) -> IVec3 {
    FACE_OFFSETS[self.index()]
  }
}

/// Damage classification of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellDamageLevel {
  /// Every sub-cell alive.
  Intact,
  /// Present in the partial map: some but not all sub-cells dead.
  Damaged,
  /// In the destroyed set.
  Destroyed,
}

/// Resolution at which destruction shapes are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestructionResolution {
  /// Whole cells, judged by center test and corner majority vote.
  Cell,
  /// Individual sub-cells via exact OBB intersection.
  #[default]
  SubCell,
}

/// Runtime configuration for a destructible instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructionConfig {
  /// Sub-cells per axis inside each cell (N, giving N³ sub-cells).
  pub sub_cell_division: u32,

  /// Supercell edge length in cells for the hierarchical search.
  pub supercell_size: u32,

  /// Narrow-phase boundary subdivision per axis.
  pub narrow_subdivision: u32,

  /// Speed scale of the outward debris impulse (world units per second).
  pub debris_base_speed: f32,

  /// Resolution at which shapes are applied.
  pub resolution: DestructionResolution,

  /// Use supercell summaries to skip uniform regions.
  pub enable_supercell: bool,

  /// Traverse at sub-cell granularity across cell faces.
  pub enable_subcell: bool,

  /// Refine connectivity through thin bridges using the shape history.
  /// Takes precedence over the other search modes.
  pub enable_narrow_phase: bool,

  /// Mark detached cells destroyed once reported, so each fragment spawns once.
  pub remove_detached: bool,
}

impl Default for DestructionConfig {
  fn default() -> Self {
    Self {
      sub_cell_division: DEFAULT_SUB_CELL_DIVISION,
      supercell_size: DEFAULT_SUPERCELL_SIZE,
      narrow_subdivision: DEFAULT_NARROW_SUBDIVISION,
      debris_base_speed: 5.0,
      resolution: DestructionResolution::default(),
      enable_supercell: true,
      enable_subcell: true,
      enable_narrow_phase: false,
      remove_detached: true,
    }
  }
}

impl DestructionConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_sub_cell_division(mut self, division: u32) -> Self {
    self.sub_cell_division = division;
    self
  }

  pub fn with_supercell_size(mut self, size: u32) -> Self {
    self.supercell_size = size;
    self
  }

  pub fn with_narrow_subdivision(mut self, subdivision: u32) -> Self {
    self.narrow_subdivision = subdivision;
    self
  }

  pub fn with_debris_base_speed(mut self, speed: f32) -> Self {
    self.debris_base_speed = speed;
    self
  }

  pub fn with_resolution(mut self, resolution: DestructionResolution) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_supercell(mut self, enabled: bool) -> Self {
    self.enable_supercell = enabled;
    self
  }

  pub fn with_subcell(mut self, enabled: bool) -> Self {
    self.enable_subcell = enabled;
    self
  }

  pub fn with_narrow_phase(mut self, enabled: bool) -> Self {
    self.enable_narrow_phase = enabled;
    self
  }

  pub fn with_remove_detached(mut self, remove: bool) -> Self {
    self.remove_detached = remove;
    self
  }

  /// Check value ranges.
  pub fn validate(&self) -> Result<(), DestructionError> {
    if self.sub_cell_division == 0 || self.sub_cell_division > MAX_SUB_CELL_DIVISION {
      return Err(DestructionError::InvalidConfig(format!(
        "sub_cell_division must be in 1..={}, got {}",
        MAX_SUB_CELL_DIVISION, self.sub_cell_division
      )));
    }
    if self.supercell_size < 2 {
      return Err(DestructionError::InvalidConfig(format!(
        "supercell_size must be at least 2, got {}",
        self.supercell_size
      )));
    }
    if self.narrow_subdivision == 0 {
      return Err(DestructionError::InvalidConfig(
        "narrow_subdivision must be positive".to_string(),
      ));
    }
    if !self.debris_base_speed.is_finite() || self.debris_base_speed < 0.0 {
      return Err(DestructionError::InvalidConfig(format!(
        "debris_base_speed must be finite and non-negative, got {}",
        self.debris_base_speed
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
