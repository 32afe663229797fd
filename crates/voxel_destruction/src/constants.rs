//! Grid, sub-cell and quantization constants.
//!
//! # Cell Addressing
//!
//! Cells are addressed by a flat id, X innermost:
//!
//! ```text
//! id = x + y * Nx + z * Nx * Ny
//! ```
//!
//! Sub-cells inside a cell use the same layout with `division` per axis:
//!
//! ```text
//! sub = sx + sy * N + sz * N * N        (N = division, N³ sub-cells)
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!         +Z (up)
//!          │
//!          │   +Y
//!          │  /
//!          │ /
//!          └───────── +X
//! ```
//!
//! Anchors are measured along +Z from the source bounds' minimum.
//!
//! # Neighbor Order
//!
//! Every traversal visits face neighbors in the fixed order
//! −X, +X, −Y, +Y, −Z, +Z. Replicas replaying the same destruction sequence
//! therefore discover cells in the same order and report identical sets.

use glam::IVec3;

/// Number of face neighbors per cell.
pub const NEIGHBOR_COUNT: usize = 6;

/// Face neighbor offsets in traversal order (−X, +X, −Y, +Y, −Z, +Z).
pub const FACE_OFFSETS: [IVec3; NEIGHBOR_COUNT] = [
  IVec3::new(-1, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(0, -1, 0),
  IVec3::new(0, 1, 0),
  IVec3::new(0, 0, -1),
  IVec3::new(0, 0, 1),
];

/// Default sub-cell division per axis (5³ = 125 sub-cells).
pub const DEFAULT_SUB_CELL_DIVISION: u32 = 5;

/// Largest supported sub-cell division (8³ = 512 sub-cells, 8² = 64 face bits).
pub const MAX_SUB_CELL_DIVISION: u32 = 8;

/// Default supercell edge length in cells.
pub const DEFAULT_SUPERCELL_SIZE: u32 = 4;

/// Default narrow-phase subdivision per axis (3³).
pub const DEFAULT_NARROW_SUBDIVISION: u32 = 3;

/// Upper bound on cells a builder will allocate.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Fixed-point scale of the wire format: millimeters per world unit (meter).
pub const MM_PER_WORLD_UNIT: i32 = 1000;

/// World units per millimeter.
pub const WORLD_UNITS_PER_MM: f32 = 1.0 / MM_PER_WORLD_UNIT as f32;

/// Fixed-point scale of rotations: centidegrees per degree.
pub const CENTIDEGREES_PER_DEGREE: i32 = 100;

/// Number of cell corners evaluated by the majority vote.
pub const CELL_CORNER_COUNT: usize = 8;

/// Corners that must lie inside a shape for a majority-vote destruction.
pub const CORNER_MAJORITY: usize = CELL_CORNER_COUNT / 2 + 1;

/// Convert a local grid coordinate to a flat cell id.
#[inline(always)]
pub const fn coord_to_id(x: u32, y: u32, z: u32, nx: u32, ny: u32) -> u32 {
  x + y * nx + z * nx * ny
}

/// Convert a flat cell id to a local grid coordinate.
#[inline(always)]
pub const fn id_to_coord(id: u32, nx: u32, ny: u32) -> (u32, u32, u32) {
  let x = id % nx;
  let y = (id / nx) % ny;
  let z = id / (nx * ny);
  (x, y, z)
}

/// Convert a sub-cell coordinate to its index inside a cell.
#[inline(always)]
pub const fn sub_coord_to_index(sx: u32, sy: u32, sz: u32, division: u32) -> u32 {
  sx + sy * division + sz * division * division
}

/// Convert a sub-cell index to its coordinate inside a cell.
#[inline(always)]
pub const fn sub_index_to_coord(index: u32, division: u32) -> (u32, u32, u32) {
  (
    index % division,
    (index / division) % division,
    index / (division * division),
  )
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
