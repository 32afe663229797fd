//! voxel_destruction - Engine independent structural integrity for voxel destructibles
//!
//! A destructible is partitioned into a grid of cells once, offline. At
//! runtime each placed instance tracks which cells and sub-cells are gone,
//! and after every hit works out which remaining cells still connect to an
//! anchor. Everything unreachable is grouped into debris.
//!
//! # Features
//!
//! - **Grid Cell Builder**: voxelizes triangle meshes or collision bodies,
//!   links neighbors and places anchors
//! - **Quantized Shapes**: sphere, box, cylinder and line inputs in integer
//!   millimeters and centidegrees, with a fixed 58-byte wire record
//! - **Sub-Cell Damage**: N³ liveness bits per cell, exact world-space OBB
//!   tests under any instance transform
//! - **Connectivity**: cell, sub-cell, hierarchical supercell and
//!   narrow-phase searches, all deterministic
//! - **Debris**: fragment grouping, spawn pivot and outward velocity
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voxel_destruction::*;
//!
//! let cache = GridCellBuilder::new(BuilderConfig::default())
//!     .build(&TriangleMesh::cuboid(Vec3::ZERO, Vec3::splat(4.0)))?;
//! let mut instance =
//!     DestructibleInstance::new(Arc::new(cache), Affine3A::IDENTITY, DestructionConfig::default())?;
//!
//! let hit = QuantizedDestructionInput::sphere(Vec3::new(2.0, 0.0, 1.0), 1.2);
//! let event = instance.apply(&hit)?;
//! for debris in &event.debris {
//!     println!("{} cells fall from {:?}", debris.group.len(), debris.center);
//! }
//! ```

pub mod bounds;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use bounds::{Aabb, Obb};
pub use constants::{DEFAULT_SUB_CELL_DIVISION, MAX_SUB_CELL_DIVISION, MM_PER_WORLD_UNIT};
pub use error::{BuildError, DestructionError, WireError};
pub use types::{CellDamageLevel, CellId, DestructionConfig, DestructionResolution, Direction, SubCellId};

// Immutable grid partition and its builder
pub mod layout;
pub use layout::{
  AnchorMode, BuilderConfig, CellSource, CollisionBody, CollisionElement, CollisionPrimitive, ConvexHull,
  FinitePlane, GridCellBuilder, GridCellCache, HalfSpace, TriangleMesh,
};

// Quantized destruction shapes and exact predicates
pub mod shape;
pub use shape::{compute_shape_aabb, DestructionShape, QuantizedDestructionInput, ShapeType};

// Per-instance damage
pub mod state;
pub use state::{AppliedShape, CellState, SubCell};

pub mod subcell;
pub use subcell::{
  boundary_live_sub_cell_mask, boundary_sub_cell_ids, count_live_sub_cells, is_cell_fully_destroyed,
  process_subcell_destruction, SubCellDestruction,
};

pub mod cell_destruction;
pub use cell_destruction::{
  calculate_destroyed_cells, cell_damage_level, destroy_cells_in_shape, is_cell_destroyed,
  process_cell_destruction_with_subcells, CellDestructionOutcome,
};

// Support searches
pub mod connectivity;
pub use connectivity::{
  are_narrow_connected, find_disconnected_cells, find_disconnected_cells_cell_level,
  find_disconnected_cells_hierarchical, find_disconnected_cells_subcell_level,
  find_disconnected_cells_with_narrow_phase, is_boundary_cell, SupercellCache, SupercellTag,
};

pub mod debris;
pub use debris::{
  calculate_debris_velocity, calculate_group_center, group_detached_cells, group_detached_cells_with_subcells,
  DetachedGroup,
};

// Instance pipeline and output sinks
pub mod instance;
pub use instance::{Debris, DestructibleInstance, DestructionEvent, DestructionSink};

// Engine-agnostic metrics
pub mod metrics;
pub use metrics::DestructionMetrics;

pub use glam::{Affine3A, Quat, Vec3};

#[cfg(test)]
#[path = "scenarios_test.rs"]
mod scenarios_test;
