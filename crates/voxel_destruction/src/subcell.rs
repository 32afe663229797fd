//! Sub-cell processor: applies a quantized shape at sub-cell resolution.
//!
//! ```text
//! shape AABB ──► candidate cells (broad phase, grid-local)
//!                    │
//!                    ├─ destroyed?              skip
//!                    ├─ cell OBB misses shape?  skip
//!                    └─ for each live sub-cell:
//!                         world OBB ∩ shape  ──► mark dead
//!                    │
//!                    └─ all dead? ──► promote into destroyed set
//! ```
//!
//! Sub-cell marking is applied eagerly per cell and never rolled back.

use std::collections::BTreeMap;

use glam::Affine3A;
use tracing::{debug, trace, warn};

use crate::bounds::Obb;
use crate::constants::sub_coord_to_index;
use crate::error::DestructionError;
use crate::layout::GridCellCache;
use crate::shape::QuantizedDestructionInput;
use crate::state::CellState;
use crate::types::{CellId, Direction, SubCellId};

/// Outcome of applying one shape at sub-cell resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubCellDestruction {
  /// Cells returned by the broad phase.
  pub candidate_count: usize,
  /// Cells that lost at least one sub-cell, ascending.
  pub affected_cells: Vec<CellId>,
  /// Newly dead sub-cells per affected cell, ascending.
  pub dead_sub_cells: BTreeMap<CellId, Vec<SubCellId>>,
  /// Cells whose last sub-cell died during this call, ascending.
  pub promoted_cells: Vec<CellId>,
}

impl SubCellDestruction {
  /// The shape reached the grid. Says nothing about whether anything died;
  /// check [`Self::affected_cells`] for that.
  #[inline]
  pub fn processed(&self) -> bool {
    self.candidate_count > 0
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.affected_cells.is_empty()
  }
}

/// Apply `input` to every live sub-cell it touches.
///
/// Fails with [`DestructionError::InvalidLayout`] before any mutation when the
/// cache is degenerate. A shape that misses the grid is a successful, empty
/// result and leaves `state` untouched.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "subcell::process"))]
pub fn process_subcell_destruction(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &mut CellState,
) -> Result<SubCellDestruction, DestructionError> {
  if !cache.is_valid() {
    warn!("sub-cell destruction on invalid layout");
    return Err(DestructionError::InvalidLayout);
  }

  let shape = input.dequantize();
  let candidates = cache.cells_overlapping_world(&shape.aabb(), transform);
  trace!(candidates = candidates.len(), shape = ?input.shape, "broad phase");

  let mut result = SubCellDestruction {
    candidate_count: candidates.len(),
    ..Default::default()
  };
  if candidates.is_empty() {
    return Ok(result);
  }

  let division = state.division();
  let total = state.sub_cells_per_cell();

  for id in candidates {
    if state.is_destroyed(id) {
      continue;
    }
    if !shape.intersects_obb(&cache.cell_world_obb(id, transform)) {
      continue;
    }

    let mut sub_cell = state.take_sub_cell(id);
    let mut killed = Vec::new();
    for sub in 0..total {
      if !sub_cell.is_alive(sub) {
        continue;
      }
      let obb = Obb::from_local_aabb(&cache.sub_cell_bounds(id, sub, division), transform);
      if shape.intersects_obb(&obb) {
        sub_cell.kill(sub);
        killed.push(sub);
      }
    }

    let changed = !killed.is_empty();
    if state.store_sub_cell(id, sub_cell, changed) {
      result.promoted_cells.push(id);
    }
    if changed {
      result.affected_cells.push(id);
      result.dead_sub_cells.insert(id, killed);
    }
  }

  state.record_shape(*input, *transform);

  debug!(
    candidates = result.candidate_count,
    affected = result.affected_cells.len(),
    promoted = result.promoted_cells.len(),
    "sub-cell destruction applied"
  );
  Ok(result)
}

/// Live sub-cells of a cell: 0 when destroyed, N³ when untouched.
pub fn count_live_sub_cells(cell: CellId, state: &CellState) -> u32 {
  if state.is_destroyed(cell) {
    return 0;
  }
  state
    .sub_cell(cell)
    .map_or(state.sub_cells_per_cell(), |sub| sub.live_count())
}

#[inline]
pub fn is_cell_fully_destroyed(cell: CellId, state: &CellState) -> bool {
  state.is_destroyed(cell)
}

/// Face coordinates `(u, v)` span the two axes other than `dir`'s, in
/// ascending axis order.
fn face_sub_coord(dir: Direction, u: u32, v: u32, division: u32) -> SubCellId {
  let fixed = if dir.is_positive() { division - 1 } else { 0 };
  match dir.axis() {
    0 => sub_coord_to_index(fixed, u, v, division),
    1 => sub_coord_to_index(u, fixed, v, division),
    _ => sub_coord_to_index(u, v, fixed, division),
  }
}

/// The `division²` sub-cells on one face, ordered `u + v·N`.
///
/// Entry `k` of a face touches entry `k` of the opposite face of the
/// neighboring cell.
pub fn boundary_sub_cell_ids(dir: Direction, division: u32) -> Vec<SubCellId> {
  let mut ids = Vec::with_capacity((division * division) as usize);
  for v in 0..division {
    for u in 0..division {
      ids.push(face_sub_coord(dir, u, v, division));
    }
  }
  ids
}

/// Bit `u + v·N` set when that face sub-cell is alive.
pub fn boundary_live_sub_cell_mask(cell: CellId, dir: Direction, state: &CellState) -> u64 {
  if state.is_destroyed(cell) {
    return 0;
  }
  let division = state.division();
  let face = division * division;
  let full = if face >= 64 { u64::MAX } else { (1u64 << face) - 1 };
  let Some(sub_cell) = state.sub_cell(cell) else {
    return full;
  };

  boundary_sub_cell_ids(dir, division)
    .into_iter()
    .enumerate()
    .filter(|&(_, sub)| sub_cell.is_alive(sub))
    .fold(0u64, |mask, (bit, _)| mask | (1u64 << bit))
}

#[cfg(test)]
#[path = "subcell_test.rs"]
mod subcell_test;
