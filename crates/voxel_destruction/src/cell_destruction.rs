//! Whole-cell destruction judgement.
//!
//! A cell is destroyed by a shape when its world center lies inside the
//! shape, or failing that, when a majority of its eight world corners do.
//! Corners are only evaluated when the shape's AABB reaches the cell.

use std::collections::BTreeMap;

use glam::Affine3A;
use tracing::{debug, warn};

use crate::bounds::Aabb;
use crate::constants::CORNER_MAJORITY;
use crate::error::DestructionError;
use crate::layout::GridCellCache;
use crate::shape::{DestructionShape, QuantizedDestructionInput};
use crate::state::CellState;
use crate::subcell::{process_subcell_destruction, SubCellDestruction};
use crate::types::{CellDamageLevel, CellId, SubCellId};

/// Center test, then corner majority vote.
pub fn is_cell_destroyed(
  cell: CellId,
  shape: &DestructionShape,
  shape_aabb: &Aabb,
  cache: &GridCellCache,
  transform: &Affine3A,
) -> bool {
  if shape.contains_point(cache.cell_world_center(cell, transform)) {
    return true;
  }

  let local = cache.cell_bounds(cell);
  if !local.transformed(transform).overlaps(shape_aabb) {
    return false;
  }

  let inside = local
    .corners()
    .into_iter()
    .filter(|&c| shape.contains_point(transform.transform_point3(c)))
    .count();
  inside >= CORNER_MAJORITY
}

/// Candidate count and newly destroyed cells.
fn judge_cells(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &CellState,
) -> Result<(usize, Vec<CellId>), DestructionError> {
  if !cache.is_valid() {
    warn!("cell destruction on invalid layout");
    return Err(DestructionError::InvalidLayout);
  }
  let shape = input.dequantize();
  let aabb = shape.aabb();
  let candidates = cache.cells_overlapping_world(&aabb, transform);
  let destroyed = candidates
    .iter()
    .copied()
    .filter(|&id| !state.is_destroyed(id))
    .filter(|&id| is_cell_destroyed(id, &shape, &aabb, cache, transform))
    .collect();
  Ok((candidates.len(), destroyed))
}

/// Cells a shape would newly destroy, ascending. Does not touch `state`.
pub fn calculate_destroyed_cells(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &CellState,
) -> Result<Vec<CellId>, DestructionError> {
  judge_cells(input, transform, cache, state).map(|(_, destroyed)| destroyed)
}

/// As [`calculate_destroyed_cells`], recording the result into `state`.
pub fn destroy_cells_in_shape(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &mut CellState,
) -> Result<Vec<CellId>, DestructionError> {
  apply_cell_destruction(input, transform, cache, state).map(|(_, destroyed)| destroyed)
}

/// Destroy the judged cells and record the shape; also returns how many
/// candidate cells the shape touched.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "cell_destruction::destroy"))]
pub(crate) fn apply_cell_destruction(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &mut CellState,
) -> Result<(usize, Vec<CellId>), DestructionError> {
  let (candidates, destroyed) = judge_cells(input, transform, cache, state)?;
  if candidates == 0 {
    return Ok((0, destroyed));
  }

  for &id in &destroyed {
    state.mark_destroyed(id);
  }
  state.record_shape(*input, *transform);
  debug!(candidates, destroyed = destroyed.len(), "cell destruction applied");
  Ok((candidates, destroyed))
}

/// Result of sub-cell application split by outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellDestructionOutcome {
  /// Cells that lost their last sub-cell.
  pub newly_destroyed: Vec<CellId>,
  /// Cells that lost sub-cells but survive.
  pub damaged: Vec<CellId>,
  /// Newly dead sub-cells per touched cell.
  pub dead_sub_cells: BTreeMap<CellId, Vec<SubCellId>>,
}

impl CellDestructionOutcome {
  pub fn is_empty(&self) -> bool {
    self.newly_destroyed.is_empty() && self.damaged.is_empty()
  }
}

impl From<SubCellDestruction> for CellDestructionOutcome {
  fn from(result: SubCellDestruction) -> Self {
    let damaged = result
      .affected_cells
      .iter()
      .copied()
      .filter(|id| result.promoted_cells.binary_search(id).is_err())
      .collect();
    Self {
      newly_destroyed: result.promoted_cells,
      damaged,
      dead_sub_cells: result.dead_sub_cells,
    }
  }
}

/// Broad phase, sub-cell processing and promotion in one call.
pub fn process_cell_destruction_with_subcells(
  input: &QuantizedDestructionInput,
  transform: &Affine3A,
  cache: &GridCellCache,
  state: &mut CellState,
) -> Result<CellDestructionOutcome, DestructionError> {
  process_subcell_destruction(input, transform, cache, state).map(CellDestructionOutcome::from)
}

pub fn cell_damage_level(cell: CellId, state: &CellState) -> CellDamageLevel {
  if state.is_destroyed(cell) {
    CellDamageLevel::Destroyed
  } else if state.is_partial(cell) {
    CellDamageLevel::Damaged
  } else {
    CellDamageLevel::Intact
  }
}

#[cfg(test)]
#[path = "cell_destruction_test.rs"]
mod cell_destruction_test;
