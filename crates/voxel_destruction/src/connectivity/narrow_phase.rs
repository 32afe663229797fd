//! Narrow-phase connectivity through thin bridges.
//!
//! Cell-level judgement can destroy a cell that still holds a sliver of
//! material joining its neighbors. The narrow phase re-examines the shared
//! face of two adjacent cells at `S³` resolution against the full history
//! of applied shapes:
//!
//! ```text
//!      cell A            cell B
//!   ┌───┬───┬───┐   ┌───┬───┬───┐
//!   │   │   │ a │ ↔ │ b │   │   │     a, b: facing layer sub-cells
//!   ├───┼───┼───┤   ├───┼───┼───┤     intact = center inside no shape
//!   │   │   │ a │ ↔ │ b │   │   │
//!   └───┴───┴───┘   └───┴───┴───┘
//! ```
//!
//! The search is the cell-level BFS plus extra edges for pairs with a
//! destroyed side that pass this test, so it can only reconnect cells.

use std::collections::VecDeque;

use glam::{UVec3, Vec3};

use super::{collect_unreached, is_alive};
use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::types::{CellId, Direction};

/// Does `cell` have a destroyed face neighbor?
pub fn is_boundary_cell(cell: CellId, cache: &GridCellCache, state: &CellState) -> bool {
  cache
    .neighbors(cell)
    .into_iter()
    .flatten()
    .any(|n| state.is_destroyed(n))
}

/// Local center of narrow sub-cell `coord` of `cell` at `subdivision` per axis.
fn narrow_center(cache: &GridCellCache, cell: CellId, coord: UVec3, subdivision: u32) -> Vec3 {
  let step = cache.cell_size() / subdivision as f32;
  cache.cell_bounds(cell).min + (coord.as_vec3() + Vec3::splat(0.5)) * step
}

fn narrow_intact(cache: &GridCellCache, state: &CellState, cell: CellId, coord: UVec3, subdivision: u32) -> bool {
  let center = narrow_center(cache, cell, coord, subdivision);
  !state.history().iter().any(|applied| applied.contains_local_point(center))
}

/// Coordinate on the face of a cell facing `dir`, spanned by `(u, v)`.
fn face_coord(dir: Direction, u: u32, v: u32, subdivision: u32) -> UVec3 {
  let fixed = if dir.is_positive() { subdivision - 1 } else { 0 };
  match dir.axis() {
    0 => UVec3::new(fixed, u, v),
    1 => UVec3::new(u, fixed, v),
    _ => UVec3::new(u, v, fixed),
  }
}

/// Do adjacent cells `a` and `b` share an intact pair of facing narrow
/// sub-cells? Non-adjacent cells are never narrow connected.
pub fn are_narrow_connected(
  a: CellId,
  b: CellId,
  cache: &GridCellCache,
  state: &CellState,
  subdivision: u32,
) -> bool {
  let Some(dir) = cache.direction_between(a, b) else {
    return false;
  };
  if !cache.is_solid(a) || !cache.is_solid(b) {
    return false;
  }
  let s = subdivision.max(1);
  for v in 0..s {
    for u in 0..s {
      if narrow_intact(cache, state, a, face_coord(dir, u, v, s), s)
        && narrow_intact(cache, state, b, face_coord(dir.opposite(), u, v, s), s)
      {
        return true;
      }
    }
  }
  false
}

/// Cell-level BFS that may also cross a face with a destroyed side when the
/// narrow test finds a bridge. Destroyed cells reached this way act as
/// connectors but are never reported.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "connectivity::narrow_phase"))]
pub fn find_disconnected_cells_with_narrow_phase(
  cache: &GridCellCache,
  state: &CellState,
  subdivision: u32,
) -> Vec<CellId> {
  if !cache.is_valid() {
    return Vec::new();
  }

  let mut visited = vec![false; cache.total_positions()];
  let mut queue = VecDeque::new();
  for anchor in cache.anchor_cells() {
    if is_alive(cache, state, anchor) {
      visited[anchor as usize] = true;
      queue.push_back(anchor);
    }
  }

  let mut narrow_tests = 0usize;
  while let Some(id) = queue.pop_front() {
    let current_destroyed = state.is_destroyed(id);
    let boundary = current_destroyed || is_boundary_cell(id, cache, state);

    for next in cache.neighbors(id).into_iter().flatten() {
      if visited[next as usize] {
        continue;
      }
      let passable = if !current_destroyed && !state.is_destroyed(next) {
        true
      } else if boundary {
        narrow_tests += 1;
        are_narrow_connected(id, next, cache, state, subdivision)
      } else {
        false
      };
      if passable {
        visited[next as usize] = true;
        queue.push_back(next);
      }
    }
  }
  tracing::trace!(narrow_tests, "narrow phase search");

  collect_unreached(cache, state, |id| visited[id as usize])
}

#[cfg(test)]
#[path = "narrow_phase_test.rs"]
mod narrow_phase_test;
