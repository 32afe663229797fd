use std::collections::VecDeque;

use super::{collect_unreached, is_alive};
use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::types::CellId;

/// Plain BFS over cells. Destroyed cells neither seed nor connect.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "connectivity::cell_level"))]
pub fn find_disconnected_cells_cell_level(cache: &GridCellCache, state: &CellState) -> Vec<CellId> {
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

  while let Some(id) = queue.pop_front() {
    for next in cache.neighbors(id).into_iter().flatten() {
      if visited[next as usize] || state.is_destroyed(next) {
        continue;
      }
      visited[next as usize] = true;
      queue.push_back(next);
    }
  }

  collect_unreached(cache, state, |id| visited[id as usize])
}
