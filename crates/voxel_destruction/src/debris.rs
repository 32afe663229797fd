//! Grouping of detached cells into rigid fragments, and spawn metrics.
//!
//! Each group is one connected component of the disconnected set under the
//! same 6-neighbor adjacency the searches use. Groups are ordered by their
//! smallest cell id; members are sorted ascending.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::{Affine3A, IVec3, Vec3};

use crate::connectivity::supported_sub_cells;
use crate::constants::{sub_coord_to_index, sub_index_to_coord};
use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::subcell::boundary_sub_cell_ids;
use crate::types::{CellId, Direction, SubCellId};

/// One rigid fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetachedGroup {
  /// Member cells, ascending.
  pub cells: Vec<CellId>,
  /// Unsupported live sub-cells of adjoining damaged cells that leave with
  /// the fragment, per cell, ascending.
  pub boundary_sub_cells: BTreeMap<CellId, Vec<SubCellId>>,
}

impl DetachedGroup {
  #[inline]
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }
}

/// Connected components of `disconnected`. Destroyed cells never connect.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "debris::group"))]
pub fn group_detached_cells(
  disconnected: &[CellId],
  cache: &GridCellCache,
  state: &CellState,
) -> Vec<DetachedGroup> {
  let members: BTreeSet<CellId> = disconnected
    .iter()
    .copied()
    .filter(|&id| cache.is_solid(id) && !state.is_destroyed(id))
    .collect();

  let mut assigned = BTreeSet::new();
  let mut groups = Vec::new();
  for &seed in &members {
    if !assigned.insert(seed) {
      continue;
    }
    let mut cells = vec![seed];
    let mut queue = VecDeque::from([seed]);
    while let Some(id) = queue.pop_front() {
      for next in cache.neighbors(id).into_iter().flatten() {
        if members.contains(&next) && assigned.insert(next) {
          cells.push(next);
          queue.push_back(next);
        }
      }
    }
    cells.sort_unstable();
    groups.push(DetachedGroup {
      cells,
      boundary_sub_cells: BTreeMap::new(),
    });
  }
  groups
}

/// Sub-cells sharing a face with `sub` inside the same cell.
fn inner_sub_neighbors(sub: SubCellId, division: u32) -> impl Iterator<Item = SubCellId> {
  let (x, y, z) = sub_index_to_coord(sub, division);
  let coord = IVec3::new(x as i32, y as i32, z as i32);
  Direction::ALL.into_iter().filter_map(move |dir| {
    let next = coord + dir.offset();
    (next.cmpge(IVec3::ZERO).all() && next.cmplt(IVec3::splat(division as i32)).all())
      .then(|| sub_coord_to_index(next.x as u32, next.y as u32, next.z as u32, division))
  })
}

/// As [`group_detached_cells`], then extend each group into adjoining
/// partially damaged cells that are not detached themselves.
///
/// The flood starts at the live sub-cells facing the group and spreads
/// through live sub-cells that no anchor reaches at sub-cell resolution.
/// Supported sub-cells stay with the structure.
pub fn group_detached_cells_with_subcells(
  disconnected: &[CellId],
  cache: &GridCellCache,
  state: &CellState,
) -> Vec<DetachedGroup> {
  let detached: BTreeSet<CellId> = disconnected.iter().copied().collect();
  let mut groups = group_detached_cells(disconnected, cache, state);

  let adjoins_damage = groups.iter().flat_map(|group| &group.cells).any(|&id| {
    cache
      .neighbors(id)
      .into_iter()
      .flatten()
      .any(|next| !detached.contains(&next) && state.sub_cell(next).is_some())
  });
  if !adjoins_damage {
    return groups;
  }

  let supported = supported_sub_cells(cache, state);
  let division = state.division();
  for group in &mut groups {
    let mut extra: BTreeMap<CellId, BTreeSet<SubCellId>> = BTreeMap::new();
    for &id in &group.cells {
      for dir in Direction::ALL {
        let Some(next) = cache.neighbor(id, dir) else {
          continue;
        };
        if detached.contains(&next) {
          continue;
        }
        let Some(sub_cell) = state.sub_cell(next) else {
          continue;
        };
        let reached = supported.get(&next);
        let free = |sub: SubCellId| sub_cell.is_alive(sub) && !reached.is_some_and(|seen| seen[sub as usize]);

        let flooded = extra.entry(next).or_default();
        let mut queue: VecDeque<SubCellId> = boundary_sub_cell_ids(dir.opposite(), division)
          .into_iter()
          .filter(|&sub| free(sub) && flooded.insert(sub))
          .collect();
        while let Some(sub) = queue.pop_front() {
          for inner in inner_sub_neighbors(sub, division) {
            if free(inner) && flooded.insert(inner) {
              queue.push_back(inner);
            }
          }
        }
      }
    }
    group.boundary_sub_cells = extra
      .into_iter()
      .filter(|(_, subs)| !subs.is_empty())
      .map(|(id, subs)| (id, subs.into_iter().collect()))
      .collect();
  }
  groups
}

/// Mean world-space center of the member cells (origin for an empty group).
pub fn calculate_group_center(cells: &[CellId], cache: &GridCellCache, transform: &Affine3A) -> Vec3 {
  if cells.is_empty() {
    return Vec3::ZERO;
  }
  let sum: Vec3 = cells
    .iter()
    .map(|&id| cache.cell_world_center(id, transform))
    .sum();
  sum / cells.len() as f32
}

/// Average outward direction from each shape center, scaled by `base_speed`.
///
/// A group centered exactly on a shape center gets no push from that shape.
pub fn calculate_debris_velocity(
  group_center: Vec3,
  shape_centers: impl IntoIterator<Item = Vec3>,
  base_speed: f32,
) -> Vec3 {
  let (sum, count) = shape_centers
    .into_iter()
    .fold((Vec3::ZERO, 0u32), |(sum, count), center| {
      (sum + (group_center - center).normalize_or_zero(), count + 1)
    });
  if count == 0 {
    return Vec3::ZERO;
  }
  sum / count as f32 * base_speed
}

#[cfg(test)]
#[path = "debris_test.rs"]
mod debris_test;
