use glam::UVec3;

use super::*;
use crate::connectivity::{find_disconnected_cells_cell_level, find_disconnected_cells_subcell_level};

fn wall() -> GridCellCache {
  GridCellCache::solid_box(UVec3::new(5, 1, 3), Vec3::ONE)
}

#[test]
fn test_split_top_row_forms_two_groups() {
  let cache = wall();
  let mut state = CellState::new(3);
  for id in 5..10 {
    state.mark_destroyed(id);
  }
  state.mark_destroyed(12);

  let disconnected = find_disconnected_cells_cell_level(&cache, &state);
  assert_eq!(disconnected, vec![10, 11, 13, 14]);

  let groups = group_detached_cells(&disconnected, &cache, &state);
  assert_eq!(groups.len(), 2);
  assert_eq!(groups[0].cells, vec![10, 11]);
  assert_eq!(groups[1].cells, vec![13, 14]);
}

#[test]
fn test_groups_partition_input() {
  let cache = GridCellCache::solid_box(UVec3::new(4, 4, 1), Vec3::ONE);
  let state = CellState::new(2);
  let disconnected = vec![0, 1, 5, 10, 11, 15, 3];
  let groups = group_detached_cells(&disconnected, &cache, &state);

  let mut seen: Vec<CellId> = groups.iter().flat_map(|g| g.cells.iter().copied()).collect();
  seen.sort_unstable();
  let mut expected = disconnected.clone();
  expected.sort_unstable();
  assert_eq!(seen, expected);

  // 0-1-5 and 10-11-15 are chains, 3 stands alone
  assert_eq!(groups.len(), 3);
  assert_eq!(groups[0].cells, vec![0, 1, 5]);
  assert_eq!(groups[1].cells, vec![3]);
  assert_eq!(groups[2].cells, vec![10, 11, 15]);
}

#[test]
fn test_destroyed_cells_are_not_grouped() {
  let cache = wall();
  let mut state = CellState::new(3);
  state.mark_destroyed(11);
  let groups = group_detached_cells(&[10, 11, 12], &cache, &state);
  assert_eq!(groups.len(), 2);
  assert_eq!(groups[0].cells, vec![10]);
  assert_eq!(groups[1].cells, vec![12]);
}

#[test]
fn test_group_floods_unsupported_island_of_damaged_neighbor() {
  let cache = GridCellCache::solid_box(UVec3::new(1, 1, 3), Vec3::ONE);
  let mut state = CellState::new(3);
  // Middle layer of cell 1 gone: its bottom layer rests on cell 0, its top
  // layer only touches cell 2
  let mut record = state.take_sub_cell(1);
  for sub in 9..18 {
    record.kill(sub);
  }
  state.store_sub_cell(1, record, true);

  let disconnected = find_disconnected_cells_subcell_level(&cache, &state);
  assert_eq!(disconnected, vec![2]);

  let groups = group_detached_cells_with_subcells(&disconnected, &cache, &state);
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].cells, vec![2]);
  assert_eq!(groups[0].boundary_sub_cells[&1], (18..27).collect::<Vec<_>>());
}

#[test]
fn test_flood_follows_island_inward() {
  let cache = GridCellCache::solid_box(UVec3::new(1, 1, 3), Vec3::ONE);
  let mut state = CellState::new(3);
  // Cell 1 keeps a column at (0, 0) rising from its top face to its middle
  // layer, and a floor layer; the two never touch
  let mut record = state.take_sub_cell(1);
  for sub in 9..27 {
    let keep = sub == 9 || sub == 18;
    if !keep {
      record.kill(sub);
    }
  }
  record.kill(0);
  state.store_sub_cell(1, record, true);

  let disconnected = find_disconnected_cells_subcell_level(&cache, &state);
  assert_eq!(disconnected, vec![2]);
  let groups = group_detached_cells_with_subcells(&disconnected, &cache, &state);
  assert_eq!(groups[0].boundary_sub_cells[&1], vec![9, 18]);
}

#[test]
fn test_supported_face_stays_with_structure() {
  let cache = GridCellCache::solid_box(UVec3::new(1, 1, 3), Vec3::ONE);
  let mut state = CellState::new(3);
  let mut record = state.take_sub_cell(1);
  record.kill(0);
  record.kill(18);
  state.store_sub_cell(1, record, true);

  // Cell 1 is connected through and through, so nothing of it is borrowed
  let groups = group_detached_cells_with_subcells(&[2], &cache, &state);
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].cells, vec![2]);
  assert!(groups[0].boundary_sub_cells.is_empty());
}

#[test]
fn test_detached_damaged_neighbor_is_not_borrowed() {
  let cache = GridCellCache::solid_box(UVec3::new(1, 1, 3), Vec3::ONE);
  let mut state = CellState::new(3);
  let mut record = state.take_sub_cell(1);
  record.kill(0);
  state.store_sub_cell(1, record, true);

  let groups = group_detached_cells_with_subcells(&[1, 2], &cache, &state);
  assert_eq!(groups.len(), 1);
  assert!(groups[0].boundary_sub_cells.is_empty());
}

#[test]
fn test_group_center_in_world_space() {
  let cache = wall();
  let transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 10.0));
  let center = calculate_group_center(&[0, 1], &cache, &transform);
  assert!((center - Vec3::new(1.0, 0.5, 10.5)).length() < 1e-6);
  assert_eq!(calculate_group_center(&[], &cache, &transform), Vec3::ZERO);
}

#[test]
fn test_debris_velocity_points_away() {
  let v = calculate_debris_velocity(Vec3::new(3.0, 0.0, 0.0), [Vec3::ZERO], 5.0);
  assert!((v - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);

  let cancel = calculate_debris_velocity(Vec3::ZERO, [Vec3::X, -Vec3::X], 5.0);
  assert!(cancel.length() < 1e-6);

  assert_eq!(calculate_debris_velocity(Vec3::ONE, [], 5.0), Vec3::ZERO);
}
