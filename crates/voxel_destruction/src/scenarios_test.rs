//! End-to-end scenarios and laws over seeded random destruction sequences.

use glam::{Affine3A, UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::connectivity::SupercellCache;
use crate::*;

fn cube3() -> GridCellCache {
  GridCellCache::solid_box(UVec3::splat(3), Vec3::ONE)
}

fn random_input(rng: &mut StdRng, extent: f32) -> QuantizedDestructionInput {
  let center = Vec3::new(
    rng.random_range(0.0..extent),
    rng.random_range(0.0..extent),
    rng.random_range(0.0..extent),
  );
  let rotation = Vec3::new(
    rng.random_range(-180.0..180.0),
    rng.random_range(-180.0..180.0),
    rng.random_range(-180.0..180.0),
  );
  match rng.random_range(0..4) {
    0 => QuantizedDestructionInput::sphere(center, rng.random_range(0.2..1.5)),
    1 => QuantizedDestructionInput::cuboid(
      center,
      Vec3::new(
        rng.random_range(0.1..2.0),
        rng.random_range(0.1..2.0),
        rng.random_range(0.1..0.8),
      ),
      rotation,
    ),
    2 => QuantizedDestructionInput::cylinder(
      center,
      rng.random_range(0.2..1.0),
      rng.random_range(0.2..2.0),
      rotation,
    ),
    _ => {
      let end = center + Vec3::new(rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0), 0.0);
      QuantizedDestructionInput::line(center, end, rng.random_range(0.05..0.4))
    }
  }
}

/// Grid and state after a seeded sequence of sub-cell hits.
fn damaged(seed: u64, events: usize) -> (GridCellCache, CellState) {
  let cache = GridCellCache::solid_box(UVec3::splat(6), Vec3::ONE);
  let mut state = CellState::new(4);
  let mut rng = StdRng::seed_from_u64(seed);
  for _ in 0..events {
    let input = random_input(&mut rng, 6.0);
    process_subcell_destruction(&input, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
  }
  (cache, state)
}

#[test]
fn scenario_a_intact_grid_is_supported() {
  let cache = cube3();
  let state = CellState::default();
  assert!(find_disconnected_cells_cell_level(&cache, &state).is_empty());
  assert!(find_disconnected_cells_subcell_level(&cache, &state).is_empty());
  assert!(find_disconnected_cells_with_narrow_phase(&cache, &state, 3).is_empty());
}

#[test]
fn scenario_b_middle_layer_removed() {
  let cache = cube3();
  let mut state = CellState::default();
  for id in 9..18 {
    state.mark_destroyed(id);
  }
  let disconnected = find_disconnected_cells_cell_level(&cache, &state);
  assert_eq!(disconnected, (18..27).collect::<Vec<_>>());
  assert!(disconnected.iter().all(|&id| id >= 18));
}

#[test]
fn scenario_c_shape_outside_grid() {
  let cache = cube3();
  let mut state = CellState::default();
  let before = state.clone();
  let input = QuantizedDestructionInput::sphere(Vec3::new(-20.0, 5.0, 40.0), 2.0);
  let result = process_subcell_destruction(&input, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
  assert!(result.affected_cells.is_empty());
  assert!(!result.processed());
  assert_eq!(state, before);
}

#[test]
fn scenario_d_last_sub_cell_promotes() {
  let cache = GridCellCache::solid_box(UVec3::ONE, Vec3::ONE);
  let mut state = CellState::new(5);
  let total = state.sub_cells_per_cell();

  for sub in 0..total {
    let center = cache.sub_cell_bounds(0, sub, 5).center();
    let pin = QuantizedDestructionInput::sphere(center, 0.05);
    let result = process_subcell_destruction(&pin, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
    assert_eq!(result.dead_sub_cells[&0], vec![sub]);

    if sub + 1 < total {
      assert!(state.is_partial(0));
      assert!(!state.is_destroyed(0));
      assert_eq!(count_live_sub_cells(0, &state), total - sub - 1);
    } else {
      assert_eq!(result.promoted_cells, vec![0]);
    }
  }
  assert!(state.is_destroyed(0));
  assert!(state.partial_cells().is_empty());
}

#[test]
fn scenario_e_sliver_bridge_keeps_column_standing() {
  let cache = GridCellCache::solid_box(UVec3::new(1, 1, 3), Vec3::ONE);
  let mut state = CellState::new(5);
  // Two slabs carve the middle cell, leaving a thin wall around x = 0.5
  state.mark_destroyed(1);
  for center_x in [-0.35, 1.35] {
    state.record_shape(
      QuantizedDestructionInput::cuboid(Vec3::new(center_x, 0.5, 1.5), Vec3::new(0.65, 1.0, 0.55), Vec3::ZERO),
      Affine3A::IDENTITY,
    );
  }
  assert_eq!(find_disconnected_cells_cell_level(&cache, &state), vec![2]);
  assert!(find_disconnected_cells_with_narrow_phase(&cache, &state, 3).is_empty());
}

#[test]
fn law_idempotence() {
  let cache = GridCellCache::solid_box(UVec3::splat(6), Vec3::ONE);
  let mut rng = StdRng::seed_from_u64(7);
  let mut state = CellState::new(4);
  for _ in 0..20 {
    let input = random_input(&mut rng, 6.0);
    process_subcell_destruction(&input, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
    let again = process_subcell_destruction(&input, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
    assert!(again.affected_cells.is_empty(), "{input:?} changed state twice");
  }
}

#[test]
fn law_monotonic_live_counts() {
  let cache = GridCellCache::solid_box(UVec3::splat(6), Vec3::ONE);
  let mut rng = StdRng::seed_from_u64(11);
  let mut state = CellState::new(4);
  let live = |state: &CellState| -> Vec<u32> {
    cache.solid_cells().map(|id| count_live_sub_cells(id, state)).collect()
  };

  let mut previous = live(&state);
  for _ in 0..25 {
    let input = random_input(&mut rng, 6.0);
    process_subcell_destruction(&input, &Affine3A::IDENTITY, &cache, &mut state).unwrap();
    let current = live(&state);
    assert!(current.iter().zip(&previous).all(|(now, before)| now <= before));
    previous = current;
  }
}

#[test]
fn law_destroyed_state_consistency() {
  for seed in 0..4 {
    let (cache, state) = damaged(seed, 25);
    for id in cache.solid_cells() {
      let destroyed = state.is_destroyed(id);
      assert_eq!(is_cell_fully_destroyed(id, &state), destroyed);
      assert_eq!(count_live_sub_cells(id, &state) == 0, destroyed);
      if let Some(sub_cell) = state.sub_cell(id) {
        assert!(!destroyed);
        assert!(sub_cell.live_count() > 0 && sub_cell.live_count() < state.sub_cells_per_cell());
      }
    }
  }
}

#[test]
fn law_narrow_phase_never_adds_disconnection() {
  for seed in 0..6 {
    let (cache, state) = damaged(100 + seed, 30);
    let cell_level = find_disconnected_cells_cell_level(&cache, &state);
    let narrow = find_disconnected_cells_with_narrow_phase(&cache, &state, 3);
    assert!(
      narrow.iter().all(|id| cell_level.binary_search(id).is_ok()),
      "seed {seed}: narrow {narrow:?} not within {cell_level:?}"
    );
  }
}

#[test]
fn law_hierarchical_equivalence() {
  for seed in 0..6 {
    let (cache, state) = damaged(200 + seed, 30);
    for size in [2, 3, 4] {
      let mut supercells = SupercellCache::new(size);
      assert_eq!(
        find_disconnected_cells_hierarchical(&cache, &mut supercells, &state, false),
        find_disconnected_cells_cell_level(&cache, &state),
        "seed {seed}, supercell {size}"
      );
      assert_eq!(
        find_disconnected_cells_hierarchical(&cache, &mut supercells, &state, true),
        find_disconnected_cells_subcell_level(&cache, &state),
        "seed {seed}, supercell {size}, sub-cell mode"
      );
    }
  }
}

#[test]
fn law_groups_partition_disconnected_set() {
  for seed in 0..6 {
    let (cache, state) = damaged(300 + seed, 35);
    let disconnected = find_disconnected_cells_subcell_level(&cache, &state);
    let groups = group_detached_cells(&disconnected, &cache, &state);

    let mut members: Vec<CellId> = groups.iter().flat_map(|g| g.cells.iter().copied()).collect();
    members.sort_unstable();
    assert_eq!(members, disconnected);

    let owner = |id: CellId| groups.iter().position(|g| g.cells.contains(&id));
    for (index, group) in groups.iter().enumerate() {
      for &id in &group.cells {
        for next in cache.neighbors(id).into_iter().flatten() {
          if let Some(other) = owner(next) {
            assert_eq!(other, index, "seed {seed}: groups {index} and {other} touch");
          }
        }
      }
    }
  }
}

#[test]
fn law_boundary_mask_bound() {
  for seed in 0..4 {
    let (cache, state) = damaged(400 + seed, 25);
    let face_bits = state.division() * state.division();
    for id in cache.solid_cells() {
      for dir in Direction::ALL {
        let mask = boundary_live_sub_cell_mask(id, dir, &state);
        assert!(mask.count_ones() <= face_bits);
        if state.is_destroyed(id) {
          assert_eq!(mask, 0);
        }
      }
    }
  }
}
