//! Authoring-time anchor editing.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GridCellCache;
use crate::types::CellId;

/// Rectangle in the layout's local space. Its normal is `rotation * +Z`;
/// cells behind the plane (opposite the normal) are selected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinitePlane {
  pub center: Vec3,
  pub rotation: Quat,
  /// Half extents along `rotation * +X` and `rotation * +Y`.
  pub half_size: Vec2,
}

impl FinitePlane {
  pub fn new(center: Vec3, rotation: Quat, half_size: Vec2) -> Self {
    Self {
      center,
      rotation,
      half_size,
    }
  }

  /// Horizontal plane facing up.
  pub fn horizontal(center: Vec3, half_size: Vec2) -> Self {
    Self::new(center, Quat::IDENTITY, half_size)
  }

  #[inline]
  pub fn normal(&self) -> Vec3 {
    self.rotation * Vec3::Z
  }

  /// Behind or on the plane, and within the rectangle when projected onto it.
  pub fn selects(&self, point: Vec3) -> bool {
    let offset = point - self.center;
    if offset.dot(self.normal()) > 0.0 {
      return false;
    }
    let u = offset.dot(self.rotation * Vec3::X);
    let v = offset.dot(self.rotation * Vec3::Y);
    u.abs() <= self.half_size.x && v.abs() <= self.half_size.y
  }
}

/// How a plane edit combines with the current anchors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorMode {
  #[default]
  Add,
  Erase,
}

impl GridCellCache {
  /// Add or erase anchors for every solid cell whose center the plane selects.
  /// Returns the number of flags that changed.
  pub fn set_anchors_by_finite_plane(&mut self, plane: &FinitePlane, mode: AnchorMode) -> usize {
    let value = mode == AnchorMode::Add;
    let mut changed = 0;
    for id in 0..self.total_positions() as CellId {
      if !self.is_solid(id) || self.is_anchor(id) == value {
        continue;
      }
      if plane.selects(self.cell_center(id)) {
        self.set_anchor(id, value);
        changed += 1;
      }
    }
    debug!("Anchors: plane {:?} changed {} cells", mode, changed);
    changed
  }

  pub fn clear_all_anchors(&mut self) {
    self.anchors.iter_mut().for_each(|flag| *flag = false);
  }
}

#[cfg(test)]
mod tests {
  use glam::UVec3;

  use super::*;

  fn tower() -> GridCellCache {
    let mut cache = GridCellCache::solid_box(UVec3::new(2, 2, 4), Vec3::ONE);
    cache.clear_all_anchors();
    cache
  }

  #[test]
  fn test_clear_all_anchors() {
    let mut cache = GridCellCache::solid_box(UVec3::splat(2), Vec3::ONE);
    assert_eq!(cache.anchor_count(), 4);
    cache.clear_all_anchors();
    assert_eq!(cache.anchor_count(), 0);
  }

  #[test]
  fn test_plane_selects_cells_behind_it() {
    let mut cache = tower();
    let plane = FinitePlane::horizontal(Vec3::new(1.0, 1.0, 2.0), Vec2::splat(5.0));
    assert_eq!(cache.set_anchors_by_finite_plane(&plane, AnchorMode::Add), 8);
    assert!(cache.anchor_cells().all(|id| cache.id_to_coord(id).z < 2));
  }

  #[test]
  fn test_plane_rectangle_limits_selection() {
    let mut cache = tower();
    // Covers only the x < 1 column pair
    let plane = FinitePlane::horizontal(Vec3::new(0.5, 1.0, 4.0), Vec2::new(0.25, 5.0));
    cache.set_anchors_by_finite_plane(&plane, AnchorMode::Add);
    assert_eq!(cache.anchor_count(), 8);
    assert!(cache.anchor_cells().all(|id| cache.id_to_coord(id).x == 0));
  }

  #[test]
  fn test_tilted_plane_faces_sideways() {
    let mut cache = tower();
    // Normal along +X through x = 1: selects the x = 0 half
    let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
    let plane = FinitePlane::new(Vec3::new(1.0, 1.0, 2.0), rotation, Vec2::splat(5.0));
    assert!((plane.normal() - Vec3::X).length() < 1e-5);
    cache.set_anchors_by_finite_plane(&plane, AnchorMode::Add);
    assert_eq!(cache.anchor_count(), 8);
    assert!(cache.anchor_cells().all(|id| cache.id_to_coord(id).x == 0));
  }

  #[test]
  fn test_erase_mode_removes_anchors() {
    let mut cache = GridCellCache::solid_box(UVec3::new(4, 1, 2), Vec3::ONE);
    assert_eq!(cache.anchor_count(), 4);
    let plane = FinitePlane::horizontal(Vec3::new(0.5, 0.5, 1.0), Vec2::new(1.1, 1.0));
    assert_eq!(cache.set_anchors_by_finite_plane(&plane, AnchorMode::Erase), 2);
    assert_eq!(cache.anchor_cells().collect::<Vec<_>>(), vec![2, 3]);
  }

  #[test]
  fn test_empty_cells_never_anchor() {
    let mut solid = vec![true; 4];
    solid[1] = false;
    let mut cache =
      GridCellCache::from_solid_mask(UVec3::new(4, 1, 1), Vec3::ONE, Vec3::ZERO, solid).unwrap();
    let plane = FinitePlane::horizontal(Vec3::new(2.0, 0.5, 1.0), Vec2::splat(5.0));
    assert_eq!(cache.set_anchors_by_finite_plane(&plane, AnchorMode::Add), 3);
    assert!(!cache.is_anchor(1));
  }
}
