//! Grid cell layout: the immutable spatial partition of a destructible asset.
//!
//! A [`GridCellCache`] is built once per asset (see [`builder`]) and shared
//! read-only by every instance of that asset. Per-instance damage lives in
//! [`crate::state::CellState`]; nothing in here changes after construction
//! except through the authoring-time anchor editors in [`anchors`].
//!
//! # Storage
//!
//! All per-cell data are flat arrays indexed by [`CellId`], covering every
//! grid position. Positions that do not intersect the source are present but
//! not solid; they have no neighbor links and never take part in searches.

pub mod anchors;
pub mod builder;

pub use anchors::{AnchorMode, FinitePlane};
pub use builder::{
  BuilderConfig, CellSource, CollisionBody, CollisionElement, CollisionPrimitive, ConvexHull,
  GridCellBuilder, HalfSpace, TriangleMesh,
};

use glam::{Affine3A, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::{Aabb, Obb};
use crate::constants::{coord_to_id, id_to_coord, NEIGHBOR_COUNT};
use crate::types::{CellId, Direction};

/// Immutable grid partition of a source mesh or collision volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridCellCache {
  /// Cells per axis.
  dims: UVec3,
  /// Cell edge lengths in local units.
  cell_size: Vec3,
  /// Local-space minimum corner of cell (0, 0, 0).
  origin: Vec3,
  /// Source bounds the grid was derived from.
  bounds: Aabb,
  solid: Vec<bool>,
  anchors: Vec<bool>,
  neighbors: Vec<[Option<CellId>; NEIGHBOR_COUNT]>,
  /// Source triangle indices owned by each cell.
  triangles: Vec<Vec<u32>>,
}

impl GridCellCache {
  /// Build a cache from an explicit solid mask (one flag per grid position).
  ///
  /// Neighbors are linked between face-adjacent solid cells; no anchors are set.
  /// Returns `None` when the mask length does not match `dims`.
  pub fn from_solid_mask(dims: UVec3, cell_size: Vec3, origin: Vec3, solid: Vec<bool>) -> Option<Self> {
    let total = (dims.x as usize) * (dims.y as usize) * (dims.z as usize);
    if solid.len() != total {
      return None;
    }
    let bounds = Aabb::new(origin, origin + cell_size * dims.as_vec3());
    let mut cache = Self {
      dims,
      cell_size,
      origin,
      bounds,
      anchors: vec![false; total],
      neighbors: vec![[None; NEIGHBOR_COUNT]; total],
      triangles: vec![Vec::new(); total],
      solid,
    };
    cache.link_neighbors();
    Some(cache)
  }

  /// A fully solid box of cells with the bottom layer anchored.
  pub fn solid_box(dims: UVec3, cell_size: Vec3) -> Self {
    let total = (dims.x * dims.y * dims.z) as usize;
    let mut cache = Self {
      dims,
      cell_size,
      origin: Vec3::ZERO,
      bounds: Aabb::new(Vec3::ZERO, cell_size * dims.as_vec3()),
      solid: vec![true; total],
      anchors: vec![false; total],
      neighbors: vec![[None; NEIGHBOR_COUNT]; total],
      triangles: vec![Vec::new(); total],
    };
    cache.link_neighbors();
    cache.set_anchors_by_height(0.0);
    cache
  }

  pub(crate) fn set_bounds(&mut self, bounds: Aabb) {
    self.bounds = bounds;
  }

  pub(crate) fn set_triangles(&mut self, triangles: Vec<Vec<u32>>) {
    debug_assert_eq!(triangles.len(), self.total_positions());
    self.triangles = triangles;
  }

  /// Link every pair of face-adjacent solid cells.
  fn link_neighbors(&mut self) {
    for id in 0..self.total_positions() as CellId {
      if !self.solid[id as usize] {
        continue;
      }
      let mut links = [None; NEIGHBOR_COUNT];
      for dir in Direction::ALL {
        links[dir.index()] = self
          .offset_cell(id, dir)
          .filter(|&n| self.solid[n as usize]);
      }
      self.neighbors[id as usize] = links;
    }
  }

  /// True when the cache has a usable grid: non-empty dims, positive cell
  /// size, consistent array lengths, and links and anchors that agree with
  /// the solid mask. Baked caches loaded from disk are checked here before
  /// any search indexes through their links.
  pub fn is_valid(&self) -> bool {
    let total = self.total_positions();
    total > 0
      && self.cell_size.is_finite()
      && self.cell_size.cmpgt(Vec3::ZERO).all()
      && self.solid.len() == total
      && self.anchors.len() == total
      && self.neighbors.len() == total
      && self.triangles.len() == total
      && self.links_consistent()
  }

  /// Every link joins face-adjacent solid cells, every solid pair is linked,
  /// and only solid cells are anchors.
  fn links_consistent(&self) -> bool {
    (0..self.total_positions() as CellId).all(|id| {
      let solid = self.solid[id as usize];
      let links = &self.neighbors[id as usize];
      (solid || !self.anchors[id as usize])
        && Direction::ALL.into_iter().all(|dir| {
          let expected = self
            .offset_cell(id, dir)
            .filter(|&n| solid && self.solid[n as usize]);
          links[dir.index()] == expected
        })
    })
  }

  #[inline]
  pub fn dims(&self) -> UVec3 {
    self.dims
  }

  #[inline]
  pub fn cell_size(&self) -> Vec3 {
    self.cell_size
  }

  #[inline]
  pub fn origin(&self) -> Vec3 {
    self.origin
  }

  #[inline]
  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  /// Local box covered by the whole grid.
  pub fn grid_bounds(&self) -> Aabb {
    Aabb::new(self.origin, self.origin + self.cell_size * self.dims.as_vec3())
  }

  /// Number of grid positions (solid or not).
  #[inline]
  pub fn total_positions(&self) -> usize {
    (self.dims.x as usize) * (self.dims.y as usize) * (self.dims.z as usize)
  }

  #[inline]
  pub fn contains(&self, id: CellId) -> bool {
    (id as usize) < self.total_positions()
  }

  #[inline]
  pub fn is_solid(&self, id: CellId) -> bool {
    self.solid.get(id as usize).copied().unwrap_or(false)
  }

  #[inline]
  pub fn is_anchor(&self, id: CellId) -> bool {
    self.anchors.get(id as usize).copied().unwrap_or(false)
  }

  /// Neighbor across `dir`, if both cells are solid.
  #[inline]
  pub fn neighbor(&self, id: CellId, dir: Direction) -> Option<CellId> {
    self
      .neighbors
      .get(id as usize)
      .and_then(|links| links[dir.index()])
  }

  /// All six neighbor links in traversal order.
  #[inline]
  pub fn neighbors(&self, id: CellId) -> [Option<CellId>; NEIGHBOR_COUNT] {
    self
      .neighbors
      .get(id as usize)
      .copied()
      .unwrap_or([None; NEIGHBOR_COUNT])
  }

  /// Source triangle indices owned by a cell.
  pub fn triangles(&self, id: CellId) -> &[u32] {
    self.triangles.get(id as usize).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Solid cell ids in ascending order.
  pub fn solid_cells(&self) -> impl Iterator<Item = CellId> + '_ {
    (0..self.total_positions() as CellId).filter(move |&id| self.solid[id as usize])
  }

  /// Anchor cell ids in ascending order.
  pub fn anchor_cells(&self) -> impl Iterator<Item = CellId> + '_ {
    (0..self.total_positions() as CellId).filter(move |&id| self.anchors[id as usize])
  }

  pub fn solid_count(&self) -> usize {
    self.solid.iter().filter(|&&s| s).count()
  }

  pub fn anchor_count(&self) -> usize {
    self.anchors.iter().filter(|&&a| a).count()
  }

  #[inline]
  pub fn coord_to_id(&self, coord: UVec3) -> CellId {
    coord_to_id(coord.x, coord.y, coord.z, self.dims.x, self.dims.y)
  }

  #[inline]
  pub fn id_to_coord(&self, id: CellId) -> UVec3 {
    let (x, y, z) = id_to_coord(id, self.dims.x, self.dims.y);
    UVec3::new(x, y, z)
  }

  /// Grid position across `dir`, ignoring solidity.
  pub fn offset_cell(&self, id: CellId, dir: Direction) -> Option<CellId> {
    let coord = self.id_to_coord(id).as_ivec3() + dir.offset();
    if coord.cmplt(glam::IVec3::ZERO).any() || coord.cmpge(self.dims.as_ivec3()).any() {
      return None;
    }
    Some(self.coord_to_id(coord.as_uvec3()))
  }

  /// Direction from `a` to a face-adjacent cell `b`.
  pub fn direction_between(&self, a: CellId, b: CellId) -> Option<Direction> {
    Direction::ALL
      .into_iter()
      .find(|&dir| self.offset_cell(a, dir) == Some(b))
  }

  /// Local-space box of a cell.
  pub fn cell_bounds(&self, id: CellId) -> Aabb {
    let min = self.origin + self.id_to_coord(id).as_vec3() * self.cell_size;
    Aabb::new(min, min + self.cell_size)
  }

  /// Local-space center of a cell.
  #[inline]
  pub fn cell_center(&self, id: CellId) -> Vec3 {
    self.origin + (self.id_to_coord(id).as_vec3() + Vec3::splat(0.5)) * self.cell_size
  }

  /// World-space center of a cell under an instance transform.
  #[inline]
  pub fn cell_world_center(&self, id: CellId, transform: &Affine3A) -> Vec3 {
    transform.transform_point3(self.cell_center(id))
  }

  /// World-space oriented box of a cell.
  pub fn cell_world_obb(&self, id: CellId, transform: &Affine3A) -> Obb {
    Obb::from_local_aabb(&self.cell_bounds(id), transform)
  }

  /// Local-space box of a sub-cell.
  pub fn sub_cell_bounds(&self, id: CellId, sub: u32, division: u32) -> Aabb {
    let cell = self.cell_bounds(id);
    let (sx, sy, sz) = crate::constants::sub_index_to_coord(sub, division);
    let step = self.cell_size / division as f32;
    let min = cell.min + Vec3::new(sx as f32, sy as f32, sz as f32) * step;
    Aabb::new(min, min + step)
  }

  /// Solid cells whose local box overlaps `local`, ascending.
  pub fn cells_overlapping(&self, local: &Aabb) -> Vec<CellId> {
    if !self.is_valid() || !local.is_valid() || !local.overlaps(&self.grid_bounds()) {
      return Vec::new();
    }
    let max_index = self.dims.as_ivec3() - glam::IVec3::ONE;
    let lo = ((local.min - self.origin) / self.cell_size)
      .floor()
      .as_ivec3()
      .clamp(glam::IVec3::ZERO, max_index);
    let hi = ((local.max - self.origin) / self.cell_size)
      .floor()
      .as_ivec3()
      .clamp(glam::IVec3::ZERO, max_index);

    let mut out = Vec::new();
    for z in lo.z..=hi.z {
      for y in lo.y..=hi.y {
        for x in lo.x..=hi.x {
          let id = coord_to_id(x as u32, y as u32, z as u32, self.dims.x, self.dims.y);
          if self.solid[id as usize] {
            out.push(id);
          }
        }
      }
    }
    out
  }

  /// Broad phase: solid cells whose box may overlap a world-space AABB.
  pub fn cells_overlapping_world(&self, world: &Aabb, transform: &Affine3A) -> Vec<CellId> {
    if !world.is_valid() {
      return Vec::new();
    }
    let local = world.transformed(&transform.inverse());
    self.cells_overlapping(&local)
  }

  /// Anchor every solid cell whose bottom lies within `threshold` of the
  /// source bounds' minimum height. Replaces the current anchor set.
  pub fn set_anchors_by_height(&mut self, threshold: f32) {
    let base = self.bounds.min.z;
    for id in 0..self.total_positions() as CellId {
      let bottom = self.cell_bounds(id).min.z;
      self.anchors[id as usize] = self.solid[id as usize] && bottom - base <= threshold + f32::EPSILON;
    }
  }

  /// Set or clear a single anchor flag. Non-solid cells cannot be anchors.
  pub fn set_anchor(&mut self, id: CellId, anchor: bool) {
    if let Some(flag) = self.anchors.get_mut(id as usize) {
      *flag = anchor && self.solid[id as usize];
    }
  }
}
