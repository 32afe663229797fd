//! Offline voxelization of a source into a [`GridCellCache`].
//!
//! # Pipeline
//!
//! ```text
//! CellSource ──► bounds ──► dims = ceil(extent / cell_size)
//!                              │
//!            ┌─────────────────┴─────────────────┐
//!       triangles?                          collision only
//!   triangle/box SAT per cell range     GJK of each element against
//!   (+ optional interior fill)          the cells under its bounds
//!            └─────────────────┬─────────────────┘
//!                              ▼
//!     triangle ownership ──► neighbor links ──► anchors by height
//! ```
//!
//! Solid marking is evaluated in parallel; results are gathered by cell id so
//! the output does not depend on thread scheduling.

use std::collections::VecDeque;

use glam::{Affine3A, IVec3, UVec3, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::GridCellCache;
use crate::bounds::{Aabb, Obb};
use crate::constants::{coord_to_id, id_to_coord, MAX_GRID_CELLS};
use crate::error::BuildError;
use crate::shape::intersect::{gjk_intersect, segment_distance_squared, SupportMap};
use crate::types::{CellId, Direction};

/// Tolerance for half-space containment.
const PLANE_EPSILON: f32 = 1e-5;

/// Geometry the builder can voxelize.
///
/// Implementations report everything in the asset's local space.
pub trait CellSource: Sync {
  /// Bounds of the whole source.
  fn bounds(&self) -> Aabb;

  /// Source triangles. Index `i` of the result is triangle id `i`.
  fn triangles(&self) -> Vec<[Vec3; 3]> {
    Vec::new()
  }

  /// Collision volumes, used when there are no triangles.
  fn collision(&self) -> &[CollisionElement] {
    &[]
  }
}

/// Indexed triangle list placed by a transform.
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
  pub positions: Vec<Vec3>,
  /// Three indices per triangle.
  pub indices: Vec<u32>,
  pub transform: Affine3A,
}

impl TriangleMesh {
  pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
    Self {
      positions,
      indices,
      transform: Affine3A::IDENTITY,
    }
  }

  pub fn with_transform(mut self, transform: Affine3A) -> Self {
    self.transform = transform;
    self
  }

  /// Closed axis-aligned box mesh (12 triangles).
  pub fn cuboid(min: Vec3, max: Vec3) -> Self {
    let positions = Aabb::new(min, max).corners().to_vec();
    // Corner i has bit 0 = +X, bit 1 = +Y, bit 2 = +Z
    #[rustfmt::skip]
    let indices = vec![
      0, 2, 4, 2, 6, 4, // -X
      1, 5, 3, 3, 5, 7, // +X
      0, 4, 1, 1, 4, 5, // -Y
      2, 3, 6, 3, 7, 6, // +Y
      0, 1, 2, 1, 3, 2, // -Z
      4, 6, 5, 5, 6, 7, // +Z
    ];
    Self::new(positions, indices)
  }
}

impl CellSource for TriangleMesh {
  fn bounds(&self) -> Aabb {
    Aabb::from_points(
      self
        .positions
        .iter()
        .map(|&p| self.transform.transform_point3(p)),
    )
  }

  fn triangles(&self) -> Vec<[Vec3; 3]> {
    let vertex = |i: u32| {
      self
        .positions
        .get(i as usize)
        .map(|&p| self.transform.transform_point3(p))
    };
    self
      .indices
      .chunks_exact(3)
      .filter_map(|tri| Some([vertex(tri[0])?, vertex(tri[1])?, vertex(tri[2])?]))
      .collect()
  }
}

/// Plane `normal · p = d`; points with `normal · p <= d` are inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfSpace {
  pub normal: Vec3,
  pub d: f32,
}

impl HalfSpace {
  pub fn new(normal: Vec3, d: f32) -> Self {
    Self { normal, d }
  }

  #[inline]
  pub fn contains(&self, point: Vec3) -> bool {
    self.normal.dot(point) <= self.d + PLANE_EPSILON
  }
}

/// Convex polytope: its vertices (for bounds) and bounding half-spaces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexHull {
  pub vertices: Vec<Vec3>,
  pub planes: Vec<HalfSpace>,
}

impl ConvexHull {
  pub fn new(vertices: Vec<Vec3>, planes: Vec<HalfSpace>) -> Self {
    Self { vertices, planes }
  }

  /// Box hull centered on the origin.
  pub fn cuboid(half_extents: Vec3) -> Self {
    let vertices = Aabb::from_center_half_extents(Vec3::ZERO, half_extents)
      .corners()
      .to_vec();
    let planes = Direction::ALL
      .into_iter()
      .map(|dir| {
        let normal = dir.offset().as_vec3();
        HalfSpace::new(normal, half_extents[dir.axis()])
      })
      .collect();
    Self { vertices, planes }
  }

  /// An empty plane list contains nothing.
  pub fn contains(&self, point: Vec3) -> bool {
    !self.planes.is_empty() && self.planes.iter().all(|plane| plane.contains(point))
  }
}

/// Shape of one collision element, in the element's own space.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionPrimitive {
  Hull(ConvexHull),
  Box { half_extents: Vec3 },
  Sphere { radius: f32 },
  /// Segment along Z from `-half_height` to `+half_height`, swept by `radius`.
  Capsule { radius: f32, half_height: f32 },
}

impl CollisionPrimitive {
  fn contains_local(&self, p: Vec3) -> bool {
    match self {
      CollisionPrimitive::Hull(hull) => hull.contains(p),
      CollisionPrimitive::Box { half_extents } => p.abs().cmple(*half_extents).all(),
      CollisionPrimitive::Sphere { radius } => p.length_squared() <= radius * radius,
      CollisionPrimitive::Capsule {
        radius,
        half_height,
      } => {
        let a = Vec3::new(0.0, 0.0, -half_height);
        let b = Vec3::new(0.0, 0.0, *half_height);
        segment_distance_squared(p, a, b) <= radius * radius
      }
    }
  }

  /// Farthest local point along `direction`.
  fn support_local(&self, direction: Vec3) -> Vec3 {
    match self {
      CollisionPrimitive::Hull(hull) => hull
        .vertices
        .iter()
        .copied()
        .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
        .unwrap_or(Vec3::ZERO),
      CollisionPrimitive::Box { half_extents } => {
        Vec3::select(direction.cmpge(Vec3::ZERO), *half_extents, -*half_extents)
      }
      CollisionPrimitive::Sphere { radius } => direction.normalize_or_zero() * *radius,
      CollisionPrimitive::Capsule {
        radius,
        half_height,
      } => {
        let z = if direction.z >= 0.0 { *half_height } else { -half_height };
        Vec3::new(0.0, 0.0, z) + direction.normalize_or_zero() * *radius
      }
    }
  }

  fn local_interior_point(&self) -> Vec3 {
    match self {
      CollisionPrimitive::Hull(hull) if !hull.vertices.is_empty() => {
        hull.vertices.iter().copied().sum::<Vec3>() / hull.vertices.len() as f32
      }
      _ => Vec3::ZERO,
    }
  }

  fn local_bounds(&self) -> Aabb {
    match self {
      CollisionPrimitive::Hull(hull) => Aabb::from_points(hull.vertices.iter().copied()),
      CollisionPrimitive::Box { half_extents } => {
        Aabb::from_center_half_extents(Vec3::ZERO, *half_extents)
      }
      CollisionPrimitive::Sphere { radius } => {
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius))
      }
      CollisionPrimitive::Capsule {
        radius,
        half_height,
      } => Aabb::from_center_half_extents(
        Vec3::ZERO,
        Vec3::new(*radius, *radius, half_height + radius),
      ),
    }
  }
}

/// A primitive placed in the source's space.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionElement {
  pub primitive: CollisionPrimitive,
  pub transform: Affine3A,
}

impl CollisionElement {
  pub fn new(primitive: CollisionPrimitive, transform: Affine3A) -> Self {
    Self {
      primitive,
      transform,
    }
  }

  pub fn bounds(&self) -> Aabb {
    self.primitive.local_bounds().transformed(&self.transform)
  }

  pub fn contains_point(&self, point: Vec3) -> bool {
    let local = self.transform.inverse().transform_point3(point);
    self.primitive.contains_local(local)
  }

  /// Exact overlap with a box. Touching counts.
  pub fn intersects_obb(&self, obb: &Obb) -> bool {
    if let CollisionPrimitive::Hull(hull) = &self.primitive {
      if hull.vertices.is_empty() {
        return false;
      }
    }
    self.contains_point(obb.center) || gjk_intersect(self, obb)
  }
}

/// Local support mapped through the transform: `s(d) = T(s_local(Mᵀ d))`
/// for the linear part `M`.
impl SupportMap for CollisionElement {
  fn support(&self, direction: Vec3) -> Vec3 {
    let local = self.transform.matrix3.transpose() * direction;
    self.transform.transform_point3(self.primitive.support_local(local))
  }

  fn interior_point(&self) -> Vec3 {
    self.transform.transform_point3(self.primitive.local_interior_point())
  }
}

/// Collision-only source.
#[derive(Clone, Debug, Default)]
pub struct CollisionBody {
  pub elements: Vec<CollisionElement>,
}

impl CollisionBody {
  pub fn new(elements: Vec<CollisionElement>) -> Self {
    Self { elements }
  }

  pub fn with_element(mut self, primitive: CollisionPrimitive, transform: Affine3A) -> Self {
    self.elements.push(CollisionElement::new(primitive, transform));
    self
  }
}

impl CellSource for CollisionBody {
  fn bounds(&self) -> Aabb {
    self
      .elements
      .iter()
      .fold(Aabb::empty(), |acc, element| acc.union(&element.bounds()))
  }

  fn collision(&self) -> &[CollisionElement] {
    &self.elements
  }
}

/// Builder settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
  /// Cell edge lengths in local units.
  pub cell_size: Vec3,
  /// Solid cells whose bottom is within this height of the bounds' minimum
  /// become anchors.
  pub anchor_height: f32,
  /// Fill enclosed empty space of triangle sources.
  pub fill_interior: bool,
}

impl Default for BuilderConfig {
  fn default() -> Self {
    Self {
      cell_size: Vec3::ONE,
      anchor_height: 0.0,
      fill_interior: false,
    }
  }
}

impl BuilderConfig {
  pub fn with_cell_size(mut self, cell_size: Vec3) -> Self {
    self.cell_size = cell_size;
    self
  }

  pub fn with_anchor_height(mut self, height: f32) -> Self {
    self.anchor_height = height;
    self
  }

  pub fn with_fill_interior(mut self, fill: bool) -> Self {
    self.fill_interior = fill;
    self
  }
}

/// Voxelizes sources into grid caches.
#[derive(Clone, Debug, Default)]
pub struct GridCellBuilder {
  config: BuilderConfig,
}

impl GridCellBuilder {
  pub fn new(config: BuilderConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &BuilderConfig {
    &self.config
  }

  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "builder::build"))]
  pub fn build(&self, source: &dyn CellSource) -> Result<GridCellCache, BuildError> {
    let cell_size = self.config.cell_size;
    if !cell_size.is_finite() || cell_size.cmple(Vec3::ZERO).any() {
      return Err(BuildError::InvalidCellSize(cell_size.to_array()));
    }

    let triangles = source.triangles();
    let elements = source.collision();
    if triangles.is_empty() && elements.is_empty() {
      warn!("Builder: source has no geometry");
      return Err(BuildError::EmptySource);
    }

    let bounds = source.bounds();
    // Flat and point sources have no cells to fill
    if !bounds.min.is_finite() || !bounds.max.is_finite() || !bounds.has_volume() {
      return Err(BuildError::DegenerateBounds {
        min: bounds.min.to_array(),
        max: bounds.max.to_array(),
      });
    }

    let counts = (bounds.size() / cell_size).ceil().max(Vec3::ONE);
    let dims = counts.as_uvec3();
    let total = (dims.x as u64) * (dims.y as u64) * (dims.z as u64);
    if counts.max_element() > MAX_GRID_CELLS as f32 || total > MAX_GRID_CELLS as u64 {
      return Err(BuildError::TooManyCells {
        dims: dims.to_array(),
        limit: MAX_GRID_CELLS,
      });
    }

    let grid = GridFrame {
      dims,
      origin: bounds.min,
      cell_size,
    };

    let mut solid = if triangles.is_empty() {
      grid.mark_by_elements(elements)
    } else {
      grid.mark_by_triangles(&triangles)
    };
    if self.config.fill_interior && !triangles.is_empty() {
      let filled = grid.fill_interior(&mut solid);
      debug!("Builder: interior fill added {} cells", filled);
    }

    let owned = grid.assign_triangles(&triangles);

    let mut cache = GridCellCache::from_solid_mask(dims, cell_size, bounds.min, solid).ok_or(
      BuildError::TooManyCells {
        dims: dims.to_array(),
        limit: MAX_GRID_CELLS,
      },
    )?;
    cache.set_bounds(bounds);
    cache.set_triangles(owned);
    cache.set_anchors_by_height(self.config.anchor_height);

    debug!(
      "Builder: {}x{}x{} grid, {} solid, {} anchors, {} triangles",
      dims.x,
      dims.y,
      dims.z,
      cache.solid_count(),
      cache.anchor_count(),
      triangles.len()
    );
    Ok(cache)
  }
}

/// Grid placement shared by the marking passes.
struct GridFrame {
  dims: UVec3,
  origin: Vec3,
  cell_size: Vec3,
}

impl GridFrame {
  fn total(&self) -> usize {
    (self.dims.x as usize) * (self.dims.y as usize) * (self.dims.z as usize)
  }

  fn id(&self, coord: UVec3) -> CellId {
    coord_to_id(coord.x, coord.y, coord.z, self.dims.x, self.dims.y)
  }

  fn center(&self, coord: UVec3) -> Vec3 {
    self.origin + (coord.as_vec3() + Vec3::splat(0.5)) * self.cell_size
  }

  /// Grid coordinate containing `point`, clamped into the grid.
  fn clamp_coord(&self, point: Vec3) -> UVec3 {
    ((point - self.origin) / self.cell_size)
      .floor()
      .as_ivec3()
      .clamp(IVec3::ZERO, self.dims.as_ivec3() - IVec3::ONE)
      .as_uvec3()
  }

  fn mark_by_triangles(&self, triangles: &[[Vec3; 3]]) -> Vec<bool> {
    let half = self.cell_size * 0.5;
    let hits: Vec<CellId> = triangles
      .par_iter()
      .flat_map_iter(|tri| {
        let bounds = Aabb::from_points(tri.iter().copied());
        let lo = self.clamp_coord(bounds.min);
        let hi = self.clamp_coord(bounds.max);
        let mut out = Vec::new();
        for z in lo.z..=hi.z {
          for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
              let coord = UVec3::new(x, y, z);
              if triangle_overlaps_box(tri, self.center(coord), half) {
                out.push(self.id(coord));
              }
            }
          }
        }
        out
      })
      .collect();

    let mut solid = vec![false; self.total()];
    for id in hits {
      solid[id as usize] = true;
    }
    solid
  }

  /// Cells whose box intersects any collision element.
  fn mark_by_elements(&self, elements: &[CollisionElement]) -> Vec<bool> {
    let half = self.cell_size * 0.5;
    let hits: Vec<CellId> = elements
      .par_iter()
      .flat_map_iter(|element| {
        let bounds = element.bounds();
        let lo = self.clamp_coord(bounds.min);
        let hi = self.clamp_coord(bounds.max);
        let mut out = Vec::new();
        for z in lo.z..=hi.z {
          for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
              let coord = UVec3::new(x, y, z);
              let cell = Obb::from_aabb(&Aabb::from_center_half_extents(self.center(coord), half));
              if element.intersects_obb(&cell) {
                out.push(self.id(coord));
              }
            }
          }
        }
        out
      })
      .collect();

    let mut solid = vec![false; self.total()];
    for id in hits {
      solid[id as usize] = true;
    }
    solid
  }

  /// Mark every empty cell not reachable from the grid boundary through
  /// empty cells. Returns the number of cells filled.
  fn fill_interior(&self, solid: &mut [bool]) -> usize {
    let total = self.total();
    let mut outside = vec![false; total];
    let mut queue = VecDeque::new();

    for id in 0..total as CellId {
      let (x, y, z) = id_to_coord(id, self.dims.x, self.dims.y);
      let coord = UVec3::new(x, y, z);
      let on_boundary = coord.cmpeq(UVec3::ZERO).any() || coord.cmpeq(self.dims - UVec3::ONE).any();
      if on_boundary && !solid[id as usize] {
        outside[id as usize] = true;
        queue.push_back(coord);
      }
    }

    while let Some(coord) = queue.pop_front() {
      for dir in Direction::ALL {
        let next = coord.as_ivec3() + dir.offset();
        if next.cmplt(IVec3::ZERO).any() || next.cmpge(self.dims.as_ivec3()).any() {
          continue;
        }
        let next = next.as_uvec3();
        let index = self.id(next) as usize;
        if !solid[index] && !outside[index] {
          outside[index] = true;
          queue.push_back(next);
        }
      }
    }

    let mut filled = 0;
    for (flag, out) in solid.iter_mut().zip(&outside) {
      if !*flag && !*out {
        *flag = true;
        filled += 1;
      }
    }
    filled
  }

  /// Each triangle goes to the cell containing its centroid.
  fn assign_triangles(&self, triangles: &[[Vec3; 3]]) -> Vec<Vec<u32>> {
    let mut owned = vec![Vec::new(); self.total()];
    for (index, tri) in triangles.iter().enumerate() {
      let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
      let id = self.id(self.clamp_coord(centroid));
      owned[id as usize].push(index as u32);
    }
    owned
  }
}

/// Separating axis test of a triangle against an axis-aligned box: 3 box
/// normals, the triangle normal and 9 edge cross products. Touching counts
/// as overlap.
pub fn triangle_overlaps_box(tri: &[Vec3; 3], center: Vec3, half: Vec3) -> bool {
  let v = [tri[0] - center, tri[1] - center, tri[2] - center];
  let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

  let separated = |axis: Vec3| {
    if axis.length_squared() < 1e-12 {
      return false;
    }
    let p = [axis.dot(v[0]), axis.dot(v[1]), axis.dot(v[2])];
    let min = p[0].min(p[1]).min(p[2]);
    let max = p[0].max(p[1]).max(p[2]);
    let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
    min > r || max < -r
  };

  if [Vec3::X, Vec3::Y, Vec3::Z].into_iter().any(separated) {
    return false;
  }
  if separated(edges[0].cross(edges[1])) {
    return false;
  }
  for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
    for edge in edges {
      if separated(box_axis.cross(edge)) {
        return false;
      }
    }
  }
  true
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
