//! Exact shape predicates against world-space boxes.
//!
//! ```text
//! Sphere    closest point on the OBB vs radius
//! Box       separating axis test (3 + 3 face axes, 9 edge cross products)
//! Cylinder  GJK over support functions
//! Capsule   GJK over support functions
//! ```
//!
//! Boundary contact counts as intersection.

use glam::Vec3;

use super::DestructionShape;
use crate::bounds::Obb;

/// Iteration cap for GJK. Non-converging queries report a hit.
const GJK_MAX_ITERATIONS: usize = 64;

const EPSILON: f32 = 1e-6;

/// Convex body described by its farthest point along a direction.
pub trait SupportMap {
  fn support(&self, direction: Vec3) -> Vec3;

  /// Any interior point, used to seed the search direction.
  fn interior_point(&self) -> Vec3;
}

impl SupportMap for Obb {
  fn support(&self, direction: Vec3) -> Vec3 {
    Obb::support(self, direction)
  }

  fn interior_point(&self) -> Vec3 {
    self.center
  }
}

impl SupportMap for DestructionShape {
  fn support(&self, direction: Vec3) -> Vec3 {
    match *self {
      DestructionShape::Sphere { center, radius } => center + direction.normalize_or_zero() * radius,
      DestructionShape::Box {
        center,
        rotation,
        half_extents,
        ..
      } => box_obb(center, rotation, half_extents).support(direction),
      DestructionShape::Cylinder {
        center,
        rotation,
        radius,
        half_height,
      } => {
        let local = rotation.inverse() * direction;
        let radial = glam::Vec2::new(local.x, local.y).normalize_or_zero() * radius;
        let z = if local.z >= 0.0 { half_height } else { -half_height };
        center + rotation * Vec3::new(radial.x, radial.y, z)
      }
      DestructionShape::Capsule { start, end, radius } => {
        let tip = if direction.dot(end - start) >= 0.0 { end } else { start };
        tip + direction.normalize_or_zero() * radius
      }
    }
  }

  fn interior_point(&self) -> Vec3 {
    self.center()
  }
}

fn box_obb(center: Vec3, rotation: glam::Quat, half_extents: Vec3) -> Obb {
  Obb::new(
    center,
    [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z],
    half_extents,
  )
}

impl DestructionShape {
  /// True if the world-space point lies inside or on the shape.
  pub fn contains_point(&self, point: Vec3) -> bool {
    match *self {
      DestructionShape::Sphere { center, radius } => (point - center).length_squared() <= radius * radius,
      DestructionShape::Box {
        center,
        rotation,
        half_extents,
        ..
      } => {
        let local = (rotation.inverse() * (point - center)).abs();
        local.cmple(half_extents).all()
      }
      DestructionShape::Cylinder {
        center,
        rotation,
        radius,
        half_height,
      } => {
        let local = rotation.inverse() * (point - center);
        local.z.abs() <= half_height && local.x * local.x + local.y * local.y <= radius * radius
      }
      DestructionShape::Capsule { start, end, radius } => {
        segment_distance_squared(point, start, end) <= radius * radius
      }
    }
  }

  /// Exact overlap with a world-space oriented box.
  pub fn intersects_obb(&self, obb: &Obb) -> bool {
    match *self {
      DestructionShape::Sphere { center, radius } => {
        (obb.closest_point(center) - center).length_squared() <= radius * radius
      }
      DestructionShape::Box {
        center,
        rotation,
        half_extents,
        ..
      } => obb_overlap(&box_obb(center, rotation, half_extents), obb),
      DestructionShape::Cylinder { .. } | DestructionShape::Capsule { .. } => gjk_intersect(self, obb),
    }
  }
}

/// Squared distance from `point` to the segment `a..b`.
pub fn segment_distance_squared(point: Vec3, a: Vec3, b: Vec3) -> f32 {
  let ab = b - a;
  let len_sq = ab.length_squared();
  let t = if len_sq > 0.0 {
    ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0)
  } else {
    0.0
  };
  (a + ab * t - point).length_squared()
}

/// Separating axis test between two oriented boxes.
pub fn obb_overlap(a: &Obb, b: &Obb) -> bool {
  let d = b.center - a.center;
  let separated = |axis: Vec3| {
    d.dot(axis).abs() > a.projected_radius(axis) + b.projected_radius(axis) + EPSILON
  };

  for axis in a.axes.iter().chain(b.axes.iter()) {
    if separated(*axis) {
      return false;
    }
  }
  for ea in &a.axes {
    for eb in &b.axes {
      let axis = ea.cross(*eb);
      // Parallel edges are covered by the face axes
      if axis.length_squared() < EPSILON {
        continue;
      }
      if separated(axis.normalize()) {
        return false;
      }
    }
  }
  true
}

/// Boolean GJK: do two convex bodies share a point?
pub fn gjk_intersect(a: &impl SupportMap, b: &impl SupportMap) -> bool {
  let support = |d: Vec3| a.support(d) - b.support(-d);

  let mut direction = a.interior_point() - b.interior_point();
  if direction.length_squared() < EPSILON {
    return true;
  }

  let mut simplex = Simplex::default();
  let first = support(direction);
  simplex.push(first);
  direction = -first;

  for _ in 0..GJK_MAX_ITERATIONS {
    if direction.length_squared() < EPSILON * EPSILON {
      return true;
    }
    let point = support(direction);
    if point.dot(direction) < 0.0 {
      return false;
    }
    simplex.push(point);
    if simplex.contains_origin(&mut direction) {
      return true;
    }
  }
  true
}

/// Up to four Minkowski-difference points, newest last.
#[derive(Default)]
struct Simplex {
  points: [Vec3; 4],
  len: usize,
}

impl Simplex {
  fn push(&mut self, point: Vec3) {
    self.points[self.len] = point;
    self.len += 1;
  }

  fn set(&mut self, points: &[Vec3]) {
    self.points[..points.len()].copy_from_slice(points);
    self.len = points.len();
  }

  /// Reduce to the feature nearest the origin and update the search direction.
  fn contains_origin(&mut self, direction: &mut Vec3) -> bool {
    match self.len {
      2 => self.line(direction),
      3 => self.triangle(direction),
      4 => self.tetrahedron(direction),
      _ => false,
    }
  }

  fn line(&mut self, direction: &mut Vec3) -> bool {
    let [b, a] = [self.points[0], self.points[1]];
    let ab = b - a;
    let ao = -a;
    if ab.dot(ao) > 0.0 {
      let perp = ab.cross(ao).cross(ab);
      if perp.length_squared() < EPSILON * EPSILON {
        // Origin on the segment
        return true;
      }
      *direction = perp;
    } else {
      self.set(&[a]);
      *direction = ao;
    }
    false
  }

  fn triangle(&mut self, direction: &mut Vec3) -> bool {
    let [c, b, a] = [self.points[0], self.points[1], self.points[2]];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
      if ac.dot(ao) > 0.0 {
        self.set(&[c, a]);
        *direction = ac.cross(ao).cross(ac);
        return false;
      }
      self.set(&[b, a]);
      return self.line(direction);
    }
    if ab.cross(abc).dot(ao) > 0.0 {
      self.set(&[b, a]);
      return self.line(direction);
    }

    let side = abc.dot(ao);
    if side.abs() < EPSILON * EPSILON {
      // Origin inside the triangle
      return true;
    }
    *direction = if side > 0.0 { abc } else { -abc };
    false
  }

  fn tetrahedron(&mut self, direction: &mut Vec3) -> bool {
    let [d, c, b, a] = self.points;
    let ao = -a;
    for (p, q, opposite) in [(b, c, d), (c, d, b), (d, b, c)] {
      let mut normal = (p - a).cross(q - a);
      if normal.dot(opposite - a) > 0.0 {
        normal = -normal;
      }
      if normal.dot(ao) > 0.0 {
        self.set(&[q, p, a]);
        return self.triangle(direction);
      }
    }
    true
  }
}

#[cfg(test)]
#[path = "intersect_test.rs"]
mod intersect_test;
