//! Axis-aligned and oriented bounding boxes.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// Used for grid bounds, cell boxes in grid-local space and the broad-phase
/// envelope of destruction shapes in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
	/// Minimum corner (inclusive).
	pub min: Vec3,
	/// Maximum corner (inclusive).
	pub max: Vec3,
}

impl Aabb {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: Vec3, max: Vec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create AABB with inverted extents (ready for encapsulation).
	pub fn empty() -> Self {
		Self {
			min: Vec3::splat(f32::INFINITY),
			max: Vec3::splat(f32::NEG_INFINITY),
		}
	}

	/// Create a new AABB from center and half-extents.
	pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
		Self {
			min: center - half_extents,
			max: center + half_extents,
		}
	}

	/// Smallest AABB containing every point.
	pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
		let mut aabb = Self::empty();
		for p in points {
			aabb.encapsulate(p);
		}
		aabb
	}

	/// Expand AABB to include a point.
	#[inline]
	pub fn encapsulate(&mut self, point: Vec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	/// Expand AABB to include another box.
	#[inline]
	pub fn union(&self, other: &Aabb) -> Aabb {
		Aabb {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}

	/// Grow the box by `amount` on every side.
	#[inline]
	pub fn expanded(&self, amount: f32) -> Aabb {
		Aabb {
			min: self.min - Vec3::splat(amount),
			max: self.max + Vec3::splat(amount),
		}
	}

	/// Check if AABB is valid (min <= max on all axes).
	pub fn is_valid(&self) -> bool {
		self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
	}

	/// True when every extent is finite and strictly positive.
	pub fn has_volume(&self) -> bool {
		let size = self.size();
		size.is_finite() && size.x > 0.0 && size.y > 0.0 && size.z > 0.0
	}

	/// Check if this AABB overlaps with another.
	///
	/// Two AABBs overlap if they share any interior or boundary points.
	#[inline]
	pub fn overlaps(&self, other: &Aabb) -> bool {
		self.min.x <= other.max.x
			&& self.max.x >= other.min.x
			&& self.min.y <= other.max.y
			&& self.max.y >= other.min.y
			&& self.min.z <= other.max.z
			&& self.max.z >= other.min.z
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: Vec3) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
			&& point.z >= self.min.z
			&& point.z <= self.max.z
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> Vec3 {
		(self.min + self.max) * 0.5
	}

	#[inline]
	pub fn half_extents(&self) -> Vec3 {
		self.size() * 0.5
	}

	/// The 8 corners, bit 0 = X, bit 1 = Y, bit 2 = Z selecting max.
	pub fn corners(&self) -> [Vec3; 8] {
		std::array::from_fn(|i| {
			Vec3::new(
				if i & 1 != 0 { self.max.x } else { self.min.x },
				if i & 2 != 0 { self.max.y } else { self.min.y },
				if i & 4 != 0 { self.max.z } else { self.min.z },
			)
		})
	}

	/// Envelope of this box after an affine transform.
	pub fn transformed(&self, transform: &Affine3A) -> Aabb {
		Aabb::from_points(self.corners().map(|c| transform.transform_point3(c)))
	}
}

impl Default for Aabb {
	fn default() -> Self {
		Self::empty()
	}
}

/// Oriented bounding box in world space.
///
/// Produced from a grid-local box and the instance transform. Rotation plus
/// non-uniform scale keep the transformed box axes orthogonal, so the result
/// is exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
	pub center: Vec3,
	/// Unit axes.
	pub axes: [Vec3; 3],
	/// Half size along each axis.
	pub half_extents: Vec3,
}

impl Obb {
	pub fn new(center: Vec3, axes: [Vec3; 3], half_extents: Vec3) -> Self {
		Self {
			center,
			axes,
			half_extents,
		}
	}

	/// Axis-aligned box as an OBB.
	pub fn from_aabb(aabb: &Aabb) -> Self {
		Self::new(aabb.center(), [Vec3::X, Vec3::Y, Vec3::Z], aabb.half_extents())
	}

	/// Transform a local box into world space.
	pub fn from_local_aabb(aabb: &Aabb, transform: &Affine3A) -> Self {
		let center = transform.transform_point3(aabb.center());
		let half = aabb.half_extents();
		let mut axes = [Vec3::X, Vec3::Y, Vec3::Z];
		let mut half_extents = Vec3::ZERO;
		for i in 0..3 {
			let column = transform.transform_vector3(axes[i]);
			let length = column.length();
			if length > 0.0 {
				axes[i] = column / length;
			}
			half_extents[i] = half[i] * length;
		}
		Self::new(center, axes, half_extents)
	}

	/// Coordinates of a world point in the box frame.
	#[inline]
	pub fn to_local(&self, point: Vec3) -> Vec3 {
		let d = point - self.center;
		Vec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
	}

	/// Closest point of the box to `point`.
	pub fn closest_point(&self, point: Vec3) -> Vec3 {
		let local = self.to_local(point).clamp(-self.half_extents, self.half_extents);
		self.center + self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
	}

	pub fn contains_point(&self, point: Vec3) -> bool {
		let local = self.to_local(point).abs();
		local.x <= self.half_extents.x && local.y <= self.half_extents.y && local.z <= self.half_extents.z
	}

	/// Farthest point of the box along `direction`.
	pub fn support(&self, direction: Vec3) -> Vec3 {
		let mut p = self.center;
		for i in 0..3 {
			let sign = if direction.dot(self.axes[i]) >= 0.0 { 1.0 } else { -1.0 };
			p += self.axes[i] * (sign * self.half_extents[i]);
		}
		p
	}

	/// Projected radius onto a unit `axis`.
	#[inline]
	pub fn projected_radius(&self, axis: Vec3) -> f32 {
		(0..3)
			.map(|i| self.half_extents[i] * self.axes[i].dot(axis).abs())
			.sum()
	}

	pub fn corners(&self) -> [Vec3; 8] {
		std::array::from_fn(|i| {
			let sx = if i & 1 != 0 { 1.0 } else { -1.0 };
			let sy = if i & 2 != 0 { 1.0 } else { -1.0 };
			let sz = if i & 4 != 0 { 1.0 } else { -1.0 };
			self.center
				+ self.axes[0] * (sx * self.half_extents.x)
				+ self.axes[1] * (sy * self.half_extents.y)
				+ self.axes[2] * (sz * self.half_extents.z)
		})
	}

	/// World-space envelope.
	pub fn aabb(&self) -> Aabb {
		let extent = Vec3::new(
			self.projected_radius(Vec3::X),
			self.projected_radius(Vec3::Y),
			self.projected_radius(Vec3::Z),
		);
		Aabb::from_center_half_extents(self.center, extent)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use glam::Quat;

	#[test]
	fn test_from_center_half_extents() {
		let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(10.0));
		assert_eq!(aabb.min, Vec3::splat(-10.0));
		assert_eq!(aabb.max, Vec3::splat(10.0));
	}

	#[test]
	fn test_overlaps_touching() {
		// Touching at boundary should count as overlapping
		let a = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
		let b = Aabb::new(Vec3::splat(10.0), Vec3::splat(20.0));
		assert!(a.overlaps(&b));
		assert!(b.overlaps(&a));
	}

	#[test]
	fn test_overlaps_false() {
		let a = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
		let b = Aabb::new(Vec3::splat(11.0), Vec3::splat(20.0));
		assert!(!a.overlaps(&b));
	}

	#[test]
	fn test_empty_encapsulate() {
		let mut aabb = Aabb::empty();
		assert!(!aabb.is_valid());
		aabb.encapsulate(Vec3::new(1.0, 2.0, 3.0));
		aabb.encapsulate(Vec3::new(-1.0, -2.0, -3.0));
		assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
		assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
		assert!(aabb.has_volume());
	}

	#[test]
	fn test_flat_box_has_no_volume() {
		let aabb = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
		assert!(aabb.is_valid());
		assert!(!aabb.has_volume());
	}

	#[test]
	fn test_obb_from_scaled_rotated_box() {
		let local = Aabb::new(Vec3::ZERO, Vec3::ONE);
		let transform = Affine3A::from_scale_rotation_translation(
			Vec3::new(2.0, 1.0, 1.0),
			Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
			Vec3::new(10.0, 0.0, 0.0),
		);
		let obb = Obb::from_local_aabb(&local, &transform);

		// X axis scaled by 2 then rotated onto +Y
		assert!((obb.axes[0] - Vec3::Y).length() < 1e-5);
		assert!((obb.half_extents - Vec3::new(1.0, 0.5, 0.5)).length() < 1e-5);
		assert!((obb.center - Vec3::new(9.5, 1.0, 0.5)).length() < 1e-5);

		for corner in local.corners() {
			let world = transform.transform_point3(corner);
			assert!(obb.aabb().expanded(1e-4).contains_point(world));
		}
	}

	#[test]
	fn test_obb_closest_point() {
		let obb = Obb::from_aabb(&Aabb::new(Vec3::ZERO, Vec3::ONE));
		assert_eq!(obb.closest_point(Vec3::new(2.0, 0.5, 0.5)), Vec3::new(1.0, 0.5, 0.5));
		assert!(obb.contains_point(Vec3::splat(0.5)));
		assert!(!obb.contains_point(Vec3::splat(1.5)));
	}
}
