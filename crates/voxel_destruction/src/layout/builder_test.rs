use super::*;

fn build(source: &dyn CellSource, config: BuilderConfig) -> GridCellCache {
  GridCellBuilder::new(config).build(source).unwrap()
}

struct InvertedBounds;

impl CellSource for InvertedBounds {
  fn bounds(&self) -> Aabb {
    Aabb {
      min: Vec3::ONE,
      max: Vec3::ZERO,
    }
  }

  fn triangles(&self) -> Vec<[Vec3; 3]> {
    vec![[Vec3::ZERO, Vec3::X, Vec3::Y]]
  }
}

fn cube_mesh(size: f32) -> TriangleMesh {
  TriangleMesh::cuboid(Vec3::ZERO, Vec3::splat(size))
}

#[test]
fn test_hollow_cube_surface_only() {
  let cache = build(&cube_mesh(4.0), BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::splat(4));
  // Surface cells only: 64 minus the 2x2x2 core
  assert_eq!(cache.solid_count(), 56);
  assert!(!cache.is_solid(cache.coord_to_id(UVec3::splat(1))));
  assert!(!cache.is_solid(cache.coord_to_id(UVec3::splat(2))));
}

#[test]
fn test_interior_fill_closes_cube() {
  let config = BuilderConfig::default().with_fill_interior(true);
  let cache = build(&cube_mesh(4.0), config);
  assert_eq!(cache.solid_count(), 64);
  let core = cache.coord_to_id(UVec3::splat(1));
  assert!(cache.neighbors(core).iter().all(Option::is_some));
}

#[test]
fn test_cell_counts_round_up() {
  let mesh = TriangleMesh::cuboid(Vec3::ZERO, Vec3::new(2.5, 1.0, 1.0));
  let cache = build(&mesh, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::new(3, 1, 1));
}

#[test]
fn test_thin_source_gets_one_layer() {
  let mesh = TriangleMesh::new(
    vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.1)],
    vec![0, 1, 2],
  );
  let cache = build(&mesh, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::new(2, 2, 1));
  for coord in [UVec3::ZERO, UVec3::new(1, 0, 0), UVec3::new(0, 1, 0)] {
    assert!(cache.is_solid(cache.coord_to_id(coord)), "{coord}");
  }
}

#[test]
fn test_zero_extent_sources_rejected() {
  let builder = GridCellBuilder::default();
  let point = TriangleMesh::new(vec![Vec3::splat(1.0); 3], vec![0, 1, 2]);
  assert!(matches!(builder.build(&point), Err(BuildError::DegenerateBounds { .. })));

  let flat = TriangleMesh::new(
    vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)],
    vec![0, 1, 2],
  );
  assert!(matches!(builder.build(&flat), Err(BuildError::DegenerateBounds { .. })));

  let dot = CollisionBody::default().with_element(CollisionPrimitive::Sphere { radius: 0.0 }, Affine3A::IDENTITY);
  assert!(matches!(builder.build(&dot), Err(BuildError::DegenerateBounds { .. })));
}

#[test]
fn test_transform_moves_origin() {
  let mesh = cube_mesh(2.0).with_transform(Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)));
  let cache = build(&mesh, BuilderConfig::default());
  assert_eq!(cache.origin(), Vec3::new(10.0, 0.0, 0.0));
  assert_eq!(cache.bounds().max, Vec3::new(12.0, 2.0, 2.0));
}

#[test]
fn test_triangles_owned_by_centroid_cell() {
  let cache = build(&cube_mesh(4.0), BuilderConfig::default());
  let owned: usize = (0..cache.total_positions() as CellId)
    .map(|id| cache.triangles(id).len())
    .sum();
  assert_eq!(owned, 12);

  // First -X triangle has its centroid at (0, 4/3, 4/3)
  let id = cache.coord_to_id(UVec3::new(0, 1, 1));
  assert!(cache.triangles(id).contains(&0));
}

#[test]
fn test_anchors_by_height() {
  let config = BuilderConfig::default().with_fill_interior(true);
  let cache = build(&cube_mesh(4.0), config.clone());
  assert_eq!(cache.anchor_count(), 16);
  assert!(cache.anchor_cells().all(|id| cache.id_to_coord(id).z == 0));

  let cache = build(&cube_mesh(4.0), config.with_anchor_height(1.0));
  assert_eq!(cache.anchor_count(), 32);
}

#[test]
fn test_sphere_body_marks_intersected_cells() {
  let body = CollisionBody::default().with_element(
    CollisionPrimitive::Sphere { radius: 2.5 },
    Affine3A::IDENTITY,
  );
  let cache = build(&body, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::splat(5));
  // Only the 8 corner cells stay clear: their nearest point is 1.5 * sqrt(3) away
  assert_eq!(cache.solid_count(), 117);
  assert!(!cache.is_solid(0));
  // Center outside the sphere, but the cell still overlaps it
  assert!(cache.is_solid(cache.coord_to_id(UVec3::new(4, 4, 2))));
}

#[test]
fn test_rotated_capsule_stays_face_connected() {
  let body = CollisionBody::default().with_element(
    CollisionPrimitive::Capsule {
      radius: 0.3,
      half_height: 2.5,
    },
    Affine3A::from_rotation_y(std::f32::consts::FRAC_PI_4),
  );
  let cache = build(&body, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::new(5, 1, 5));
  // Diagonal cells plus both cells sharing each crossed grid vertex
  assert_eq!(cache.solid_count(), 13);
  for k in 0..5 {
    assert!(cache.is_solid(cache.coord_to_id(UVec3::new(k, 0, k))));
  }
  assert!(cache.anchor_count() >= 1);

  let state = crate::state::CellState::default();
  assert!(crate::connectivity::find_disconnected_cells_cell_level(&cache, &state).is_empty());
}

#[test]
fn test_element_obb_overlap() {
  let sphere = CollisionElement::new(
    CollisionPrimitive::Sphere { radius: 1.0 },
    Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0)),
  );
  let cell = |center: Vec3| Obb::from_aabb(&Aabb::from_center_half_extents(center, Vec3::splat(0.5)));
  assert!(sphere.intersects_obb(&cell(Vec3::new(0.8, 0.0, 0.0))));
  assert!(!sphere.intersects_obb(&cell(Vec3::new(0.2, 0.0, 0.0))));
  // Bounding boxes overlap but the nearest corner sits 0.8 * sqrt(2) away
  assert!(!sphere.intersects_obb(&cell(Vec3::new(0.7, 1.3, 0.0))));

  let hull = CollisionElement::new(
    CollisionPrimitive::Hull(ConvexHull::cuboid(Vec3::new(2.0, 0.1, 0.1))),
    Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_4),
  );
  assert!(hull.intersects_obb(&cell(Vec3::new(1.0, 1.0, 0.0))));
  assert!(!hull.intersects_obb(&cell(Vec3::new(1.0, -1.0, 0.0))));

  let empty = CollisionElement::new(CollisionPrimitive::Hull(ConvexHull::default()), Affine3A::IDENTITY);
  assert!(!empty.intersects_obb(&cell(Vec3::ZERO)));
}

#[test]
fn test_hull_body() {
  let body = CollisionBody::default().with_element(
    CollisionPrimitive::Hull(ConvexHull::cuboid(Vec3::ONE)),
    Affine3A::from_translation(Vec3::new(5.0, 5.0, 5.0)),
  );
  let cache = build(&body, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::splat(2));
  assert_eq!(cache.solid_count(), 8);
  assert_eq!(cache.origin(), Vec3::splat(4.0));
}

#[test]
fn test_capsule_runs_along_z() {
  let body = CollisionBody::default().with_element(
    CollisionPrimitive::Capsule {
      radius: 0.5,
      half_height: 1.0,
    },
    Affine3A::IDENTITY,
  );
  let cache = build(&body, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::new(1, 1, 3));
  assert_eq!(cache.solid_count(), 3);
  assert_eq!(cache.neighbor(0, Direction::PosZ), Some(1));
}

#[test]
fn test_box_and_sphere_elements_combine() {
  let body = CollisionBody::default()
    .with_element(
      CollisionPrimitive::Box {
        half_extents: Vec3::new(0.9, 0.5, 0.5),
      },
      Affine3A::from_translation(Vec3::new(1.0, 0.5, 0.5)),
    )
    .with_element(
      CollisionPrimitive::Sphere { radius: 0.4 },
      Affine3A::from_translation(Vec3::new(3.6, 0.5, 0.5)),
    );
  let cache = build(&body, BuilderConfig::default());
  assert_eq!(cache.dims(), UVec3::new(4, 1, 1));
  // Gap cell at x = 2 stays empty
  assert_eq!(cache.solid_cells().collect::<Vec<_>>(), vec![0, 1, 3]);
}

#[test]
fn test_build_errors() {
  let builder = GridCellBuilder::default();
  assert_eq!(builder.build(&CollisionBody::default()), Err(BuildError::EmptySource));
  assert_eq!(
    builder.build(&TriangleMesh::new(vec![Vec3::ZERO], vec![0, 0])),
    Err(BuildError::EmptySource)
  );

  let bad_size = GridCellBuilder::new(BuilderConfig::default().with_cell_size(Vec3::new(1.0, 0.0, 1.0)));
  assert!(matches!(
    bad_size.build(&cube_mesh(1.0)),
    Err(BuildError::InvalidCellSize(_))
  ));

  let tiny = GridCellBuilder::new(BuilderConfig::default().with_cell_size(Vec3::splat(0.001)));
  assert!(matches!(
    tiny.build(&cube_mesh(1000.0)),
    Err(BuildError::TooManyCells { .. })
  ));

  assert!(matches!(
    builder.build(&InvertedBounds),
    Err(BuildError::DegenerateBounds { .. })
  ));
}

#[test]
fn test_triangle_box_separating_axes() {
  let half = Vec3::ONE;
  let crossing = [Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];
  assert!(triangle_overlaps_box(&crossing, Vec3::ZERO, half));

  let far = [Vec3::splat(5.0), Vec3::splat(6.0), Vec3::new(5.0, 6.0, 5.0)];
  assert!(!triangle_overlaps_box(&far, Vec3::ZERO, half));

  // Bounding boxes overlap but the triangle plane clears the corner
  let corner = [Vec3::new(3.5, 0.0, 0.0), Vec3::new(0.0, 3.5, 0.0), Vec3::new(0.0, 0.0, 3.5)];
  assert!(!triangle_overlaps_box(&corner, Vec3::ZERO, half));
  let touching = [Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, 0.0, 3.0)];
  assert!(triangle_overlaps_box(&touching, Vec3::ZERO, half));
}

#[test]
fn test_builder_config_defaults_from_empty_json() {
  let config: BuilderConfig = serde_json::from_str("{}").unwrap();
  assert_eq!(config, BuilderConfig::default());
}
