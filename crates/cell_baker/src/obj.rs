//! Wavefront OBJ loading: positions and faces only, materials skipped.

use anyhow::{bail, Context, Result};
use glam::Vec3;
use std::path::Path;
use voxel_destruction::TriangleMesh;

/// Load triangles from an OBJ file.
pub fn load_obj(path: &Path) -> Result<TriangleMesh> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read mesh: {}", path.display()))?;
	parse_obj(&content).with_context(|| format!("Failed to parse OBJ: {}", path.display()))
}

/// Parse OBJ text into one triangle list. Polygons are triangulated and all
/// objects in the file are merged.
pub fn parse_obj(content: &str) -> Result<TriangleMesh> {
	let load_opts = tobj::LoadOptions {
		triangulate: true,
		single_index: true,
		..Default::default()
	};
	let (models, _materials) = tobj::load_obj_buf(&mut content.as_bytes(), &load_opts, |_| {
		Ok((Vec::new(), Default::default()))
	})
	.context("invalid OBJ data")?;

	let mut positions: Vec<Vec3> = Vec::new();
	let mut indices: Vec<u32> = Vec::new();
	for model in models {
		let mesh = model.mesh;
		let start = positions.len() as u32;
		positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));
		indices.extend(mesh.indices.iter().map(|&index| start + index));
	}

	if indices.is_empty() {
		bail!("mesh has no faces");
	}
	Ok(TriangleMesh::new(positions, indices))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_quad_is_fan_triangulated() {
		let mesh = parse_obj(
			"# unit quad\n\
			 v 0 0 0\n\
			 v 1 0 0\n\
			 v 1 1 0\n\
			 v 0 1 0\n\
			 f 1 2 3 4\n",
		)
		.unwrap();
		assert_eq!(mesh.positions.len(), 4);
		assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
	}

	#[test]
	fn test_negative_indices() {
		let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
		assert_eq!(mesh.indices, vec![0, 1, 2]);
		assert_eq!(mesh.positions[1], Vec3::X);
	}

	#[test]
	fn test_objects_are_merged() {
		let mesh = parse_obj(
			"o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
			 o b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n",
		)
		.unwrap();
		assert_eq!(mesh.positions.len(), 6);
		assert_eq!(mesh.indices.len(), 6);
		assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
		assert_eq!(mesh.positions[mesh.indices[3] as usize].z, 1.0);
	}

	#[test]
	fn test_invalid_input_fails() {
		assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
		assert!(parse_obj("v 0 0 0\n").is_err());
		assert!(parse_obj("v 0 zero 0\nf 1 1 1\n").is_err());
	}
}
