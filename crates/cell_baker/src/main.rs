//! Destructible cell grid baker.
//!
//! Voxelizes an OBJ mesh into a `GridCellCache` and writes it as JSON for
//! runtime loading. Anchors come from the height threshold, optionally
//! edited by finite planes.

mod config;
mod obj;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxel_destruction::{GridCellBuilder, GridCellCache, TriangleMesh};

use config::Config;

/// Destructible cell grid baker for voxel_destruction.
#[derive(Parser, Debug)]
#[command(name = "bake_cells")]
#[command(about = "Bakes an OBJ mesh into a destructible cell grid")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Base directory for input and output (default: config directory).
	#[arg(short, long)]
	base_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let args = Args::parse();

	let base_dir = args.base_dir.unwrap_or_else(|| {
		args.config
			.parent()
			.unwrap_or(Path::new("."))
			.to_path_buf()
	});

	info!("Loading config from: {}", args.config.display());
	let config = Config::load(&args.config)?;

	let input = base_dir.join(&config.input);
	let mesh = obj::load_obj(&input)?;
	info!(
		"Loaded {} vertices, {} triangles from {}",
		mesh.positions.len(),
		mesh.indices.len() / 3,
		input.display()
	);

	let cache = bake(&config, &mesh)?;
	let dims = cache.dims();
	info!(
		"Grid {}x{}x{}: {} solid cells, {} anchors",
		dims.x,
		dims.y,
		dims.z,
		cache.solid_count(),
		cache.anchor_count()
	);

	let output = base_dir.join(&config.output);
	if let Some(parent) = output.parent() {
		std::fs::create_dir_all(parent)
			.with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
	}
	let json = serde_json::to_string(&cache).context("Failed to serialize cell grid")?;
	std::fs::write(&output, json).with_context(|| format!("Failed to write: {}", output.display()))?;

	info!("Done! Output written to: {}", output.display());
	Ok(())
}

/// Build the grid and apply the configured anchor edits.
fn bake(config: &Config, mesh: &TriangleMesh) -> Result<GridCellCache> {
	let mut cache = GridCellBuilder::new(config.builder_config())
		.build(mesh)
		.context("Failed to build cell grid")?;

	if config.clear_anchors {
		cache.clear_all_anchors();
	}
	for plane in &config.anchor_planes {
		let changed = cache.set_anchors_by_finite_plane(&plane.plane(), plane.anchor_mode());
		info!("Anchor plane {:?}: {} cells changed", plane.mode, changed);
	}
	if cache.anchor_count() == 0 {
		warn!("Grid has no anchors; every cell will detach on the first hit");
	}
	Ok(cache)
}

#[cfg(test)]
mod tests {
	use super::*;

	const CUBE_OBJ: &str = "\
v 0 0 0
v 4 0 0
v 0 4 0
v 4 4 0
v 0 0 4
v 4 0 4
v 0 4 4
v 4 4 4
f 1 3 4 2
f 5 6 8 7
f 1 2 6 5
f 3 7 8 4
f 1 5 7 3
f 2 4 8 6
";

	fn config(extra: &str) -> Config {
		Config::parse(&format!(
			"input = \"cube.obj\"\noutput = \"cube.json\"\ncell_size = [1.0, 1.0, 1.0]\n{extra}"
		))
		.unwrap()
	}

	#[test]
	fn test_bake_closed_cube() {
		let mesh = obj::parse_obj(CUBE_OBJ).unwrap();
		let cache = bake(&config("fill_interior = true"), &mesh).unwrap();
		assert_eq!(cache.solid_count(), 64);
		assert_eq!(cache.anchor_count(), 16);
	}

	#[test]
	fn test_bake_plane_replaces_height_anchors() {
		let mesh = obj::parse_obj(CUBE_OBJ).unwrap();
		let extra = "fill_interior = true\nclear_anchors = true\n\
			[[anchor_planes]]\ncenter = [1.0, 2.0, 4.0]\nhalf_size = [1.0, 4.0]\n";
		let cache = bake(&config(extra), &mesh).unwrap();
		// The x = 0 and x = 1 slabs sit under the plane
		assert_eq!(cache.anchor_count(), 32);
		assert!(cache.anchor_cells().all(|id| cache.id_to_coord(id).x < 2));
	}

	#[test]
	fn test_baked_grid_serializes() {
		let mesh = obj::parse_obj(CUBE_OBJ).unwrap();
		let cache = bake(&config(""), &mesh).unwrap();
		let json = serde_json::to_string(&cache).unwrap();
		let back: GridCellCache = serde_json::from_str(&json).unwrap();
		assert_eq!(back, cache);
	}
}
