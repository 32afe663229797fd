//! Configuration parsing for cell grid baking.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use voxel_destruction::{AnchorMode, BuilderConfig, FinitePlane};

use glam::{EulerRot, Quat, Vec2, Vec3};

/// Root configuration for baking one destructible.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Source OBJ, relative to the config file.
	pub input: String,
	/// Output JSON, relative to the config file.
	pub output: String,
	/// Cell edge lengths [X, Y, Z].
	pub cell_size: [f32; 3],
	/// Height above the mesh bottom that still anchors.
	#[serde(default)]
	pub anchor_height: f32,
	/// Fill enclosed space inside closed meshes.
	#[serde(default)]
	pub fill_interior: bool,
	/// Drop the height anchors before applying planes.
	#[serde(default)]
	pub clear_anchors: bool,
	/// Anchor plane edits, applied in order.
	#[serde(default)]
	pub anchor_planes: Vec<AnchorPlaneConfig>,
}

/// One finite anchor plane.
#[derive(Debug, Deserialize)]
pub struct AnchorPlaneConfig {
	pub center: [f32; 3],
	/// Euler rotation in degrees [X, Y, Z]; the plane faces rotated +Z.
	#[serde(default)]
	pub rotation: [f32; 3],
	pub half_size: [f32; 2],
	#[serde(default)]
	pub mode: PlaneMode,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneMode {
	#[default]
	Add,
	Erase,
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate TOML text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.cell_size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
			anyhow::bail!("cell_size must be positive on every axis, got {:?}", config.cell_size);
		}
		if !config.anchor_height.is_finite() || config.anchor_height < 0.0 {
			anyhow::bail!("anchor_height must be non-negative, got {}", config.anchor_height);
		}
		for (index, plane) in config.anchor_planes.iter().enumerate() {
			if plane.half_size.iter().any(|s| *s < 0.0) {
				anyhow::bail!("anchor plane {} has a negative half_size", index);
			}
		}

		Ok(config)
	}

	pub fn builder_config(&self) -> BuilderConfig {
		BuilderConfig::default()
			.with_cell_size(Vec3::from_array(self.cell_size))
			.with_anchor_height(self.anchor_height)
			.with_fill_interior(self.fill_interior)
	}
}

impl AnchorPlaneConfig {
	pub fn plane(&self) -> FinitePlane {
		let [x, y, z] = self.rotation.map(f32::to_radians);
		FinitePlane::new(
			Vec3::from_array(self.center),
			Quat::from_euler(EulerRot::XYZ, x, y, z),
			Vec2::from_array(self.half_size),
		)
	}

	pub fn anchor_mode(&self) -> AnchorMode {
		match self.mode {
			PlaneMode::Add => AnchorMode::Add,
			PlaneMode::Erase => AnchorMode::Erase,
		}
	}
}
