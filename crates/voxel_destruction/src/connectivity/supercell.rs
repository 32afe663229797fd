//! Supercell summaries for the hierarchical search.
//!
//! The grid is tiled into `size³` blocks (clipped at the grid edge):
//!
//! ```text
//! Intact     every position solid and alive (and undamaged in sub-cell mode)
//! Destroyed  no surviving solid cell
//! Mixed      anything else, expanded to cells or sub-cells during search
//! ```
//!
//! An intact block is internally connected, so the search crosses it in one
//! hop. A summary is tied to the state revision and mode it was built for and
//! is rebuilt on the next search after either changes.

use glam::UVec3;
use tracing::trace;

use super::search::Search;
use super::is_alive;
use crate::constants::DEFAULT_SUPERCELL_SIZE;
use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::types::CellId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupercellTag {
  Intact,
  Destroyed,
  Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BuildKey {
  revision: u64,
  subcell: bool,
  grid_dims: UVec3,
}

/// Per-instance block summaries, rebuilt lazily.
#[derive(Clone, Debug)]
pub struct SupercellCache {
  size: u32,
  block_dims: UVec3,
  tags: Vec<SupercellTag>,
  built_for: Option<BuildKey>,
}

impl Default for SupercellCache {
  fn default() -> Self {
    Self::new(DEFAULT_SUPERCELL_SIZE)
  }
}

impl SupercellCache {
  /// Empty summary with `size` cells per block edge (at least 1).
  pub fn new(size: u32) -> Self {
    Self {
      size: size.max(1),
      block_dims: UVec3::ZERO,
      tags: Vec::new(),
      built_for: None,
    }
  }

  #[inline]
  pub fn size(&self) -> u32 {
    self.size
  }

  #[inline]
  pub fn block_dims(&self) -> UVec3 {
    self.block_dims
  }

  #[inline]
  pub fn block_count(&self) -> usize {
    self.tags.len()
  }

  /// Tag of a block; unknown blocks read as mixed.
  #[inline]
  pub fn tag(&self, block: u32) -> SupercellTag {
    self.tags.get(block as usize).copied().unwrap_or(SupercellTag::Mixed)
  }

  /// Block containing a cell coordinate.
  #[inline]
  pub fn block_of(&self, coord: UVec3) -> u32 {
    let b = coord / self.size;
    b.x + b.y * self.block_dims.x + b.z * self.block_dims.x * self.block_dims.y
  }

  /// Number of blocks with each tag: (intact, destroyed, mixed).
  pub fn tag_counts(&self) -> (usize, usize, usize) {
    self.tags.iter().fold((0, 0, 0), |(i, d, m), tag| match tag {
      SupercellTag::Intact => (i + 1, d, m),
      SupercellTag::Destroyed => (i, d + 1, m),
      SupercellTag::Mixed => (i, d, m + 1),
    })
  }

  /// Grid positions inside a block, ascending.
  pub fn cells_in_block(&self, block: u32, cache: &GridCellCache) -> Vec<CellId> {
    let bx = block % self.block_dims.x.max(1);
    let by = (block / self.block_dims.x.max(1)) % self.block_dims.y.max(1);
    let bz = block / (self.block_dims.x * self.block_dims.y).max(1);
    let min = UVec3::new(bx, by, bz) * self.size;
    let max = (min + UVec3::splat(self.size)).min(cache.dims());

    let mut cells = Vec::new();
    for z in min.z..max.z {
      for y in min.y..max.y {
        for x in min.x..max.x {
          cells.push(cache.coord_to_id(UVec3::new(x, y, z)));
        }
      }
    }
    cells
  }

  /// True when built for this state revision, mode and grid.
  pub fn is_current(&self, cache: &GridCellCache, state: &CellState, subcell: bool) -> bool {
    self.built_for
      == Some(BuildKey {
        revision: state.revision(),
        subcell,
        grid_dims: cache.dims(),
      })
  }

  /// Force a rebuild on next use.
  pub fn invalidate(&mut self) {
    self.built_for = None;
  }

  /// Recompute every block tag.
  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "supercell::rebuild"))]
  pub fn rebuild(&mut self, cache: &GridCellCache, state: &CellState, subcell: bool) {
    let dims = cache.dims();
    self.block_dims = (dims + UVec3::splat(self.size - 1)) / self.size;
    let count = (self.block_dims.x * self.block_dims.y * self.block_dims.z) as usize;

    self.tags = (0..count as u32)
      .map(|block| {
        let cells = self.cells_in_block(block, cache);
        let alive = cells.iter().filter(|&&id| is_alive(cache, state, id)).count();
        let undamaged = !subcell || cells.iter().all(|&id| !state.is_partial(id));
        if alive == 0 {
          SupercellTag::Destroyed
        } else if alive == cells.len() && undamaged {
          SupercellTag::Intact
        } else {
          SupercellTag::Mixed
        }
      })
      .collect();

    self.built_for = Some(BuildKey {
      revision: state.revision(),
      subcell,
      grid_dims: dims,
    });
    let (intact, destroyed, mixed) = self.tag_counts();
    trace!(intact, destroyed, mixed, "supercells rebuilt");
  }

  /// Rebuild if stale. Returns true when a rebuild happened.
  pub fn ensure_current(&mut self, cache: &GridCellCache, state: &CellState, subcell: bool) -> bool {
    if self.is_current(cache, state, subcell) {
      return false;
    }
    self.rebuild(cache, state, subcell);
    true
  }
}

/// Two-level search: intact supercells are single hops, mixed ones are
/// expanded to cells (or sub-cells when `subcell` is set).
///
/// Returns exactly what the flat search of the same mode returns.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "connectivity::hierarchical"))]
pub fn find_disconnected_cells_hierarchical(
  cache: &GridCellCache,
  supercells: &mut SupercellCache,
  state: &CellState,
  subcell: bool,
) -> Vec<CellId> {
  if !cache.is_valid() {
    return Vec::new();
  }
  supercells.ensure_current(cache, state, subcell);
  Search::new(cache, state, Some(&*supercells), subcell).run()
}
