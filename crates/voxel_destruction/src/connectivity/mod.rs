//! Support connectivity: which surviving cells can still reach an anchor.
//!
//! # Search modes
//!
//! ```text
//! cell level       cells, 6-neighbor edges, destroyed cells block     (ground truth)
//! sub-cell level   sub-cells; a face edge needs both facing sub-cells alive
//! hierarchical     uniform supercells collapse to one node, the rest as above
//! narrow phase     cell level plus thin bridges found in the shape history
//! ```
//!
//! Every search is multi-source from the surviving anchors and visits
//! neighbors in the fixed order −X, +X, −Y, +Y, −Z, +Z. Results are sorted
//! ascending, so replicas replaying the same events report identical sets.

mod cell_bfs;
pub mod narrow_phase;
mod search;
pub mod supercell;

pub use cell_bfs::find_disconnected_cells_cell_level;
pub use narrow_phase::{are_narrow_connected, find_disconnected_cells_with_narrow_phase, is_boundary_cell};
pub use search::find_disconnected_cells_subcell_level;
pub(crate) use search::supported_sub_cells;
pub use supercell::{find_disconnected_cells_hierarchical, SupercellCache, SupercellTag};

use tracing::debug;

use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::types::CellId;

/// Solid and not destroyed.
#[inline]
pub(crate) fn is_alive(cache: &GridCellCache, state: &CellState, id: CellId) -> bool {
  cache.is_solid(id) && !state.is_destroyed(id)
}

/// Surviving cells not marked in `reached`, ascending.
pub(crate) fn collect_unreached(
  cache: &GridCellCache,
  state: &CellState,
  reached: impl Fn(CellId) -> bool,
) -> Vec<CellId> {
  cache
    .solid_cells()
    .filter(|&id| !state.is_destroyed(id) && !reached(id))
    .collect()
}

/// Pick a search by capability flags.
///
/// ```text
/// enable_supercell  enable_subcell   search
///       true           any           hierarchical (sub-cell mode per flag)
///       false          true          sub-cell level
///       false          false         cell level
/// ```
pub fn find_disconnected_cells(
  cache: &GridCellCache,
  supercells: &mut SupercellCache,
  state: &CellState,
  enable_supercell: bool,
  enable_subcell: bool,
) -> Vec<CellId> {
  let disconnected = match (enable_supercell, enable_subcell) {
    (true, subcell) => find_disconnected_cells_hierarchical(cache, supercells, state, subcell),
    (false, true) => find_disconnected_cells_subcell_level(cache, state),
    (false, false) => find_disconnected_cells_cell_level(cache, state),
  };
  debug!(
    disconnected = disconnected.len(),
    supercell = enable_supercell,
    subcell = enable_subcell,
    "connectivity search"
  );
  disconnected
}
