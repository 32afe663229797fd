//! Mixed-granularity reachability shared by the sub-cell and hierarchical
//! searches.
//!
//! ```text
//! Block(b)      intact supercell, one hop for every cell inside
//! Cell(c)       whole cell (cell mode, or an undamaged cell in sub-cell mode)
//! Sub(c, s)     one live sub-cell of a partially damaged cell
//! ```
//!
//! An undamaged cell is internally connected, so collapsing it to one node
//! changes no reachability. Edges across a cell face need the facing
//! sub-cells on both sides alive; a whole node exposes a full face.

use std::collections::{BTreeMap, VecDeque};

use glam::UVec3;

use super::supercell::{SupercellCache, SupercellTag};
use super::{collect_unreached, is_alive};
use crate::constants::{sub_coord_to_index, sub_index_to_coord};
use crate::layout::GridCellCache;
use crate::state::CellState;
use crate::subcell::boundary_sub_cell_ids;
use crate::types::{CellId, Direction, SubCellId};

const FULL_FACE: u64 = u64::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
  Block(u32),
  Cell(CellId),
  Sub(CellId, SubCellId),
}

pub(super) struct Search<'a> {
  cache: &'a GridCellCache,
  state: &'a CellState,
  blocks: Option<&'a SupercellCache>,
  subcell: bool,
  division: u32,
  block_seen: Vec<bool>,
  cell_seen: Vec<bool>,
  sub_seen: BTreeMap<CellId, Vec<bool>>,
  queue: VecDeque<Node>,
}

impl<'a> Search<'a> {
  pub(super) fn new(
    cache: &'a GridCellCache,
    state: &'a CellState,
    blocks: Option<&'a SupercellCache>,
    subcell: bool,
  ) -> Self {
    Self {
      cache,
      state,
      blocks,
      subcell,
      division: state.division(),
      block_seen: vec![false; blocks.map_or(0, SupercellCache::block_count)],
      cell_seen: vec![false; cache.total_positions()],
      sub_seen: BTreeMap::new(),
      queue: VecDeque::new(),
    }
  }

  fn flood(&mut self) {
    for anchor in self.cache.anchor_cells() {
      self.enter(anchor, None, FULL_FACE);
    }
    while let Some(node) = self.queue.pop_front() {
      match node {
        Node::Block(block) => self.expand_block(block),
        Node::Cell(id) => self.expand_cell(id),
        Node::Sub(id, sub) => self.expand_sub(id, sub),
      }
    }
  }

  /// Run from every surviving anchor and return the unreached cells.
  pub(super) fn run(mut self) -> Vec<CellId> {
    self.flood();
    collect_unreached(self.cache, self.state, |id| self.reached(id))
  }

  fn intact_block(&self, id: CellId) -> Option<u32> {
    let blocks = self.blocks?;
    let block = blocks.block_of(self.cache.id_to_coord(id));
    (blocks.tag(block) == SupercellTag::Intact).then_some(block)
  }

  fn reached(&self, id: CellId) -> bool {
    if self.cell_seen[id as usize] {
      return true;
    }
    if let Some(block) = self.intact_block(id) {
      return self.block_seen[block as usize];
    }
    self
      .sub_seen
      .get(&id)
      .is_some_and(|seen| seen.iter().any(|&s| s))
  }

  /// Arrive at cell `id` travelling along `dir` (None for seeds), through
  /// the source face sub-cells set in `face_mask`.
  fn enter(&mut self, id: CellId, dir: Option<Direction>, face_mask: u64) {
    if !is_alive(self.cache, self.state, id) {
      return;
    }
    if let Some(block) = self.intact_block(id) {
      if !self.block_seen[block as usize] {
        self.block_seen[block as usize] = true;
        self.queue.push_back(Node::Block(block));
      }
      return;
    }
    let state = self.state;
    let Some(sub_cell) = state.sub_cell(id).filter(|_| self.subcell) else {
      if !self.cell_seen[id as usize] {
        self.cell_seen[id as usize] = true;
        self.queue.push_back(Node::Cell(id));
      }
      return;
    };

    let targets: Vec<SubCellId> = match dir {
      None => sub_cell.alive().collect(),
      Some(dir) => boundary_sub_cell_ids(dir.opposite(), self.division)
        .into_iter()
        .enumerate()
        .filter(|&(bit, sub)| face_mask & (1u64 << bit) != 0 && sub_cell.is_alive(sub))
        .map(|(_, sub)| sub)
        .collect(),
    };
    for sub in targets {
      self.visit_sub(id, sub);
    }
  }

  fn visit_sub(&mut self, id: CellId, sub: SubCellId) {
    let total = self.state.sub_cells_per_cell() as usize;
    let seen = self.sub_seen.entry(id).or_insert_with(|| vec![false; total]);
    if !seen[sub as usize] {
      seen[sub as usize] = true;
      self.queue.push_back(Node::Sub(id, sub));
    }
  }

  fn expand_cell(&mut self, id: CellId) {
    for dir in Direction::ALL {
      if let Some(next) = self.cache.neighbor(id, dir) {
        self.enter(next, Some(dir), FULL_FACE);
      }
    }
  }

  fn expand_block(&mut self, block: u32) {
    let Some(blocks) = self.blocks else {
      return;
    };
    for id in blocks.cells_in_block(block, self.cache) {
      for dir in Direction::ALL {
        let Some(next) = self.cache.neighbor(id, dir) else {
          continue;
        };
        if blocks.block_of(self.cache.id_to_coord(next)) != block {
          self.enter(next, Some(dir), FULL_FACE);
        }
      }
    }
  }

  fn expand_sub(&mut self, id: CellId, sub: SubCellId) {
    let n = self.division;
    let (x, y, z) = sub_index_to_coord(sub, n);
    let coord = UVec3::new(x, y, z).as_ivec3();

    for dir in Direction::ALL {
      let inner = coord + dir.offset();
      if inner.cmpge(glam::IVec3::ZERO).all() && inner.cmplt(glam::IVec3::splat(n as i32)).all() {
        let inner = inner.as_uvec3();
        let next = sub_coord_to_index(inner.x, inner.y, inner.z, n);
        if self.state.is_sub_cell_alive(id, next) {
          self.visit_sub(id, next);
        }
        continue;
      }
      if let Some(next) = self.cache.neighbor(id, dir) {
        self.enter(next, Some(dir), 1u64 << face_bit(coord.as_uvec3(), dir, n));
      }
    }
  }
}

/// Bit of a face sub-cell in the `u + v·N` face layout.
fn face_bit(coord: UVec3, dir: Direction, division: u32) -> u32 {
  match dir.axis() {
    0 => coord.y + coord.z * division,
    1 => coord.x + coord.z * division,
    _ => coord.x + coord.y * division,
  }
}

/// BFS at sub-cell granularity across cell faces.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "connectivity::subcell_level"))]
pub fn find_disconnected_cells_subcell_level(cache: &GridCellCache, state: &CellState) -> Vec<CellId> {
  if !cache.is_valid() {
    return Vec::new();
  }
  Search::new(cache, state, None, true).run()
}

/// Supported sub-cells of every partially damaged cell, as flags indexed by
/// sub-cell id. Partial cells without an entry were not reached at all.
pub(crate) fn supported_sub_cells(cache: &GridCellCache, state: &CellState) -> BTreeMap<CellId, Vec<bool>> {
  if !cache.is_valid() {
    return BTreeMap::new();
  }
  let mut search = Search::new(cache, state, None, true);
  search.flood();
  search.sub_seen
}
