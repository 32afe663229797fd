//! Per-instance damage record.
//!
//! ```text
//! cell in destroyed set      -> fully dead
//! cell in partial map        -> 0 < live sub-cells < total
//! cell in neither            -> fully alive
//! ```
//!
//! The two containers are ordered so every traversal of the state visits
//! cells in ascending id order on every replica.

use std::collections::{BTreeMap, BTreeSet};

use glam::Affine3A;
use smallvec::{smallvec, SmallVec};

use crate::constants::MAX_SUB_CELL_DIVISION;
use crate::shape::{DestructionShape, QuantizedDestructionInput};
use crate::types::{CellId, SubCellId};

/// Liveness bitset of one cell's sub-cells. Bit set = alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubCell {
  words: SmallVec<[u64; 2]>,
  division: u32,
}

impl SubCell {
  /// Every sub-cell alive.
  pub fn new_alive(division: u32) -> Self {
    let total = division * division * division;
    let word_count = (total as usize).div_ceil(64);
    let mut words: SmallVec<[u64; 2]> = smallvec![u64::MAX; word_count];
    let tail = total % 64;
    if tail != 0 {
      if let Some(last) = words.last_mut() {
        *last = (1u64 << tail) - 1;
      }
    }
    Self { words, division }
  }

  #[inline]
  pub fn division(&self) -> u32 {
    self.division
  }

  #[inline]
  pub fn total(&self) -> u32 {
    self.division * self.division * self.division
  }

  #[inline]
  pub fn is_alive(&self, sub: SubCellId) -> bool {
    let (word, bit) = (sub as usize / 64, sub % 64);
    self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
  }

  /// Clear one sub-cell. Returns true if it was alive.
  pub fn kill(&mut self, sub: SubCellId) -> bool {
    let (word, bit) = (sub as usize / 64, sub % 64);
    match self.words.get_mut(word) {
      Some(w) if *w & (1u64 << bit) != 0 => {
        *w &= !(1u64 << bit);
        true
      }
      _ => false,
    }
  }

  pub fn live_count(&self) -> u32 {
    self.words.iter().map(|w| w.count_ones()).sum()
  }

  #[inline]
  pub fn is_all_dead(&self) -> bool {
    self.words.iter().all(|&w| w == 0)
  }

  #[inline]
  pub fn is_all_alive(&self) -> bool {
    self.live_count() == self.total()
  }

  /// Live sub-cell indices, ascending.
  pub fn alive(&self) -> impl Iterator<Item = SubCellId> + '_ {
    (0..self.total()).filter(move |&sub| self.is_alive(sub))
  }
}

/// A shape applied to the instance, kept for narrow-phase re-evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedShape {
  pub input: QuantizedDestructionInput,
  /// Instance transform at the time the shape was applied.
  pub transform: Affine3A,
  pub shape: DestructionShape,
}

impl AppliedShape {
  pub fn new(input: QuantizedDestructionInput, transform: Affine3A) -> Self {
    Self {
      input,
      transform,
      shape: input.dequantize(),
    }
  }

  /// True if a grid-local point was inside this shape when it was applied.
  #[inline]
  pub fn contains_local_point(&self, local: glam::Vec3) -> bool {
    self.shape.contains_point(self.transform.transform_point3(local))
  }
}

/// Mutable damage state of one destructible instance.
#[derive(Clone, Debug, PartialEq)]
pub struct CellState {
  destroyed: BTreeSet<CellId>,
  partial: BTreeMap<CellId, SubCell>,
  division: u32,
  history: Vec<AppliedShape>,
  revision: u64,
}

impl CellState {
  /// Fresh state; `division` is clamped to the supported range.
  pub fn new(division: u32) -> Self {
    Self {
      destroyed: BTreeSet::new(),
      partial: BTreeMap::new(),
      division: division.clamp(1, MAX_SUB_CELL_DIVISION),
      history: Vec::new(),
      revision: 0,
    }
  }

  #[inline]
  pub fn division(&self) -> u32 {
    self.division
  }

  #[inline]
  pub fn sub_cells_per_cell(&self) -> u32 {
    self.division * self.division * self.division
  }

  /// Bumped whenever the destroyed or partial sets change; derived caches
  /// compare against it. Recording a shape alone does not bump it.
  #[inline]
  pub fn revision(&self) -> u64 {
    self.revision
  }

  #[inline]
  pub fn is_destroyed(&self, id: CellId) -> bool {
    self.destroyed.contains(&id)
  }

  #[inline]
  pub fn destroyed_cells(&self) -> &BTreeSet<CellId> {
    &self.destroyed
  }

  #[inline]
  pub fn partial_cells(&self) -> &BTreeMap<CellId, SubCell> {
    &self.partial
  }

  #[inline]
  pub fn sub_cell(&self, id: CellId) -> Option<&SubCell> {
    self.partial.get(&id)
  }

  #[inline]
  pub fn is_partial(&self, id: CellId) -> bool {
    self.partial.contains_key(&id)
  }

  /// Is the sub-cell alive (true for every sub-cell of an untouched cell)?
  pub fn is_sub_cell_alive(&self, id: CellId, sub: SubCellId) -> bool {
    if self.is_destroyed(id) {
      return false;
    }
    self.partial.get(&id).map_or(true, |cell| cell.is_alive(sub))
  }

  /// Move a cell into the destroyed set. Returns true if it was not there.
  pub fn mark_destroyed(&mut self, id: CellId) -> bool {
    self.partial.remove(&id);
    let inserted = self.destroyed.insert(id);
    if inserted {
      self.revision += 1;
    }
    inserted
  }

  /// Remove the record of a cell for in-place editing; untouched cells
  /// yield a fully alive record.
  pub(crate) fn take_sub_cell(&mut self, id: CellId) -> SubCell {
    self
      .partial
      .remove(&id)
      .unwrap_or_else(|| SubCell::new_alive(self.division))
  }

  /// Put back a record taken with [`Self::take_sub_cell`], keeping the
  /// partial-map invariant. Returns true if the cell was promoted.
  pub(crate) fn store_sub_cell(&mut self, id: CellId, sub_cell: SubCell, changed: bool) -> bool {
    if sub_cell.is_all_dead() {
      self.destroyed.insert(id);
      self.revision += 1;
      return true;
    }
    if !sub_cell.is_all_alive() {
      self.partial.insert(id, sub_cell);
    }
    if changed {
      self.revision += 1;
    }
    false
  }

  pub fn history(&self) -> &[AppliedShape] {
    &self.history
  }

  /// Append a shape to the history unless an identical one is already
  /// there. Returns true if the history grew.
  pub(crate) fn record_shape(&mut self, input: QuantizedDestructionInput, transform: Affine3A) -> bool {
    let shape = AppliedShape::new(input, transform);
    if self.history.contains(&shape) {
      return false;
    }
    self.history.push(shape);
    true
  }

  /// Forget all damage.
  pub fn reset(&mut self) {
    self.destroyed.clear();
    self.partial.clear();
    self.history.clear();
    self.revision += 1;
  }
}

impl Default for CellState {
  fn default() -> Self {
    Self::new(crate::constants::DEFAULT_SUB_CELL_DIVISION)
  }
}
