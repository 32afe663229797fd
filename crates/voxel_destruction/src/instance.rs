//! One placed destructible: shared layout, private damage and the pipeline
//! that turns a quantized shape into an event.
//!
//! # Event Flow
//!
//! ```text
//! QuantizedDestructionInput
//!        │
//!        ▼
//!  shape application ──── SubCell: sub-cell kill + promotion
//!        │                Cell:    center / corner vote
//!        ▼
//!  connectivity ───────── narrow phase, or dispatch by flags
//!        │
//!        ▼
//!  grouping ───────────── one DetachedGroup per fragment
//!        │
//!        ▼
//!  debris metrics ─────── world center + outward velocity
//!        │
//!        ▼
//!  DestructionEvent ───► DestructionSink (renderer, physics)
//! ```
//!
//! Replicas that start from the same layout and apply the same sequence of
//! quantized inputs produce identical events.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Affine3A, Vec3};
use tracing::debug;

use crate::cell_destruction::apply_cell_destruction;
use crate::connectivity::{find_disconnected_cells, find_disconnected_cells_with_narrow_phase, SupercellCache};
use crate::debris::{
  calculate_debris_velocity, calculate_group_center, group_detached_cells, group_detached_cells_with_subcells,
  DetachedGroup,
};
use crate::error::DestructionError;
use crate::layout::GridCellCache;
use crate::metrics::DestructionMetrics;
use crate::shape::QuantizedDestructionInput;
use crate::state::CellState;
use crate::subcell::process_subcell_destruction;
use crate::types::{CellId, DestructionConfig, DestructionResolution, SubCellId};

/// A detached fragment ready to become a rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct Debris {
  pub group: DetachedGroup,
  /// World-space spawn pivot.
  pub center: Vec3,
  /// Initial linear velocity.
  pub velocity: Vec3,
}

/// Everything one shape did to an instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DestructionEvent {
  pub input: QuantizedDestructionInput,
  /// The shape reached the grid.
  pub processed: bool,
  /// Cells whose damage changed, ascending.
  pub affected_cells: Vec<CellId>,
  /// Cells that entered the destroyed set through the shape, ascending.
  pub newly_destroyed: Vec<CellId>,
  /// Newly dead sub-cells per cell (sub-cell resolution only).
  pub dead_sub_cells: BTreeMap<CellId, Vec<SubCellId>>,
  /// Cells that lost support, ascending.
  pub detached: Vec<CellId>,
  pub debris: Vec<Debris>,
}

impl DestructionEvent {
  /// Nothing changed.
  pub fn is_empty(&self) -> bool {
    self.affected_cells.is_empty() && self.detached.is_empty()
  }
}

/// Receives the outcome of each event.
///
/// Rendering listens to cell changes, physics to debris. Both default to
/// doing nothing.
pub trait DestructionSink {
  fn cells_changed(&mut self, _affected: &[CellId], _dead_sub_cells: &BTreeMap<CellId, Vec<SubCellId>>) {}

  fn debris_detached(&mut self, _debris: &[Debris]) {}
}

/// A placed copy of a destructible asset.
#[derive(Clone, Debug)]
pub struct DestructibleInstance {
  cache: Arc<GridCellCache>,
  transform: Affine3A,
  state: CellState,
  supercells: SupercellCache,
  config: DestructionConfig,
  metrics: DestructionMetrics,
}

impl DestructibleInstance {
  pub fn new(
    cache: Arc<GridCellCache>,
    transform: Affine3A,
    config: DestructionConfig,
  ) -> Result<Self, DestructionError> {
    config.validate()?;
    Ok(Self {
      cache,
      transform,
      state: CellState::new(config.sub_cell_division),
      supercells: SupercellCache::new(config.supercell_size),
      config,
      metrics: DestructionMetrics::new(),
    })
  }

  #[inline]
  pub fn cache(&self) -> &Arc<GridCellCache> {
    &self.cache
  }

  #[inline]
  pub fn transform(&self) -> Affine3A {
    self.transform
  }

  /// Move the instance. Shapes already applied keep the transform they
  /// were applied with.
  pub fn set_transform(&mut self, transform: Affine3A) {
    self.transform = transform;
  }

  #[inline]
  pub fn state(&self) -> &CellState {
    &self.state
  }

  #[inline]
  pub fn config(&self) -> &DestructionConfig {
    &self.config
  }

  #[inline]
  pub fn supercells(&self) -> &SupercellCache {
    &self.supercells
  }

  #[inline]
  pub fn metrics(&self) -> &DestructionMetrics {
    &self.metrics
  }

  /// Forget all damage.
  pub fn reset(&mut self) {
    self.state.reset();
    self.supercells.invalidate();
  }

  /// Apply one shape and report what changed.
  ///
  /// Fails only on an invalid layout, before touching the state. A shape that
  /// misses the grid yields an empty event.
  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "instance::apply"))]
  pub fn apply(&mut self, input: &QuantizedDestructionInput) -> Result<DestructionEvent, DestructionError> {
    #[cfg(feature = "metrics")]
    let apply_start = web_time::Instant::now();

    let mut event = DestructionEvent {
      input: *input,
      ..Default::default()
    };

    match self.config.resolution {
      DestructionResolution::SubCell => {
        let result = process_subcell_destruction(input, &self.transform, &self.cache, &mut self.state)?;
        event.processed = result.processed();
        event.affected_cells = result.affected_cells;
        event.newly_destroyed = result.promoted_cells;
        event.dead_sub_cells = result.dead_sub_cells;
      }
      DestructionResolution::Cell => {
        let (candidates, destroyed) = apply_cell_destruction(input, &self.transform, &self.cache, &mut self.state)?;
        event.processed = candidates > 0;
        event.affected_cells = destroyed.clone();
        event.newly_destroyed = destroyed;
      }
    }

    // Support only changes when damage does
    if !event.affected_cells.is_empty() {
      self.detach(&mut event);
    }

    #[cfg(feature = "metrics")]
    self
      .metrics
      .record_apply_timing(apply_start.elapsed().as_micros() as u64);
    self.metrics.record_event(
      event.processed,
      event.dead_sub_cells.values().map(Vec::len).sum(),
      event.newly_destroyed.len(),
      event.detached.len(),
      event.debris.len(),
    );

    debug!(
      affected = event.affected_cells.len(),
      destroyed = event.newly_destroyed.len(),
      detached = event.detached.len(),
      groups = event.debris.len(),
      "destruction event"
    );
    Ok(event)
  }

  /// Connectivity, grouping and debris metrics for a changed state.
  fn detach(&mut self, event: &mut DestructionEvent) {
    #[cfg(feature = "metrics")]
    let search_start = web_time::Instant::now();

    let config = &self.config;
    event.detached = if config.enable_narrow_phase {
      find_disconnected_cells_with_narrow_phase(&self.cache, &self.state, config.narrow_subdivision)
    } else {
      find_disconnected_cells(
        &self.cache,
        &mut self.supercells,
        &self.state,
        config.enable_supercell,
        config.enable_subcell,
      )
    };

    #[cfg(feature = "metrics")]
    self
      .metrics
      .record_search_timing(search_start.elapsed().as_micros() as u64);

    if event.detached.is_empty() {
      return;
    }

    let groups = if config.enable_subcell {
      group_detached_cells_with_subcells(&event.detached, &self.cache, &self.state)
    } else {
      group_detached_cells(&event.detached, &self.cache, &self.state)
    };
    let shape_center = event.input.dequantize().center();
    event.debris = groups
      .into_iter()
      .map(|group| {
        let center = calculate_group_center(&group.cells, &self.cache, &self.transform);
        let velocity = calculate_debris_velocity(center, [shape_center], config.debris_base_speed);
        Debris {
          group,
          center,
          velocity,
        }
      })
      .collect();

    if config.remove_detached {
      for &id in &event.detached {
        self.state.mark_destroyed(id);
      }
    }
  }

  /// [`Self::apply`], then hand the event to `sink`.
  pub fn apply_with_sink(
    &mut self,
    input: &QuantizedDestructionInput,
    sink: &mut dyn DestructionSink,
  ) -> Result<DestructionEvent, DestructionError> {
    let event = self.apply(input)?;
    if !event.affected_cells.is_empty() {
      sink.cells_changed(&event.affected_cells, &event.dead_sub_cells);
    }
    if !event.debris.is_empty() {
      sink.debris_detached(&event.debris);
    }
    Ok(event)
  }

  /// Apply a recorded sequence in order, stopping at the first error.
  pub fn replay<'a>(
    &mut self,
    inputs: impl IntoIterator<Item = &'a QuantizedDestructionInput>,
  ) -> Result<Vec<DestructionEvent>, DestructionError> {
    inputs.into_iter().map(|input| self.apply(input)).collect()
  }
}

#[cfg(test)]
#[path = "instance_test.rs"]
mod instance_test;
