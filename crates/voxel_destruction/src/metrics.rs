//! Engine-agnostic destruction statistics.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use voxel_destruction::metrics::{DestructionMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Per instance:
//! let event = instance.apply(&input)?;
//! println!("avg search {:.1}us", instance.metrics().avg_search_timing_us());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-capacity window of recent samples.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Per-instance destruction statistics.
#[derive(Debug, Clone, Default)]
pub struct DestructionMetrics {
    // Counters (cumulative)
    /// Shapes applied, including misses.
    pub events_applied: u64,
    /// Shapes that reached no cell.
    pub events_missed: u64,
    /// Sub-cells marked dead.
    pub sub_cells_killed: u64,
    /// Cells moved into the destroyed set by shapes.
    pub cells_destroyed: u64,
    /// Cells reported as detached.
    pub cells_detached: u64,
    /// Debris groups reported.
    pub groups_detached: u64,

    // Timing
    /// Shape application times in microseconds.
    pub apply_timings: RollingWindow<u64>,
    /// Connectivity search times in microseconds.
    pub search_timings: RollingWindow<u64>,
    pub last_search_us: u64,
}

impl DestructionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear timings; counters are cumulative and kept.
    pub fn reset_timings(&mut self) {
        self.apply_timings.clear();
        self.search_timings.clear();
        self.last_search_us = 0;
    }

    pub fn record_apply_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.apply_timings.push(timing_us);
        }
    }

    pub fn record_search_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.search_timings.push(timing_us);
            self.last_search_us = timing_us;
        }
    }

    /// Record the outcome of one event.
    pub fn record_event(
        &mut self,
        reached_grid: bool,
        sub_cells_killed: usize,
        cells_destroyed: usize,
        cells_detached: usize,
        groups: usize,
    ) {
        if !is_enabled() {
            return;
        }
        self.events_applied += 1;
        if !reached_grid {
            self.events_missed += 1;
        }
        self.sub_cells_killed += sub_cells_killed as u64;
        self.cells_destroyed += cells_destroyed as u64;
        self.cells_detached += cells_detached as u64;
        self.groups_detached += groups as u64;
    }

    pub fn avg_apply_timing_us(&self) -> f64 {
        self.apply_timings.average()
    }

    pub fn avg_search_timing_us(&self) -> f64 {
        self.search_timings.average()
    }
}
