// src/pipeline/metrics.rs
//
// Tick-loop observability. Atomic counters shared across subsystems,
// dumped to the log periodically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TickMetrics {
    pub total_ticks: Arc<AtomicU64>,
    pub scene_rebuilds: Arc<AtomicU64>,
    pub lead_updates: Arc<AtomicU64>,
    pub brightness_applied: Arc<AtomicU64>,
    pub brightness_dropped: Arc<AtomicU64>,
    pub onroad_transitions: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl TickMetrics {
    pub fn new() -> Self {
        Self {
            total_ticks: Arc::new(AtomicU64::new(0)),
            scene_rebuilds: Arc::new(AtomicU64::new(0)),
            lead_updates: Arc::new(AtomicU64::new(0)),
            brightness_applied: Arc::new(AtomicU64::new(0)),
            brightness_dropped: Arc::new(AtomicU64::new(0)),
            onroad_transitions: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Observed tick rate since process start.
    pub fn tick_rate(&self) -> f64 {
        let ticks = self.total_ticks.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            ticks as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "ticks={} rate={:.1}/s rebuilds={} leads={} brightness applied={} dropped={} transitions={}",
            self.total_ticks.load(Ordering::Relaxed),
            self.tick_rate(),
            self.scene_rebuilds.load(Ordering::Relaxed),
            self.lead_updates.load(Ordering::Relaxed),
            self.brightness_applied.load(Ordering::Relaxed),
            self.brightness_dropped.load(Ordering::Relaxed),
            self.onroad_transitions.load(Ordering::Relaxed),
        )
    }
}

impl Default for TickMetrics {
    fn default() -> Self {
        Self::new()
    }
}
