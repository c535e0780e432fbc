//! Time Management
//!
//! Sample timestamps, the frame-rate window behind render telemetry and the
//! traced timer wrapped around each optimizer tick.

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock time a performance sample was taken, in nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        Self(since_epoch.as_nanos() as u64)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }
}

/// Frame-rate window fed once per rendered frame.
///
/// Holds the last `window` frame deltas with a running sum, so the monitor
/// thread reads the rate without walking the window.
#[derive(Debug)]
pub struct FrameTimer {
    last_frame: Option<Instant>,
    deltas: VecDeque<f64>,
    window: usize,
    total: f64,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a frame timer averaging over `window` frames
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            last_frame: None,
            deltas: VecDeque::with_capacity(window),
            window,
            total: 0.0,
            frame_count: 0,
        }
    }

    /// Mark a frame boundary, returns the delta to the previous one in seconds
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Mark a frame boundary at an explicit instant
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let delta = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last_frame = Some(now);
        self.frame_count += 1;

        // The first boundary has no predecessor to measure against
        if delta > 0.0 {
            if self.deltas.len() == self.window {
                if let Some(oldest) = self.deltas.pop_front() {
                    self.total -= oldest;
                }
            }
            self.deltas.push_back(delta);
            self.total += delta;
        }
        delta
    }

    /// Average FPS over the window, `None` until two frames have been seen
    pub fn fps(&self) -> Option<f64> {
        if self.deltas.is_empty() || self.total <= 0.0 {
            None
        } else {
            Some(self.deltas.len() as f64 / self.total)
        }
    }

    /// Frames recorded since creation
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Reports how long a scope took on the `timing` tracing target when dropped.
///
/// With a budget, a scope that runs past it is reported at warn level.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    budget: Option<Duration>,
}

impl ScopedTimer {
    /// Time a scope with no budget
    pub fn traced(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            budget: None,
        }
    }

    /// Time a scope that should finish within `budget`
    pub fn with_budget(name: &'static str, budget: Duration) -> Self {
        Self {
            name,
            start: Instant::now(),
            budget: Some(budget),
        }
    }

    fn overran(&self, elapsed: Duration) -> bool {
        self.budget.is_some_and(|budget| elapsed > budget)
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let duration_us = elapsed.as_micros() as u64;

        if self.overran(elapsed) {
            tracing::warn!(
                target: "timing",
                name = self.name,
                duration_us,
                budget_us = self.budget.map_or(0, |b| b.as_micros() as u64),
                "Scope overran its budget"
            );
        } else {
            tracing::debug!(target: "timing", name = self.name, duration_us, "Timer completed");
        }
    }
}
