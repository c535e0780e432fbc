//! Performance Classification
//!
//! Maps a [`PerformanceSample`] onto a [`PerformanceLevel`], and smooths the
//! raw step function so the level does not flap around its thresholds.

use tessera_core::{MemoryPressure, PerformanceLevel, ThermalState};
use tessera_platform::PerformanceSample;

/// Frame-rate ratio required for `High`
pub const HIGH_FRAME_RATIO: f32 = 0.95;
/// Frame-rate ratio required for `Medium`
pub const MEDIUM_FRAME_RATIO: f32 = 0.8;

/// Classify one sample against the target frame rate.
///
/// A non-positive target makes every sample `Low`.
pub fn classify(sample: &PerformanceSample, target_frame_rate: f32) -> PerformanceLevel {
    let ratio = if target_frame_rate > 0.0 {
        sample.frame_rate / target_frame_rate
    } else {
        0.0
    };

    if ratio >= HIGH_FRAME_RATIO
        && sample.memory_pressure == MemoryPressure::Low
        && sample.thermal_state == ThermalState::Nominal
    {
        PerformanceLevel::High
    } else if ratio >= MEDIUM_FRAME_RATIO && sample.memory_pressure <= MemoryPressure::Moderate {
        PerformanceLevel::Medium
    } else {
        PerformanceLevel::Low
    }
}

/// Debounces raw classifications.
///
/// The first observation is adopted immediately; afterwards a different level
/// must be observed `required` times in a row before it replaces the current one.
#[derive(Debug, Clone)]
pub struct LevelSmoother {
    required: u32,
    current: Option<PerformanceLevel>,
    candidate: Option<(PerformanceLevel, u32)>,
}

impl LevelSmoother {
    /// Create a smoother requiring `required` consecutive samples (0 acts as 1)
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            current: None,
            candidate: None,
        }
    }

    /// Current smoothed level, if any sample has been seen
    pub fn current(&self) -> Option<PerformanceLevel> {
        self.current
    }

    /// Feed a raw classification, returning the smoothed level
    pub fn observe(&mut self, raw: PerformanceLevel) -> PerformanceLevel {
        let Some(current) = self.current else {
            self.current = Some(raw);
            return raw;
        };

        if raw == current {
            self.candidate = None;
            return current;
        }

        let streak = match self.candidate {
            Some((level, count)) if level == raw => count + 1,
            _ => 1,
        };

        if streak >= self.required {
            self.current = Some(raw);
            self.candidate = None;
            raw
        } else {
            self.candidate = Some((raw, streak));
            current
        }
    }
}

impl Default for LevelSmoother {
    fn default() -> Self {
        Self::new(3)
    }
}
