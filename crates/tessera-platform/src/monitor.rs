//! Performance Monitor
//!
//! Periodic sampler producing a [`PerformanceSample`] every interval. Sampling
//! runs on a dedicated [`Ticker`] thread; the render thread only ever touches
//! the [`RenderTelemetry`] handle, which is a short uncontended lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tessera_core::{FrameTimer, MemoryPressure, ThermalState, Timestamp};

use crate::PlatformResult;
use crate::threading::Ticker;

/// One measurement of the device's performance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Frames per second
    pub frame_rate: f32,
    pub memory_pressure: MemoryPressure,
    /// CPU usage in `[0, 1]`
    pub cpu_usage: f32,
    /// GPU usage in `[0, 1]`
    pub gpu_usage: f32,
    pub thermal_state: ThermalState,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl PerformanceSample {
    /// A healthy sample at the given frame rate
    pub fn nominal(frame_rate: f32) -> Self {
        Self {
            frame_rate,
            memory_pressure: MemoryPressure::Low,
            cpu_usage: 0.0,
            gpu_usage: 0.0,
            thermal_state: ThermalState::Nominal,
            timestamp: Timestamp::now(),
        }
    }
}

/// Source of performance samples
pub trait MetricsSource: Send {
    /// Take one sample. Must not block; unavailable values repeat the last known one.
    fn sample(&mut self) -> PerformanceSample;
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
    /// Refresh thermal readings every N samples
    pub thermal_refresh_every: u32,
}

impl MonitorConfig {
    /// Sampling interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            thermal_refresh_every: 5,
        }
    }
}

#[derive(Debug, Default)]
struct TelemetryState {
    frames: FrameTimer,
    gpu_usage: Option<f32>,
}

/// Handle the render thread uses to report frame boundaries and GPU load
#[derive(Debug, Clone, Default)]
pub struct RenderTelemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl RenderTelemetry {
    /// Create a new handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame boundary
    pub fn record_frame(&self) {
        self.state.lock().frames.tick();
    }

    /// Report GPU usage in `[0, 1]`
    pub fn report_gpu_usage(&self, usage: f32) {
        self.state.lock().gpu_usage = Some(usage.clamp(0.0, 1.0));
    }

    /// Rolling-average frame rate, `None` until frames have been recorded
    pub fn frame_rate(&self) -> Option<f32> {
        self.state.lock().frames.fps().map(|fps| fps as f32)
    }

    /// Last reported GPU usage
    pub fn gpu_usage(&self) -> Option<f32> {
        self.state.lock().gpu_usage
    }

    /// Total frames recorded
    pub fn frame_count(&self) -> u64 {
        self.state.lock().frames.frame_count()
    }
}

/// Periodic performance sampler
pub struct PerformanceMonitor {
    config: MonitorConfig,
    ticker: Option<Ticker>,
}

impl PerformanceMonitor {
    /// Create a stopped monitor
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, ticker: None }
    }

    /// Get the monitor configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start sampling `source` and handing each sample to `callback`.
    ///
    /// Starting an already running monitor is a no-op.
    pub fn start_monitoring<F>(&mut self, mut source: Box<dyn MetricsSource>, mut callback: F) -> PlatformResult<()>
    where
        F: FnMut(PerformanceSample) + Send + 'static,
    {
        if self.is_running() {
            log::warn!("Performance monitor already running; ignoring start request");
            return Ok(());
        }

        let ticker = Ticker::spawn("tessera-monitor", self.config.interval(), move || {
            let sample = source.sample();
            callback(sample);
        })?;

        log::info!("Performance monitor started ({} ms interval)", self.config.interval_ms);
        self.ticker = Some(ticker);
        Ok(())
    }

    /// Stop sampling. No callback fires after this returns.
    pub fn stop_monitoring(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
            log::info!(
                "Performance monitor stopped after {} sample(s), {} skipped",
                ticker.tick_count(),
                ticker.skipped_ticks()
            );
        }
    }

    /// Whether sampling is active
    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
