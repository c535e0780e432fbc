//! sysinfo-based implementation of the MetricsSource trait.

use sysinfo::{Components, System};
use tessera_core::{MemoryPressure, ThermalState, Timestamp};

use crate::monitor::{MetricsSource, MonitorConfig, PerformanceSample, RenderTelemetry};

/// Bucket a used/total memory ratio
pub fn memory_pressure_from_ratio(used_ratio: f64) -> MemoryPressure {
    if used_ratio < 0.60 {
        MemoryPressure::Low
    } else if used_ratio < 0.75 {
        MemoryPressure::Moderate
    } else if used_ratio < 0.90 {
        MemoryPressure::High
    } else {
        MemoryPressure::Critical
    }
}

/// Bucket the hottest CPU temperature in degrees Celsius
pub fn thermal_state_from_celsius(max_temp: f32) -> ThermalState {
    if max_temp > 90.0 {
        ThermalState::Critical
    } else if max_temp > 80.0 {
        ThermalState::Serious
    } else if max_temp > 60.0 {
        ThermalState::Fair
    } else {
        ThermalState::Nominal
    }
}

/// Samples CPU, memory and thermal state from the OS and frame data from the renderer
pub struct SystemMetricsSource {
    system: System,
    telemetry: RenderTelemetry,
    last: PerformanceSample,
    samples_taken: u64,
    thermal_refresh_every: u64,
}

impl SystemMetricsSource {
    /// Create a source reading frame data from `telemetry`.
    ///
    /// `assumed_frame_rate` stands in for the frame rate until the renderer
    /// has reported frames.
    pub fn new(telemetry: RenderTelemetry, config: &MonitorConfig, assumed_frame_rate: f32) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_usage();

        Self {
            system,
            telemetry,
            last: PerformanceSample::nominal(assumed_frame_rate),
            samples_taken: 0,
            thermal_refresh_every: u64::from(config.thermal_refresh_every.max(1)),
        }
    }

    fn memory_pressure(&mut self) -> Option<MemoryPressure> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        let used = self.system.used_memory();
        Some(memory_pressure_from_ratio(used as f64 / total as f64))
    }

    fn cpu_usage(&mut self) -> Option<f32> {
        self.system.refresh_cpu_usage();
        let usage = self.system.global_cpu_usage();
        if usage.is_finite() {
            Some((usage / 100.0).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    fn thermal_state(&self) -> Option<ThermalState> {
        let components = Components::new_with_refreshed_list();
        let mut max_temp: Option<f32> = None;

        for component in &components {
            let label = component.label().to_lowercase();
            if label.contains("cpu") || label.contains("core") || label.contains("package") {
                if let Some(temp) = component.temperature() {
                    max_temp = Some(max_temp.map_or(temp, |m| m.max(temp)));
                }
            }
        }

        max_temp.map(thermal_state_from_celsius)
    }
}

impl MetricsSource for SystemMetricsSource {
    fn sample(&mut self) -> PerformanceSample {
        let mut sample = self.last;
        sample.timestamp = Timestamp::now();

        if let Some(fps) = self.telemetry.frame_rate() {
            sample.frame_rate = fps;
        }
        if let Some(gpu) = self.telemetry.gpu_usage() {
            sample.gpu_usage = gpu;
        }
        if let Some(cpu) = self.cpu_usage() {
            sample.cpu_usage = cpu;
        }
        if let Some(pressure) = self.memory_pressure() {
            sample.memory_pressure = pressure;
        }
        if self.samples_taken % self.thermal_refresh_every == 0 {
            match self.thermal_state() {
                Some(state) => sample.thermal_state = state,
                None => log::debug!("No thermal sensors readable; keeping {:?}", sample.thermal_state),
            }
        }

        self.samples_taken += 1;
        self.last = sample;
        sample
    }
}
