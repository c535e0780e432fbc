//! Dynamic quality scaling.
//!
//! Settings are recomputed from scratch on every update: the baseline for the
//! performance level, then the thermal factor, then the fallback profile,
//! then the floor clamp.

use serde::{Deserialize, Serialize};
use tessera_core::{PerformanceLevel, ThermalState};

/// Continuous render quality knobs, each in `[floor, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Fraction of the base resolution rendered
    pub render_scale: f32,
    pub texture_quality: f32,
    pub shader_complexity: f32,
    pub shadow_quality: f32,
    pub effects_quality: f32,
}

impl QualitySettings {
    /// Everything at full quality
    pub fn high() -> Self {
        Self {
            render_scale: 1.0,
            texture_quality: 1.0,
            shader_complexity: 1.0,
            shadow_quality: 1.0,
            effects_quality: 1.0,
        }
    }

    pub fn medium() -> Self {
        Self {
            render_scale: 0.8,
            texture_quality: 0.8,
            shader_complexity: 0.8,
            shadow_quality: 0.7,
            effects_quality: 0.8,
        }
    }

    pub fn low() -> Self {
        Self {
            render_scale: 0.6,
            texture_quality: 0.6,
            shader_complexity: 0.6,
            shadow_quality: 0.5,
            effects_quality: 0.6,
        }
    }

    /// Fixed profile used in fallback mode
    pub fn minimal() -> Self {
        Self {
            render_scale: 0.5,
            texture_quality: 0.5,
            shader_complexity: 0.3,
            shadow_quality: 0.2,
            effects_quality: 0.2,
        }
    }

    /// Baseline for a performance level
    pub fn for_level(level: PerformanceLevel) -> Self {
        match level {
            PerformanceLevel::High => Self::high(),
            PerformanceLevel::Medium => Self::medium(),
            PerformanceLevel::Low => Self::low(),
        }
    }

    /// Multiply every value by `factor`
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            render_scale: self.render_scale * factor,
            texture_quality: self.texture_quality * factor,
            shader_complexity: self.shader_complexity * factor,
            shadow_quality: self.shadow_quality * factor,
            effects_quality: self.effects_quality * factor,
        }
    }

    /// Clamp every value to `[floor, 1.0]`
    pub fn clamped(self, floor: f32) -> Self {
        let clamp = |v: f32| if v.is_nan() { floor } else { v.clamp(floor, 1.0) };
        Self {
            render_scale: clamp(self.render_scale),
            texture_quality: clamp(self.texture_quality),
            shader_complexity: clamp(self.shader_complexity),
            shadow_quality: clamp(self.shadow_quality),
            effects_quality: clamp(self.effects_quality),
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self::high()
    }
}

/// Quality multiplier while the device is hot
pub fn thermal_factor(state: ThermalState) -> f32 {
    match state {
        ThermalState::Nominal | ThermalState::Fair => 1.0,
        ThermalState::Serious => 0.7,
        ThermalState::Critical => 0.5,
    }
}

/// Derives quality settings from performance level, thermal state and fallback
#[derive(Debug, Clone)]
pub struct QualityScaler {
    floor: f32,
    base_resolution: (u32, u32),
    level: PerformanceLevel,
    thermal_state: ThermalState,
    fallback: bool,
    settings: QualitySettings,
}

impl QualityScaler {
    /// Create a scaler at `High` with nominal thermals
    pub fn new(floor: f32, base_resolution: (u32, u32)) -> Self {
        let floor = if floor.is_finite() { floor.clamp(f32::EPSILON, 1.0) } else { 0.2 };
        let mut scaler = Self {
            floor,
            base_resolution,
            level: PerformanceLevel::High,
            thermal_state: ThermalState::Nominal,
            fallback: false,
            settings: QualitySettings::high(),
        };
        scaler.recompute();
        scaler
    }

    /// Current settings
    pub fn settings(&self) -> QualitySettings {
        self.settings
    }

    pub fn thermal_state(&self) -> ThermalState {
        self.thermal_state
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Recompute for a new performance level
    pub fn update_quality_level(&mut self, level: PerformanceLevel) {
        self.level = level;
        self.recompute();
    }

    /// Recompute for a new thermal state
    pub fn set_thermal_state(&mut self, state: ThermalState) {
        self.thermal_state = state;
        self.recompute();
    }

    /// Switch to the minimal profile for good
    pub fn enable_fallback(&mut self) {
        self.fallback = true;
        self.recompute();
    }

    /// Base resolution scaled by `render_scale`, rounded down, at least 1x1
    pub fn get_scaled_render_resolution(&self) -> (u32, u32) {
        let scale = self.settings.render_scale;
        let (width, height) = self.base_resolution;
        let w = (width as f32 * scale).floor() as u32;
        let h = (height as f32 * scale).floor() as u32;
        (w.max(1), h.max(1))
    }

    fn recompute(&mut self) {
        let settings = if self.fallback {
            QualitySettings::minimal()
        } else {
            QualitySettings::for_level(self.level).scaled(thermal_factor(self.thermal_state))
        };
        self.settings = settings.clamped(self.floor);
    }
}
