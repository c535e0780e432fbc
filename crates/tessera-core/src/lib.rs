//! # Tessera Core
//!
//! Core types shared by every Tessera crate.
//!
//! This crate provides the vocabulary of the adaptive performance engine:
//! - **Levels**: performance classification, memory pressure and thermal state
//! - **Detail**: LOD ordinals and content importance
//! - **Math**: bounding boxes and segment/box slab tests
//! - **Time**: timestamps, rolling frame timers and scoped timing
//! - **Geometry**: meshes, room geometry and virtual elements
//! - **Memory**: cache budgets derived from memory pressure

pub mod geometry;
pub mod math;
pub mod memory;
pub mod time;

pub use geometry::{ElementId, Mesh, RoomGeometry, VirtualElement};
pub use math::{Aabb, Segment, Vec3};
pub use memory::MemoryBudget;
pub use time::{FrameTimer, ScopedTimer, Timestamp};

use serde::{Deserialize, Serialize};

/// Coarse classification of how well the device is keeping up.
///
/// There is exactly one current value per engine, replaced every monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceLevel {
    /// Frame budget is missed, or memory/thermal headroom is gone
    Low,
    /// Close to target with moderate memory pressure
    Medium,
    /// At target frame rate with no memory or thermal pressure
    High,
}

impl Default for PerformanceLevel {
    fn default() -> Self {
        Self::High
    }
}

/// Bucketed memory pressure reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Moderate,
    High,
    Critical,
}

impl Default for MemoryPressure {
    fn default() -> Self {
        Self::Low
    }
}

/// Device thermal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThermalState {
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl Default for ThermalState {
    fn default() -> Self {
        Self::Nominal
    }
}

impl ThermalState {
    /// Whether this state calls for thermal throttling
    pub fn is_throttling(&self) -> bool {
        matches!(self, Self::Serious | Self::Critical)
    }
}

/// Level of detail, ordinal 0 (lowest) to 4 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LodLevel {
    Minimal = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Ultra = 4,
}

impl LodLevel {
    /// All levels from lowest to highest detail
    pub const ALL: [LodLevel; 5] = [
        LodLevel::Minimal,
        LodLevel::Low,
        LodLevel::Medium,
        LodLevel::High,
        LodLevel::Ultra,
    ];

    /// Build a level from an ordinal, clamping to the valid range
    pub fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            i32::MIN..=0 => Self::Minimal,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Ultra,
        }
    }

    /// Get the ordinal value
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

impl Default for LodLevel {
    fn default() -> Self {
        Self::Ultra
    }
}

/// How much an element matters to the experience, ordinal 0 to 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentImportance {
    Background = 0,
    Normal = 1,
    Important = 2,
    Critical = 3,
}

impl ContentImportance {
    /// Get the ordinal value
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    /// Map a render priority in `[0, 1]` onto an importance bucket
    pub fn from_render_priority(priority: f32) -> Self {
        if priority >= 0.9 {
            Self::Critical
        } else if priority >= 0.6 {
            Self::Important
        } else if priority >= 0.3 {
            Self::Normal
        } else {
            Self::Background
        }
    }
}

impl Default for ContentImportance {
    fn default() -> Self {
        Self::Normal
    }
}
