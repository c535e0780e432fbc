//! Memory Budgets
//!
//! Byte budgets for caches that shrink as the platform reports rising memory
//! pressure.

use serde::{Deserialize, Serialize};

use crate::MemoryPressure;

/// One mebibyte
pub const MB: usize = 1024 * 1024;

/// Byte budget for a cache-like subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBudget {
    /// Maximum bytes for this subsystem
    pub max_bytes: usize,
}

impl MemoryBudget {
    /// Create a budget of `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Budget for the environment cache under the given pressure
    pub fn for_pressure(pressure: MemoryPressure) -> Self {
        let max_bytes = match pressure {
            MemoryPressure::Low => 100 * MB,
            MemoryPressure::Moderate => 50 * MB,
            MemoryPressure::High => 25 * MB,
            MemoryPressure::Critical => 0,
        };
        Self { max_bytes }
    }

    /// Size an eviction pass shrinks to, half the budget
    pub fn eviction_target(&self) -> usize {
        self.max_bytes / 2
    }

    /// Whether nothing may be stored at all
    pub fn is_zero(&self) -> bool {
        self.max_bytes == 0
    }

    /// Whether `bytes` fits within the budget
    pub fn fits(&self, bytes: usize) -> bool {
        bytes <= self.max_bytes
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::for_pressure(MemoryPressure::Low)
    }
}
