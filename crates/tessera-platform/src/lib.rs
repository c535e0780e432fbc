//! # Tessera Platform
//!
//! Platform layer for the Tessera adaptive performance engine.
//!
//! This crate provides:
//! - **Device**: one-shot capability profiling into an immutable device tier
//! - **Monitor**: periodic performance sampling with deterministic shutdown
//! - **System metrics**: a `sysinfo` backed sample source
//! - **Threading**: a fixed-interval ticker thread that skips overrun ticks

pub mod device;
pub mod monitor;
pub mod sysinfo_source;
pub mod threading;

pub use device::{
    AdapterClass, AdapterInfo, DeviceCapabilities, DeviceCapabilityProfiler, DeviceQuery,
    DeviceTier, WgpuDeviceQuery,
};
pub use monitor::{
    MetricsSource, MonitorConfig, PerformanceMonitor, PerformanceSample, RenderTelemetry,
};
pub use sysinfo_source::SystemMetricsSource;
pub use threading::Ticker;

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("No usable graphics device found")]
    NoGraphicsDevice,

    #[error("Graphics backend not supported: {0}")]
    GraphicsNotSupported(String),

    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
