//! Device Capabilities
//!
//! One-shot probe mapping the graphics hardware onto an ordinal device tier
//! and the limits derived from it. The result is immutable and handed to the
//! optimizer by value.

use serde::{Deserialize, Serialize};

use crate::{PlatformError, PlatformResult};

/// Broad class of a graphics adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterClass {
    /// Dedicated GPU
    Discrete,
    /// GPU sharing memory with the CPU
    Integrated,
    /// Virtualised GPU
    Virtual,
    /// Software rasteriser
    Cpu,
    /// Unknown class
    Other,
}

/// What the driver reports about one adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Adapter name
    pub name: String,
    /// Adapter class
    pub class: AdapterClass,
    /// Backend name (Vulkan, Metal, ...)
    pub backend: String,
    /// Largest supported 2D texture edge
    pub max_texture_dimension_2d: u32,
}

/// Hardware/driver feature query
pub trait DeviceQuery {
    /// List every adapter the platform exposes
    fn adapters(&self) -> PlatformResult<Vec<AdapterInfo>>;
}

/// Queries adapters through wgpu
#[derive(Debug, Clone)]
pub struct WgpuDeviceQuery {
    backends: wgpu::Backends,
}

impl WgpuDeviceQuery {
    /// Query the given backends
    pub fn new(backends: wgpu::Backends) -> Self {
        Self { backends }
    }
}

impl Default for WgpuDeviceQuery {
    fn default() -> Self {
        Self::new(wgpu::Backends::all())
    }
}

impl DeviceQuery for WgpuDeviceQuery {
    fn adapters(&self) -> PlatformResult<Vec<AdapterInfo>> {
        if self.backends.is_empty() {
            return Err(PlatformError::GraphicsNotSupported(
                "no graphics backends enabled".to_string(),
            ));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.backends,
            ..Default::default()
        });

        let adapters = instance
            .enumerate_adapters(self.backends)
            .into_iter()
            .map(|adapter| {
                let info = adapter.get_info();
                let limits = adapter.limits();
                AdapterInfo {
                    name: info.name,
                    class: match info.device_type {
                        wgpu::DeviceType::DiscreteGpu => AdapterClass::Discrete,
                        wgpu::DeviceType::IntegratedGpu => AdapterClass::Integrated,
                        wgpu::DeviceType::VirtualGpu => AdapterClass::Virtual,
                        wgpu::DeviceType::Cpu => AdapterClass::Cpu,
                        wgpu::DeviceType::Other => AdapterClass::Other,
                    },
                    backend: format!("{:?}", info.backend),
                    max_texture_dimension_2d: limits.max_texture_dimension_2d,
                }
            })
            .collect();

        Ok(adapters)
    }
}

/// Ordinal device tier, 0 (weakest) to 4 (strongest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceTier {
    /// Software rendering only
    Entry = 0,
    /// Low-end or virtual GPU
    Baseline = 1,
    /// Mainstream integrated GPU
    Standard = 2,
    /// Strong integrated or entry discrete GPU
    Performance = 3,
    /// High-end discrete GPU
    Flagship = 4,
}

impl DeviceTier {
    /// Get the ordinal value
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    /// Build a tier from an ordinal, clamping to the valid range
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Self::Entry,
            1 => Self::Baseline,
            2 => Self::Standard,
            3 => Self::Performance,
            _ => Self::Flagship,
        }
    }

    /// Classify an adapter
    pub fn classify(adapter: &AdapterInfo) -> Self {
        let tex = adapter.max_texture_dimension_2d;
        match adapter.class {
            AdapterClass::Cpu => Self::Entry,
            AdapterClass::Virtual | AdapterClass::Other => Self::Baseline,
            AdapterClass::Integrated if tex >= 16384 => Self::Performance,
            AdapterClass::Integrated if tex >= 8192 => Self::Standard,
            AdapterClass::Integrated => Self::Baseline,
            AdapterClass::Discrete if tex >= 16384 => Self::Flagship,
            AdapterClass::Discrete => Self::Performance,
        }
    }
}

/// Device capabilities detected once at startup.
///
/// Only `tier` drives optimizer decisions. The derived limits are reported by
/// diagnostics and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Device tier
    pub tier: DeviceTier,
    /// Name of the adapter the tier was derived from
    pub adapter_name: String,
    /// Maximum texture size
    pub max_texture_size: u32,
    /// Estimated memory bandwidth in GB/s
    pub memory_bandwidth_gbps: f32,
    /// Estimated GPU core count
    pub gpu_cores: u32,
    /// Number of LOD levels worth generating on this device
    pub recommended_lod_levels: u8,
}

impl DeviceCapabilities {
    /// Capabilities implied by a tier alone
    pub fn for_tier(tier: DeviceTier) -> Self {
        let (max_texture_size, memory_bandwidth_gbps, gpu_cores, recommended_lod_levels) =
            match tier {
                DeviceTier::Entry => (2048, 8.0, 1, 2),
                DeviceTier::Baseline => (4096, 17.0, 4, 3),
                DeviceTier::Standard => (8192, 34.0, 6, 4),
                DeviceTier::Performance => (16384, 68.0, 10, 5),
                DeviceTier::Flagship => (16384, 200.0, 32, 5),
            };

        Self {
            tier,
            adapter_name: String::from("Unknown"),
            max_texture_size,
            memory_bandwidth_gbps,
            gpu_cores,
            recommended_lod_levels,
        }
    }

    /// Capabilities for a probed adapter
    pub fn from_adapter(adapter: &AdapterInfo) -> Self {
        let mut caps = Self::for_tier(DeviceTier::classify(adapter));
        caps.adapter_name = adapter.name.clone();
        if adapter.max_texture_dimension_2d > 0 {
            caps.max_texture_size = adapter.max_texture_dimension_2d;
        }
        caps
    }
}

/// Runs the one-shot capability probe
pub struct DeviceCapabilityProfiler;

impl DeviceCapabilityProfiler {
    /// Profile the device, picking the strongest adapter.
    ///
    /// Fails with [`PlatformError::NoGraphicsDevice`] if the query finds nothing.
    pub fn profile(query: &dyn DeviceQuery) -> PlatformResult<DeviceCapabilities> {
        let adapters = query.adapters()?;

        let best = adapters
            .iter()
            .max_by_key(|adapter| {
                (DeviceTier::classify(adapter), adapter.max_texture_dimension_2d)
            })
            .ok_or(PlatformError::NoGraphicsDevice)?;

        let caps = DeviceCapabilities::from_adapter(best);
        log::info!(
            "Device profiled: {} ({}, {:?}) -> tier {}",
            best.name,
            best.backend,
            best.class,
            caps.tier.ordinal()
        );
        Ok(caps)
    }

    /// Profile through wgpu across all backends
    pub fn detect() -> PlatformResult<DeviceCapabilities> {
        Self::profile(&WgpuDeviceQuery::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticQuery(Vec<AdapterInfo>);

    impl DeviceQuery for StaticQuery {
        fn adapters(&self) -> PlatformResult<Vec<AdapterInfo>> {
            Ok(self.0.clone())
        }
    }

    fn adapter(name: &str, class: AdapterClass, tex: u32) -> AdapterInfo {
        AdapterInfo {
            name: name.to_string(),
            class,
            backend: "Vulkan".to_string(),
            max_texture_dimension_2d: tex,
        }
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(DeviceTier::classify(&adapter("llvmpipe", AdapterClass::Cpu, 8192)), DeviceTier::Entry);
        assert_eq!(DeviceTier::classify(&adapter("virt", AdapterClass::Virtual, 16384)), DeviceTier::Baseline);
        assert_eq!(DeviceTier::classify(&adapter("igpu", AdapterClass::Integrated, 4096)), DeviceTier::Baseline);
        assert_eq!(DeviceTier::classify(&adapter("igpu", AdapterClass::Integrated, 8192)), DeviceTier::Standard);
        assert_eq!(DeviceTier::classify(&adapter("igpu", AdapterClass::Integrated, 16384)), DeviceTier::Performance);
        assert_eq!(DeviceTier::classify(&adapter("dgpu", AdapterClass::Discrete, 8192)), DeviceTier::Performance);
        assert_eq!(DeviceTier::classify(&adapter("dgpu", AdapterClass::Discrete, 32768)), DeviceTier::Flagship);
    }

    #[test]
    fn test_profile_picks_strongest_adapter() {
        let query = StaticQuery(vec![
            adapter("llvmpipe", AdapterClass::Cpu, 8192),
            adapter("dgpu", AdapterClass::Discrete, 32768),
            adapter("igpu", AdapterClass::Integrated, 16384),
        ]);

        let caps = DeviceCapabilityProfiler::profile(&query).unwrap();
        assert_eq!(caps.tier, DeviceTier::Flagship);
        assert_eq!(caps.adapter_name, "dgpu");
        assert_eq!(caps.max_texture_size, 32768);
        assert_eq!(caps.recommended_lod_levels, 5);
    }

    #[test]
    fn test_profile_without_device_fails() {
        let query = StaticQuery(Vec::new());
        let err = DeviceCapabilityProfiler::profile(&query).unwrap_err();
        assert!(matches!(err, PlatformError::NoGraphicsDevice));
    }

    #[test]
    fn test_tier_ordinals() {
        for ordinal in 0..=4 {
            assert_eq!(DeviceTier::from_ordinal(ordinal).ordinal(), ordinal);
        }
        assert_eq!(DeviceTier::from_ordinal(17), DeviceTier::Flagship);
    }

    #[test]
    fn test_tier_table_is_monotonic() {
        let tiers = [
            DeviceTier::Entry,
            DeviceTier::Baseline,
            DeviceTier::Standard,
            DeviceTier::Performance,
            DeviceTier::Flagship,
        ];
        for pair in tiers.windows(2) {
            let lo = DeviceCapabilities::for_tier(pair[0]);
            let hi = DeviceCapabilities::for_tier(pair[1]);
            assert!(hi.memory_bandwidth_gbps > lo.memory_bandwidth_gbps);
            assert!(hi.gpu_cores > lo.gpu_cores);
            assert!(hi.recommended_lod_levels >= lo.recommended_lod_levels);
        }
    }
}
