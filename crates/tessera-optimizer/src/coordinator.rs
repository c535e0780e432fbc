//! Optimization Coordinator
//!
//! Owns every optimizer subsystem and drives them from performance samples.
//! A single writer (the monitor tick, or [`OptimizationCoordinator::ingest_sample`])
//! recomputes the decisions and publishes them as one immutable
//! [`OptimizationSnapshot`]. Render-path queries clone the current snapshot
//! and never wait on a tick in progress.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tessera_core::{
    ContentImportance, ElementId, LodLevel, MemoryBudget, MemoryPressure, Mesh, PerformanceLevel,
    RoomGeometry, ScopedTimer, ThermalState, Vec3, VirtualElement,
};
use tessera_platform::{
    DeviceCapabilities, DeviceCapabilityProfiler, DeviceQuery, MetricsSource, PerformanceMonitor,
    PerformanceSample,
};

use crate::cache::{CacheStats, EnvironmentElement, TemporalCache};
use crate::classifier::{classify, LevelSmoother};
use crate::features::{Feature, FeatureSet};
use crate::lod::{LodManager, LodMesh};
use crate::occlusion::{CullingMode, OcclusionCuller};
use crate::quality::{QualityScaler, QualitySettings};
use crate::{OptimizerConfig, OptimizerError, OptimizerResult};

/// Snapshots buffered per subscriber before new ones are dropped for it
const SUBSCRIBER_BUFFER: usize = 64;

/// Every optimizer decision for one tick
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationSnapshot {
    /// Ticks processed so far; 0 before the first sample
    pub tick: u64,
    pub level: PerformanceLevel,
    /// Sample the decisions were derived from
    pub sample: Option<PerformanceSample>,
    pub lod: LodManager,
    pub culling_mode: CullingMode,
    pub quality: QualitySettings,
    pub resolution: (u32, u32),
    pub cache_budget: MemoryBudget,
    pub thermal_throttling: bool,
    pub fallback: bool,
    pub features: FeatureSet,
}

/// State only the writer touches
struct WriterState {
    tick: u64,
    smoother: LevelSmoother,
    lod: LodManager,
    quality: QualityScaler,
    last_sample: Option<PerformanceSample>,
    last_sweep: Instant,
    fallback: bool,
    subscribers: Vec<Sender<Arc<OptimizationSnapshot>>>,
}

struct Shared {
    config: OptimizerConfig,
    capabilities: DeviceCapabilities,
    snapshot: RwLock<Arc<OptimizationSnapshot>>,
    writer: Mutex<WriterState>,
    /// Queries take their mode from the snapshot, not from here
    culler: RwLock<OcclusionCuller>,
    cache: Mutex<TemporalCache>,
}

impl Shared {
    fn ingest(&self, sample: PerformanceSample) -> Arc<OptimizationSnapshot> {
        let _timer = ScopedTimer::with_budget("optimizer.tick", self.config.monitor.interval());
        let mut writer = self.writer.lock();

        let raw = classify(&sample, self.config.target_frame_rate);
        let previous = writer.smoother.current();
        let level = writer.smoother.observe(raw);
        match previous {
            Some(previous) if previous != level => {
                log::info!("Performance level changed: {:?} -> {:?}", previous, level)
            }
            None => log::info!("Initial performance level: {:?}", level),
            _ => {}
        }

        writer.lod.update_performance_level(level);
        writer.quality.set_thermal_state(sample.thermal_state);
        writer.quality.update_quality_level(level);
        self.culler.write().update_culling_level(level);
        let fallback = writer.fallback;
        apply_lod_ceiling(&mut writer.lod, fallback, sample.thermal_state, sample.memory_pressure);

        {
            let mut cache = self.cache.lock();
            cache.adjust_cache_size(sample.memory_pressure);

            let sweep_interval = Duration::from_secs(self.config.cache_sweep_interval_secs);
            if writer.last_sweep.elapsed() >= sweep_interval {
                cache.cleanup_unused_elements();
                writer.last_sweep = Instant::now();
            }
        }

        writer.tick += 1;
        writer.last_sample = Some(sample);
        log::debug!(
            "Tick {}: raw {:?}, level {:?}, {:.1} fps, memory {:?}, thermal {:?}",
            writer.tick,
            raw,
            level,
            sample.frame_rate,
            sample.memory_pressure,
            sample.thermal_state
        );

        self.publish(&mut writer)
    }

    fn enable_fallback(&self) {
        let mut writer = self.writer.lock();
        if writer.fallback {
            return;
        }

        writer.fallback = true;
        writer.quality.enable_fallback();
        writer.lod.set_max_lod_level(LodLevel::Minimal);
        self.culler.write().disable();
        self.cache.lock().disable();
        log::warn!("Fallback mode enabled: occlusion culling and temporal caching disabled");

        self.publish(&mut writer);
    }

    fn build_snapshot(&self, writer: &WriterState) -> OptimizationSnapshot {
        let cache_budget = {
            let cache = self.cache.lock();
            if cache.is_enabled() { cache.budget() } else { MemoryBudget::new(0) }
        };

        OptimizationSnapshot {
            tick: writer.tick,
            level: writer.lod.performance_level(),
            sample: writer.last_sample,
            lod: writer.lod,
            culling_mode: self.culler.read().mode(),
            quality: writer.quality.settings(),
            resolution: writer.quality.get_scaled_render_resolution(),
            cache_budget,
            thermal_throttling: writer.quality.thermal_state().is_throttling(),
            fallback: writer.fallback,
            features: FeatureSet::for_tier(self.capabilities.tier, writer.fallback),
        }
    }

    fn publish(&self, writer: &mut WriterState) -> Arc<OptimizationSnapshot> {
        let snapshot = Arc::new(self.build_snapshot(writer));
        *self.snapshot.write() = Arc::clone(&snapshot);

        writer.subscribers.retain(|tx| match tx.try_send(Arc::clone(&snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Snapshot subscriber is lagging; dropping tick {}", snapshot.tick);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });

        snapshot
    }
}

/// Recompute the external LOD ceiling from fallback, thermal and memory state
fn apply_lod_ceiling(lod: &mut LodManager, fallback: bool, thermal: ThermalState, memory: MemoryPressure) {
    if fallback {
        lod.set_max_lod_level(LodLevel::Minimal);
        return;
    }

    lod.reset_max_lod_level();
    match thermal {
        ThermalState::Serious => lod.set_max_lod_level(LodLevel::High),
        ThermalState::Critical => lod.set_max_lod_level(LodLevel::Medium),
        ThermalState::Nominal | ThermalState::Fair => {}
    }
    if memory >= MemoryPressure::High {
        lod.reduce_memory_footprint();
    }
}

/// Adaptive performance coordinator
pub struct OptimizationCoordinator {
    shared: Arc<Shared>,
    monitor: PerformanceMonitor,
}

impl OptimizationCoordinator {
    /// Profile the device through `query` and build a coordinator for it.
    ///
    /// Fails if no usable graphics device exists.
    pub fn initialize(config: OptimizerConfig, query: &dyn DeviceQuery) -> OptimizerResult<Self> {
        let capabilities = DeviceCapabilityProfiler::profile(query)?;
        Self::new(config, capabilities)
    }

    /// Build a coordinator for already profiled capabilities
    pub fn new(config: OptimizerConfig, capabilities: DeviceCapabilities) -> OptimizerResult<Self> {
        config.validate()?;

        let writer = WriterState {
            tick: 0,
            smoother: LevelSmoother::new(config.level_change_samples),
            lod: LodManager::new(),
            quality: QualityScaler::new(config.quality_floor, config.base_resolution),
            last_sample: None,
            last_sweep: Instant::now(),
            fallback: false,
            subscribers: Vec::new(),
        };
        let cache = TemporalCache::new(Duration::from_secs(config.cache_stale_after_secs));
        let culler = OcclusionCuller::new(config.low_performance_view_distance);

        let initial = OptimizationSnapshot {
            tick: 0,
            level: writer.lod.performance_level(),
            sample: None,
            lod: writer.lod,
            culling_mode: culler.mode(),
            quality: writer.quality.settings(),
            resolution: writer.quality.get_scaled_render_resolution(),
            cache_budget: cache.budget(),
            thermal_throttling: false,
            fallback: false,
            features: FeatureSet::for_tier(capabilities.tier, false),
        };

        let below_threshold = capabilities.tier.ordinal() < config.fallback_tier_threshold;
        let monitor = PerformanceMonitor::new(config.monitor.clone());

        log::info!(
            "Optimizer ready for tier {} device '{}' (target {} fps)",
            capabilities.tier.ordinal(),
            capabilities.adapter_name,
            config.target_frame_rate
        );

        let coordinator = Self {
            shared: Arc::new(Shared {
                config,
                capabilities,
                snapshot: RwLock::new(Arc::new(initial)),
                writer: Mutex::new(writer),
                culler: RwLock::new(culler),
                cache: Mutex::new(cache),
            }),
            monitor,
        };

        if below_threshold {
            log::warn!(
                "Device tier {} is below the fallback threshold {}",
                coordinator.shared.capabilities.tier.ordinal(),
                coordinator.shared.config.fallback_tier_threshold
            );
            coordinator.enable_fallback_mode();
        }

        Ok(coordinator)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.shared.config
    }

    /// Capabilities profiled at startup
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.shared.capabilities
    }

    /// Start sampling `source` on the monitor thread, one tick per interval
    pub fn start_monitoring(&mut self, source: Box<dyn MetricsSource>) -> OptimizerResult<()> {
        let shared = Arc::clone(&self.shared);
        self.monitor
            .start_monitoring(source, move |sample| {
                shared.ingest(sample);
            })
            .map_err(OptimizerError::Monitor)
    }

    /// Stop sampling; no tick runs after this returns
    pub fn stop_monitoring(&mut self) {
        self.monitor.stop_monitoring();
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    /// Run one tick for `sample` and return the published snapshot
    pub fn ingest_sample(&self, sample: PerformanceSample) -> Arc<OptimizationSnapshot> {
        self.shared.ingest(sample)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<OptimizationSnapshot> {
        self.shared.snapshot.read().clone()
    }

    /// Receive every snapshot published from now on.
    ///
    /// A receiver that falls behind misses snapshots rather than stalling the tick.
    pub fn subscribe(&self) -> Receiver<Arc<OptimizationSnapshot>> {
        let (tx, rx) = channel::bounded(SUBSCRIBER_BUFFER);
        self.shared.writer.lock().subscribers.push(tx);
        rx
    }

    /// Number of live subscriptions as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.shared.writer.lock().subscribers.len()
    }

    pub fn performance_level(&self) -> PerformanceLevel {
        self.snapshot().level
    }

    /// LOD for an element seen from `viewer`
    pub fn get_appropriate_lod_level(&self, element: &VirtualElement, viewer: Vec3) -> LodLevel {
        let importance = ContentImportance::from_render_priority(element.render_priority);
        self.lod_level_for(element.distance_to(viewer), importance)
    }

    /// LOD for a distance and importance at the current level and ceiling
    pub fn lod_level_for(&self, distance: f32, importance: ContentImportance) -> LodLevel {
        self.snapshot().lod.lod_level(distance, importance)
    }

    /// Build LOD variants for `meshes`
    pub fn generate_lod_meshes(&self, meshes: &[Mesh]) -> Vec<LodMesh> {
        log::debug!(
            "Generating LOD variants for {} mesh(es); device recommends {} level(s)",
            meshes.len(),
            self.shared.capabilities.recommended_lod_levels
        );
        self.snapshot().lod.generate_lod_meshes(meshes)
    }

    /// Replace the room scan used for occlusion
    pub fn update_room_geometry(&self, geometry: &RoomGeometry) {
        self.shared.culler.write().update_room_geometry(geometry);
    }

    /// Elements visible from `viewer`, in input order.
    ///
    /// Uses the mode of the published snapshot, so a tick in progress never
    /// changes how a frame is culled.
    pub fn cull_occluded_elements(&self, elements: &[VirtualElement], viewer: Vec3) -> Vec<VirtualElement> {
        let mode = self.snapshot().culling_mode;
        let culler = self.shared.culler.read().clone();
        culler.cull_elements_with(mode, elements, viewer)
    }

    /// Cache the static elements; returns how many were stored
    pub fn cache_static_elements<I>(&self, elements: I) -> usize
    where
        I: IntoIterator<Item = EnvironmentElement>,
    {
        self.shared.cache.lock().cache_static_elements(elements)
    }

    pub fn get_cached_element(&self, id: ElementId) -> Option<EnvironmentElement> {
        self.shared.cache.lock().get_cached_element(id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.lock().stats()
    }

    /// Bytes currently cached
    pub fn cache_size(&self) -> usize {
        self.shared.cache.lock().size()
    }

    pub fn get_current_quality_settings(&self) -> QualitySettings {
        self.snapshot().quality
    }

    /// Base resolution scaled by the current render scale
    pub fn get_scaled_render_resolution(&self) -> (u32, u32) {
        self.snapshot().resolution
    }

    pub fn is_feature_supported(&self, feature: Feature) -> bool {
        self.snapshot().features.supports(feature)
    }

    pub fn supported_features(&self) -> FeatureSet {
        self.snapshot().features
    }

    /// Switch to minimal quality for the rest of the session.
    ///
    /// Disables occlusion culling and temporal caching and pins the LOD
    /// ceiling to `Minimal`. There is no way back.
    pub fn enable_fallback_mode(&self) {
        self.shared.enable_fallback();
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.snapshot().fallback
    }
}

impl std::fmt::Debug for OptimizationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("OptimizationCoordinator")
            .field("tier", &self.shared.capabilities.tier)
            .field("tick", &snapshot.tick)
            .field("level", &snapshot.level)
            .field("fallback", &snapshot.fallback)
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tessera_core::Aabb;
    use tessera_core::memory::MB;
    use tessera_platform::{DeviceTier, MonitorConfig, PlatformError, PlatformResult};

    fn coordinator(tier: DeviceTier) -> OptimizationCoordinator {
        let config = OptimizerConfig {
            level_change_samples: 1,
            ..OptimizerConfig::default()
        };
        OptimizationCoordinator::new(config, DeviceCapabilities::for_tier(tier)).unwrap()
    }

    fn sample(frame_rate: f32, memory: MemoryPressure, thermal: ThermalState) -> PerformanceSample {
        PerformanceSample {
            memory_pressure: memory,
            thermal_state: thermal,
            ..PerformanceSample::nominal(frame_rate)
        }
    }

    fn environment(id: u64, bytes: usize) -> EnvironmentElement {
        EnvironmentElement::new(ElementId(id), true, ContentImportance::Normal, vec![0u8; bytes])
    }

    struct NoAdapters;

    impl DeviceQuery for NoAdapters {
        fn adapters(&self) -> PlatformResult<Vec<tessera_platform::AdapterInfo>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_initialize_without_device_fails() {
        let result = OptimizationCoordinator::initialize(OptimizerConfig::default(), &NoAdapters);
        assert!(matches!(
            result,
            Err(OptimizerError::Device(PlatformError::NoGraphicsDevice))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OptimizerConfig {
            target_frame_rate: -1.0,
            ..OptimizerConfig::default()
        };
        let result = OptimizationCoordinator::new(config, DeviceCapabilities::for_tier(DeviceTier::Flagship));
        assert!(matches!(result, Err(OptimizerError::InvalidConfig(_))));
    }

    #[test]
    fn test_top_tier_nominal_sample_runs_full_resolution() {
        let coordinator = coordinator(DeviceTier::Flagship);
        let snapshot = coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));

        assert_eq!(snapshot.tick, 1);
        assert_eq!(coordinator.performance_level(), PerformanceLevel::High);
        assert_eq!(coordinator.get_scaled_render_resolution(), (1920, 1080));
        assert!(!coordinator.is_fallback_mode());
    }

    #[test]
    fn test_critical_memory_clears_cache() {
        let coordinator = coordinator(DeviceTier::Flagship);
        assert_eq!(coordinator.cache_static_elements((0..4).map(|i| environment(i, MB))), 4);
        assert_eq!(coordinator.cache_size(), 4 * MB);

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Critical, ThermalState::Nominal));
        assert_eq!(coordinator.cache_size(), 0);
        assert!(coordinator.get_cached_element(ElementId(0)).is_none());
    }

    #[test]
    fn test_close_critical_element_at_low_performance() {
        let coordinator = coordinator(DeviceTier::Flagship);
        coordinator.ingest_sample(sample(20.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.performance_level(), PerformanceLevel::Low);

        let element = VirtualElement::new(ElementId(1), Vec3::new(3.0, 0.0, 0.0), 1.0, 1.0);
        assert_eq!(coordinator.get_appropriate_lod_level(&element, Vec3::ZERO), LodLevel::Medium);
    }

    #[test]
    fn test_hysteresis_from_config() {
        let config = OptimizerConfig {
            level_change_samples: 2,
            ..OptimizerConfig::default()
        };
        let coordinator = OptimizationCoordinator::new(config, DeviceCapabilities::for_tier(DeviceTier::Flagship)).unwrap();

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        coordinator.ingest_sample(sample(10.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.performance_level(), PerformanceLevel::High);
        coordinator.ingest_sample(sample(10.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.performance_level(), PerformanceLevel::Low);
    }

    #[test]
    fn test_thermal_and_memory_ceilings() {
        let coordinator = coordinator(DeviceTier::Flagship);

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Serious));
        assert_eq!(coordinator.snapshot().lod.max_lod_override(), Some(LodLevel::High));
        assert!(coordinator.snapshot().thermal_throttling);

        coordinator.ingest_sample(sample(60.0, MemoryPressure::High, ThermalState::Serious));
        assert_eq!(coordinator.snapshot().lod.max_lod_override(), Some(LodLevel::Medium));

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.snapshot().lod.max_lod_override(), None);
        assert!(!coordinator.snapshot().thermal_throttling);
    }

    #[test]
    fn test_low_level_degrades_culling() {
        let coordinator = coordinator(DeviceTier::Flagship);
        coordinator.ingest_sample(sample(10.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.snapshot().culling_mode, CullingMode::DistanceOnly);

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        assert_eq!(coordinator.snapshot().culling_mode, CullingMode::RayTest);
    }

    #[test]
    fn test_culling_through_coordinator() {
        let coordinator = coordinator(DeviceTier::Flagship);
        let table = Mesh::cuboid("table", Aabb::new(Vec3::new(4.0, 0.0, 4.0), Vec3::new(6.0, 2.0, 5.0)));
        let geometry = RoomGeometry::new(Vec::new(), Vec::new(), vec![table])
            .with_bounding_box(Aabb::new(Vec3::ZERO, Vec3::splat(10.0)));
        coordinator.update_room_geometry(&geometry);

        let elements = [
            VirtualElement::new(ElementId(1), Vec3::new(5.0, 1.0, 8.0), 0.5, 0.5),
            VirtualElement::new(ElementId(2), Vec3::new(1.0, 1.0, 8.0), 0.5, 0.5),
        ];
        let visible = coordinator.cull_occluded_elements(&elements, Vec3::new(5.0, 1.0, 1.0));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, ElementId(2));
    }

    #[test]
    fn test_culling_uses_published_mode() {
        let coordinator = coordinator(DeviceTier::Flagship);
        let table = Mesh::cuboid("table", Aabb::new(Vec3::new(4.0, 0.0, 4.0), Vec3::new(6.0, 2.0, 5.0)));
        let geometry = RoomGeometry::new(Vec::new(), Vec::new(), vec![table])
            .with_bounding_box(Aabb::new(Vec3::ZERO, Vec3::splat(10.0)));
        coordinator.update_room_geometry(&geometry);
        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));

        // A tick that has degraded the culler but not yet published
        coordinator.shared.culler.write().update_culling_level(PerformanceLevel::Low);
        assert_eq!(coordinator.snapshot().culling_mode, CullingMode::RayTest);

        let behind_table = [VirtualElement::new(ElementId(1), Vec3::new(5.0, 1.0, 5.8), 0.5, 0.5)];
        let visible = coordinator.cull_occluded_elements(&behind_table, Vec3::new(5.0, 1.0, 3.5));
        assert!(visible.is_empty());

        // Once the level is published the frame sees the cheaper mode
        coordinator.ingest_sample(sample(10.0, MemoryPressure::Low, ThermalState::Nominal));
        let visible = coordinator.cull_occluded_elements(&behind_table, Vec3::new(5.0, 1.0, 3.5));
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_tick_sweeps_stale_entries_on_interval() {
        let sweeping = OptimizationCoordinator::new(
            OptimizerConfig {
                cache_stale_after_secs: 0,
                cache_sweep_interval_secs: 0,
                ..OptimizerConfig::default()
            },
            DeviceCapabilities::for_tier(DeviceTier::Flagship),
        )
        .unwrap();
        let waiting = OptimizationCoordinator::new(
            OptimizerConfig {
                cache_stale_after_secs: 0,
                cache_sweep_interval_secs: 3600,
                ..OptimizerConfig::default()
            },
            DeviceCapabilities::for_tier(DeviceTier::Flagship),
        )
        .unwrap();

        assert_eq!(sweeping.cache_static_elements(vec![environment(1, 64)]), 1);
        assert_eq!(waiting.cache_static_elements(vec![environment(1, 64)]), 1);
        std::thread::sleep(Duration::from_millis(5));

        sweeping.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        waiting.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));

        assert_eq!(sweeping.cache_size(), 0);
        assert_eq!(waiting.cache_size(), 64);
    }

    #[test]
    fn test_fallback_is_irreversible() {
        let coordinator = coordinator(DeviceTier::Flagship);
        coordinator.cache_static_elements(vec![environment(1, 64)]);
        coordinator.enable_fallback_mode();

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        let snapshot = coordinator.snapshot();
        assert!(snapshot.fallback);
        assert_eq!(snapshot.quality, QualitySettings::minimal());
        assert_eq!(snapshot.culling_mode, CullingMode::Disabled);
        assert_eq!(coordinator.lod_level_for(0.0, ContentImportance::Critical), LodLevel::Minimal);

        assert_eq!(coordinator.cache_size(), 0);
        assert_eq!(coordinator.cache_static_elements(vec![environment(2, 64)]), 0);

        assert!(coordinator.is_feature_supported(Feature::SceneReconstruction));
        assert!(!coordinator.is_feature_supported(Feature::RealTimeReflections));
    }

    #[test]
    fn test_low_tier_starts_in_fallback() {
        let coordinator = coordinator(DeviceTier::Entry);
        assert!(coordinator.is_fallback_mode());
        assert_eq!(coordinator.supported_features(), FeatureSet::empty());
    }

    #[test]
    fn test_feature_gating_by_tier() {
        let coordinator = coordinator(DeviceTier::Standard);
        assert!(coordinator.is_feature_supported(Feature::SceneReconstruction));
        assert!(coordinator.is_feature_supported(Feature::AdvancedShaders));
        assert!(!coordinator.is_feature_supported(Feature::HighQualityLighting));
    }

    #[test]
    fn test_subscribers_receive_snapshots() {
        let coordinator = coordinator(DeviceTier::Flagship);
        let rx = coordinator.subscribe();
        let dropped = coordinator.subscribe();
        drop(dropped);

        coordinator.ingest_sample(sample(60.0, MemoryPressure::Low, ThermalState::Nominal));
        coordinator.ingest_sample(sample(10.0, MemoryPressure::Low, ThermalState::Nominal));

        let ticks: Vec<u64> = rx.try_iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![1, 2]);
        assert_eq!(coordinator.subscriber_count(), 1);
    }

    struct CountingSource {
        count: Arc<AtomicU64>,
    }

    impl MetricsSource for CountingSource {
        fn sample(&mut self) -> PerformanceSample {
            self.count.fetch_add(1, Ordering::SeqCst);
            PerformanceSample::nominal(60.0)
        }
    }

    #[test]
    fn test_monitoring_drives_ticks() {
        let config = OptimizerConfig {
            monitor: MonitorConfig {
                interval_ms: 10,
                ..MonitorConfig::default()
            },
            ..OptimizerConfig::default()
        };
        let mut coordinator =
            OptimizationCoordinator::new(config, DeviceCapabilities::for_tier(DeviceTier::Flagship)).unwrap();
        let count = Arc::new(AtomicU64::new(0));

        coordinator
            .start_monitoring(Box::new(CountingSource { count: Arc::clone(&count) }))
            .unwrap();
        assert!(coordinator.is_monitoring());
        std::thread::sleep(Duration::from_millis(100));
        coordinator.stop_monitoring();
        assert!(!coordinator.is_monitoring());

        let ticks = coordinator.snapshot().tick;
        assert!(ticks > 0);
        assert_eq!(ticks, count.load(Ordering::SeqCst));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(coordinator.snapshot().tick, ticks);
    }
}
