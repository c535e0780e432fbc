//! # Tessera CLI
//!
//! Diagnostics for the Tessera adaptive performance engine.
//!
//! ## Commands
//! - `probe` - Profile the graphics device and list tier-gated features
//! - `simulate` - Replay a recorded sample trace through the optimizer
//! - `monitor` - Watch live optimizer decisions driven by system metrics

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tessera_optimizer::{FeatureSet, OptimizationCoordinator, OptimizationSnapshot, OptimizerConfig};
use tessera_platform::{
    AdapterInfo, DeviceCapabilities, DeviceCapabilityProfiler, DeviceQuery, DeviceTier, PerformanceSample,
    RenderTelemetry, SystemMetricsSource, WgpuDeviceQuery,
};

/// Tessera diagnostics CLI
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Profile the graphics device
    Probe {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Replay a sample trace through the optimizer
    Simulate {
        /// JSON array of performance samples
        #[arg(short, long)]
        trace: PathBuf,

        /// Device tier to simulate (0-4)
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(0..=4))]
        tier: u8,

        /// Optimizer configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON snapshot per line
        #[arg(long)]
        json: bool,
    },

    /// Watch live optimizer decisions
    Monitor {
        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Optimizer configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Probe { json } => probe(json),
        Commands::Simulate { trace, tier, config, json } => {
            let config = load_config(config.as_deref())?;
            let samples = load_trace(&trace)?;
            let capabilities = DeviceCapabilities::for_tier(DeviceTier::from_ordinal(tier));
            log::info!("Replaying {} sample(s) from {} at tier {}", samples.len(), trace.display(), tier);

            for snapshot in simulate(config, capabilities, &samples)? {
                print_snapshot(&snapshot, json)?;
            }
            Ok(())
        }
        Commands::Monitor { duration, config } => {
            let config = load_config(config.as_deref())?;
            monitor(config, Duration::from_secs(duration))
        }
    }
}

/// Device probe output
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub adapters: Vec<AdapterInfo>,
    pub capabilities: DeviceCapabilities,
    pub features: Vec<&'static str>,
}

/// Profile `query` into a report
pub fn probe_report(query: &dyn DeviceQuery) -> Result<ProbeReport> {
    let adapters = query.adapters().context("failed to enumerate graphics adapters")?;
    let capabilities = DeviceCapabilityProfiler::profile(query).context("device profiling failed")?;
    let features = FeatureSet::for_tier(capabilities.tier, false)
        .features()
        .map(|f| f.name())
        .collect();

    Ok(ProbeReport {
        adapters,
        capabilities,
        features,
    })
}

fn probe(json: bool) -> Result<()> {
    let report = probe_report(&WgpuDeviceQuery::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Adapters:");
    for adapter in &report.adapters {
        println!(
            "  {} ({:?}, {}) max texture {}",
            adapter.name, adapter.class, adapter.backend, adapter.max_texture_dimension_2d
        );
    }
    let caps = &report.capabilities;
    println!("Selected: {}", caps.adapter_name);
    println!("  Tier: {} ({:?})", caps.tier.ordinal(), caps.tier);
    println!("  Max texture size: {}", caps.max_texture_size);
    println!("  Memory bandwidth: {:.0} GB/s", caps.memory_bandwidth_gbps);
    println!("  GPU cores: {}", caps.gpu_cores);
    println!("  Recommended LOD levels: {}", caps.recommended_lod_levels);
    if report.features.is_empty() {
        println!("  Features: none");
    } else {
        println!("  Features: {}", report.features.join(", "));
    }
    Ok(())
}

/// Load an optimizer configuration, or the defaults without a path
pub fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    match path {
        Some(path) => OptimizerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(OptimizerConfig::default()),
    }
}

/// Read a JSON array of performance samples
pub fn load_trace(path: &Path) -> Result<Vec<PerformanceSample>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read trace {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid trace {}", path.display()))
}

/// Feed every sample through a fresh coordinator, returning each published snapshot
pub fn simulate(
    config: OptimizerConfig,
    capabilities: DeviceCapabilities,
    samples: &[PerformanceSample],
) -> Result<Vec<Arc<OptimizationSnapshot>>> {
    let coordinator = OptimizationCoordinator::new(config, capabilities)?;
    Ok(samples.iter().map(|sample| coordinator.ingest_sample(*sample)).collect())
}

/// One-line summary of a snapshot
pub fn format_snapshot(snapshot: &OptimizationSnapshot) -> String {
    let ceiling = snapshot
        .lod
        .max_lod_override()
        .map_or_else(|| "none".to_string(), |level| level.ordinal().to_string());
    let fps = snapshot.sample.map_or(0.0, |s| s.frame_rate);

    format!(
        "tick {:>4}  {:<6} {:>5.1} fps  {}x{}  lod ceiling {}  culling {:?}  cache {} MB{}{}",
        snapshot.tick,
        format!("{:?}", snapshot.level),
        fps,
        snapshot.resolution.0,
        snapshot.resolution.1,
        ceiling,
        snapshot.culling_mode,
        snapshot.cache_budget.max_bytes / tessera_core::memory::MB,
        if snapshot.thermal_throttling { "  throttled" } else { "" },
        if snapshot.fallback { "  fallback" } else { "" },
    )
}

fn print_snapshot(snapshot: &OptimizationSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", format_snapshot(snapshot));
    }
    Ok(())
}

fn monitor(config: OptimizerConfig, duration: Duration) -> Result<()> {
    let capabilities = DeviceCapabilityProfiler::detect().context("device profiling failed")?;
    let telemetry = RenderTelemetry::new();
    let source = SystemMetricsSource::new(telemetry, &config.monitor, config.target_frame_rate);

    let mut coordinator = OptimizationCoordinator::new(config, capabilities)?;
    let snapshots = coordinator.subscribe();
    coordinator.start_monitoring(Box::new(source))?;
    log::info!("Monitoring for {} s", duration.as_secs());

    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match snapshots.recv_timeout(remaining) {
            Ok(snapshot) => println!("{}", format_snapshot(&snapshot)),
            Err(_) => break,
        }
    }

    coordinator.stop_monitoring();
    let stats = coordinator.cache_stats();
    log::info!(
        "Done after {} tick(s); cache hit ratio {:.2}",
        coordinator.snapshot().tick,
        stats.hit_ratio()
    );
    Ok(())
}
