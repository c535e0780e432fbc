//! Level of Detail
//!
//! Per-element LOD selection from distance, importance and the current
//! performance level, plus generation of multi-resolution mesh variants.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tessera_core::{ContentImportance, LodLevel, Mesh, PerformanceLevel};

/// Distances in meters at which the base level drops by one
pub const LOD_SWITCH_DISTANCES: [f32; 4] = [5.0, 10.0, 20.0, 40.0];

/// Vertex keep ratio of each generated variant, highest detail first
pub const LOD_REDUCTION_FACTORS: [f32; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Base level from the distance bands alone
pub fn base_level_for_distance(distance: f32) -> LodLevel {
    if distance < LOD_SWITCH_DISTANCES[0] {
        LodLevel::Ultra
    } else if distance < LOD_SWITCH_DISTANCES[1] {
        LodLevel::High
    } else if distance < LOD_SWITCH_DISTANCES[2] {
        LodLevel::Medium
    } else if distance < LOD_SWITCH_DISTANCES[3] {
        LodLevel::Low
    } else {
        // Also covers NaN distances
        LodLevel::Minimal
    }
}

/// Highest level a performance level allows
pub fn performance_cap(level: PerformanceLevel) -> LodLevel {
    match level {
        PerformanceLevel::High => LodLevel::Ultra,
        PerformanceLevel::Medium => LodLevel::High,
        PerformanceLevel::Low => LodLevel::Medium,
    }
}

/// Chooses LOD levels. Cheap to copy, so it travels inside published snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodManager {
    performance_level: PerformanceLevel,
    max_lod_override: Option<LodLevel>,
}

impl LodManager {
    /// Create a manager at `High` performance with no override
    pub fn new() -> Self {
        Self {
            performance_level: PerformanceLevel::High,
            max_lod_override: None,
        }
    }

    /// Current performance level
    pub fn performance_level(&self) -> PerformanceLevel {
        self.performance_level
    }

    /// Track a new performance level
    pub fn update_performance_level(&mut self, level: PerformanceLevel) {
        self.performance_level = level;
    }

    /// External ceiling, if any
    pub fn max_lod_override(&self) -> Option<LodLevel> {
        self.max_lod_override
    }

    /// Clamp every result to `level` regardless of distance and importance
    pub fn set_max_lod_level(&mut self, level: LodLevel) {
        self.max_lod_override = Some(level);
    }

    /// Remove the external ceiling
    pub fn reset_max_lod_level(&mut self) {
        self.max_lod_override = None;
    }

    /// Lower the ceiling to `Medium` to save memory; never raises an existing ceiling
    pub fn reduce_memory_footprint(&mut self) {
        let ceiling = self
            .max_lod_override
            .map_or(LodLevel::Medium, |current| current.min(LodLevel::Medium));
        self.max_lod_override = Some(ceiling);
    }

    /// Effective ceiling from the performance level and the override
    pub fn effective_ceiling(&self) -> LodLevel {
        let cap = performance_cap(self.performance_level);
        match self.max_lod_override {
            Some(ceiling) => cap.min(ceiling),
            None => cap,
        }
    }

    /// LOD for an element at the current performance level
    pub fn lod_level(&self, distance: f32, importance: ContentImportance) -> LodLevel {
        self.calculate_lod_level(distance, importance, self.performance_level)
    }

    /// LOD from distance bands, importance bias, performance cap and override
    pub fn calculate_lod_level(
        &self,
        distance: f32,
        importance: ContentImportance,
        performance_level: PerformanceLevel,
    ) -> LodLevel {
        let base = base_level_for_distance(distance);
        let adjusted = LodLevel::from_ordinal(base.ordinal() as i32 + importance.ordinal() as i32 - 1);

        let mut result = adjusted.min(performance_cap(performance_level));
        if let Some(ceiling) = self.max_lod_override {
            result = result.min(ceiling);
        }
        result
    }

    /// Build LOD variants for every mesh
    pub fn generate_lod_meshes(&self, meshes: &[Mesh]) -> Vec<LodMesh> {
        meshes.par_iter().map(LodMesh::generate).collect()
    }
}

impl Default for LodManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep `factor` of the vertices by sampling at a fixed stride of `1 / factor`.
///
/// Faces are carried through unchanged, so indices may point past the kept
/// vertices. That is only acceptable for distant rendering.
pub fn decimate(mesh: &Mesh, factor: f32) -> Mesh {
    let factor = factor.clamp(f32::EPSILON, 1.0);
    let total = mesh.vertices.len();
    // Absorb float noise so 10 * 0.6 keeps 6 vertices, not 7
    let keep = ((total as f32 * factor - 1e-3).ceil().max(0.0) as usize).min(total);
    let stride = 1.0 / factor;

    let vertices = (0..keep)
        .map(|k| ((k as f32 * stride) as usize).min(total.saturating_sub(1)))
        .map(|i| mesh.vertices[i])
        .collect();

    Mesh {
        name: mesh.name.clone(),
        vertices,
        faces: mesh.faces.clone(),
    }
}

/// A mesh with its precomputed detail variants
#[derive(Debug, Clone)]
pub struct LodMesh {
    pub original: Mesh,
    /// Variants in `LOD_REDUCTION_FACTORS` order, highest detail first
    pub variants: SmallVec<[Mesh; 5]>,
    pub switch_distances: [f32; 4],
}

impl LodMesh {
    /// Generate the five variants for one mesh
    pub fn generate(mesh: &Mesh) -> Self {
        let variants = LOD_REDUCTION_FACTORS
            .iter()
            .map(|&factor| decimate(mesh, factor))
            .collect();

        Self {
            original: mesh.clone(),
            variants,
            switch_distances: LOD_SWITCH_DISTANCES,
        }
    }

    /// Variant to render at `level`
    pub fn mesh_for_level(&self, level: LodLevel) -> &Mesh {
        let index = (LodLevel::Ultra.ordinal() - level.ordinal()) as usize;
        self.variants.get(index).unwrap_or(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Vec3;

    const ALL_IMPORTANCE: [ContentImportance; 4] = [
        ContentImportance::Background,
        ContentImportance::Normal,
        ContentImportance::Important,
        ContentImportance::Critical,
    ];
    const ALL_PERFORMANCE: [PerformanceLevel; 3] = [
        PerformanceLevel::High,
        PerformanceLevel::Medium,
        PerformanceLevel::Low,
    ];

    fn line_mesh(count: usize) -> Mesh {
        let vertices = (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        Mesh::new("line", vertices, vec![[0, 1, 2]])
    }

    #[test]
    fn test_distance_bands() {
        assert_eq!(base_level_for_distance(0.0), LodLevel::Ultra);
        assert_eq!(base_level_for_distance(4.99), LodLevel::Ultra);
        assert_eq!(base_level_for_distance(5.0), LodLevel::High);
        assert_eq!(base_level_for_distance(10.0), LodLevel::Medium);
        assert_eq!(base_level_for_distance(20.0), LodLevel::Low);
        assert_eq!(base_level_for_distance(40.0), LodLevel::Minimal);
        assert_eq!(base_level_for_distance(f32::NAN), LodLevel::Minimal);
    }

    #[test]
    fn test_critical_close_element_at_low_performance() {
        let manager = LodManager::new();
        let level = manager.calculate_lod_level(3.0, ContentImportance::Critical, PerformanceLevel::Low);
        assert_eq!(level, LodLevel::Medium);
        assert_eq!(level.ordinal(), 2);
    }

    #[test]
    fn test_importance_bias() {
        let manager = LodManager::new();
        let high = PerformanceLevel::High;
        // 15m is base 2
        assert_eq!(manager.calculate_lod_level(15.0, ContentImportance::Background, high), LodLevel::Low);
        assert_eq!(manager.calculate_lod_level(15.0, ContentImportance::Normal, high), LodLevel::Medium);
        assert_eq!(manager.calculate_lod_level(15.0, ContentImportance::Critical, high), LodLevel::Ultra);
        // Background far away cannot go below Minimal
        assert_eq!(manager.calculate_lod_level(100.0, ContentImportance::Background, high), LodLevel::Minimal);
    }

    #[test]
    fn test_level_always_in_range() {
        let manager = LodManager::new();
        let distances = [0.0, 0.5, 4.9, 5.0, 7.5, 10.0, 19.9, 20.0, 39.9, 40.0, 1e6, f32::INFINITY];
        for &d in &distances {
            for importance in ALL_IMPORTANCE {
                for perf in ALL_PERFORMANCE {
                    let level = manager.calculate_lod_level(d, importance, perf);
                    assert!(level.ordinal() <= 4);
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_distance() {
        let manager = LodManager::new();
        let distances = [0.0, 4.99, 5.0, 9.99, 10.0, 19.99, 20.0, 39.99, 40.0, 80.0];
        for importance in ALL_IMPORTANCE {
            for perf in ALL_PERFORMANCE {
                let levels: Vec<LodLevel> = distances
                    .iter()
                    .map(|&d| manager.calculate_lod_level(d, importance, perf))
                    .collect();
                assert!(levels.windows(2).all(|w| w[0] >= w[1]), "{:?} {:?}: {:?}", importance, perf, levels);
            }
        }
    }

    #[test]
    fn test_override_and_reset() {
        let mut manager = LodManager::new();
        manager.set_max_lod_level(LodLevel::Low);
        assert_eq!(manager.lod_level(1.0, ContentImportance::Critical), LodLevel::Low);
        assert_eq!(manager.effective_ceiling(), LodLevel::Low);

        manager.reset_max_lod_level();
        assert_eq!(manager.lod_level(1.0, ContentImportance::Critical), LodLevel::Ultra);
    }

    #[test]
    fn test_reduce_memory_footprint() {
        let mut manager = LodManager::new();
        manager.reduce_memory_footprint();
        assert_eq!(manager.max_lod_override(), Some(LodLevel::Medium));

        // Does not raise a lower ceiling
        manager.set_max_lod_level(LodLevel::Minimal);
        manager.reduce_memory_footprint();
        assert_eq!(manager.max_lod_override(), Some(LodLevel::Minimal));
    }

    #[test]
    fn test_performance_level_caps() {
        let mut manager = LodManager::new();
        manager.update_performance_level(PerformanceLevel::Medium);
        assert_eq!(manager.lod_level(0.0, ContentImportance::Critical), LodLevel::High);
        manager.update_performance_level(PerformanceLevel::Low);
        assert_eq!(manager.lod_level(0.0, ContentImportance::Critical), LodLevel::Medium);
    }

    #[test]
    fn test_decimation_counts() {
        let mesh = line_mesh(10);
        let counts: Vec<usize> = LOD_REDUCTION_FACTORS
            .iter()
            .map(|&f| decimate(&mesh, f).vertex_count())
            .collect();
        assert_eq!(counts, vec![10, 8, 6, 4, 2]);

        // Stride 5 keeps vertices 0 and 5
        let coarse = decimate(&mesh, 0.2);
        assert_eq!(coarse.vertices, vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(coarse.faces, mesh.faces);
    }

    #[test]
    fn test_decimate_empty_mesh() {
        let mesh = Mesh::default();
        assert_eq!(decimate(&mesh, 0.4).vertex_count(), 0);
    }

    #[test]
    fn test_generate_lod_meshes() {
        let manager = LodManager::new();
        let lod_meshes = manager.generate_lod_meshes(&[line_mesh(100), line_mesh(5)]);

        assert_eq!(lod_meshes.len(), 2);
        let first = &lod_meshes[0];
        assert_eq!(first.variants.len(), 5);
        assert_eq!(first.switch_distances, [5.0, 10.0, 20.0, 40.0]);
        assert_eq!(first.mesh_for_level(LodLevel::Ultra).vertex_count(), 100);
        assert_eq!(first.mesh_for_level(LodLevel::Minimal).vertex_count(), 20);
        assert_eq!(lod_meshes[1].original.vertex_count(), 5);
    }
}
