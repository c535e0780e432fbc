//! Occlusion Culling
//!
//! Hides virtual elements that sit behind scanned furniture, using one
//! segment/box slab test per occluder. Walls and floors bound the room but
//! never occlude.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tessera_core::{Aabb, PerformanceLevel, RoomGeometry, Segment, Vec3, VirtualElement};

/// Element count above which culling fans out over the rayon pool
pub const PARALLEL_CULL_THRESHOLD: usize = 256;

/// How much work a visibility query does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullingMode {
    /// Room bounds plus a ray test against every occluder
    RayTest,
    /// Room bounds plus a view-distance radius, no occluder tests
    DistanceOnly,
    /// Everything passes
    Disabled,
}

impl CullingMode {
    /// Mode used at a given performance level
    pub fn for_level(level: PerformanceLevel) -> Self {
        match level {
            PerformanceLevel::High | PerformanceLevel::Medium => CullingMode::RayTest,
            PerformanceLevel::Low => CullingMode::DistanceOnly,
        }
    }
}

/// Occluder boxes extracted from one room scan
#[derive(Debug, Clone, Default)]
struct OccluderSet {
    room_bounds: Aabb,
    occluders: Vec<Aabb>,
}

impl OccluderSet {
    fn from_geometry(geometry: &RoomGeometry) -> Self {
        let occluders = geometry
            .furniture
            .iter()
            .map(|mesh| mesh.bounding_box())
            .filter(|aabb| !aabb.is_empty())
            .collect();

        Self {
            room_bounds: geometry.bounding_box,
            occluders,
        }
    }

    fn contains(&self, point: Vec3) -> bool {
        // An empty scan carries no bounds to test against
        self.room_bounds.is_empty() || self.room_bounds.contains_point(point)
    }
}

/// Visibility tests against the current room scan.
///
/// Cloning is cheap; the occluder list is shared.
#[derive(Debug, Clone)]
pub struct OcclusionCuller {
    geometry: Option<Arc<OccluderSet>>,
    mode: CullingMode,
    disabled: bool,
    view_distance: f32,
}

impl OcclusionCuller {
    /// Create a culler with no geometry; everything is visible until a scan arrives
    pub fn new(view_distance: f32) -> Self {
        Self {
            geometry: None,
            mode: CullingMode::RayTest,
            disabled: false,
            view_distance,
        }
    }

    /// Replace the room scan
    pub fn update_room_geometry(&mut self, geometry: &RoomGeometry) {
        let set = OccluderSet::from_geometry(geometry);
        log::debug!(
            "Room geometry updated: {} occluder(s) from {} mesh(es)",
            set.occluders.len(),
            geometry.mesh_count()
        );
        self.geometry = Some(Arc::new(set));
    }

    /// Whether a room scan has been supplied
    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    /// Number of furniture occluders
    pub fn occluder_count(&self) -> usize {
        self.geometry.as_ref().map_or(0, |g| g.occluders.len())
    }

    /// Current mode
    pub fn mode(&self) -> CullingMode {
        self.mode
    }

    /// Pick the mode for a performance level; ignored once disabled
    pub fn update_culling_level(&mut self, level: PerformanceLevel) {
        if !self.disabled {
            self.mode = CullingMode::for_level(level);
        }
    }

    /// Turn culling off for good
    pub fn disable(&mut self) {
        self.disabled = true;
        self.mode = CullingMode::Disabled;
    }

    /// Whether `point` can be seen from `viewer` in the current mode
    pub fn is_visible(&self, point: Vec3, viewer: Vec3) -> bool {
        self.is_visible_with(self.mode, point, viewer)
    }

    /// Whether `point` can be seen from `viewer` in `mode`, ignoring the stored mode
    pub fn is_visible_with(&self, mode: CullingMode, point: Vec3, viewer: Vec3) -> bool {
        if mode == CullingMode::Disabled {
            return true;
        }
        let Some(geometry) = self.geometry.as_deref() else {
            return true;
        };
        if !geometry.contains(point) {
            return false;
        }

        match mode {
            CullingMode::RayTest => {
                let segment = Segment::new(viewer, point);
                !geometry.occluders.iter().any(|occluder| segment.is_blocked_by(occluder))
            }
            CullingMode::DistanceOnly => point.distance(viewer) <= self.view_distance,
            CullingMode::Disabled => true,
        }
    }

    /// Keep the elements visible from `viewer`, preserving input order
    pub fn cull_elements(&self, elements: &[VirtualElement], viewer: Vec3) -> Vec<VirtualElement> {
        self.cull_elements_with(self.mode, elements, viewer)
    }

    /// Same as [`cull_elements`](Self::cull_elements) in an explicit mode
    pub fn cull_elements_with(&self, mode: CullingMode, elements: &[VirtualElement], viewer: Vec3) -> Vec<VirtualElement> {
        if elements.len() > PARALLEL_CULL_THRESHOLD {
            elements
                .par_iter()
                .filter(|e| self.is_visible_with(mode, e.position, viewer))
                .copied()
                .collect()
        } else {
            elements
                .iter()
                .filter(|e| self.is_visible_with(mode, e.position, viewer))
                .copied()
                .collect()
        }
    }
}

impl Default for OcclusionCuller {
    fn default() -> Self {
        Self::new(15.0)
    }
}
