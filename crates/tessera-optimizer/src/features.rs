//! Tier-gated rendering features.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tessera_platform::DeviceTier;

/// A rendering feature the device may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    SceneReconstruction,
    HighQualityLighting,
    AdvancedShaders,
    RealTimeReflections,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::SceneReconstruction,
        Feature::HighQualityLighting,
        Feature::AdvancedShaders,
        Feature::RealTimeReflections,
    ];

    /// Lowest device tier the feature runs on
    pub fn min_tier(&self) -> DeviceTier {
        match self {
            Feature::SceneReconstruction | Feature::AdvancedShaders => DeviceTier::Standard,
            Feature::HighQualityLighting => DeviceTier::Performance,
            Feature::RealTimeReflections => DeviceTier::Flagship,
        }
    }

    /// Whether the feature stays on in fallback mode
    pub fn survives_fallback(&self) -> bool {
        matches!(self, Feature::SceneReconstruction)
    }

    /// Snake-case name
    pub fn name(&self) -> &'static str {
        match self {
            Feature::SceneReconstruction => "scene_reconstruction",
            Feature::HighQualityLighting => "high_quality_lighting",
            Feature::AdvancedShaders => "advanced_shaders",
            Feature::RealTimeReflections => "real_time_reflections",
        }
    }

    fn flag(&self) -> FeatureSet {
        match self {
            Feature::SceneReconstruction => FeatureSet::SCENE_RECONSTRUCTION,
            Feature::HighQualityLighting => FeatureSet::HIGH_QUALITY_LIGHTING,
            Feature::AdvancedShaders => FeatureSet::ADVANCED_SHADERS,
            Feature::RealTimeReflections => FeatureSet::REAL_TIME_REFLECTIONS,
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of supported features
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FeatureSet: u8 {
        const SCENE_RECONSTRUCTION = 0b0001;
        const HIGH_QUALITY_LIGHTING = 0b0010;
        const ADVANCED_SHADERS = 0b0100;
        const REAL_TIME_REFLECTIONS = 0b1000;
    }
}

impl FeatureSet {
    /// Features available on `tier`, reduced to the fallback set if requested
    pub fn for_tier(tier: DeviceTier, fallback: bool) -> Self {
        Feature::ALL
            .iter()
            .filter(|feature| tier.ordinal() >= feature.min_tier().ordinal())
            .filter(|feature| !fallback || feature.survives_fallback())
            .fold(FeatureSet::empty(), |set, feature| set | feature.flag())
    }

    /// Whether `feature` is in the set
    pub fn supports(&self, feature: Feature) -> bool {
        self.contains(feature.flag())
    }

    /// Features in the set, in declaration order
    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.supports(*f))
    }
}
