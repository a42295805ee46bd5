//! Surface water algorithms
//!
//! - Water detection: adaptive Otsu threshold on a water index
//! - Water level: share of the nominal extent classified as water

mod water;

pub use water::{
    detect_water, detect_water_levels, detect_water_levels_in, water_level, WaterDetection,
    WaterDetectionParams, WaterDetector, WaterLevelSeries, WATER_LEVEL, WATER_MASK,
    WATER_THRESHOLD,
};
