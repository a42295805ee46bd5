//! # hydromon algorithms
//!
//! Water-level extraction from multi-temporal satellite imagery.
//!
//! ## Algorithm Categories
//!
//! - **imagery**: Spectral indices (NDWI, NDVI, MNDWI), valid-data masks
//! - **temporal**: Coverage filtering of frames, temporal composites
//! - **classification**: Otsu thresholding
//! - **hydrology**: Water detection and water level per frame
//! - **vector**: Polygon rasterization, way polygonization
//! - **morphology**: Binary dilation and erosion of masks
//! - **pipeline**: The end-to-end [`pipeline::WaterMonitor`]

pub mod classification;
pub mod hydrology;
pub mod imagery;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod pipeline;
pub mod temporal;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{otsu_threshold, OtsuParams};
    pub use crate::hydrology::{
        detect_water, detect_water_levels, water_level, WaterDetection, WaterDetectionParams,
        WaterDetector, WaterLevelSeries,
    };
    pub use crate::imagery::{
        add_normalized_difference, add_valid_data_mask, mndwi, ndvi, ndwi,
        normalized_difference, valid_data_mask, SpectralIndex,
    };
    pub use crate::morphology::{dilate, erode, StructuringElement};
    pub use crate::pipeline::{WaterMonitor, WaterMonitorConfig, WaterReport};
    pub use crate::temporal::{
        composite, coverage_filter, invalid_fraction, CompositeMethod, CompositeParams,
    };
    pub use crate::vector::{polygonize, rasterize_layer, rasterize_polygons, GridSpec};
    pub use hydromon_core::prelude::*;
}
