//! Water detection and water-level extraction
//!
//! For each frame the water index (usually NDWI) is thresholded with Otsu,
//! the resulting water mask is clipped to the nominal extent of the water
//! body, and the share of the nominal extent covered by water is reported
//! as the water level of that acquisition.

use crate::classification::{otsu_threshold, OtsuParams};
use chrono::{DateTime, Utc};
use hydromon_core::raster::{Mask, Raster};
use hydromon_core::temporal::{FrameStack, ScalarSeries};
use hydromon_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Layer and scalar names written by [`detect_water_levels`]
pub const WATER_MASK: &str = "WATER_MASK";
pub const WATER_LEVEL: &str = "WATER_LEVEL";
pub const WATER_THRESHOLD: &str = "WATER_THRESHOLD";

/// Parameters for water detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterDetectionParams {
    /// Value substituted for NaN index pixels, below any water threshold
    /// (default: -1.0)
    pub nan_fill: f64,
    /// Threshold used when the frame holds a single distinct value
    /// (default: 1.0, so nothing is water)
    pub default_threshold: f64,
    /// Histogram bins for Otsu (default: 256)
    pub nbins: usize,
}

impl Default for WaterDetectionParams {
    fn default() -> Self {
        Self {
            nan_fill: -1.0,
            default_threshold: 1.0,
            nbins: 256,
        }
    }
}

/// Water mask of one frame and the threshold that produced it
#[derive(Debug, Clone)]
pub struct WaterDetection {
    pub mask: Mask,
    pub threshold: f64,
}

/// Classify water pixels of an index raster.
///
/// NaN pixels are replaced by `nan_fill`. If the filled grid holds more
/// than one distinct value the threshold is the Otsu threshold, otherwise
/// `default_threshold`. A pixel is water iff `index > threshold`.
pub fn detect_water(index: &Raster<f64>, params: &WaterDetectionParams) -> Result<WaterDetection> {
    let filled: Vec<f64> = index
        .data()
        .iter()
        .map(|&v| if v.is_nan() { params.nan_fill } else { v })
        .collect();

    let threshold = match otsu_threshold(&filled, OtsuParams { nbins: params.nbins })? {
        Some(t) => t,
        None => params.default_threshold,
    };

    let (rows, cols) = index.shape();
    let water: Vec<bool> = filled.iter().map(|&v| v > threshold).collect();
    let mask = Mask::from_vec(water, rows, cols)?.with_meta_of(index);

    Ok(WaterDetection { mask, threshold })
}

/// `count(water AND nominal) / count(nominal)`
///
/// Fails with `EmptyNominalExtent` if the nominal extent has no pixels and
/// with `SizeMismatch` if the grids differ.
pub fn water_level(water: &Mask, nominal: &Mask) -> Result<f64> {
    let overlap = water.and(nominal)?;
    let nominal_count = nominal.count_true();
    if nominal_count == 0 {
        return Err(Error::EmptyNominalExtent);
    }
    Ok(overlap.count_true() as f64 / nominal_count as f64)
}

/// Per-frame results of water detection over a stack
#[derive(Debug, Clone, Default, Serialize)]
pub struct WaterLevelSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub levels: Vec<f64>,
    pub thresholds: Vec<f64>,
}

impl WaterLevelSeries {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Water levels as a scalar series
    pub fn levels(&self) -> ScalarSeries {
        ScalarSeries {
            name: WATER_LEVEL.to_string(),
            timestamps: self.timestamps.clone(),
            values: self.levels.clone(),
        }
    }
}

/// Run water detection on every frame of a stack.
///
/// Reads band `index_name` of each frame and timeless mask `nominal_name`,
/// writes the clipped water mask as `WATER_MASK` and scalars `WATER_LEVEL`
/// and `WATER_THRESHOLD` into each frame. An empty stack yields an empty
/// series; an empty nominal extent is an error even then.
pub fn detect_water_levels(
    stack: &mut FrameStack,
    index_name: &str,
    nominal_name: &str,
    params: &WaterDetectionParams,
) -> Result<WaterLevelSeries> {
    let nominal = stack.timeless_mask(nominal_name)?.clone();
    detect_water_levels_in(stack, index_name, &nominal, params)
}

/// [`detect_water_levels`] against an extent held outside the stack
pub fn detect_water_levels_in(
    stack: &mut FrameStack,
    index_name: &str,
    nominal: &Mask,
    params: &WaterDetectionParams,
) -> Result<WaterLevelSeries> {
    nominal.ensure_shape(stack.shape())?;
    if nominal.count_true() == 0 {
        return Err(Error::EmptyNominalExtent);
    }

    let mut series = WaterLevelSeries::default();
    for frame in stack.frames_mut() {
        let detection = detect_water(frame.band(index_name)?, params)?;
        let level = water_level(&detection.mask, nominal)?;
        let clipped = detection.mask.and(nominal)?;

        debug!(
            timestamp = %frame.timestamp(),
            threshold = detection.threshold,
            level,
            "water detected"
        );

        frame.insert_mask(WATER_MASK, clipped)?;
        frame.set_scalar(WATER_LEVEL, level);
        frame.set_scalar(WATER_THRESHOLD, detection.threshold);

        series.timestamps.push(frame.timestamp());
        series.levels.push(level);
        series.thresholds.push(detection.threshold);
    }

    info!(frames = series.len(), "water levels extracted");
    Ok(series)
}

/// Water detection on one index raster, clipped to a nominal extent
#[derive(Debug, Clone, Default)]
pub struct WaterDetector;

impl Algorithm for WaterDetector {
    type Input = (Raster<f64>, Mask);
    type Output = (WaterDetection, f64);
    type Params = WaterDetectionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "WaterDetector"
    }

    fn description(&self) -> &'static str {
        "Otsu water classification of a water index, reduced to the water share of a nominal extent"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (index, nominal) = input;
        let mut detection = detect_water(&index, &params)?;
        let level = water_level(&detection.mask, &nominal)?;
        detection.mask = detection.mask.and(&nominal)?;
        Ok((detection, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hydromon_core::temporal::Frame;

    fn index(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        Raster::from_vec(values, rows, cols).unwrap()
    }

    #[test]
    fn test_constant_index_is_not_water() {
        let ndwi = index(vec![0.5; 4], 2, 2);
        let detection = detect_water(&ndwi, &WaterDetectionParams::default()).unwrap();
        assert_eq!(detection.threshold, 1.0);
        assert_eq!(detection.mask.count_true(), 0);
    }

    #[test]
    fn test_bimodal_frame() {
        // Left half water, right half land
        let values = vec![
            0.6, 0.55, -0.3, -0.35,
            0.62, 0.58, -0.32, -0.4,
            0.5, 0.61, -0.28, -0.33,
            0.57, 0.6, -0.31, -0.36,
        ];
        let detection = detect_water(&index(values, 4, 4), &WaterDetectionParams::default()).unwrap();
        assert!(detection.threshold > -0.28 && detection.threshold < 0.5);
        for row in 0..4 {
            assert!(detection.mask.get(row, 0).unwrap());
            assert!(detection.mask.get(row, 1).unwrap());
            assert!(!detection.mask.get(row, 2).unwrap());
            assert!(!detection.mask.get(row, 3).unwrap());
        }
    }

    #[test]
    fn test_nan_pixels_are_never_water() {
        let values = vec![f64::NAN, 0.4, 0.45, -0.2];
        let detection = detect_water(&index(values, 2, 2), &WaterDetectionParams::default()).unwrap();
        assert!(!detection.mask.get(0, 0).unwrap());
        assert!(detection.mask.get(0, 1).unwrap());
    }

    #[test]
    fn test_all_nan_frame_uses_default_threshold() {
        let detection =
            detect_water(&index(vec![f64::NAN; 9], 3, 3), &WaterDetectionParams::default()).unwrap();
        assert_eq!(detection.threshold, 1.0);
        assert_eq!(detection.mask.count_true(), 0);
    }

    #[test]
    fn test_full_nominal_extent_ratio() {
        let n = 3;
        let water = Mask::from_vec(
            vec![true, true, false, false, true, false, false, false, false],
            n,
            n,
        )
        .unwrap();
        let nominal = Mask::filled(n, n, true);
        let level = water_level(&water, &nominal).unwrap();
        assert_eq!(level, water.count_true() as f64 / (n * n) as f64);
    }

    #[test]
    fn test_water_outside_extent_is_ignored() {
        let water = Mask::filled(2, 2, true);
        let nominal = Mask::from_vec(vec![true, false, false, false], 2, 2).unwrap();
        assert_eq!(water_level(&water, &nominal).unwrap(), 1.0);
    }

    #[test]
    fn test_water_level_errors() {
        let water = Mask::filled(2, 2, true);
        assert!(matches!(
            water_level(&water, &Mask::new(2, 2)),
            Err(Error::EmptyNominalExtent)
        ));
        assert!(matches!(
            water_level(&water, &Mask::filled(3, 3, true)),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_detector_algorithm() {
        let ndwi = index(vec![0.7, 0.65, -0.4, -0.5], 2, 2);
        let nominal = Mask::from_vec(vec![true, false, true, true], 2, 2).unwrap();
        let (detection, level) = WaterDetector
            .execute_default((ndwi, nominal))
            .unwrap();
        assert_eq!(detection.mask.count_true(), 1);
        assert!((level - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_stack_levels() {
        let mut stack = FrameStack::new(2, 2);
        stack
            .insert_timeless_mask("NOMINAL_WATER", Mask::filled(2, 2, true))
            .unwrap();
        for (day, values) in [(1, vec![0.6, 0.6, -0.3, -0.3]), (2, vec![0.6, -0.3, -0.3, -0.3])] {
            let mut frame = Frame::new(Utc.with_ymd_and_hms(2019, 4, day, 0, 0, 0).unwrap());
            frame.insert_band("NDWI", index(values, 2, 2)).unwrap();
            stack.push(frame).unwrap();
        }

        let series =
            detect_water_levels(&mut stack, "NDWI", "NOMINAL_WATER", &Default::default()).unwrap();
        assert_eq!(series.levels, vec![0.5, 0.25]);
        assert_eq!(stack.frame(1).unwrap().scalar(WATER_LEVEL).unwrap(), 0.25);
        assert_eq!(stack.frame(0).unwrap().mask(WATER_MASK).unwrap().count_true(), 2);
        assert_eq!(series.levels().len(), 2);
    }

    #[test]
    fn test_stack_rejects_empty_extent() {
        let mut stack = FrameStack::new(2, 2);
        stack.insert_timeless_mask("NOMINAL_WATER", Mask::new(2, 2)).unwrap();
        let err = detect_water_levels(&mut stack, "NDWI", "NOMINAL_WATER", &Default::default())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyNominalExtent));
    }
}
