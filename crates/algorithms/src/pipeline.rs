//! End-to-end water-level extraction
//!
//! [`WaterMonitor`] chains the per-frame stages on a loaded stack:
//! water index, valid-data mask, coverage filter, water detection. The
//! result is a [`WaterReport`] with one row per kept acquisition.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use hydromon_core::temporal::FrameStack;
use hydromon_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classification::MAX_NBINS;
use crate::hydrology::{detect_water_levels_in, WaterDetectionParams};
use crate::imagery::{add_normalized_difference, add_valid_data_mask};
use crate::morphology::{dilate, StructuringElement};
use crate::temporal::{cloud_coverage_in_extent, coverage_filter, COVERAGE};

/// Scalar name holding each kept frame's cloud share inside the nominal extent
pub const CLOUD_COVERAGE: &str = "CLOUD_COVERAGE";

/// Layer names and thresholds for [`WaterMonitor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterMonitorConfig {
    /// Green band, first operand of the index (default: `B03`)
    pub green_band: String,
    /// Near-infrared band, second operand of the index (default: `B08`)
    pub nir_band: String,
    /// Data-presence mask (default: `IS_DATA`)
    pub is_data_mask: String,
    /// Cloud mask (default: `CLM`)
    pub cloud_mask: String,
    /// Name of the derived valid-data mask (default: `VALID_DATA`)
    pub valid_mask: String,
    /// Name of the derived index band (default: `NDWI`)
    pub index_band: String,
    /// Timeless nominal water extent (default: `NOMINAL_WATER`)
    pub nominal_mask: String,
    /// Frames with an invalid fraction at or above this are dropped
    /// (default: 0.05)
    pub coverage_threshold: f64,
    /// Grow the nominal extent by this many pixels before detection
    /// (default: 0)
    pub extent_dilation: usize,
    pub water: WaterDetectionParams,
}

impl Default for WaterMonitorConfig {
    fn default() -> Self {
        Self {
            green_band: "B03".to_string(),
            nir_band: "B08".to_string(),
            is_data_mask: "IS_DATA".to_string(),
            cloud_mask: "CLM".to_string(),
            valid_mask: "VALID_DATA".to_string(),
            index_band: "NDWI".to_string(),
            nominal_mask: "NOMINAL_WATER".to_string(),
            coverage_threshold: 0.05,
            extent_dilation: 0,
            water: WaterDetectionParams::default(),
        }
    }
}

impl WaterMonitorConfig {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(Error::InvalidParameter {
                name: "coverage_threshold",
                value: self.coverage_threshold.to_string(),
                reason: "coverage threshold must lie in [0, 1]".to_string(),
            });
        }
        if !(2..=MAX_NBINS).contains(&self.water.nbins) {
            return Err(Error::InvalidParameter {
                name: "nbins",
                value: self.water.nbins.to_string(),
                reason: format!("histogram bins must lie in 2..={}", MAX_NBINS),
            });
        }
        Ok(())
    }
}

/// Per-acquisition results of a [`WaterMonitor`] run, in frame order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaterReport {
    pub timestamps: Vec<DateTime<Utc>>,
    pub water_levels: Vec<f64>,
    pub thresholds: Vec<f64>,
    /// Invalid-data fraction of each kept frame
    pub coverage: Vec<f64>,
    /// Cloud share inside the nominal extent
    pub cloud_coverage: Vec<f64>,
    /// Frames removed by the coverage filter
    pub dropped: usize,
}

impl WaterReport {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Mean water level over kept frames, `None` when nothing was kept
    pub fn mean_level(&self) -> Option<f64> {
        if self.water_levels.is_empty() {
            return None;
        }
        Some(self.water_levels.iter().sum::<f64>() / self.water_levels.len() as f64)
    }

    /// Write one CSV row per frame with an RFC 3339 timestamp
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "timestamp,water_level,threshold,coverage,cloud_coverage")?;
        for i in 0..self.len() {
            writeln!(
                writer,
                "{},{},{},{},{}",
                self.timestamps[i].to_rfc3339_opts(SecondsFormat::Secs, true),
                self.water_levels[i],
                self.thresholds[i],
                self.coverage[i],
                self.cloud_coverage[i],
            )?;
        }
        Ok(())
    }
}

/// Water-level extraction over a frame stack
#[derive(Debug, Clone, Default)]
pub struct WaterMonitor {
    config: WaterMonitorConfig,
}

impl WaterMonitor {
    pub fn new(config: WaterMonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WaterMonitorConfig {
        &self.config
    }

    /// Run every stage on `stack`, leaving derived layers and scalars in the
    /// kept frames.
    ///
    /// With `extent_dilation > 0` detection runs against the dilated
    /// nominal extent, which replaces the stack's nominal mask once the run
    /// has succeeded. On error the nominal mask is left as it was.
    pub fn run(&self, stack: &mut FrameStack) -> Result<WaterReport> {
        let cfg = &self.config;

        let original = stack.timeless_mask(&cfg.nominal_mask)?;
        let nominal = if cfg.extent_dilation > 0 {
            let grown = dilate(original, &StructuringElement::Square(cfg.extent_dilation))?;
            debug!(
                before = original.count_true(),
                after = grown.count_true(),
                pixels = cfg.extent_dilation,
                "nominal extent dilated"
            );
            grown
        } else {
            original.clone()
        };

        add_normalized_difference(stack, &cfg.green_band, &cfg.nir_band, &cfg.index_band)?;
        add_valid_data_mask(stack, &cfg.is_data_mask, &cfg.cloud_mask, &cfg.valid_mask)?;
        let dropped = coverage_filter(stack, &cfg.valid_mask, cfg.coverage_threshold)?;
        let series = detect_water_levels_in(stack, &cfg.index_band, &nominal, &cfg.water)?;

        let mut report = WaterReport {
            timestamps: series.timestamps,
            water_levels: series.levels,
            thresholds: series.thresholds,
            dropped,
            ..WaterReport::default()
        };
        for frame in stack.frames_mut() {
            let cloudy = cloud_coverage_in_extent(frame.mask(&cfg.cloud_mask)?, &nominal)?;
            frame.set_scalar(CLOUD_COVERAGE, cloudy);
            report.coverage.push(frame.scalar(COVERAGE)?);
            report.cloud_coverage.push(cloudy);
        }

        if cfg.extent_dilation > 0 {
            stack.insert_timeless_mask(cfg.nominal_mask.clone(), nominal)?;
        }

        info!(
            kept = report.len(),
            dropped,
            mean_level = report.mean_level(),
            "water monitor finished"
        );
        Ok(report)
    }
}
