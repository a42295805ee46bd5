//! JSON manifests describing a frame stack on disk
//!
//! A manifest lists, per acquisition, the GeoTIFF files holding its bands
//! and masks. Paths are resolved relative to the manifest file.
//!
//! ```json
//! {
//!   "crs": "EPSG:32633",
//!   "band_scale": 0.0001,
//!   "frames": [
//!     {
//!       "timestamp": "2019-01-05T10:04:21Z",
//!       "bands": { "B03": "2019-01-05/B03.tif", "B08": "2019-01-05/B08.tif" },
//!       "masks": { "IS_DATA": "2019-01-05/dataMask.tif", "CLM": "2019-01-05/CLM.tif" }
//!     }
//!   ],
//!   "timeless_masks": { "NOMINAL_WATER": "nominal.tif" }
//! }
//! ```

use crate::crs::{ensure_compatible, CRS};
use crate::error::{Error, Result};
use crate::io::native::{read_geotiff, read_mask};
use crate::raster::{GeoTransform, Raster};
use crate::temporal::{Frame, FrameStack};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk description of a frame stack
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackManifest {
    /// CRS of every raster, e.g. `EPSG:32633`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Multiplier applied to band values on load (digital numbers to reflectance)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_scale: Option<f64>,
    pub frames: Vec<FrameEntry>,
    #[serde(default)]
    pub timeless_masks: BTreeMap<String, PathBuf>,
}

/// One acquisition in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bands: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub masks: BTreeMap<String, PathBuf>,
}

impl StackManifest {
    /// Parse a manifest from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load every raster the manifest names into a [`FrameStack`].
    ///
    /// The grid (shape, transform and CRS) comes from the first raster
    /// read; every other raster must match its shape. A manifest `crs`
    /// overrides the CRS stored in the files. Without one, each raster keeps
    /// its own CRS and a raster disagreeing with the first fails with
    /// `CrsMismatch`.
    pub fn load(&self, base_dir: &Path) -> Result<FrameStack> {
        let declared = self.crs.as_deref().map(str::parse::<CRS>).transpose()?;
        let scale = self.band_scale.unwrap_or(1.0);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidParameter {
                name: "band_scale",
                value: scale.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }

        let mut stack: Option<FrameStack> = None;

        for entry in &self.frames {
            let mut frame = Frame::new(entry.timestamp);

            for (name, rel) in &entry.bands {
                let mut band: Raster<f64> = read_geotiff(base_dir.join(rel))?;
                if scale != 1.0 {
                    let nodata = band.nodata();
                    band = band.map(|v| if v.is_nan() || Some(v) == nodata { f64::NAN } else { v * scale });
                    band.set_nodata(Some(f64::NAN));
                }
                if declared.is_some() {
                    band.set_crs(declared.clone());
                }
                let stack = stack.get_or_insert_with(|| {
                    grid_from(band.shape(), band.transform(), band.crs())
                });
                check_grid(stack, band.shape(), band.crs())?;
                frame.insert_band(name.clone(), band)?;
            }

            for (name, rel) in &entry.masks {
                let mut mask = read_mask(base_dir.join(rel))?;
                if declared.is_some() {
                    mask.set_crs(declared.clone());
                }
                let stack = stack.get_or_insert_with(|| {
                    grid_from(mask.shape(), mask.transform(), mask.crs())
                });
                check_grid(stack, mask.shape(), mask.crs())?;
                frame.insert_mask(name.clone(), mask)?;
            }

            let stack = stack.as_mut().ok_or_else(|| Error::InvalidParameter {
                name: "frames",
                value: entry.timestamp.to_rfc3339(),
                reason: "frame lists no bands or masks".to_string(),
            })?;
            debug!(timestamp = %entry.timestamp, "loaded frame");
            stack.push(frame)?;
        }

        let mut stack = stack.ok_or_else(|| Error::InvalidParameter {
            name: "frames",
            value: "[]".to_string(),
            reason: "manifest lists no frames".to_string(),
        })?;

        for (name, rel) in &self.timeless_masks {
            let mut mask = read_mask(base_dir.join(rel))?;
            if declared.is_some() {
                mask.set_crs(declared.clone());
            }
            check_grid(&stack, mask.shape(), mask.crs())?;
            stack.insert_timeless_mask(name.clone(), mask)?;
        }

        info!(
            frames = stack.len(),
            rows = stack.shape().0,
            cols = stack.shape().1,
            crs = stack.crs().map(CRS::identifier),
            "frame stack loaded"
        );
        Ok(stack)
    }
}

fn grid_from(shape: (usize, usize), transform: &GeoTransform, crs: Option<&CRS>) -> FrameStack {
    FrameStack::new(shape.0, shape.1)
        .with_transform(*transform)
        .with_crs(crs.cloned())
}

fn check_grid(stack: &FrameStack, shape: (usize, usize), crs: Option<&CRS>) -> Result<()> {
    if shape != stack.shape() {
        return Err(Error::size_mismatch(stack.shape(), shape));
    }
    ensure_compatible(stack.crs(), crs)
}

/// Read a manifest file and load its stack, resolving paths next to it
pub fn load_stack<P: AsRef<Path>>(path: P) -> Result<FrameStack> {
    let path = path.as_ref();
    let manifest = StackManifest::from_path(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.load(base_dir)
}
