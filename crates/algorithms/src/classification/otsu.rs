//! Otsu threshold (Otsu, 1979)
//!
//! Values are binned into `nbins` equal-width bins between their minimum and
//! maximum. For every split between bin `i` and `i + 1` the between-class
//! variance `w0 * w1 * (mu0 - mu1)^2` is evaluated; the threshold is the
//! centre of the bin ending the lower class at the maximum.

use hydromon_core::raster::Raster;
use hydromon_core::{Error, Result};

/// Largest accepted histogram size
pub const MAX_NBINS: usize = 65_536;

/// Parameters for Otsu thresholding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuParams {
    /// Number of histogram bins (default: 256)
    pub nbins: usize,
}

impl Default for OtsuParams {
    fn default() -> Self {
        Self { nbins: 256 }
    }
}

/// Otsu threshold over the finite values of `values`.
///
/// Returns `Ok(None)` when there are no finite values or when they all
/// share one value, since no split exists. `nbins` must lie in
/// `2..=MAX_NBINS`.
pub fn otsu_threshold(values: &[f64], params: OtsuParams) -> Result<Option<f64>> {
    let nbins = params.nbins;
    if !(2..=MAX_NBINS).contains(&nbins) {
        return Err(Error::InvalidParameter {
            name: "nbins",
            value: nbins.to_string(),
            reason: format!("Otsu needs between 2 and {} histogram bins", MAX_NBINS),
        });
    }

    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(min < max) {
        return Ok(None);
    }

    let width = (max - min) / nbins as f64;
    let mut hist = vec![0usize; nbins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let bin = (((v - min) / width) as usize).min(nbins - 1);
        hist[bin] += 1;
    }
    let centers: Vec<f64> = (0..nbins).map(|i| min + (i as f64 + 0.5) * width).collect();

    // Class weights and sums from the low end (inclusive of bin i)...
    let mut weight_low = Vec::with_capacity(nbins);
    let mut sum_low = Vec::with_capacity(nbins);
    let (mut w, mut s) = (0.0, 0.0);
    for (count, center) in hist.iter().zip(&centers) {
        w += *count as f64;
        s += *count as f64 * center;
        weight_low.push(w);
        sum_low.push(s);
    }
    let (total_weight, total_sum) = (w, s);

    // ...and the upper class starting at bin i + 1
    let mut best = (f64::NEG_INFINITY, 0);
    for i in 0..nbins - 1 {
        let w0 = weight_low[i];
        let w1 = total_weight - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }
        let mu0 = sum_low[i] / w0;
        let mu1 = (total_sum - sum_low[i]) / w1;
        let variance = w0 * w1 * (mu0 - mu1) * (mu0 - mu1);
        if variance > best.0 {
            best = (variance, i);
        }
    }

    Ok(Some(centers[best.1]))
}

/// Otsu threshold over a raster's non-nodata cells
pub fn otsu_threshold_raster(raster: &Raster<f64>, params: OtsuParams) -> Result<Option<f64>> {
    let nodata = raster.nodata();
    let values: Vec<f64> = raster
        .data()
        .iter()
        .copied()
        .filter(|v| !v.is_nan() && Some(*v) != nodata)
        .collect();
    otsu_threshold(&values, params)
}
