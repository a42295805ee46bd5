//! Temporal composites
//!
//! Reduces one band over all frames of a stack to a single raster, using
//! only pixels valid under a per-frame mask. Typical use is a cloud-free
//! median image of the tile for display or for drawing the nominal extent.

use crate::maybe_rayon::*;
use hydromon_core::raster::{Mask, Raster};
use hydromon_core::temporal::FrameStack;
use hydromon_core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-pixel reduction over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMethod {
    #[default]
    Median,
    Mean,
    Max,
}

impl FromStr for CompositeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "median" => Ok(CompositeMethod::Median),
            "mean" => Ok(CompositeMethod::Mean),
            "max" => Ok(CompositeMethod::Max),
            _ => Err(Error::InvalidParameter {
                name: "method",
                value: s.to_string(),
                reason: "expected median, mean or max".to_string(),
            }),
        }
    }
}

/// Parameters for temporal compositing
#[derive(Debug, Clone, Default)]
pub struct CompositeParams {
    pub method: CompositeMethod,
    /// Per-frame mask selecting usable pixels; all pixels when `None`
    pub valid_mask: Option<String>,
}

/// Composite band `band` over every frame of the stack.
///
/// Pixels that are NaN or invalid in every frame come out as NaN. An empty
/// stack yields an all-NaN raster on the stack grid.
pub fn composite(stack: &FrameStack, band: &str, params: &CompositeParams) -> Result<Raster<f64>> {
    let (rows, cols) = stack.shape();

    let layers = stack
        .frames()
        .iter()
        .map(|frame| {
            let values = frame.band(band)?;
            let valid = match &params.valid_mask {
                Some(name) => Some(frame.mask(name)?),
                None => None,
            };
            Ok((values, valid))
        })
        .collect::<Result<Vec<(&Raster<f64>, Option<&Mask>)>>>()?;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut samples = Vec::with_capacity(layers.len());
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                samples.clear();
                for (values, valid) in &layers {
                    if let Some(mask) = valid {
                        if !mask.data()[(row, col)] {
                            continue;
                        }
                    }
                    let v = values.data()[(row, col)];
                    if !v.is_nan() {
                        samples.push(v);
                    }
                }
                *out = reduce(&mut samples, params.method);
            }
            row_data
        })
        .collect();

    let mut output = Raster::from_array(
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?,
    );
    output.set_transform(*stack.transform());
    output.set_crs(stack.crs().cloned());
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

fn reduce(samples: &mut [f64], method: CompositeMethod) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    match method {
        CompositeMethod::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
        CompositeMethod::Max => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        CompositeMethod::Median => {
            samples.sort_by(|a, b| a.total_cmp(b));
            let n = samples.len();
            if n % 2 == 0 {
                (samples[n / 2 - 1] + samples[n / 2]) / 2.0
            } else {
                samples[n / 2]
            }
        }
    }
}
