//! Spectral water and vegetation indices
//!
//! All indices operate on single-band rasters (one band per raster).

use crate::maybe_rayon::*;
use hydromon_core::raster::Raster;
use hydromon_core::temporal::FrameStack;
use hydromon_core::{Error, Result};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Normalized difference indices supported by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Normalized Difference Water Index (McFeeters)
    NDWI,
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Modified NDWI (Xu, uses SWIR)
    MNDWI,
}

impl SpectralIndex {
    /// Default Sentinel-2 L1C band pair `(a, b)` for `(a - b) / (a + b)`
    pub fn default_bands(&self) -> (&'static str, &'static str) {
        match self {
            SpectralIndex::NDWI => ("B03", "B08"),
            SpectralIndex::NDVI => ("B08", "B04"),
            SpectralIndex::MNDWI => ("B03", "B11"),
        }
    }

    /// Layer name used when the index is stored in a frame
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::NDWI => "NDWI",
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::MNDWI => "MNDWI",
        }
    }

    /// Compute the index from its two bands
    pub fn compute(&self, band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
        normalized_difference(band_a, band_b)
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ndwi" => Ok(SpectralIndex::NDWI),
            "ndvi" => Ok(SpectralIndex::NDVI),
            "mndwi" => Ok(SpectralIndex::MNDWI),
            _ => Err(Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected ndwi, ndvi or mndwi".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative reflectances. Pixels
/// where the bands sum to zero, or where either band is nodata, are NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_b.ensure_shape(band_a.shape())?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Modified Normalized Difference Water Index (Xu, 2006)
///
/// `MNDWI = (Green - SWIR) / (Green + SWIR)`
pub fn mndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir)
}

// ---------------------------------------------------------------------------
// Stack operation
// ---------------------------------------------------------------------------

/// Compute `(band_a - band_b) / (band_a + band_b)` for every frame and store
/// it as band `output`.
///
/// Fails on the first frame missing either input band.
pub fn add_normalized_difference(
    stack: &mut FrameStack,
    band_a: &str,
    band_b: &str,
    output: &str,
) -> Result<()> {
    for frame in stack.frames_mut() {
        let index = normalized_difference(frame.band(band_a)?, frame.band(band_b)?)?;
        debug!(timestamp = %frame.timestamp(), output, "normalized difference");
        frame.insert_band(output, index)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use hydromon_core::temporal::Frame;
    use hydromon_core::GeoTransform;

    fn band(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndwi_water_and_land() {
        // Water: green > nir, land: nir > green
        let green = band(vec![0.10, 0.05, 0.08, 0.30], 2, 2);
        let nir = band(vec![0.02, 0.30, 0.08, 0.10], 2, 2);
        let result = ndwi(&green, &nir).unwrap();

        assert_relative_eq!(result.get(0, 0).unwrap(), 0.08 / 0.12, epsilon = 1e-12);
        assert!(result.get(0, 1).unwrap() < 0.0);
        assert_relative_eq!(result.get(1, 0).unwrap(), 0.0);
        assert_relative_eq!(result.get(1, 1).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_sum_is_nan() {
        let a = band(vec![0.0, 0.2], 1, 2);
        let b = band(vec![0.0, 0.2], 1, 2);
        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert_eq!(result.get(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_nodata_propagates() {
        let mut a = band(vec![-9999.0, 0.4], 1, 2);
        a.set_nodata(Some(-9999.0));
        let b = band(vec![0.1, f64::NAN], 1, 2);
        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert!(result.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_values_within_unit_interval() {
        let n = 16;
        let a: Vec<f64> = (0..n * n).map(|i| (i % 7) as f64 * 0.05).collect();
        let b: Vec<f64> = (0..n * n).map(|i| (i % 5) as f64 * 0.07).collect();
        let result = normalized_difference(&band(a, n, n), &band(b, n, n)).unwrap();
        for &v in result.data().iter().filter(|v| !v.is_nan()) {
            assert!((-1.0..=1.0).contains(&v), "index {} outside [-1, 1]", v);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a: Raster<f64> = Raster::new(10, 10);
        let b: Raster<f64> = Raster::new(5, 5);
        assert!(matches!(ndvi(&a, &b), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_index_names() {
        assert_eq!("NDWI".parse::<SpectralIndex>().unwrap(), SpectralIndex::NDWI);
        assert_eq!(SpectralIndex::NDVI.default_bands(), ("B08", "B04"));
        assert_eq!(SpectralIndex::MNDWI.to_string(), "MNDWI");
        assert!("evi".parse::<SpectralIndex>().is_err());
    }

    #[test]
    fn test_stack_operation() {
        let mut stack = FrameStack::new(1, 2);
        let mut frame = Frame::new(Utc.with_ymd_and_hms(2018, 7, 1, 0, 0, 0).unwrap());
        frame.insert_band("B03", band(vec![0.3, 0.1], 1, 2)).unwrap();
        frame.insert_band("B08", band(vec![0.1, 0.3], 1, 2)).unwrap();
        stack.push(frame).unwrap();

        add_normalized_difference(&mut stack, "B03", "B08", "NDWI").unwrap();
        let index = stack.frame(0).unwrap().band("NDWI").unwrap();
        assert_relative_eq!(index.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(index.get(0, 1).unwrap(), -0.5, epsilon = 1e-12);

        let err = add_normalized_difference(&mut stack, "B03", "B04", "NDVI").unwrap_err();
        assert!(matches!(err, Error::MissingLayer { .. }));
    }
}
