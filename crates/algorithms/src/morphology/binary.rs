//! Binary dilation and erosion
//!
//! Cells outside the grid count as `false`, so erosion eats into regions
//! touching the border and dilation never grows from outside.

use crate::maybe_rayon::*;
use hydromon_core::raster::Mask;
use hydromon_core::{Algorithm, Error, Result};
use ndarray::Array2;

use super::element::StructuringElement;

/// Parameters for binary morphology
#[derive(Debug, Clone, Default)]
pub struct MorphologyParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Mask;
    type Output = Mask;
    type Params = MorphologyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation (true if any cell under the structuring element is true)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Mask;
    type Output = Mask;
    type Params = MorphologyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Binary erosion (true only if every cell under the structuring element is true)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// `true` where any cell under the element is `true`
pub fn dilate(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    apply(mask, element, false)
}

/// `true` where every cell under the element is `true`
pub fn erode(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    apply(mask, element, true)
}

/// Erosion when `require_all`, dilation otherwise
fn apply(mask: &Mask, element: &StructuringElement, require_all: bool) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();
    let data = mask.data();

    let output: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut cells = offsets.iter().map(|&(dr, dc)| {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
                        false
                    } else {
                        data[(r as usize, c as usize)]
                    }
                });
                *out = if require_all {
                    cells.all(|v| v)
                } else {
                    cells.any(|v| v)
                };
            }
            row_data
        })
        .collect();

    let mut result = Mask::from_array(
        Array2::from_shape_vec((rows, cols), output).map_err(|e| Error::Other(e.to_string()))?,
    );
    result.set_transform(*mask.transform());
    result.set_crs(mask.crs().cloned());
    Ok(result)
}
