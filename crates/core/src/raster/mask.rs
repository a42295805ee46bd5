//! Boolean masks aligned with a raster grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::{Array2, ArrayView2, Zip};

/// A georeferenced boolean grid.
///
/// Data-presence, cloud, valid-data, water and nominal-extent layers are
/// all masks. Binary combinations require identical shapes and fail with
/// [`Error::SizeMismatch`] otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl Mask {
    /// All-false mask
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, false)
    }

    /// Mask with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: bool) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    pub fn from_array(data: Array2<bool>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Create a mask from row-major data
    pub fn from_vec(data: Vec<bool>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Nonzero, non-nodata cells become `true`
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let nodata = raster.nodata();
        Self {
            data: raster
                .data()
                .mapv(|v| !v.is_nodata(nodata) && v != T::zero()),
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
        }
    }

    /// Encode as a 0/1 byte raster
    pub fn to_raster(&self) -> Raster<u8> {
        let mut raster = Raster::from_array(self.data.mapv(u8::from));
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster
    }

    /// Copy georeferencing from another grid
    pub fn with_meta_of<T: RasterElement>(mut self, raster: &Raster<T>) -> Self {
        self.transform = *raster.transform();
        self.crs = raster.crs().cloned();
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with `SizeMismatch` unless this mask has the given shape
    pub fn ensure_shape(&self, expected: (usize, usize)) -> Result<()> {
        if self.shape() != expected {
            return Err(Error::size_mismatch(expected, self.shape()));
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<bool> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<bool> {
        &mut self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    // Reductions

    /// Number of `true` cells
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Share of `true` cells in [0, 1]; 0.0 for an empty mask
    pub fn true_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.count_true() as f64 / self.len() as f64
    }

    // Logical combinations

    /// Cell-wise logical NOT
    pub fn not(&self) -> Mask {
        self.map(|v| !v)
    }

    /// Cell-wise `self AND other`
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.zip_with(other, |a, b| a && b)
    }

    /// Cell-wise `self OR other`
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        self.zip_with(other, |a, b| a || b)
    }

    /// Cell-wise `self AND NOT other`
    pub fn and_not(&self, other: &Mask) -> Result<Mask> {
        self.zip_with(other, |a, b| a && !b)
    }

    fn map<F: Fn(bool) -> bool>(&self, f: F) -> Mask {
        Mask {
            data: self.data.mapv(f),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    fn zip_with<F>(&self, other: &Mask, f: F) -> Result<Mask>
    where
        F: Fn(bool, bool) -> bool,
    {
        other.ensure_shape(self.shape())?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| f(a, b));
        Ok(Mask {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }
}
