//! Polygon rasterization
//!
//! A pixel belongs to the output mask when its centre lies strictly inside
//! one of the polygons (holes excluded).

use crate::maybe_rayon::*;
use geo::{BoundingRect, Contains, Point, Polygon};
use hydromon_core::crs::ensure_compatible;
use hydromon_core::raster::{GeoTransform, Mask, Raster, RasterElement};
use hydromon_core::temporal::FrameStack;
use hydromon_core::vector::VectorLayer;
use hydromon_core::{Error, Result, CRS};
use ndarray::Array2;

/// Target grid for rasterization
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

impl GridSpec {
    /// Grid of an existing raster
    pub fn of_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        Self {
            rows: raster.rows(),
            cols: raster.cols(),
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
        }
    }

    /// Grid shared by all frames of a stack
    pub fn of_stack(stack: &FrameStack) -> Self {
        let (rows, cols) = stack.shape();
        Self {
            rows,
            cols,
            transform: *stack.transform(),
            crs: stack.crs().cloned(),
        }
    }
}

/// Burn polygons into a mask on `grid`.
///
/// The polygons are assumed to be in the grid's CRS.
pub fn rasterize_polygons(polygons: &[Polygon<f64>], grid: &GridSpec) -> Result<Mask> {
    let (rows, cols) = (grid.rows, grid.cols);
    let transform = grid.transform;

    // Pixel windows of each polygon's bounding box, clamped to the grid
    let windows: Vec<(&Polygon<f64>, (usize, usize, usize, usize))> = polygons
        .iter()
        .filter_map(|poly| {
            let rect = poly.bounding_rect()?;
            pixel_window(&transform, rect.min(), rect.max(), rows, cols).map(|w| (poly, w))
        })
        .collect();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (poly, (row0, row1, col0, col1)) in &windows {
                if row < *row0 || row > *row1 {
                    continue;
                }
                for (col, inside) in row_data.iter_mut().enumerate().take(col1 + 1).skip(*col0) {
                    if *inside {
                        continue;
                    }
                    let (x, y) = transform.pixel_to_geo(col, row);
                    *inside = poly.contains(&Point::new(x, y));
                }
            }
            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    let mut mask = Mask::from_array(array);
    mask.set_transform(transform);
    mask.set_crs(grid.crs.clone());
    Ok(mask)
}

/// Burn a vector layer's polygons into a mask on `grid`.
///
/// Fails with `CrsMismatch` if the layer and the grid both declare a CRS
/// and they differ.
pub fn rasterize_layer(layer: &VectorLayer, grid: &GridSpec) -> Result<Mask> {
    ensure_compatible(layer.crs.as_ref(), grid.crs.as_ref())?;
    rasterize_polygons(&layer.polygons, grid)
}

/// Inclusive (row0, row1, col0, col1) window covering a bounding box
fn pixel_window(
    transform: &GeoTransform,
    min: geo::Coord<f64>,
    max: geo::Coord<f64>,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize, usize, usize)> {
    if rows == 0 || cols == 0 {
        return None;
    }
    let corners = [
        transform.geo_to_pixel(min.x, min.y),
        transform.geo_to_pixel(min.x, max.y),
        transform.geo_to_pixel(max.x, min.y),
        transform.geo_to_pixel(max.x, max.y),
    ];
    if corners.iter().any(|(c, r)| c.is_nan() || r.is_nan()) {
        return None;
    }
    let (c_lo, c_hi, r_lo, r_hi) = corners.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(c_lo, c_hi, r_lo, r_hi), &(c, r)| (c_lo.min(c), c_hi.max(c), r_lo.min(r), r_hi.max(r)),
    );
    if c_hi < 0.0 || r_hi < 0.0 || c_lo >= cols as f64 || r_lo >= rows as f64 {
        return None;
    }
    let clamp = |v: f64, n: usize| (v.floor().max(0.0) as usize).min(n - 1);
    Some((clamp(r_lo, rows), clamp(r_hi, rows), clamp(c_lo, cols), clamp(c_hi, cols)))
}
