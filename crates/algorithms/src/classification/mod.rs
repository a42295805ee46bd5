//! Automatic threshold selection
//!
//! - Otsu: histogram threshold maximising between-class variance

mod otsu;

pub use otsu::{otsu_threshold, otsu_threshold_raster, OtsuParams, MAX_NBINS};
