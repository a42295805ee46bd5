//! Imagery analysis algorithms
//!
//! - Spectral indices: normalized difference, NDWI, NDVI, MNDWI
//! - Valid-data masks from data-presence and cloud masks

mod indices;
mod valid_data;

pub use indices::{
    add_normalized_difference, mndwi, ndvi, ndwi, normalized_difference, SpectralIndex,
};
pub use valid_data::{add_valid_data_mask, valid_data_mask};
