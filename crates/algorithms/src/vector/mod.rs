//! Vector-to-raster helpers
//!
//! - Rasterize: burn polygons into a mask aligned with an imagery grid
//! - Polygonize: turn OSM-style way rings into polygons

mod polygonize;
mod rasterize;

pub use polygonize::{polygonize, PolygonizeMode};
pub use rasterize::{rasterize_layer, rasterize_polygons, GridSpec};
