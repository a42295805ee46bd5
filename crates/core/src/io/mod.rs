//! I/O for rasters, masks, frame-stack manifests and GeoJSON layers

pub mod geojson;
pub mod manifest;
mod native;

pub use geojson::{read_geojson, read_geojson_str};
pub use manifest::{load_stack, FrameEntry, StackManifest};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_mask, write_geotiff, write_geotiff_to_buffer,
    write_mask, GeoTiffOptions,
};
