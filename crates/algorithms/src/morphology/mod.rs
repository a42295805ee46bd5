//! Binary morphology on masks
//!
//! - **Dilation**: grows `true` regions (buffers a nominal extent)
//! - **Erosion**: shrinks `true` regions (trims shoreline pixels)

mod binary;
mod element;

pub use binary::{dilate, erode, Dilate, Erode, MorphologyParams};
pub use element::StructuringElement;
