//! Frame-stack operations across time
//!
//! - Coverage: invalid-data fraction per frame and frame filtering
//! - Composite: per-pixel reduction of a band over valid frames

mod composite;
mod coverage;

pub use composite::{composite, CompositeMethod, CompositeParams};
pub use coverage::{
    cloud_coverage_in_extent, coverage_filter, filter_frames, invalid_fraction, FramePredicate,
    ValidDataCoverage, COVERAGE,
};
