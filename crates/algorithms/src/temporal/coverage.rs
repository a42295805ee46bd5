//! Coverage-based frame filtering
//!
//! Frames mostly hidden by clouds or outside the swath carry little
//! information. They are dropped before water detection by comparing the
//! share of invalid pixels against a threshold.

use hydromon_core::raster::Mask;
use hydromon_core::temporal::{Frame, FrameStack};
use hydromon_core::{Error, Result};
use tracing::{info, warn};

/// Scalar name holding each kept frame's invalid fraction
pub const COVERAGE: &str = "COVERAGE";

/// `1 - count_true / total_pixels`; 1.0 for an empty mask
pub fn invalid_fraction(mask: &Mask) -> f64 {
    if mask.is_empty() {
        return 1.0;
    }
    1.0 - mask.count_true() as f64 / mask.len() as f64
}

/// Decides whether a frame stays in the stack.
///
/// Implemented for any `Fn(&Frame) -> Result<bool>` closure.
pub trait FramePredicate {
    fn keep(&self, frame: &Frame) -> Result<bool>;
}

impl<F> FramePredicate for F
where
    F: Fn(&Frame) -> Result<bool>,
{
    fn keep(&self, frame: &Frame) -> Result<bool> {
        self(frame)
    }
}

/// Keeps frames whose invalid fraction under `mask` is below `threshold`
#[derive(Debug, Clone)]
pub struct ValidDataCoverage {
    pub mask: String,
    pub threshold: f64,
}

impl ValidDataCoverage {
    pub fn new(mask: impl Into<String>, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: threshold.to_string(),
                reason: "coverage threshold must lie in [0, 1]".to_string(),
            });
        }
        Ok(Self {
            mask: mask.into(),
            threshold,
        })
    }
}

impl FramePredicate for ValidDataCoverage {
    fn keep(&self, frame: &Frame) -> Result<bool> {
        Ok(invalid_fraction(frame.mask(&self.mask)?) < self.threshold)
    }
}

/// Drop frames rejected by `predicate`, preserving the order of the rest.
///
/// The predicate is evaluated on every frame before anything is removed,
/// so an error leaves the stack untouched. Returns the number of frames
/// dropped.
pub fn filter_frames<P: FramePredicate + ?Sized>(stack: &mut FrameStack, predicate: &P) -> Result<usize> {
    let decisions = stack
        .frames()
        .iter()
        .map(|frame| predicate.keep(frame))
        .collect::<Result<Vec<bool>>>()?;

    let before = stack.len();
    let mut decisions = decisions.into_iter();
    stack.retain(|_| decisions.next().unwrap_or(false));
    Ok(before - stack.len())
}

/// Keep frames whose invalid fraction under `mask_name` is strictly below
/// `threshold` and record that fraction as scalar `COVERAGE`.
///
/// All-invalid frames are always dropped; all-valid frames are kept for any
/// threshold above 0. Filtering twice with the same threshold changes
/// nothing. An empty result is not an error.
pub fn coverage_filter(stack: &mut FrameStack, mask_name: &str, threshold: f64) -> Result<usize> {
    let predicate = ValidDataCoverage::new(mask_name, threshold)?;
    let dropped = filter_frames(stack, &predicate)?;

    for frame in stack.frames_mut() {
        let fraction = invalid_fraction(frame.mask(mask_name)?);
        frame.set_scalar(COVERAGE, fraction);
    }

    info!(kept = stack.len(), dropped, threshold, "coverage filter");
    if stack.is_empty() && dropped > 0 {
        warn!(threshold, "coverage filter removed every frame");
    }
    Ok(dropped)
}

/// Share of the extent's pixels flagged by `cloud`.
///
/// Fails with `EmptyNominalExtent` when the extent has no pixels.
pub fn cloud_coverage_in_extent(cloud: &Mask, extent: &Mask) -> Result<f64> {
    let cloudy = cloud.and(extent)?.count_true();
    let total = extent.count_true();
    if total == 0 {
        return Err(Error::EmptyNominalExtent);
    }
    Ok(cloudy as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stack_with_valid_counts(counts: &[usize]) -> FrameStack {
        // 2x5 grid, first `count` pixels valid
        let mut stack = FrameStack::new(2, 5);
        for (i, &count) in counts.iter().enumerate() {
            let values: Vec<bool> = (0..10).map(|p| p < count).collect();
            let mut frame =
                Frame::new(Utc.with_ymd_and_hms(2020, 1, 1 + i as u32, 0, 0, 0).unwrap());
            frame
                .insert_mask("VALID_DATA", Mask::from_vec(values, 2, 5).unwrap())
                .unwrap();
            stack.push(frame).unwrap();
        }
        stack
    }

    #[test]
    fn test_invalid_fraction_extremes() {
        assert_eq!(invalid_fraction(&Mask::filled(3, 3, true)), 0.0);
        assert_eq!(invalid_fraction(&Mask::filled(3, 3, false)), 1.0);
        assert_eq!(invalid_fraction(&Mask::from_vec(vec![true, false], 1, 2).unwrap()), 0.5);
    }

    #[test]
    fn test_filter_preserves_order() {
        let mut stack = stack_with_valid_counts(&[10, 2, 9, 0, 10]);
        let timestamps = stack.timestamps();

        let dropped = coverage_filter(&mut stack, "VALID_DATA", 0.15).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(stack.timestamps(), vec![timestamps[0], timestamps[2], timestamps[4]]);

        let coverage = stack.scalar_series(COVERAGE).unwrap();
        assert_eq!(coverage.values.len(), 3);
        assert!((coverage.values[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut stack = stack_with_valid_counts(&[10, 5, 8, 1, 7]);
        coverage_filter(&mut stack, "VALID_DATA", 0.35).unwrap();
        let once = stack.timestamps();
        let dropped = coverage_filter(&mut stack, "VALID_DATA", 0.35).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(stack.timestamps(), once);
    }

    #[test]
    fn test_all_invalid_always_dropped_all_valid_kept() {
        for threshold in [0.01, 0.5, 0.99, 1.0] {
            let mut stack = stack_with_valid_counts(&[0, 10]);
            coverage_filter(&mut stack, "VALID_DATA", threshold).unwrap();
            assert_eq!(stack.len(), 1, "threshold {}", threshold);
            assert_eq!(stack.frame(0).unwrap().scalar(COVERAGE).unwrap(), 0.0);
        }

        let mut stack = stack_with_valid_counts(&[10]);
        coverage_filter(&mut stack, "VALID_DATA", 0.0).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut stack = stack_with_valid_counts(&[10]);
        assert!(coverage_filter(&mut stack, "VALID_DATA", 1.5).is_err());
        assert!(coverage_filter(&mut stack, "VALID_DATA", -0.1).is_err());
    }

    #[test]
    fn test_missing_mask_leaves_stack_untouched() {
        let mut stack = stack_with_valid_counts(&[10, 0]);
        let err = coverage_filter(&mut stack, "CLM", 0.5).unwrap_err();
        assert!(matches!(err, Error::MissingLayer { .. }));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_closure_predicate() {
        let mut stack = stack_with_valid_counts(&[10, 4, 6]);
        let at_least_half = |frame: &Frame| -> Result<bool> {
            Ok(frame.mask("VALID_DATA")?.true_fraction() >= 0.5)
        };
        let dropped = filter_frames(&mut stack, &at_least_half).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_cloud_coverage_in_extent() {
        let cloud = Mask::from_vec(vec![true, true, false, false], 2, 2).unwrap();
        let extent = Mask::from_vec(vec![true, false, true, false], 2, 2).unwrap();
        assert_eq!(cloud_coverage_in_extent(&cloud, &extent).unwrap(), 0.5);
        assert!(matches!(
            cloud_coverage_in_extent(&cloud, &Mask::new(2, 2)),
            Err(Error::EmptyNominalExtent)
        ));
    }
}
