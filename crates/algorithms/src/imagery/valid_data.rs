//! Valid-data masks
//!
//! A pixel is valid when the provider delivered data for it and the cloud
//! detector did not flag it.

use hydromon_core::raster::Mask;
use hydromon_core::temporal::FrameStack;
use hydromon_core::Result;
use tracing::debug;

/// `is_data AND NOT cloud`
///
/// Fails with `SizeMismatch` when the masks differ in shape.
pub fn valid_data_mask(is_data: &Mask, cloud: &Mask) -> Result<Mask> {
    is_data.and_not(cloud)
}

/// Derive the valid-data mask for every frame and store it as `output`.
///
/// Only the `output` mask of each frame is written.
pub fn add_valid_data_mask(
    stack: &mut FrameStack,
    is_data: &str,
    cloud: &str,
    output: &str,
) -> Result<()> {
    for frame in stack.frames_mut() {
        let valid = valid_data_mask(frame.mask(is_data)?, frame.mask(cloud)?)?;
        debug!(
            timestamp = %frame.timestamp(),
            valid_fraction = valid.true_fraction(),
            "valid data mask"
        );
        frame.insert_mask(output, valid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hydromon_core::temporal::Frame;
    use hydromon_core::Error;

    fn mask(values: &[bool]) -> Mask {
        Mask::from_vec(values.to_vec(), 2, 2).unwrap()
    }

    #[test]
    fn test_truth_table() {
        let is_data = mask(&[true, true, false, false]);
        let cloud = mask(&[false, true, false, true]);
        let valid = valid_data_mask(&is_data, &cloud).unwrap();
        assert_eq!(valid, mask(&[true, false, false, false]));
    }

    #[test]
    fn test_shape_mismatch() {
        let is_data = Mask::filled(2, 2, true);
        let cloud = Mask::new(3, 2);
        assert!(matches!(
            valid_data_mask(&is_data, &cloud),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_stack_leaves_inputs_untouched() {
        let mut stack = FrameStack::new(2, 2);
        let mut frame = Frame::new(Utc.with_ymd_and_hms(2017, 9, 2, 0, 0, 0).unwrap());
        frame.insert_mask("IS_DATA", mask(&[true, true, true, false])).unwrap();
        frame.insert_mask("CLM", mask(&[true, false, false, false])).unwrap();
        stack.push(frame).unwrap();

        add_valid_data_mask(&mut stack, "IS_DATA", "CLM", "VALID_DATA").unwrap();

        let frame = stack.frame(0).unwrap();
        assert_eq!(frame.mask("VALID_DATA").unwrap(), &mask(&[false, true, true, false]));
        assert_eq!(frame.mask("CLM").unwrap(), &mask(&[true, false, false, false]));
        assert_eq!(frame.mask_names().count(), 3);
    }
}
