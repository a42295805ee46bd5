//! A single acquisition of a tile

use crate::error::{Error, Result};
use crate::raster::{Mask, Raster};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One time-stamped acquisition: named bands, masks and scalars.
///
/// All grid layers of a frame share one shape, fixed by the first layer
/// inserted.
#[derive(Debug, Clone)]
pub struct Frame {
    timestamp: DateTime<Utc>,
    shape: Option<(usize, usize)>,
    bands: BTreeMap<String, Raster<f64>>,
    masks: BTreeMap<String, Mask>,
    scalars: BTreeMap<String, f64>,
}

impl Frame {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            shape: None,
            bands: BTreeMap::new(),
            masks: BTreeMap::new(),
            scalars: BTreeMap::new(),
        }
    }

    /// Acquisition time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Grid shape, `None` until a band or mask is inserted
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    /// Fix the grid shape of a frame that has no layers yet
    pub(crate) fn pin_shape(&mut self, shape: (usize, usize)) {
        if self.shape.is_none() {
            self.shape = Some(shape);
        }
    }

    fn claim_shape(&mut self, shape: (usize, usize)) -> Result<()> {
        match self.shape {
            Some(expected) if expected != shape => Err(Error::size_mismatch(expected, shape)),
            Some(_) => Ok(()),
            None => {
                self.shape = Some(shape);
                Ok(())
            }
        }
    }

    // Bands

    /// Insert or replace a band
    pub fn insert_band(&mut self, name: impl Into<String>, band: Raster<f64>) -> Result<()> {
        self.claim_shape(band.shape())?;
        self.bands.insert(name.into(), band);
        Ok(())
    }

    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands.get(name).ok_or_else(|| Error::MissingLayer {
            kind: "band",
            name: name.to_string(),
        })
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    // Masks

    /// Insert or replace a mask
    pub fn insert_mask(&mut self, name: impl Into<String>, mask: Mask) -> Result<()> {
        self.claim_shape(mask.shape())?;
        self.masks.insert(name.into(), mask);
        Ok(())
    }

    pub fn mask(&self, name: &str) -> Result<&Mask> {
        self.masks.get(name).ok_or_else(|| Error::MissingLayer {
            kind: "mask",
            name: name.to_string(),
        })
    }

    pub fn mask_names(&self) -> impl Iterator<Item = &str> {
        self.masks.keys().map(String::as_str)
    }

    // Scalars

    pub fn set_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.scalars.insert(name.into(), value);
    }

    pub fn scalar(&self, name: &str) -> Result<f64> {
        self.scalars.get(name).copied().ok_or_else(|| Error::MissingLayer {
            kind: "scalar",
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frame() -> Frame {
        Frame::new(Utc.with_ymd_and_hms(2019, 6, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_layers_share_shape() {
        let mut f = frame();
        assert_eq!(f.shape(), None);
        f.insert_band("B03", Raster::new(3, 4)).unwrap();
        assert_eq!(f.shape(), Some((3, 4)));
        f.insert_mask("CLM", Mask::new(3, 4)).unwrap();

        let err = f.insert_mask("IS_DATA", Mask::new(4, 4)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { er: 3, ec: 4, ar: 4, ac: 4 }));
    }

    #[test]
    fn test_missing_layers() {
        let mut f = frame();
        f.set_scalar("COVERAGE", 0.1);
        assert_eq!(f.scalar("COVERAGE").unwrap(), 0.1);
        assert!(matches!(f.band("B08"), Err(Error::MissingLayer { kind: "band", .. })));
        assert!(matches!(f.mask("CLM"), Err(Error::MissingLayer { kind: "mask", .. })));
        assert!(f.scalar("WATER_LEVEL").is_err());
    }
}
