//! Time-ordered stack of frames over one tile

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Mask};
use crate::temporal::{Frame, ScalarSeries};
use std::collections::BTreeMap;

/// All acquisitions of one tile, in non-decreasing timestamp order.
///
/// Every frame layer and every timeless mask has the stack's grid shape.
#[derive(Debug, Clone)]
pub struct FrameStack {
    shape: (usize, usize),
    transform: GeoTransform,
    crs: Option<CRS>,
    frames: Vec<Frame>,
    timeless_masks: BTreeMap<String, Mask>,
}

impl FrameStack {
    /// Empty stack over a `rows` x `cols` grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            shape: (rows, cols),
            transform: GeoTransform::default(),
            crs: None,
            frames: Vec::new(),
            timeless_masks: BTreeMap::new(),
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    // Frames

    /// Append a frame.
    ///
    /// Fails with `SizeMismatch` if the frame grid differs from the stack
    /// grid and with `UnorderedTimestamps` if the frame is older than the
    /// last one.
    pub fn push(&mut self, mut frame: Frame) -> Result<()> {
        if let Some(shape) = frame.shape() {
            if shape != self.shape {
                return Err(Error::size_mismatch(self.shape, shape));
            }
        }
        if let Some(last) = self.frames.last() {
            if frame.timestamp() < last.timestamp() {
                return Err(Error::UnorderedTimestamps {
                    previous: last.timestamp().to_rfc3339(),
                    next: frame.timestamp().to_rfc3339(),
                });
            }
        }
        frame.pin_shape(self.shape);
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Mutable access for stages that add layers to every frame
    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn timestamps(&self) -> Vec<chrono::DateTime<chrono::Utc>> {
        self.frames.iter().map(Frame::timestamp).collect()
    }

    /// Keep only frames for which `keep` returns true, preserving order
    pub fn retain<F: FnMut(&Frame) -> bool>(&mut self, keep: F) {
        self.frames.retain(keep);
    }

    /// Collect a named scalar from every frame
    pub fn scalar_series(&self, name: &str) -> Result<ScalarSeries> {
        let mut series = ScalarSeries::new(name);
        for frame in &self.frames {
            series.push(frame.timestamp(), frame.scalar(name)?);
        }
        Ok(series)
    }

    // Timeless masks

    /// Insert or replace a mask shared by all frames
    pub fn insert_timeless_mask(&mut self, name: impl Into<String>, mask: Mask) -> Result<()> {
        mask.ensure_shape(self.shape)?;
        self.timeless_masks.insert(name.into(), mask);
        Ok(())
    }

    pub fn timeless_mask(&self, name: &str) -> Result<&Mask> {
        self.timeless_masks.get(name).ok_or_else(|| Error::MissingLayer {
            kind: "timeless mask",
            name: name.to_string(),
        })
    }
}
