//! Vector layers consumed by the raster pipeline
//!
//! Nominal water extents arrive as polygons (a reservoir outline) and OSM
//! exports as way line strings. Both are kept as `geo-types` geometries
//! together with the CRS they were declared in.

use crate::crs::CRS;
use geo_types::{LineString, Polygon};

/// Polygons and line strings read from one vector source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorLayer {
    pub polygons: Vec<Polygon<f64>>,
    pub lines: Vec<LineString<f64>>,
    /// Declared CRS; `None` when the source does not name one
    pub crs: Option<CRS>,
}

impl VectorLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn push_polygon(&mut self, polygon: Polygon<f64>) {
        self.polygons.push(polygon);
    }

    pub fn push_line(&mut self, line: LineString<f64>) {
        self.lines.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_layer_accumulates() {
        let mut layer = VectorLayer::new().with_crs(Some(CRS::wgs84()));
        assert!(layer.is_empty());
        layer.push_polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(!layer.is_empty());
        assert_eq!(layer.polygons.len(), 1);
    }
}
