//! Minimal GeoJSON reader for polygon and line-string layers

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::VectorLayer;
use geo_types::{Coord, LineString, Polygon};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read Polygon, MultiPolygon, LineString and MultiLineString geometries
/// from a GeoJSON file (FeatureCollection, Feature or bare geometry).
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<VectorLayer> {
    let text = fs::read_to_string(path)?;
    read_geojson_str(&text)
}

/// Same as [`read_geojson`] on an in-memory document
pub fn read_geojson_str(text: &str) -> Result<VectorLayer> {
    let root: Value = serde_json::from_str(text)?;
    let mut layer = VectorLayer::new().with_crs(Some(declared_crs(&root)?));
    collect(&root, &mut layer)?;
    Ok(layer)
}

fn collect(value: &Value, layer: &mut VectorLayer) -> Result<()> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            for feature in array(value, "features")? {
                collect(feature, layer)?;
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry").filter(|g| !g.is_null()) {
                collect(geometry, layer)?;
            }
        }
        Some("GeometryCollection") => {
            for geometry in array(value, "geometries")? {
                collect(geometry, layer)?;
            }
        }
        Some("Polygon") => layer.push_polygon(polygon(coordinates(value)?)?),
        Some("MultiPolygon") => {
            for rings in as_array(coordinates(value)?)? {
                layer.push_polygon(polygon(rings)?);
            }
        }
        Some("LineString") => layer.push_line(line_string(coordinates(value)?)?),
        Some("MultiLineString") => {
            for line in as_array(coordinates(value)?)? {
                layer.push_line(line_string(line)?);
            }
        }
        // Points carry no area and are skipped
        Some("Point") | Some("MultiPoint") => {}
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "GeoJSON object type {}",
                other.unwrap_or("<missing>")
            )))
        }
    }
    Ok(())
}

/// CRS of a GeoJSON document.
///
/// Without a `crs` member coordinates are WGS84 lon/lat (RFC 7946). The
/// legacy member `{"type": "name", "properties": {"name": "EPSG:32633"}}`
/// overrides that; a name that names no EPSG code is rejected.
fn declared_crs(root: &Value) -> Result<CRS> {
    let Some(member) = root.get("crs").filter(|c| !c.is_null()) else {
        return Ok(CRS::wgs84());
    };
    let name = member
        .pointer("/properties/name")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("`crs` without properties.name".to_string()))?;
    if name.ends_with("CRS84") {
        return Ok(CRS::wgs84());
    }
    name.rsplit(':')
        .next()
        .and_then(|code| code.parse::<u32>().ok())
        .map(CRS::from_epsg)
        .ok_or_else(|| Error::UnsupportedDataType(format!("GeoJSON CRS {}", name)))
}

fn array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    value
        .get(key)
        .ok_or_else(|| malformed(format!("missing `{}`", key)))
        .and_then(as_array)
}

fn coordinates(value: &Value) -> Result<&Value> {
    value
        .get("coordinates")
        .ok_or_else(|| malformed("missing `coordinates`".to_string()))
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| malformed("expected an array".to_string()))
}

fn polygon(rings: &Value) -> Result<Polygon<f64>> {
    let mut rings = as_array(rings)?.iter().map(line_string);
    let exterior = rings
        .next()
        .ok_or_else(|| malformed("polygon without rings".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn line_string(positions: &Value) -> Result<LineString<f64>> {
    as_array(positions)?
        .iter()
        .map(|position| {
            let xy = as_array(position)?;
            match (xy.first().and_then(Value::as_f64), xy.get(1).and_then(Value::as_f64)) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(malformed("position must hold two numbers".to_string())),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn malformed(reason: String) -> Error {
    Error::Other(format!("Malformed GeoJSON: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32633" } },
            "features": [
                { "type": "Feature", "properties": {}, "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                        [[2, 2], [4, 2], [4, 4], [2, 2]]
                    ]
                }},
                { "type": "Feature", "properties": {}, "geometry": {
                    "type": "LineString", "coordinates": [[0, 0], [5, 5]]
                }},
                { "type": "Feature", "properties": {}, "geometry": null }
            ]
        }"#;
        let layer = read_geojson_str(text).unwrap();
        assert_eq!(layer.polygons.len(), 1);
        assert_eq!(layer.polygons[0].interiors().len(), 1);
        assert_eq!(layer.lines.len(), 1);
        assert_eq!(layer.crs, Some(CRS::from_epsg(32633)));
    }

    #[test]
    fn test_bare_multipolygon_defaults_to_wgs84() {
        let text = r#"{ "type": "MultiPolygon", "coordinates": [
            [[[0, 0], [1, 0], [1, 1], [0, 0]]],
            [[[5, 5], [6, 5], [6, 6], [5, 5]]]
        ]}"#;
        let layer = read_geojson_str(text).unwrap();
        assert_eq!(layer.polygons.len(), 2);
        assert_eq!(layer.crs, Some(CRS::wgs84()));
    }

    #[test]
    fn test_crs84_and_unknown_crs_names() {
        let crs84 = r#"{ "type": "Polygon",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] }"#;
        assert_eq!(read_geojson_str(crs84).unwrap().crs, Some(CRS::wgs84()));

        let unknown = r#"{ "type": "Polygon",
            "crs": { "type": "name", "properties": { "name": "local-grid" } },
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] }"#;
        assert!(matches!(
            read_geojson_str(unknown),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_malformed_position() {
        let text = r#"{ "type": "LineString", "coordinates": [[0, "a"]] }"#;
        assert!(read_geojson_str(text).is_err());
        assert!(read_geojson_str(r#"{ "type": "Circle" }"#).is_err());
    }
}
