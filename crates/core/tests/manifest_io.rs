//! Loading frame stacks from manifests and GeoTIFFs on disk.

use chrono::{TimeZone, Utc};
use hydromon_core::io::{load_stack, read_mask, write_geotiff, write_mask, FrameEntry, StackManifest};
use hydromon_core::{Error, GeoTransform, Mask, Raster, CRS};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn band(rows: usize, cols: usize, value: u16) -> Raster<u16> {
    let mut r = Raster::filled(rows, cols, value);
    r.set_transform(GeoTransform::new(440_000.0, 5_090_000.0, 10.0, -10.0));
    r
}

fn write_frame(dir: &Path, tag: &str, shape: (usize, usize), cloudy: bool) -> FrameEntry {
    let green = dir.join(format!("{tag}_B03.tif"));
    let nir = dir.join(format!("{tag}_B08.tif"));
    let clm = dir.join(format!("{tag}_CLM.tif"));
    write_geotiff(&band(shape.0, shape.1, 1200), &green, None).unwrap();
    write_geotiff(&band(shape.0, shape.1, 400), &nir, None).unwrap();
    write_mask(&Mask::filled(shape.0, shape.1, cloudy), &clm).unwrap();

    let day: u32 = tag.parse().unwrap();
    FrameEntry {
        timestamp: Utc.with_ymd_and_hms(2019, 5, day, 10, 0, 0).unwrap(),
        bands: BTreeMap::from([
            ("B03".to_string(), PathBuf::from(format!("{tag}_B03.tif"))),
            ("B08".to_string(), PathBuf::from(format!("{tag}_B08.tif"))),
        ]),
        masks: BTreeMap::from([("CLM".to_string(), PathBuf::from(format!("{tag}_CLM.tif")))]),
    }
}

fn write_manifest(dir: &Path, manifest: &StackManifest) -> PathBuf {
    let path = dir.join("stack.json");
    fs::write(&path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
    path
}

#[test]
fn loads_frames_in_order_with_scaling() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();

    let mut nominal = Mask::new(4, 5);
    nominal.set(1, 1, true).unwrap();
    write_mask(&nominal, dir.join("nominal.tif")).unwrap();

    let manifest = StackManifest {
        crs: Some("EPSG:32633".to_string()),
        band_scale: Some(0.0001),
        frames: vec![
            write_frame(dir, "01", (4, 5), false),
            write_frame(dir, "11", (4, 5), true),
        ],
        timeless_masks: BTreeMap::from([("NOMINAL_WATER".to_string(), PathBuf::from("nominal.tif"))]),
    };
    let stack = load_stack(write_manifest(dir, &manifest)).unwrap();

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.shape(), (4, 5));
    assert_eq!(stack.crs(), Some(&CRS::from_epsg(32633)));
    assert_eq!(stack.transform().origin_x, 440_000.0);

    let first = stack.frame(0).unwrap();
    assert!((first.band("B03").unwrap().get(0, 0).unwrap() - 0.12).abs() < 1e-6);
    assert_eq!(first.mask("CLM").unwrap().count_true(), 0);
    assert_eq!(stack.frame(1).unwrap().mask("CLM").unwrap().count_true(), 20);
    assert_eq!(stack.timeless_mask("NOMINAL_WATER").unwrap().count_true(), 1);
}

#[test]
fn rejects_unordered_frames() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let manifest = StackManifest {
        frames: vec![
            write_frame(dir, "20", (3, 3), false),
            write_frame(dir, "02", (3, 3), false),
        ],
        ..Default::default()
    };
    let err = load_stack(write_manifest(dir, &manifest)).unwrap_err();
    assert!(matches!(err, Error::UnorderedTimestamps { .. }));
}

#[test]
fn rejects_mismatched_grids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let manifest = StackManifest {
        frames: vec![
            write_frame(dir, "01", (3, 3), false),
            write_frame(dir, "02", (3, 4), false),
        ],
        ..Default::default()
    };
    let err = load_stack(write_manifest(dir, &manifest)).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { .. }));
}

#[test]
fn mask_roundtrip_through_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mask.tif");
    let mask = Mask::from_vec(vec![true, false, false, true, true, false], 2, 3).unwrap();
    write_mask(&mask, &path).unwrap();
    let back = read_mask(&path).unwrap();
    assert_eq!(back.data(), mask.data());
}

fn write_epsg_band(dir: &Path, file: &str, epsg: u32) -> PathBuf {
    let mut r = band(3, 3, 900);
    r.set_crs(Some(CRS::from_epsg(epsg)));
    write_geotiff(&r, dir.join(file), None).unwrap();
    PathBuf::from(file)
}

fn single_band_frame(day: u32, path: PathBuf) -> FrameEntry {
    FrameEntry {
        timestamp: Utc.with_ymd_and_hms(2019, 5, day, 10, 0, 0).unwrap(),
        bands: BTreeMap::from([("B03".to_string(), path)]),
        masks: BTreeMap::new(),
    }
}

#[test]
fn keeps_file_crs_without_manifest_crs() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let manifest = StackManifest {
        frames: vec![
            single_band_frame(1, write_epsg_band(dir, "a.tif", 32633)),
            single_band_frame(2, write_epsg_band(dir, "b.tif", 32633)),
        ],
        ..Default::default()
    };
    let stack = load_stack(write_manifest(dir, &manifest)).unwrap();
    assert_eq!(stack.crs(), Some(&CRS::from_epsg(32633)));
    let band = stack.frame(1).unwrap().band("B03").unwrap();
    assert_eq!(band.crs(), Some(&CRS::from_epsg(32633)));
}

#[test]
fn rejects_frames_in_different_crs() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let manifest = StackManifest {
        frames: vec![
            single_band_frame(1, write_epsg_band(dir, "a.tif", 32633)),
            single_band_frame(2, write_epsg_band(dir, "b.tif", 32634)),
        ],
        ..Default::default()
    };
    let err = load_stack(write_manifest(dir, &manifest)).unwrap_err();
    assert!(matches!(err, Error::CrsMismatch(_, _)));

    // a declared CRS overrides what the files say
    let manifest = StackManifest {
        crs: Some("EPSG:32635".to_string()),
        ..manifest
    };
    let stack = load_stack(write_manifest(dir, &manifest)).unwrap();
    assert_eq!(stack.crs(), Some(&CRS::from_epsg(32635)));
}
