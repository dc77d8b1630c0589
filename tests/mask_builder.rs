mod common;

use frame_field_polygonizer::config::mask::MaskBuilderConfig;
use frame_field_polygonizer::geometry::{GeoTransform, GeomType};
use frame_field_polygonizer::mask::{build_masks, MaskOutputType, CSV_HEADER};
use frame_field_polygonizer::raster::{RasterDtype, RasterFile, RasterProfile};
use frame_field_polygonizer::vector::VectorSource;
use frame_field_polygonizer::writer::{DataWriter, RasterArray, RasterDataWriter};
use std::fs;
use std::path::Path;

const BUILDINGS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"id": 1},
     "geometry": {"type": "Polygon", "coordinates": [[[2, 92], [8, 92], [8, 98], [2, 98], [2, 92]]]}},
    {"type": "Feature", "properties": {"id": 2},
     "geometry": {"type": "Polygon", "coordinates": [[[15, 95], [16, 95], [16, 96], [15, 96], [15, 95]]]}},
    {"type": "Feature", "properties": {"id": 3},
     "geometry": {"type": "Polygon", "coordinates": [[[500, 500], [510, 500], [510, 510], [500, 500]]]}}
  ]
}"#;

/// 20×10 RGB image covering x 0..20, y 90..100 in world units.
fn write_image(path: &Path) {
    let profile = RasterProfile::new(20, 10, 3, RasterDtype::U8)
        .with_transform(GeoTransform::north_up(0.0, 100.0, 1.0, 1.0))
        .with_crs(Some("EPSG:31982".into()));
    RasterDataWriter::new(path, profile)
        .write_data(RasterArray::new(20, 10, 3, vec![100.0; 600]))
        .unwrap();
}

fn dataset(tag: &str) -> (std::path::PathBuf, MaskBuilderConfig) {
    let root = common::scratch_dir(tag);
    fs::create_dir_all(root.join("vectors")).unwrap();
    fs::write(root.join("vectors/a.geojson"), BUILDINGS).unwrap();
    write_image(&root.join("images/sub/a.png"));
    write_image(&root.join("images/b.png"));
    let cfg = MaskBuilderConfig {
        root_dir: root.clone(),
        output_csv_path: root.clone(),
        image_extension: "png".into(),
        mask_extension: "png".into(),
        min_polygon_area: 10.0,
        vector_source: VectorSource::BatchFile {
            root_dir: root.join("vectors"),
            file_extension: "geojson".into(),
        },
        ..Default::default()
    };
    (root, cfg)
}

#[test]
fn builds_masks_and_catalog_per_image() {
    common::init_logging();
    let (root, cfg) = dataset("mask_builder_per_mask");
    let report = build_masks(&cfg).unwrap();
    assert_eq!(report.entries, 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.csv_path, root.join("dsg_dataset.csv"));

    let csv = fs::read_to_string(&report.csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with("images/b.png,20,10,polygon_masks/b.png,"));
    assert_eq!(
        lines[2],
        "images/sub/a.png,20,10,polygon_masks/sub/a.png,boundary_masks/sub/a.png,\
         vertex_masks/sub/a.png,\"[100.0, 100.0, 100.0]\",\"[0.0, 0.0, 0.0]\""
    );

    let polygon = RasterFile::open(&root.join("polygon_masks/sub/a.png")).unwrap();
    let band = &polygon.bands()[0];
    assert_eq!(band.get(5, 5), 255.0, "inside the large building");
    assert_eq!(band.get(15, 4), 0.0, "small building is filtered");
    assert_eq!(band.get(12, 5), 0.0);
    assert_eq!(polygon.profile.crs.as_deref(), Some("EPSG:31982"));
    assert_eq!(*polygon.transform(), GeoTransform::north_up(0.0, 100.0, 1.0, 1.0));

    let boundary = RasterFile::open(&root.join("boundary_masks/sub/a.png")).unwrap();
    assert_eq!(boundary.bands()[0].get(2, 5), 255.0);
    assert_eq!(boundary.bands()[0].get(5, 5), 0.0);

    let vertex = RasterFile::open(&root.join("vertex_masks/sub/a.png")).unwrap();
    assert_eq!(vertex.bands()[0].get(2, 8), 255.0);
    assert_eq!(vertex.bands()[0].get(2, 5), 0.0);

    // No vector file for `b`: masks exist but are empty.
    let empty = RasterFile::open(&root.join("polygon_masks/b.png")).unwrap();
    assert!(empty.bands()[0].data.iter().all(|&v| v == 0.0));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn multiple_band_output_shares_one_file() {
    let (root, mut cfg) = dataset("mask_builder_multi_band");
    cfg.mask_output_type = MaskOutputType::SingleFileMultipleBand;
    cfg.build_vertex_mask = false;
    cfg.workers = Some(2);
    let report = build_masks(&cfg).unwrap();
    assert_eq!(report.entries, 2);

    let csv = fs::read_to_string(&report.csv_path).unwrap();
    let row = csv.lines().nth(2).unwrap();
    assert!(row.starts_with("images/sub/a.png,20,10,polygon_masks/sub/a.png,polygon_masks/sub/a.png,,"));

    let masks = RasterFile::open(&root.join("polygon_masks/sub/a.png")).unwrap();
    assert_eq!(masks.profile.count, 2);
    assert_eq!(masks.bands()[0].get(5, 5), 255.0);
    assert_eq!(masks.bands()[1].get(2, 5), 255.0);
    assert!(!root.join("boundary_masks/sub/a.png").exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn output_inside_image_tree_is_rejected() {
    let (root, mut cfg) = dataset("mask_builder_nested");
    cfg.polygon_mask_folder_name = "images/polygon_masks".into();
    let err = build_masks(&cfg).unwrap_err();
    assert!(err.to_string().contains("input path must not be in output_path"));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn masks_stay_in_memory_when_not_written() {
    let (root, mut cfg) = dataset("mask_builder_in_memory");
    cfg.write_masks = false;
    let report = build_masks(&cfg).unwrap();
    assert_eq!(report.entries, 2);
    assert!(!root.join("polygon_masks").exists());
    assert!(!root.join("boundary_masks").exists());

    let csv = fs::read_to_string(&report.csv_path).unwrap();
    assert!(csv.lines().nth(2).unwrap().starts_with("images/sub/a.png,20,10,,,,"));

    assert_eq!(report.masks.len(), 2);
    let a = &report.masks[1];
    assert_eq!(a.image, root.join("images/sub/a.png"));
    let kinds: Vec<GeomType> = a.masks.iter().map(|(t, _)| *t).collect();
    assert_eq!(kinds, vec![GeomType::Polygon, GeomType::Line, GeomType::Point]);
    assert_eq!(a.masks[0].1.get(5, 5), 255);
    assert_eq!(a.masks[0].1.get(15, 4), 0);
    assert_eq!(a.masks[1].1.get(2, 5), 255);
    assert_eq!(report.masks[0].masks[0].1.count_nonzero(), 0);

    let _ = fs::remove_dir_all(&root);
}
