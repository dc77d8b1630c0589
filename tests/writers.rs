mod common;

use frame_field_polygonizer::error::WriteError;
use frame_field_polygonizer::geometry::GeoTransform;
use frame_field_polygonizer::image::ImageU8;
use frame_field_polygonizer::polygonize::PolygonSet;
use frame_field_polygonizer::raster::{RasterDtype, RasterFile, RasterProfile};
use frame_field_polygonizer::vector::VectorLayer;
use frame_field_polygonizer::writer::{
    DataWriter, IfExists, RasterArray, RasterDataWriter, SpatialConnector, SpatialSession,
    SqlParam, SqlStatement, VectorDatabaseDataWriter, VectorDatabaseOptions,
    VectorFileDataWriter, VectorFormat,
};
use geo::{polygon, Area, Geometry};
use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex};

fn three_squares() -> PolygonSet {
    let polys = (0..3)
        .map(|i| {
            let x = 10.0 * i as f64;
            polygon![(x: x, y: 0.0), (x: x + 4.0, y: 0.0), (x: x + 4.0, y: 4.0), (x: x, y: 4.0)]
        })
        .collect();
    PolygonSet::new("tile_9", polys, GeoTransform::identity()).with_crs(Some("EPSG:4326".into()))
}

#[test]
fn geojson_file_round_trips_through_vector_layer() {
    let dir = common::scratch_dir("writer_geojson");
    let template = dir.join("{name}.geojson").display().to_string();
    let writer = VectorFileDataWriter::new(template, None, VectorFormat::Geojson);
    writer.write_data(three_squares()).unwrap();

    let layer = VectorLayer::open(&dir.join("tile_9.geojson")).unwrap();
    assert_eq!(layer.len(), 3);
    assert_eq!(layer.crs.as_deref(), Some("EPSG:4326"));
    for feature in &layer.features {
        assert_eq!(feature.properties["name"], "tile_9");
        match &feature.geometry {
            Geometry::Polygon(p) => assert!((p.unsigned_area() - 16.0).abs() < 1e-9),
            other => panic!("unexpected geometry {other:?}"),
        }
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn geojson_sequence_is_readable_line_by_line() {
    let dir = common::scratch_dir("writer_geojsonl");
    let path = dir.join("out.geojsonl");
    let writer = VectorFileDataWriter::new(
        path.display().to_string(),
        Some("EPSG:3857".into()),
        VectorFormat::GeojsonSeq,
    );
    writer.write_data(three_squares()).unwrap();
    let layer = VectorLayer::open(&path).unwrap();
    assert_eq!(layer.len(), 3);
    assert_eq!(layer.crs.as_deref(), Some("EPSG:3857"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raster_writer_keeps_bands_and_georeferencing() {
    let dir = common::scratch_dir("writer_raster");
    let path = dir.join("masks.png");
    let mut a = ImageU8::new(6, 4);
    let mut b = ImageU8::new(6, 4);
    a.set(1, 1, 255);
    b.set(5, 3, 255);
    let transform = GeoTransform::north_up(500.0, 800.0, 2.0, 2.0);
    let profile = RasterProfile::new(6, 4, 1, RasterDtype::U8)
        .with_transform(transform)
        .with_crs(Some("EPSG:32723".into()));
    RasterDataWriter::new(&path, profile)
        .write_data(RasterArray::from_masks(&[&a, &b]).unwrap())
        .unwrap();

    let raster = RasterFile::open(&path).unwrap();
    assert_eq!(raster.profile.count, 2);
    assert_eq!(raster.profile.crs.as_deref(), Some("EPSG:32723"));
    assert_eq!(*raster.transform(), transform);
    assert_eq!(raster.bands()[0].get(1, 1), 255.0);
    assert_eq!(raster.bands()[1].get(5, 3), 255.0);
    assert_eq!(raster.bands()[1].get(1, 1), 0.0);
    let _ = std::fs::remove_dir_all(&dir);
}

/// Connector that records every transaction instead of talking to a server.
#[derive(Default)]
struct RecordingConnector {
    existing: Mutex<Vec<String>>,
    transactions: Arc<Mutex<Vec<Vec<SqlStatement>>>>,
}

struct RecordingSession {
    existing: Vec<String>,
    transactions: Arc<Mutex<Vec<Vec<SqlStatement>>>>,
}

impl SpatialConnector for RecordingConnector {
    fn connect(&self) -> Result<Box<dyn SpatialSession>, WriteError> {
        Ok(Box::new(RecordingSession {
            existing: self.existing.lock().unwrap().clone(),
            transactions: Arc::clone(&self.transactions),
        }))
    }
}

impl SpatialSession for RecordingSession {
    fn table_exists(&mut self, table: &str) -> Result<bool, WriteError> {
        Ok(self.existing.iter().any(|t| t == table))
    }

    fn execute_transaction(&mut self, statements: &[SqlStatement]) -> Result<(), WriteError> {
        self.transactions.lock().unwrap().push(statements.to_vec());
        Ok(())
    }
}

#[test]
fn database_writer_creates_then_appends() {
    let connector = Arc::new(RecordingConnector::default());
    let mut options = VectorDatabaseOptions::new("public.buildings", "EPSG:31983");
    options.geometry_column = "footprint".into();
    let writer = VectorDatabaseDataWriter::new(connector.clone(), options);

    writer.write_data(three_squares()).unwrap();
    connector.existing.lock().unwrap().push("public.buildings".into());
    writer.write_data(three_squares()).unwrap();

    let txs = connector.transactions.lock().unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs[0][0].sql.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"buildings\""));
    assert!(txs[0][0].sql.contains("\"footprint\" geometry(Polygon, 31983)"));
    assert_eq!(txs[0].len(), 4);
    assert_eq!(txs[1].len(), 3);
    assert!(txs[1]
        .iter()
        .all(|st| st.sql.contains("ST_GeomFromText($2, 31983)")));
    match &txs[1][0].params[1] {
        SqlParam::Text(wkt) => assert!(wkt.starts_with("POLYGON ((")),
        other => panic!("unexpected param {other:?}"),
    }
}

#[test]
fn database_writer_fail_mode_refuses_existing_table() {
    let connector = Arc::new(RecordingConnector::default());
    connector.existing.lock().unwrap().push("buildings".into());
    let mut options = VectorDatabaseOptions::new("buildings", "4326");
    options.if_exists = IfExists::Fail;
    let writer = VectorDatabaseDataWriter::new(connector.clone(), options);
    let err = writer.write_data(three_squares()).unwrap_err();
    assert!(matches!(err, WriteError::TableExists(_)));
    assert!(connector.transactions.lock().unwrap().is_empty());
}

/// In-memory stand-in for one database shared by every session. Each
/// session waits after its existence check, so both writers decide on a
/// fresh table before either commits.
struct SharedDatabase {
    state: Mutex<DatabaseState>,
    checked: Barrier,
}

#[derive(Clone, Default)]
struct DatabaseState {
    tables: HashSet<String>,
    rows: usize,
}

struct SharedSession {
    db: Arc<SharedDatabase>,
}

struct SharedConnector(Arc<SharedDatabase>);

impl SpatialConnector for SharedConnector {
    fn connect(&self) -> Result<Box<dyn SpatialSession>, WriteError> {
        Ok(Box::new(SharedSession {
            db: Arc::clone(&self.0),
        }))
    }
}

impl SpatialSession for SharedSession {
    fn table_exists(&mut self, table: &str) -> Result<bool, WriteError> {
        let exists = self.db.state.lock().unwrap().tables.contains(table);
        self.db.checked.wait();
        Ok(exists)
    }

    fn execute_transaction(&mut self, statements: &[SqlStatement]) -> Result<(), WriteError> {
        let mut state = self.db.state.lock().unwrap();
        let mut staged = state.clone();
        for st in statements {
            if let Some(rest) = st.sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
                staged.tables.insert(table_of(rest));
            } else if let Some(rest) = st.sql.strip_prefix("CREATE TABLE ") {
                if !staged.tables.insert(table_of(rest)) {
                    return Err(WriteError::Database("relation already exists".into()));
                }
            } else if st.sql.starts_with("INSERT INTO ") {
                staged.rows += 1;
            }
        }
        *state = staged;
        Ok(())
    }
}

fn table_of(rest: &str) -> String {
    rest.split_whitespace()
        .next()
        .unwrap_or_default()
        .replace('"', "")
}

#[test]
fn concurrent_writers_share_a_new_table() {
    let db = Arc::new(SharedDatabase {
        state: Mutex::new(DatabaseState::default()),
        checked: Barrier::new(2),
    });
    let writer = VectorDatabaseDataWriter::new(
        Arc::new(SharedConnector(Arc::clone(&db))),
        VectorDatabaseOptions::new("buildings", "EPSG:4326"),
    );

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| s.spawn(|| writer.write_data(three_squares())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results {
        assert!(result.is_ok(), "{result:?}");
    }
    let state = db.state.lock().unwrap();
    assert!(state.tables.contains("buildings"));
    assert_eq!(state.rows, 6);
}
