mod common;

use common::synthetic::{axis_crossfield, rect_mask, MemoryWriter};
use frame_field_polygonizer::error::PolygonizeError;
use frame_field_polygonizer::geometry::GeoTransform;
use frame_field_polygonizer::polygonize::{AsmOptions, PolygonizerConfig};
use frame_field_polygonizer::tensor::{CrossfieldBatch, Prediction, SegmentationBatch};
use frame_field_polygonizer::{
    ExecutionMode, Polygonizer, PolygonizerProcessor, ProcessContext, RunReport,
};
use std::sync::Arc;

fn batch_with_nan(n: usize, bad: usize) -> SegmentationBatch {
    let planes = (0..n)
        .map(|i| {
            let mut plane = rect_mask(48, 48, 8, 8, 24 + i, 30);
            if i == bad {
                plane.set(0, 0, f32::NAN);
            }
            plane
        })
        .collect();
    SegmentationBatch::from_planes(planes).unwrap()
}

fn processor(cfg: &PolygonizerConfig, writer: Arc<MemoryWriter>, mode: ExecutionMode) -> PolygonizerProcessor {
    PolygonizerProcessor::new(Polygonizer::from_config(cfg).unwrap(), writer, mode)
}

#[test]
fn failing_unit_does_not_affect_siblings() {
    common::init_logging();
    for mode in [ExecutionMode::Inline, ExecutionMode::Pooled(3)] {
        let writer = Arc::new(MemoryWriter::default());
        let proc = processor(&PolygonizerConfig::default(), writer.clone(), mode);
        let prediction = Prediction::new(batch_with_nan(5, 2), None);
        let report = proc
            .process(&prediction, &ProcessContext::default())
            .expect("batch is well formed");

        assert_eq!(report.succeeded(), 4, "{mode:?}");
        assert_eq!(report.failed(), 1, "{mode:?}");
        assert_eq!(report.failures[0].id, "2");
        assert!(report.failures[0].message.contains("non-finite"));
        assert_eq!(writer.names(), vec!["0", "1", "3", "4"]);
    }
}

#[test]
fn names_and_world_coordinates_reach_the_sink() {
    let writer = Arc::new(MemoryWriter::default());
    let proc = processor(&PolygonizerConfig::default(), writer.clone(), ExecutionMode::Inline);
    let seg = SegmentationBatch::from_planes(vec![rect_mask(40, 40, 10, 10, 30, 30)]).unwrap();
    let ctx = ProcessContext {
        transform: GeoTransform::north_up(1000.0, 2000.0, 0.5, 0.5),
        crs: Some("EPSG:31982".into()),
        names: vec!["tile_a".into()],
        convert_to_world_coords: true,
    };
    let report = proc.process(&Prediction::new(seg, None), &ctx).unwrap();
    assert_eq!(report.succeeded(), 1);

    let sets = writer.sets.lock().unwrap();
    let set = &sets[0];
    assert_eq!(set.name, "tile_a");
    assert_eq!(set.crs.as_deref(), Some("EPSG:31982"));
    assert!(set.world_coords);
    for c in set.polygons[0].exterior().coords() {
        assert!((1004.0..=1016.0).contains(&c.x), "x={}", c.x);
        assert!((1984.0..=1996.0).contains(&c.y), "y={}", c.y);
    }
}

#[test]
fn crossfield_shape_mismatch_aborts_before_dispatch() {
    let writer = Arc::new(MemoryWriter::default());
    let cfg = PolygonizerConfig::Asm(AsmOptions::default());
    let proc = processor(&cfg, writer.clone(), ExecutionMode::Inline);
    let seg = SegmentationBatch::from_planes(vec![rect_mask(32, 32, 4, 4, 20, 20)]).unwrap();
    let cf = CrossfieldBatch::from_fields(vec![axis_crossfield(32, 16)]).unwrap();
    let err = proc
        .process(&Prediction::new(seg, Some(cf)), &ProcessContext::default())
        .unwrap_err();
    assert!(matches!(err, PolygonizeError::ShapeMismatch { .. }));
    assert!(writer.sets.lock().unwrap().is_empty());
}

#[test]
fn missing_crossfield_is_rejected_for_asm() {
    let writer = Arc::new(MemoryWriter::default());
    let cfg = PolygonizerConfig::Asm(AsmOptions::default());
    let proc = processor(&cfg, writer, ExecutionMode::Inline);
    let seg = SegmentationBatch::from_planes(vec![rect_mask(16, 16, 4, 4, 12, 12)]).unwrap();
    let err = proc
        .process(&Prediction::new(seg, None), &ProcessContext::default())
        .unwrap_err();
    assert!(matches!(err, PolygonizeError::MissingCrossfield("asm")));
}

#[test]
fn name_count_must_match_batch() {
    let writer = Arc::new(MemoryWriter::default());
    let proc = processor(&PolygonizerConfig::default(), writer, ExecutionMode::Inline);
    let seg = batch_with_nan(3, usize::MAX);
    let ctx = ProcessContext {
        names: vec!["only_one".into()],
        ..Default::default()
    };
    assert!(matches!(
        proc.process(&Prediction::new(seg, None), &ctx),
        Err(PolygonizeError::BatchNameMismatch { names: 1, batch: 3 })
    ));
}

#[test]
fn run_report_serializes_units_and_failures() {
    let writer = Arc::new(MemoryWriter::default());
    let proc = processor(&PolygonizerConfig::default(), writer, ExecutionMode::Inline);
    let prediction = Prediction::new(batch_with_nan(2, 1), None);
    let batch = proc.process(&prediction, &ProcessContext::default()).unwrap();
    let report = RunReport::from_batch("simple", batch, 1.5);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["units"][0]["name"], "0");
    assert!(json["units"][0]["timings"].is_object());
}
