use approx::assert_relative_eq;
use gesture_vision::core_modules::dataset::Dataset;
use gesture_vision::core_modules::distance_map::DistanceMap;
use gesture_vision::pipeline::{BorderKind, FrameOutcome, GestureLabel, GesturePipeline, PipelineConfig};
use image::{ImageBuffer, Luma};
use tempfile::tempdir;

const WIDTH: u32 = 48;
const HEIGHT: u32 = 36;
const WALL: f32 = 1.4;
const HAND: f32 = 0.6;

fn config(dataset_path: std::path::PathBuf) -> PipelineConfig {
    PipelineConfig {
        min_distance: 0.5,
        max_distance: 1.5,
        dataset_path,
        ..PipelineConfig::default()
    }
}

fn empty_scene() -> DistanceMap {
    DistanceMap::filled(WIDTH, HEIGHT, WALL)
}

/// A palm with two raised fingers, roughly a peace sign.
fn peace_sign() -> DistanceMap {
    DistanceMap::from_fn(WIDTH, HEIGHT, |x, y| {
        let palm = (14..=30).contains(&x) && (18..=30).contains(&y);
        let index = (16..=19).contains(&x) && (4..18).contains(&y);
        let middle = (25..=28).contains(&x) && (4..18).contains(&y);
        if palm || index || middle { HAND } else { WALL }
    })
}

#[test]
fn labeled_session_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gestures.csv");
    let mut pipeline = GesturePipeline::load(config(path.clone()));
    assert!(pipeline.dataset().is_empty());

    assert_eq!(pipeline.process_frame(&empty_scene()), FrameOutcome::Primed);

    for _ in 0..3 {
        let outcome = pipeline.process_frame(&peace_sign());
        assert_eq!(outcome, FrameOutcome::Processed { blobs: 1 });
        pipeline.label_all(GestureLabel::Peace);
        assert_eq!(pipeline.commit_current(), 1);
    }
    pipeline.save_dataset().unwrap();

    let reloaded = Dataset::load(&path);
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.label_counts().get(&GestureLabel::Peace), Some(&3));
    assert_eq!(&reloaded, pipeline.dataset());
}

#[test]
fn peace_sign_features_are_plausible() {
    let dir = tempdir().unwrap();
    let mut pipeline = GesturePipeline::new(config(dir.path().join("gestures.csv")));
    pipeline.process_frame(&empty_scene());
    pipeline.process_frame(&peace_sign());

    let blob = &pipeline.current_blobs()[0];
    assert_eq!(blob.border, BorderKind::Outer);
    assert!(blob.parent.is_none());

    let features = &blob.features;
    // The gap between the fingers makes the contour visibly smaller than its hull.
    assert!(features.area_ratio_to_hull < 0.95);
    assert!(features.area_ratio_to_hull > 0.5);
    assert!(features.perimeter_ratio_to_hull > 1.0);
    assert!(features.point_count_ratio_to_hull < 1.0);
    assert!(features.min_radial_distance <= features.average_radial_distance);
    assert!(features.average_radial_distance <= features.max_radial_distance);
    assert!(features.average_angle > -std::f64::consts::PI);
    assert!(features.average_angle <= std::f64::consts::PI);
    assert_eq!(features.histogram_total(), blob.contour.len() as u64);
    assert_eq!(features.label, GestureLabel::None);
}

#[test]
fn hand_leaving_the_scene_reports_nothing() {
    let dir = tempdir().unwrap();
    let mut pipeline = GesturePipeline::new(config(dir.path().join("gestures.csv")));
    pipeline.process_frame(&empty_scene());
    pipeline.process_frame(&peace_sign());
    let outcome = pipeline.process_frame(&empty_scene());
    assert_eq!(outcome, FrameOutcome::Processed { blobs: 0 });
    assert_eq!(pipeline.commit_current(), 0);
    assert!(pipeline.dataset().is_empty());
}

#[test]
fn invalid_window_drops_frames_until_fixed() {
    let dir = tempdir().unwrap();
    let mut pipeline = GesturePipeline::new(config(dir.path().join("gestures.csv")));
    pipeline.process_frame(&empty_scene());

    pipeline.config_mut().min_distance = 2.0;
    assert_eq!(pipeline.process_frame(&peace_sign()), FrameOutcome::Skipped);
    assert!(pipeline.current_blobs().is_empty());

    // The background learned before the bad window is still in place.
    pipeline.config_mut().min_distance = 0.5;
    assert_eq!(pipeline.process_frame(&peace_sign()), FrameOutcome::Processed { blobs: 1 });
    assert_eq!(pipeline.frame_count(), 3);
}

#[test]
fn depth_png_frames_feed_the_pipeline() {
    let depth_mm = |map: &DistanceMap| -> ImageBuffer<Luma<u16>, Vec<u16>> {
        ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
            Luma([(map.get(x, y).unwrap_or(0.0) * 1000.0).round() as u16])
        })
    };
    let background = DistanceMap::from_depth_image(&depth_mm(&empty_scene()), 0.001);
    let hand = DistanceMap::from_depth_image(&depth_mm(&peace_sign()), 0.001);
    assert_relative_eq!(hand.get(20, 25).unwrap(), HAND, epsilon = 1e-6);

    let dir = tempdir().unwrap();
    let mut pipeline = GesturePipeline::new(config(dir.path().join("gestures.csv")));
    pipeline.process_frame(&background);
    assert_eq!(pipeline.process_frame(&hand), FrameOutcome::Processed { blobs: 1 });
}

#[test]
fn dataset_appends_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gestures.csv");

    for label in [GestureLabel::Rock, GestureLabel::Ok] {
        let mut pipeline = GesturePipeline::load(config(path.clone()));
        pipeline.process_frame(&empty_scene());
        pipeline.process_frame(&peace_sign());
        pipeline.label_blob(0, label);
        pipeline.commit_current();
        pipeline.save_dataset().unwrap();
    }

    let dataset = Dataset::load(&path);
    let labels: Vec<GestureLabel> = dataset.iter().map(|r| r.label).collect();
    assert_eq!(labels, vec![GestureLabel::Rock, GestureLabel::Ok]);
}
