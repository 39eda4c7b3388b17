// THEORY:
// `gesture_capture` replays a directory of recorded 16-bit depth frames through
// the pipeline. Decoding happens on a blocking tokio task that feeds a small
// bounded channel, so the next PNG is being read while the current frame is
// segmented. The pipeline itself (and with it the dataset) is only ever touched
// by the consumer loop below.
//
// With `--label` every blob found in a frame is tagged and committed, which is
// how a session of one gesture becomes training rows. Without it the tool only
// reports what it sees.

use anyhow::{Context, Result};
use clap::Parser;
use gesture_vision::core_modules::distance_map::DistanceMap;
use gesture_vision::core_modules::utils::image_helper::image_helper;
use gesture_vision::pipeline::{FrameOutcome, GestureLabel, GesturePipeline, PipelineConfig};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "gesture_capture")]
#[command(about = "Segment recorded depth frames and collect labeled gesture features")]
struct Args {
    /// Directory of 16-bit grayscale depth PNGs, processed in file-name order
    frames_dir: PathBuf,

    /// JSON file with pipeline parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset CSV (overrides the config's `dataset_path`)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Label applied to every detected blob before committing; `none` only reports
    #[arg(short, long, default_value = "none")]
    label: GestureLabel,

    /// Write per-frame mask and composite PNGs here
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

struct Frame {
    path: PathBuf,
    distances: DistanceMap,
}

const FRAME_QUEUE_DEPTH: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dataset) = &args.dataset {
        config.dataset_path = dataset.clone();
    }

    info!(
        "Distance window {:.2}..{:.2} m, threshold {}, dataset {}",
        config.min_distance,
        config.max_distance,
        config.binarize_threshold,
        config.dataset_path.display()
    );

    let frames = list_frames(&args.frames_dir)?;
    if frames.is_empty() {
        warn!("No PNG frames found in {}", args.frames_dir.display());
        return Ok(());
    }
    info!("Found {} frame(s)", frames.len());

    if let Some(dir) = &args.debug_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating debug directory {}", dir.display()))?;
    }

    let (sender, mut receiver) = mpsc::channel::<Frame>(FRAME_QUEUE_DEPTH);
    let depth_scale = config.depth_scale;
    let loader = tokio::task::spawn_blocking(move || decode_frames(frames, depth_scale, sender));

    let mut pipeline = GesturePipeline::load(config);
    let starting_records = pipeline.dataset().len();

    while let Some(frame) = receiver.recv().await {
        let outcome = pipeline.process_frame(&frame.distances);
        let name = frame_name(&frame.path);

        match outcome {
            FrameOutcome::Primed => info!("{name}: background primed"),
            FrameOutcome::Skipped => warn!("{name}: distance window is empty, frame skipped"),
            FrameOutcome::Processed { blobs } => {
                info!("{name}: {blobs} blob(s)");
                for (index, blob) in pipeline.current_blobs().iter().enumerate() {
                    debug!(
                        "  #{index} {:?} centroid=({:.1}, {:.1}) hull/box={:.3} angle={:.2}",
                        blob.border,
                        blob.centroid.0,
                        blob.centroid.1,
                        blob.features.area_ratio_to_box,
                        blob.features.average_angle,
                    );
                }
                if args.label != GestureLabel::None && blobs > 0 {
                    pipeline.label_all(args.label);
                    pipeline.commit_current();
                }
            }
        }

        if let Some(dir) = &args.debug_dir {
            if let Err(e) = write_debug_images(dir, &name, &pipeline) {
                warn!("{name}: could not write debug images: {e}");
            }
        }
    }

    let decoded = loader.await.context("frame loader panicked")?;
    info!("Processed {decoded} frame(s)");

    let added = pipeline.dataset().len() - starting_records;
    if args.label == GestureLabel::None {
        info!("No label given, dataset left unchanged");
        return Ok(());
    }

    pipeline
        .save_dataset()
        .with_context(|| format!("saving dataset to {}", pipeline.config().dataset_path.display()))?;
    info!("Committed {added} new record(s) as {}", args.label);
    for (label, count) in pipeline.dataset().label_counts() {
        info!("  {label}: {count}");
    }

    Ok(())
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    frames.sort();
    Ok(frames)
}

/// Runs on a blocking thread. Unreadable frames are logged and skipped.
fn decode_frames(paths: Vec<PathBuf>, depth_scale: f32, sender: mpsc::Sender<Frame>) -> usize {
    let mut decoded = 0;
    for path in paths {
        let image = match image::open(&path) {
            Ok(image) => image.into_luma16(),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let distances = DistanceMap::from_depth_image(&image, depth_scale);
        if sender.blocking_send(Frame { path, distances }).is_err() {
            // consumer is gone
            break;
        }
        decoded += 1;
    }
    decoded
}

fn frame_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_debug_images(dir: &Path, name: &str, pipeline: &GesturePipeline) -> Result<()> {
    if let Some(mask) = pipeline.last_mask() {
        image_helper::save_mask(dir.join(format!("{name}_mask.png")), mask)?;
    }
    if let Some(composite) = pipeline.composite() {
        image_helper::save_distance_map(
            dir.join(format!("{name}_composite.png")),
            composite,
            pipeline.config().window(),
        )?;
    }
    Ok(())
}
