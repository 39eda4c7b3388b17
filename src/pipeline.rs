// THEORY:
// The `pipeline` module is the top-level API of the engine. It strings the
// layers together for one frame at a time and owns everything that outlives a
// frame: the segmenter's background, the blobs of the latest frame (so an
// operator can select and label them by index), and the labeled dataset.
//
// The dataset is an ordinary field rather than a process-wide singleton: it is
// loaded when the pipeline is built and saved only when someone calls
// `save_dataset`. Because every mutating call takes `&mut self`, committing and
// saving can never interleave with a frame being processed.

use crate::core_modules::background_segmenter::{BackgroundSegmenter, DistanceWindow, SegmentationOutput};
use crate::core_modules::dataset::Dataset;
use crate::core_modules::distance_map::{DEFAULT_DEPTH_SCALE, DistanceMap};
use crate::core_modules::feature_extractor::feature_extractor;
use crate::core_modules::foreground_mask::ForegroundMask;
use crate::core_modules::geometry::{Point, RegionOfInterest};
use crate::error::{ConfigError, DatasetError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// Re-export key data structures for the public API.
pub use crate::core_modules::gesture::{BorderKind, GestureBlob, GestureFeatures, GestureLabel};

/// Tunable parameters, normally driven by the operator's sliders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Readings at or nearer than this (meters) normalize to full intensity.
    pub min_distance: f32,
    /// Readings at or beyond this (meters) normalize to zero.
    pub max_distance: f32,
    /// 8-bit intensity at or above which a pixel is foreground.
    pub binarize_threshold: u8,
    /// Interaction region as `[x, y]` vertices. `None` uses the whole frame.
    pub roi: Option<Vec<[i32; 2]>>,
    pub dataset_path: PathBuf,
    /// Meters per raw depth unit, for sources that deliver 16-bit depth images.
    pub depth_scale: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.3,
            max_distance: 0.8,
            binarize_threshold: 128,
            roi: None,
            dataset_path: PathBuf::from("gestures.csv"),
            depth_scale: DEFAULT_DEPTH_SCALE,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn window(&self) -> DistanceWindow {
        DistanceWindow::new(self.min_distance, self.max_distance)
    }

    pub fn region_of_interest(&self, width: u32, height: u32) -> RegionOfInterest {
        match &self.roi {
            Some(vertices) => RegionOfInterest::new(vertices.iter().map(|&[x, y]| Point::new(x, y))),
            None => RegionOfInterest::full_frame(width, height),
        }
    }
}

/// What happened to a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// First frame, first after a reset, or first at a new frame size: the
    /// background was primed, nothing extracted.
    Primed,
    /// The distance window was degenerate; the frame was dropped untouched.
    Skipped,
    /// Segmentation and extraction ran; `blobs` survived the degeneracy filters.
    Processed { blobs: usize },
}

/// The main, top-level struct for the gesture engine.
pub struct GesturePipeline {
    config: PipelineConfig,
    segmenter: BackgroundSegmenter,
    dataset: Dataset,
    last_mask: Option<ForegroundMask>,
    current_blobs: Vec<GestureBlob>,
    selected_blob: Option<usize>,
    frame_count: u64,
}

impl GesturePipeline {
    /// A pipeline with an empty dataset.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_dataset(config, Dataset::new())
    }

    /// A pipeline whose dataset is read from `config.dataset_path`.
    pub fn load(config: PipelineConfig) -> Self {
        let dataset = Dataset::load(&config.dataset_path);
        Self::with_dataset(config, dataset)
    }

    pub fn with_dataset(config: PipelineConfig, dataset: Dataset) -> Self {
        Self {
            config,
            segmenter: BackgroundSegmenter::new(),
            dataset,
            last_mask: None,
            current_blobs: Vec::new(),
            selected_blob: None,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parameters may change between frames; the background is kept.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    pub fn process_frame(&mut self, raw: &DistanceMap) -> FrameOutcome {
        self.frame_count += 1;
        self.current_blobs.clear();
        self.selected_blob = None;

        let window = self.config.window();
        if window.is_degenerate() {
            debug!(
                frame = self.frame_count,
                min = window.min_distance,
                max = window.max_distance,
                "degenerate distance window, skipping frame"
            );
            self.last_mask = None;
            return FrameOutcome::Skipped;
        }

        let SegmentationOutput { mask, primed, .. } =
            self.segmenter.segment(raw, window, self.config.binarize_threshold);

        if primed {
            self.last_mask = Some(mask);
            return FrameOutcome::Primed;
        }

        let roi = self.config.region_of_interest(raw.width(), raw.height());
        self.current_blobs = feature_extractor::extract_features(&mask, &roi);
        self.last_mask = Some(mask);

        debug!(frame = self.frame_count, blobs = self.current_blobs.len(), "processed frame");
        FrameOutcome::Processed { blobs: self.current_blobs.len() }
    }

    /// Blobs of the most recent frame, in trace order.
    pub fn current_blobs(&self) -> &[GestureBlob] {
        &self.current_blobs
    }

    pub fn last_mask(&self) -> Option<&ForegroundMask> {
        self.last_mask.as_ref()
    }

    pub fn composite(&self) -> Option<&DistanceMap> {
        self.segmenter.composite()
    }

    /// Highlights one blob for the overlay. Out-of-range indices are ignored.
    pub fn select_blob(&mut self, index: usize) -> bool {
        if index < self.current_blobs.len() {
            self.selected_blob = Some(index);
            true
        } else {
            false
        }
    }

    pub fn selected_blob(&self) -> Option<usize> {
        self.selected_blob
    }

    /// Tags blob `index` of the current frame. Returns false when there is no such blob.
    pub fn label_blob(&mut self, index: usize, label: GestureLabel) -> bool {
        match self.current_blobs.get_mut(index) {
            Some(blob) => {
                blob.features.label = label;
                true
            }
            None => false,
        }
    }

    pub fn label_all(&mut self, label: GestureLabel) {
        for blob in &mut self.current_blobs {
            blob.features.label = label;
        }
    }

    /// Copies every current blob's features into the dataset. Returns how many were added.
    pub fn commit_current(&mut self) -> usize {
        let added = self.current_blobs.len();
        self.dataset
            .append(self.current_blobs.iter().map(|blob| blob.features.clone()));
        added
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Writes the dataset to `config.dataset_path`.
    pub fn save_dataset(&self) -> Result<(), DatasetError> {
        self.dataset.save(&self.config.dataset_path)
    }

    /// Drops the learned background; the next frame primes it again.
    pub fn reset_background(&mut self) {
        self.segmenter.reset();
        self.last_mask = None;
        self.current_blobs.clear();
        self.selected_blob = None;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
