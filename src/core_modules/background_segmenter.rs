// THEORY:
// The `BackgroundSegmenter` is the temporal layer of the engine. It is the only
// stateful piece below the pipeline: it remembers one "composite" distance map
// across frames and decides, pixel by pixel, whether the current reading is
// near enough to be foreground.
//
// Per frame:
// 1.  **Cold start**: the very first frame has nothing to compare against. The
//     composite becomes a copy of the raw frame and the mask is all background.
// 2.  **Normalization**: `1 - (d - min) / (max - min)`. Near readings come out
//     high, far readings low; values outside the window saturate past 1 or 0.
// 3.  **Binarization**: the normalized value is scaled to 8 bits (rounded,
//     saturated) and compared against the threshold. `>= threshold` is foreground.
// 4.  **Compositing**: foreground pixels take the raw reading, background pixels
//     keep whatever the composite held. The result replaces the stored composite.
//
// A degenerate window (`max <= min`) never panics here; it just yields a
// saturated mask. The pipeline checks `DistanceWindow::is_degenerate` and skips
// such frames before they reach this point.

use crate::core_modules::distance_map::DistanceMap;
use crate::core_modules::foreground_mask::ForegroundMask;
use tracing::debug;

/// The `[min, max]` distance band, in meters, that the normalization maps onto `[1, 0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceWindow {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl DistanceWindow {
    pub fn new(min_distance: f32, max_distance: f32) -> Self {
        Self { min_distance, max_distance }
    }

    /// True when the window cannot be normalized against.
    pub fn is_degenerate(&self) -> bool {
        !(self.max_distance > self.min_distance)
            || !self.min_distance.is_finite()
            || !self.max_distance.is_finite()
    }

    /// `1 - (distance - min) / (max - min)`, unclamped.
    #[inline]
    pub fn normalize(&self, distance: f32) -> f32 {
        1.0 - (distance - self.min_distance) / (self.max_distance - self.min_distance)
    }

    /// The normalized value scaled onto 0..=255 with rounding and saturation.
    #[inline]
    pub fn to_intensity(&self, distance: f32) -> u8 {
        let scaled = (self.normalize(distance) * 255.0).round();
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(0.0, 255.0) as u8
    }
}

/// What one call to [`BackgroundSegmenter::segment`] hands back.
#[derive(Debug, Clone)]
pub struct SegmentationOutput {
    pub mask: ForegroundMask,
    pub composite: DistanceMap,
    /// Set when this frame became the new background (first frame or a size change).
    pub primed: bool,
}

#[derive(Debug, Default)]
pub struct BackgroundSegmenter {
    composite: Option<DistanceMap>,
}

impl BackgroundSegmenter {
    pub fn new() -> Self {
        Self { composite: None }
    }

    /// True once a first frame has been seen.
    pub fn is_primed(&self) -> bool {
        self.composite.is_some()
    }

    pub fn composite(&self) -> Option<&DistanceMap> {
        self.composite.as_ref()
    }

    /// Forgets the composite; the next frame is treated as a cold start.
    pub fn reset(&mut self) {
        self.composite = None;
    }

    pub fn segment(
        &mut self,
        raw: &DistanceMap,
        window: DistanceWindow,
        binarize_threshold: u8,
    ) -> SegmentationOutput {
        let (width, height) = raw.dimensions();

        let previous = match self.composite.take() {
            Some(previous) if previous.dimensions() == raw.dimensions() => previous,
            stale => {
                if stale.is_some() {
                    debug!(width, height, "frame size changed, restarting background");
                } else {
                    debug!(width, height, "first frame, priming background");
                }
                self.composite = Some(raw.clone());
                return SegmentationOutput {
                    mask: ForegroundMask::empty(width, height),
                    composite: raw.clone(),
                    primed: true,
                };
            }
        };

        let current_values = raw.as_slice();
        let previous_values = previous.as_slice();
        let mut mask = ForegroundMask::empty(width, height);
        let composite = DistanceMap::from_fn(width, height, |x, y| {
            let index = y as usize * width as usize + x as usize;
            let current = current_values[index];
            if window.to_intensity(current) >= binarize_threshold {
                mask.set(x, y, true);
                current
            } else {
                previous_values[index]
            }
        });

        self.composite = Some(composite.clone());
        SegmentationOutput { mask, composite, primed: false }
    }
}
