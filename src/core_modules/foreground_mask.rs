// THEORY:
// A `ForegroundMask` is the per-frame verdict of the segmenter: 255 where a
// pixel belongs to something near and moving (a hand, an arm), 0 for the
// background. It is stored as an `image::GrayImage` so it can go straight into
// `imageproc`'s border following without a conversion step. Transient: a new
// mask is produced every frame and nothing keeps the old one.

use crate::core_modules::geometry::RegionOfInterest;
use image::{GrayImage, Luma};

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundMask {
    image: GrayImage,
}

impl ForegroundMask {
    /// An all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Wraps a gray image; any non-zero pixel counts as foreground.
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.image.get_pixel(x, y).0[0] != BACKGROUND
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { BACKGROUND };
        self.image.put_pixel(x, y, Luma([value]));
    }

    pub fn foreground_count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != BACKGROUND).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// A copy with every pixel outside `roi` cleared to background.
    pub fn restricted_to(&self, roi: &RegionOfInterest) -> Self {
        let roi_mask = roi.to_mask(self.width(), self.height());
        let mut image = self.image.clone();
        for (value, inside) in image.iter_mut().zip(roi_mask.iter()) {
            if *inside == BACKGROUND {
                *value = BACKGROUND;
            }
        }
        Self { image }
    }
}
