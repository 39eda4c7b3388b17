// THEORY:
// The `DistanceMap` is the raw material of the whole engine: a calibrated grid
// of distance-from-sensor readings in meters, one `f32` per pixel, row-major.
// It is a "dumb" data container. The acquisition side builds one per frame and
// every later stage only reads it.
//
// Depth cameras usually hand out 16-bit images in device units, so the map can
// be built straight from an `image` buffer with a per-device depth scale. A
// reading of zero means "no return" and simply becomes 0.0 m; the segmenter
// treats it like any other (very near) value.

use crate::error::DistanceMapError;
use image::{ImageBuffer, Luma};

/// Meters per depth unit for the common 1 mm depth format.
pub const DEFAULT_DEPTH_SCALE: f32 = 0.001;

/// A row-major grid of distances in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DistanceMap {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, DistanceMapError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DistanceMapError::DimensionMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A map with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Builds a map by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Converts a 16-bit depth image (device units) into meters.
    pub fn from_depth_image(image: &ImageBuffer<Luma<u16>, Vec<u16>>, depth_scale: f32) -> Self {
        let data = image.pixels().map(|p| p.0[0] as f32 * depth_scale).collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Distance at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(self.index(x, y)).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
