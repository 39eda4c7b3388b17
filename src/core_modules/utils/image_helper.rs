pub mod image_helper {
    use crate::core_modules::background_segmenter::DistanceWindow;
    use crate::core_modules::distance_map::DistanceMap;
    use crate::core_modules::foreground_mask::ForegroundMask;
    use image::ImageEncoder;
    use std::path::Path;

    fn save_gray(path: &Path, width: u32, height: u32, buffer: &[u8]) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, image::ExtendedColorType::L8)?;

        Ok(())
    }

    /// Writes the mask as an 8-bit grayscale PNG (foreground white).
    pub fn save_mask(path: impl AsRef<Path>, mask: &ForegroundMask) -> Result<(), image::error::ImageError> {
        let image = mask.as_image();
        save_gray(path.as_ref(), image.width(), image.height(), image.as_raw())
    }

    /// Writes a distance map as grayscale, near readings bright, using the same
    /// normalization the segmenter binarizes.
    pub fn save_distance_map(
        path: impl AsRef<Path>,
        map: &DistanceMap,
        window: DistanceWindow,
    ) -> Result<(), image::error::ImageError> {
        let buffer: Vec<u8> = map.as_slice().iter().map(|&d| window.to_intensity(d)).collect();
        save_gray(path.as_ref(), map.width(), map.height(), &buffer)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::background_segmenter::DistanceWindow;
    use crate::core_modules::distance_map::DistanceMap;
    use crate::core_modules::foreground_mask::ForegroundMask;
    use tempfile::tempdir;

    #[test]
    fn save_mask_file() {
        let dir = tempdir().unwrap();
        let mut mask = ForegroundMask::empty(40, 30);
        for x in 10..20 {
            mask.set(x, 15, true);
        }
        let name = dir.path().join("mask.png");

        save_mask(&name, &mask).expect("Error Saving File.");

        let reloaded = image::open(&name).unwrap().into_luma8();
        assert_eq!(reloaded.dimensions(), (40, 30));
        assert_eq!(reloaded.get_pixel(12, 15).0[0], 255);
        assert_eq!(reloaded.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn save_gradient_distance_file() {
        let dir = tempdir().unwrap();
        let map = DistanceMap::from_fn(64, 8, |x, _| 0.5 + x as f32 / 63.0);
        let window = DistanceWindow::new(0.5, 1.5);
        let name = dir.path().join("depth.png");

        save_distance_map(&name, &map, window).expect("Error Saving File.");

        let reloaded = image::open(&name).unwrap().into_luma8();
        assert_eq!(reloaded.get_pixel(0, 0).0[0], 255);
        assert_eq!(reloaded.get_pixel(63, 0).0[0], 0);
    }
}
