// THEORY:
// The feature extractor is the spatial layer. It turns a binary foreground mask
// into a list of `GestureBlob`s, each carrying a fixed-size numeric signature a
// classifier can learn from.
//
// Algorithm steps:
// 1.  **ROI restriction**: everything outside the region-of-interest polygon is
//     cleared. The ROI's signed area is kept as the "box" denominator, winding
//     sign included, so callers must wind their ROI consistently.
// 2.  **Border following**: `imageproc`'s Suzuki-Abe tracer yields every border,
//     outer boundaries and holes alike, in raster order of their start pixels.
//     That order is the result order, which keeps index-based labeling stable.
//     The tracer does not treat off-image pixels as background, so the mask is
//     traced inside a one-pixel empty frame and the points shifted back. A hand
//     entering from the frame edge is then an outer border like any other.
// 3.  **Hull + centroid**: each contour gets `imageproc`'s convex hull; the
//     hull's first-order moments give the centroid.
// 4.  **Radial statistics**: distance and direction of every contour point from
//     the centroid. Directions feed a circular mean (vector sum of unit
//     directions) and a 10-slice histogram measured from that mean, so the
//     histogram rotates with the hand instead of the camera.
// 5.  **Ratios**: contour against hull (area, perimeter, vertex count) and
//     contour area against the ROI.
//
// A blob whose hull has no area, whose contour is empty, or whose ratios come
// out non-finite is dropped rather than reported with NaN/inf features.
// Stateless: nothing is remembered between calls.

use crate::core_modules::foreground_mask::ForegroundMask;
use crate::core_modules::geometry::{self, Point, PolygonMoments, RegionOfInterest};
use crate::core_modules::gesture::{
    BorderKind, GestureBlob, GestureFeatures, GestureLabel, RADIAL_SLICES,
};
use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use std::f64::consts::{PI, TAU};
use tracing::debug;

pub mod feature_extractor {
    use super::*;

    /// Traces every foreground border inside `roi` and describes each one.
    pub fn extract_features(mask: &ForegroundMask, roi: &RegionOfInterest) -> Vec<GestureBlob> {
        let roi_area = roi.signed_area();
        if roi_area == 0.0 || !roi_area.is_finite() {
            debug!(roi_area, "region of interest has no area, skipping extraction");
            return Vec::new();
        }

        let restricted = mask.restricted_to(roi);
        if restricted.foreground_count() == 0 {
            return Vec::new();
        }

        let contours = trace_borders(restricted.as_image());
        let traced = contours.len();

        let blobs: Vec<GestureBlob> = contours
            .into_iter()
            .enumerate()
            .filter_map(|(trace_index, contour)| {
                let border = match contour.border_type {
                    BorderType::Outer => BorderKind::Outer,
                    BorderType::Hole => BorderKind::Hole,
                };
                let parent = contour.parent;
                describe_contour(contour.points, roi_area).map(|blob| GestureBlob {
                    border,
                    parent,
                    trace_index,
                    ..blob
                })
            })
            .collect();

        debug!(traced, kept = blobs.len(), "extracted gesture features");
        blobs
    }

    /// Suzuki-Abe border following with everything outside `image` treated as
    /// background. Points are in `image` coordinates; parents are unchanged.
    fn trace_borders(image: &GrayImage) -> Vec<Contour<i32>> {
        let mut framed = GrayImage::new(image.width() + 2, image.height() + 2);
        image::imageops::replace(&mut framed, image, 1, 1);

        let mut contours = find_contours::<i32>(&framed);
        for contour in &mut contours {
            for point in &mut contour.points {
                *point = Point::new(point.x - 1, point.y - 1);
            }
        }
        contours
    }

    /// Builds the blob for a single closed contour, or `None` when the shape is
    /// degenerate. The result is marked as an outer border with trace index 0.
    pub fn describe_contour(contour: Vec<Point>, roi_area: f64) -> Option<GestureBlob> {
        if contour.is_empty() {
            return None;
        }

        let hull = imageproc::geometry::convex_hull(contour.as_slice());
        let hull_area = geometry::area(&hull);
        let hull_perimeter = geometry::perimeter(&hull);
        if hull_area <= 0.0 || hull_perimeter <= 0.0 {
            return None;
        }
        let (cx, cy) = PolygonMoments::of(&hull).centroid()?;

        let contour_area = geometry::area(&contour);
        let contour_perimeter = geometry::perimeter(&contour);

        let mut angles = Vec::with_capacity(contour.len());
        let mut directions = Vec::with_capacity(contour.len());
        let mut min_distance = f64::INFINITY;
        let mut max_distance = f64::NEG_INFINITY;
        let mut total_distance = 0.0;

        for point in &contour {
            let dx = point.x as f64 - cx;
            let dy = point.y as f64 - cy;
            let distance = dx.hypot(dy);
            let angle = dy.atan2(dx);

            min_distance = min_distance.min(distance);
            max_distance = max_distance.max(distance);
            total_distance += distance;
            angles.push(angle);
            // A point sitting on the centroid has no direction.
            if distance > 0.0 {
                directions.push(angle);
            }
        }

        let average_angle = circular_mean(directions);
        let features = GestureFeatures {
            area_ratio_to_box: contour_area / roi_area,
            area_ratio_to_hull: contour_area / hull_area,
            perimeter_ratio_to_hull: contour_perimeter / hull_perimeter,
            max_radial_distance: max_distance,
            min_radial_distance: min_distance,
            average_radial_distance: total_distance / contour.len() as f64,
            point_count_ratio_to_hull: hull.len() as f64 / contour.len() as f64,
            average_angle,
            radial_histogram: radial_histogram(&angles, average_angle),
            label: GestureLabel::None,
        };

        let scalars = [
            features.area_ratio_to_box,
            features.area_ratio_to_hull,
            features.perimeter_ratio_to_hull,
            features.max_radial_distance,
            features.min_radial_distance,
            features.average_radial_distance,
            features.point_count_ratio_to_hull,
            features.average_angle,
        ];
        if scalars.iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(GestureBlob {
            contour,
            hull,
            centroid: (cx, cy),
            border: BorderKind::Outer,
            parent: None,
            trace_index: 0,
            features,
        })
    }

    /// Mean direction of a set of angles via the sum of their unit vectors, in (-pi, pi].
    /// An empty or perfectly balanced set has mean 0.
    pub fn circular_mean(angles: impl IntoIterator<Item = f64>) -> f64 {
        let (sum_y, sum_x) = angles
            .into_iter()
            .fold((0.0f64, 0.0f64), |(sy, sx), angle: f64| (sy + angle.sin(), sx + angle.cos()));
        let mean = sum_y.atan2(sum_x);
        if mean <= -PI { PI } else { mean }
    }

    /// Counts angles per slice of the full turn, starting at `reference`.
    pub fn radial_histogram(angles: &[f64], reference: f64) -> [u32; RADIAL_SLICES] {
        let offset = TAU - reference;
        let slice_width = TAU / RADIAL_SLICES as f64;
        let mut histogram = [0u32; RADIAL_SLICES];
        for &angle in angles {
            let rotated = (angle + offset).rem_euclid(TAU);
            // rem_euclid can land on TAU itself after rounding.
            let slice = ((rotated / slice_width) as usize).min(RADIAL_SLICES - 1);
            histogram[slice] += 1;
        }
        histogram
    }
}
