// THEORY:
// Small computational-geometry toolkit shared by the feature extractor and the
// region-of-interest masking. Everything works on integer image points
// (`imageproc::point::Point<i32>`, y pointing down) and returns `f64`.
//
// Hulls, contour areas and arc lengths come straight from
// `imageproc::geometry`. What lives here is the part imageproc has no opinion
// on: the signed ROI area (its winding sign is part of the box ratio), the
// first-order moments behind the centroid, and the ROI raster.
//
// Sign convention: `signed_area` uses the shoelace formula as-is, so a polygon
// whose vertices run clockwise on screen (y-down) has a positive area.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;

pub type Point = imageproc::point::Point<i32>;

const AREA_EPSILON: f64 = 1e-9;

/// ROI vertices are clamped to this range before rasterizing, which keeps the
/// polygon filler's integer edge deltas in range for any configured value.
const RASTER_LIMIT: i32 = 1 << 16;

/// Shoelace area of a closed polygon. The sign encodes the winding order.
pub fn signed_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(p, q)| p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64)
        .sum();
    twice_area / 2.0
}

/// Unsigned enclosed area of a contour or hull.
pub fn area(polygon: &[Point]) -> f64 {
    imageproc::geometry::contour_area(polygon).abs()
}

/// Length of the closed outline through `polygon`.
pub fn perimeter(polygon: &[Point]) -> f64 {
    imageproc::geometry::arc_length(polygon, true)
}

/// Zeroth and first order area moments of a closed polygon (Green's theorem).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl PolygonMoments {
    pub fn of(polygon: &[Point]) -> Self {
        let mut moments = Self { m00: 0.0, m10: 0.0, m01: 0.0 };
        if polygon.len() < 3 {
            return moments;
        }
        for (i, p) in polygon.iter().enumerate() {
            let q = polygon[(i + 1) % polygon.len()];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            moments.m00 += cross;
            moments.m10 += (p.x + q.x) as f64 * cross;
            moments.m01 += (p.y + q.y) as f64 * cross;
        }
        moments.m00 /= 2.0;
        moments.m10 /= 6.0;
        moments.m01 /= 6.0;
        moments
    }

    /// `(M10/M00, M01/M00)`, undefined for a polygon without area.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() < AREA_EPSILON {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// The user-drawn polygon that bounds the interaction area.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOfInterest {
    vertices: Vec<Point>,
}

impl RegionOfInterest {
    /// Consecutive duplicates and a repeated closing vertex are removed; the winding is kept.
    pub fn new(vertices: impl IntoIterator<Item = Point>) -> Self {
        let mut vertices: Vec<Point> = vertices.into_iter().collect();
        vertices.dedup();
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }

    /// The whole frame, wound clockwise on screen so its area is positive.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let right = width.saturating_sub(1) as i32;
        let bottom = height.saturating_sub(1) as i32;
        Self::new([
            Point::new(0, 0),
            Point::new(right, 0),
            Point::new(right, bottom),
            Point::new(0, bottom),
        ])
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    /// Rasterizes the polygon into a 0/255 mask of the given size.
    pub fn to_mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        let clamped = Self::new(self.vertices.iter().map(|p| {
            Point::new(
                p.x.clamp(-RASTER_LIMIT, RASTER_LIMIT),
                p.y.clamp(-RASTER_LIMIT, RASTER_LIMIT),
            )
        }));
        if clamped.vertices.len() >= 3 {
            draw_polygon_mut(&mut mask, &clamped.vertices, Luma([255u8]));
        }
        mask
    }
}
