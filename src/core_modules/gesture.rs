// THEORY:
// Data containers for the output of the spatial layer. A `GestureBlob` is one
// traced foreground region in one frame: its boundary, its hull, where its
// centroid sits, and the `GestureFeatures` that summarize its shape. Like the
// distance map, these are "dumb" structs; all the math that fills them lives in
// `feature_extractor`.
//
// `GestureFeatures` is also the record type of the dataset. Its field order is
// the column order of the dataset file, and its label is the only thing that
// changes after extraction (an operator tags the blob, then commits it).

use crate::core_modules::geometry::Point;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of angular slices in the radial histogram.
pub const RADIAL_SLICES: usize = 10;

/// The fixed gesture vocabulary. The discriminant is the code stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum GestureLabel {
    #[default]
    None = 0,
    HighFive = 1,
    Ok = 2,
    Peace = 3,
    Rock = 4,
    Judgement = 5,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 6] = [
        GestureLabel::None,
        GestureLabel::HighFive,
        GestureLabel::Ok,
        GestureLabel::Peace,
        GestureLabel::Rock,
        GestureLabel::Judgement,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.code() as i64 == code)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GestureLabel::None => "None",
            GestureLabel::HighFive => "High Five",
            GestureLabel::Ok => "OK",
            GestureLabel::Peace => "Peace",
            GestureLabel::Rock => "Rock",
            GestureLabel::Judgement => "Judgement",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gesture label {0:?}")]
pub struct UnknownLabel(pub String);

impl TryFrom<i64> for GestureLabel {
    type Error = UnknownLabel;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| UnknownLabel(code.to_string()))
    }
}

/// Accepts the numeric code, the display name or the variant name, ignoring
/// case, spaces, dashes and underscores ("3", "peace", "High Five", "high_five").
impl FromStr for GestureLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::try_from(code);
        }
        let squashed: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|label| {
                label.display_name().replace(' ', "").to_lowercase() == squashed
                    || format!("{label:?}").to_lowercase() == squashed
            })
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// The fixed-layout shape signature of one blob.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureFeatures {
    /// Contour area over the signed area of the region of interest.
    pub area_ratio_to_box: f64,
    /// Contour area over hull area.
    pub area_ratio_to_hull: f64,
    /// Contour perimeter over hull perimeter.
    pub perimeter_ratio_to_hull: f64,
    pub max_radial_distance: f64,
    pub min_radial_distance: f64,
    pub average_radial_distance: f64,
    /// Hull vertex count over contour vertex count.
    pub point_count_ratio_to_hull: f64,
    /// Circular mean direction of the boundary around the centroid, in (-pi, pi].
    pub average_angle: f64,
    /// Boundary points per angular slice, measured from `average_angle`.
    pub radial_histogram: [u32; RADIAL_SLICES],
    pub label: GestureLabel,
}

impl GestureFeatures {
    pub fn histogram_total(&self) -> u64 {
        self.radial_histogram.iter().map(|&count| count as u64).sum()
    }
}

/// Whether a traced border is the outside of a region or a hole inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    Outer,
    Hole,
}

/// One detected foreground region in the current frame.
#[derive(Debug, Clone)]
pub struct GestureBlob {
    /// The traced boundary, every border pixel in trace order.
    pub contour: Vec<Point>,
    pub hull: Vec<Point>,
    /// Hull centroid from first-order moments.
    pub centroid: (f64, f64),
    pub border: BorderKind,
    /// Position of this border in the frame's full trace, degenerate borders included.
    pub trace_index: usize,
    /// `trace_index` of the enclosing border, if any.
    pub parent: Option<usize>,
    pub features: GestureFeatures,
}

impl GestureBlob {
    /// End point of an orientation indicator of `length` pixels drawn from the centroid.
    pub fn orientation_endpoint(&self, length: f64) -> (f64, f64) {
        let angle = self.features.average_angle;
        (
            self.centroid.0 + length * angle.cos(),
            self.centroid.1 + length * angle.sin(),
        )
    }
}
