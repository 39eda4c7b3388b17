pub mod background_segmenter;
pub mod dataset;
pub mod distance_map;
pub mod feature_extractor;
pub mod foreground_mask;
pub mod geometry;
pub mod gesture;
pub mod utils;
