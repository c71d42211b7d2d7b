pub mod decoder;
pub mod types;

pub use decoder::{decode_output, find_valid_detections};
pub use types::{BoundingBox, Detection, Orientation};
