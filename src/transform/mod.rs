pub mod letterbox;
pub mod remap;

pub use letterbox::{letterbox, LetterboxInfo};
pub use remap::{letterbox_to_original, original_to_canvas, transform_to_canvas};
