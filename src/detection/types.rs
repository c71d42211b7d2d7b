use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box around an object.
///
/// `(x, y)` is ALWAYS the top-left corner, in whatever pixel space the
/// surrounding stage works in (model space out of the decoder, canvas
/// space after `transform_to_canvas`). The 2D center is derived, never
/// stored, so the two cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Aspect ratio width/height. Zero-height boxes yield 0.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        }
    }

    /// All four fields are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

/// Estimated object tilt, in degrees.
///
/// pitch ∈ [-90, 90], roll ∈ [-180, 180]; the estimator itself clamps
/// pitch to ±30 and roll to ±45.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f32,
    pub roll: f32,
}

/// One observed object in a single frame.
///
/// Created fresh each frame by the decoder, augmented in place by the
/// remapper and the estimator, discarded at end of frame. The optional
/// `depth`/`orientation` fields make this both the 2D and the AR shape;
/// downstream code branches on field presence, not on a type tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    /// Rotation angle. Raw model units (radians) out of the decoder;
    /// degrees after `transform_to_canvas`.
    pub angle: f32,
    /// Confidence in [0, 1].
    pub score: f32,
    /// Class label, attached by the controller from model metadata.
    pub class_name: Option<String>,
    /// Estimated camera distance in meters.
    pub depth: Option<f32>,
    pub orientation: Option<Orientation>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, angle: f32, score: f32) -> Self {
        Self {
            bounding_box,
            angle,
            score,
            class_name: None,
            depth: None,
            orientation: None,
        }
    }
}
