/// 姿态估计 (Heuristic orientation estimation)
///
/// 宽高比偏差 → roll, 高度比偏差 + 画面垂直位置 → pitch
use crate::detection::{BoundingBox, Orientation};
use crate::error::PipelineError;
use crate::estimate::{EstimationContext, SizeRegistry};

pub const MAX_PITCH_DEG: f32 = 30.0;
pub const MAX_ROLL_DEG: f32 = 45.0;

/// Aspect-ratio-delta gains.
const ROLL_GAIN: f32 = 20.0;
const PITCH_GAIN: f32 = 15.0;
/// Vertical-position bias gain (objects near the top of the frame are
/// biased toward forward tilt).
const VERTICAL_BIAS_GAIN: f32 = 10.0;

/// Default expected aspect ratios when the class is not registered,
/// bucketed by the box's own current ratio.
fn default_expected_ratio(current: f32) -> f32 {
    if current < 0.75 {
        0.5 // tall (person-like)
    } else if current > 1.33 {
        2.0 // wide (vehicle-like)
    } else {
        1.0 // square
    }
}

/// Estimate pitch/roll from the delta between the box's current aspect
/// ratio and the expected one (registered real-world ratio, or a bucketed
/// default).
///
/// The ratio delta drives roll (×20, clamped ±45°); the inverse-ratio
/// delta drives pitch (×15, clamped ±30°), further biased by the box
/// center's vertical position in the frame. Degenerate geometry is a
/// hard failure; the batch wrappers absorb it.
pub fn estimate_orientation(
    bbox: &BoundingBox,
    ctx: &EstimationContext,
    registry: &SizeRegistry,
) -> Result<Orientation, PipelineError> {
    if !bbox.is_finite() || bbox.width <= 0.0 || bbox.height <= 0.0 {
        return Err(PipelineError::Estimation(format!(
            "box dimensions must be > 0, got {}x{}",
            bbox.width, bbox.height
        )));
    }
    if ctx.image_height <= 0.0 || !ctx.image_height.is_finite() {
        return Err(PipelineError::Estimation(format!(
            "image height must be > 0, got {}",
            ctx.image_height
        )));
    }

    let current = bbox.aspect_ratio();
    let expected = ctx
        .class_name
        .as_deref()
        .and_then(|name| registry.lookup(name))
        .map(|s| s.aspect_ratio)
        .unwrap_or_else(|| default_expected_ratio(current));

    let roll = ((current - expected) * ROLL_GAIN).clamp(-MAX_ROLL_DEG, MAX_ROLL_DEG);

    // inverse (height/width) delta; tilting toward the camera compresses
    // the apparent height
    let current_inv = bbox.height / bbox.width;
    let expected_inv = if expected > 0.0 { 1.0 / expected } else { current_inv };
    let mut pitch = (expected_inv - current_inv) * PITCH_GAIN;

    let (_, cy) = bbox.center();
    let vertical = (cy / ctx.image_height).clamp(0.0, 1.0);
    pitch += (0.5 - vertical) * VERTICAL_BIAS_GAIN;
    let pitch = pitch.clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);

    Ok(Orientation { pitch, roll })
}
