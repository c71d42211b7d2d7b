/// 坐标重映射 (Coordinate remapper)
///
/// letterbox空间 → 裁剪区域空间 → 画布空间的仿射变换链
use log::debug;

use crate::detection::{BoundingBox, Detection};
use crate::error::PipelineError;
use crate::input::CanvasSize;
use crate::rad_to_deg;
use crate::transform::LetterboxInfo;

/// Inverse of the letterbox transform: map a rectangle from model-input
/// space back to the (cropped) source space.
///
/// Fatal for this call when any input is non-finite, `scale <= 0`, or
/// width/height negative.
pub fn letterbox_to_original(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    scale: f32,
    top: f32,
    left: f32,
) -> Result<BoundingBox, PipelineError> {
    let inputs = [x, y, width, height, scale, top, left];
    if inputs.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::InvalidGeometry(
            "non-finite letterbox input".into(),
        ));
    }
    if scale <= 0.0 {
        return Err(PipelineError::InvalidGeometry(format!(
            "letterbox scale must be > 0, got {}",
            scale
        )));
    }
    if width < 0.0 || height < 0.0 {
        return Err(PipelineError::InvalidGeometry(format!(
            "negative box size {}x{}",
            width, height
        )));
    }

    Ok(BoundingBox::new(
        (x - left) / scale,
        (y - top) / scale,
        width / scale,
        height / scale,
    ))
}

/// Map a crop-region-relative rectangle to canvas pixels with a uniform,
/// aspect-preserving scale `min(canvasW/croppedW, canvasH/croppedH)`.
pub fn original_to_canvas(
    rect: &BoundingBox,
    canvas: CanvasSize,
    cropped_width: f32,
    cropped_height: f32,
) -> Result<BoundingBox, PipelineError> {
    if !cropped_width.is_finite()
        || !cropped_height.is_finite()
        || cropped_width <= 0.0
        || cropped_height <= 0.0
    {
        return Err(PipelineError::InvalidTransform(format!(
            "invalid cropped size {}x{}",
            cropped_width, cropped_height
        )));
    }
    if !canvas.width.is_finite() || !canvas.height.is_finite() || canvas.width <= 0.0 || canvas.height <= 0.0 {
        return Err(PipelineError::InvalidTransform(format!(
            "invalid canvas size {}x{}",
            canvas.width, canvas.height
        )));
    }

    let scale = (canvas.width / cropped_width).min(canvas.height / cropped_height);
    Ok(BoundingBox::new(
        rect.x * scale,
        rect.y * scale,
        rect.width * scale,
        rect.height * scale,
    ))
}

/// Remap every detection from letterbox/model space into canvas space.
///
/// Per-item failures (non-finite geometry, negative sizes, remap errors)
/// drop that detection from the output silently; only missing/invalid
/// global inputs — absent `cropped_width`/`cropped_height`, bad canvas,
/// bad `scale`/`top`/`left` — fail the whole call. The angle is converted
/// from radians to degrees at this step. An empty input list
/// short-circuits to an empty result without touching the other arguments.
pub fn transform_to_canvas(
    detections: Vec<Detection>,
    info: &LetterboxInfo,
    canvas: CanvasSize,
) -> Result<Vec<Detection>, PipelineError> {
    if detections.is_empty() {
        return Ok(Vec::new());
    }

    let (cropped_w, cropped_h) = match (info.cropped_width, info.cropped_height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(PipelineError::InvalidTransform(
                "letterbox record is missing the crop dimensions".into(),
            ))
        }
    };
    if !info.scale.is_finite() || info.scale <= 0.0 || !info.top.is_finite() || !info.left.is_finite()
    {
        return Err(PipelineError::InvalidTransform(format!(
            "invalid letterbox record scale={} top={} left={}",
            info.scale, info.top, info.left
        )));
    }
    if !canvas.width.is_finite() || !canvas.height.is_finite() || canvas.width <= 0.0 || canvas.height <= 0.0 {
        return Err(PipelineError::InvalidTransform(format!(
            "invalid canvas size {}x{}",
            canvas.width, canvas.height
        )));
    }

    let mut out = Vec::with_capacity(detections.len());
    for mut det in detections {
        let b = det.bounding_box;
        if !b.is_finite() || b.width < 0.0 || b.height < 0.0 {
            debug!("dropping detection with invalid geometry: {:?}", b);
            continue;
        }
        let original = match letterbox_to_original(
            b.x, b.y, b.width, b.height, info.scale, info.top, info.left,
        ) {
            Ok(r) => r,
            Err(e) => {
                debug!("dropping detection, letterbox inverse failed: {}", e);
                continue;
            }
        };
        let mapped = match original_to_canvas(&original, canvas, cropped_w, cropped_h) {
            Ok(r) => r,
            Err(_) => continue,
        };
        det.bounding_box = mapped;
        det.angle = rad_to_deg(det.angle);
        out.push(det);
    }
    Ok(out)
}
