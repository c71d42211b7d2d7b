/// 深度估计 (Heuristic depth estimation)
///
/// 三条路径: 已知尺寸 → 相对面积 → 运动视差; 外加地平面位置修正
use crate::detection::{BoundingBox, Detection};
use crate::error::PipelineError;
use crate::estimate::{EstimationContext, SizeRegistry};

/// Relative-path depth bounds, meters.
pub const MIN_DEPTH_M: f32 = 0.5;
pub const MAX_DEPTH_M: f32 = 50.0;

/// Width/height estimates within this relative tolerance are fused.
const AGREEMENT_TOLERANCE: f32 = 0.25;

/// Motion matching radius, pixels.
const MOTION_MATCH_RADIUS_PX: f32 = 100.0;
/// Disparity below this is noise, not motion.
const MIN_DISPARITY_PX: f32 = 1.0;

/// Estimate camera distance for a bounding box.
///
/// Known-size path when the class is registered: the width- and
/// height-derived pinhole estimates are averaged when they agree within
/// 25%, otherwise the estimate from the larger box dimension wins (the
/// one less likely to be foreshortened). No artificial ceiling on this
/// path. Without a registered class, falls back to the relative path.
///
/// Invalid geometry (non-positive focal length or box dimensions) is a
/// hard failure here; the batch wrappers absorb it.
pub fn estimate_depth_from_size(
    bbox: &BoundingBox,
    ctx: &EstimationContext,
    registry: &SizeRegistry,
) -> Result<f32, PipelineError> {
    validate_geometry(bbox, ctx)?;

    let known = ctx
        .class_name
        .as_deref()
        .and_then(|name| registry.lookup(name));
    let size = match known {
        Some(s) => s,
        None => return estimate_depth_relative(bbox, ctx),
    };

    let depth_from_width = size.width * ctx.focal_length / bbox.width;
    let depth_from_height = size.height * ctx.focal_length / bbox.height;

    let spread = (depth_from_width - depth_from_height).abs()
        / depth_from_width.max(depth_from_height);
    let depth = if spread <= AGREEMENT_TOLERANCE {
        (depth_from_width + depth_from_height) / 2.0
    } else if bbox.height > bbox.width {
        depth_from_height
    } else {
        depth_from_width
    };
    Ok(depth)
}

/// Depth from the box's area ratio to the frame area, corrected for the
/// box center's distance from the image center (perspective pushes
/// off-center objects further), clamped to [0.5, 50] m.
pub fn estimate_depth_relative(
    bbox: &BoundingBox,
    ctx: &EstimationContext,
) -> Result<f32, PipelineError> {
    validate_geometry(bbox, ctx)?;

    let image_area = ctx.image_width * ctx.image_height;
    let base = (image_area / bbox.area()).sqrt() * ctx.focal_length / 100.0;

    let (cx, cy) = bbox.center();
    let dx = cx - ctx.image_width / 2.0;
    let dy = cy - ctx.image_height / 2.0;
    let half_diagonal = (ctx.image_width * ctx.image_width
        + ctx.image_height * ctx.image_height)
        .sqrt()
        / 2.0;
    let d_norm = (dx * dx + dy * dy).sqrt() / half_diagonal;

    let depth = base * (1.0 + 0.3 * d_norm);
    Ok(depth.clamp(MIN_DEPTH_M, MAX_DEPTH_M))
}

/// Motion-parallax depth: match against the nearest previous-frame
/// detection within 100 px, convert pixel velocity over `delta_time`
/// seconds to a depth via an empirical inverse relation. Returns `None`
/// (no estimate) when there is no match in range or the disparity is
/// below 1 px.
pub fn estimate_depth_from_motion(
    det: &Detection,
    previous: &[Detection],
    delta_time: f32,
    ctx: &EstimationContext,
) -> Option<f32> {
    if delta_time <= 0.0 || !delta_time.is_finite() {
        return None;
    }
    let (cx, cy) = det.bounding_box.center();
    let nearest = previous
        .iter()
        .map(|p| {
            let (px, py) = p.bounding_box.center();
            ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
        })
        .filter(|d| d.is_finite())
        .fold(None::<f32>, |best, d| match best {
            Some(b) if b <= d => Some(b),
            _ => Some(d),
        })?;

    if nearest > MOTION_MATCH_RADIUS_PX || nearest < MIN_DISPARITY_PX {
        return None;
    }
    let velocity = nearest / delta_time; // px/s
    if velocity <= 0.0 {
        return None;
    }
    // faster apparent motion → closer object
    let depth = 0.5 * ctx.focal_length / velocity;
    Some(depth.clamp(MIN_DEPTH_M, MAX_DEPTH_M))
}

/// Ground-plane position correction: boxes whose bottom edge sits lower
/// in the frame are closer in typical perspective. Multiplicative factor
/// linear in normalized bottom-Y, in [0.6, 1.4].
pub fn adjust_depth_for_position(depth: f32, bbox: &BoundingBox, image_height: f32) -> f32 {
    if image_height <= 0.0 || !image_height.is_finite() {
        return depth;
    }
    let bottom = ((bbox.y + bbox.height) / image_height).clamp(0.0, 1.0);
    let factor = 1.4 - 0.8 * bottom;
    depth * factor
}

fn validate_geometry(bbox: &BoundingBox, ctx: &EstimationContext) -> Result<(), PipelineError> {
    if !ctx.focal_length.is_finite() || ctx.focal_length <= 0.0 {
        return Err(PipelineError::Estimation(format!(
            "focal length must be > 0, got {}",
            ctx.focal_length
        )));
    }
    if !bbox.is_finite() || bbox.width <= 0.0 || bbox.height <= 0.0 {
        return Err(PipelineError::Estimation(format!(
            "box dimensions must be > 0, got {}x{}",
            bbox.width, bbox.height
        )));
    }
    if ctx.image_width <= 0.0 || ctx.image_height <= 0.0 {
        return Err(PipelineError::Estimation(format!(
            "image dimensions must be > 0, got {}x{}",
            ctx.image_width, ctx.image_height
        )));
    }
    Ok(())
}
