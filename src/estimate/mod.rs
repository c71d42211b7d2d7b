/// 深度/姿态估计 (Heuristic 3D estimation)
///
/// 2D检测框几何 → 伪3D深度与倾角; 纯启发式, 非标定摄影测量
pub mod depth;
pub mod orientation;
pub mod registry;

use log::debug;

use crate::detection::Detection;

pub use depth::{
    adjust_depth_for_position, estimate_depth_from_motion, estimate_depth_from_size,
    estimate_depth_relative, MAX_DEPTH_M, MIN_DEPTH_M,
};
pub use orientation::{estimate_orientation, MAX_PITCH_DEG, MAX_ROLL_DEG};
pub use registry::{ObjectSize, SizeRegistry};

/// Per-call context for the estimator family.
#[derive(Debug, Clone)]
pub struct EstimationContext {
    /// Focal length in pixels (derive from FOV via `focal_length_from_fov`).
    pub focal_length: f32,
    /// Frame dimensions the boxes are expressed in, pixels.
    pub image_width: f32,
    pub image_height: f32,
    /// Class to resolve against the size registry, if known.
    pub class_name: Option<String>,
}

impl EstimationContext {
    fn for_detection(&self, det: &Detection) -> EstimationContext {
        let mut ctx = self.clone();
        if det.class_name.is_some() {
            ctx.class_name = det.class_name.clone();
        }
        ctx
    }
}

/// Pinhole focal length in pixels for a horizontal field of view in
/// degrees: `0.5 * imageWidth / tan(fov / 2)`.
pub fn focal_length_from_fov(fov_deg: f32, image_width: f32) -> f32 {
    let half = crate::deg_to_rad(fov_deg) / 2.0;
    0.5 * image_width / half.tan()
}

/// Best-effort depth augmentation for a batch.
///
/// Per detection the paths are tried in order: size/relative depth first,
/// motion parallax only when the geometric paths produced nothing and
/// previous-frame detections plus a time delta are available. The winner
/// gets the ground-plane position adjustment. Every failure is absorbed
/// and the detection returned unmodified — estimation must never abort
/// the frame.
pub fn add_depth_to_detections(
    detections: &mut [Detection],
    ctx: &EstimationContext,
    registry: &SizeRegistry,
    previous: Option<(&[Detection], f32)>,
) {
    for det in detections.iter_mut() {
        let det_ctx = ctx.for_detection(det);
        let base = match estimate_depth_from_size(&det.bounding_box, &det_ctx, registry) {
            Ok(d) => Some(d),
            Err(e) => {
                debug!("depth estimation skipped: {}", e);
                None
            }
        };
        let depth = base.or_else(|| {
            previous.and_then(|(prev, dt)| estimate_depth_from_motion(det, prev, dt, &det_ctx))
        });

        det.depth =
            depth.map(|d| adjust_depth_for_position(d, &det.bounding_box, ctx.image_height));
    }
}

/// Best-effort depth + orientation augmentation. Same absorb-everything
/// policy as `add_depth_to_detections`.
pub fn add_3d_to_detections(
    detections: &mut [Detection],
    ctx: &EstimationContext,
    registry: &SizeRegistry,
    previous: Option<(&[Detection], f32)>,
) {
    add_depth_to_detections(detections, ctx, registry, previous);
    for det in detections.iter_mut() {
        let det_ctx = ctx.for_detection(det);
        match estimate_orientation(&det.bounding_box, &det_ctx, registry) {
            Ok(o) => det.orientation = Some(o),
            Err(e) => debug!("orientation estimation skipped: {}", e),
        }
    }
}
