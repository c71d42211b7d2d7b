#![allow(clippy::type_complexity)]
pub mod backend; // 推理后端接口 (detector boundary)
pub mod detection; // 检测结果类型与解码器
pub mod error;
pub mod estimate; // 深度/姿态估计 (heuristic 3D)
pub mod input; // 视频输入系统
pub mod pipeline; // 检测循环与帧控制器
pub mod transform; // 坐标变换链 (letterbox / remap)

pub use crate::backend::{Detector, ModelMetadata, StubDetector};
pub use crate::detection::{
    decode_output, find_valid_detections, BoundingBox, Detection, Orientation,
};
pub use crate::error::{PipelineError, Severity};
pub use crate::estimate::{
    add_3d_to_detections, add_depth_to_detections, focal_length_from_fov, EstimationContext,
    ObjectSize, SizeRegistry,
};
pub use crate::input::{CanvasSize, FrameSource, SourceError, SyntheticSource};
pub use crate::pipeline::{
    shared_registry, CropRegion, DetectionController, DetectionEvent, LoopState, PipelineConfig,
};
pub use crate::transform::{
    letterbox, letterbox_to_original, original_to_canvas, transform_to_canvas, LetterboxInfo,
};

/// Convert radians to degrees.
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / std::f32::consts::PI
}

/// Convert degrees to radians.
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rad_deg_round_trip() {
        let deg = 73.5;
        let back = rad_to_deg(deg_to_rad(deg));
        assert!((back - deg).abs() < 1e-4);
    }

    #[test]
    fn test_rad_to_deg_known_values() {
        assert!((rad_to_deg(std::f32::consts::PI) - 180.0).abs() < 1e-3);
        assert!(rad_to_deg(0.0).abs() < 1e-6);
    }
}
