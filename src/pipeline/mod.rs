/// 检测管线 (Detection pipeline)
///
/// 帧控制器、配置、事件通道与默认尺寸注册表 (wiring layer)
pub mod controller;
pub mod crop;

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::estimate::SizeRegistry;

pub use controller::{DetectionController, LoopState};
pub use crop::{compute_crop, CropRegion};

/// Process-wide default size registry.
///
/// Physical object dimensions are process-level constants, so one shared
/// instance is a reasonable default at the wiring layer; controllers can
/// still be handed an isolated registry.
static SHARED_REGISTRY: Lazy<Arc<SizeRegistry>> = Lazy::new(|| Arc::new(SizeRegistry::new()));

pub fn shared_registry() -> Arc<SizeRegistry> {
    Arc::clone(&SHARED_REGISTRY)
}

/// 管线配置 (Pipeline configuration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum wall-clock time between detection attempts, ms.
    pub inference_interval_ms: u64,
    /// Score threshold for the decoder, [0, 1].
    pub score_threshold: f32,
    /// Live-tensor count above which a cleanup pass is triggered.
    pub tensor_cleanup_threshold: usize,
    /// Single-shot UX: pause video and loop after the first frame with a
    /// detection. Continuous mode notifies every frame, empty or not.
    pub pause_on_detection: bool,
    /// Camera horizontal field of view, degrees.
    pub camera_fov_deg: f32,
    /// Run the depth/orientation estimator on remapped detections.
    pub estimate_3d: bool,
    /// Debounce before resume re-enters the idle state, ms.
    pub resume_settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference_interval_ms: 500,
            score_threshold: 0.7,
            tensor_cleanup_threshold: 50,
            pause_on_detection: false,
            camera_fov_deg: 50.0,
            estimate_3d: false,
            resume_settle_ms: 1000,
        }
    }
}

/// 检测事件 (控制器 → 应用)
///
/// Replaces DOM-style lifecycle callbacks with a typed channel so the
/// control flow is testable without platform mocks.
#[derive(Debug, Clone)]
pub enum DetectionEvent {
    /// Camera stream acquired; the loop can produce frames.
    CameraReady,
    /// Platform denied camera access; initialization completed degraded.
    CameraDenied,
    /// One completed processing attempt: the top-scoring detection, or
    /// `None` for a frame with no detections.
    Frame(Option<Detection>),
    /// Live tensor handles exceeded the cleanup threshold.
    MemoryPressure { live: usize, threshold: usize },
}
