/// 视频输入系统 (Video input system)
///
/// 帧源在此以trait边界接入: 摄像头/解码器的具体实现不在本crate范围内
pub mod stub;

use anyhow::Result;
use ndarray::{Array, IxDyn};
use thiserror::Error;

pub use stub::SyntheticSource;

/// Display surface dimensions (pixels). The remap target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Errors surfaced when opening a frame source.
///
/// Permission denial is a distinct classified condition: the controller
/// routes it to a dedicated event and completes initialization in
/// degraded form instead of crashing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Something that exposes current-frame pixel dimensions and can be
/// sampled as a pixel buffer on demand, with play/pause control.
pub trait FrameSource {
    /// Acquire the underlying stream. Called once by the controller.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Current frame dimensions (width, height) in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Sample the current frame as an (h, w, 3) tensor normalized to [0, 1].
    fn frame(&mut self) -> Result<Array<f32, IxDyn>>;

    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;

    /// Release the stream and its tracks.
    fn close(&mut self);
}
