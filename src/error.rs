use thiserror::Error;

/// 错误严重级别 (决定检测循环的处理方式)
///
/// `Fatal` pauses the loop and is re-thrown to the caller; `Recoverable`
/// is logged and the loop continues at the next scheduled attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Recoverable,
}

/// 检测管线错误分类 (Pipeline error taxonomy)
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed tensor shape or transform invariant violation. Programmer
    /// error, not recoverable within the frame loop.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Non-finite or negative geometry on a single item. Callers skip the
    /// item; the batch operation itself does not fail on this.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Invalid global transform inputs (letterbox record, canvas size).
    #[error("invalid transform input: {0}")]
    InvalidTransform(String),

    /// Depth/orientation estimation failure. Always absorbed at the point
    /// of use; a detection without 3D fields is a valid output.
    #[error("estimation failed: {0}")]
    Estimation(String),

    /// Size registry rejected a registration.
    #[error("invalid object size registration: {0}")]
    Registry(String),

    /// Model or metadata failed to load.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// A required collaborator (camera, canvas, detector) was not wired up
    /// before the loop started.
    #[error("{0} not initialized")]
    NotInitialized(&'static str),

    /// Camera permission denied by the platform. Routed to a dedicated
    /// event; initialization completes in degraded form.
    #[error("camera permission denied")]
    CameraPermissionDenied,

    /// Controller was disposed; no further attempts will start.
    #[error("controller disposed")]
    Disposed,

    /// Anything thrown by the external detector or platform. Treated as
    /// recoverable by default, erring toward availability.
    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::InvalidShape(_)
            | PipelineError::InvalidTransform(_)
            | PipelineError::ModelLoad(_)
            | PipelineError::NotInitialized(_)
            | PipelineError::Disposed => Severity::Fatal,
            PipelineError::InvalidGeometry(_)
            | PipelineError::Estimation(_)
            | PipelineError::Registry(_)
            | PipelineError::CameraPermissionDenied
            | PipelineError::Unexpected(_) => Severity::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
