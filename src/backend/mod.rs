/// 推理后端接口 (Inference backend boundary)
///
/// 执行引擎 (onnxruntime / tfjs / ...) 对本crate不可见, 只暴露张量进出
pub mod metadata;
pub mod stub;

use anyhow::Result;
use ndarray::{Array, IxDyn};

pub use metadata::ModelMetadata;
pub use stub::StubDetector;

/// An opaque detector: maps a fixed-size batched image tensor to a raw
/// per-detection output tensor.
///
/// Input shape is `(1, input_h, input_w, channels)` normalized to [0, 1];
/// output is a tensor from which a `(rows >= 5, n)` matrix can be
/// extracted after squeezing the batch axis (rows: x, y, w, h, score,
/// optional angle).
pub trait Detector {
    /// Expected input shape (height, width).
    fn input_shape(&self) -> (usize, usize);

    /// One forward pass.
    fn run(&mut self, input: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>>;

    /// Class-name table from the model metadata.
    fn class_names(&self) -> &[String];

    /// Number of live backend-resident tensor handles. Observability
    /// input for the controller's memory-pressure hook.
    fn live_tensors(&self) -> usize {
        0
    }

    /// Release cached backend variables. Called by the controller when
    /// `live_tensors` exceeds the configured threshold, and on dispose.
    fn cleanup(&mut self) {}
}
