/// 脚本化推理后端 (Scripted detector backend)
///
/// 按预设输出逐帧回放, 用于测试与演示
use anyhow::Result;
use ndarray::{Array, IxDyn};

use crate::backend::{Detector, ModelMetadata};

/// One scripted raw detection slot: (x, y, w, h, score, angle),
/// in model-input (letterbox) space.
pub type RawSlot = (f32, f32, f32, f32, f32, f32);

/// A detector that replays scripted outputs and keeps a fake
/// live-tensor count so the memory-pressure path can be exercised.
pub struct StubDetector {
    input_h: usize,
    input_w: usize,
    names: Vec<String>,
    /// Output script, one entry per `run` call; the last entry repeats.
    script: Vec<Vec<RawSlot>>,
    calls: usize,
    live_tensors: usize,
    /// Tensors "retained" per forward pass until `cleanup`.
    leak_per_run: usize,
    fail_with: Option<String>,
}

impl StubDetector {
    pub fn new(input_h: usize, input_w: usize) -> Self {
        Self {
            input_h,
            input_w,
            names: vec!["object".to_string()],
            script: vec![Vec::new()],
            calls: 0,
            live_tensors: 0,
            leak_per_run: 0,
            fail_with: None,
        }
    }

    /// Build a stub whose input shape and class-name table come from
    /// parsed model metadata, like a real engine would.
    pub fn from_metadata(meta: &ModelMetadata) -> Self {
        Self::new(meta.input_height(), meta.input_width()).with_names(meta.name_list())
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Same detections on every frame.
    pub fn with_detections(mut self, slots: Vec<RawSlot>) -> Self {
        self.script = vec![slots];
        self
    }

    /// Per-frame scripted outputs; the last entry repeats forever.
    pub fn with_script(mut self, script: Vec<Vec<RawSlot>>) -> Self {
        assert!(!script.is_empty());
        self.script = script;
        self
    }

    /// Accumulate `n` live tensors per forward pass.
    pub fn leaking(mut self, n: usize) -> Self {
        self.leak_per_run = n;
        self
    }

    /// Fail every forward pass with the given message.
    pub fn failing(mut self, msg: &str) -> Self {
        self.fail_with = Some(msg.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    fn to_tensor(slots: &[RawSlot]) -> Array<f32, IxDyn> {
        let n = slots.len().max(1);
        let mut out = Array::zeros(IxDyn(&[1, 6, n]));
        if slots.is_empty() {
            // one all-zero slot; score 0 never passes a valid threshold
            return out;
        }
        for (i, s) in slots.iter().enumerate() {
            out[[0, 0, i]] = s.0;
            out[[0, 1, i]] = s.1;
            out[[0, 2, i]] = s.2;
            out[[0, 3, i]] = s.3;
            out[[0, 4, i]] = s.4;
            out[[0, 5, i]] = s.5;
        }
        out
    }
}

impl Detector for StubDetector {
    fn input_shape(&self) -> (usize, usize) {
        (self.input_h, self.input_w)
    }

    fn run(&mut self, input: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>> {
        if let Some(msg) = &self.fail_with {
            anyhow::bail!("{}", msg);
        }
        let shape = input.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != self.input_h || shape[2] != self.input_w
        {
            anyhow::bail!(
                "unexpected input shape {:?}, want (1, {}, {}, c)",
                shape,
                self.input_h,
                self.input_w
            );
        }
        let idx = self.calls.min(self.script.len() - 1);
        self.calls += 1;
        self.live_tensors += self.leak_per_run;
        Ok(Self::to_tensor(&self.script[idx]))
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn live_tensors(&self) -> usize {
        self.live_tensors
    }

    fn cleanup(&mut self) {
        self.live_tensors = 0;
    }
}
