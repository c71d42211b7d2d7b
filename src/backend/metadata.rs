/// 模型元数据 (Model metadata)
///
/// JSON文本 → 输入尺寸 + 类别名称表
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Parsed model metadata: the detector's expected input shape and its
/// class-name table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Input shape as `[width, height]`.
    pub imgsz: [usize; 2],
    /// Class index → name.
    #[serde(default)]
    pub names: BTreeMap<usize, String>,
}

impl ModelMetadata {
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let meta: ModelMetadata = serde_json::from_str(text)
            .map_err(|e| PipelineError::ModelLoad(format!("metadata parse error: {}", e)))?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.imgsz[0] == 0 || self.imgsz[1] == 0 {
            return Err(PipelineError::ModelLoad(format!(
                "invalid imgsz {:?}",
                self.imgsz
            )));
        }
        Ok(())
    }

    pub fn input_width(&self) -> usize {
        self.imgsz[0]
    }

    pub fn input_height(&self) -> usize {
        self.imgsz[1]
    }

    /// Class names ordered by index.
    pub fn name_list(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }
}
