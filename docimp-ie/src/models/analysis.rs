//! Content analysis modes and per-file results

use serde::{Deserialize, Serialize};

/// Processing mode chosen on the adaptive-options step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Every eligible file uses OCR
    ForceOcr,
    /// Every eligible file uses direct text extraction
    ForceText,
    /// Decide per file from quality and text density
    Automatic,
}

/// Outcome of analysing one file
///
/// Replaced wholesale by every committed pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_name: String,
    pub needs_ocr: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn decided(file_name: impl Into<String>, needs_ocr: bool) -> Self {
        Self {
            file_name: file_name.into(),
            needs_ocr,
            quality_score: None,
            error: None,
        }
    }

    /// Analysis failed: fall back to OCR
    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            needs_ocr: true,
            quality_score: None,
            error: Some(error.into()),
        }
    }

    pub fn with_quality_score(mut self, score: Option<f32>) -> Self {
        self.quality_score = score;
        self
    }
}
