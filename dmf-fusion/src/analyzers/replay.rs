//! Replay analyzers
//!
//! Serve a captured analyzer payload from a JSON file instead of calling a
//! model. They need no credentials.

use crate::types::{
    AnalyzerError, DesignDocument, ScreenshotDescriptor, TextAnalyzer, VisionAnalyzer,
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

async fn read_payload(path: &Path) -> Result<Value, AnalyzerError> {
    let content = tokio::fs::read_to_string(path).await?;
    let payload = serde_json::from_str(&content)
        .map_err(|e| AnalyzerError::Parse(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Loaded replay payload");
    Ok(payload)
}

/// Text analyzer replaying a captured payload
#[derive(Debug, Clone)]
pub struct ReplayTextAnalyzer {
    path: PathBuf,
}

impl ReplayTextAnalyzer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TextAnalyzer for ReplayTextAnalyzer {
    fn name(&self) -> &'static str {
        "replay-text"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _design: &DesignDocument) -> Result<Value, AnalyzerError> {
        read_payload(&self.path).await
    }
}

/// Vision analyzer replaying a captured payload
#[derive(Debug, Clone)]
pub struct ReplayVisionAnalyzer {
    path: PathBuf,
}

impl ReplayVisionAnalyzer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VisionAnalyzer for ReplayVisionAnalyzer {
    fn name(&self) -> &'static str {
        "replay-vision"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, screenshots: &[ScreenshotDescriptor]) -> Result<Value, AnalyzerError> {
        if screenshots.is_empty() {
            return Ok(serde_json::json!({}));
        }
        read_payload(&self.path).await
    }
}

/// Text analyzer standing in when no text result is available
///
/// Always fails, so the coordinator records an advisory and moves on.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTextAnalyzer;

#[async_trait]
impl TextAnalyzer for UnavailableTextAnalyzer {
    fn name(&self) -> &'static str {
        "unavailable-text"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _design: &DesignDocument) -> Result<Value, AnalyzerError> {
        Err(AnalyzerError::NotAvailable("no text analysis result provided".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_replay_reads_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"entities": [{{"name": "Order"}}]}}"#).unwrap();

        let analyzer = ReplayTextAnalyzer::new(file.path());
        let payload = analyzer.analyze(&DesignDocument::default()).await.unwrap();
        assert_eq!(payload["entities"][0]["name"], "Order");
    }

    #[tokio::test]
    async fn test_replay_errors() {
        let missing = ReplayTextAnalyzer::new("/nonexistent/dmf/text.json");
        assert!(matches!(
            missing.analyze(&DesignDocument::default()).await,
            Err(AnalyzerError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let garbled = ReplayTextAnalyzer::new(file.path());
        assert!(matches!(
            garbled.analyze(&DesignDocument::default()).await,
            Err(AnalyzerError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_vision_replay_without_screenshots_is_empty() {
        let analyzer = ReplayVisionAnalyzer::new("/nonexistent/dmf/vision.json");
        let payload = analyzer.analyze(&[]).await.unwrap();
        assert_eq!(payload, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unavailable_text_analyzer() {
        let result = UnavailableTextAnalyzer.analyze(&DesignDocument::default()).await;
        assert!(matches!(result, Err(AnalyzerError::NotAvailable(_))));
    }
}
