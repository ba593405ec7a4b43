//! Test Helper Utilities
//!
//! Shared fixtures and mock analyzers for dmf-fusion integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dmf_fusion::types::{
    AnalyzerError, Bounds, DesignDocument, DesignNode, DesignPage, ScreenshotDescriptor,
    TextAnalyzer, VisionAnalyzer,
};
use dmf_fusion::FusionConfig;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Config with no credentials and the cache disabled
pub fn test_config() -> FusionConfig {
    FusionConfig {
        cache_enabled: false,
        ..Default::default()
    }
}

pub fn screenshot(page_id: &str) -> ScreenshotDescriptor {
    ScreenshotDescriptor {
        page_id: page_id.to_string(),
        name: format!("{} screenshot", page_id),
        image_url: format!("https://cdn.example.test/{}.png", page_id),
    }
}

/// Single-page design with a "User Profile" frame and one screenshot
pub fn user_profile_design() -> DesignDocument {
    DesignDocument {
        name: Some("Community App".to_string()),
        pages: vec![DesignPage {
            id: "page-1".to_string(),
            name: "Profile".to_string(),
            nodes: vec![DesignNode {
                id: "1:1".to_string(),
                name: "User Profile".to_string(),
                node_type: "FRAME".to_string(),
                bounds: Some(Bounds { x: 0.0, y: 0.0, width: 375.0, height: 812.0 }),
                children: vec![
                    DesignNode {
                        id: "1:2".to_string(),
                        name: "Username".to_string(),
                        node_type: "INPUT".to_string(),
                        ..Default::default()
                    },
                    DesignNode {
                        id: "1:3".to_string(),
                        name: "Label".to_string(),
                        node_type: "TEXT".to_string(),
                        text: Some("Joined date".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
        }],
        screenshots: vec![screenshot("page-1")],
    }
}

/// Design with no nodes the heuristics recognize and one screenshot
pub fn opaque_design() -> DesignDocument {
    DesignDocument {
        name: None,
        pages: vec![DesignPage {
            id: "page-1".to_string(),
            name: "Page 1".to_string(),
            nodes: vec![DesignNode {
                id: "9:1".to_string(),
                name: "Frame 42".to_string(),
                node_type: "FRAME".to_string(),
                ..Default::default()
            }],
        }],
        screenshots: vec![screenshot("page-1")],
    }
}

/// Text analyzer returning a fixed payload and counting invocations
pub struct StaticTextAnalyzer {
    payload: Value,
    calls: AtomicUsize,
}

impl StaticTextAnalyzer {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextAnalyzer for StaticTextAnalyzer {
    fn name(&self) -> &'static str {
        "static-text"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _design: &DesignDocument) -> Result<Value, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Vision analyzer returning a fixed payload and counting invocations
pub struct StaticVisionAnalyzer {
    payload: Value,
    calls: AtomicUsize,
}

impl StaticVisionAnalyzer {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionAnalyzer for StaticVisionAnalyzer {
    fn name(&self) -> &'static str {
        "static-vision"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _screenshots: &[ScreenshotDescriptor]) -> Result<Value, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Text analyzer that always fails with a network error
pub struct FailingTextAnalyzer;

#[async_trait]
impl TextAnalyzer for FailingTextAnalyzer {
    fn name(&self) -> &'static str {
        "failing-text"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _design: &DesignDocument) -> Result<Value, AnalyzerError> {
        Err(AnalyzerError::Network("connection reset".to_string()))
    }
}

/// Vision analyzer that always fails with an API error
pub struct FailingVisionAnalyzer;

#[async_trait]
impl VisionAnalyzer for FailingVisionAnalyzer {
    fn name(&self) -> &'static str {
        "failing-vision"
    }

    fn requires_credentials(&self) -> bool {
        false
    }

    async fn analyze(&self, _screenshots: &[ScreenshotDescriptor]) -> Result<Value, AnalyzerError> {
        Err(AnalyzerError::Api("rate limited".to_string()))
    }
}

/// Vision analyzer that keeps the default credential requirement
pub struct KeyedVisionAnalyzer;

#[async_trait]
impl VisionAnalyzer for KeyedVisionAnalyzer {
    fn name(&self) -> &'static str {
        "keyed-vision"
    }

    async fn analyze(&self, _screenshots: &[ScreenshotDescriptor]) -> Result<Value, AnalyzerError> {
        Ok(serde_json::json!({}))
    }
}
