//! Analysis workflow
//!
//! Runs the text and vision analyzers for one design, normalizes their raw
//! payloads and hands them to the fusion engine.
//!
//! # Architecture
//!
//! 1. Look up each analyzer's raw payload in the cache (if configured)
//! 2. Invoke the text and vision analyzers concurrently, isolating failures
//! 3. Normalize the raw payloads into single-source results
//! 4. Fuse (falling back to rule-based analysis when nothing was detected)
//!
//! Progress is reported through an optional `AnalysisEvent` channel.

pub mod cache;
pub mod coordinator;

pub use cache::{cache_key, AnalysisCache, InMemoryAnalysisCache};
pub use coordinator::FallbackCoordinator;

use crate::types::{AnalysisMethod, SourceMethod};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// Analysis of one design started
    AnalysisStarted {
        request_id: Uuid,
        /// Design name, if the document carries one
        design: Option<String>,
        pages: usize,
        screenshots: usize,
        /// Unix timestamp (seconds since epoch)
        timestamp: i64,
    },

    /// An analyzer was invoked
    AnalyzerStarted {
        request_id: Uuid,
        analyzer: String,
        source: SourceMethod,
    },

    /// An analyzer returned a payload
    AnalyzerCompleted {
        request_id: Uuid,
        analyzer: String,
        source: SourceMethod,
        /// Entities surviving normalization
        entities: usize,
        duration_ms: u64,
    },

    /// An analyzer failed; its source is excluded from fusion
    AnalyzerFailed {
        request_id: Uuid,
        analyzer: String,
        source: SourceMethod,
        error: String,
    },

    /// An analyzer was not invoked
    AnalyzerSkipped {
        request_id: Uuid,
        source: SourceMethod,
        reason: String,
    },

    /// A cached raw payload was reused
    CacheHit {
        request_id: Uuid,
        analyzer: String,
        source: SourceMethod,
    },

    /// Neither analyzer produced entities
    FallbackUsed { request_id: Uuid },

    /// Fusion finished
    FusionCompleted {
        request_id: Uuid,
        analysis_method: AnalysisMethod,
        entities: usize,
        relationships: usize,
        confidence_score: f64,
        /// Unix timestamp (seconds since epoch)
        timestamp: i64,
    },
}

impl AnalysisEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            AnalysisEvent::AnalysisStarted { request_id, .. }
            | AnalysisEvent::AnalyzerStarted { request_id, .. }
            | AnalysisEvent::AnalyzerCompleted { request_id, .. }
            | AnalysisEvent::AnalyzerFailed { request_id, .. }
            | AnalysisEvent::AnalyzerSkipped { request_id, .. }
            | AnalysisEvent::CacheHit { request_id, .. }
            | AnalysisEvent::FallbackUsed { request_id }
            | AnalysisEvent::FusionCompleted { request_id, .. } => *request_id,
        }
    }
}
