//! Fallback coordinator
//!
//! Orchestrates one analysis request:
//! 1. Invoke the text analyzer and (when enabled, attached and screenshots
//!    exist) the vision analyzer concurrently
//! 2. Turn each failure into an advisory insight instead of an error
//! 3. Normalize successful payloads and fuse them
//! 4. Fall back to rule-based analysis when no source produced entities
//!
//! `analyze` never fails; configuration problems surface at construction.

use crate::analysis::normalizer::{EntityNormalizer, NormalizerOptions};
use crate::analysis::result_builder::ResultBuilder;
use crate::config::FusionConfig;
use crate::error::{FusionError, FusionResult};
use crate::fusion::FusionEngine;
use crate::types::{
    AnalyzerError, CombinedAnalysis, DesignDocument, SingleSourceResult, SourceMethod,
    TextAnalyzer, VisionAnalyzer,
};
use crate::workflow::cache::{cache_key, AnalysisCache, InMemoryAnalysisCache};
use crate::workflow::AnalysisEvent;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one source: a normalized result and/or an advisory insight
#[derive(Debug, Default)]
struct SourceOutcome {
    result: Option<SingleSourceResult>,
    advisory: Option<String>,
}

/// Text + vision analysis coordinator with rule-based fallback
pub struct FallbackCoordinator {
    config: FusionConfig,
    text: Arc<dyn TextAnalyzer>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    cache: Option<Arc<dyn AnalysisCache>>,
    event_tx: Option<mpsc::Sender<AnalysisEvent>>,
    builder: ResultBuilder,
    engine: FusionEngine,
}

impl FallbackCoordinator {
    /// Create a coordinator around a text analyzer
    ///
    /// An in-memory cache is installed when `config.cache_enabled`.
    ///
    /// # Errors
    /// `FusionError::Configuration` if the config is invalid or the analyzer
    /// needs credentials that are not configured
    pub fn new(config: FusionConfig, text: Arc<dyn TextAnalyzer>) -> FusionResult<Self> {
        config.validate()?;
        if text.requires_credentials() && config.text_api_key.is_none() {
            return Err(FusionError::Configuration(format!(
                "text analyzer '{}' requires an API key ([text] api_key or {})",
                text.name(),
                crate::config::TEXT_API_KEY_ENV
            )));
        }

        let cache: Option<Arc<dyn AnalysisCache>> = if config.cache_enabled {
            Some(Arc::new(InMemoryAnalysisCache::new(config.cache_max_entries)))
        } else {
            None
        };

        let normalizer = EntityNormalizer::new(NormalizerOptions {
            timestamp_fields: config.fusion.timestamp_fields,
        });

        Ok(Self {
            builder: ResultBuilder::new(normalizer),
            engine: FusionEngine::new(config.fusion),
            config,
            text,
            vision: None,
            cache,
            event_tx: None,
        })
    }

    /// Attach a vision analyzer
    ///
    /// Credentials are only required while vision is enabled.
    pub fn with_vision(mut self, vision: Arc<dyn VisionAnalyzer>) -> FusionResult<Self> {
        if self.config.vision_enabled
            && vision.requires_credentials()
            && self.config.vision_api_key.is_none()
        {
            return Err(FusionError::Configuration(format!(
                "vision analyzer '{}' requires an API key ([vision] api_key or {})",
                vision.name(),
                crate::config::VISION_API_KEY_ENV
            )));
        }
        self.vision = Some(vision);
        Ok(self)
    }

    /// Replace the payload cache
    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report progress on `event_tx`
    pub fn with_events(mut self, event_tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Analyze one design
    pub async fn analyze(&self, design: &DesignDocument) -> CombinedAnalysis {
        let request_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            pages = design.pages.len(),
            screenshots = design.screenshots.len(),
            "Starting design analysis"
        );
        self.emit_event(AnalysisEvent::AnalysisStarted {
            request_id,
            design: design.name.clone(),
            pages: design.pages.len(),
            screenshots: design.screenshots.len(),
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await;

        let (text, vision) = tokio::join!(
            self.run_text(request_id, design),
            self.run_vision(request_id, design)
        );

        let text_has = text.result.as_ref().is_some_and(SingleSourceResult::has_entities);
        let vision_has = vision.result.as_ref().is_some_and(SingleSourceResult::has_entities);
        if !text_has && !vision_has {
            self.emit_event(AnalysisEvent::FallbackUsed { request_id }).await;
        }

        let mut analysis = self.engine.fuse(text.result, vision.result, design);
        analysis.text_insights.extend(text.advisory);
        analysis.vision_insights.extend(vision.advisory);

        self.emit_event(AnalysisEvent::FusionCompleted {
            request_id,
            analysis_method: analysis.analysis_method,
            entities: analysis.entities.len(),
            relationships: analysis.relationships.len(),
            confidence_score: analysis.confidence_score,
            timestamp: chrono::Utc::now().timestamp(),
        })
        .await;

        analysis
    }

    async fn run_text(&self, request_id: Uuid, design: &DesignDocument) -> SourceOutcome {
        let analyzer = self.text.as_ref();
        let key = self.cache_key_for(SourceMethod::Text, analyzer.name(), design);
        let started = Instant::now();
        let payload = self
            .invoke(request_id, SourceMethod::Text, analyzer.name(), key, analyzer.analyze(design))
            .await;
        self.finish(request_id, SourceMethod::Text, analyzer.name(), payload, started)
            .await
    }

    async fn run_vision(&self, request_id: Uuid, design: &DesignDocument) -> SourceOutcome {
        let skip_reason = match &self.vision {
            None => Some("no vision analyzer attached"),
            Some(_) if !self.config.vision_enabled => Some("vision analysis disabled"),
            Some(_) if design.screenshots.is_empty() => Some("no screenshots provided"),
            Some(_) => None,
        };

        let analyzer = match (&self.vision, skip_reason) {
            (Some(analyzer), None) => analyzer.as_ref(),
            (_, reason) => {
                let reason = reason.unwrap_or_default().to_string();
                debug!(request_id = %request_id, reason = %reason, "Skipping vision analysis");
                self.emit_event(AnalysisEvent::AnalyzerSkipped {
                    request_id,
                    source: SourceMethod::Vision,
                    reason,
                })
                .await;
                return SourceOutcome::default();
            }
        };

        let screenshots = design.screenshots.as_slice();
        let key = self.cache_key_for(SourceMethod::Vision, analyzer.name(), screenshots);
        let started = Instant::now();
        let payload = self
            .invoke(
                request_id,
                SourceMethod::Vision,
                analyzer.name(),
                key,
                analyzer.analyze(screenshots),
            )
            .await;
        self.finish(request_id, SourceMethod::Vision, analyzer.name(), payload, started)
            .await
    }

    /// Serve from cache, or await `call` and cache its payload
    async fn invoke(
        &self,
        request_id: Uuid,
        source: SourceMethod,
        analyzer: &str,
        key: Option<String>,
        call: impl Future<Output = Result<Value, AnalyzerError>>,
    ) -> Result<Value, AnalyzerError> {
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(payload) = cache.get(key) {
                debug!(request_id = %request_id, analyzer, "Using cached analyzer payload");
                self.emit_event(AnalysisEvent::CacheHit {
                    request_id,
                    analyzer: analyzer.to_string(),
                    source,
                })
                .await;
                return Ok(payload);
            }
        }

        self.emit_event(AnalysisEvent::AnalyzerStarted {
            request_id,
            analyzer: analyzer.to_string(),
            source,
        })
        .await;

        let payload = call.await?;
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, payload.clone());
        }
        Ok(payload)
    }

    async fn finish(
        &self,
        request_id: Uuid,
        source: SourceMethod,
        analyzer: &str,
        payload: Result<Value, AnalyzerError>,
        started: Instant,
    ) -> SourceOutcome {
        match payload {
            Ok(payload) => {
                let result = self.builder.build(&payload, source);
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    request_id = %request_id,
                    analyzer,
                    source = %source,
                    entities = result.entities.len(),
                    duration_ms,
                    "Analyzer completed"
                );
                self.emit_event(AnalysisEvent::AnalyzerCompleted {
                    request_id,
                    analyzer: analyzer.to_string(),
                    source,
                    entities: result.entities.len(),
                    duration_ms,
                })
                .await;
                SourceOutcome {
                    result: Some(result),
                    advisory: None,
                }
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    analyzer,
                    source = %source,
                    error = %e,
                    "Analyzer failed, excluding source from fusion"
                );
                self.emit_event(AnalysisEvent::AnalyzerFailed {
                    request_id,
                    analyzer: analyzer.to_string(),
                    source,
                    error: e.to_string(),
                })
                .await;
                SourceOutcome {
                    result: None,
                    advisory: Some(format!("{} analysis unavailable: {}", capitalized(source), e)),
                }
            }
        }
    }

    fn cache_key_for<T: Serialize + ?Sized>(
        &self,
        source: SourceMethod,
        analyzer: &str,
        input: &T,
    ) -> Option<String> {
        self.cache.as_ref()?;
        match cache_key(&format!("{}:{}", source, analyzer), input) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(analyzer, error = %e, "Could not compute cache key, bypassing cache");
                None
            }
        }
    }

    /// Emit event (send failures ignored)
    async fn emit_event(&self, event: AnalysisEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

fn capitalized(source: SourceMethod) -> &'static str {
    match source {
        SourceMethod::Text => "Text",
        SourceMethod::Vision => "Vision",
    }
}
