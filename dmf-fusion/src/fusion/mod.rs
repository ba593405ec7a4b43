// Fusion Module - Text + Vision Result Fusion
//
// Folds the normalized per-source results into one CombinedAnalysis:
// entities merged by canonical name (text first), relationships deduplicated
// and extended with inferred ones, endpoints merged or derived, and a combined
// confidence score reflecting cross-source agreement.

pub mod endpoint_merger;
pub mod entity_merger;
pub mod relationship_merger;

use crate::analysis::confidence::{clamp01, average};
use crate::analysis::normalizer::{EntityNormalizer, NormalizerOptions};
use crate::analysis::relationship_inferrer::infer_relationships;
use crate::analysis::rule_based::RuleBasedAnalyzer;
use crate::types::{
    AnalysisMethod, CombinedAnalysis, DesignDocument, FieldTypePolicy, SingleSourceResult,
    SuggestedRelationship,
};
use endpoint_merger::{derive_endpoints, merge_endpoints};
use entity_merger::EntityMerger;
use relationship_merger::merge_relationships;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Added to the best per-source average when both sources contributed
pub const MULTI_SOURCE_BONUS: f64 = 0.1;

/// Fusion engine options
#[derive(Debug, Clone, Copy)]
pub struct FusionOptions {
    pub field_type_policy: FieldTypePolicy,
    /// Passed through to the rule-based pass
    pub timestamp_fields: bool,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            field_type_policy: FieldTypePolicy::default(),
            timestamp_fields: true,
        }
    }
}

/// Pick the analysis method from which sources produced entities
pub fn select_analysis_method(
    text_has_entities: bool,
    vision_has_entities: bool,
) -> AnalysisMethod {
    match (text_has_entities, vision_has_entities) {
        (true, true) => AnalysisMethod::Combined,
        (true, false) => AnalysisMethod::TextOnly,
        (false, true) => AnalysisMethod::VisionOnly,
        (false, false) => AnalysisMethod::RuleBasedFallback,
    }
}

/// Overall score for a combined run
///
/// Multi-source agreement lifts the best average by `MULTI_SOURCE_BONUS`.
pub fn combined_confidence(avg_text: f64, avg_vision: f64) -> f64 {
    clamp01(avg_text.max(avg_vision) + MULTI_SOURCE_BONUS)
}

/// Text + vision fusion engine
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    options: FusionOptions,
    rule_based: RuleBasedAnalyzer,
}

impl FusionEngine {
    pub fn new(options: FusionOptions) -> Self {
        let normalizer = EntityNormalizer::new(NormalizerOptions {
            timestamp_fields: options.timestamp_fields,
        });
        Self {
            options,
            rule_based: RuleBasedAnalyzer::new(normalizer),
        }
    }

    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    /// Fuse the available single-source results
    ///
    /// `None` and entity-less results count as "did not contribute". When no
    /// source contributed, the rule-based pass over `design` supplies entities.
    pub fn fuse(
        &self,
        text: Option<SingleSourceResult>,
        vision: Option<SingleSourceResult>,
        design: &DesignDocument,
    ) -> CombinedAnalysis {
        let text_has = text.as_ref().is_some_and(SingleSourceResult::has_entities);
        let vision_has = vision.as_ref().is_some_and(SingleSourceResult::has_entities);
        let analysis_method = select_analysis_method(text_has, vision_has);

        let avg_text = text.as_ref().map(SingleSourceResult::average_confidence).unwrap_or(0.0);
        let avg_vision = vision.as_ref().map(SingleSourceResult::average_confidence).unwrap_or(0.0);

        let mut text_insights = Vec::new();
        let mut vision_insights = Vec::new();
        let mut sources = Vec::new();
        if let Some(result) = text {
            text_insights.extend(result.insights.iter().cloned());
            sources.push(result);
        }
        if let Some(result) = vision {
            vision_insights.extend(result.insights.iter().cloned());
            sources.push(result);
        }

        if analysis_method == AnalysisMethod::RuleBasedFallback {
            info!("No analyzer produced entities, running rule-based analysis");
            let heuristic = self.rule_based.analyze(design);
            text_insights.extend(heuristic.insights.iter().cloned());
            sources = vec![heuristic];
        }

        // Text results precede vision results, so text wins first-seen ties
        let mut merger = EntityMerger::new(self.options.field_type_policy);
        let mut suggested: Vec<SuggestedRelationship> = Vec::new();
        let mut endpoints = Vec::new();
        for source in sources {
            merger.extend(source.entities);
            suggested.extend(source.relationships);
            endpoints.extend(source.endpoints);
        }
        let entities = merger.into_entities();

        let known: HashSet<String> = entities.iter().map(|e| e.key()).collect();
        let suggested_count = suggested.len();
        let suggested: Vec<SuggestedRelationship> = suggested
            .into_iter()
            .filter(|rel| {
                let resolved = known.contains(&rel.from.to_lowercase())
                    && known.contains(&rel.to.to_lowercase());
                if !resolved {
                    warn!(
                        from = %rel.from,
                        to = %rel.to,
                        "Dropping relationship to unknown entity"
                    );
                }
                resolved
            })
            .collect();
        debug!(
            suggested = suggested_count,
            kept = suggested.len(),
            "Suggested relationships resolved"
        );

        let inferred = infer_relationships(&entities);
        let relationships = merge_relationships(suggested.into_iter().chain(inferred));

        let endpoints = if endpoints.is_empty() {
            derive_endpoints(&entities)
        } else {
            merge_endpoints(endpoints)
        };

        let confidence_score = match analysis_method {
            AnalysisMethod::Combined => combined_confidence(avg_text, avg_vision),
            AnalysisMethod::TextOnly => avg_text,
            AnalysisMethod::VisionOnly => avg_vision,
            AnalysisMethod::RuleBasedFallback => {
                let scores: Vec<f64> = entities.iter().map(|e| e.confidence).collect();
                average(&scores)
            }
        };

        info!(
            method = %analysis_method,
            entities = entities.len(),
            relationships = relationships.len(),
            endpoints = endpoints.len(),
            confidence = confidence_score,
            "Fusion complete"
        );

        CombinedAnalysis {
            entities,
            relationships,
            endpoints,
            analysis_method,
            confidence_score,
            vision_insights,
            text_insights,
        }
    }
}
