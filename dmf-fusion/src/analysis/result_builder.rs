//! Single-Source Result Builder
//!
//! Wraps one analyzer's raw JSON payload into a `SingleSourceResult`.
//!
//! # Tolerance
//! - Payload not a JSON object → empty result (never an error)
//! - Absent/null arrays → treated as empty
//! - Malformed top-level record → skipped with a warning
//! - Out-of-range or string-encoded confidences → coerced and clamped
//!
//! # Payload shape
//! ```json
//! {
//!   "entities": [{"name": "...", "fields": [{"name": "...", "type": "..."}], "confidence": 0.8}],
//!   "relationships": [{"from": "...", "to": "...", "type": "oneToMany"}],
//!   "endpoints": [{"method": "GET", "path": "/api/products"}],
//!   "insights": ["..."],
//!   "visualPatterns": [{"description": "..."}],
//!   "confidence": 0.7
//! }
//! ```

use crate::analysis::confidence::from_json;
use crate::analysis::normalizer::{to_pascal_case, EntityDraft, EntityNormalizer};
use crate::types::{
    HttpMethod, RawEndpointRecord, RawEntityRecord, RawFieldRecord, RawRelationshipRecord,
    RelationshipType, SingleSourceResult, SourceMethod, SuggestedEndpoint,
    SuggestedRelationship,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Confidence used when neither the record nor the payload carries one
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Builds normalized single-source results from raw analyzer payloads
#[derive(Debug, Clone, Default)]
pub struct ResultBuilder {
    normalizer: EntityNormalizer,
}

impl ResultBuilder {
    pub fn new(normalizer: EntityNormalizer) -> Self {
        Self { normalizer }
    }

    /// Build a result for `method` from `payload`
    pub fn build(&self, payload: &Value, method: SourceMethod) -> SingleSourceResult {
        let Some(object) = payload.as_object() else {
            warn!(method = %method, "Analyzer payload is not an object, using empty result");
            return SingleSourceResult::empty(method);
        };

        let payload_confidence = object.get("confidence").and_then(from_json);
        let default_confidence = payload_confidence.unwrap_or(DEFAULT_CONFIDENCE);

        let entities = records::<RawEntityRecord>(object.get("entities"), "entity", method)
            .into_iter()
            .filter_map(|record| {
                let draft = entity_draft(record, default_confidence, method)?;
                match self.normalizer.normalize(draft, method) {
                    Ok(entity) => Some(entity),
                    Err(e) => {
                        warn!(method = %method, error = %e, "Skipping entity record");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        let relationships = records::<RawRelationshipRecord>(
            object.get("relationships"),
            "relationship",
            method,
        )
        .into_iter()
        .filter_map(|record| relationship(record, default_confidence, method))
        .collect::<Vec<_>>();

        let endpoints = records::<RawEndpointRecord>(object.get("endpoints"), "endpoint", method)
            .into_iter()
            .filter_map(|record| endpoint(record, default_confidence, method))
            .collect::<Vec<_>>();

        let mut insights = strings(object.get("insights"));
        if method == SourceMethod::Vision {
            insights.extend(strings(object.get("visualPatterns")));
        }

        debug!(
            method = %method,
            entities = entities.len(),
            relationships = relationships.len(),
            endpoints = endpoints.len(),
            insights = insights.len(),
            "Single-source result built"
        );

        SingleSourceResult {
            method,
            entities,
            relationships,
            endpoints,
            insights,
        }
    }
}

/// Deserialize each element of an optional array, skipping malformed ones
fn records<T: DeserializeOwned>(value: Option<&Value>, kind: &str, method: SourceMethod) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!(method = %method, kind, "Expected an array of records, ignoring");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if !item.is_object() {
                warn!(method = %method, kind, index, "Skipping non-object record");
                return None;
            }
            match serde_json::from_value::<T>(item.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(method = %method, kind, index, error = %e, "Skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

fn entity_draft(
    record: RawEntityRecord,
    default_confidence: f64,
    method: SourceMethod,
) -> Option<EntityDraft> {
    let Some(name) = record.name.filter(|n| !n.trim().is_empty()) else {
        warn!(method = %method, "Skipping entity record without a name");
        return None;
    };

    let fields = records::<RawFieldRecord>(record.fields.as_ref(), "field", method);

    let source_element_ids: BTreeSet<String> = match record.source_element_ids {
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(id)) if !id.is_empty() => BTreeSet::from([id]),
        _ => BTreeSet::new(),
    };

    Some(EntityDraft {
        name,
        table_name: record.table_name,
        fields,
        confidence: record
            .confidence
            .as_ref()
            .and_then(from_json)
            .unwrap_or(default_confidence),
        reasoning: record.reasoning.unwrap_or_default(),
        source_element_ids,
    })
}

fn relationship(
    record: RawRelationshipRecord,
    default_confidence: f64,
    method: SourceMethod,
) -> Option<SuggestedRelationship> {
    let from = record.from.as_deref().map(to_pascal_case).unwrap_or_default();
    let to = record.to.as_deref().map(to_pascal_case).unwrap_or_default();
    if from.is_empty() || to.is_empty() {
        warn!(method = %method, "Skipping relationship without both endpoints");
        return None;
    }

    let Some(relationship_type) =
        record.relationship_type.as_deref().and_then(RelationshipType::parse)
    else {
        warn!(
            method = %method,
            from = %from,
            to = %to,
            raw_type = ?record.relationship_type,
            "Skipping relationship with unknown type"
        );
        return None;
    };

    Some(SuggestedRelationship {
        from,
        to,
        relationship_type,
        confidence: record
            .confidence
            .as_ref()
            .and_then(from_json)
            .unwrap_or(default_confidence),
        reasoning: record
            .reasoning
            .unwrap_or_else(|| format!("Suggested by {} analysis", method)),
    })
}

fn endpoint(
    record: RawEndpointRecord,
    default_confidence: f64,
    method: SourceMethod,
) -> Option<SuggestedEndpoint> {
    let Some(http_method) = record.method.as_deref().and_then(HttpMethod::parse) else {
        warn!(method = %method, raw = ?record.method, "Skipping endpoint with unknown HTTP method");
        return None;
    };
    let path = record.path.map(|p| p.trim().to_string()).unwrap_or_default();
    if !path.starts_with('/') {
        warn!(method = %method, path = %path, "Skipping endpoint with invalid path");
        return None;
    }

    Some(SuggestedEndpoint {
        method: http_method,
        path,
        description: record.description.unwrap_or_default(),
        entity: record
            .entity
            .as_deref()
            .map(to_pascal_case)
            .filter(|e| !e.is_empty()),
        confidence: record
            .confidence
            .as_ref()
            .and_then(from_json)
            .unwrap_or(default_confidence),
    })
}

/// Collect advisory strings from a string, array of strings, or array of
/// pattern objects (`description`, `pattern` or `name` key)
fn strings(value: Option<&Value>) -> Vec<String> {
    let text_of = |item: &Value| -> Option<String> {
        match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => ["description", "pattern", "name"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        }
    };

    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
        Some(item @ Value::String(_)) => text_of(item).into_iter().collect(),
        _ => Vec::new(),
    };

    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
