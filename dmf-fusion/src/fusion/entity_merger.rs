//! Entity Merger (Fusion)
//!
//! Deduplicates entities by canonical name (case-insensitive) and merges the
//! metadata of entities that describe the same table.
//!
//! # Merge Rules
//! - Fields: union by case-insensitive name; flags OR'd; type resolved by
//!   `FieldTypePolicy`; provenance unioned; cross-source merges append the
//!   confirmation marker to the field description
//! - Confidence: agreement boost when the incoming entity brings a new source,
//!   plain maximum for same-source duplicates
//! - Semantic type: taken from the higher pre-merge confidence, ties prefer text
//! - Reasoning: `Combined analysis: ` prefix for cross-source merges
//!
//! Insertion order is preserved, so feeding text entities before vision
//! entities yields a deterministic output order.

use crate::analysis::confidence::boost;
use crate::types::{DetectedEntity, DetectedField, FieldTypePolicy, SourceMethod};
use std::collections::HashMap;
use tracing::debug;

/// Appended to a field description when a second source confirms it
pub const CONFIRMED_MARKER: &str = "(confirmed by visual analysis)";

/// Prefix of reasoning strings produced by cross-source merges
pub const COMBINED_REASONING_PREFIX: &str = "Combined analysis: ";

/// Order-preserving, name-keyed entity accumulator
#[derive(Debug, Default)]
pub struct EntityMerger {
    policy: FieldTypePolicy,
    entities: Vec<DetectedEntity>,
    index: HashMap<String, usize>,
}

impl EntityMerger {
    pub fn new(policy: FieldTypePolicy) -> Self {
        Self {
            policy,
            entities: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a new entity or merge it into the one with the same name
    pub fn add(&mut self, entity: DetectedEntity) {
        let key = entity.key();
        match self.index.get(&key) {
            Some(&position) => merge_entities(&mut self.entities[position], entity, self.policy),
            None => {
                self.index.insert(key, self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn extend(&mut self, entities: impl IntoIterator<Item = DetectedEntity>) {
        for entity in entities {
            self.add(entity);
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_entities(self) -> Vec<DetectedEntity> {
        self.entities
    }
}

/// Merge `incoming` into `existing` (same canonical name)
pub fn merge_entities(
    existing: &mut DetectedEntity,
    incoming: DetectedEntity,
    policy: FieldTypePolicy,
) {
    let cross_source = !incoming.source_methods.is_subset(&existing.source_methods);
    let existing_confidence = existing.confidence;
    let incoming_confidence = incoming.confidence;

    let incoming_wins_type = incoming_confidence > existing_confidence
        || (incoming_confidence == existing_confidence
            && incoming.source_methods.contains(&SourceMethod::Text)
            && !existing.source_methods.contains(&SourceMethod::Text));
    if incoming_wins_type {
        existing.semantic_type = incoming.semantic_type;
    }

    let has_primary = existing.fields.iter().any(|f| f.is_primary);
    for mut field in incoming.fields {
        match existing.fields.iter_mut().find(|f| f.key() == field.key()) {
            Some(current) => merge_field(
                current,
                field,
                policy,
                existing_confidence,
                incoming_confidence,
            ),
            None => {
                // A second primary key would break the one-primary invariant
                if has_primary && field.is_primary {
                    field.is_primary = false;
                }
                existing.fields.push(field);
            }
        }
    }

    let best = existing_confidence.max(incoming_confidence);
    existing.confidence = if cross_source { boost(best, 1) } else { best };

    existing.reasoning = merge_reasoning(&existing.reasoning, &incoming.reasoning, cross_source);
    existing.source_methods.extend(incoming.source_methods);
    existing.source_element_ids.extend(incoming.source_element_ids);

    debug!(
        entity = %existing.name,
        cross_source,
        confidence = existing.confidence,
        fields = existing.fields.len(),
        "Entities merged"
    );
}

/// Merge `incoming` into `existing` (same field name)
pub fn merge_field(
    existing: &mut DetectedField,
    incoming: DetectedField,
    policy: FieldTypePolicy,
    existing_entity_confidence: f64,
    incoming_entity_confidence: f64,
) {
    let cross_source = !incoming.source_methods.is_subset(&existing.source_methods);

    if existing.field_type != incoming.field_type {
        let resolved = resolve_field_type(
            policy,
            existing,
            &incoming,
            existing_entity_confidence,
            incoming_entity_confidence,
        );
        debug!(
            field = %existing.name,
            existing = existing.field_type.as_str(),
            incoming = incoming.field_type.as_str(),
            resolved = resolved.as_str(),
            "Field type conflict"
        );
        existing.field_type = resolved;
    }

    existing.required |= incoming.required;
    existing.unique |= incoming.unique;
    existing.confidence = match (existing.confidence, incoming.confidence) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if existing.description.is_none() {
        existing.description = incoming.description;
    }
    if cross_source {
        append_marker(&mut existing.description);
    }
    existing.source_methods.extend(incoming.source_methods);
}

fn resolve_field_type(
    policy: FieldTypePolicy,
    existing: &DetectedField,
    incoming: &DetectedField,
    existing_entity_confidence: f64,
    incoming_entity_confidence: f64,
) -> crate::types::FieldType {
    match policy {
        FieldTypePolicy::PreferSpecific => {
            if incoming.field_type.specificity() > existing.field_type.specificity() {
                incoming.field_type
            } else {
                existing.field_type
            }
        }
        FieldTypePolicy::PreferExisting => existing.field_type,
        FieldTypePolicy::PreferHigherConfidence => {
            let existing_score = existing.confidence.unwrap_or(existing_entity_confidence);
            let incoming_score = incoming.confidence.unwrap_or(incoming_entity_confidence);
            if incoming_score > existing_score {
                incoming.field_type
            } else {
                existing.field_type
            }
        }
    }
}

fn append_marker(description: &mut Option<String>) {
    match description {
        Some(text) if text.ends_with(CONFIRMED_MARKER) => {}
        Some(text) => {
            text.push(' ');
            text.push_str(CONFIRMED_MARKER);
        }
        None => *description = Some(CONFIRMED_MARKER.to_string()),
    }
}

/// Cross-source merges always carry the combined prefix; repeated text is not appended
fn merge_reasoning(existing: &str, incoming: &str, cross_source: bool) -> String {
    let existing = existing.trim();
    let incoming = incoming.trim();
    let repeated = incoming.is_empty() || existing.contains(incoming);

    if cross_source && !existing.starts_with(COMBINED_REASONING_PREFIX) {
        if repeated {
            format!("{}{}", COMBINED_REASONING_PREFIX, existing)
        } else {
            format!("{}{} {}", COMBINED_REASONING_PREFIX, existing, incoming)
        }
    } else if repeated {
        existing.to_string()
    } else {
        format!("{}; {}", existing, incoming)
    }
}
