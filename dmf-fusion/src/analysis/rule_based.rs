//! Rule-Based Analyzer
//!
//! Deterministic, non-AI structural pass over design nodes. Used when neither
//! model-backed analyzer produced an entity.
//!
//! # Heuristics
//! - A container node (frame, group, component, ...) whose name matches a
//!   semantic keyword becomes an entity candidate; when a design has no such
//!   container, any matching node qualifies
//! - Field-like descendants (text, inputs, toggles, ...) and field-like nodes
//!   lying inside the candidate's bounds become fields
//! - Field types come from label keywords and input kinds
//! - Confidence stays within 0.35-0.6 so heuristic output never outranks a
//!   model-backed source

use crate::analysis::normalizer::{
    classify, to_pascal_case, to_snake_case, EntityDraft, EntityNormalizer,
};
use crate::fusion::entity_merger::EntityMerger;
use crate::types::{
    DesignDocument, DesignNode, FieldType, FieldTypePolicy, RawFieldRecord, SemanticType,
    SingleSourceResult, SourceMethod,
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

pub const HEURISTIC_BASE_CONFIDENCE: f64 = 0.35;
pub const HEURISTIC_MAX_CONFIDENCE: f64 = 0.6;
pub const MAX_HEURISTIC_FIELDS: usize = 20;
const MAX_LABEL_LEN: usize = 40;

const FIELD_NODE_TYPES: &[&str] = &[
    "TEXT", "INPUT", "TEXT_INPUT", "TEXTAREA", "CHECKBOX", "SELECT", "DROPDOWN", "DATE_PICKER",
    "TOGGLE", "SWITCH", "RADIO",
];

const CONTAINER_NODE_TYPES: &[&str] =
    &["FRAME", "GROUP", "COMPONENT", "INSTANCE", "SECTION", "FORM"];

const ACTION_LABELS: &[&str] = &[
    "submit", "save", "cancel", "ok", "sign in", "sign up", "log in", "login", "next", "back",
    "delete", "edit", "search", "close", "continue",
];

/// Structural heuristic analyzer
#[derive(Debug, Clone, Default)]
pub struct RuleBasedAnalyzer {
    normalizer: EntityNormalizer,
}

impl RuleBasedAnalyzer {
    pub fn new(normalizer: EntityNormalizer) -> Self {
        Self { normalizer }
    }

    /// Infer entities from node names and structure
    ///
    /// Relationships are left to the inferrer, which runs on the fused set.
    pub fn analyze(&self, design: &DesignDocument) -> SingleSourceResult {
        let method = SourceMethod::Text;
        let mut merger = EntityMerger::new(FieldTypePolicy::PreferSpecific);

        let strict_count = design.walk_nodes().filter(|n| is_entity_candidate(n, false)).count();
        let lenient = strict_count == 0;
        if lenient {
            debug!("No container candidates, accepting any keyword-matching node");
        }

        let mut matched_nodes = 0usize;
        for page in &design.pages {
            let page_nodes: Vec<&DesignNode> =
                page.nodes.iter().flat_map(DesignNode::walk).collect();
            let candidate_ids: HashSet<&str> = page_nodes
                .iter()
                .filter(|n| is_entity_candidate(n, lenient))
                .map(|n| n.id.as_str())
                .collect();

            for node in page_nodes.iter().filter(|n| candidate_ids.contains(n.id.as_str())) {
                matched_nodes += 1;
                let fields = collect_fields(node, &page_nodes, &candidate_ids);
                let draft = EntityDraft {
                    name: node.name.clone(),
                    table_name: None,
                    confidence: heuristic_confidence(node, fields.len()),
                    reasoning: format!(
                        "Rule-based: design node '{}' on page '{}' matches {} naming",
                        node.name.trim(),
                        page.name,
                        classify(&to_pascal_case(&node.name))
                    ),
                    fields,
                    source_element_ids: BTreeSet::from([node.id.clone()]),
                };

                match self.normalizer.normalize(draft, method) {
                    Ok(entity) => merger.add(entity),
                    Err(e) => warn!(node = %node.id, error = %e, "Skipping rule-based candidate"),
                }
            }
        }

        let entities = merger.into_entities();
        info!(
            entities = entities.len(),
            matched_nodes,
            "Rule-based analysis complete"
        );

        let mut result = SingleSourceResult::empty(method);
        result.insights.push(format!(
            "Rule-based analysis inferred {} entities from {} design nodes",
            entities.len(),
            matched_nodes
        ));
        result.entities = entities;
        result
    }
}

fn node_type_is(node: &DesignNode, types: &[&str]) -> bool {
    let upper = node.node_type.trim().to_ascii_uppercase();
    types.contains(&upper.as_str())
}

fn is_field_node(node: &DesignNode) -> bool {
    node_type_is(node, FIELD_NODE_TYPES)
}

fn is_entity_candidate(node: &DesignNode, lenient: bool) -> bool {
    let name = to_pascal_case(&node.name);
    if name.is_empty() || classify(&name) == SemanticType::Metadata {
        return false;
    }
    lenient || !is_field_node(node) || !node.children.is_empty()
}

fn heuristic_confidence(node: &DesignNode, field_count: usize) -> f64 {
    let container_bonus = if node_type_is(node, CONTAINER_NODE_TYPES) { 0.05 } else { 0.0 };
    let field_bonus = (0.02 * field_count as f64).min(0.15);
    (HEURISTIC_BASE_CONFIDENCE + container_bonus + field_bonus).min(HEURISTIC_MAX_CONFIDENCE)
}

/// Nodes a candidate owns: its descendants plus page nodes inside its bounds
fn owned_nodes<'a>(
    candidate: &'a DesignNode,
    page_nodes: &'a [&'a DesignNode],
) -> impl Iterator<Item = &'a DesignNode> {
    let enclosed = page_nodes.iter().copied().filter(move |node| {
        match (candidate.bounds.as_ref(), node.bounds.as_ref()) {
            (Some(outer), Some(inner)) => node.id != candidate.id && outer.contains(inner),
            _ => false,
        }
    });
    candidate.walk().skip(1).chain(enclosed)
}

/// Field records from the nodes a candidate owns
///
/// Fields owned by a nested candidate belong to that candidate only.
fn collect_fields(
    candidate: &DesignNode,
    page_nodes: &[&DesignNode],
    candidate_ids: &HashSet<&str>,
) -> Vec<RawFieldRecord> {
    let claimed: HashSet<&str> = owned_nodes(candidate, page_nodes)
        .filter(|node| candidate_ids.contains(node.id.as_str()))
        .filter(|nested| !nested.walk().any(|n| n.id == candidate.id))
        .flat_map(|nested| owned_nodes(nested, page_nodes))
        .map(|node| node.id.as_str())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    owned_nodes(candidate, page_nodes)
        .filter(|node| is_field_node(node) && !candidate_ids.contains(node.id.as_str()))
        .filter(|node| !claimed.contains(node.id.as_str()))
        .filter_map(|node| {
            let label = node.label().trim().trim_end_matches(':').trim();
            if label.is_empty()
                || label.chars().count() > MAX_LABEL_LEN
                || ACTION_LABELS.contains(&label.to_lowercase().as_str())
            {
                return None;
            }
            let name = to_snake_case(label);
            if name.is_empty() || !seen.insert(name.clone()) {
                return None;
            }
            Some(RawFieldRecord {
                field_type: Some(infer_field_type(node, &name).as_str().to_string()),
                name: Some(name),
                ..Default::default()
            })
        })
        .take(MAX_HEURISTIC_FIELDS)
        .collect()
}

/// Guess a column type from the input kind and the label
pub fn infer_field_type(node: &DesignNode, snake_label: &str) -> FieldType {
    let node_type = node.node_type.trim().to_ascii_uppercase();
    match node_type.as_str() {
        "CHECKBOX" | "TOGGLE" | "SWITCH" => return FieldType::Boolean,
        "DATE_PICKER" => return FieldType::Date,
        _ => {}
    }

    let words: Vec<&str> = snake_label.split('_').collect();
    let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    if has(&["date", "time", "birthday", "deadline", "created", "updated"])
        || snake_label.ends_with("_at")
    {
        FieldType::Date
    } else if has(&["phone", "mobile", "fax"]) {
        FieldType::String
    } else if has(&[
        "price", "amount", "count", "quantity", "qty", "age", "total", "number", "rating",
        "score", "stock",
    ]) {
        FieldType::Number
    } else if words.first().is_some_and(|w| *w == "is" || *w == "has")
        || has(&["enabled", "active", "agree", "subscribe", "subscribed"])
    {
        FieldType::Boolean
    } else if has(&["coordinates", "latitude", "longitude", "lat", "lng", "geolocation"]) {
        FieldType::Point
    } else if has(&["tags", "categories", "images", "photos"]) {
        FieldType::Array
    } else {
        FieldType::String
    }
}
