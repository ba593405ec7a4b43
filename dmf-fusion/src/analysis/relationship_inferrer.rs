// Relationship Inferrer - Semantic Compatibility Table
//
// Proposes directed relationships between every pair of distinct entities whose
// semantic types appear in the compatibility table.

use crate::analysis::confidence::clamp01;
use crate::types::{DetectedEntity, RelationshipType, SemanticType, SuggestedRelationship};
use std::cmp::Ordering;
use tracing::debug;

/// Candidates scoring below this are discarded
pub const MIN_RELATIONSHIP_CONFIDENCE: f64 = 0.3;

/// Directional compatibility table: `(from, to, cardinality)`
///
/// Contains no symmetric pair, so a pair of entities yields at most one
/// candidate per direction lookup.
pub const COMPATIBILITY_TABLE: &[(SemanticType, SemanticType, RelationshipType)] = &[
    (SemanticType::User, SemanticType::Content, RelationshipType::OneToMany),
    (SemanticType::User, SemanticType::Form, RelationshipType::OneToMany),
    (SemanticType::User, SemanticType::Media, RelationshipType::OneToMany),
    (SemanticType::User, SemanticType::Spatial, RelationshipType::OneToMany),
    (SemanticType::Spatial, SemanticType::Form, RelationshipType::OneToMany),
    (SemanticType::Spatial, SemanticType::Content, RelationshipType::OneToMany),
    (SemanticType::Navigation, SemanticType::Content, RelationshipType::OneToMany),
    (SemanticType::Content, SemanticType::Media, RelationshipType::ManyToMany),
    (SemanticType::Content, SemanticType::Metadata, RelationshipType::ManyToMany),
    (SemanticType::Form, SemanticType::Metadata, RelationshipType::OneToOne),
];

/// Directional table lookup
pub fn lookup(from: SemanticType, to: SemanticType) -> Option<RelationshipType> {
    COMPATIBILITY_TABLE
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, relationship_type)| *relationship_type)
}

/// Heuristic confidence for a relationship between `a` and `b`
///
/// `0.5 + 0.05 * min(traceable elements, 4) + 0.15 * (a + b)`, clamped.
pub fn relationship_confidence(a: &DetectedEntity, b: &DetectedEntity) -> f64 {
    let element_count = (a.source_element_ids.len() + b.source_element_ids.len()).min(4);
    clamp01(0.5 + 0.05 * element_count as f64 + 0.15 * (a.confidence + b.confidence))
}

/// Infer relationships across all entities
///
/// Output is sorted by `sort_relationships`.
pub fn infer_relationships(entities: &[DetectedEntity]) -> Vec<SuggestedRelationship> {
    let mut relationships = Vec::new();

    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            if a.key() == b.key() {
                continue;
            }

            for (from, to) in [(a, b), (b, a)] {
                let Some(relationship_type) = lookup(from.semantic_type, to.semantic_type) else {
                    continue;
                };

                let confidence = relationship_confidence(from, to);
                if confidence < MIN_RELATIONSHIP_CONFIDENCE {
                    debug!(
                        from = %from.name,
                        to = %to.name,
                        confidence,
                        "Dropping low-confidence relationship"
                    );
                    continue;
                }

                relationships.push(SuggestedRelationship {
                    from: from.name.clone(),
                    to: to.name.clone(),
                    relationship_type,
                    confidence,
                    reasoning: format!(
                        "{} entities relate {} to {} entities",
                        from.semantic_type,
                        relationship_type.as_str(),
                        to.semantic_type
                    ),
                });
            }
        }
    }

    sort_relationships(&mut relationships);
    debug!(count = relationships.len(), "Relationships inferred");
    relationships
}

/// Sort by confidence descending, ties by `(from, to, type)` ascending
pub fn sort_relationships(relationships: &mut [SuggestedRelationship]) {
    relationships.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| tie_break(a, b))
    });
}

fn tie_break(a: &SuggestedRelationship, b: &SuggestedRelationship) -> Ordering {
    a.from
        .cmp(&b.from)
        .then_with(|| a.to.cmp(&b.to))
        .then_with(|| a.relationship_type.as_str().cmp(b.relationship_type.as_str()))
}
