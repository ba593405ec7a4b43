// Relationship Merger - Highest Confidence Wins
//
// Collapses relationships sharing a (from, to, type) key. Exact confidence ties
// keep the instance with the longer reasoning string.

use crate::analysis::relationship_inferrer::sort_relationships;
use crate::types::{RelationshipType, SuggestedRelationship};
use std::collections::HashMap;
use tracing::debug;

/// Deduplicate relationships by `(from, to, type)` and sort the survivors
pub fn merge_relationships(
    relationships: impl IntoIterator<Item = SuggestedRelationship>,
) -> Vec<SuggestedRelationship> {
    let mut merged: Vec<SuggestedRelationship> = Vec::new();
    let mut index: HashMap<(String, String, RelationshipType), usize> = HashMap::new();
    let mut duplicates = 0usize;

    for candidate in relationships {
        match index.get(&candidate.key()) {
            Some(&position) => {
                duplicates += 1;
                if supersedes(&candidate, &merged[position]) {
                    merged[position] = candidate;
                }
            }
            None => {
                index.insert(candidate.key(), merged.len());
                merged.push(candidate);
            }
        }
    }

    sort_relationships(&mut merged);
    debug!(
        relationships = merged.len(),
        duplicates,
        "Relationships merged"
    );
    merged
}

fn supersedes(candidate: &SuggestedRelationship, current: &SuggestedRelationship) -> bool {
    candidate.confidence > current.confidence
        || (candidate.confidence == current.confidence
            && candidate.reasoning.len() > current.reasoning.len())
}
