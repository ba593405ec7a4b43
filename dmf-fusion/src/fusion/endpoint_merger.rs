// Endpoint Merger - Suggested API Surface
//
// Deduplicates analyzer-suggested endpoints by (method, path). When no analyzer
// suggested any, standard REST endpoints are derived from the fused entities.

use crate::types::{DetectedEntity, HttpMethod, SuggestedEndpoint};
use std::collections::HashMap;
use tracing::debug;

/// Deduplicate by `(method, path)`, keeping the highest-confidence suggestion
///
/// First-seen order is preserved.
pub fn merge_endpoints(
    endpoints: impl IntoIterator<Item = SuggestedEndpoint>,
) -> Vec<SuggestedEndpoint> {
    let mut merged: Vec<SuggestedEndpoint> = Vec::new();
    let mut index: HashMap<(HttpMethod, String), usize> = HashMap::new();

    for candidate in endpoints {
        let key = (candidate.method, candidate.path.clone());
        match index.get(&key) {
            Some(&position) => {
                if candidate.confidence > merged[position].confidence {
                    merged[position] = candidate;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(candidate);
            }
        }
    }
    merged
}

/// Five CRUD endpoints per entity
pub fn derive_endpoints(entities: &[DetectedEntity]) -> Vec<SuggestedEndpoint> {
    let endpoints: Vec<SuggestedEndpoint> = entities
        .iter()
        .flat_map(|entity| {
            let collection = format!("/api/{}", entity.table_name);
            let item = format!("{}/:id", collection);
            [
                (HttpMethod::Get, collection.clone(), format!("List {}", entity.table_name)),
                (HttpMethod::Post, collection, format!("Create a {}", entity.name)),
                (HttpMethod::Get, item.clone(), format!("Fetch one {}", entity.name)),
                (HttpMethod::Put, item.clone(), format!("Update a {}", entity.name)),
                (HttpMethod::Delete, item, format!("Delete a {}", entity.name)),
            ]
            .into_iter()
            .map(move |(method, path, description)| SuggestedEndpoint {
                method,
                path,
                description,
                entity: Some(entity.name.clone()),
                confidence: entity.confidence,
            })
        })
        .collect();

    debug!(endpoints = endpoints.len(), "Derived CRUD endpoints");
    endpoints
}
