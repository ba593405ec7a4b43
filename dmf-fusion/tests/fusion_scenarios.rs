// Fusion Scenario Tests
//
// Feed raw analyzer payloads through the result builder and the fusion engine
// and check the fused model: entity deduplication, agreement boosting,
// relationship deduplication, method selection and field type conflicts.

mod helpers;

use dmf_fusion::analysis::result_builder::ResultBuilder;
use dmf_fusion::fusion::entity_merger::{COMBINED_REASONING_PREFIX, CONFIRMED_MARKER};
use dmf_fusion::fusion::{FusionEngine, FusionOptions};
use dmf_fusion::types::{
    AnalysisMethod, DesignDocument, FieldType, FieldTypePolicy, HttpMethod, RelationshipType,
    SemanticType, SingleSourceResult, SourceMethod,
};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};

fn load_fixture(name: &str) -> Value {
    let content = std::fs::read_to_string(helpers::fixture_path(name)).expect("fixture readable");
    serde_json::from_str(&content).expect("fixture is valid JSON")
}

fn text(payload: &Value) -> SingleSourceResult {
    ResultBuilder::default().build(payload, SourceMethod::Text)
}

fn vision(payload: &Value) -> SingleSourceResult {
    ResultBuilder::default().build(payload, SourceMethod::Vision)
}

fn engine_with(policy: FieldTypePolicy) -> FusionEngine {
    FusionEngine::new(FusionOptions {
        field_type_policy: policy,
        ..Default::default()
    })
}

// ================================================================================================
// Storefront fixture: both sources contribute
// ================================================================================================

#[test]
fn storefront_fuses_into_combined_model() {
    // Arrange
    let text_result = text(&load_fixture("text_result.json"));
    let vision_result = vision(&load_fixture("vision_result.json"));
    let avg_text = text_result.average_confidence();
    let avg_vision = vision_result.average_confidence();

    // Act
    let analysis = FusionEngine::default().fuse(
        Some(text_result),
        Some(vision_result),
        &DesignDocument::default(),
    );

    // Assert: entities deduplicated by canonical name, text order first
    assert_eq!(analysis.analysis_method, AnalysisMethod::Combined);
    let names: Vec<&str> = analysis.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Product", "Customer", "Order"]);

    let product = analysis.entity("product").expect("Product should be detected");
    assert_eq!(
        product.source_methods,
        BTreeSet::from([SourceMethod::Text, SourceMethod::Vision]),
        "Product should be attributed to both sources"
    );
    assert!(product.confidence > 0.9 && product.confidence <= 1.0);
    assert!(product.reasoning.starts_with(COMBINED_REASONING_PREFIX));
    assert_eq!(product.source_element_ids, BTreeSet::from(["10:1".to_string()]));
    assert_eq!(product.fields.iter().filter(|f| f.is_primary).count(), 1);

    // Assert: field union with provenance and confirmation marker
    let price = product.field("price").unwrap();
    assert_eq!(price.field_type, FieldType::Number, "Specific type beats string");
    assert!(price.required);
    assert_eq!(price.source_methods.len(), 2);
    let description = price.description.as_deref().unwrap();
    assert!(description.starts_with("Unit price"));
    assert!(description.ends_with(CONFIRMED_MARKER));
    assert!(product.field("image_url").is_some(), "Vision-only field carried over");

    // Assert: string-encoded confidence accepted, camelCase field canonicalized
    let order = analysis.entity("Order").unwrap();
    assert!((order.confidence - 0.6).abs() < 1e-9);
    assert_eq!(order.field("order_date").unwrap().field_type, FieldType::Date);
    assert_eq!(analysis.entity("Customer").unwrap().semantic_type, SemanticType::User);

    // Assert: combined score
    assert!(analysis.confidence_score > avg_text.max(avg_vision));
    assert!(analysis.confidence_score <= 1.0);

    // Assert: insights routed per source
    assert_eq!(analysis.text_insights, vec!["Storefront with catalog and account pages"]);
    assert_eq!(
        analysis.vision_insights,
        vec!["Card grid layout", "Primary call-to-action buttons"]
    );
}

#[test]
fn storefront_relationships_are_unique_and_sorted() {
    let analysis = FusionEngine::default().fuse(
        Some(text(&load_fixture("text_result.json"))),
        Some(vision(&load_fixture("vision_result.json"))),
        &DesignDocument::default(),
    );

    let mut keys = HashSet::new();
    for rel in &analysis.relationships {
        assert!(
            keys.insert((rel.from.clone(), rel.to.clone(), rel.relationship_type)),
            "Duplicate relationship {} -> {}",
            rel.from,
            rel.to
        );
    }

    let customer_orders = analysis
        .relationships
        .iter()
        .find(|r| {
            r.from == "Customer"
                && r.to == "Order"
                && r.relationship_type == RelationshipType::OneToMany
        })
        .expect("Customer -> Order should survive");
    assert_eq!(customer_orders.confidence, 0.9, "Highest suggestion wins over inferred and text");

    assert!(analysis
        .relationships
        .windows(2)
        .all(|pair| pair[0].confidence >= pair[1].confidence));
}

#[test]
fn analyzer_endpoints_replace_derived_ones() {
    let payload = json!({
        "entities": [{"name": "Product", "confidence": 0.8}],
        "endpoints": [
            {"method": "get", "path": "/api/products", "confidence": 0.6},
            {"method": "GET", "path": "/api/products", "confidence": 0.9},
            {"method": "TRACE", "path": "/api/products"},
            {"method": "POST", "path": "api/products"}
        ]
    });

    let analysis =
        FusionEngine::default().fuse(Some(text(&payload)), None, &DesignDocument::default());

    assert_eq!(analysis.endpoints.len(), 1);
    assert_eq!(analysis.endpoints[0].method, HttpMethod::Get);
    assert_eq!(analysis.endpoints[0].confidence, 0.9);
}

// ================================================================================================
// Method selection
// ================================================================================================

#[test]
fn method_table_holds_for_all_combinations() {
    let with_entities = json!({"entities": [{"name": "Article", "confidence": 0.8}]});
    let without_entities = json!({"entities": []});

    let cases = [
        (&with_entities, &with_entities, AnalysisMethod::Combined),
        (&with_entities, &without_entities, AnalysisMethod::TextOnly),
        (&without_entities, &with_entities, AnalysisMethod::VisionOnly),
        (&without_entities, &without_entities, AnalysisMethod::RuleBasedFallback),
    ];

    for (text_payload, vision_payload, expected) in cases {
        let analysis = FusionEngine::default().fuse(
            Some(text(text_payload)),
            Some(vision(vision_payload)),
            &DesignDocument::default(),
        );
        assert_eq!(analysis.analysis_method, expected);
    }
}

#[test]
fn single_source_scores_that_source_average() {
    let payload = json!({
        "entities": [
            {"name": "Photo", "confidence": 0.6},
            {"name": "Gallery", "confidence": 0.8}
        ]
    });

    let analysis =
        FusionEngine::default().fuse(None, Some(vision(&payload)), &DesignDocument::default());

    assert_eq!(analysis.analysis_method, AnalysisMethod::VisionOnly);
    assert!((analysis.confidence_score - 0.7).abs() < 1e-9);
}

// ================================================================================================
// Relationship deduplication
// ================================================================================================

#[test]
fn duplicate_relationship_keeps_highest_confidence() {
    // Arrange: low entity confidences keep the inferred User -> Post below both suggestions
    let text_payload = json!({
        "entities": [
            {"name": "User", "confidence": 0.3},
            {"name": "Post", "confidence": 0.3}
        ],
        "relationships": [{"from": "User", "to": "Post", "type": "oneToMany", "confidence": 0.7}]
    });
    let vision_payload = json!({
        "relationships": [{"from": "User", "to": "Post", "type": "oneToMany", "confidence": 0.9}]
    });

    // Act
    let analysis = FusionEngine::default().fuse(
        Some(text(&text_payload)),
        Some(vision(&vision_payload)),
        &DesignDocument::default(),
    );

    // Assert
    let survivors: Vec<_> = analysis
        .relationships
        .iter()
        .filter(|r| {
            r.from == "User" && r.to == "Post" && r.relationship_type == RelationshipType::OneToMany
        })
        .collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].confidence, 0.9);
}

// ================================================================================================
// Field type conflict policy
// ================================================================================================

fn conflicting_price_sources() -> (SingleSourceResult, SingleSourceResult) {
    let text_payload = json!({
        "entities": [{
            "name": "Product",
            "confidence": 0.6,
            "fields": [{"name": "price", "type": "string"}]
        }]
    });
    let vision_payload = json!({
        "entities": [{
            "name": "Product",
            "confidence": 0.9,
            "fields": [{"name": "price", "type": "number"}]
        }]
    });
    (text(&text_payload), vision(&vision_payload))
}

#[test]
fn field_type_policy_prefer_specific() {
    let (t, v) = conflicting_price_sources();
    let analysis = engine_with(FieldTypePolicy::PreferSpecific).fuse(
        Some(t),
        Some(v),
        &DesignDocument::default(),
    );
    let price = analysis.entity("Product").unwrap().field("price").unwrap();
    assert_eq!(price.field_type, FieldType::Number);
}

#[test]
fn field_type_policy_prefer_existing() {
    let (t, v) = conflicting_price_sources();
    let analysis = engine_with(FieldTypePolicy::PreferExisting).fuse(
        Some(t),
        Some(v),
        &DesignDocument::default(),
    );
    let price = analysis.entity("Product").unwrap().field("price").unwrap();
    assert_eq!(price.field_type, FieldType::String, "Text-first type is kept");
}

#[test]
fn field_type_policy_prefer_higher_confidence() {
    let (t, v) = conflicting_price_sources();
    let analysis = engine_with(FieldTypePolicy::PreferHigherConfidence).fuse(
        Some(t),
        Some(v),
        &DesignDocument::default(),
    );
    let price = analysis.entity("Product").unwrap().field("price").unwrap();
    assert_eq!(price.field_type, FieldType::Number, "Vision entity is more confident");

    // A confident text field outranks the vision entity
    let text_payload = json!({
        "entities": [{
            "name": "Product",
            "confidence": 0.6,
            "fields": [{"name": "price", "type": "string", "confidence": 0.95}]
        }]
    });
    let (_, v) = conflicting_price_sources();
    let analysis = engine_with(FieldTypePolicy::PreferHigherConfidence).fuse(
        Some(text(&text_payload)),
        Some(v),
        &DesignDocument::default(),
    );
    let price = analysis.entity("Product").unwrap().field("price").unwrap();
    assert_eq!(price.field_type, FieldType::String);
}

// ================================================================================================
// Same-source duplicates
// ================================================================================================

#[test]
fn same_source_duplicates_merge_without_boost() {
    let payload = json!({
        "entities": [
            {"name": "blog post", "confidence": 0.6, "reasoning": "List view"},
            {"name": "BlogPost", "confidence": 0.7, "reasoning": "Detail view"}
        ]
    });

    let analysis =
        FusionEngine::default().fuse(Some(text(&payload)), None, &DesignDocument::default());

    assert_eq!(analysis.entities.len(), 1);
    let post = &analysis.entities[0];
    assert_eq!(post.name, "BlogPost");
    assert_eq!(post.table_name, "blog_posts");
    assert_eq!(post.confidence, 0.7);
    assert_eq!(post.reasoning, "List view; Detail view");
    assert_eq!(post.source_methods, BTreeSet::from([SourceMethod::Text]));
}
