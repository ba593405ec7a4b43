//! Entity Normalizer
//!
//! Turns one source's entity-like record into a canonical `DetectedEntity`:
//! - PascalCase entity name, snake_case plural table name
//! - Semantic classification from an ordered keyword table
//! - Exactly one primary key (synthetic `id` injected when absent)
//! - Optional `created_at`/`updated_at` timestamp fields
//! - Field names snake_cased and unique (case-insensitive)
//!
//! Malformed field records are dropped with a warning. Only an entity name that
//! canonicalizes to nothing is an error.

use crate::analysis::confidence::{clamp01, from_json};
use crate::error::FusionError;
use crate::types::{
    DetectedEntity, DetectedField, FieldType, RawFieldRecord, SemanticType, SourceMethod,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Ordered semantic classification table
///
/// Evaluated top to bottom against the lowercased entity name; the first row
/// with a matching keyword wins. Names matching no row are `Metadata`.
pub const SEMANTIC_RULES: &[(&[&str], SemanticType)] = &[
    (
        &["user", "profile", "account", "member", "customer", "author", "person"],
        SemanticType::User,
    ),
    (
        &["form", "submission", "survey", "feedback", "inquiry", "registration", "checkout"],
        SemanticType::Form,
    ),
    (
        &["nav", "menu", "breadcrumb", "sidebar", "link", "route", "sitemap", "footer", "header"],
        SemanticType::Navigation,
    ),
    (
        &[
            "image", "photo", "video", "media", "gallery", "avatar", "upload", "file",
            "attachment", "thumbnail",
        ],
        SemanticType::Media,
    ),
    (
        &["location", "map", "address", "place", "geo", "venue", "region", "coordinate", "zone"],
        SemanticType::Spatial,
    ),
    (
        &[
            "post", "article", "comment", "product", "item", "content", "blog", "review", "order",
            "message", "news", "story", "listing", "catalog",
        ],
        SemanticType::Content,
    ),
];

/// Validated entity input awaiting normalization
#[derive(Debug, Clone, Default)]
pub struct EntityDraft {
    pub name: String,
    pub table_name: Option<String>,
    pub fields: Vec<RawFieldRecord>,
    pub confidence: f64,
    pub reasoning: String,
    pub source_element_ids: BTreeSet<String>,
}

/// Normalizer options
#[derive(Debug, Clone, Copy)]
pub struct NormalizerOptions {
    /// Append `created_at`/`updated_at` when missing
    pub timestamp_fields: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            timestamp_fields: true,
        }
    }
}

/// Entity Normalizer
#[derive(Debug, Clone, Default)]
pub struct EntityNormalizer {
    options: NormalizerOptions,
}

impl EntityNormalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    /// Normalize one entity draft produced by `method`
    ///
    /// # Errors
    /// `FusionError::InvalidEntityName` if the name has no alphanumeric content
    pub fn normalize(
        &self,
        draft: EntityDraft,
        method: SourceMethod,
    ) -> Result<DetectedEntity, FusionError> {
        let name = to_pascal_case(&draft.name);
        if name.is_empty() {
            return Err(FusionError::InvalidEntityName(draft.name));
        }

        let table_name = match draft.table_name.as_deref().map(to_snake_case) {
            Some(table) if !table.is_empty() => table,
            _ => table_name_for(&name),
        };

        let semantic_type = classify(&name);
        let fields = self.normalize_fields(draft.fields, &name, method);

        let reasoning = if draft.reasoning.trim().is_empty() {
            format!("Detected by {} analysis", method)
        } else {
            draft.reasoning.trim().to_string()
        };

        debug!(
            entity = %name,
            table = %table_name,
            semantic_type = %semantic_type,
            fields = fields.len(),
            "Entity normalized"
        );

        Ok(DetectedEntity {
            name,
            table_name,
            fields,
            semantic_type,
            source_element_ids: draft.source_element_ids,
            confidence: clamp01(draft.confidence),
            reasoning,
            source_methods: BTreeSet::from([method]),
        })
    }

    fn normalize_fields(
        &self,
        records: Vec<RawFieldRecord>,
        entity: &str,
        method: SourceMethod,
    ) -> Vec<DetectedField> {
        let mut fields: Vec<DetectedField> = Vec::new();

        for record in records {
            let Some(field) = validate_field(record, entity, method) else {
                continue;
            };

            match fields.iter_mut().find(|f| f.key() == field.key()) {
                Some(existing) => {
                    debug!(entity, field = %field.name, "Folding duplicate field");
                    existing.required |= field.required;
                    existing.unique |= field.unique;
                    existing.is_primary |= field.is_primary;
                    existing.confidence = max_confidence(existing.confidence, field.confidence);
                    if existing.description.is_none() {
                        existing.description = field.description;
                    }
                }
                None => fields.push(field),
            }
        }

        ensure_single_primary(&mut fields, method);

        if self.options.timestamp_fields {
            for name in ["created_at", "updated_at"] {
                if !fields.iter().any(|f| f.key() == name) {
                    let mut timestamp = DetectedField::new(name, FieldType::Date, method);
                    timestamp.required = true;
                    fields.push(timestamp);
                }
            }
        }

        fields
    }
}

/// Validate one raw field record, `None` if it must be dropped
fn validate_field(
    record: RawFieldRecord,
    entity: &str,
    method: SourceMethod,
) -> Option<DetectedField> {
    let Some(raw_name) = record.name.filter(|n| !n.trim().is_empty()) else {
        warn!(entity, "Dropping field record without a name");
        return None;
    };
    let Some(raw_type) = record.field_type.filter(|t| !t.trim().is_empty()) else {
        warn!(entity, field = %raw_name, "Dropping field record without a type");
        return None;
    };

    let name = to_snake_case(&raw_name);
    if name.is_empty() {
        warn!(entity, field = %raw_name, "Dropping field with unusable name");
        return None;
    }

    let field_type = FieldType::parse(&raw_type).unwrap_or_else(|| {
        warn!(entity, field = %name, raw_type = %raw_type, "Unknown field type, using string");
        FieldType::String
    });

    Some(DetectedField {
        name,
        field_type,
        required: record.required.unwrap_or(false),
        unique: record.unique.unwrap_or(false),
        is_primary: record.is_primary.unwrap_or(false),
        source_methods: BTreeSet::from([method]),
        confidence: record.confidence.as_ref().and_then(from_json),
        description: record.description.filter(|d| !d.trim().is_empty()),
    })
}

/// Leave exactly one primary field at the front of the list
fn ensure_single_primary(fields: &mut Vec<DetectedField>, method: SourceMethod) {
    let first_primary = fields.iter().position(|f| f.is_primary);

    match first_primary {
        Some(index) => {
            for (i, field) in fields.iter_mut().enumerate() {
                if i != index {
                    field.is_primary = false;
                }
            }
            if index != 0 {
                let primary = fields.remove(index);
                fields.insert(0, primary);
            }
        }
        None => match fields.iter().position(|f| f.key() == "id") {
            // An unflagged `id` column becomes the key rather than colliding with a synthetic one
            Some(index) => {
                let mut id = fields.remove(index);
                id.is_primary = true;
                id.required = true;
                id.unique = true;
                fields.insert(0, id);
            }
            None => fields.insert(0, DetectedField::primary_key(method)),
        },
    }
}

fn max_confidence(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Classify an entity name with `SEMANTIC_RULES`
pub fn classify(name: &str) -> SemanticType {
    let lower = name.to_lowercase();
    SEMANTIC_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, semantic_type)| *semantic_type)
        .unwrap_or(SemanticType::Metadata)
}

/// Split an identifier into words
///
/// Boundaries are non-alphanumeric characters, lower/digit→upper transitions
/// and the last capital of an acronym run (`APIKey` → `API`, `Key`).
pub fn split_words(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `user profile` / `user_profile` / `USER-PROFILE` → `UserProfile`
pub fn to_pascal_case(raw: &str) -> String {
    split_words(raw)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `UserProfile` / `user profile` → `user_profile`
pub fn to_snake_case(raw: &str) -> String {
    split_words(raw)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// snake_case plural table name for an entity name
pub fn table_name_for(entity_name: &str) -> String {
    let mut words: Vec<String> = split_words(entity_name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect();
    if let Some(last) = words.pop() {
        words.push(pluralize(&last));
    }
    words.join("_")
}

/// Pluralize one lowercase English word
pub fn pluralize(word: &str) -> String {
    const UNCHANGED: &[&str] = &["data", "metadata", "media", "news", "information", "feedback"];
    const IRREGULAR: &[(&str, &str)] = &[("person", "people"), ("child", "children")];

    if word.is_empty() || UNCHANGED.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }

    if ["ss", "us", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let vowel_before = stem.chars().last().is_some_and(|c| "aeiou".contains(c));
        if !vowel_before && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: &str) -> RawFieldRecord {
        RawFieldRecord {
            name: Some(name.to_string()),
            field_type: Some(field_type.to_string()),
            ..Default::default()
        }
    }

    fn draft(name: &str, fields: Vec<RawFieldRecord>) -> EntityDraft {
        EntityDraft {
            name: name.to_string(),
            fields,
            confidence: 0.8,
            ..Default::default()
        }
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("product"), "Product");
        assert_eq!(to_pascal_case("Product"), "Product");
        assert_eq!(to_pascal_case("user profile"), "UserProfile");
        assert_eq!(to_pascal_case("user_profile"), "UserProfile");
        assert_eq!(to_pascal_case("UserProfile"), "UserProfile");
        assert_eq!(to_pascal_case("USER-PROFILE"), "UserProfile");
        assert_eq!(to_pascal_case("APIKey"), "ApiKey");
        assert_eq!(to_pascal_case("  --  "), "");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("UserProfile"), "user_profile");
        assert_eq!(to_snake_case("First Name"), "first_name");
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("page2Title"), "page2_title");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(table_name_for("Product"), "products");
        assert_eq!(table_name_for("UserProfile"), "user_profiles");
        assert_eq!(table_name_for("Category"), "categories");
        assert_eq!(table_name_for("Address"), "addresses");
        assert_eq!(table_name_for("Status"), "statuses");
        assert_eq!(table_name_for("Day"), "days");
        assert_eq!(table_name_for("Person"), "people");
        assert_eq!(table_name_for("Metadata"), "metadata");
        assert_eq!(table_name_for("Settings"), "settings");
    }

    #[test]
    fn test_classification_priority_order() {
        assert_eq!(classify("UserProfile"), SemanticType::User);
        // user row precedes media row
        assert_eq!(classify("ProfileAvatar"), SemanticType::User);
        // media row precedes content row
        assert_eq!(classify("ProductImage"), SemanticType::Media);
        // form row precedes content row
        assert_eq!(classify("OrderForm"), SemanticType::Form);
        // navigation row precedes spatial row
        assert_eq!(classify("Sitemap"), SemanticType::Navigation);
        assert_eq!(classify("StoreLocation"), SemanticType::Spatial);
        assert_eq!(classify("BlogPost"), SemanticType::Content);
        assert_eq!(classify("Setting"), SemanticType::Metadata);
    }

    #[test]
    fn test_injects_primary_key_first() {
        let normalizer = EntityNormalizer::default();
        let entity = normalizer
            .normalize(draft("product", vec![field("title", "string")]), SourceMethod::Text)
            .unwrap();

        assert_eq!(entity.name, "Product");
        assert_eq!(entity.table_name, "products");
        assert_eq!(entity.fields[0].name, "id");
        assert!(entity.fields[0].is_primary);
        assert!(entity.fields[0].required && entity.fields[0].unique);
        assert_eq!(entity.fields.iter().filter(|f| f.is_primary).count(), 1);
        assert!(entity.field("created_at").is_some());
        assert!(entity.field("updated_at").is_some());
    }

    #[test]
    fn test_existing_primary_is_kept() {
        let normalizer = EntityNormalizer::new(NormalizerOptions { timestamp_fields: false });
        let mut sku = field("sku", "string");
        sku.is_primary = Some(true);
        let mut code = field("code", "string");
        code.is_primary = Some(true);

        let entity = normalizer
            .normalize(draft("Product", vec![sku, code]), SourceMethod::Vision)
            .unwrap();

        assert_eq!(entity.fields.len(), 2);
        assert_eq!(entity.primary_key().unwrap().name, "sku");
        assert_eq!(entity.fields.iter().filter(|f| f.is_primary).count(), 1);
    }

    #[test]
    fn test_flagged_primary_moves_to_front() {
        let normalizer = EntityNormalizer::new(NormalizerOptions { timestamp_fields: false });
        let mut sku = field("sku", "string");
        sku.is_primary = Some(true);

        let entity = normalizer
            .normalize(draft("Product", vec![field("title", "string"), sku]), SourceMethod::Text)
            .unwrap();

        let names: Vec<&str> = entity.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["sku", "title"]);
        assert!(entity.fields[0].is_primary);
        assert!(!entity.fields[1].is_primary);
    }

    #[test]
    fn test_unflagged_id_becomes_primary() {
        let normalizer = EntityNormalizer::new(NormalizerOptions { timestamp_fields: false });
        let entity = normalizer
            .normalize(
                draft("Order", vec![field("total", "number"), field("ID", "uuid")]),
                SourceMethod::Text,
            )
            .unwrap();

        assert_eq!(entity.fields.len(), 2);
        assert_eq!(entity.fields[0].name, "id");
        assert!(entity.fields[0].is_primary);
    }

    #[test]
    fn test_malformed_fields_dropped() {
        let normalizer = EntityNormalizer::new(NormalizerOptions { timestamp_fields: false });
        let no_type = RawFieldRecord {
            name: Some("orphan".into()),
            ..Default::default()
        };
        let no_name = RawFieldRecord {
            field_type: Some("string".into()),
            ..Default::default()
        };

        let entity = normalizer
            .normalize(draft("Tag", vec![no_type, no_name]), SourceMethod::Text)
            .unwrap();

        // Only the synthetic primary key survives
        assert_eq!(entity.fields.len(), 1);
        assert_eq!(entity.fields[0].name, "id");
    }

    #[test]
    fn test_duplicate_fields_fold_case_insensitively() {
        let normalizer = EntityNormalizer::new(NormalizerOptions { timestamp_fields: false });
        let mut upper = field("Email", "string");
        upper.unique = Some(true);
        let mut lower = field("email", "string");
        lower.required = Some(true);

        let entity = normalizer
            .normalize(draft("Customer", vec![upper, lower]), SourceMethod::Text)
            .unwrap();

        let email = entity.field("EMAIL").unwrap();
        assert!(email.required && email.unique);
        assert_eq!(entity.fields.iter().filter(|f| f.key() == "email").count(), 1);
    }

    #[test]
    fn test_invalid_name_is_error() {
        let normalizer = EntityNormalizer::default();
        let result = normalizer.normalize(draft("!!!", vec![]), SourceMethod::Text);
        assert!(matches!(result, Err(FusionError::InvalidEntityName(_))));
    }

    #[test]
    fn test_confidence_clamped() {
        let normalizer = EntityNormalizer::default();
        let mut d = draft("Tag", vec![]);
        d.confidence = 7.5;
        assert_eq!(normalizer.normalize(d, SourceMethod::Text).unwrap().confidence, 1.0);

        let mut d = draft("Tag", vec![]);
        d.confidence = f64::NAN;
        assert_eq!(normalizer.normalize(d, SourceMethod::Text).unwrap().confidence, 0.0);
    }

    #[test]
    fn test_supplied_table_name_snake_cased() {
        let normalizer = EntityNormalizer::default();
        let mut d = draft("Product", vec![]);
        d.table_name = Some("CatalogProducts".into());
        assert_eq!(
            normalizer.normalize(d, SourceMethod::Text).unwrap().table_name,
            "catalog_products"
        );
    }
}
