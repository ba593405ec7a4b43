//! Core Types and Trait Definitions for DMF
//!
//! Defines the data model shared by every stage of the analysis pipeline:
//! - **Input:** design documents and screenshot descriptors
//! - **Raw payloads:** loosely-typed analyzer records, validated at the boundary
//! - **Model:** detected entities, fields, relationships and endpoints
//! - **Output:** the fused `CombinedAnalysis`
//!
//! Also defines the two analyzer traits (text and vision). Implementations of
//! those traits live outside the fusion core; see `analyzers` for the replay
//! implementations used by the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Design Input
// ============================================================================

/// Structured description of a UI design
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    /// Design/project name
    #[serde(default)]
    pub name: Option<String>,
    /// Pages (frames/screens) of the design
    #[serde(default)]
    pub pages: Vec<DesignPage>,
    /// Rendered screenshots available for vision analysis
    #[serde(default)]
    pub screenshots: Vec<ScreenshotDescriptor>,
}

impl DesignDocument {
    /// Iterate every node of every page, depth-first
    pub fn walk_nodes(&self) -> impl Iterator<Item = &DesignNode> {
        self.pages.iter().flat_map(|page| page.nodes.iter().flat_map(DesignNode::walk))
    }
}

/// One page of a design
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignPage {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<DesignNode>,
}

/// One design node (frame, group, text, input, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Node kind as reported by the design tool (e.g. "FRAME", "TEXT")
    #[serde(default, rename = "type")]
    pub node_type: String,
    /// Text content for text-bearing nodes
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub children: Vec<DesignNode>,
}

impl DesignNode {
    /// This node followed by all descendants, depth-first
    pub fn walk(&self) -> Box<dyn Iterator<Item = &DesignNode> + '_> {
        Box::new(std::iter::once(self).chain(self.children.iter().flat_map(DesignNode::walk)))
    }

    /// Text if present and non-blank, otherwise the node name
    pub fn label(&self) -> &str {
        match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.name,
        }
    }
}

/// Axis-aligned bounding box of a design node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// True when `other` lies entirely within this box
    pub fn contains(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Screenshot handed to the vision analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotDescriptor {
    pub page_id: String,
    #[serde(default)]
    pub name: String,
    pub image_url: String,
}

// ============================================================================
// Closed Enumerations
// ============================================================================

/// Analysis source that produced a piece of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Text,
    Vision,
}

impl SourceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::Text => "text",
            SourceMethod::Vision => "vision",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column type of a detected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Geometry,
    Point,
    Json,
    Array,
}

impl FieldType {
    /// Parse a raw analyzer type name, accepting common aliases
    ///
    /// Returns `None` for names outside the known vocabulary.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let field_type = match normalized.as_str() {
            "string" | "text" | "varchar" | "char" | "uuid" | "email" | "url" | "str" => {
                FieldType::String
            }
            "number" | "integer" | "int" | "float" | "double" | "decimal" | "bigint"
            | "numeric" => FieldType::Number,
            "boolean" | "bool" => FieldType::Boolean,
            "date" | "datetime" | "timestamp" | "time" => FieldType::Date,
            "geometry" | "polygon" | "geojson" => FieldType::Geometry,
            "point" | "coordinates" | "latlng" => FieldType::Point,
            "json" | "object" | "jsonb" => FieldType::Json,
            "array" | "list" => FieldType::Array,
            _ => return None,
        };
        Some(field_type)
    }

    /// Rank used when two sources disagree on a field's type
    ///
    /// `String` is the default type and ranks lowest.
    pub fn specificity(&self) -> u8 {
        match self {
            FieldType::String => 0,
            FieldType::Json => 1,
            FieldType::Array => 2,
            FieldType::Number | FieldType::Boolean | FieldType::Date => 3,
            FieldType::Geometry | FieldType::Point => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Geometry => "geometry",
            FieldType::Point => "point",
            FieldType::Json => "json",
            FieldType::Array => "array",
        }
    }
}

/// Coarse entity classification driving relationship inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    User,
    Form,
    Navigation,
    Media,
    Spatial,
    Content,
    Metadata,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::User => "user",
            SemanticType::Form => "form",
            SemanticType::Navigation => "navigation",
            SemanticType::Media => "media",
            SemanticType::Spatial => "spatial",
            SemanticType::Content => "content",
            SemanticType::Metadata => "metadata",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality of a suggested relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationshipType {
    /// Parse a raw analyzer cardinality, accepting common spellings
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ':')
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "onetoone" | "1:1" | "hasone" => Some(RelationshipType::OneToOne),
            "onetomany" | "1:n" | "1:m" | "hasmany" | "manytoone" | "n:1" | "belongsto" => {
                Some(RelationshipType::OneToMany)
            }
            "manytomany" | "n:m" | "m:n" | "n:n" => Some(RelationshipType::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::OneToOne => "oneToOne",
            RelationshipType::OneToMany => "oneToMany",
            RelationshipType::ManyToMany => "manyToMany",
        }
    }
}

/// Which sources the fused result was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Combined,
    TextOnly,
    VisionOnly,
    RuleBasedFallback,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Combined => "combined",
            AnalysisMethod::TextOnly => "text_only",
            AnalysisMethod::VisionOnly => "vision_only",
            AnalysisMethod::RuleBasedFallback => "rule_based_fallback",
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb of a suggested endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

/// Policy for resolving a field whose declared type differs between sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldTypePolicy {
    /// Non-default (non-`string`) and higher-specificity types win
    #[default]
    PreferSpecific,
    /// First-seen type is kept (text source is merged first)
    PreferExisting,
    /// Type from the higher-confidence field wins
    PreferHigherConfidence,
}

impl FromStr for FieldTypePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prefer_specific" => Ok(FieldTypePolicy::PreferSpecific),
            "prefer_existing" => Ok(FieldTypePolicy::PreferExisting),
            "prefer_higher_confidence" => Ok(FieldTypePolicy::PreferHigherConfidence),
            other => Err(format!("unknown field type policy '{}'", other)),
        }
    }
}

// ============================================================================
// Detected Model
// ============================================================================

/// One column candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedField {
    /// snake_case field name
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub is_primary: bool,
    /// Provenance; a merged field may carry both methods
    pub source_methods: BTreeSet<SourceMethod>,
    /// Independent score; `None` inherits the entity confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DetectedField {
    /// Plain optional field from one source
    pub fn new(name: impl Into<String>, field_type: FieldType, method: SourceMethod) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            is_primary: false,
            source_methods: BTreeSet::from([method]),
            confidence: None,
            description: None,
        }
    }

    /// Synthetic `id` primary key
    pub fn primary_key(method: SourceMethod) -> Self {
        Self {
            required: true,
            unique: true,
            is_primary: true,
            description: Some("uuid".to_string()),
            ..Self::new("id", FieldType::String, method)
        }
    }

    /// Case-insensitive identity key
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// One table/model candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedEntity {
    /// PascalCase canonical name
    pub name: String,
    /// snake_case plural table name
    pub table_name: String,
    pub fields: Vec<DetectedField>,
    pub semantic_type: SemanticType,
    pub source_element_ids: BTreeSet<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub source_methods: BTreeSet<SourceMethod>,
}

impl DetectedEntity {
    /// Case-insensitive identity key used for deduplication
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn primary_key(&self) -> Option<&DetectedField> {
        self.fields.iter().find(|f| f.is_primary)
    }

    pub fn field(&self, name: &str) -> Option<&DetectedField> {
        let key = name.to_lowercase();
        self.fields.iter().find(|f| f.key() == key)
    }
}

/// Directed relationship between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedRelationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub confidence: f64,
    pub reasoning: String,
}

impl SuggestedRelationship {
    /// Deduplication key
    pub fn key(&self) -> (String, String, RelationshipType) {
        (self.from.clone(), self.to.clone(), self.relationship_type)
    }
}

/// API endpoint suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedEndpoint {
    pub method: HttpMethod,
    pub path: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub confidence: f64,
}

/// Normalized output of one analyzer
#[derive(Debug, Clone)]
pub struct SingleSourceResult {
    pub method: SourceMethod,
    pub entities: Vec<DetectedEntity>,
    pub relationships: Vec<SuggestedRelationship>,
    pub endpoints: Vec<SuggestedEndpoint>,
    pub insights: Vec<String>,
}

impl SingleSourceResult {
    pub fn empty(method: SourceMethod) -> Self {
        Self {
            method,
            entities: Vec::new(),
            relationships: Vec::new(),
            endpoints: Vec::new(),
            insights: Vec::new(),
        }
    }

    pub fn has_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// Mean entity confidence (0.0 when empty)
    pub fn average_confidence(&self) -> f64 {
        let scores: Vec<f64> = self.entities.iter().map(|e| e.confidence).collect();
        crate::analysis::confidence::average(&scores)
    }
}

/// Fused analysis handed to downstream generators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedAnalysis {
    pub entities: Vec<DetectedEntity>,
    pub relationships: Vec<SuggestedRelationship>,
    pub endpoints: Vec<SuggestedEndpoint>,
    pub analysis_method: AnalysisMethod,
    pub confidence_score: f64,
    pub vision_insights: Vec<String>,
    pub text_insights: Vec<String>,
}

impl CombinedAnalysis {
    pub fn entity(&self, name: &str) -> Option<&DetectedEntity> {
        let key = name.to_lowercase();
        self.entities.iter().find(|e| e.key() == key)
    }
}

// ============================================================================
// Raw Analyzer Payload Records
// ============================================================================
//
// Analyzer payloads are untrusted JSON. Each record is deserialized into one of
// these all-optional shapes and validated by the result builder; nothing below
// is allowed to reach the fusion engine directly.

/// Raw entity record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntityRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "table_name")]
    pub table_name: Option<String>,
    /// Expected to be an array of field records
    #[serde(default)]
    pub fields: Option<Value>,
    /// Number or numeric string
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Expected to be an array of node id strings
    #[serde(default, alias = "source_element_ids", alias = "elementIds")]
    pub source_element_ids: Option<Value>,
}

/// Raw field record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "dataType")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub unique: Option<bool>,
    #[serde(default, alias = "primary", alias = "primaryKey", alias = "is_primary")]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw relationship record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationshipRecord {
    #[serde(default, alias = "source", alias = "fromEntity")]
    pub from: Option<String>,
    #[serde(default, alias = "target", alias = "toEntity")]
    pub to: Option<String>,
    #[serde(default, rename = "type", alias = "relationshipType")]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Raw endpoint record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEndpointRecord {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub confidence: Option<Value>,
}

// ============================================================================
// Analyzer Traits
// ============================================================================

/// Text analyzer (language model over the structured design description)
///
/// Returns the raw payload: `{entities, relationships, endpoints, seedData,
/// insights, confidence}`. Transport failures are reported as errors and are
/// isolated by the coordinator.
#[async_trait::async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Analyzer name for provenance and event reporting
    fn name(&self) -> &'static str;

    /// Whether this analyzer needs an API key to be configured
    fn requires_credentials(&self) -> bool {
        true
    }

    async fn analyze(&self, design: &DesignDocument) -> Result<Value, AnalyzerError>;
}

/// Vision analyzer (vision-capable model over rendered screenshots)
///
/// Returns the raw payload: `{entities, visualPatterns, relationships,
/// insights, confidence}`. Given zero screenshots it returns an empty payload,
/// not an error.
#[async_trait::async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyzer name for provenance and event reporting
    fn name(&self) -> &'static str;

    /// Whether this analyzer needs an API key to be configured
    fn requires_credentials(&self) -> bool {
        true
    }

    async fn analyze(&self, screenshots: &[ScreenshotDescriptor]) -> Result<Value, AnalyzerError>;
}

/// Analyzer failure
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// I/O error (replay file read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External API error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Analyzer not available (disabled, no input)
    #[error("Analyzer not available: {0}")]
    NotAvailable(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}
