//! dmf-fusion library interface
//!
//! Fuses entity-relationship analyses of a UI design from a text analyzer and
//! a vision analyzer into one `CombinedAnalysis`, falling back to rule-based
//! analysis of the design nodes when neither produces entities.

pub mod analysis;
pub mod analyzers;
pub mod config;
pub mod error;
pub mod fusion;
pub mod types;
pub mod workflow;

pub use crate::config::FusionConfig;
pub use crate::error::{FusionError, FusionResult};
pub use crate::fusion::{FusionEngine, FusionOptions};
pub use crate::types::{
    AnalysisMethod, AnalyzerError, CombinedAnalysis, DesignDocument, TextAnalyzer, VisionAnalyzer,
};
pub use crate::workflow::{AnalysisEvent, FallbackCoordinator};
