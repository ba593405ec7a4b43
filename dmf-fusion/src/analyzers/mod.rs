// Analyzers - TextAnalyzer / VisionAnalyzer implementations
//
// Model-backed analyzers live outside this crate. The implementations here
// replay previously captured payloads from disk, which is what the CLI and the
// integration tests drive the coordinator with.

pub mod replay;

pub use replay::{ReplayTextAnalyzer, ReplayVisionAnalyzer, UnavailableTextAnalyzer};
