// Analysis Module - Per-Source Normalization
//
// Turns raw analyzer payloads (or, as a last resort, the design nodes
// themselves) into normalized single-source results.

pub mod confidence;
pub mod normalizer;
pub mod relationship_inferrer;
pub mod result_builder;
pub mod rule_based;
