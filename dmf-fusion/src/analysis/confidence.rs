// Confidence Utilities - Clamp, Average, Agreement Boost
//
// Every confidence in the pipeline passes through these helpers so scores stay
// within 0.0-1.0 and never carry NaN.

/// Bonus per agreeing independent source
pub const AGREEMENT_BONUS: f64 = 0.15;

/// Agreement count is capped at this many sources
pub const MAX_AGREEMENT: u32 = 2;

/// Clamp to 0.0-1.0, mapping NaN to 0.0
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn average(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Raise `base` when independent sources agree
pub fn boost(base: f64, agreement_count: u32) -> f64 {
    let agreement = agreement_count.min(MAX_AGREEMENT);
    clamp01(base + AGREEMENT_BONUS * agreement as f64)
}

/// Coerce a raw JSON confidence (number or numeric string) into 0.0-1.0
///
/// Returns `None` when the value carries no usable number.
pub fn from_json(value: &serde_json::Value) -> Option<f64> {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(clamp01(raw))
}
