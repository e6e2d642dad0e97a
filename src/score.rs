//! Association score parsing
//!
//! Scores reach us either as JSON numbers or as numeric strings ("3.2",
//! "17.0"). They are parsed once, while the index is built.

use serde_json::Value;

/// Parse a raw association score into a finite `f64`
///
/// Returns `None` for anything that is not a finite number: `null`,
/// booleans, arrays, objects, empty or non-numeric strings, `NaN` and
/// infinities. Zero is a valid score.
pub fn parse_score(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    value.is_finite().then_some(value)
}

/// Canonical string form used when a score table is converted to JSON
///
/// Whole numbers keep one decimal place ("5.0") like the exported
/// datasets. Very large or small values use Rust's exponent form ("1e16"),
/// which parses back to the same value but is not spelled the way the
/// exports spell it ("1e+16").
pub fn format_score(score: f64) -> String {
    format!("{:?}", score)
}
