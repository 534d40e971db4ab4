//! Field Coercion
//!
//! Tolerant conversion of untrusted update payloads into typed values.
//! Nothing here fails: anything that cannot be interpreted becomes `None`.

use serde_json::Value;

use crate::tracks::AisClass;

/// Interpret a value as a finite number.
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace ignored).
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Interpret a value as a number, or as an object holding the number under
/// one of `keys` (first match wins). Signal K sends e.g. `design.length` as
/// `{"overall": 12.5}` and `design.aisShipType` as `{"id": 36, "name": ..}`.
pub fn number_or_member(value: &Value, keys: &[&str]) -> Option<f64> {
    match value {
        Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key).and_then(number)),
        _ => number(value),
    }
}

/// Interpret a value as a non-empty trimmed string.
///
/// Numbers are rendered without a fractional part when integral, so an MMSI
/// that arrives as `244123456` and one that arrives as `"244123456"` agree.
pub fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().filter(|f| f.is_finite())?.to_string(),
        },
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Interpret a value as a string, or the string under `key` of an object.
pub fn text_or_member(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.get(key).and_then(text),
        _ => text(value),
    }
}

/// Interpret a value as a boolean flag.
///
/// Accepts booleans, `0`/`1` and the strings "true"/"false"/"yes"/"no".
pub fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Special manoeuvre indicator: a flag, or a state string where anything but
/// "not available"/"not engaged" means engaged.
pub fn maneuver(value: &Value) -> Option<bool> {
    if let Some(b) = flag(value) {
        return Some(b);
    }
    let s = text(value)?.to_ascii_lowercase();
    Some(!matches!(s.as_str(), "not available" | "not engaged"))
}

/// Interpret a value as an AIS transceiver class
pub fn ais_class(value: &Value) -> AisClass {
    match text(value).map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("A") => AisClass::A,
        Some("B") => AisClass::B,
        _ => AisClass::Unknown,
    }
}

/// Interpret a value as a latitude in degrees
pub fn latitude(value: &Value) -> Option<f64> {
    number(value).filter(|lat| (-90.0..=90.0).contains(lat))
}

/// Interpret a value as a longitude in degrees
pub fn longitude(value: &Value) -> Option<f64> {
    number(value).filter(|lon| (-180.0..=180.0).contains(lon))
}

/// Interpret a `{latitude, longitude}` object. Either coordinate may be
/// missing or invalid; the caller merges what is present.
pub fn position(value: &Value) -> (Option<f64>, Option<f64>) {
    match value {
        Value::Object(map) => (
            map.get("latitude").and_then(latitude),
            map.get("longitude").and_then(longitude),
        ),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number() {
        assert_eq!(number(&json!(12.5)), Some(12.5));
        assert_eq!(number(&json!(" 7 ")), Some(7.0));
        assert_eq!(number(&json!("abc")), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!(true)), None);
        assert_eq!(number(&json!("NaN")), None);
        assert_eq!(number(&json!("inf")), None);
    }

    #[test]
    fn test_number_or_member() {
        assert_eq!(number_or_member(&json!({"overall": 14.2}), &["overall"]), Some(14.2));
        assert_eq!(
            number_or_member(&json!({"maximum": 2.1}), &["current", "maximum"]),
            Some(2.1)
        );
        assert_eq!(number_or_member(&json!({"name": "x"}), &["id"]), None);
        assert_eq!(number_or_member(&json!(3), &["id"]), Some(3.0));
    }

    #[test]
    fn test_text() {
        assert_eq!(text(&json!("  PH1234 ")), Some("PH1234".to_string()));
        assert_eq!(text(&json!("   ")), None);
        assert_eq!(text(&json!(244123456)), Some("244123456".to_string()));
        assert_eq!(text(&json!(null)), None);
        assert_eq!(text(&json!({"a": 1})), None);
        assert_eq!(text_or_member(&json!({"id": 21}), "id"), Some("21".to_string()));
    }

    #[test]
    fn test_flag_and_maneuver() {
        assert_eq!(flag(&json!(true)), Some(true));
        assert_eq!(flag(&json!(0)), Some(false));
        assert_eq!(flag(&json!("Yes")), Some(true));
        assert_eq!(flag(&json!("maybe")), None);
        assert_eq!(maneuver(&json!("engaged")), Some(true));
        assert_eq!(maneuver(&json!("not available")), Some(false));
        assert_eq!(maneuver(&json!(null)), None);
    }

    #[test]
    fn test_ais_class() {
        assert_eq!(ais_class(&json!("A")), AisClass::A);
        assert_eq!(ais_class(&json!(" b")), AisClass::B);
        assert_eq!(ais_class(&json!("ATON")), AisClass::Unknown);
        assert_eq!(ais_class(&json!(5)), AisClass::Unknown);
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(latitude(&json!(91.0)), None);
        assert_eq!(longitude(&json!(-180.0)), Some(-180.0));
        assert_eq!(
            position(&json!({"latitude": 52.0, "longitude": "4.5"})),
            (Some(52.0), Some(4.5))
        );
        assert_eq!(position(&json!({"latitude": 52.0})), (Some(52.0), None));
        assert_eq!(position(&json!(1.0)), (None, None));
    }
}
