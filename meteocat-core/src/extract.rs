//! Alias-based field extraction over loosely-specified Meteocat JSON.
//!
//! The upstream API is inconsistent between versions and endpoints: the same
//! field can appear under a Catalan or an English key, flat or nested one
//! level deep. Every lookup here takes an ordered list of candidate key
//! specifiers and returns the first present, non-empty value. Adding a new
//! upstream key variant is a one-entry edit to the relevant candidate table.

use crate::error::Error;
use serde_json::Value;

/// Stringify a scalar value, treating JSON `null` and `""` as absent.
/// Numeric zero and `false` are real values, not absences.
fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Return the first candidate key that resolves to a non-empty value.
///
/// A candidate may be a plain key, or a one-level dotted path like
/// `coordenades.latitud`: the parent is looked up in the record and, when it
/// is itself an object, the child is looked up within it.
pub fn first_match(record: &Value, keys: &[&str]) -> Option<String> {
    let map = record.as_object()?;
    for key in keys {
        if let Some((parent, child)) = key.split_once('.') {
            if let Some(Value::Object(nested)) = map.get(parent) {
                if let Some(found) = nested.get(child).and_then(non_empty_string) {
                    return Some(found);
                }
            }
            continue;
        }
        if let Some(found) = map.get(*key).and_then(non_empty_string) {
            return Some(found);
        }
    }
    None
}

/// Like [`first_match`], but the field is mandatory.
pub fn required_match(record: &Value, keys: &'static [&'static str]) -> Result<String, Error> {
    first_match(record, keys).ok_or(Error::MissingField { keys })
}

/// Resolve a field that may be a sub-object carrying the human-readable name
/// under `sub_key` (e.g. `"municipi": {"nom": "Girona"}`), or already a
/// scalar value.
pub fn nested_or_scalar(record: &Value, keys: &[&str], sub_key: &str) -> Option<String> {
    let map = record.as_object()?;
    for key in keys {
        match map.get(*key) {
            Some(Value::Object(nested)) => {
                if let Some(found) = nested.get(sub_key).and_then(non_empty_string) {
                    return Some(found);
                }
            }
            Some(value) => {
                if let Some(found) = non_empty_string(value) {
                    return Some(found);
                }
            }
            None => {}
        }
    }
    None
}

/// Numeric coercion for extracted strings. Failure is an absence, not an
/// error.
pub fn parse_f64(value: Option<String>) -> Option<f64> {
    value?.trim().parse().ok()
}

/// Pull the list of record objects out of a payload that may be a bare array
/// or a map wrapping the array under `default_key` (or, failing that, under
/// any other key).
pub fn entry_list(payload: &Value, default_key: &str) -> Vec<Value> {
    fn objects(items: &[Value]) -> Vec<Value> {
        items.iter().filter(|item| item.is_object()).cloned().collect()
    }

    match payload {
        Value::Array(items) => objects(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get(default_key) {
                return objects(items);
            }
            for value in map.values() {
                if let Value::Array(items) = value {
                    return objects(items);
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_match_respects_candidate_order() {
        let record = json!({"code": "UK", "codi": "X4"});
        let found = first_match(&record, &["codi", "codiEstacio", "code"]);
        assert_eq!(found, Some("X4".to_string()));
    }

    #[test]
    fn first_match_skips_null_and_empty_values() {
        let record = json!({"codi": null, "codiEstacio": "", "code": "X4"});
        let found = first_match(&record, &["codi", "codiEstacio", "code"]);
        assert_eq!(found, Some("X4".to_string()));
    }

    #[test]
    fn zero_and_false_are_not_empty() {
        let record = json!({"valor": 0, "flag": false});
        assert_eq!(first_match(&record, &["valor"]), Some("0".to_string()));
        assert_eq!(first_match(&record, &["flag"]), Some("false".to_string()));
    }

    #[test]
    fn dotted_path_descends_one_level() {
        let record = json!({"coordenades": {"latitud": "41.5"}});
        let found = first_match(&record, &["latitud", "coordenades.latitud"]);
        assert_eq!(found, Some("41.5".to_string()));
    }

    #[test]
    fn dotted_path_ignores_non_object_parent() {
        let record = json!({"coordenades": "garbage", "lat": 41.2});
        let found = first_match(&record, &["coordenades.latitud", "lat"]);
        assert_eq!(found, Some("41.2".to_string()));
    }

    #[test]
    fn required_match_errors_when_nothing_matches() {
        let record = json!({"nom": "Estació"});
        let err = required_match(&record, &["codi", "code"]).unwrap_err();
        assert!(err.to_string().contains("codi"));
    }

    #[test]
    fn nested_or_scalar_reads_sub_key() {
        let record = json!({"municipi": {"nom": "Girona"}});
        assert_eq!(
            nested_or_scalar(&record, &["municipi", "municipio"], "nom"),
            Some("Girona".to_string())
        );
    }

    #[test]
    fn nested_or_scalar_accepts_plain_value() {
        let record = json!({"municipio": "Lleida"});
        assert_eq!(
            nested_or_scalar(&record, &["municipi", "municipio"], "nom"),
            Some("Lleida".to_string())
        );
    }

    #[test]
    fn parse_f64_coerces_or_gives_none() {
        assert_eq!(parse_f64(Some(" 3.5 ".to_string())), Some(3.5));
        assert_eq!(parse_f64(Some("n/a".to_string())), None);
        assert_eq!(parse_f64(None), None);
    }

    #[test]
    fn entry_list_handles_bare_array() {
        let payload = json!([{"a": 1}, "noise", {"b": 2}]);
        assert_eq!(entry_list(&payload, "dades").len(), 2);
    }

    #[test]
    fn entry_list_prefers_default_key() {
        let payload = json!({"dades": [{"a": 1}], "other": [{"b": 2}, {"c": 3}]});
        let entries = entry_list(&payload, "dades");
        assert_eq!(entries, vec![json!({"a": 1})]);
    }

    #[test]
    fn entry_list_falls_back_to_any_array_value() {
        let payload = json!({"total": 1, "resultats": [{"a": 1}]});
        assert_eq!(entry_list(&payload, "dades"), vec![json!({"a": 1})]);
    }

    #[test]
    fn entry_list_empty_for_scalar_payload() {
        assert!(entry_list(&json!("nothing here"), "dades").is_empty());
    }
}
