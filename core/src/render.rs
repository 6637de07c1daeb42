//! Rendering values back to argv-compatible string tokens.
//!
//! The inverse of token parsing: for non-secret, non-file kinds,
//! feeding the rendered token back through the list-of-strings parser
//! reproduces the value. Secrets are masked, files render as their
//! absolute path.

use crate::kind::ParameterKind;
use crate::value::ParameterValue;

/// Masks a secret for display: short secrets collapse to `***`,
/// longer ones keep the first two and last two characters.
///
/// # Examples
///
/// ```
/// use param_stack_core::render::mask_secret;
///
/// assert_eq!(mask_secret("abc"), "***");
/// assert_eq!(mask_secret("supersecret"), "su***et");
/// ```
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 6 {
        "***".to_string()
    } else {
        let chars: Vec<char> = secret.chars().collect();
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{head}***{tail}")
    }
}

/// Renders a value to a single string token for the given kind.
///
/// Lists join their element renderings with commas, key/value maps
/// render as comma-joined `key:value` pairs, dates as ISO-8601 UTC,
/// files as their absolute path. Secret values are masked and do not
/// round-trip.
pub fn render_value(kind: ParameterKind, value: &ParameterValue) -> String {
    if kind == ParameterKind::Secret {
        if let ParameterValue::String(s) = value {
            return mask_secret(s);
        }
    }
    render_plain(value)
}

fn render_plain(value: &ParameterValue) -> String {
    match value {
        ParameterValue::String(s) => s.clone(),
        ParameterValue::Bool(b) => b.to_string(),
        ParameterValue::Integer(i) => i.to_string(),
        ParameterValue::Float(f) => f.to_string(),
        ParameterValue::Date(d) => d.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ParameterValue::StringList(items) => items.join(","),
        ParameterValue::IntegerList(items) => items
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(","),
        ParameterValue::FloatList(items) => items
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(","),
        ParameterValue::KeyValue(map) => map
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(","),
        ParameterValue::Object(v) => v.to_string(),
        ParameterValue::ObjectList(items) => serde_json::Value::Array(items.clone()).to_string(),
        ParameterValue::File(f) => f.absolute_path.clone(),
        ParameterValue::FileList(files) => files
            .iter()
            .map(|f| f.absolute_path.clone())
            .collect::<Vec<_>>()
            .join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    #[test]
    fn test_mask_secret_boundaries() {
        assert_eq!(mask_secret(""), "***");
        assert_eq!(mask_secret("123456"), "***");
        assert_eq!(mask_secret("1234567"), "12***67");
    }

    #[test]
    fn test_render_lists_comma_joined() {
        let v = ParameterValue::StringList(vec!["a".into(), "b".into()]);
        assert_eq!(render_value(ParameterKind::StringList, &v), "a,b");

        let v = ParameterValue::IntegerList(vec![1, 2, 3]);
        assert_eq!(render_value(ParameterKind::IntegerList, &v), "1,2,3");
    }

    #[test]
    fn test_render_key_value_pairs() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), "v".to_string());
        map.insert("a".to_string(), "b".to_string());
        let v = ParameterValue::KeyValue(map);
        assert_eq!(render_value(ParameterKind::KeyValue, &v), "a:b,k:v");
    }

    #[test]
    fn test_render_date_iso8601_utc() {
        let v = ParameterValue::Date(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
        assert_eq!(
            render_value(ParameterKind::Date, &v),
            "2024-05-10T12:00:00Z"
        );
    }

    #[test]
    fn test_secret_masked_only_for_secret_kind() {
        let v = ParameterValue::String("supersecret".into());
        assert_eq!(render_value(ParameterKind::Secret, &v), "su***et");
        assert_eq!(render_value(ParameterKind::String, &v), "supersecret");
    }
}
