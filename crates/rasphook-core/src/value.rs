//! Values crossing the script boundary.
//!
//! The engine keeps its own object graph; `ScriptValue` is the detached copy
//! that configurations and delivered results travel as. Serialization follows
//! the engine's JSON stringify rules rather than serde's defaults, so a value
//! that the engine could not stringify fails here too.

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Largest integer a double represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A script value as seen by the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    /// Raw byte buffer (an `ArrayBuffer` on the script side)
    Buffer(Vec<u8>),
    Array(Vec<ScriptValue>),
    /// Plain object; property order is insertion order
    Object(IndexMap<String, ScriptValue>),
}

impl ScriptValue {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ScriptValue)>,
        K: Into<String>,
    {
        ScriptValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Property lookup on objects. Every other variant has no properties.
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        match self {
            ScriptValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Own enumerable properties as (name, value) pairs.
    ///
    /// Arrays enumerate their indices; buffers and primitives have none.
    pub fn entries(&self) -> Vec<(String, &ScriptValue)> {
        match self {
            ScriptValue::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            ScriptValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    /// True for every value the engine treats as an object.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ScriptValue::Object(_) | ScriptValue::Array(_) | ScriptValue::Buffer(_)
        )
    }

    /// Strict `=== true`.
    pub fn is_true(&self) -> bool {
        matches!(self, ScriptValue::Bool(true))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a 32-bit integer, when it is exactly one.
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            ScriptValue::Number(n)
                if n.is_finite()
                    && n.fract() == 0.0
                    && *n >= i32::MIN as f64
                    && *n <= i32::MAX as f64 =>
            {
                Some(*n as i32)
            }
            _ => None,
        }
    }

    /// String coercion with the engine's formatting rules.
    pub fn to_display_string(&self) -> String {
        match self {
            ScriptValue::Undefined => "undefined".to_string(),
            ScriptValue::Null => "null".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Number(n) => format_number(*n),
            ScriptValue::BigInt(n) => n.to_string(),
            ScriptValue::String(s) => s.clone(),
            ScriptValue::Buffer(_) => "[object ArrayBuffer]".to_string(),
            ScriptValue::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            ScriptValue::Object(_) => "[object Object]".to_string(),
        }
    }

    /// JSON text for this value, or the error the engine would have thrown.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        // also folds -0 into "0"
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponential(n)
    } else {
        // shortest round-trip digits; integral values print without ".0"
        format!("{}", n)
    }
}

/// Shortest round-trip digits in `1.5e+21` / `1e-7` form.
fn exponential(n: f64) -> String {
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => formatted,
    }
}

impl Serialize for ScriptValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => serializer.serialize_unit(),
            ScriptValue::Bool(b) => serializer.serialize_bool(*b),
            ScriptValue::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            ScriptValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            ScriptValue::Number(n) => serializer.serialize_f64(*n),
            ScriptValue::BigInt(_) => Err(S::Error::custom("Do not know how to serialize a BigInt")),
            ScriptValue::String(s) => serializer.serialize_str(s),
            ScriptValue::Buffer(_) => serializer.serialize_map(Some(0))?.end(),
            ScriptValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ScriptValue::Object(map) => {
                let mut out = serializer.serialize_map(None)?;
                for (key, value) in map.iter().filter(|(_, v)| !v.is_undefined()) {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl From<JsonValue> for ScriptValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ScriptValue::Null,
            JsonValue::Bool(b) => ScriptValue::Bool(b),
            JsonValue::Number(n) => ScriptValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => ScriptValue::String(s),
            JsonValue::Array(items) => {
                ScriptValue::Array(items.into_iter().map(ScriptValue::from).collect())
            }
            JsonValue::Object(map) => ScriptValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, ScriptValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Number(value as f64)
    }
}

impl From<Vec<u8>> for ScriptValue {
    fn from(value: Vec<u8>) -> Self {
        ScriptValue::Buffer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_matches_engine_rules() {
        let value = ScriptValue::object([
            ("a", ScriptValue::from(1)),
            ("skipped", ScriptValue::Undefined),
            ("half", ScriptValue::from(0.5)),
            ("nan", ScriptValue::Number(f64::NAN)),
            ("list", ScriptValue::Array(vec![ScriptValue::Undefined, ScriptValue::from("x")])),
            ("buf", ScriptValue::Buffer(vec![1, 2, 3])),
        ]);

        assert_eq!(
            value.to_json_string().unwrap(),
            r#"{"a":1,"half":0.5,"nan":null,"list":[null,"x"],"buf":{}}"#
        );
    }

    #[test]
    fn test_bigint_anywhere_fails_serialization() {
        let value = ScriptValue::object([(
            "outer",
            ScriptValue::Array(vec![ScriptValue::object([("n", ScriptValue::BigInt(7))])]),
        )]);

        let err = value.to_json_string().unwrap_err();
        assert!(err.to_string().contains("BigInt"));
    }

    #[test]
    fn test_display_string_coercion() {
        assert_eq!(ScriptValue::from(42).to_display_string(), "42");
        assert_eq!(ScriptValue::Number(-0.0).to_display_string(), "0");
        assert_eq!(ScriptValue::from(1.25).to_display_string(), "1.25");
        assert_eq!(ScriptValue::Bool(true).to_display_string(), "true");
        assert_eq!(ScriptValue::Null.to_display_string(), "null");
        assert_eq!(ScriptValue::Undefined.to_display_string(), "undefined");
        assert_eq!(
            ScriptValue::Array(vec![ScriptValue::from(1), ScriptValue::Null, ScriptValue::from("b")])
                .to_display_string(),
            "1,,b"
        );
        assert_eq!(
            ScriptValue::object([("k", ScriptValue::Null)]).to_display_string(),
            "[object Object]"
        );
    }

    #[test]
    fn test_large_and_tiny_numbers_use_exponent_form() {
        let display = |n: f64| ScriptValue::Number(n).to_display_string();
        assert_eq!(display(1e21), "1e+21");
        assert_eq!(display(-1.5e21), "-1.5e+21");
        assert_eq!(display(1.23456789e23), "1.23456789e+23");
        assert_eq!(display(999_999_999_999_999_900_000.0), "999999999999999900000");
        assert_eq!(display(1e-7), "1e-7");
        assert_eq!(display(0.000001), "0.000001");

        let config = ScriptValue::object([("page", ScriptValue::Number(2e21))]);
        assert_eq!(config.entries()[0].1.to_display_string(), "2e+21");
    }

    #[test]
    fn test_as_int32() {
        assert_eq!(ScriptValue::from(3).as_int32(), Some(3));
        assert_eq!(ScriptValue::from(-1).as_int32(), Some(-1));
        assert_eq!(ScriptValue::from(1.5).as_int32(), None);
        assert_eq!(ScriptValue::Number(4_294_967_296.0).as_int32(), None);
        assert_eq!(ScriptValue::from("3").as_int32(), None);
    }

    #[test]
    fn test_from_json_keeps_property_order() {
        let value = ScriptValue::from(json!({"z": 1, "a": [true, null], "m": "s"}));
        let keys: Vec<String> = value.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value.get("m"), Some(&ScriptValue::from("s")));
        assert!(value.get("missing").is_none());
    }

    #[test]
    fn test_object_predicates() {
        assert!(ScriptValue::Buffer(vec![]).is_object());
        assert!(ScriptValue::Array(vec![]).is_object());
        assert!(!ScriptValue::from("s").is_object());
        assert!(ScriptValue::Null.is_nullish());
        assert!(!ScriptValue::from(1).is_true());
        assert!(ScriptValue::Bool(true).is_true());
    }
}
