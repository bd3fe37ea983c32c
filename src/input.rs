//! Request input
//!
//! Maps request scopes ("GET", "POST", "COOKIE", ...) to their parameters.
//! Composite values are flattened into scalar `(name, value)` pairs with
//! dotted names before scanning, so every event refers to a single scalar.

use anyhow::{bail, Result};
use serde_json::Value;

/// A parameter value, scalar or composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<ParamValue>),
    Map(Vec<(String, ParamValue)>),
}

impl ParamValue {
    fn flatten_into(&self, name: String, out: &mut Vec<(String, String)>) {
        match self {
            ParamValue::Scalar(value) => out.push((name, value.clone())),
            ParamValue::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    item.flatten_into(format!("{}.{}", name, idx), out);
                }
            }
            ParamValue::Map(entries) => {
                for (key, item) in entries {
                    item.flatten_into(format!("{}.{}", name, key), out);
                }
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<&Value> for ParamValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Scalar(String::new()),
            Value::Bool(b) => ParamValue::Scalar(b.to_string()),
            Value::Number(n) => ParamValue::Scalar(n.to_string()),
            Value::String(s) => ParamValue::Scalar(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(ParamValue::from).collect()),
            Value::Object(map) => ParamValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), ParamValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Scoped request parameters, in the order they were added
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    scopes: Vec<(String, Vec<(String, ParamValue)>)>,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to a scope, creating the scope on first use
    pub fn add(&mut self, scope: &str, name: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        match self.scopes.iter_mut().find(|(s, _)| s == scope) {
            Some((_, params)) => params.push((name.to_string(), value)),
            None => self
                .scopes
                .push((scope.to_string(), vec![(name.to_string(), value)])),
        }
    }

    /// Builder-style variant of [`RequestInput::add`]
    pub fn with(mut self, scope: &str, name: &str, value: impl Into<ParamValue>) -> Self {
        self.add(scope, name, value);
        self
    }

    /// Parse `{"GET": {"q": "..."}, "COOKIE": {...}}`
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(scopes) = value else {
            bail!("request document must be an object of scopes");
        };

        let mut input = Self::new();
        for (scope, params) in scopes {
            let Value::Object(params) = params else {
                bail!("scope '{}' must be an object of parameters", scope);
            };
            for (name, value) in params {
                input.add(scope, name, ParamValue::from(value));
            }
        }
        Ok(input)
    }

    /// Flatten to scalar `(scope.name[.sub...], value)` pairs in scan order
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (scope, params) in &self.scopes {
            for (name, value) in params {
                value.flatten_into(format!("{}.{}", scope, name), &mut out);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.iter().all(|(_, params)| params.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_scalars_in_order() {
        let input = RequestInput::new()
            .with("GET", "q", "search")
            .with("COOKIE", "sid", "abc")
            .with("GET", "page", "2");

        assert_eq!(
            input.flatten(),
            vec![
                ("GET.q".to_string(), "search".to_string()),
                ("GET.page".to_string(), "2".to_string()),
                ("COOKIE.sid".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_composite_values() {
        let value = ParamValue::Map(vec![
            ("name".to_string(), ParamValue::from("bob")),
            (
                "roles".to_string(),
                ParamValue::List(vec![ParamValue::from("admin"), ParamValue::from("dev")]),
            ),
        ]);
        let input = RequestInput::new().with("POST", "user", value);

        let flat = input.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0], ("POST.user.name".to_string(), "bob".to_string()));
        assert_eq!(flat[2], ("POST.user.roles.1".to_string(), "dev".to_string()));
    }

    #[test]
    fn test_from_json() {
        let doc = serde_json::json!({
            "GET": {"test": "\"><script>eval(window.name)</script>", "n": 5},
            "POST": {"tags": ["a", true]}
        });

        let input = RequestInput::from_json(&doc).unwrap();
        let flat = input.flatten();

        assert!(flat.contains(&("GET.n".to_string(), "5".to_string())));
        assert!(flat.contains(&("POST.tags.1".to_string(), "true".to_string())));
    }

    #[test]
    fn test_from_json_keeps_document_order() {
        let doc: serde_json::Value =
            serde_json::from_str(r#"{"POST":{"zeta":"1","alpha":"2"},"GET":{"q":"3"}}"#).unwrap();

        let input = RequestInput::from_json(&doc).unwrap();
        let names: Vec<String> = input.flatten().into_iter().map(|(name, _)| name).collect();

        assert_eq!(names, vec!["POST.zeta", "POST.alpha", "GET.q"]);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(RequestInput::from_json(&serde_json::json!(["GET"])).is_err());
        assert!(RequestInput::from_json(&serde_json::json!({"GET": "q=1"})).is_err());
    }
}
