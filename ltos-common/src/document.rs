//! The decoded `/api/status` document and checked accessors into it.
//!
//! Every lookup goes through a [`Node`], which remembers the dotted path it was
//! reached by so that a failed lookup can name the offending key. Accessors
//! return [`FieldError`] and never assume a type.

use serde_json::Value;
use thiserror::Error;

/// Failure to read a field from the status document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing field '{path}'")]
    Missing { path: String },

    #[error("field '{path}' is {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl FieldError {
    /// Dotted path of the field that failed.
    pub fn path(&self) -> &str {
        match self {
            FieldError::Missing { path } | FieldError::TypeMismatch { path, .. } => path,
        }
    }
}

/// One decoded status document. Always wraps a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDocument {
    value: Value,
}

impl StatusDocument {
    /// Wrap a decoded value, rejecting anything that is not a JSON object.
    pub fn new(value: Value) -> Option<Self> {
        value.is_object().then_some(Self { value })
    }

    /// The root node of the document.
    pub fn root(&self) -> Node<'_> {
        Node {
            value: &self.value,
            path: String::new(),
        }
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

/// A borrowed position inside a [`StatusDocument`].
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    /// Dotted path of this node ("" for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw JSON value at this node.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Look up a required child key. `null` counts as missing.
    pub fn get(&self, key: &str) -> Result<Node<'a>, FieldError> {
        match self.get_opt(key)? {
            Some(node) => Ok(node),
            None => Err(FieldError::Missing {
                path: self.child_path(key),
            }),
        }
    }

    /// Look up an optional child key; `Ok(None)` when absent or `null`.
    pub fn get_opt(&self, key: &str) -> Result<Option<Node<'a>>, FieldError> {
        let map = self.value.as_object().ok_or_else(|| self.mismatch("object"))?;

        Ok(map
            .get(key)
            .filter(|v| !v.is_null())
            .map(|value| Node {
                value,
                path: self.child_path(key),
            }))
    }

    /// Descend through a sequence of required keys.
    pub fn at(&self, keys: &[&str]) -> Result<Node<'a>, FieldError> {
        let mut node = self.clone();
        for key in keys {
            node = node.get(key)?;
        }
        Ok(node)
    }

    /// Descend through required keys and read a string.
    pub fn str_at(&self, keys: &[&str]) -> Result<&'a str, FieldError> {
        self.at(keys)?.as_str()
    }

    /// Descend through required keys and read a number.
    pub fn f64_at(&self, keys: &[&str]) -> Result<f64, FieldError> {
        self.at(keys)?.as_f64()
    }

    /// Descend through required keys and read a boolean.
    pub fn bool_at(&self, keys: &[&str]) -> Result<bool, FieldError> {
        self.at(keys)?.as_bool()
    }

    pub fn as_str(&self) -> Result<&'a str, FieldError> {
        self.value.as_str().ok_or_else(|| self.mismatch("string"))
    }

    pub fn as_f64(&self) -> Result<f64, FieldError> {
        self.value.as_f64().ok_or_else(|| self.mismatch("number"))
    }

    pub fn as_bool(&self) -> Result<bool, FieldError> {
        self.value.as_bool().ok_or_else(|| self.mismatch("boolean"))
    }

    /// Read an array, yielding one node per element (`path[i]`).
    pub fn as_array(&self) -> Result<Vec<Node<'a>>, FieldError> {
        let items = self.value.as_array().ok_or_else(|| self.mismatch("array"))?;

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| Node {
                value,
                path: format!("{}[{}]", self.path, i),
            })
            .collect())
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn mismatch(&self, expected: &'static str) -> FieldError {
        FieldError::TypeMismatch {
            path: self.path.clone(),
            expected,
            found: kind_of(self.value),
        }
    }
}

/// Human-readable JSON type name.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> StatusDocument {
        StatusDocument::new(json!({
            "system-information": {
                "hostname": "ltos01",
                "model": 600,
            },
            "data": {
                "system": {
                    "uptime": 130988.25,
                    "storage": [{"mountpoint": "/"}, {"mountpoint": 7}],
                    "cpuload": null,
                },
                "flag": true,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(StatusDocument::new(json!([1, 2, 3])).is_none());
        assert!(StatusDocument::new(json!("status")).is_none());
        assert!(StatusDocument::new(json!({})).is_some());
    }

    #[test]
    fn test_str_at() {
        let doc = doc();
        assert_eq!(
            doc.root().str_at(&["system-information", "hostname"]),
            Ok("ltos01")
        );
    }

    #[test]
    fn test_missing_field_names_path() {
        let doc = doc();
        let err = doc
            .root()
            .str_at(&["system-information", "serial-number"])
            .unwrap_err();

        assert_eq!(
            err,
            FieldError::Missing {
                path: "system-information.serial-number".to_string()
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let doc = doc();
        let err = doc
            .root()
            .str_at(&["system-information", "model"])
            .unwrap_err();

        assert_eq!(
            err,
            FieldError::TypeMismatch {
                path: "system-information.model".to_string(),
                expected: "string",
                found: "number",
            }
        );
        assert_eq!(err.path(), "system-information.model");
    }

    #[test]
    fn test_descending_through_scalar_is_mismatch() {
        let doc = doc();
        let err = doc
            .root()
            .f64_at(&["system-information", "hostname", "length"])
            .unwrap_err();

        assert!(matches!(
            err,
            FieldError::TypeMismatch { expected: "object", found: "string", .. }
        ));
    }

    #[test]
    fn test_null_is_missing() {
        let doc = doc();
        let system = doc.root().at(&["data", "system"]).unwrap();

        assert!(system.get_opt("cpuload").unwrap().is_none());
        assert!(matches!(
            system.get("cpuload"),
            Err(FieldError::Missing { .. })
        ));
    }

    #[test]
    fn test_numbers_and_booleans() {
        let doc = doc();
        assert_eq!(doc.root().f64_at(&["data", "system", "uptime"]), Ok(130988.25));
        assert_eq!(doc.root().bool_at(&["data", "flag"]), Ok(true));
    }

    #[test]
    fn test_array_elements_carry_index() {
        let doc = doc();
        let items = doc
            .root()
            .at(&["data", "system", "storage"])
            .unwrap()
            .as_array()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].str_at(&["mountpoint"]), Ok("/"));

        let err = items[1].str_at(&["mountpoint"]).unwrap_err();
        assert_eq!(err.path(), "data.system.storage[1].mountpoint");
    }
}
