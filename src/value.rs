//! Value model for the reference resolver
//!
//! A small tree of runtime values with the conversions and behaviors the
//! resolver needs: truthiness for conditionals, string rendering for
//! substitution output, type names for diagnostics, and dotted-path lookup.

use std::collections::HashMap;

/// A runtime value in the data tree
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(HashMap<String, Value>),
}

impl Value {
    /// Check if the value is truthy (for conditionals)
    ///
    /// Single values are truthy when present, non-empty, non-zero, and
    /// non-false. Containers are truthy when they have at least one entry.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
        }
    }

    /// Get a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Render the value to a string for output
    pub fn render_to_string(&self) -> String {
        match self {
            Value::None => String::new(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(l) => {
                let items: Vec<String> = l.iter().map(|v| v.render_to_string()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Dict(_) => "[object]".to_string(),
        }
    }

    /// Navigate a dotted path: dict fields by name, list elements by index
    ///
    /// `lookup("user.name")` descends into a dict; `lookup("items.0")` indexes
    /// a list. An empty path returns the value itself.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Dict(d) => d.get(segment)?,
                Value::List(l) => {
                    let idx: usize = segment.parse().ok()?;
                    l.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

// Convenience conversions for common types
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(d: HashMap<String, Value>) -> Self {
        Value::Dict(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: &[(&str, Value)]) -> Value {
        Value::Dict(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::from(vec![0i64]).is_truthy());
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::None.render_to_string(), "");
        assert_eq!(Value::Int(42).render_to_string(), "42");
        assert_eq!(Value::Bool(true).render_to_string(), "true");
        assert_eq!(
            Value::from(vec!["a", "b"]).render_to_string(),
            "[a, b]"
        );
    }

    #[test]
    fn test_lookup_dotted() {
        let root = dict(&[(
            "user",
            dict(&[("name", Value::from("Bob")), ("age", Value::from(30i64))]),
        )]);
        assert_eq!(root.lookup("user.name"), Some(&Value::from("Bob")));
        assert_eq!(root.lookup("user.age"), Some(&Value::Int(30)));
        assert_eq!(root.lookup("user.missing"), None);
        assert_eq!(root.lookup("missing"), None);
    }

    #[test]
    fn test_lookup_list_index() {
        let root = dict(&[("items", Value::from(vec!["a", "b", "c"]))]);
        assert_eq!(root.lookup("items.0"), Some(&Value::from("a")));
        assert_eq!(root.lookup("items.2"), Some(&Value::from("c")));
        assert_eq!(root.lookup("items.3"), None);
        assert_eq!(root.lookup("items.x"), None);
    }

    #[test]
    fn test_lookup_empty_path_is_self() {
        let v = Value::Int(1);
        assert_eq!(v.lookup(""), Some(&v));
    }
}
