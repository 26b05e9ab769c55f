//! Export Paths
//!
//! Parses `response_export_values` entries such as `properties.settings[0].value`
//! and extracts the addressed part of a response body.
//!
//! Extraction never fails: any step that cannot be resolved against the
//! document yields `None` so one bad path cannot abort the others.

use serde_json::{Map, Value};
use std::fmt;

/// A single traversal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Field lookup in an object
    Key(String),
    /// Index lookup in an array
    Index(usize),
}

/// Parsed export path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPath {
    steps: Vec<Step>,
}

impl ExportPath {
    /// Parse a dotted path with optional bracket indices.
    ///
    /// Returns `None` for empty segments, unclosed brackets or non-numeric
    /// indices.
    pub fn parse(path: &str) -> Option<Self> {
        if path.is_empty() {
            return None;
        }

        let mut steps = Vec::new();
        for segment in path.split('.') {
            let (key, mut rest) = match segment.find('[') {
                Some(pos) => (&segment[..pos], &segment[pos..]),
                None => (segment, ""),
            };

            if key.is_empty() {
                return None;
            }
            steps.push(Step::Key(key.to_string()));

            while !rest.is_empty() {
                let inner = rest.strip_prefix('[')?;
                let close = inner.find(']')?;
                let index = inner[..close].parse::<usize>().ok()?;
                steps.push(Step::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Some(Self { steps })
    }

    /// Resolve the raw sub-value addressed by this path
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for step in &self.steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(key)?,
                (Step::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
                _ => return None,
            };
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Extract the addressed value, keeping its nesting.
    ///
    /// `{"a":{"b":1,"c":2}}` with `a.b` gives `{"a":{"b":1}}`. Index steps
    /// keep the element at its position, padding the slots before it with
    /// nulls: `{"l":["a","b","c"]}` with `l[2]` gives `{"l":[null,null,"c"]}`.
    pub fn extract(&self, document: &Value) -> Option<Value> {
        let leaf = self.resolve(document)?.clone();

        let wrapped = self.steps.iter().rev().fold(leaf, |inner, step| match step {
            Step::Key(key) => {
                let mut map = Map::with_capacity(1);
                map.insert(key.clone(), inner);
                Value::Object(map)
            }
            Step::Index(idx) => {
                let mut items = vec![Value::Null; *idx];
                items.push(inner);
                Value::Array(items)
            }
        });

        Some(wrapped)
    }
}

impl fmt::Display for ExportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Key(key) if i == 0 => write!(f, "{}", key)?,
                Step::Key(key) => write!(f, ".{}", key)?,
                Step::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Extract `path` from `document`, `None` if the path is malformed or unresolvable
pub fn extract(document: &Value, path: &str) -> Option<Value> {
    ExportPath::parse(path)?.extract(document)
}
