//! Declarative response shapes and the validator that enforces them.
//!
//! # Design
//! A [`Schema`] is a tagged-variant tree (object, array, primitive, literal,
//! optional, nullable, refinement) rather than anything reflective, so shapes
//! can be built at runtime and shipped alongside a request descriptor.
//! Validation is pure: it never touches I/O and the same input always yields
//! the same normalized value or the same list of issues.
//!
//! Validation does not stop at the first problem. Every violated constraint
//! produces one [`Issue`] carrying the path of the offending field, so a
//! caller can attach messages to individual form fields.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// One step in the path from the validated root to an offending value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    Required,
    InvalidLiteral,
    TooSmall,
    TooBig,
    NotInteger,
    Custom,
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: Vec<PathSegment>,
    pub code: IssueCode,
    pub message: String,
}

impl Issue {
    pub fn new(path: Vec<PathSegment>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path,
            code,
            message: message.into(),
        }
    }

    /// Render the path as `user.roles[0]`; the root renders as an empty string.
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
            }
        }
        out
    }
}

/// All issues found while validating one value. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    pub fn single(issue: Issue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Issues as a JSON array, the form carried in failure details.
    pub fn to_details(&self) -> Value {
        serde_json::to_value(&self.issues).unwrap_or(Value::Null)
    }

    /// First message attached to the field at `path`, if any.
    pub fn message_for(&self, path: &str) -> Option<&str> {
        self.issues
            .iter()
            .find(|issue| issue.path_string() == path)
            .map(|issue| issue.message.as_str())
    }
}

fn summarize(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            let path = issue.path_string();
            if path.is_empty() {
                issue.message.clone()
            } else {
                format!("{path}: {}", issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Length limits for string nodes, each with the message reported on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRules {
    pub min: Option<(usize, String)>,
    pub max: Option<(usize, String)>,
}

impl StringRules {
    pub fn min_len(mut self, len: usize, message: impl Into<String>) -> Self {
        self.min = Some((len, message.into()));
        self
    }

    pub fn max_len(mut self, len: usize, message: impl Into<String>) -> Self {
        self.max = Some((len, message.into()));
        self
    }
}

/// Numeric strings are accepted and converted only when `coerce` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberRules {
    pub coerce: bool,
    pub integer: bool,
}

impl NumberRules {
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }
}

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// A cross-field check run on the normalized output of its inner schema.
#[derive(Clone)]
pub struct Refinement {
    pub path: Vec<PathSegment>,
    pub message: String,
    check: Arc<Predicate>,
}

impl Refinement {
    pub fn new<P, F>(path: P, message: impl Into<String>, check: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<PathSegment>,
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
            check: Arc::new(check),
        }
    }

    fn holds(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("path", &self.path)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Expected shape of a JSON value.
#[derive(Debug, Clone)]
pub enum Schema {
    Any,
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Null,
    Literal(Value),
    Array(Box<Schema>),
    /// Declared fields in order. Keys not listed here are dropped.
    Object(Vec<(String, Schema)>),
    /// May be absent when used as an object field.
    Optional(Box<Schema>),
    Nullable(Box<Schema>),
    Refine(Box<Schema>, Refinement),
}

impl Schema {
    pub fn string() -> Self {
        Schema::String(StringRules::default())
    }

    pub fn number() -> Self {
        Schema::Number(NumberRules::default())
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal(value.into())
    }

    pub fn array(item: Schema) -> Self {
        Schema::Array(Box::new(item))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        )
    }

    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Attach a check over the whole normalized value. On failure one issue
    /// with `message` is reported at `path`, relative to this node.
    pub fn refine<P, F>(self, path: P, message: impl Into<String>, check: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<PathSegment>,
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Schema::Refine(Box::new(self), Refinement::new(path, message, check))
    }

    /// Validate `value`, returning the normalized value or every issue found.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let normalized = self.check(value, &mut path, &mut issues);
        if issues.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationError { issues })
        }
    }

    fn may_be_absent(&self) -> bool {
        match self {
            Schema::Any | Schema::Optional(_) => true,
            Schema::Nullable(inner) | Schema::Refine(inner, _) => inner.may_be_absent(),
            _ => false,
        }
    }

    fn check(&self, value: &Value, path: &mut Vec<PathSegment>, issues: &mut Vec<Issue>) -> Value {
        match self {
            Schema::Any => value.clone(),
            Schema::String(rules) => check_string(rules, value, path, issues),
            Schema::Number(rules) => check_number(*rules, value, path, issues),
            Schema::Boolean => match value {
                Value::Bool(_) => value.clone(),
                _ => invalid_type("boolean", value, path, issues),
            },
            Schema::Null => match value {
                Value::Null => Value::Null,
                _ => invalid_type("null", value, path, issues),
            },
            Schema::Literal(expected) => {
                if value != expected {
                    issues.push(Issue::new(
                        path.clone(),
                        IssueCode::InvalidLiteral,
                        format!("Invalid literal value, expected {expected}"),
                    ));
                }
                expected.clone()
            }
            Schema::Array(item) => {
                let Some(items) = value.as_array() else {
                    return invalid_type("array", value, path, issues);
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    out.push(item.check(element, path, issues));
                    path.pop();
                }
                Value::Array(out)
            }
            Schema::Object(fields) => {
                let Some(map) = value.as_object() else {
                    return invalid_type("object", value, path, issues);
                };
                let mut out = Map::new();
                for (name, field) in fields {
                    path.push(PathSegment::Key(name.clone()));
                    match map.get(name) {
                        Some(v) => {
                            let normalized = field.check(v, path, issues);
                            out.insert(name.clone(), normalized);
                        }
                        None if field.may_be_absent() => {}
                        None => issues.push(Issue::new(path.clone(), IssueCode::Required, "Required")),
                    }
                    path.pop();
                }
                Value::Object(out)
            }
            Schema::Optional(inner) => inner.check(value, path, issues),
            Schema::Nullable(inner) => match value {
                Value::Null => Value::Null,
                _ => inner.check(value, path, issues),
            },
            Schema::Refine(inner, refinement) => {
                let before = issues.len();
                let normalized = inner.check(value, path, issues);
                if issues.len() == before && !refinement.holds(&normalized) {
                    let mut at = path.clone();
                    at.extend(refinement.path.iter().cloned());
                    issues.push(Issue::new(at, IssueCode::Custom, refinement.message.clone()));
                }
                normalized
            }
        }
    }
}

fn check_string(
    rules: &StringRules,
    value: &Value,
    path: &[PathSegment],
    issues: &mut Vec<Issue>,
) -> Value {
    let Some(s) = value.as_str() else {
        return invalid_type("string", value, path, issues);
    };
    let len = s.chars().count();
    if let Some((min, message)) = &rules.min {
        if len < *min {
            issues.push(Issue::new(path.to_vec(), IssueCode::TooSmall, message.clone()));
        }
    }
    if let Some((max, message)) = &rules.max {
        if len > *max {
            issues.push(Issue::new(path.to_vec(), IssueCode::TooBig, message.clone()));
        }
    }
    value.clone()
}

fn check_number(
    rules: NumberRules,
    value: &Value,
    path: &[PathSegment],
    issues: &mut Vec<Issue>,
) -> Value {
    let number = match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) if rules.coerce => parse_number(s.trim()),
        _ => None,
    };
    let Some(number) = number else {
        return invalid_type("number", value, path, issues);
    };
    if !rules.integer || number.is_i64() || number.is_u64() {
        return Value::Number(number);
    }
    match number.as_f64() {
        Some(f) if f.fract() != 0.0 => {
            issues.push(Issue::new(
                path.to_vec(),
                IssueCode::NotInteger,
                "Expected integer, received float",
            ));
            Value::Number(number)
        }
        // -2^63 <= f < 2^63
        Some(f) if f >= i64::MIN as f64 && f < -(i64::MIN as f64) => {
            Value::Number(Number::from(f as i64))
        }
        _ => {
            issues.push(Issue::new(
                path.to_vec(),
                IssueCode::TooBig,
                "Integer is out of range",
            ));
            Value::Number(number)
        }
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
}

fn invalid_type(expected: &str, value: &Value, path: &[PathSegment], issues: &mut Vec<Issue>) -> Value {
    issues.push(Issue::new(
        path.to_vec(),
        IssueCode::InvalidType,
        format!("Expected {expected}, received {}", type_name(value)),
    ));
    Value::Null
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
