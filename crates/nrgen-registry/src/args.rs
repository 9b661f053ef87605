//! Argument bindings captured for a routine call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// A single bound argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// The value with strings unquoted, as used in qualified names.
    pub fn bare(&self) -> String {
        match self {
            ArgValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Int(n) => write!(f, "{n}"),
            ArgValue::Float(v) => write!(f, "{v:?}"),
            ArgValue::Str(s) => write!(f, "{s:?}"),
            ArgValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Int(n)
    }
}

impl From<i32> for ArgValue {
    fn from(n: i32) -> Self {
        ArgValue::Int(n.into())
    }
}

impl From<usize> for ArgValue {
    fn from(n: usize) -> Self {
        ArgValue::Int(n as i64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(items: Vec<T>) -> Self {
        ArgValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Argument bindings, one value per name.
///
/// Bindings keep the order in which they were made for display and
/// serialization. Equality ignores that order: two calls are the same call
/// when they bind the same names to the same values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Args(Vec<(String, ArgValue)>);

impl PartialEq for Args {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding in place.
    pub fn with(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ArgValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&ArgValue> {
        self.get(name)
            .ok_or_else(|| RegistryError::MissingArgument(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str) -> RegistryError {
        RegistryError::ArgumentType {
            name: name.to_string(),
            expected,
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ArgValue::Bool(b) => Ok(*b),
            _ => Err(Self::mismatch(name, "bool")),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ArgValue::Int(n) => Ok(*n),
            _ => Err(Self::mismatch(name, "integer")),
        }
    }

    /// A float argument; integers are widened.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ArgValue::Float(v) => Ok(*v),
            ArgValue::Int(n) => Ok(*n as f64),
            _ => Err(Self::mismatch(name, "float")),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ArgValue::Str(s) => Ok(s),
            _ => Err(Self::mismatch(name, "string")),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[ArgValue]> {
        match self.require(name)? {
            ArgValue::List(items) => Ok(items),
            _ => Err(Self::mismatch(name, "list")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}
