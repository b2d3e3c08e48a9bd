//! Element kinds accepted by a [`TypedStack`](crate::TypedStack).
//!
//! [`Kind`] is the runtime tag a typed stack is declared with, [`Value`] is
//! the tagged union it stores, and [`Primitive`] links each of the four
//! concrete Rust types to its tag.
//!
//! Classification is closed-world: a value is one of the four kinds or it
//! is rejected with [`StackError::UnsupportedKind`].

use std::any::{type_name, Any};
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{ParseKindError, Result, StackError};

/// The element kind a typed stack is declared to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Integer,
    Float,
    String,
    Boolean,
}

impl Kind {
    /// All supported kinds.
    pub const ALL: [Kind; 4] = [Kind::Integer, Kind::Float, Kind::String, Kind::Boolean];

    /// Lowercase name, as used by `Display` and serde.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Kind::Integer),
            "float" => Ok(Kind::Float),
            "string" => Ok(Kind::String),
            "boolean" | "bool" => Ok(Kind::Boolean),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// A value of one of the four supported kinds.
///
/// Serializes as the bare JSON scalar. Deserialization goes through
/// [`Value::from_json`], so it rejects exactly what `from_json` rejects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

impl Value {
    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Boolean(_) => Kind::Boolean,
        }
    }

    /// Classify an arbitrary value by its runtime type.
    ///
    /// Accepted types: `i64`, `i32`, `f64`, `f32`, `String`, `&'static str`,
    /// `bool`, and `Value` itself. Anything else fails with
    /// [`StackError::UnsupportedKind`] naming the rejected type.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnsupportedKind`] for any other type.
    pub fn from_any<V: Any>(value: V) -> Result<Self> {
        let mut slot = Some(value);
        let slot: &mut dyn Any = &mut slot;

        if let Some(v) = take::<Value>(slot) {
            return Ok(v);
        }
        if let Some(v) = take::<i64>(slot) {
            return Ok(Value::Integer(v));
        }
        if let Some(v) = take::<i32>(slot) {
            return Ok(Value::Integer(i64::from(v)));
        }
        if let Some(v) = take::<f64>(slot) {
            return Ok(Value::Float(v));
        }
        if let Some(v) = take::<f32>(slot) {
            return Ok(Value::Float(f64::from(v)));
        }
        if let Some(v) = take::<String>(slot) {
            return Ok(Value::String(v));
        }
        if let Some(v) = take::<&'static str>(slot) {
            return Ok(Value::String(v.to_string()));
        }
        if let Some(v) = take::<bool>(slot) {
            return Ok(Value::Boolean(v));
        }

        Err(StackError::UnsupportedKind {
            type_name: type_name::<V>().to_string(),
        })
    }

    /// Classify a decoded JSON value.
    ///
    /// Integral numbers that fit in `i64` are integers, every other finite
    /// number is a float. `null`, arrays, objects, and integers above
    /// `i64::MAX` are unsupported.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnsupportedKind`] for JSON values with no
    /// matching kind.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let unsupported = |name: &str| StackError::UnsupportedKind {
            type_name: format!("json {name}"),
        };

        match value {
            serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_f64() {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| unsupported("number"))
                } else {
                    Err(unsupported("unsigned integer"))
                }
            }
            serde_json::Value::Null => Err(unsupported("null")),
            serde_json::Value::Array(_) => Err(unsupported("array")),
            serde_json::Value::Object(_) => Err(unsupported("object")),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = StackError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Value::from_json(value)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::from_json(json).map_err(de::Error::custom)
    }
}

fn take<T: Any>(slot: &mut dyn Any) -> Option<T> {
    slot.downcast_mut::<Option<T>>().and_then(Option::take)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

/// A concrete Rust type that corresponds to exactly one [`Kind`].
pub trait Primitive: Sized + Into<Value> {
    /// The kind this type maps to.
    const KIND: Kind;

    /// Narrow a value to this type, or `None` if the kinds differ.
    fn from_value(value: Value) -> Option<Self>;
}

impl Primitive for i64 {
    const KIND: Kind = Kind::Integer;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }
}

impl Primitive for f64 {
    const KIND: Kind = Kind::Float;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Primitive for String {
    const KIND: Kind = Kind::String;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Primitive for bool {
    const KIND: Kind = Kind::Boolean;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }
}
