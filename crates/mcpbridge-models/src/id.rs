//! JSON-RPC request identity.
//!
//! A request id is either a number or a string, and the reply must carry the
//! same value with the same JSON type. [`RequestId`] keeps the original
//! representation so `42` never comes back as `"42"` and vice versa. Numbers
//! keep their exact text (`1e2`, `1.50`, integers wider than 64 bits) through
//! serde_json's `arbitrary_precision`. A `null` id is modelled as
//! `Option<RequestId>::None` by the callers.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::MessageError;

/// Identifier of a JSON-RPC request, preserved exactly as received.
///
/// # Examples
///
/// ```
/// use mcpbridge_models::RequestId;
///
/// let id: RequestId = serde_json::from_str("42").unwrap();
/// assert_eq!(serde_json::to_string(&id).unwrap(), "42");
///
/// let id: RequestId = serde_json::from_str("\"abc-123\"").unwrap();
/// assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
/// ```
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id, kept exactly as written.
    Number(Number),
    /// String id.
    String(String),
}

impl RequestId {
    /// Interpret a raw `id` field.
    ///
    /// Returns `Ok(None)` for `null`. Booleans, arrays and objects are not
    /// valid ids.
    pub fn from_value(value: &Value) -> Result<Option<Self>, MessageError> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(Self::Number(n.clone()))),
            Value::String(s) => Ok(Some(Self::String(s.clone()))),
            _ => Err(MessageError::invalid(
                "id must be a string, a number or null",
            )),
        }
    }

    /// Convert back into a JSON value of the original type.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("id must not be null"))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
