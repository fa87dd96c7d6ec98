//! Dictionary-based entity serialisation.
//!
//! An [`Entity`] can be built from a JSON object and turned back into one.
//! Every `serde` type gets the trait for free, so a reply from
//! [`RequestController::get`](crate::RequestController::get) can be decoded
//! with [`Reply::into_entity`](crate::Reply::into_entity), and
//! [`Entity::to_dictionary`] output is a valid
//! [`RequestController::post`](crate::RequestController::post) body.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{RequestError, Result};

/// A JSON object keyed by strings.
pub type Dictionary = Map<String, Value>;

/// A value that round-trips through a [`Dictionary`].
pub trait Entity: Sized {
    /// Build the entity from a dictionary.
    fn from_dictionary(dictionary: Dictionary) -> Result<Self>;

    /// Represent the entity as a dictionary.
    fn to_dictionary(&self) -> Result<Dictionary>;

    /// Build the entity from any JSON value, which must be an object.
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(dictionary) => Self::from_dictionary(dictionary),
            other => Err(RequestError::Entity(format!(
                "expected a JSON object, found {}",
                kind(&other)
            ))),
        }
    }
}

impl<T> Entity for T
where
    T: Serialize + DeserializeOwned,
{
    fn from_dictionary(dictionary: Dictionary) -> Result<Self> {
        serde_json::from_value(Value::Object(dictionary))
            .map_err(|e| RequestError::Entity(e.to_string()))
    }

    fn to_dictionary(&self) -> Result<Dictionary> {
        match serde_json::to_value(self) {
            Ok(Value::Object(dictionary)) => Ok(dictionary),
            Ok(other) => Err(RequestError::Entity(format!(
                "expected a JSON object, found {}",
                kind(&other)
            ))),
            Err(e) => Err(RequestError::Entity(e.to_string())),
        }
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Trainer {
        name: String,
        level: u32,
    }

    #[test]
    fn test_round_trip() {
        let trainer = Trainer {
            name: "Ash".to_string(),
            level: 12,
        };
        let dictionary = trainer.to_dictionary().unwrap();
        assert_eq!(dictionary["name"], "Ash");
        assert_eq!(Trainer::from_dictionary(dictionary).unwrap(), trainer);
    }

    #[test]
    fn test_missing_field() {
        let err = Trainer::from_value(json!({"name": "Ash"})).unwrap_err();
        assert!(matches!(err, RequestError::Entity(_)));
    }

    #[test]
    fn test_non_object_value() {
        let err = Trainer::from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_non_object_entity() {
        let err = 5u32.to_dictionary().unwrap_err();
        assert!(err.to_string().contains("a number"));
    }
}
