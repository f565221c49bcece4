use serde_json::{Map, Value};

use super::Model;

/// An identity, an attribute object, or a model: anything a record can be
/// looked up or constructed from.
#[derive(Debug, Clone)]
pub enum Lookup {
    Id(Value),
    Attributes(Map<String, Value>),
    Model(Model),
}

impl Lookup {
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Lookup::Model(model) => Some(model),
            _ => None,
        }
    }
}

impl From<Value> for Lookup {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(attributes) => Lookup::Attributes(attributes),
            other => Lookup::Id(other),
        }
    }
}

impl From<Map<String, Value>> for Lookup {
    fn from(attributes: Map<String, Value>) -> Self {
        Lookup::Attributes(attributes)
    }
}

impl From<Model> for Lookup {
    fn from(model: Model) -> Self {
        Lookup::Model(model)
    }
}

impl From<&Model> for Lookup {
    fn from(model: &Model) -> Self {
        Lookup::Model(model.clone())
    }
}

impl From<&str> for Lookup {
    fn from(id: &str) -> Self {
        Lookup::Id(Value::String(id.to_string()))
    }
}

impl From<String> for Lookup {
    fn from(id: String) -> Self {
        Lookup::Id(Value::String(id))
    }
}

impl From<i32> for Lookup {
    fn from(id: i32) -> Self {
        Lookup::Id(Value::from(id))
    }
}

impl From<i64> for Lookup {
    fn from(id: i64) -> Self {
        Lookup::Id(Value::from(id))
    }
}

impl From<u64> for Lookup {
    fn from(id: u64) -> Self {
        Lookup::Id(Value::from(id))
    }
}

/// String form of an identity value. Null has no identity.
pub(crate) fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
