use crate::Value;

/// The persistent identity of a stored object.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// Backend-assigned surrogate key
    Datastore(String),

    /// Values of the model's primary key fields, in declaration order
    Application(Vec<Value>),
}

impl Identity {
    pub fn is_datastore(&self) -> bool {
        matches!(self, Identity::Datastore(_))
    }

    /// Text of the key as it appears in per-object paths: the surrogate
    /// key, or the first primary key value.
    pub fn key_text(&self) -> String {
        match self {
            Identity::Datastore(key) => key.clone(),
            Identity::Application(values) => match values.first() {
                Some(Value::String(value)) => value.clone(),
                Some(value) => value.to_string(),
                None => String::new(),
            },
        }
    }
}
