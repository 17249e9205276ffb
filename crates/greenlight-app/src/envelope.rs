use std::collections::BTreeMap;

use axum::Json;
use serde::{ser::SerializeMap as _, Serialize, Serializer};

/// Success payload wrapped under a single key, e.g. `{"movie": {...}}`.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    key: &'static str,
    payload: T,
}

impl<T> Envelope<T> {
    pub fn new(key: &'static str, payload: T) -> Self {
        Envelope { key, payload }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.payload)?;
        map.end()
    }
}

pub fn envelope<T: Serialize>(key: &'static str, payload: T) -> Json<Envelope<T>> {
    Json(Envelope::new(key, payload))
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    pub fn message(message: impl Into<String>) -> Self {
        ErrorEnvelope {
            error: ErrorDetail::Message(message.into()),
        }
    }

    pub fn fields(fields: BTreeMap<String, String>) -> Self {
        ErrorEnvelope {
            error: ErrorDetail::Fields(fields),
        }
    }
}
