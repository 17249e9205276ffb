use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to (first) failure message, as reported back to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("Validation failed for {}", .0.keys().map(String::as_str).collect::<Vec<_>>().join(", "))]
pub struct ValidationError(pub BTreeMap<String, String>);

impl ValidationError {
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}
