use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::error::ValidationError;

/// Collects field failures for a single validation pass.
///
/// Failures are kept per field in the order they were recorded, [`Validator::errors`]
/// reports the first one for each field.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    errors: BTreeMap<String, Vec<String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` under `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Records every failure of a garde report under its field path.
    pub fn append_report(&mut self, report: garde::Report) {
        for (path, error) in report.iter() {
            self.add_error(path.to_string(), error.message());
        }
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .filter_map(|(field, messages)| {
                messages
                    .first()
                    .map(|message| (field.clone(), message.clone()))
            })
            .collect()
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.valid() {
            Ok(())
        } else {
            Err(ValidationError(self.errors()))
        }
    }
}

/// True if no value occurs twice.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
