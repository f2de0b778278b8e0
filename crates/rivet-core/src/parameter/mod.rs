//! Constructor and method parameters.
//!
//! A parameter is a raw JSON value interpreted at resolution time:
//! - `"@id"` references the service `id`; `"@container"` is the container.
//! - any other non-empty string goes through placeholder substitution.
//! - every other value is passed through unchanged.

pub mod placeholder;

use rivet_common::constants::{REFERENCE_SIGIL, SELF_REFERENCE};
use serde_json::{Map, Value};

/// One declared argument of a factory or method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    raw: Value,
    required: bool,
}

impl Parameter {
    /// Creates a parameter with an explicit requirement flag.
    pub fn new(raw: impl Into<Value>, required: bool) -> Self {
        Self {
            raw: raw.into(),
            required,
        }
    }

    /// Creates a required parameter.
    pub fn required(raw: impl Into<Value>) -> Self {
        Self::new(raw, true)
    }

    /// Creates a parameter whose reference may resolve to nothing.
    pub fn optional(raw: impl Into<Value>) -> Self {
        Self::new(raw, false)
    }

    /// Returns the raw declared value.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns whether a missing reference is an error.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the referenced key when this parameter is a reference.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.raw
            .as_str()
            .and_then(|text| text.strip_prefix(REFERENCE_SIGIL))
    }

    /// Returns whether this parameter references another service.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.reference().is_some()
    }

    /// Returns whether this parameter references the container itself.
    #[must_use]
    pub fn is_self_reference(&self) -> bool {
        self.reference() == Some(SELF_REFERENCE)
    }

    /// Computes the value of a non-reference parameter.
    ///
    /// Non-empty strings go through placeholder substitution against
    /// `parameters`; everything else is returned unchanged.
    #[must_use]
    pub fn compute(&self, parameters: &Map<String, Value>) -> Value {
        match &self.raw {
            Value::String(text) if !text.is_empty() => placeholder::substitute(text, parameters),
            other => other.clone(),
        }
    }
}
