//! Resolved arguments handed to factories and method calls.
//!
//! [`Arguments`] is a cursor over the resolved list: factories pull values
//! in declaration order with the `expect_*` accessors.

use std::any::Any;
use std::sync::Arc;

use rivet_common::error::{RivetError, Result};
use rivet_common::types::Instance;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::container::Container;

/// A single resolved argument.
#[derive(Debug, Clone)]
pub enum Argument {
    /// An optional reference that resolved to nothing.
    Null,
    /// A literal or substituted value.
    Value(Value),
    /// A referenced service.
    Service(Instance),
    /// The container itself (`"@container"`).
    Container(Container),
}

impl Argument {
    /// Short description of the variant, used in error messages.
    const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Value(_) => "value",
            Self::Service(_) => "service",
            Self::Container(_) => "container",
        }
    }
}

/// Cursor over an ordered list of resolved arguments.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    items: Vec<Argument>,
    pos: usize,
}

impl Arguments {
    /// Creates a cursor positioned on the first argument.
    #[must_use]
    pub const fn new(items: Vec<Argument>) -> Self {
        Self { items, pos: 0 }
    }

    /// Total number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether there are no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of arguments not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.pos)
    }

    /// Returns the argument at `index`, regardless of the cursor.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.items.get(index)
    }

    /// Returns the next argument without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&Argument> {
        self.items.get(self.pos)
    }

    /// Consumes and returns the next argument.
    pub fn advance(&mut self) -> Option<&Argument> {
        let arg = self.items.get(self.pos);
        if arg.is_some() {
            self.pos += 1;
        }
        arg
    }

    /// Returns all arguments as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Argument] {
        &self.items
    }

    /// Consumes the next argument, which must be a value.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no next argument or it is not a value.
    pub fn expect_value(&mut self) -> Result<Value> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Value(value)) => Ok(value.clone()),
            other => Err(mismatch(position, "value", other)),
        }
    }

    /// Consumes the next argument, which must be a string value.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not a string.
    pub fn expect_string(&mut self) -> Result<String> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Value(Value::String(text))) => Ok(text.clone()),
            other => Err(mismatch(position, "string", other)),
        }
    }

    /// Consumes the next argument, which must be an integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not an integer.
    pub fn expect_integer(&mut self) -> Result<i64> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Value(value)) if value.is_i64() => {
                value.as_i64().ok_or_else(|| mismatch(position, "integer", None))
            }
            other => Err(mismatch(position, "integer", other)),
        }
    }

    /// Consumes the next argument, which must be a boolean value.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not a boolean.
    pub fn expect_bool(&mut self) -> Result<bool> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Value(Value::Bool(flag))) => Ok(*flag),
            other => Err(mismatch(position, "bool", other)),
        }
    }

    /// Consumes the next value and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not a value or does not
    /// deserialize into `T`.
    pub fn expect_deserialize<T: DeserializeOwned>(&mut self) -> Result<T> {
        let value = self.expect_value()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Consumes the next argument, which must be a service of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not a service, or the
    /// service is of another type.
    pub fn expect_service<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Service(instance)) => downcast(instance),
            other => Err(mismatch(position, "service", other)),
        }
    }

    /// Consumes the next argument, which must be a service of type `T` or
    /// the null left by an optional reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is neither, or the service is
    /// of another type.
    pub fn optional_service<T: Any + Send + Sync>(&mut self) -> Result<Option<Arc<T>>> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Null) => Ok(None),
            Some(Argument::Service(instance)) => downcast(instance).map(Some),
            other => Err(mismatch(position, "service or null", other)),
        }
    }

    /// Consumes the next argument, which must be the container itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the next argument is not the container.
    pub fn expect_container(&mut self) -> Result<Container> {
        let position = self.pos;
        match self.advance() {
            Some(Argument::Container(container)) => Ok(container.clone()),
            other => Err(mismatch(position, "container", other)),
        }
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(items: Vec<Argument>) -> Self {
        Self::new(items)
    }
}

fn downcast<T: Any + Send + Sync>(instance: &Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().ok_or_else(|| RivetError::TypeMismatch {
        expected: std::any::type_name::<T>(),
        found: instance.type_name(),
    })
}

fn mismatch(position: usize, expected: &str, found: Option<&Argument>) -> RivetError {
    let message = found.map_or_else(
        || format!("expected {expected}, got nothing"),
        |arg| format!("expected {expected}, got {}", arg.kind()),
    );
    RivetError::Argument { position, message }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct Mailer;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Endpoint {
        host: String,
        port: u16,
    }

    #[test]
    fn cursor_reads_in_order() {
        let mut args = Arguments::new(vec![
            Argument::Value(json!("smtp")),
            Argument::Value(json!(25)),
            Argument::Value(json!(true)),
        ]);
        assert_eq!(args.len(), 3);
        assert_eq!(args.expect_string().expect("string"), "smtp");
        assert_eq!(args.expect_integer().expect("integer"), 25);
        assert_eq!(args.remaining(), 1);
        assert!(args.expect_bool().expect("bool"));
        assert_eq!(args.remaining(), 0);
        assert!(args.advance().is_none());
    }

    #[test]
    fn expect_on_exhausted_cursor_fails() {
        let mut args = Arguments::default();
        assert!(args.is_empty());
        let err = args.expect_value().unwrap_err();
        assert!(
            matches!(err, RivetError::Argument { position: 0, .. }),
            "got: {err}"
        );
        assert!(err.to_string().contains("got nothing"), "got: {err}");
    }

    #[test]
    fn expect_wrong_shape_reports_position() {
        let mut args = Arguments::new(vec![Argument::Value(json!(1)), Argument::Null]);
        let _ = args.expect_value().expect("value");
        let msg = args.expect_string().unwrap_err().to_string();
        assert!(msg.contains("argument 1"), "got: {msg}");
        assert!(msg.contains("got null"), "got: {msg}");
    }

    #[test]
    fn expect_integer_rejects_floats() {
        let mut args = Arguments::new(vec![Argument::Value(json!(1.5))]);
        assert!(args.expect_integer().is_err());
    }

    #[test]
    fn expect_deserialize_builds_structs() {
        let mut args = Arguments::new(vec![Argument::Value(
            json!({ "host": "localhost", "port": 5432 }),
        )]);
        let endpoint: Endpoint = args.expect_deserialize().expect("deserialize");
        assert_eq!(
            endpoint,
            Endpoint {
                host: "localhost".into(),
                port: 5432,
            }
        );
    }

    #[test]
    fn expect_service_downcasts() {
        let mut args = Arguments::new(vec![Argument::Service(Instance::new(Mailer))]);
        assert!(args.expect_service::<Mailer>().is_ok());

        let mut args = Arguments::new(vec![Argument::Service(Instance::new(Mailer))]);
        let err = args.expect_service::<String>().unwrap_err();
        assert!(matches!(err, RivetError::TypeMismatch { .. }), "got: {err}");
    }

    #[test]
    fn optional_service_accepts_null() {
        let mut args = Arguments::new(vec![
            Argument::Null,
            Argument::Service(Instance::new(Mailer)),
        ]);
        assert!(args.optional_service::<Mailer>().expect("null").is_none());
        assert!(args.optional_service::<Mailer>().expect("service").is_some());
    }

    #[test]
    fn peek_does_not_consume() {
        let args = Arguments::new(vec![Argument::Null]);
        assert!(matches!(args.peek(), Some(Argument::Null)));
        assert_eq!(args.remaining(), 1);
        assert!(matches!(args.get(0), Some(Argument::Null)));
        assert_eq!(args.as_slice().len(), 1);
    }
}
