//! Fluent API for declaring how a registered service is wired.

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use rivet_common::error::Result;
use serde_json::Value;

use crate::argument::Arguments;
use crate::configurator::Configurator;
use crate::definition::{Definition, MethodCall};
use crate::parameter::Parameter;

/// Builder returned by [`Container::register`](crate::container::Container::register).
///
/// Every call appends to the registered definition immediately; there is no
/// final `build` step and nothing can be removed.
#[derive(Debug, Clone)]
pub struct DefinitionBuilder {
    id: String,
    definition: Arc<RwLock<Definition>>,
}

impl DefinitionBuilder {
    pub(crate) fn new(id: &str, definition: Arc<RwLock<Definition>>) -> Self {
        Self {
            id: id.to_owned(),
            definition,
        }
    }

    /// Id the definition is registered under.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Appends a required constructor argument.
    ///
    /// Strings starting with `@` reference other services; other strings may
    /// contain `%name%` placeholders.
    pub fn argument(&self, value: impl Into<Value>) -> &Self {
        self.definition().push_arg(Parameter::required(value));
        self
    }

    /// Appends a constructor argument whose reference may resolve to nothing.
    pub fn optional_argument(&self, value: impl Into<Value>) -> &Self {
        self.definition().push_arg(Parameter::optional(value));
        self
    }

    /// Appends a method call run on each new instance, after configurators.
    pub fn method<T, F>(&self, method: F, args: &[Value]) -> &Self
    where
        T: Any,
        F: Fn(&mut T, &mut Arguments) -> Result<()> + Send + Sync + 'static,
    {
        let args = args.iter().cloned().map(Parameter::required).collect();
        self.definition().push_call(MethodCall::new(method, args));
        self
    }

    /// Appends a configurator invoked with each new instance.
    pub fn configure<T, F>(&self, callback: F) -> &Self
    where
        T: Any,
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        self.definition()
            .push_configurator(Configurator::inline(callback));
        self
    }

    /// Appends a configurator invoked with the service `reference` (written
    /// `"@id"`) as receiver and each new instance as argument.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the reference is invalid.
    pub fn configure_with<S, T, F>(&self, reference: &str, callback: F) -> Result<&Self>
    where
        S: Any,
        T: Any,
        F: Fn(&S, &mut T) -> Result<()> + Send + Sync + 'static,
    {
        let configurator = Configurator::bound(reference, callback)?;
        self.definition().push_configurator(configurator);
        Ok(self)
    }

    /// Appends a configurator dispatching the method `name` of the service
    /// `reference` (written `"@id"`) with each new instance as argument.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the reference or name is invalid.
    pub fn configure_method(&self, reference: &str, name: &str) -> Result<&Self> {
        let configurator = Configurator::method(reference, name)?;
        self.definition().push_configurator(configurator);
        Ok(self)
    }

    fn definition(&self) -> RwLockWriteGuard<'_, Definition> {
        self.definition
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use rivet_common::types::Lifetime;
    use serde_json::json;

    use super::*;
    use crate::definition::Factory;

    #[derive(Debug, Default)]
    struct Rocket {
        code: String,
    }

    fn builder() -> (DefinitionBuilder, Arc<RwLock<Definition>>) {
        let definition = Arc::new(RwLock::new(Definition::new(
            Factory::new(|_: &mut Arguments| Ok(Rocket::default())),
            Lifetime::Singleton,
        )));
        (
            DefinitionBuilder::new("rocket", Arc::clone(&definition)),
            definition,
        )
    }

    #[test]
    fn arguments_are_appended_in_order() {
        let (builder, definition) = builder();
        let _ = builder
            .argument(123)
            .argument("%username%")
            .optional_argument("@reference");

        let definition = definition.read().expect("lock");
        let args = definition.args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].raw(), &json!(123));
        assert!(args[1].is_required());
        assert!(!args[2].is_required());
        assert_eq!(builder.id(), "rocket");
    }

    #[test]
    fn method_wraps_required_parameters() {
        let (builder, definition) = builder();
        let _ = builder.method(
            |rocket: &mut Rocket, args: &mut Arguments| {
                rocket.code = args.expect_string()?;
                Ok(())
            },
            &[json!("%secret_code%"), json!("@optional")],
        );

        let definition = definition.read().expect("lock");
        let call = &definition.calls()[0];
        assert_eq!(call.args().len(), 2);
        assert!(call.args().iter().all(Parameter::is_required));
    }

    #[test]
    fn configurators_are_appended_in_order() {
        let (builder, definition) = builder();
        let _ = builder
            .configure(|_: &mut Rocket| Ok(()))
            .configure_method("@launcher", "prepare")
            .expect("valid reference")
            .configure_with("@logger", |_: &String, _: &mut Rocket| Ok(()))
            .expect("valid reference");

        let definition = definition.read().expect("lock");
        let targets: Vec<Option<&str>> = definition
            .configurators()
            .iter()
            .map(Configurator::target)
            .collect();
        assert_eq!(targets, vec![None, Some("launcher"), Some("logger")]);
    }

    #[test]
    fn invalid_configurator_is_rejected() {
        let (builder, definition) = builder();
        assert!(builder.configure_method("launcher", "prepare").is_err());
        assert!(builder.configure_method("@container", "prepare").is_err());
        assert!(
            builder
                .configure_with("", |_: &String, _: &mut Rocket| Ok(()))
                .is_err()
        );
        assert!(definition.read().expect("lock").configurators().is_empty());
    }
}
