//! The service container.
//!
//! Owns the definition registry, the parameter store, and the singleton
//! cache, and drives lazy resolution of services on [`Container::get`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rivet_common::config::RivetConfig;
use rivet_common::constants::SELF_REFERENCE;
use rivet_common::error::{RivetError, Result};
use rivet_common::types::{Instance, Lifetime};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::argument::{Argument, Arguments};
use crate::builder::DefinitionBuilder;
use crate::definition::{Definition, Factory};
use crate::guard::{ChainGuard, ConstructionLocks};
use crate::parameter::Parameter;
use crate::validator;

/// Registry state, swapped as a whole by [`Container::clear`].
#[derive(Debug, Default)]
struct Registry {
    definitions: HashMap<String, Arc<RwLock<Definition>>>,
    parameters: Map<String, Value>,
    instances: HashMap<String, Instance>,
}

#[derive(Debug)]
struct Shared {
    registry: RwLock<Registry>,
    locks: ConstructionLocks,
    warn_on_overwrite: bool,
}

/// A lazy inversion-of-control container.
///
/// Cloning a container yields another handle to the same registry; this is
/// how `"@container"` hands the container to factories.
#[derive(Clone)]
pub struct Container {
    shared: Arc<Shared>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RivetConfig::default())
    }

    /// Creates a container seeded from a configuration.
    #[must_use]
    pub fn with_config(config: RivetConfig) -> Self {
        let registry = Registry {
            parameters: config.parameters,
            ..Registry::default()
        };
        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(registry),
                locks: ConstructionLocks::default(),
                warn_on_overwrite: config.warn_on_overwrite,
            }),
        }
    }

    /// Registers a singleton service.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `id` is empty or reserved.
    pub fn register(&self, id: &str, factory: Factory) -> Result<DefinitionBuilder> {
        self.register_with(id, factory, Lifetime::Singleton)
    }

    /// Registers a service with an explicit lifetime.
    ///
    /// Registering an id twice replaces the previous definition.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `id` is empty or reserved.
    pub fn register_with(
        &self,
        id: &str,
        factory: Factory,
        lifetime: Lifetime,
    ) -> Result<DefinitionBuilder> {
        validator::validate_id(id)?;

        let definition = Arc::new(RwLock::new(Definition::new(factory, lifetime)));
        let previous = write(&self.shared.registry)
            .definitions
            .insert(id.to_owned(), Arc::clone(&definition));

        if previous.is_some() && self.shared.warn_on_overwrite {
            tracing::warn!(id, "<{id}> is already registered");
        }
        tracing::debug!(id, %lifetime, "service registered");

        Ok(DefinitionBuilder::new(id, definition))
    }

    /// Stores an isolated copy of `value` as the parameter `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn set<V>(&self, key: impl Into<String>, value: &V) -> Result<&Self>
    where
        V: Serialize + ?Sized,
    {
        let copy = serde_json::to_value(value)?;
        let key = key.into();
        tracing::trace!(key = %key, "parameter set");
        let _ = write(&self.shared.registry).parameters.insert(key, copy);
        Ok(self)
    }

    /// Returns a copy of the parameter `key`.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<Value> {
        read(&self.shared.registry).parameters.get(key).cloned()
    }

    /// Returns whether a definition is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        read(&self.shared.registry).definitions.contains_key(id)
    }

    /// Returns whether a singleton instance is cached under `id`.
    #[must_use]
    pub fn is_cached(&self, id: &str) -> bool {
        read(&self.shared.registry).instances.contains_key(id)
    }

    /// Returns the service `id`, building it if needed.
    ///
    /// Unknown ids resolve to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving a parameter, constructing the service,
    /// or running one of its hooks fails.
    pub fn get(&self, id: &str) -> Result<Option<Instance>> {
        self.get_with_args(id, std::iter::empty())
    }

    /// Returns the service `id`, appending `extra` to its declared arguments
    /// if a new instance has to be built.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving a parameter, constructing the service,
    /// or running one of its hooks fails.
    pub fn get_with_args<I>(&self, id: &str, extra: I) -> Result<Option<Instance>>
    where
        I: IntoIterator<Item = Value>,
    {
        let Some(registered) = self.registered(id) else {
            tracing::trace!(id, "no definition registered");
            return Ok(None);
        };
        let definition = snapshot(&registered);

        if !definition.lifetime().is_singleton() {
            let _chain = ChainGuard::enter(self.owner(), id)?;
            return self.build(id, &definition, extra).map(Some);
        }

        if let Some(instance) = self.cached(id) {
            tracing::trace!(id, "singleton cache hit");
            return Ok(Some(instance));
        }

        let _chain = ChainGuard::enter(self.owner(), id)?;
        let lock = self.shared.locks.for_id(id);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(instance) = self.cached(id) {
            return Ok(Some(instance));
        }

        let instance = self.build(id, &definition, extra)?;
        let mut registry = write(&self.shared.registry);
        let current = registry
            .definitions
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &registered));
        if current {
            let _ = registry.instances.insert(id.to_owned(), instance.clone());
        } else {
            tracing::debug!(id, "definition replaced during construction, not caching");
        }
        Ok(Some(instance))
    }

    /// Returns the service `id` downcast to `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution fails or the service is not a `T`.
    pub fn resolve<T>(&self, id: &str) -> Result<Option<Arc<T>>>
    where
        T: std::any::Any + Send + Sync,
    {
        let Some(instance) = self.get(id)? else {
            return Ok(None);
        };
        instance
            .downcast::<T>()
            .map(Some)
            .ok_or_else(|| RivetError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: instance.type_name(),
            })
    }

    /// Drops the cached singleton `id`, returning whether one existed.
    pub fn destroy(&self, id: &str) -> bool {
        let removed = write(&self.shared.registry).instances.remove(id).is_some();
        tracing::debug!(id, removed, "destroy");
        removed
    }

    /// Removes every definition, parameter, and cached instance.
    pub fn clear(&self) -> &Self {
        *write(&self.shared.registry) = Registry::default();
        self.shared.locks.clear();
        tracing::debug!("container cleared");
        self
    }

    /// Resolves one declared parameter against this container.
    ///
    /// # Errors
    ///
    /// Returns an error if a required reference resolves to nothing, or if
    /// building the referenced service fails.
    pub fn evaluate(&self, parameter: &Parameter) -> Result<Argument> {
        let Some(key) = parameter.reference() else {
            let registry = read(&self.shared.registry);
            return Ok(Argument::Value(parameter.compute(&registry.parameters)));
        };

        if key == SELF_REFERENCE {
            return Ok(Argument::Container(self.clone()));
        }

        match self.get(key)? {
            Some(instance) => Ok(Argument::Service(instance)),
            None if parameter.is_required() => Err(RivetError::ReferenceNotFound {
                key: key.to_owned(),
            }),
            None => Ok(Argument::Null),
        }
    }

    fn evaluate_all(&self, parameters: &[Parameter]) -> Result<Vec<Argument>> {
        parameters.iter().map(|p| self.evaluate(p)).collect()
    }

    fn build<I>(&self, id: &str, definition: &Definition, extra: I) -> Result<Instance>
    where
        I: IntoIterator<Item = Value>,
    {
        tracing::debug!(id, lifetime = %definition.lifetime(), "constructing service");

        let mut resolved = self.evaluate_all(definition.args())?;
        resolved.extend(extra.into_iter().map(Argument::Value));

        let factory = definition.factory();
        let mut pending = factory.construct(&mut Arguments::new(resolved))?;

        for configurator in definition.configurators() {
            configurator.execute(self, &mut pending)?;
        }
        for call in definition.calls() {
            let mut args = Arguments::new(self.evaluate_all(call.args())?);
            call.invoke(&mut pending, &mut args)?;
        }

        let instance = factory.seal(pending);
        tracing::debug!(id, type_name = instance.type_name(), "service constructed");
        Ok(instance)
    }

    fn registered(&self, id: &str) -> Option<Arc<RwLock<Definition>>> {
        read(&self.shared.registry).definitions.get(id).cloned()
    }

    fn cached(&self, id: &str) -> Option<Instance> {
        read(&self.shared.registry).instances.get(id).cloned()
    }

    /// Identity of the shared registry, used to scope resolution chains.
    fn owner(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = read(&self.shared.registry);
        f.debug_struct("Container")
            .field("definitions", &registry.definitions.len())
            .field("parameters", &registry.parameters.len())
            .field("instances", &registry.instances.len())
            .finish()
    }
}

/// Copy of a definition taken at the start of a build.
fn snapshot(definition: &RwLock<Definition>) -> Definition {
    definition
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn read(lock: &RwLock<Registry>) -> RwLockReadGuard<'_, Registry> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<Registry>) -> RwLockWriteGuard<'_, Registry> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
