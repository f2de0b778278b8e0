//! Domain primitive types used across the Rivet workspace.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Type-erased service value.
pub type AnyValue = dyn Any + Send + Sync;

/// Caching policy of a service definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// One instance is built on first use and shared until destroyed.
    #[default]
    Singleton,
    /// Every lookup builds a fresh instance.
    Transient,
}

impl Lifetime {
    /// Returns whether instances of this lifetime are cached.
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

/// Table of methods a service exposes by name.
///
/// Configurators that name a method (`configure_method("@registry", "attach")`)
/// reach their target through this trait instead of reflection.
pub trait Dispatch: Send + Sync {
    /// Invokes `method` with `instance` as its sole argument.
    ///
    /// Returns `None` when the service has no method of that name.
    fn dispatch(&self, method: &str, instance: &mut AnyValue) -> Option<Result<()>>;
}

/// Recovers the [`Dispatch`] view of a type-erased value.
pub type DispatchTable = fn(Arc<AnyValue>) -> Option<Arc<dyn Dispatch>>;

/// Returns the [`DispatchTable`] for values of type `T`.
#[must_use]
pub fn dispatch_table<T: Dispatch + Any>() -> DispatchTable {
    |value| {
        value
            .downcast::<T>()
            .ok()
            .map(|typed| typed as Arc<dyn Dispatch>)
    }
}

/// A constructed service, shared by reference.
///
/// Cloning an instance clones the handle, never the service.
#[derive(Clone)]
pub struct Instance {
    value: Arc<AnyValue>,
    type_name: &'static str,
    methods: Option<Arc<dyn Dispatch>>,
}

impl Instance {
    /// Wraps a value that exposes no named methods.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            methods: None,
        }
    }

    /// Wraps a value whose methods can be dispatched by name.
    pub fn dispatching<T: Dispatch + Any>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            methods: Some(value.clone() as Arc<dyn Dispatch>),
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Seals a boxed value built by a factory.
    #[must_use]
    pub fn from_boxed(
        value: Box<AnyValue>,
        type_name: &'static str,
        table: Option<DispatchTable>,
    ) -> Self {
        let value: Arc<AnyValue> = Arc::from(value);
        let methods = table.and_then(|recover| recover(value.clone()));
        Self {
            value,
            type_name,
            methods,
        }
    }

    /// Returns a shared handle to the service if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Borrows the service if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns whether the service is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the concrete service type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns whether both handles point at the same service.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Dispatches a named method with `instance` as its argument.
    ///
    /// Returns `None` when the service exposes no method of that name.
    pub fn dispatch(&self, method: &str, instance: &mut AnyValue) -> Option<Result<()>> {
        self.methods
            .as_ref()
            .and_then(|methods| methods.dispatch(method, instance))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("dispatching", &self.methods.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: usize,
    }

    struct Registry;

    impl Dispatch for Registry {
        fn dispatch(&self, method: &str, instance: &mut AnyValue) -> Option<Result<()>> {
            match method {
                "bump" => {
                    if let Some(counter) = instance.downcast_mut::<Counter>() {
                        counter.hits += 1;
                    }
                    Some(Ok(()))
                }
                _ => None,
            }
        }
    }

    #[test]
    fn lifetime_defaults_to_singleton() {
        assert_eq!(Lifetime::default(), Lifetime::Singleton);
        assert!(Lifetime::Singleton.is_singleton());
        assert!(!Lifetime::Transient.is_singleton());
        assert_eq!(Lifetime::Transient.to_string(), "transient");
    }

    #[test]
    fn clone_shares_the_service() {
        let a = Instance::new(Counter { hits: 0 });
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Instance::new(Counter { hits: 0 })));
    }

    #[test]
    fn downcast_checks_the_type() {
        let instance = Instance::new(Counter { hits: 7 });
        assert!(instance.is::<Counter>());
        assert_eq!(instance.downcast_ref::<Counter>().map(|c| c.hits), Some(7));
        assert!(instance.downcast::<String>().is_none());
        assert!(instance.type_name().ends_with("Counter"));
    }

    #[test]
    fn dispatch_reaches_named_methods() {
        let registry = Instance::dispatching(Registry);
        let mut counter = Counter { hits: 0 };
        let outcome = registry.dispatch("bump", &mut counter);
        assert!(matches!(outcome, Some(Ok(()))));
        assert_eq!(counter.hits, 1);
        assert!(registry.dispatch("missing", &mut counter).is_none());
    }

    #[test]
    fn plain_instances_dispatch_nothing() {
        let plain = Instance::new(Registry);
        let mut counter = Counter { hits: 0 };
        assert!(plain.dispatch("bump", &mut counter).is_none());
    }

    #[test]
    fn from_boxed_recovers_dispatch_table() {
        let boxed: Box<AnyValue> = Box::new(Registry);
        let instance = Instance::from_boxed(
            boxed,
            std::any::type_name::<Registry>(),
            Some(dispatch_table::<Registry>()),
        );
        let mut counter = Counter { hits: 0 };
        assert!(instance.dispatch("bump", &mut counter).is_some());
        assert_eq!(counter.hits, 1);
    }
}
