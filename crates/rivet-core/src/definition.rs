//! Service definitions: the stored recipe for building one service.
//!
//! A [`Definition`] pairs a [`Factory`] with its declared constructor
//! parameters, configurators, and post-construction [`MethodCall`]s.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rivet_common::error::{RivetError, Result};
use rivet_common::types::{AnyValue, Dispatch, DispatchTable, Instance, Lifetime, dispatch_table};

use crate::argument::Arguments;
use crate::configurator::Configurator;
use crate::parameter::Parameter;

/// A freshly constructed service that is still exclusively owned.
///
/// Configurators and method calls get `&mut` access to it before it is
/// sealed into a shared [`Instance`].
pub(crate) struct Pending {
    value: Box<AnyValue>,
    type_name: &'static str,
}

impl Pending {
    /// Borrows the service mutably if it is a `T`.
    pub(crate) fn downcast_mut<T: Any>(&mut self) -> Result<&mut T> {
        let found = self.type_name;
        self.value
            .downcast_mut::<T>()
            .ok_or(RivetError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })
    }

    /// Borrows the type-erased service mutably.
    pub(crate) fn as_any_mut(&mut self) -> &mut AnyValue {
        &mut *self.value
    }
}

type Build = dyn Fn(&mut Arguments) -> Result<Box<AnyValue>> + Send + Sync;

/// Builds service values from resolved arguments.
#[derive(Clone)]
pub struct Factory {
    build: Arc<Build>,
    type_name: &'static str,
    table: Option<DispatchTable>,
}

impl Factory {
    /// Creates a factory from a closure returning the service.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self::typed(factory, None)
    }

    /// Creates a factory for a service whose methods can be dispatched by
    /// name from configurators.
    pub fn dispatching<T, F>(factory: F) -> Self
    where
        T: Dispatch + Any,
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self::typed(factory, Some(dispatch_table::<T>()))
    }

    /// Creates a constructor-style factory.
    ///
    /// A `T::default()` receiver is allocated and handed to `constructor`
    /// along with the arguments. If the constructor returns a replacement
    /// value, that value becomes the service instead of the receiver.
    pub fn constructor<T, F>(constructor: F) -> Self
    where
        T: Default + Any + Send + Sync,
        F: Fn(&mut T, &mut Arguments) -> Result<Option<T>> + Send + Sync + 'static,
    {
        Self::typed(receive(constructor), None)
    }

    /// Constructor-style counterpart of [`Factory::dispatching`].
    pub fn constructor_dispatching<T, F>(constructor: F) -> Self
    where
        T: Default + Dispatch + Any,
        F: Fn(&mut T, &mut Arguments) -> Result<Option<T>> + Send + Sync + 'static,
    {
        Self::typed(receive(constructor), Some(dispatch_table::<T>()))
    }

    fn typed<T, F>(factory: F, table: Option<DispatchTable>) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(move |args: &mut Arguments| {
                factory(args).map(|value| Box::new(value) as Box<AnyValue>)
            }),
            type_name: std::any::type_name::<T>(),
            table,
        }
    }

    /// Name of the type this factory produces.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(&self, args: &mut Arguments) -> Result<Pending> {
        Ok(Pending {
            value: (self.build)(args)?,
            type_name: self.type_name,
        })
    }

    pub(crate) fn seal(&self, pending: Pending) -> Instance {
        Instance::from_boxed(pending.value, pending.type_name, self.table)
    }
}

/// Adapts a constructor closure into a value-returning factory closure.
fn receive<T, F>(constructor: F) -> impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static
where
    T: Default + Any + Send + Sync,
    F: Fn(&mut T, &mut Arguments) -> Result<Option<T>> + Send + Sync + 'static,
{
    move |args: &mut Arguments| {
        let mut receiver = T::default();
        let replacement = constructor(&mut receiver, args)?;
        Ok(replacement.unwrap_or(receiver))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("type_name", &self.type_name)
            .field("dispatching", &self.table.is_some())
            .finish_non_exhaustive()
    }
}

type Call = dyn Fn(&mut Pending, &mut Arguments) -> Result<()> + Send + Sync;

/// A method invoked on a new instance after its configurators ran.
#[derive(Clone)]
pub struct MethodCall {
    callable: Arc<Call>,
    args: Vec<Parameter>,
}

impl MethodCall {
    /// Creates a call of `method` with the given parameters.
    pub fn new<T, F>(method: F, args: Vec<Parameter>) -> Self
    where
        T: Any,
        F: Fn(&mut T, &mut Arguments) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            callable: Arc::new(move |pending: &mut Pending, args: &mut Arguments| {
                method(pending.downcast_mut::<T>()?, args)
            }),
            args,
        }
    }

    /// Declared parameters, in order.
    #[must_use]
    pub fn args(&self) -> &[Parameter] {
        &self.args
    }

    pub(crate) fn invoke(&self, pending: &mut Pending, args: &mut Arguments) -> Result<()> {
        (self.callable)(pending, args)
    }
}

impl fmt::Debug for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCall")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// The full recipe for one service id.
#[derive(Debug, Clone)]
pub struct Definition {
    factory: Factory,
    lifetime: Lifetime,
    args: Vec<Parameter>,
    configurators: Vec<Configurator>,
    calls: Vec<MethodCall>,
}

impl Definition {
    /// Creates a definition with no parameters, configurators, or calls.
    #[must_use]
    pub const fn new(factory: Factory, lifetime: Lifetime) -> Self {
        Self {
            factory,
            lifetime,
            args: Vec::new(),
            configurators: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// The factory building the service.
    #[must_use]
    pub const fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Caching policy.
    #[must_use]
    pub const fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Declared constructor parameters, in order.
    #[must_use]
    pub fn args(&self) -> &[Parameter] {
        &self.args
    }

    /// Declared configurators, in order.
    #[must_use]
    pub fn configurators(&self) -> &[Configurator] {
        &self.configurators
    }

    /// Declared method calls, in order.
    #[must_use]
    pub fn calls(&self) -> &[MethodCall] {
        &self.calls
    }

    pub(crate) fn push_arg(&mut self, parameter: Parameter) {
        self.args.push(parameter);
    }

    pub(crate) fn push_configurator(&mut self, configurator: Configurator) {
        self.configurators.push(configurator);
    }

    pub(crate) fn push_call(&mut self, call: MethodCall) {
        self.calls.push(call);
    }
}
