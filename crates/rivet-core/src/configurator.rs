//! Post-construction hooks.
//!
//! A configurator runs once per construction, after the factory and before
//! any method call. It is validated when the definition is built and
//! executed lazily when an instance is created.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rivet_common::error::{RivetError, Result};
use rivet_common::types::Instance;

use crate::container::Container;
use crate::definition::Pending;
use crate::validator;

type Inline = dyn Fn(&mut Pending) -> Result<()> + Send + Sync;
type Bound = dyn Fn(&Instance, &mut Pending) -> Result<()> + Send + Sync;

#[derive(Clone)]
enum Action {
    /// Callback invoked with the new instance.
    Inline(Arc<Inline>),
    /// Method dispatched by name on the target service.
    Method { target: String, name: String },
    /// Callback invoked with the target service as receiver.
    Bound { target: String, callback: Arc<Bound> },
}

/// One post-construction hook of a definition.
#[derive(Clone)]
pub struct Configurator {
    action: Action,
}

impl Configurator {
    /// Creates a configurator invoking `callback` with the new instance.
    pub fn inline<T, F>(callback: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            action: Action::Inline(Arc::new(move |pending: &mut Pending| {
                callback(pending.downcast_mut::<T>()?)
            })),
        }
    }

    /// Creates a configurator dispatching `name` on the service `reference`
    /// (written `"@id"`) with the new instance as argument.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the reference or name is invalid.
    pub fn method(reference: &str, name: impl Into<String>) -> Result<Self> {
        let target = validator::validate_reference(reference)?.to_owned();
        let name = name.into();
        validator::validate_method_name(&name)?;
        Ok(Self {
            action: Action::Method { target, name },
        })
    }

    /// Creates a configurator invoking `callback` with the service
    /// `reference` (written `"@id"`) as receiver and the new instance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the reference is invalid.
    pub fn bound<S, T, F>(reference: &str, callback: F) -> Result<Self>
    where
        S: Any,
        T: Any,
        F: Fn(&S, &mut T) -> Result<()> + Send + Sync + 'static,
    {
        let target = validator::validate_reference(reference)?.to_owned();
        let callback = move |receiver: &Instance, pending: &mut Pending| {
            let typed = receiver
                .downcast_ref::<S>()
                .ok_or(RivetError::TypeMismatch {
                    expected: std::any::type_name::<S>(),
                    found: receiver.type_name(),
                })?;
            callback(typed, pending.downcast_mut::<T>()?)
        };
        Ok(Self {
            action: Action::Bound {
                target,
                callback: Arc::new(callback),
            },
        })
    }

    /// Id of the service this configurator delegates to, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match &self.action {
            Action::Inline(_) => None,
            Action::Method { target, .. } | Action::Bound { target, .. } => Some(target),
        }
    }

    /// Runs the hook against a freshly constructed instance.
    pub(crate) fn execute(&self, container: &Container, pending: &mut Pending) -> Result<()> {
        match &self.action {
            Action::Inline(callback) => callback(pending),
            Action::Method { target, name } => {
                let receiver = resolve_target(container, target)?;
                tracing::trace!(receiver = %target, method = %name, "dispatching configurator");
                receiver
                    .dispatch(name, pending.as_any_mut())
                    .unwrap_or_else(|| {
                        Err(RivetError::InvalidCallable {
                            action: name.clone(),
                        })
                    })
            }
            Action::Bound { target, callback } => {
                let receiver = resolve_target(container, target)?;
                callback(&receiver, pending)
            }
        }
    }
}

fn resolve_target(container: &Container, key: &str) -> Result<Instance> {
    container
        .get(key)?
        .ok_or_else(|| RivetError::ReferenceNotFound {
            key: key.to_owned(),
        })
}

impl fmt::Debug for Configurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Inline(_) => f.debug_struct("Configurator").finish_non_exhaustive(),
            Action::Method { target, name } => f
                .debug_struct("Configurator")
                .field("target", target)
                .field("method", name)
                .finish(),
            Action::Bound { target, .. } => f
                .debug_struct("Configurator")
                .field("target", target)
                .finish_non_exhaustive(),
        }
    }
}
