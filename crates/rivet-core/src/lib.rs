//! # rivet-core
//!
//! A lazy inversion-of-control container.
//!
//! Handles:
//! - **Container**: definition registry, parameter store, singleton cache.
//! - **Builder**: the registration DSL returned by `register`.
//! - **Parameter**: literals, `@id` references, and `%name%` placeholders.
//! - **Configurator**: post-construction hooks, inline or delegated.
//! - **Definition**: factories, lifetimes, and post-construction calls.
//!
//! # Example
//!
//! ```rust
//! use rivet_core::argument::Arguments;
//! use rivet_core::container::Container;
//! use rivet_core::definition::Factory;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let container = Container::new();
//! container.set("name", "world")?;
//! container
//!     .register(
//!         "greeter",
//!         Factory::new(|args: &mut Arguments| {
//!             Ok(Greeter {
//!                 greeting: args.expect_string()?,
//!             })
//!         }),
//!     )?
//!     .argument("hello %name%");
//!
//! let greeter = container.resolve::<Greeter>("greeter")?;
//! assert_eq!(
//!     greeter.map(|g| g.greeting.clone()),
//!     Some("hello world".to_owned())
//! );
//! # Ok::<(), rivet_common::error::RivetError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod argument;
pub mod builder;
pub mod configurator;
pub mod container;
pub mod definition;
mod guard;
pub mod parameter;
pub mod validator;
