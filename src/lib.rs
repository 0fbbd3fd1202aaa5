//! # Ripple
//!
//! Event emission and extensible class definitions for dynamic object
//! models.
//!
//! Two facilities, designed to interlock:
//!
//! - **Event registry & dispatcher**: every [`Instance`] carries its own
//!   listener store with synchronous, reverse-registration-order dispatch,
//!   `newListener`/`removeListener` lifecycle events, and an advisory
//!   `max_listeners` diagnostic threshold.
//! - **Class extension**: [`Class::extend`] builds immutable single-
//!   inheritance definitions from an ordered [`Properties`] map, with
//!   explicit base-implementation delegation through a per-call [`Super`]
//!   context. Every constructed instance has the full emitter surface.
//!
//! ## Design Principles
//!
//! - **Synchronous**: dispatch and delegation run inline on the caller;
//!   listener errors propagate and abort the remainder of the pass
//! - **Live sequences**: listeners registered or removed mid-pass affect
//!   the in-flight reverse iteration
//! - **No shared mutable delegation state**: the super reference is a
//!   call-context parameter, exact across chains of any depth
//! - **Thread-safe types**: handles are `Send + Sync`; locks never span a
//!   callback invocation
//!
//! ## Example
//!
//! ```
//! use ripple::{Class, Instance, Listener, Properties, Super, Value};
//!
//! let base = Class::root().extend(Properties::new().method(
//!     "greet",
//!     |_this: &Instance, _sup: &Super, _args: &[Value]| Ok(Value::from("World")),
//! ));
//! let class = base.extend(Properties::new().delegating(
//!     "greet",
//!     |this: &Instance, sup: &Super, args: &[Value]| {
//!         let inner = sup.call(this, args)?;
//!         Ok(Value::from(format!("Hi {}!", inner.as_str().unwrap_or_default())))
//!     },
//! ));
//!
//! let instance = class.construct(&[])?;
//! assert_eq!(instance.call("greet", &[])?, Value::from("Hi World!"));
//!
//! instance.on(
//!     "ready",
//!     Listener::new(|event, _args| {
//!         assert_eq!(event.kind(), "ready");
//!         Ok(())
//!     }),
//! )?;
//! assert!(instance.emit("ready", &[])?);
//! # Ok::<(), ripple::RuntimeError>(())
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod class;
pub mod emitter;
pub mod error;
pub mod event;
pub mod instance;
pub mod value;

pub use class::{BoundMethod, Class, Properties, Super};
pub use emitter::{Listener, DEFAULT_MAX_LISTENERS, NEW_LISTENER, REMOVE_LISTENER};
pub use error::{RuntimeError, RuntimeResult};
pub use event::Event;
pub use instance::Instance;
pub use value::Value;
