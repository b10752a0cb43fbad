//! # Otter Bridge Host
//!
//! The host side of the Otter guest bridge: a single-threaded dynamic object
//! graph with ECMAScript semantics. Guests never see these values directly;
//! the `otter-bridge` crate hands out integer handles for them.
//!
//! ## Design Principles
//!
//! - **Single-threaded**: values are `Rc`-shared and `!Send`; host and guest
//!   alternate strictly on one thread
//! - **Tagged values**: [`Value`] is a plain enum, composites live behind
//!   [`JsObject`] references with pointer identity
//! - **Native functions**: every callable is a Rust closure, so guest
//!   callbacks and built-ins share one representation

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod console;
pub mod error;
pub mod number;
pub mod object;
pub mod ops;
pub mod realm;
pub mod value;

pub use console::{ConsoleLevel, inspect, set_console_handler};
pub use error::{HostError, HostResult};
pub use object::{ArrayElements, JsObject, NativeFn, ObjectKind, PropertyKey};
pub use realm::{ErrorKind, Realm};
pub use value::{IdentityKey, Symbol, Value};
