//! # Otter Bridge
//!
//! Lets a sandboxed guest module drive the Otter host object graph through
//! small integer handles. The guest never touches host values directly: it
//! creates them, calls them, reads and writes their properties and compares
//! them by handle, and registers callbacks the host can invoke later.
//!
//! ## Layers
//!
//! - [`HandleTable`]: reference-counted, identity-interning handle ↔ value
//!   store with seven reserved handles
//! - [`Bridge`]: the boundary operations, each resolving handles, running
//!   the host-native operation and interning the result
//! - [`marshal`]: numeric widening/narrowing, string transcoding and
//!   argument-array unpacking
//!
//! Host faults never escape a boundary call. They are normalized into error
//! objects ([`normalize`]) and handed back as ordinary handles, or answered
//! with a `false`/zero fallback where the signature has no room for a
//! handle.
//!
//! ## Example
//!
//! ```ignore
//! use otter_bridge::{Bridge, FunctionTable, LinearMemory};
//!
//! let bridge = Bridge::new(LinearMemory::default(), FunctionTable::new());
//! let args = bridge.new_array();
//! bridge.push(args, bridge.make_str(b"hello"));
//! let log = bridge.obj_call(otter_bridge::Handle::CONSOLE, b"log", args);
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod guest;
pub mod handle;
pub mod marshal;
pub mod memory;
pub mod normalize;
pub mod table;

pub use bridge::{BRIDGE_TARGET, Bridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use guest::{FunctionTable, GuestFunctionTable};
pub use handle::Handle;
pub use memory::{GuestMemory, GuestPtr, LinearMemory, MemoryError};
pub use table::{EntrySnapshot, HandleTable, TableSnapshot};

pub use otter_bridge_host as host;
