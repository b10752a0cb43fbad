//! Bridge context
//!
//! [`Bridge`] owns the realm, the handle table, the guest memory and the
//! guest function table. Every boundary operation is a method on it; they
//! are split by concern across the submodules:
//!
//! - `values`: construction, extraction and kind predicates
//! - `compare`: truthiness, ordering, equality, `instanceof`, `has`
//! - `props`: `get`, `set`, `push`
//! - `invoke`: `construct_new`, `func_call`, `obj_call`, `make_callback`
//!
//! ## Re-entrancy
//!
//! Host calls may run guest callbacks, which issue boundary calls of their
//! own. The table lives in a `RefCell` and is only ever borrowed for the
//! duration of a single lookup or insert, never across a host call.

mod compare;
mod invoke;
mod props;
mod values;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use otter_bridge_host::{ErrorKind, HostResult, Realm, Value};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::guest::GuestFunctionTable;
use crate::handle::Handle;
use crate::memory::GuestMemory;
use crate::normalize::{normalize, normalize_host_error};
use crate::table::{HandleTable, TableSnapshot};

/// Identifier reported by [`Bridge::target`]
pub const BRIDGE_TARGET: i32 = 1041;

pub(crate) struct BridgeInner {
    realm: Realm,
    table: RefCell<HandleTable>,
    memory: RefCell<Box<dyn GuestMemory>>,
    functions: Box<dyn GuestFunctionTable>,
    config: BridgeConfig,
    callback_depth: Cell<usize>,
}

/// Guest ↔ host value bridge
///
/// Cloning is cheap and yields another reference to the same context.
#[derive(Clone)]
pub struct Bridge {
    inner: Rc<BridgeInner>,
}

impl Bridge {
    /// Create a bridge with default config
    pub fn new(
        memory: impl GuestMemory + 'static,
        functions: impl GuestFunctionTable + 'static,
    ) -> Self {
        Self::with_config(BridgeConfig::default(), memory, functions)
    }

    /// Create a bridge with custom config
    pub fn with_config(
        config: BridgeConfig,
        memory: impl GuestMemory + 'static,
        functions: impl GuestFunctionTable + 'static,
    ) -> Self {
        let realm = Realm::new();
        let mut table = HandleTable::with_reserved(&realm, &config.reserved_symbol_description);
        table.set_trace_operations(config.log_table_operations);
        debug!(
            max_callback_depth = config.max_callback_depth,
            functions = functions.len(),
            "bridge created"
        );
        Self {
            inner: Rc::new(BridgeInner {
                realm,
                table: RefCell::new(table),
                memory: RefCell::new(Box::new(memory)),
                functions: Box::new(functions),
                config,
                callback_depth: Cell::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<BridgeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<BridgeInner> {
        Rc::downgrade(&self.inner)
    }

    /// The host realm
    pub fn realm(&self) -> &Realm {
        &self.inner.realm
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Current callback nesting depth
    pub fn callback_depth(&self) -> usize {
        self.inner.callback_depth.get()
    }

    /// `target()`: identifies this bridge flavour to the guest
    pub fn target(&self) -> i32 {
        BRIDGE_TARGET
    }

    // -----------------------------------------------------------------------
    // Handle table service
    // -----------------------------------------------------------------------

    /// Obtain or create the handle for a host value
    pub fn intern(&self, value: Value) -> Handle {
        self.inner.table.borrow_mut().intern(value)
    }

    /// The value behind a handle, if live
    pub fn resolve(&self, handle: Handle) -> Option<Value> {
        self.inner.table.borrow().resolve(handle)
    }

    /// Reference count of a handle, if live
    pub fn ref_count(&self, handle: Handle) -> Option<u32> {
        self.inner.table.borrow().ref_count(handle)
    }

    /// Number of live handles
    pub fn table_len(&self) -> usize {
        self.inner.table.borrow().len()
    }

    /// `inc_ref(h)`
    pub fn inc_ref(&self, handle: Handle) {
        self.inner.table.borrow_mut().inc_ref(handle);
    }

    /// `dec_ref(h)`: false for reserved or unknown handles
    pub fn dec_ref(&self, handle: Handle) -> bool {
        self.inner.table.borrow_mut().dec_ref(handle)
    }

    /// `reset_object_map()`: drop every non-reserved handle
    ///
    /// Bypasses reference counting; handles the guest still holds become
    /// dangling. Returns the number of entries removed.
    pub fn reset_object_map(&self) -> usize {
        self.inner.table.borrow_mut().reset_unchecked()
    }

    /// `print_object_map()`: log every live entry and return the dump
    pub fn print_object_map(&self) -> TableSnapshot {
        let snapshot = self.inner.table.borrow().snapshot();
        info!(target: "otter::bridge", live = snapshot.len, "object map");
        for entry in &snapshot.entries {
            info!(
                target: "otter::bridge",
                handle = entry.handle.0,
                refs = entry.refs,
                kind = entry.kind,
                "{}",
                entry.preview
            );
        }
        snapshot
    }

    /// Run `f` against the guest memory
    pub fn with_memory<R>(&self, f: impl FnOnce(&mut dyn GuestMemory) -> R) -> R {
        let mut memory = self.inner.memory.borrow_mut();
        f(&mut **memory)
    }

    /// `throw(h)`: the fault a guest raises to unwind with a host value
    pub fn throw(&self, handle: Handle) -> BridgeError {
        BridgeError::Thrown(handle)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Resolve a handle, treating unknown handles as `undefined`
    pub(crate) fn value(&self, handle: Handle) -> Value {
        self.resolve(handle).unwrap_or_default()
    }

    /// Intern the outcome of a host call, normalizing faults into error values
    pub(crate) fn settle(&self, result: HostResult<Value>) -> Handle {
        let value = match result {
            Ok(v) => v,
            Err(e) => normalize_host_error(self.realm(), e),
        };
        self.intern(value)
    }

    /// Swallow a host fault where the boundary signature has no error channel
    pub(crate) fn or_fallback<T>(&self, op: &'static str, result: HostResult<T>, fallback: T) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                warn!(op, error = %e, "host fault swallowed at boundary");
                fallback
            }
        }
    }

    /// The host value a guest-side fault stands for
    pub(crate) fn error_value(&self, err: BridgeError) -> Value {
        let realm = self.realm();
        let message = err.to_string();
        match err {
            BridgeError::Thrown(handle) => normalize(realm, self.value(handle)),
            BridgeError::Host(e) => normalize_host_error(realm, e),
            BridgeError::InvalidFunctionIndex { .. } => {
                Value::Object(realm.new_error(ErrorKind::RangeError, &message))
            }
            _ => Value::Object(realm.new_error(ErrorKind::Error, &message)),
        }
    }

    pub(crate) fn functions(&self) -> &dyn GuestFunctionTable {
        self.inner.functions.as_ref()
    }

    pub(crate) fn depth_cell(&self) -> &Cell<usize> {
        &self.inner.callback_depth
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("table", &*self.inner.table.borrow())
            .field("config", &self.inner.config)
            .finish()
    }
}
