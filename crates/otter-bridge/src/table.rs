//! Handle table
//!
//! The authoritative handle ↔ value store. Two maps are kept in lockstep:
//!
//! - forward: `Handle -> Entry { value, refs }`
//! - reverse: `IdentityKey -> Handle`, so interning a value that is already
//!   present hands back the same handle instead of a duplicate entry
//!
//! Identity follows SameValueZero: primitives by value, strings by content,
//! objects and symbols by reference. Both maps are private and only change
//! through [`HandleTable::intern`], [`HandleTable::dec_ref`] and
//! [`HandleTable::reset_unchecked`].

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use otter_bridge_host::{IdentityKey, Realm, Symbol, Value, inspect};

use crate::handle::Handle;

/// A live table entry
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    refs: u32,
}

/// Reference-counted, identity-interning handle store
pub struct HandleTable {
    entries: FxHashMap<Handle, Entry>,
    reverse: FxHashMap<IdentityKey, Handle>,
    next: u32,
    trace_operations: bool,
}

impl HandleTable {
    /// Table holding the seven reserved values of `realm`
    ///
    /// Handles are assigned in order: `null`, `undefined`, `false`, `true`,
    /// the global object, the console and a fresh sentinel symbol.
    pub fn with_reserved(realm: &Realm, reserved_symbol: &str) -> Self {
        let mut table = Self {
            entries: FxHashMap::default(),
            reverse: FxHashMap::default(),
            next: 0,
            trace_operations: false,
        };
        let reserved = [
            Value::Null,
            Value::Undefined,
            Value::Boolean(false),
            Value::Boolean(true),
            Value::Object(realm.global().clone()),
            Value::Object(realm.console().clone()),
            Value::Symbol(Symbol::new(Some(reserved_symbol))),
        ];
        for value in reserved {
            table.intern(value);
        }
        debug_assert_eq!(table.next, Handle::LAST_RESERVED.0 + 1);
        debug!(reserved = table.entries.len(), "handle table initialized");
        table
    }

    /// Emit a `trace` event for every intern and release
    pub fn set_trace_operations(&mut self, enabled: bool) {
        self.trace_operations = enabled;
    }

    fn allocate(&mut self) -> Handle {
        loop {
            let candidate = Handle(self.next);
            self.next = match self.next.checked_add(1) {
                Some(n) => n,
                None => Handle::LAST_RESERVED.0 + 1,
            };
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Obtain or create the handle for `value`
    ///
    /// An already-interned value gets its reference count bumped; anything
    /// else is stored under the next unused integer with a count of one.
    pub fn intern(&mut self, value: Value) -> Handle {
        let key = value.identity_key();
        if let Some(&handle) = self.reverse.get(&key) {
            if let Some(entry) = self.entries.get_mut(&handle) {
                entry.refs = entry.refs.saturating_add(1);
                if self.trace_operations {
                    trace!(handle = handle.0, refs = entry.refs, "re-interned");
                }
                return handle;
            }
        }

        let handle = self.allocate();
        if self.trace_operations {
            trace!(handle = handle.0, kind = value.type_of(), "interned");
        }
        self.entries.insert(handle, Entry { value, refs: 1 });
        self.reverse.insert(key, handle);
        handle
    }

    /// The value behind `handle`, if it is live
    pub fn resolve(&self, handle: Handle) -> Option<Value> {
        self.entries.get(&handle).map(|e| e.value.clone())
    }

    /// Current reference count of `handle`
    pub fn ref_count(&self, handle: Handle) -> Option<u32> {
        self.entries.get(&handle).map(|e| e.refs)
    }

    /// Add a reference to a live handle; unknown handles are ignored
    pub fn inc_ref(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.get_mut(&handle) {
            entry.refs = entry.refs.saturating_add(1);
        }
    }

    /// Drop a reference, reclaiming the entry when the count reaches zero
    ///
    /// Returns `false` for reserved and unknown handles, which are left
    /// untouched.
    pub fn dec_ref(&mut self, handle: Handle) -> bool {
        if handle.is_reserved() {
            return false;
        }
        let Some(entry) = self.entries.get_mut(&handle) else {
            return false;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            self.reclaim(handle);
        }
        true
    }

    fn reclaim(&mut self, handle: Handle) {
        if let Some(entry) = self.entries.remove(&handle) {
            let key = entry.value.identity_key();
            if self.reverse.get(&key) == Some(&handle) {
                self.reverse.remove(&key);
            }
            if self.trace_operations {
                trace!(handle = handle.0, "reclaimed");
            }
        }
    }

    /// Remove every non-reserved entry regardless of its reference count
    ///
    /// Maintenance operation: any handle above the reserved range that a
    /// guest still holds dangles afterwards. Returns the number of entries
    /// removed.
    pub fn reset_unchecked(&mut self) -> usize {
        let doomed: Vec<Handle> = self
            .entries
            .keys()
            .copied()
            .filter(|h| !h.is_reserved())
            .collect();
        for &handle in &doomed {
            self.reclaim(handle);
        }
        debug!(removed = doomed.len(), remaining = self.entries.len(), "handle table reset");
        doomed.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in ascending handle order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Value, u32)> {
        let mut handles: Vec<Handle> = self.entries.keys().copied().collect();
        handles.sort_unstable();
        handles.into_iter().filter_map(move |h| {
            self.entries.get(&h).map(|e| (h, &e.value, e.refs))
        })
    }

    /// Serializable view of every live entry
    pub fn snapshot(&self) -> TableSnapshot {
        let entries: Vec<EntrySnapshot> = self
            .iter()
            .map(|(handle, value, refs)| EntrySnapshot {
                handle,
                refs,
                kind: value.type_of(),
                preview: inspect(value),
            })
            .collect();
        TableSnapshot {
            len: entries.len(),
            next: self.next,
            entries,
        }
    }
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("len", &self.entries.len())
            .field("next", &self.next)
            .finish()
    }
}

/// Dump of the table for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    /// Number of live entries
    pub len: usize,
    /// Next integer the allocator will try
    pub next: u32,
    /// Entries in handle order
    pub entries: Vec<EntrySnapshot>,
}

/// One live entry
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    /// The handle
    pub handle: Handle,
    /// Reference count
    pub refs: u32,
    /// `typeof` tag of the value
    pub kind: &'static str,
    /// Short rendering of the value
    pub preview: String,
}

impl TableSnapshot {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (Realm, HandleTable) {
        let realm = Realm::new();
        let table = HandleTable::with_reserved(&realm, "_RESERVED_");
        (realm, table)
    }

    #[test]
    fn test_reserved_layout() {
        let (realm, table) = table();
        assert_eq!(table.len(), 7);
        assert!(table.resolve(Handle::NULL).unwrap().is_null());
        assert!(table.resolve(Handle::UNDEFINED).unwrap().is_undefined());
        assert_eq!(table.resolve(Handle::FALSE).unwrap().as_boolean(), Some(false));
        assert_eq!(table.resolve(Handle::TRUE).unwrap().as_boolean(), Some(true));
        let global = table.resolve(Handle::GLOBAL).unwrap();
        assert!(global.as_object().unwrap().ptr_eq(realm.global()));
        assert_eq!(table.resolve(Handle::RESERVED).unwrap().type_of(), "symbol");
    }

    #[test]
    fn test_intern_primitives_by_value() {
        let (_realm, mut table) = table();
        let a = table.intern(Value::from("abc"));
        let b = table.intern(Value::from(String::from("abc")));
        assert_eq!(a, b);
        assert_eq!(table.ref_count(a), Some(2));

        let nan1 = table.intern(Value::Number(f64::NAN));
        let nan2 = table.intern(Value::Number(-f64::NAN));
        assert_eq!(nan1, nan2);

        let zero = table.intern(Value::Number(0.0));
        assert_eq!(table.intern(Value::Number(-0.0)), zero);
    }

    #[test]
    fn test_objects_intern_by_reference() {
        let (realm, mut table) = table();
        let first = table.intern(Value::Object(realm.new_object()));
        let second = table.intern(Value::Object(realm.new_object()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_allocation_is_monotonic() {
        let (_realm, mut table) = table();
        let h = table.intern(Value::from(1.5));
        assert_eq!(h, Handle(7));
        assert!(table.dec_ref(h));
        let next = table.intern(Value::from(2.5));
        assert_eq!(next, Handle(8));
    }

    #[test]
    fn test_snapshot_json() {
        let (_realm, mut table) = table();
        table.intern(Value::from("hello"));
        let snapshot = table.snapshot();
        assert_eq!(snapshot.len, 8);
        assert_eq!(snapshot.entries[7].kind, "string");
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"preview\": \"hello\""));
        assert!(json.contains("\"handle\": 7"));
    }
}
