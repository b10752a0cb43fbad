//! Property access

use otter_bridge_host::{PropertyKey, ops};

use super::Bridge;
use crate::handle::Handle;
use crate::marshal;

impl Bridge {
    /// `get(container, key)`: `container[key]`
    ///
    /// A missing property yields the reserved `undefined` handle. A host
    /// fault (reading from `null`, a throwing key conversion) is normalized
    /// and its error handle returned, as for calls.
    pub fn get(&self, container: Handle, key: Handle) -> Handle {
        let (target, key) = (self.value(container), self.value(key));
        let realm = self.realm();
        let result = ops::to_property_key(realm, &key).and_then(|key| ops::get(realm, &target, &key));
        self.settle(result)
    }

    /// `set(container, key, value)`: `container[key] = value`
    ///
    /// Returns `false` when the host rejects the write; the fault itself is
    /// logged, not propagated.
    pub fn set(&self, container: Handle, key: Handle, value: Handle) -> bool {
        let (target, key, value) = (self.value(container), self.value(key), self.value(value));
        let realm = self.realm();
        let result = ops::to_property_key(realm, &key)
            .and_then(|key| ops::set(realm, &target, key, value))
            .map(|()| true);
        self.or_fallback("set", result, false)
    }

    /// `push(arr, v)`: append the handle `v` itself, not its value
    ///
    /// Silently does nothing if the container has no usable `push`.
    pub fn push(&self, array: Handle, value: Handle) {
        let target = self.value(array);
        let result = ops::invoke(
            self.realm(),
            &target,
            &PropertyKey::from("push"),
            &[marshal::handle_to_value(value)],
        );
        if let Err(e) = result {
            tracing::trace!(array = array.0, error = %e, "push ignored");
        }
    }
}
