//! Comparison, equality and membership tests
//!
//! None of these have an error channel: a host fault while coercing the
//! operands (a throwing `valueOf`, a symbol in a relational comparison, a
//! non-callable `instanceof` target) is logged and answered with `false`.

use otter_bridge_host::ops::{self, RelationalOp};
use otter_bridge_host::PropertyKey;

use super::Bridge;
use crate::handle::Handle;
use crate::marshal;

impl Bridge {
    fn relational(&self, op_name: &'static str, a: Handle, b: Handle, op: RelationalOp) -> bool {
        let (a, b) = (self.value(a), self.value(b));
        let result = ops::compare(self.realm(), &a, &b, op);
        self.or_fallback(op_name, result, false)
    }

    /// `gt(a, b)`: `a > b`
    pub fn gt(&self, a: Handle, b: Handle) -> bool {
        self.relational("gt", a, b, RelationalOp::Gt)
    }

    /// `gte(a, b)`: `a >= b`
    pub fn gte(&self, a: Handle, b: Handle) -> bool {
        self.relational("gte", a, b, RelationalOp::Gte)
    }

    /// `lt(a, b)`: `a < b`
    pub fn lt(&self, a: Handle, b: Handle) -> bool {
        self.relational("lt", a, b, RelationalOp::Lt)
    }

    /// `lte(a, b)`: `a <= b`
    pub fn lte(&self, a: Handle, b: Handle) -> bool {
        self.relational("lte", a, b, RelationalOp::Lte)
    }

    /// `equals(a, b)`: `a == b`
    pub fn equals(&self, a: Handle, b: Handle) -> bool {
        let (a, b) = (self.value(a), self.value(b));
        let result = ops::loose_equals(self.realm(), &a, &b);
        self.or_fallback("equals", result, false)
    }

    /// `strictly_equals(a, b)`: `a === b`
    pub fn strictly_equals(&self, a: Handle, b: Handle) -> bool {
        ops::strict_equals(&self.value(a), &self.value(b))
    }

    /// `instanceof(a, b)`: `a instanceof b`
    pub fn instance_of(&self, a: Handle, b: Handle) -> bool {
        let (a, b) = (self.value(a), self.value(b));
        let result = ops::instance_of(self.realm(), &a, &b);
        self.or_fallback("instanceof", result, false)
    }

    /// `has(container, key)`: `key in container`, including inherited keys
    ///
    /// Never throws; any host fault answers `false`.
    pub fn has(&self, container: Handle, key: Handle) -> bool {
        let (container, key) = (self.value(container), self.value(key));
        let realm = self.realm();
        ops::to_property_key(realm, &key)
            .and_then(|key| ops::has_property(realm, &container, &key))
            .unwrap_or(false)
    }

    /// `obj_has_own_prop(obj, name, len)`: own properties only
    pub fn obj_has_own_prop(&self, obj: Handle, name: &[u8]) -> bool {
        let target = self.value(obj);
        let key = PropertyKey::from(marshal::decode_utf8(name).as_str());
        let result = ops::has_own_property(self.realm(), &target, &key);
        self.or_fallback("obj_has_own_prop", result, false)
    }
}
