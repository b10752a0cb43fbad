//! Value construction, extraction and kind predicates

use otter_bridge_host::{JsObject, Value, ops};

use super::Bridge;
use crate::error::BridgeResult;
use crate::handle::Handle;
use crate::marshal;
use crate::memory::{GuestPtr, alloc_bytes};

impl Bridge {
    /// `new_array()`: `[]`
    pub fn new_array(&self) -> Handle {
        let arr = self.realm().new_array(Vec::new());
        self.intern(Value::Object(arr))
    }

    /// `new_object()`: `{}`
    pub fn new_object(&self) -> Handle {
        let obj = self.realm().new_object();
        self.intern(Value::Object(obj))
    }

    /// `make_bool(b)`
    pub fn make_bool(&self, value: bool) -> Handle {
        self.intern(Value::Boolean(value))
    }

    /// `make_int(i)`: exact 32-bit signed number
    pub fn make_int(&self, value: i32) -> Handle {
        self.intern(Value::from(value))
    }

    /// `make_uint(u)`: exact 32-bit unsigned number
    pub fn make_uint(&self, value: u32) -> Handle {
        self.intern(Value::from(value))
    }

    /// `make_bigint(i)`: 64-bit signed BigInt
    pub fn make_bigint(&self, value: i64) -> Handle {
        self.intern(Value::bigint(value))
    }

    /// `make_biguint(u)`: 64-bit unsigned BigInt in `[0, 2^64 - 1]`
    pub fn make_biguint(&self, value: u64) -> Handle {
        // the guest ABI passes u64 through a signed 64-bit slot
        let wide = marshal::biguint_from_carrier(value as i64);
        self.intern(Value::bigint(wide))
    }

    /// `make_double(d)`
    pub fn make_double(&self, value: f64) -> Handle {
        self.intern(Value::Number(value))
    }

    /// `make_str(ptr, len)`: UTF-8 span, stopping at an embedded NUL
    pub fn make_str(&self, bytes: &[u8]) -> Handle {
        self.intern(Value::from(marshal::decode_utf8(bytes)))
    }

    /// `make_str_utf16(ptr, len)`: UTF-16 span, stopping at an embedded NUL
    pub fn make_str_utf16(&self, units: &[u16]) -> Handle {
        self.intern(Value::from(marshal::decode_utf16(units)))
    }

    /// `get_value_int(h)`
    pub fn get_value_int(&self, handle: Handle) -> i32 {
        let value = self.value(handle);
        let result = marshal::value_to_i32(self.realm(), &value);
        self.or_fallback("get_value_int", result, 0)
    }

    /// `get_value_uint(h)`
    pub fn get_value_uint(&self, handle: Handle) -> u32 {
        let value = self.value(handle);
        let result = marshal::value_to_u32(self.realm(), &value);
        self.or_fallback("get_value_uint", result, 0)
    }

    /// `get_value_bigint(h)`
    pub fn get_value_bigint(&self, handle: Handle) -> i64 {
        let value = self.value(handle);
        let result = marshal::value_to_i64(self.realm(), &value);
        self.or_fallback("get_value_bigint", result, 0)
    }

    /// `get_value_biguint(h)`: negatives clamp to 0
    pub fn get_value_biguint(&self, handle: Handle) -> u64 {
        let value = self.value(handle);
        let result = marshal::value_to_u64(self.realm(), &value);
        self.or_fallback("get_value_biguint", result, 0)
    }

    /// `get_value_double(h)`
    pub fn get_value_double(&self, handle: Handle) -> f64 {
        let value = self.value(handle);
        let result = marshal::value_to_f64(self.realm(), &value);
        self.or_fallback("get_value_double", result, f64::NAN)
    }

    /// `get_value_bool(h)`: host truthiness
    pub fn get_value_bool(&self, handle: Handle) -> bool {
        ops::to_boolean(&self.value(handle))
    }

    /// `get_value_string(h)`: NUL-terminated UTF-8 copy in guest memory
    ///
    /// Returns [`GuestPtr::NULL`] when the value is not a string primitive.
    /// The empty string still gets a buffer holding just the terminator, so
    /// null always means "not a string".
    pub fn get_value_string(&self, handle: Handle) -> BridgeResult<GuestPtr> {
        match self.value(handle) {
            Value::String(s) => self.write_guest(&marshal::encode_utf8_nul(&s)),
            _ => Ok(GuestPtr::NULL),
        }
    }

    /// `get_value_string_utf16(h)`: NUL-terminated UTF-16LE copy in guest memory
    ///
    /// Null only for non-strings, as for [`Bridge::get_value_string`].
    pub fn get_value_string_utf16(&self, handle: Handle) -> BridgeResult<GuestPtr> {
        match self.value(handle) {
            Value::String(s) => self.write_guest(&marshal::encode_utf16_nul(&s)),
            _ => Ok(GuestPtr::NULL),
        }
    }

    /// `typeof(h)`: the type tag as a NUL-terminated UTF-8 string in guest memory
    pub fn type_of(&self, handle: Handle) -> BridgeResult<GuestPtr> {
        let tag = self.value(handle).type_of();
        self.write_guest(&marshal::encode_utf8_nul(tag))
    }

    fn write_guest(&self, bytes: &[u8]) -> BridgeResult<GuestPtr> {
        Ok(self.with_memory(|memory| alloc_bytes(memory, bytes))?)
    }

    /// `is_string(h)`: string primitives and `String` wrappers
    pub fn is_string(&self, handle: Handle) -> bool {
        self.is_kind(handle, |v| matches!(v, Value::String(_)))
    }

    /// `is_number(h)`: number primitives and `Number` wrappers
    pub fn is_number(&self, handle: Handle) -> bool {
        self.is_kind(handle, |v| matches!(v, Value::Number(_)))
    }

    /// `is_bool(h)`: boolean primitives and `Boolean` wrappers
    pub fn is_bool(&self, handle: Handle) -> bool {
        self.is_kind(handle, |v| matches!(v, Value::Boolean(_)))
    }

    fn is_kind(&self, handle: Handle, primitive: fn(&Value) -> bool) -> bool {
        let value = self.value(handle);
        if primitive(&value) {
            return true;
        }
        value
            .as_object()
            .and_then(JsObject::primitive_value)
            .is_some_and(|inner| primitive(&inner))
    }

    /// `not(h)`: `!value`
    pub fn not(&self, handle: Handle) -> bool {
        !ops::to_boolean(&self.value(handle))
    }
}
