//! Error normalization
//!
//! Every failure boundary in the bridge turns whatever the host threw into a
//! native error object before handing it to the guest:
//!
//! - native errors pass through unchanged
//! - anything else becomes `new Error(String(thrown))`, with own `name` and
//!   `code` copied over and the thrown value attached as `cause`
//! - if that synthesis itself throws, a fixed generic error is used

use otter_bridge_host::{ErrorKind, HostError, HostResult, JsObject, PropertyKey, Realm, Value, ops};

/// Message of the fallback error
pub const UNKNOWN_EXCEPTION: &str = "unknown host exception";

/// Whether `value` already is a native error (`value instanceof Error`)
pub fn is_native_error(realm: &Realm, value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if obj.is_error() {
        return true;
    }
    let error_ctor = Value::Object(realm.intrinsics().error_constructor.clone());
    ops::instance_of(realm, value, &error_ctor).unwrap_or(false)
}

/// Normalize a thrown value into an error object
pub fn normalize(realm: &Realm, thrown: Value) -> Value {
    if is_native_error(realm, &thrown) {
        return thrown;
    }
    match wrap_thrown(realm, &thrown) {
        Ok(err) => Value::Object(err),
        Err(e) => {
            tracing::debug!(error = %e, "error normalization failed, using generic error");
            Value::Object(realm.new_error(ErrorKind::Error, UNKNOWN_EXCEPTION))
        }
    }
}

/// Normalize a host fault
pub fn normalize_host_error(realm: &Realm, err: HostError) -> Value {
    normalize(realm, realm.error_to_value(err))
}

fn wrap_thrown(realm: &Realm, thrown: &Value) -> HostResult<JsObject> {
    let message = ops::string_conversion(realm, thrown)?;
    let err = realm.new_error(ErrorKind::Error, &message);
    if let Value::Object(source) = thrown {
        for field in ["name", "code"] {
            let key = PropertyKey::from(field);
            if source.has_own(&key) {
                let value = ops::get(realm, thrown, &key)?;
                err.set_own(key, value)?;
            }
        }
    }
    err.set_own(PropertyKey::from("cause"), thrown.clone())?;
    Ok(err)
}
