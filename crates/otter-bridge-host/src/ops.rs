//! Host-native operations
//!
//! Coercions, property access, invocation and the comparison/equality
//! algorithms, following the ECMAScript abstract operations closely enough
//! that guest code observes ordinary host behaviour.

use std::cmp::Ordering;
use std::rc::Rc;

use num_traits::{ToPrimitive, Zero};

use crate::error::{HostError, HostResult};
use crate::number::{compare_bigint_number, number_to_string, string_to_bigint, string_to_number};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

/// Preferred type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// No preference (treated as number)
    Default,
    /// Prefer `valueOf`
    Number,
    /// Prefer `toString`
    String,
}

/// Relational operator selector for [`compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOp {
    /// `a < b`
    Lt,
    /// `a <= b`
    Lte,
    /// `a > b`
    Gt,
    /// `a >= b`
    Gte,
}

/// Short rendering of a value for error messages
pub fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Symbol(s) => s.descriptive_string(),
        other => format!("{:?}", other),
    }
}

/// ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(n.is_nan() || *n == 0.0),
        Value::BigInt(b) => !b.is_zero(),
        Value::String(s) => !s.is_empty(),
        Value::Symbol(_) | Value::Object(_) => true,
    }
}

/// ToPrimitive via the ordinary `valueOf`/`toString` protocol
pub fn to_primitive(realm: &Realm, value: &Value, hint: Hint) -> HostResult<Value> {
    let Value::Object(obj) = value else {
        return Ok(value.clone());
    };
    let order = match hint {
        Hint::String => ["toString", "valueOf"],
        Hint::Number | Hint::Default => ["valueOf", "toString"],
    };
    for name in order {
        let method = get(realm, value, &PropertyKey::from(name))?;
        if method.is_callable() {
            let result = call(realm, &method, value, &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(HostError::type_error(format!(
        "Cannot convert object to primitive value ({:?})",
        obj
    )))
}

/// ToNumber
pub fn to_number(realm: &Realm, value: &Value) -> HostResult<f64> {
    match value {
        Value::Undefined => Ok(f64::NAN),
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => Ok(string_to_number(s)),
        Value::BigInt(_) => Err(HostError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
        Value::Symbol(_) => Err(HostError::type_error(
            "Cannot convert a Symbol value to a number",
        )),
        Value::Object(_) => {
            let prim = to_primitive(realm, value, Hint::Number)?;
            to_number(realm, &prim)
        }
    }
}

/// ToNumeric: a `Number` or a `BigInt`
pub fn to_numeric(realm: &Realm, value: &Value) -> HostResult<Value> {
    let prim = to_primitive(realm, value, Hint::Number)?;
    if let Value::BigInt(_) = prim {
        return Ok(prim);
    }
    Ok(Value::Number(to_number(realm, &prim)?))
}

/// The `Number(value)` conversion, which also accepts BigInts
pub fn number_conversion(realm: &Realm, value: &Value) -> HostResult<f64> {
    match to_numeric(realm, value)? {
        Value::BigInt(b) => Ok(b.to_f64().unwrap_or(f64::NAN)),
        Value::Number(n) => Ok(n),
        _ => Ok(f64::NAN),
    }
}

/// ToString
pub fn to_string(realm: &Realm, value: &Value) -> HostResult<Rc<str>> {
    match value {
        Value::Undefined => Ok(Rc::from("undefined")),
        Value::Null => Ok(Rc::from("null")),
        Value::Boolean(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
        Value::Number(n) => Ok(Rc::from(number_to_string(*n))),
        Value::BigInt(b) => Ok(Rc::from(b.to_string())),
        Value::String(s) => Ok(s.clone()),
        Value::Symbol(_) => Err(HostError::type_error(
            "Cannot convert a Symbol value to a string",
        )),
        Value::Object(_) => {
            let prim = to_primitive(realm, value, Hint::String)?;
            to_string(realm, &prim)
        }
    }
}

/// The `String(value)` conversion, which renders symbols descriptively
pub fn string_conversion(realm: &Realm, value: &Value) -> HostResult<Rc<str>> {
    match value {
        Value::Symbol(s) => Ok(Rc::from(s.descriptive_string())),
        other => to_string(realm, other),
    }
}

/// ToPropertyKey
pub fn to_property_key(realm: &Realm, value: &Value) -> HostResult<PropertyKey> {
    match to_primitive(realm, value, Hint::String)? {
        Value::Symbol(s) => Ok(PropertyKey::Symbol(s)),
        prim => Ok(PropertyKey::String(to_string(realm, &prim)?)),
    }
}

/// ToObject
pub fn to_object(realm: &Realm, value: &Value) -> HostResult<JsObject> {
    let intrinsics = realm.intrinsics();
    let (kind, prototype) = match value {
        Value::Undefined | Value::Null => {
            return Err(HostError::type_error(format!(
                "Cannot convert {:?} to object",
                value
            )));
        }
        Value::Object(o) => return Ok(o.clone()),
        Value::Boolean(b) => (ObjectKind::Boolean(*b), &intrinsics.boolean_prototype),
        Value::Number(n) => (ObjectKind::Number(*n), &intrinsics.number_prototype),
        Value::String(s) => (ObjectKind::String(s.clone()), &intrinsics.string_prototype),
        Value::Symbol(s) => (ObjectKind::Symbol(s.clone()), &intrinsics.symbol_prototype),
        Value::BigInt(b) => (ObjectKind::BigInt(b.clone()), &intrinsics.bigint_prototype),
    };
    Ok(JsObject::new(kind, Some(prototype.clone())))
}

/// Look a key up along an object's prototype chain
pub fn get_from_object(obj: &JsObject, key: &PropertyKey) -> Value {
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        if let Some(v) = o.get_own(key) {
            return v;
        }
        current = o.prototype();
    }
    Value::Undefined
}

fn primitive_string_slot(s: &str, key: &PropertyKey) -> Option<Value> {
    if key.as_str() == Some("length") {
        return Some(Value::Number(s.encode_utf16().count() as f64));
    }
    let index = key.array_index()?;
    s.encode_utf16()
        .nth(index)
        .map(|unit| Value::from(String::from_utf16_lossy(&[unit])))
}

/// `target[key]`
pub fn get(realm: &Realm, target: &Value, key: &PropertyKey) -> HostResult<Value> {
    match target {
        Value::Object(o) => Ok(get_from_object(o, key)),
        Value::Undefined | Value::Null => Err(HostError::type_error(format!(
            "Cannot read properties of {:?} (reading '{}')",
            target, key
        ))),
        Value::String(s) => match primitive_string_slot(s, key) {
            Some(v) => Ok(v),
            None => Ok(get_from_object(&realm.intrinsics().string_prototype, key)),
        },
        primitive => {
            let proto = realm.prototype_of_primitive(primitive);
            Ok(proto.map_or(Value::Undefined, |p| get_from_object(&p, key)))
        }
    }
}

/// `target[key] = value`
///
/// Writes to primitive receivers are silently dropped, writes to
/// `null`/`undefined` throw.
pub fn set(_realm: &Realm, target: &Value, key: PropertyKey, value: Value) -> HostResult<()> {
    match target {
        Value::Object(o) => o.set_own(key, value),
        Value::Undefined | Value::Null => Err(HostError::type_error(format!(
            "Cannot set properties of {:?} (setting '{}')",
            target, key
        ))),
        _ => Ok(()),
    }
}

/// HasProperty (the `in` operator)
pub fn has_property(_realm: &Realm, target: &Value, key: &PropertyKey) -> HostResult<bool> {
    let Value::Object(obj) = target else {
        return Err(HostError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key,
            describe(target)
        )));
    };
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        if o.has_own(key) {
            return Ok(true);
        }
        current = o.prototype();
    }
    Ok(false)
}

/// `Object.prototype.hasOwnProperty.call(target, key)`
pub fn has_own_property(realm: &Realm, target: &Value, key: &PropertyKey) -> HostResult<bool> {
    if let Value::String(s) = target {
        return Ok(primitive_string_slot(s, key).is_some());
    }
    Ok(to_object(realm, target)?.has_own(key))
}

/// `[[Call]]`
pub fn call(realm: &Realm, func: &Value, this: &Value, args: &[Value]) -> HostResult<Value> {
    match func.as_object().and_then(JsObject::call_behavior) {
        Some(behavior) => behavior(realm, this, args),
        None => Err(HostError::type_error(format!(
            "{} is not a function",
            describe(func)
        ))),
    }
}

/// `[[Construct]]`
pub fn construct(realm: &Realm, ctor: &Value, args: &[Value]) -> HostResult<Value> {
    match ctor.as_object().and_then(JsObject::construct_behavior) {
        Some(behavior) => behavior(realm, args),
        None => Err(HostError::type_error(format!(
            "{} is not a constructor",
            describe(ctor)
        ))),
    }
}

/// `target[key](...args)` with `target` as receiver
pub fn invoke(realm: &Realm, target: &Value, key: &PropertyKey, args: &[Value]) -> HostResult<Value> {
    let method = get(realm, target, key)?;
    if !method.is_callable() {
        return Err(HostError::type_error(format!(
            "{}.{} is not a function",
            describe(target),
            key
        )));
    }
    call(realm, &method, target, args)
}

/// IsStrictlyEqual (`===`)
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

fn same_type(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// IsLooselyEqual (`==`)
pub fn loose_equals(realm: &Realm, a: &Value, b: &Value) -> HostResult<bool> {
    if same_type(a, b) {
        return Ok(strict_equals(a, b));
    }
    match (a, b) {
        (x, y) if x.is_nullish() && y.is_nullish() => Ok(true),
        (Value::Number(x), Value::String(y)) => Ok(*x == string_to_number(y)),
        (Value::String(x), Value::Number(y)) => Ok(string_to_number(x) == *y),
        (Value::BigInt(x), Value::String(y)) | (Value::String(y), Value::BigInt(x)) => {
            Ok(string_to_bigint(y).is_some_and(|n| **x == n))
        }
        (Value::Boolean(x), y) => loose_equals(realm, &Value::Number(bool_to_f64(*x)), y),
        (x, Value::Boolean(y)) => loose_equals(realm, x, &Value::Number(bool_to_f64(*y))),
        (
            Value::Number(_) | Value::String(_) | Value::BigInt(_) | Value::Symbol(_),
            Value::Object(_),
        ) => {
            let prim = to_primitive(realm, b, Hint::Default)?;
            loose_equals(realm, a, &prim)
        }
        (
            Value::Object(_),
            Value::Number(_) | Value::String(_) | Value::BigInt(_) | Value::Symbol(_),
        ) => {
            let prim = to_primitive(realm, a, Hint::Default)?;
            loose_equals(realm, &prim, b)
        }
        (Value::BigInt(x), Value::Number(y)) | (Value::Number(y), Value::BigInt(x)) => {
            Ok(compare_bigint_number(x, *y) == Some(Ordering::Equal))
        }
        _ => Ok(false),
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::BigInt(x), Value::BigInt(y)) => Some(x.cmp(y)),
        (Value::BigInt(x), Value::Number(y)) => compare_bigint_number(x, *y),
        (Value::Number(x), Value::BigInt(y)) => {
            compare_bigint_number(y, *x).map(Ordering::reverse)
        }
        _ => None,
    }
}

/// IsLessThan: `None` stands for the algorithm's `undefined` result
pub fn less_than(realm: &Realm, a: &Value, b: &Value, left_first: bool) -> HostResult<Option<bool>> {
    let (px, py) = if left_first {
        let px = to_primitive(realm, a, Hint::Number)?;
        let py = to_primitive(realm, b, Hint::Number)?;
        (px, py)
    } else {
        let py = to_primitive(realm, b, Hint::Number)?;
        let px = to_primitive(realm, a, Hint::Number)?;
        (px, py)
    };

    match (&px, &py) {
        (Value::String(x), Value::String(y)) => {
            return Ok(Some(x.encode_utf16().lt(y.encode_utf16())));
        }
        (Value::BigInt(x), Value::String(y)) => {
            return Ok(string_to_bigint(y).map(|ny| **x < ny));
        }
        (Value::String(x), Value::BigInt(y)) => {
            return Ok(string_to_bigint(x).map(|nx| nx < **y));
        }
        _ => {}
    }

    let nx = to_numeric(realm, &px)?;
    let ny = to_numeric(realm, &py)?;
    Ok(compare_numeric(&nx, &ny).map(|o| o == Ordering::Less))
}

/// Relational comparison operators
pub fn compare(realm: &Realm, a: &Value, b: &Value, op: RelationalOp) -> HostResult<bool> {
    Ok(match op {
        RelationalOp::Lt => less_than(realm, a, b, true)? == Some(true),
        RelationalOp::Gt => less_than(realm, b, a, false)? == Some(true),
        RelationalOp::Lte => less_than(realm, b, a, false)? == Some(false),
        RelationalOp::Gte => less_than(realm, a, b, true)? == Some(false),
    })
}

/// `value instanceof target`
pub fn instance_of(realm: &Realm, value: &Value, target: &Value) -> HostResult<bool> {
    let Value::Object(ctor) = target else {
        return Err(HostError::type_error(
            "Right-hand side of 'instanceof' is not an object",
        ));
    };
    if !ctor.is_callable() {
        return Err(HostError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    }
    let Value::Object(obj) = value else {
        return Ok(false);
    };
    let Value::Object(proto) = get(realm, target, &PropertyKey::from("prototype"))? else {
        return Err(HostError::type_error(
            "Function has non-object prototype in instanceof check",
        ));
    };
    let mut current = obj.prototype();
    while let Some(p) = current {
        if p.ptr_eq(&proto) {
            return Ok(true);
        }
        current = p.prototype();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(!to_boolean(&Value::Undefined));
        assert!(!to_boolean(&Value::Number(f64::NAN)));
        assert!(!to_boolean(&Value::from("")));
        assert!(!to_boolean(&Value::bigint(0)));
        assert!(to_boolean(&Value::from("0")));
        assert!(to_boolean(&Value::Number(-1.0)));
    }

    #[test]
    fn test_strict_equals() {
        assert!(strict_equals(&Value::from(1), &Value::Number(1.0)));
        assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(strict_equals(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!strict_equals(&Value::from("1"), &Value::from(1)));
        assert!(!strict_equals(&Value::Null, &Value::Undefined));
    }
}
