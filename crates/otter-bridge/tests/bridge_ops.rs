//! Boundary operation tests
//!
//! Construction, extraction, comparison, property access and invocation,
//! all driven through handles the way a guest would.

use std::rc::Rc;

use otter_bridge::host::{HostError, HostResult, PropertyKey, Realm, Value, ops};
use otter_bridge::memory::{read_c_string, read_c_string_utf16};
use otter_bridge::{BRIDGE_TARGET, Bridge, BridgeError, FunctionTable, GuestPtr, Handle, LinearMemory};

fn bridge() -> Bridge {
    Bridge::new(LinearMemory::default(), FunctionTable::new())
}

fn c_string(bridge: &Bridge, ptr: GuestPtr) -> String {
    bridge.with_memory(|m| read_c_string(&*m, ptr)).unwrap()
}

fn type_name(bridge: &Bridge, h: Handle) -> String {
    let ptr = bridge.type_of(h).unwrap();
    c_string(bridge, ptr)
}

fn global(bridge: &Bridge, name: &str) -> Handle {
    let key = bridge.make_str(name.as_bytes());
    bridge.get(Handle::GLOBAL, key)
}

fn args(bridge: &Bridge, items: &[Handle]) -> Handle {
    let arr = bridge.new_array();
    for &item in items {
        bridge.push(arr, item);
    }
    arr
}

fn message_of(bridge: &Bridge, h: Handle) -> String {
    let value = bridge.resolve(h).unwrap();
    let obj = value.as_object().expect("error object");
    assert!(obj.is_error(), "expected an error, got {:?}", value);
    ops::get_from_object(obj, &PropertyKey::from("message"))
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn host_fn(
    bridge: &Bridge,
    name: &str,
    f: impl Fn(&Realm, &Value, &[Value]) -> HostResult<Value> + 'static,
) -> Handle {
    let func = bridge.realm().new_function(name, Rc::new(f));
    bridge.intern(Value::Object(func))
}

#[test]
fn test_negative_int_scenario() {
    let bridge = bridge();
    let h = bridge.make_int(-5);
    assert_eq!(type_name(&bridge, h), "number");
    assert_eq!(bridge.get_value_uint(h), 4294967291);
    assert_eq!(bridge.get_value_int(h), -5);
}

#[test]
fn test_sum_through_argument_array() {
    let bridge = bridge();
    let sum = host_fn(&bridge, "sum", |realm, _this, args| {
        let mut total = 0.0;
        for arg in args {
            total += ops::to_number(realm, arg)?;
        }
        Ok(Value::Number(total))
    });

    let arr = bridge.new_array();
    bridge.push(arr, bridge.make_int(1));
    bridge.push(arr, bridge.make_int(2));
    let result = bridge.func_call(sum, arr);
    assert_eq!(bridge.get_value_int(result), 3);
    assert_eq!(type_name(&bridge, result), "number");
}

#[test]
fn test_numeric_round_trips() {
    let bridge = bridge();
    for x in [i32::MIN, -1, 0, 1, 123_456, i32::MAX] {
        assert_eq!(bridge.get_value_int(bridge.make_int(x)), x);
    }
    for x in [0, 1, 0x8000_0000, u32::MAX] {
        assert_eq!(bridge.get_value_uint(bridge.make_uint(x)), x);
    }
    for x in [i64::MIN, -1, 0, 1 << 53, i64::MAX] {
        assert_eq!(bridge.get_value_bigint(bridge.make_bigint(x)), x);
    }
    for x in [0, 1, 1 << 63, (1 << 63) + 1, u64::MAX] {
        assert_eq!(bridge.get_value_biguint(bridge.make_biguint(x)), x);
    }
    for x in [0.5, -1e300, f64::INFINITY] {
        assert_eq!(bridge.get_value_double(bridge.make_double(x)), x);
    }
    assert!(bridge.get_value_double(bridge.make_double(f64::NAN)).is_nan());
}

#[test]
fn test_biguint_is_never_negative() {
    let bridge = bridge();
    let h = bridge.make_biguint(u64::MAX);
    let value = bridge.resolve(h).unwrap();
    assert_eq!(value.as_bigint().unwrap().to_string(), "18446744073709551615");
    assert!(bridge.gt(h, bridge.make_int(0)));
}

#[test]
fn test_cross_width_extraction() {
    let bridge = bridge();
    // low 32 bits of a wide BigInt, no rounding through a double
    let wide = bridge.make_bigint((1 << 40) + 7);
    assert_eq!(bridge.get_value_int(wide), 7);
    assert_eq!(bridge.get_value_uint(bridge.make_bigint(-1)), u32::MAX);

    assert_eq!(bridge.get_value_bigint(bridge.make_double(-2.9)), -2);
    assert_eq!(bridge.get_value_biguint(bridge.make_bigint(-9)), 0);
    assert_eq!(bridge.get_value_biguint(bridge.make_double(-9.5)), 0);
    assert_eq!(bridge.get_value_biguint(bridge.make_double(7.9)), 7);
    assert_eq!(bridge.get_value_int(bridge.make_double(3.99)), 3);
    assert_eq!(bridge.get_value_double(bridge.make_str(b"12")), 12.0);
    assert_eq!(bridge.get_value_int(bridge.make_bool(true)), 1);
    assert_eq!(bridge.get_value_int(Handle::UNDEFINED), 0);

    // conversions the host rejects fall back instead of faulting
    assert_eq!(bridge.get_value_bigint(bridge.make_double(f64::NAN)), 0);
    assert_eq!(bridge.get_value_int(Handle::RESERVED), 0);
    assert!(bridge.get_value_double(Handle::RESERVED).is_nan());
}

#[test]
fn test_strings() {
    let bridge = bridge();
    let h = bridge.make_str("héllo\0ignored".as_bytes());
    assert_eq!(bridge.resolve(h).unwrap().as_str(), Some("héllo"));
    let ptr = bridge.get_value_string(h).unwrap();
    assert!(!ptr.is_null());
    assert_eq!(c_string(&bridge, ptr), "héllo");

    let units: Vec<u16> = "wide ✓".encode_utf16().collect();
    let w = bridge.make_str_utf16(&units);
    let ptr16 = bridge.get_value_string_utf16(w).unwrap();
    let decoded = bridge.with_memory(|m| read_c_string_utf16(&*m, ptr16)).unwrap();
    assert_eq!(decoded, "wide ✓");

    assert_eq!(bridge.get_value_string(bridge.make_int(1)).unwrap(), GuestPtr::NULL);
    assert_eq!(bridge.get_value_string_utf16(Handle::NULL).unwrap(), GuestPtr::NULL);

    let empty = bridge.make_str(b"");
    let ptr = bridge.get_value_string(empty).unwrap();
    assert!(!ptr.is_null());
    assert_eq!(c_string(&bridge, ptr), "");
    let ptr16 = bridge.get_value_string_utf16(empty).unwrap();
    assert!(!ptr16.is_null());
    let decoded = bridge.with_memory(|m| read_c_string_utf16(&*m, ptr16)).unwrap();
    assert_eq!(decoded, "");
}

#[test]
fn test_string_extraction_reports_exhausted_memory() {
    let bridge = Bridge::new(LinearMemory::new(16), FunctionTable::new());
    let h = bridge.make_str(b"this string needs more than eight bytes");
    let err = bridge.get_value_string(h).unwrap_err();
    assert!(matches!(err, BridgeError::Memory(_)));
}

#[test]
fn test_typeof_tags() {
    let bridge = bridge();
    assert_eq!(type_name(&bridge, Handle::NULL), "object");
    assert_eq!(type_name(&bridge, Handle::UNDEFINED), "undefined");
    assert_eq!(type_name(&bridge, Handle::TRUE), "boolean");
    assert_eq!(type_name(&bridge, bridge.make_bigint(1)), "bigint");
    assert_eq!(type_name(&bridge, bridge.make_str(b"s")), "string");
    assert_eq!(type_name(&bridge, Handle::RESERVED), "symbol");
    assert_eq!(type_name(&bridge, global(&bridge, "Array")), "function");
    assert_eq!(type_name(&bridge, bridge.new_array()), "object");
    assert_eq!(type_name(&bridge, Handle(4242)), "undefined");
}

#[test]
fn test_kind_predicates_accept_wrappers() {
    let bridge = bridge();
    let string_ctor = global(&bridge, "String");
    let boxed = bridge.construct_new(string_ctor, args(&bridge, &[bridge.make_str(b"x")]));
    assert_eq!(type_name(&bridge, boxed), "object");
    assert!(bridge.is_string(boxed));
    assert!(bridge.is_string(bridge.make_str(b"y")));
    assert!(!bridge.is_string(bridge.make_int(1)));

    let number_ctor = global(&bridge, "Number");
    let boxed_number = bridge.construct_new(number_ctor, args(&bridge, &[bridge.make_int(4)]));
    assert!(bridge.is_number(boxed_number));
    assert!(bridge.is_number(bridge.make_double(0.5)));
    assert!(!bridge.is_number(bridge.make_bigint(1)));

    let boolean_ctor = global(&bridge, "Boolean");
    let boxed_bool = bridge.construct_new(boolean_ctor, args(&bridge, &[Handle::FALSE]));
    assert!(bridge.is_bool(boxed_bool));
    assert!(bridge.is_bool(Handle::TRUE));
    assert!(!bridge.is_bool(Handle::NULL));

    // a boxed false is still an object, hence truthy
    assert!(bridge.get_value_bool(boxed_bool));
    assert!(!bridge.not(boxed_bool));
}

#[test]
fn test_truthiness() {
    let bridge = bridge();
    assert!(bridge.not(Handle::NULL));
    assert!(bridge.not(bridge.make_int(0)));
    assert!(bridge.not(bridge.make_str(b"")));
    assert!(!bridge.not(bridge.make_str(b"0")));
    assert!(!bridge.not(bridge.new_object()));
    assert!(bridge.get_value_bool(bridge.make_bigint(-1)));
    assert!(!bridge.get_value_bool(bridge.make_double(f64::NAN)));
}

#[test]
fn test_comparisons() {
    let bridge = bridge();
    let one = bridge.make_int(1);
    let two = bridge.make_int(2);
    let two_str = bridge.make_str(b"2");

    assert!(bridge.lt(one, two));
    assert!(bridge.lte(two, two_str));
    assert!(bridge.gte(two_str, two));
    assert!(!bridge.gt(one, two));
    assert!(bridge.gt(bridge.make_bigint(3), two));
    assert!(bridge.equals(two, two_str));
    assert!(!bridge.strictly_equals(two, two_str));
    assert!(bridge.strictly_equals(two, bridge.make_double(2.0)));
    assert!(bridge.equals(Handle::NULL, Handle::UNDEFINED));
    assert!(!bridge.strictly_equals(Handle::NULL, Handle::UNDEFINED));

    // symbols cannot be ordered; the fault answers false
    assert!(!bridge.lt(Handle::RESERVED, one));
    assert!(!bridge.gte(Handle::RESERVED, one));
}

#[test]
fn test_instance_of() {
    let bridge = bridge();
    let array_ctor = global(&bridge, "Array");
    let object_ctor = global(&bridge, "Object");
    let arr = bridge.new_array();
    assert!(bridge.instance_of(arr, array_ctor));
    assert!(bridge.instance_of(arr, object_ctor));
    assert!(!bridge.instance_of(bridge.new_object(), array_ctor));
    assert!(!bridge.instance_of(bridge.make_int(1), object_ctor));
    // non-callable right-hand side throws in the host
    assert!(!bridge.instance_of(arr, bridge.new_object()));
}

#[test]
fn test_has_and_own_props() {
    let bridge = bridge();
    let obj = bridge.new_object();
    let key = bridge.make_str(b"answer");
    assert!(bridge.set(obj, key, bridge.make_int(42)));

    assert!(bridge.has(obj, key));
    assert!(bridge.has(obj, bridge.make_str(b"toString")));
    assert!(!bridge.has(obj, bridge.make_str(b"missing")));
    // `in` on a primitive throws; has answers false
    assert!(!bridge.has(bridge.make_str(b"text"), bridge.make_str(b"length")));
    assert!(!bridge.has(Handle::NULL, key));

    assert!(bridge.obj_has_own_prop(obj, b"answer"));
    assert!(bridge.obj_has_own_prop(obj, b"answer\0trailing"));
    assert!(!bridge.obj_has_own_prop(obj, b"toString"));
    assert!(bridge.obj_has_own_prop(bridge.make_str(b"abc"), b"length"));
    assert!(!bridge.obj_has_own_prop(Handle::UNDEFINED, b"x"));
}

#[test]
fn test_get_and_set() {
    let bridge = bridge();
    let obj = bridge.new_object();
    let key = bridge.make_str(b"k");
    let value = bridge.make_str(b"v");
    assert!(bridge.set(obj, key, value));
    assert_eq!(bridge.get(obj, key), value);
    assert_eq!(bridge.get(obj, bridge.make_str(b"absent")), Handle::UNDEFINED);

    // numeric keys address array elements
    let arr = bridge.new_array();
    assert!(bridge.set(arr, bridge.make_int(2), value));
    let length = bridge.get(arr, bridge.make_str(b"length"));
    assert_eq!(bridge.get_value_int(length), 3);
    assert_eq!(bridge.get(arr, bridge.make_int(0)), Handle::UNDEFINED);

    // primitives read through their wrapper prototypes
    let len = bridge.get(bridge.make_str(b"four"), bridge.make_str(b"length"));
    assert_eq!(bridge.get_value_int(len), 4);

    // faults: reads normalize, writes report false
    let err = bridge.get(Handle::UNDEFINED, key);
    assert!(message_of(&bridge, err).contains("Cannot read properties of undefined"));
    assert!(!bridge.set(Handle::NULL, key, value));
    assert!(!bridge.set(arr, bridge.make_str(b"length"), bridge.make_int(-1)));
}

#[test]
fn test_push_stores_handles() {
    let bridge = bridge();
    let arr = bridge.new_array();
    let s = bridge.make_str(b"item");
    bridge.push(arr, s);

    let stored = bridge.get(arr, bridge.make_int(0));
    assert_eq!(bridge.get_value_uint(stored), s.raw());

    // pushing into something without `push` is a silent no-op
    let obj = bridge.new_object();
    bridge.push(obj, s);
    bridge.push(Handle::NULL, s);
    assert!(!bridge.obj_has_own_prop(obj, b"0"));
}

#[test]
fn test_call_failure_containment() {
    let bridge = bridge();
    let thrower = host_fn(&bridge, "thrower", |_realm, _this, _args| {
        Err(HostError::throw("kaboom"))
    });
    let result = bridge.func_call(thrower, bridge.new_array());
    assert_eq!(message_of(&bridge, result), "kaboom");
    let cause = bridge.get(result, bridge.make_str(b"cause"));
    assert_eq!(bridge.resolve(cause).unwrap().as_str(), Some("kaboom"));

    let not_callable = bridge.func_call(bridge.new_object(), bridge.new_array());
    assert!(message_of(&bridge, not_callable).contains("is not a function"));

    let type_error = global(&bridge, "TypeError");
    assert!(bridge.instance_of(not_callable, type_error));

    let not_array = bridge.func_call(thrower, bridge.make_int(3));
    assert!(message_of(&bridge, not_array).contains("argument list must be an array"));
}

#[test]
fn test_construct() {
    let bridge = bridge();
    let error_ctor = global(&bridge, "Error");
    let err = bridge.construct_new(error_ctor, args(&bridge, &[bridge.make_str(b"made")]));
    assert_eq!(message_of(&bridge, err), "made");
    assert!(bridge.instance_of(err, error_ctor));

    let arr = bridge.construct_new(
        global(&bridge, "Array"),
        args(&bridge, &[bridge.make_int(1), bridge.make_int(2)]),
    );
    let len = bridge.get(arr, bridge.make_str(b"length"));
    assert_eq!(bridge.get_value_int(len), 2);

    let bad_length = bridge.construct_new(global(&bridge, "Array"), args(&bridge, &[bridge.make_int(-1)]));
    assert_eq!(message_of(&bridge, bad_length), "Invalid array length");

    let plain = host_fn(&bridge, "plain", |_realm, _this, _args| Ok(Value::Undefined));
    let not_ctor = bridge.construct_new(plain, bridge.new_array());
    assert!(message_of(&bridge, not_ctor).contains("is not a constructor"));
}

#[test]
fn test_far_array_indices_and_lengths() {
    let bridge = bridge();
    let array_ctor = global(&bridge, "Array");
    let length_key = bridge.make_str(b"length");
    let far = bridge.make_uint(4_000_000_000);

    let arr = bridge.new_array();
    assert!(bridge.set(arr, far, bridge.make_int(1)));
    let len = bridge.get(arr, length_key);
    assert_eq!(bridge.get_value_double(len), 4_000_000_001.0);
    let stored = bridge.get(arr, far);
    assert_eq!(bridge.get_value_int(stored), 1);
    assert_eq!(bridge.get(arr, bridge.make_int(7)), Handle::UNDEFINED);

    assert!(bridge.set(arr, length_key, bridge.make_uint(4_000_000_000)));
    let len = bridge.get(arr, length_key);
    assert_eq!(bridge.get_value_double(len), 4_000_000_000.0);
    assert_eq!(bridge.get(arr, far), Handle::UNDEFINED);
    assert!(!bridge.set(arr, length_key, bridge.make_double(-1.0)));

    let sized = bridge.construct_new(array_ctor, args(&bridge, &[bridge.make_uint(4_000_000_000)]));
    assert!(bridge.instance_of(sized, array_ctor));
    let len = bridge.get(sized, length_key);
    assert_eq!(bridge.get_value_double(len), 4_000_000_000.0);
    assert_eq!(bridge.get(sized, bridge.make_int(0)), Handle::UNDEFINED);

    let joined = bridge.obj_call(sized, b"join", bridge.new_array());
    assert_eq!(message_of(&bridge, joined), "Invalid string length");

    let plain = host_fn(&bridge, "plain", |_realm, _this, _args| Ok(Value::Undefined));
    let refused = bridge.func_call(plain, sized);
    assert!(message_of(&bridge, refused).starts_with("Too many arguments"));
}

#[test]
fn test_sparse_argument_lists() {
    let bridge = bridge();
    let argv = args(&bridge, &[bridge.make_int(1)]);
    assert!(bridge.set(argv, bridge.make_int(3), bridge.make_int(2)));
    let count = host_fn(&bridge, "count", |_realm, _this, args| {
        assert!(args[1].is_undefined() && args[2].is_undefined());
        Ok(Value::from(args.len() as u32))
    });
    let result = bridge.func_call(count, argv);
    assert_eq!(bridge.get_value_int(result), 4);
}

#[test]
fn test_obj_call() {
    let bridge = bridge();
    let arr = bridge.new_array();
    bridge.push(arr, bridge.make_int(4));
    let joined = bridge.obj_call(arr, b"join", args(&bridge, &[bridge.make_str(b"+")]));
    let ptr = bridge.get_value_string(joined).unwrap();
    // `join` sees the stored handle number, not the value behind it
    let expected = bridge.make_int(4).raw().to_string();
    assert_eq!(c_string(&bridge, ptr), expected);

    let obj = bridge.new_object();
    let key = bridge.make_str(b"toString");
    let text = bridge.obj_call(obj, b"toString\0junk", bridge.new_array());
    assert_eq!(bridge.resolve(text).unwrap().as_str(), Some("[object Object]"));

    let missing = bridge.obj_call(obj, b"nope", bridge.new_array());
    assert!(message_of(&bridge, missing).contains("is not a function"));
    let on_null = bridge.obj_call(Handle::NULL, b"x", bridge.new_array());
    assert!(message_of(&bridge, on_null).contains("Cannot read properties of null"));
    assert!(bridge.has(obj, key));
}

#[test]
fn test_normalization_is_idempotent_across_calls() {
    let bridge = bridge();
    let thrower = host_fn(&bridge, "thrower", |_realm, _this, _args| {
        Err(HostError::throw(7))
    });
    let first = bridge.func_call(thrower, bridge.new_array());
    assert_eq!(message_of(&bridge, first), "7");

    let rethrown = bridge.resolve(first).unwrap();
    let rethrower = host_fn(&bridge, "rethrower", move |_realm, _this, _args| {
        Err(HostError::Throw(rethrown.clone()))
    });
    let second = bridge.func_call(rethrower, bridge.new_array());
    assert_eq!(second, first);
    assert_eq!(message_of(&bridge, second), "7");
}

#[test]
fn test_thrown_objects_keep_name_and_code() {
    let bridge = bridge();
    let payload = bridge.new_object();
    bridge.set(payload, bridge.make_str(b"name"), bridge.make_str(b"AbortError"));
    bridge.set(payload, bridge.make_str(b"code"), bridge.make_int(20));
    let thrown = bridge.resolve(payload).unwrap();
    let thrower = host_fn(&bridge, "thrower", move |_realm, _this, _args| {
        Err(HostError::Throw(thrown.clone()))
    });

    let result = bridge.func_call(thrower, bridge.new_array());
    let name = bridge.get(result, bridge.make_str(b"name"));
    assert_eq!(bridge.resolve(name).unwrap().as_str(), Some("AbortError"));
    let code = bridge.get(result, bridge.make_str(b"code"));
    assert_eq!(bridge.get_value_int(code), 20);
    let cause = bridge.get(result, bridge.make_str(b"cause"));
    assert!(bridge.strictly_equals(cause, payload));
}

#[test]
fn test_console_reachable_by_handle() {
    let bridge = bridge();
    let log = bridge.get(Handle::CONSOLE, bridge.make_str(b"log"));
    assert_eq!(type_name(&bridge, log), "function");
    let result = bridge.obj_call(
        Handle::CONSOLE,
        b"log",
        args(&bridge, &[bridge.make_str(b"from the guest")]),
    );
    assert_eq!(result, Handle::UNDEFINED);
}

#[test]
fn test_target_and_throw() {
    let bridge = bridge();
    assert_eq!(bridge.target(), BRIDGE_TARGET);
    assert_eq!(bridge.target(), 1041);
    let h = bridge.make_str(b"fatal");
    match bridge.throw(h) {
        BridgeError::Thrown(thrown) => assert_eq!(thrown, h),
        other => panic!("unexpected {:?}", other),
    }
}
