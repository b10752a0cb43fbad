//! Realm and intrinsics
//!
//! A realm owns the prototype objects, the built-in constructors, the global
//! object and the console. Everything is created eagerly in [`Realm::new`].
//!
//! Constructors and their prototypes reference each other (as do the global
//! object and `globalThis`), so a realm is never reclaimed before process
//! exit; it is meant to be created once per bridge.

use std::rc::Rc;

use crate::console;
use crate::error::{HostError, HostResult};
use crate::object::{
    self, ArrayElements, FunctionData, JsObject, NativeCtor, NativeFn, ObjectKind, PropertyKey,
};
use crate::ops;
use crate::value::Value;

/// Native error families the host can create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `Error`
    Error,
    /// `TypeError`
    TypeError,
    /// `RangeError`
    RangeError,
    /// `ReferenceError`
    ReferenceError,
}

impl ErrorKind {
    /// Constructor name
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
        }
    }
}

/// Built-in objects of a realm
pub struct Intrinsics {
    /// `Object.prototype`
    pub object_prototype: JsObject,
    /// `Function.prototype`
    pub function_prototype: JsObject,
    /// `Array.prototype`
    pub array_prototype: JsObject,
    /// `Error.prototype`
    pub error_prototype: JsObject,
    /// `TypeError.prototype`
    pub type_error_prototype: JsObject,
    /// `RangeError.prototype`
    pub range_error_prototype: JsObject,
    /// `ReferenceError.prototype`
    pub reference_error_prototype: JsObject,
    /// `String.prototype`
    pub string_prototype: JsObject,
    /// `Number.prototype`
    pub number_prototype: JsObject,
    /// `Boolean.prototype`
    pub boolean_prototype: JsObject,
    /// `Symbol.prototype`
    pub symbol_prototype: JsObject,
    /// `BigInt.prototype`
    pub bigint_prototype: JsObject,
    /// `Object`
    pub object_constructor: JsObject,
    /// `Array`
    pub array_constructor: JsObject,
    /// `Error`
    pub error_constructor: JsObject,
    /// `TypeError`
    pub type_error_constructor: JsObject,
    /// `RangeError`
    pub range_error_constructor: JsObject,
    /// `ReferenceError`
    pub reference_error_constructor: JsObject,
    /// `String`
    pub string_constructor: JsObject,
    /// `Number`
    pub number_constructor: JsObject,
    /// `Boolean`
    pub boolean_constructor: JsObject,
}

/// A host realm
pub struct Realm {
    intrinsics: Intrinsics,
    global: JsObject,
    console: JsObject,
}

fn ordinary(proto: &JsObject) -> JsObject {
    JsObject::new(ObjectKind::Ordinary, Some(proto.clone()))
}

fn make_function(
    function_prototype: &JsObject,
    name: &str,
    call: NativeFn,
    construct: Option<NativeCtor>,
) -> JsObject {
    let func = JsObject::new(
        ObjectKind::Function(FunctionData {
            name: Rc::from(name),
            call,
            construct,
        }),
        Some(function_prototype.clone()),
    );
    define(&func, "name", Value::from(name));
    func
}

pub(crate) fn define(obj: &JsObject, name: &str, value: Value) {
    let defined = obj.set_own(PropertyKey::from(name), value);
    debug_assert!(defined.is_ok(), "intrinsic property `{}` rejected", name);
}

pub(crate) fn define_method(
    obj: &JsObject,
    function_prototype: &JsObject,
    name: &str,
    call: fn(&Realm, &Value, &[Value]) -> HostResult<Value>,
) {
    let func = make_function(function_prototype, name, Rc::new(call), None);
    define(obj, name, Value::Object(func));
}

fn link_constructor(ctor: &JsObject, proto: &JsObject) {
    define(ctor, "prototype", Value::Object(proto.clone()));
    define(proto, "constructor", Value::Object(ctor.clone()));
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

impl Realm {
    /// Build a realm with all intrinsics, the global object and the console
    pub fn new() -> Self {
        let object_prototype = JsObject::new(ObjectKind::Ordinary, None);
        let function_prototype = ordinary(&object_prototype);
        let array_prototype = JsObject::new(
            ObjectKind::Array(ArrayElements::default()),
            Some(object_prototype.clone()),
        );
        let error_prototype = ordinary(&object_prototype);
        let type_error_prototype = ordinary(&error_prototype);
        let range_error_prototype = ordinary(&error_prototype);
        let reference_error_prototype = ordinary(&error_prototype);
        let string_prototype = ordinary(&object_prototype);
        let number_prototype = ordinary(&object_prototype);
        let boolean_prototype = ordinary(&object_prototype);
        let symbol_prototype = ordinary(&object_prototype);
        let bigint_prototype = ordinary(&object_prototype);

        let fp = &function_prototype;

        define_method(&object_prototype, fp, "toString", object_to_string);
        define_method(&object_prototype, fp, "valueOf", object_value_of);
        define_method(&object_prototype, fp, "hasOwnProperty", object_has_own_property);

        define_method(&array_prototype, fp, "push", array_push);
        define_method(&array_prototype, fp, "join", array_join);
        define_method(&array_prototype, fp, "toString", array_to_string);

        define(&error_prototype, "name", Value::from("Error"));
        define(&error_prototype, "message", Value::from(""));
        define_method(&error_prototype, fp, "toString", error_to_string);
        for (proto, kind) in [
            (&type_error_prototype, ErrorKind::TypeError),
            (&range_error_prototype, ErrorKind::RangeError),
            (&reference_error_prototype, ErrorKind::ReferenceError),
        ] {
            define(proto, "name", Value::from(kind.name()));
            define(proto, "message", Value::from(""));
        }

        define_method(&string_prototype, fp, "toString", string_value_of);
        define_method(&string_prototype, fp, "valueOf", string_value_of);
        define_method(&number_prototype, fp, "toString", number_to_string);
        define_method(&number_prototype, fp, "valueOf", number_value_of);
        define_method(&boolean_prototype, fp, "toString", boolean_to_string);
        define_method(&boolean_prototype, fp, "valueOf", boolean_value_of);
        define_method(&symbol_prototype, fp, "toString", symbol_to_string);
        define_method(&symbol_prototype, fp, "valueOf", symbol_value_of);
        define_method(&bigint_prototype, fp, "toString", bigint_to_string);
        define_method(&bigint_prototype, fp, "valueOf", bigint_value_of);

        let object_constructor = make_function(
            fp,
            "Object",
            Rc::new(|realm: &Realm, _this: &Value, args: &[Value]| object_construct(realm, args)),
            Some(Rc::new(object_construct)),
        );
        let array_constructor = make_function(
            fp,
            "Array",
            Rc::new(|realm: &Realm, _this: &Value, args: &[Value]| array_construct(realm, args)),
            Some(Rc::new(array_construct)),
        );
        let error_ctor = |kind: ErrorKind| {
            make_function(
                fp,
                kind.name(),
                Rc::new(move |realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
                    error_construct(realm, kind, args)
                }),
                Some(Rc::new(move |realm: &Realm, args: &[Value]| -> HostResult<Value> {
                    error_construct(realm, kind, args)
                })),
            )
        };
        let error_constructor = error_ctor(ErrorKind::Error);
        let type_error_constructor = error_ctor(ErrorKind::TypeError);
        let range_error_constructor = error_ctor(ErrorKind::RangeError);
        let reference_error_constructor = error_ctor(ErrorKind::ReferenceError);
        type_error_constructor.set_prototype(Some(error_constructor.clone()));
        range_error_constructor.set_prototype(Some(error_constructor.clone()));
        reference_error_constructor.set_prototype(Some(error_constructor.clone()));

        let string_constructor = make_function(
            fp,
            "String",
            Rc::new(|realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
                if args.is_empty() {
                    return Ok(Value::from(""));
                }
                Ok(Value::String(ops::string_conversion(realm, &args[0])?))
            }),
            Some(Rc::new(|realm: &Realm, args: &[Value]| -> HostResult<Value> {
                let s = match args.first() {
                    Some(v) => ops::to_string(realm, v)?,
                    None => Rc::from(""),
                };
                Ok(Value::Object(ops::to_object(realm, &Value::String(s))?))
            })),
        );
        let number_constructor = make_function(
            fp,
            "Number",
            Rc::new(|realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
                match args.first() {
                    Some(v) => Ok(Value::Number(ops::number_conversion(realm, v)?)),
                    None => Ok(Value::Number(0.0)),
                }
            }),
            Some(Rc::new(|realm: &Realm, args: &[Value]| -> HostResult<Value> {
                let n = match args.first() {
                    Some(v) => ops::number_conversion(realm, v)?,
                    None => 0.0,
                };
                Ok(Value::Object(ops::to_object(realm, &Value::Number(n))?))
            })),
        );
        let boolean_constructor = make_function(
            fp,
            "Boolean",
            Rc::new(|_realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
                Ok(Value::Boolean(ops::to_boolean(&arg(args, 0))))
            }),
            Some(Rc::new(|realm: &Realm, args: &[Value]| -> HostResult<Value> {
                let b = ops::to_boolean(&arg(args, 0));
                Ok(Value::Object(ops::to_object(realm, &Value::Boolean(b))?))
            })),
        );

        link_constructor(&object_constructor, &object_prototype);
        link_constructor(&array_constructor, &array_prototype);
        link_constructor(&error_constructor, &error_prototype);
        link_constructor(&type_error_constructor, &type_error_prototype);
        link_constructor(&range_error_constructor, &range_error_prototype);
        link_constructor(&reference_error_constructor, &reference_error_prototype);
        link_constructor(&string_constructor, &string_prototype);
        link_constructor(&number_constructor, &number_prototype);
        link_constructor(&boolean_constructor, &boolean_prototype);

        let console = console::create_console(&object_prototype, fp);

        let global = ordinary(&object_prototype);
        for (name, ctor) in [
            ("Object", &object_constructor),
            ("Array", &array_constructor),
            ("Error", &error_constructor),
            ("TypeError", &type_error_constructor),
            ("RangeError", &range_error_constructor),
            ("ReferenceError", &reference_error_constructor),
            ("String", &string_constructor),
            ("Number", &number_constructor),
            ("Boolean", &boolean_constructor),
        ] {
            define(&global, name, Value::Object(ctor.clone()));
        }
        define(&global, "console", Value::Object(console.clone()));
        define(&global, "globalThis", Value::Object(global.clone()));
        define(&global, "NaN", Value::Number(f64::NAN));
        define(&global, "Infinity", Value::Number(f64::INFINITY));
        define(&global, "undefined", Value::Undefined);

        Self {
            intrinsics: Intrinsics {
                object_prototype,
                function_prototype,
                array_prototype,
                error_prototype,
                type_error_prototype,
                range_error_prototype,
                reference_error_prototype,
                string_prototype,
                number_prototype,
                boolean_prototype,
                symbol_prototype,
                bigint_prototype,
                object_constructor,
                array_constructor,
                error_constructor,
                type_error_constructor,
                range_error_constructor,
                reference_error_constructor,
                string_constructor,
                number_constructor,
                boolean_constructor,
            },
            global,
            console,
        }
    }

    /// Built-in objects
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// The global root object (`globalThis`)
    pub fn global(&self) -> &JsObject {
        &self.global
    }

    /// The console object
    pub fn console(&self) -> &JsObject {
        &self.console
    }

    /// `{}`
    pub fn new_object(&self) -> JsObject {
        ordinary(&self.intrinsics.object_prototype)
    }

    /// `[...elements]`
    pub fn new_array(&self, elements: Vec<Value>) -> JsObject {
        JsObject::new(
            ObjectKind::Array(ArrayElements::from_vec(elements)),
            Some(self.intrinsics.array_prototype.clone()),
        )
    }

    /// A native, non-constructor function
    pub fn new_function(&self, name: &str, call: NativeFn) -> JsObject {
        make_function(&self.intrinsics.function_prototype, name, call, None)
    }

    /// A native constructor whose instances inherit from a fresh prototype
    ///
    /// `init` receives the new instance and the arguments.
    pub fn new_class(
        &self,
        name: &str,
        init: impl Fn(&Realm, &JsObject, &[Value]) -> HostResult<()> + 'static,
    ) -> JsObject {
        let proto = self.new_object();
        let instance_proto = proto.clone();
        let init = Rc::new(init);
        let call_init = init.clone();
        let call_proto = proto.clone();
        let ctor = make_function(
            &self.intrinsics.function_prototype,
            name,
            Rc::new(move |realm: &Realm, _this: &Value, args: &[Value]| -> HostResult<Value> {
                let instance = ordinary(&call_proto);
                call_init(realm, &instance, args)?;
                Ok(Value::Object(instance))
            }),
            Some(Rc::new(move |realm: &Realm, args: &[Value]| -> HostResult<Value> {
                let instance = ordinary(&instance_proto);
                init(realm, &instance, args)?;
                Ok(Value::Object(instance))
            })),
        );
        link_constructor(&ctor, &proto);
        ctor
    }

    /// Prototype of the constructor for `kind`
    pub fn error_prototype(&self, kind: ErrorKind) -> &JsObject {
        match kind {
            ErrorKind::Error => &self.intrinsics.error_prototype,
            ErrorKind::TypeError => &self.intrinsics.type_error_prototype,
            ErrorKind::RangeError => &self.intrinsics.range_error_prototype,
            ErrorKind::ReferenceError => &self.intrinsics.reference_error_prototype,
        }
    }

    /// A native error object with an own `message`
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> JsObject {
        let err = JsObject::new(ObjectKind::Error, Some(self.error_prototype(kind).clone()));
        define(&err, "message", Value::from(message));
        err
    }

    /// Materialize a host fault as a value, the way a `catch` clause sees it
    pub fn error_to_value(&self, err: HostError) -> Value {
        let (kind, message) = match err {
            HostError::Throw(value) => return value,
            HostError::TypeError(m) => (ErrorKind::TypeError, m),
            HostError::RangeError(m) => (ErrorKind::RangeError, m),
            HostError::ReferenceError(m) => (ErrorKind::ReferenceError, m),
            HostError::StackOverflow => (
                ErrorKind::RangeError,
                "Maximum call stack size exceeded".to_string(),
            ),
        };
        Value::Object(self.new_error(kind, &message))
    }

    /// Wrapper prototype used for property lookups on primitives
    pub fn prototype_of_primitive(&self, value: &Value) -> Option<JsObject> {
        let proto = match value {
            Value::Boolean(_) => &self.intrinsics.boolean_prototype,
            Value::Number(_) => &self.intrinsics.number_prototype,
            Value::String(_) => &self.intrinsics.string_prototype,
            Value::Symbol(_) => &self.intrinsics.symbol_prototype,
            Value::BigInt(_) => &self.intrinsics.bigint_prototype,
            _ => return None,
        };
        Some(proto.clone())
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

fn object_construct(realm: &Realm, args: &[Value]) -> HostResult<Value> {
    match args.first() {
        Some(v) if !v.is_nullish() => Ok(Value::Object(ops::to_object(realm, v)?)),
        _ => Ok(Value::Object(realm.new_object())),
    }
}

fn array_construct(realm: &Realm, args: &[Value]) -> HostResult<Value> {
    if let [len @ Value::Number(_)] = args {
        let arr = JsObject::new(
            ObjectKind::Array(ArrayElements::with_length(object::to_array_length(len)?)),
            Some(realm.intrinsics.array_prototype.clone()),
        );
        return Ok(Value::Object(arr));
    }
    Ok(Value::Object(realm.new_array(args.to_vec())))
}

fn error_construct(realm: &Realm, kind: ErrorKind, args: &[Value]) -> HostResult<Value> {
    let err = JsObject::new(ObjectKind::Error, Some(realm.error_prototype(kind).clone()));
    let message = arg(args, 0);
    if !message.is_undefined() {
        let text = ops::to_string(realm, &message)?;
        err.set_own(PropertyKey::from("message"), Value::String(text))?;
    }
    let options = arg(args, 1);
    let cause_key = PropertyKey::from("cause");
    if options.is_object() && ops::has_property(realm, &options, &cause_key)? {
        let cause = ops::get(realm, &options, &cause_key)?;
        err.set_own(cause_key, cause)?;
    }
    Ok(Value::Object(err))
}

// ---------------------------------------------------------------------------
// Prototype methods
// ---------------------------------------------------------------------------

fn object_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let tag = match this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        other => ops::to_object(realm, other)?.class_name(),
    };
    Ok(Value::from(format!("[object {}]", tag)))
}

fn object_value_of(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    Ok(Value::Object(ops::to_object(realm, this)?))
}

fn object_has_own_property(realm: &Realm, this: &Value, args: &[Value]) -> HostResult<Value> {
    let key = ops::to_property_key(realm, &arg(args, 0))?;
    Ok(Value::Boolean(ops::has_own_property(realm, this, &key)?))
}

fn this_array(this: &Value, method: &str) -> HostResult<JsObject> {
    match this {
        Value::Object(o) if o.is_array() => Ok(o.clone()),
        _ => Err(HostError::type_error(format!(
            "Array.prototype.{} called on non-array",
            method
        ))),
    }
}

fn array_push(_realm: &Realm, this: &Value, args: &[Value]) -> HostResult<Value> {
    let arr = this_array(this, "push")?;
    let mut len = arr.array_length().unwrap_or(0);
    for value in args {
        len = arr.array_push(value.clone())?;
    }
    Ok(Value::Number(f64::from(len)))
}

/// Longest string `join` will build, in bytes
const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

fn join_elements(realm: &Realm, arr: &JsObject, separator: &str) -> HostResult<Value> {
    let len = arr.array_length().unwrap_or(0) as usize;
    let separators = len.saturating_sub(1);
    if separators.saturating_mul(separator.len()) > MAX_STRING_LENGTH {
        return Err(HostError::range_error("Invalid string length"));
    }
    // holes and nullish elements render empty; only present slots are visited
    let mut out = String::new();
    let mut written = 0;
    for (index, element) in arr.array_entries().unwrap_or_default() {
        let index = index as usize;
        out.push_str(&separator.repeat(index - written));
        written = index;
        if !element.is_nullish() {
            out.push_str(&ops::to_string(realm, &element)?);
        }
        if out.len() > MAX_STRING_LENGTH {
            return Err(HostError::range_error("Invalid string length"));
        }
    }
    out.push_str(&separator.repeat(separators - written.min(separators)));
    Ok(Value::from(out))
}

fn array_join(realm: &Realm, this: &Value, args: &[Value]) -> HostResult<Value> {
    let arr = this_array(this, "join")?;
    let separator = match args.first() {
        Some(v) if !v.is_undefined() => ops::to_string(realm, v)?,
        _ => Rc::from(","),
    };
    join_elements(realm, &arr, &separator)
}

fn array_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let arr = this_array(this, "toString")?;
    join_elements(realm, &arr, ",")
}

fn error_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    if !this.is_object() {
        return Err(HostError::type_error(
            "Error.prototype.toString called on non-object",
        ));
    }
    let name = match ops::get(realm, this, &PropertyKey::from("name"))? {
        Value::Undefined => Rc::from("Error"),
        v => ops::to_string(realm, &v)?,
    };
    let message = match ops::get(realm, this, &PropertyKey::from("message"))? {
        Value::Undefined => Rc::from(""),
        v => ops::to_string(realm, &v)?,
    };
    Ok(Value::from(match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (_, true) => name.to_string(),
        _ => format!("{}: {}", name, message),
    }))
}

fn this_primitive(this: &Value, accept: fn(&Value) -> bool, method: &str) -> HostResult<Value> {
    if accept(this) {
        return Ok(this.clone());
    }
    if let Some(inner) = this.as_object().and_then(JsObject::primitive_value) {
        if accept(&inner) {
            return Ok(inner);
        }
    }
    Err(HostError::type_error(format!(
        "{} requires a compatible receiver",
        method
    )))
}

fn string_value_of(_realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    this_primitive(this, |v| matches!(v, Value::String(_)), "String.prototype.valueOf")
}

fn number_value_of(_realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    this_primitive(this, |v| matches!(v, Value::Number(_)), "Number.prototype.valueOf")
}

fn number_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let n = number_value_of(realm, this, &[])?;
    Ok(Value::String(ops::to_string(realm, &n)?))
}

fn boolean_value_of(_realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    this_primitive(this, |v| matches!(v, Value::Boolean(_)), "Boolean.prototype.valueOf")
}

fn boolean_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let b = boolean_value_of(realm, this, &[])?;
    Ok(Value::String(ops::to_string(realm, &b)?))
}

fn symbol_value_of(_realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    this_primitive(this, |v| matches!(v, Value::Symbol(_)), "Symbol.prototype.valueOf")
}

fn symbol_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let s = symbol_value_of(realm, this, &[])?;
    Ok(Value::String(ops::string_conversion(realm, &s)?))
}

fn bigint_value_of(_realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    this_primitive(this, |v| matches!(v, Value::BigInt(_)), "BigInt.prototype.valueOf")
}

fn bigint_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> HostResult<Value> {
    let b = bigint_value_of(realm, this, &[])?;
    Ok(Value::String(ops::to_string(realm, &b)?))
}
