//! Host objects
//!
//! Objects are reference-counted cells holding a kind (ordinary, array,
//! function, error, boxed primitive), an optional prototype and an ordered
//! property map. Identity is the address of the shared cell.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::error::{HostError, HostResult};
use crate::realm::Realm;
use crate::value::{Symbol, Value};

/// Native call behaviour: `(realm, this, args)`
pub type NativeFn = Rc<dyn Fn(&Realm, &Value, &[Value]) -> HostResult<Value>>;

/// Native construct behaviour: `(realm, args)`
pub type NativeCtor = Rc<dyn Fn(&Realm, &[Value]) -> HostResult<Value>>;

/// Property key (string or symbol)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Rc<str>),
    /// Symbol property key
    Symbol(Symbol),
}

impl PropertyKey {
    /// Create a string property key
    pub fn string(s: &str) -> Self {
        Self::String(Rc::from(s))
    }

    /// The key as a string, if it is not a symbol
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }

    /// Canonical array index (`"0"`, `"17"`, never `"01"`)
    pub fn array_index(&self) -> Option<usize> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: u32 = s.parse().ok()?;
        (index != u32::MAX).then_some(index as usize)
    }

    fn is_length(&self) -> bool {
        self.as_str() == Some("length")
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Symbol(s) => write!(f, "{}", s.descriptive_string()),
        }
    }
}

/// Behaviour attached to function objects
pub struct FunctionData {
    /// Function name (also exposed as the `name` property)
    pub name: Rc<str>,
    /// `[[Call]]`
    pub call: NativeFn,
    /// `[[Construct]]`, absent for non-constructors
    pub construct: Option<NativeCtor>,
}

/// Widest gap a write may open past the dense prefix
const DENSE_GAP_LIMIT: usize = 1024;

/// Array element storage
///
/// A dense prefix plus an ordered map for far indices, with `length` kept
/// on its own. Every sparse index lies at or past the end of the dense
/// prefix and below `length`, so memory follows the writes made, not the
/// length requested.
#[derive(Default)]
pub struct ArrayElements {
    dense: Vec<Value>,
    sparse: BTreeMap<u32, Value>,
    length: u32,
}

impl ArrayElements {
    /// Elements `0..values.len()`
    pub fn from_vec(mut values: Vec<Value>) -> Self {
        let length = u32::try_from(values.len()).unwrap_or(u32::MAX);
        values.truncate(length as usize);
        Self {
            dense: values,
            sparse: BTreeMap::new(),
            length,
        }
    }

    /// `length` holes
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// The `length` slot
    pub fn len(&self) -> u32 {
        self.length
    }

    /// `length == 0`
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Element at `index`, `None` for a hole
    pub fn get(&self, index: u32) -> Option<&Value> {
        self.dense
            .get(index as usize)
            .or_else(|| self.sparse.get(&index))
    }

    /// Store `value` at `index`, growing `length` past it
    pub fn set(&mut self, index: u32, value: Value) {
        let at = index as usize;
        let dense_len = self.dense.len();
        if at < dense_len {
            self.dense[at] = value;
        } else if at - dense_len <= DENSE_GAP_LIMIT {
            let rest = self.sparse.split_off(&index);
            let absorbed = std::mem::replace(&mut self.sparse, rest);
            self.dense.resize(at, Value::Undefined);
            for (k, v) in absorbed {
                self.dense[k as usize] = v;
            }
            self.sparse.remove(&index);
            self.dense.push(value);
            while let Some(next) = self.sparse.remove(&(self.dense.len() as u32)) {
                self.dense.push(next);
            }
        } else {
            self.sparse.insert(index, value);
        }
        self.length = self.length.max(index.saturating_add(1));
    }

    /// Assign `length`, dropping every element at or past it
    pub fn set_len(&mut self, length: u32) {
        self.dense.truncate(length as usize);
        self.sparse.retain(|&index, _| index < length);
        self.length = length;
    }

    /// Append at `length`, returning the new length
    pub fn push(&mut self, value: Value) -> HostResult<u32> {
        if self.length == u32::MAX {
            return Err(HostError::range_error("Invalid array length"));
        }
        self.set(self.length, value);
        Ok(self.length)
    }

    /// Present elements in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.dense
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32, v))
            .chain(self.sparse.iter().map(|(&i, v)| (i, v)))
    }
}

/// Internal kind of an object
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array exotic object
    Array(ArrayElements),
    /// Native function
    Function(FunctionData),
    /// Native error instance
    Error,
    /// `Boolean` wrapper
    Boolean(bool),
    /// `Number` wrapper
    Number(f64),
    /// `String` wrapper
    String(Rc<str>),
    /// `Symbol` wrapper
    Symbol(Symbol),
    /// `BigInt` wrapper
    BigInt(Rc<BigInt>),
}

struct ObjectData {
    kind: ObjectKind,
    prototype: Option<JsObject>,
    properties: IndexMap<PropertyKey, Value>,
}

/// A shared host object
#[derive(Clone)]
pub struct JsObject(Rc<RefCell<ObjectData>>);

impl JsObject {
    /// Allocate a new object
    pub fn new(kind: ObjectKind, prototype: Option<JsObject>) -> Self {
        Self(Rc::new(RefCell::new(ObjectData {
            kind,
            prototype,
            properties: IndexMap::new(),
        })))
    }

    /// Address of the shared cell (object identity)
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Same allocation?
    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `[[Prototype]]`
    pub fn prototype(&self) -> Option<JsObject> {
        self.0.borrow().prototype.clone()
    }

    /// Replace `[[Prototype]]`
    pub fn set_prototype(&self, prototype: Option<JsObject>) {
        self.0.borrow_mut().prototype = prototype;
    }

    /// Has a `[[Call]]` behaviour
    pub fn is_callable(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    /// Array exotic object
    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }

    /// Carries the native error marker
    pub fn is_error(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Error)
    }

    /// Clone out the call behaviour so no borrow is held during the call
    pub fn call_behavior(&self) -> Option<NativeFn> {
        match &self.0.borrow().kind {
            ObjectKind::Function(data) => Some(data.call.clone()),
            _ => None,
        }
    }

    /// Clone out the construct behaviour
    pub fn construct_behavior(&self) -> Option<NativeCtor> {
        match &self.0.borrow().kind {
            ObjectKind::Function(data) => data.construct.clone(),
            _ => None,
        }
    }

    /// Function name, for functions
    pub fn function_name(&self) -> Option<Rc<str>> {
        match &self.0.borrow().kind {
            ObjectKind::Function(data) => Some(data.name.clone()),
            _ => None,
        }
    }

    /// The wrapped primitive for `Boolean`/`Number`/`String`/`Symbol`/`BigInt` wrappers
    pub fn primitive_value(&self) -> Option<Value> {
        match &self.0.borrow().kind {
            ObjectKind::Boolean(b) => Some(Value::Boolean(*b)),
            ObjectKind::Number(n) => Some(Value::Number(*n)),
            ObjectKind::String(s) => Some(Value::String(s.clone())),
            ObjectKind::Symbol(s) => Some(Value::Symbol(s.clone())),
            ObjectKind::BigInt(b) => Some(Value::BigInt(b.clone())),
            _ => None,
        }
    }

    /// Tag used by `Object.prototype.toString` and debug output
    pub fn class_name(&self) -> &'static str {
        match &self.0.borrow().kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Symbol(_) => "Symbol",
            ObjectKind::BigInt(_) => "BigInt",
        }
    }

    /// The array `length`, for arrays
    pub fn array_length(&self) -> Option<u32> {
        match &self.0.borrow().kind {
            ObjectKind::Array(elements) => Some(elements.len()),
            _ => None,
        }
    }

    /// Snapshot of the present array elements, in index order
    pub fn array_entries(&self) -> Option<Vec<(u32, Value)>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(elements) => {
                Some(elements.iter().map(|(i, v)| (i, v.clone())).collect())
            }
            _ => None,
        }
    }

    /// Append to an array, returning the new length
    pub fn array_push(&self, value: Value) -> HostResult<u32> {
        match &mut self.0.borrow_mut().kind {
            ObjectKind::Array(elements) => elements.push(value),
            _ => Err(HostError::type_error("push target is not an array")),
        }
    }

    /// `[[GetOwnProperty]]`, returning only the value
    pub fn get_own(&self, key: &PropertyKey) -> Option<Value> {
        let data = self.0.borrow();
        match &data.kind {
            ObjectKind::Array(elements) => {
                if key.is_length() {
                    return Some(Value::Number(f64::from(elements.len())));
                }
                if let Some(index) = key.array_index() {
                    return elements.get(index as u32).cloned();
                }
            }
            ObjectKind::String(s) => {
                if key.is_length() {
                    return Some(Value::Number(s.encode_utf16().count() as f64));
                }
                if let Some(index) = key.array_index() {
                    return s
                        .encode_utf16()
                        .nth(index)
                        .map(|unit| Value::from(String::from_utf16_lossy(&[unit])));
                }
            }
            _ => {}
        }
        data.properties.get(key).cloned()
    }

    /// `[[HasOwnProperty]]`
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.get_own(key).is_some()
    }

    /// Create or overwrite an own data property
    pub fn set_own(&self, key: PropertyKey, value: Value) -> HostResult<()> {
        let mut data = self.0.borrow_mut();
        match &mut data.kind {
            ObjectKind::Array(elements) => {
                if key.is_length() {
                    elements.set_len(to_array_length(&value)?);
                    return Ok(());
                }
                if let Some(index) = key.array_index() {
                    elements.set(index as u32, value);
                    return Ok(());
                }
            }
            ObjectKind::String(s) => {
                // index and length slots of a string wrapper are read-only
                let len = s.encode_utf16().count();
                if key.is_length() || key.array_index().is_some_and(|i| i < len) {
                    return Ok(());
                }
            }
            _ => {}
        }
        data.properties.insert(key, value);
        Ok(())
    }

    /// Own non-index properties in insertion order
    pub fn properties(&self) -> Vec<(PropertyKey, Value)> {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Validate a value assigned to an array `length`
pub fn to_array_length(value: &Value) -> HostResult<u32> {
    match *value {
        Value::Number(n) if n >= 0.0 && n.trunc() == n && n <= f64::from(u32::MAX) => Ok(n as u32),
        _ => Err(HostError::range_error("Invalid array length")),
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function_name() {
            Some(name) if !name.is_empty() => write!(f, "[Function: {}]", name),
            Some(_) => write!(f, "[Function (anonymous)]"),
            None => write!(f, "[object {}]", self.class_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index_keys() {
        assert_eq!(PropertyKey::from("0").array_index(), Some(0));
        assert_eq!(PropertyKey::from("42").array_index(), Some(42));
        assert_eq!(PropertyKey::from("01").array_index(), None);
        assert_eq!(PropertyKey::from("-1").array_index(), None);
        assert_eq!(PropertyKey::from("4294967295").array_index(), None);
        assert_eq!(PropertyKey::from("length").array_index(), None);
    }

    #[test]
    fn test_array_length_and_indices() {
        let arr = JsObject::new(ObjectKind::Array(ArrayElements::from_vec(vec![Value::from(1)])), None);
        assert_eq!(arr.get_own(&"length".into()).and_then(|v| v.as_number()), Some(1.0));
        arr.set_own("3".into(), Value::from(4)).unwrap();
        assert_eq!(arr.get_own(&"length".into()).and_then(|v| v.as_number()), Some(4.0));
        assert!(arr.get_own(&"1".into()).unwrap().is_undefined());
        arr.set_own("length".into(), Value::from(1)).unwrap();
        assert!(!arr.has_own(&"3".into()));
        assert!(arr.set_own("length".into(), Value::from(-1)).is_err());
    }

    #[test]
    fn test_far_index_stays_sparse() {
        let mut elements = ArrayElements::from_vec(vec![Value::from(0)]);
        elements.set(4_000_000_000, Value::from(1));
        assert_eq!(elements.len(), 4_000_000_001);
        assert_eq!(elements.dense.len(), 1);
        assert!(elements.get(2).is_none());
        assert_eq!(elements.get(4_000_000_000).and_then(Value::as_number), Some(1.0));
        let present: Vec<u32> = elements.iter().map(|(i, _)| i).collect();
        assert_eq!(present, vec![0, 4_000_000_000]);

        elements.set_len(10);
        assert_eq!(elements.len(), 10);
        assert!(elements.get(4_000_000_000).is_none());
    }

    #[test]
    fn test_dense_growth_absorbs_sparse_entries() {
        let mut elements = ArrayElements::default();
        elements.set(3000, Value::from(3));
        elements.set(1500, Value::from(2));
        elements.set(500, Value::from(1));
        assert_eq!(elements.dense.len(), 501);
        elements.set(1000, Value::from(4));
        elements.set(2000, Value::from(5));
        assert_eq!(elements.dense.len(), 2001);
        assert_eq!(elements.get(1500).and_then(Value::as_number), Some(2.0));
        assert_eq!(elements.sparse.keys().copied().collect::<Vec<_>>(), vec![3000]);
        assert_eq!(elements.len(), 3001);
    }

    #[test]
    fn test_huge_length_allocates_nothing() {
        let arr = JsObject::new(ObjectKind::Array(ArrayElements::default()), None);
        arr.set_own("length".into(), Value::from(4_000_000_000u32)).unwrap();
        assert_eq!(arr.array_length(), Some(4_000_000_000));
        assert_eq!(arr.array_entries().map(|e| e.len()), Some(0));
        arr.set_own("4294967294".into(), Value::from(1)).unwrap();
        assert_eq!(arr.array_length(), Some(u32::MAX));
        assert!(arr.array_push(Value::from(2)).is_err());
    }

    #[test]
    fn test_string_wrapper_slots() {
        let s = JsObject::new(ObjectKind::String(Rc::from("hé")), None);
        assert_eq!(s.get_own(&"length".into()).and_then(|v| v.as_number()), Some(2.0));
        assert_eq!(
            s.get_own(&"1".into()).and_then(|v| v.as_str().map(str::to_string)),
            Some("é".to_string())
        );
        s.set_own("0".into(), Value::from("x")).unwrap();
        assert_eq!(
            s.get_own(&"0".into()).and_then(|v| v.as_str().map(str::to_string)),
            Some("h".to_string())
        );
    }

    #[test]
    fn test_identity() {
        let a = JsObject::new(ObjectKind::Ordinary, None);
        let b = JsObject::new(ObjectKind::Ordinary, None);
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.addr(), b.addr());
    }
}
