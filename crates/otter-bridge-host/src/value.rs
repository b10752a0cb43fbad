//! Host values
//!
//! A tagged variant over every datum the host can represent. Primitives are
//! stored inline (strings and BigInts behind `Rc`), composites are shared
//! references to [`JsObject`] cells.
//!
//! ## Identity
//!
//! [`Value::identity_key`] projects a value onto the equivalence used by
//! keyed collections (SameValueZero): primitives compare by value, symbols
//! and objects by reference.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::BigInt;

use crate::number::number_to_string;
use crate::object::JsObject;

/// A host value
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Double-precision number
    Number(f64),
    /// Arbitrary-precision integer
    BigInt(Rc<BigInt>),
    /// Immutable string
    String(Rc<str>),
    /// Symbol (reference identity)
    Symbol(Symbol),
    /// Any object, including arrays, functions and errors
    Object(JsObject),
}

struct SymbolData {
    description: Option<Rc<str>>,
}

/// A unique symbol. Two symbols are equal only if they are the same allocation.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolData>);

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: Option<&str>) -> Self {
        Self(Rc::new(SymbolData {
            description: description.map(Rc::from),
        }))
    }

    /// The description passed at creation time
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Stable address used for identity hashing
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// `Symbol(desc)` rendering used by `String(sym)`
    pub fn descriptive_string(&self) -> String {
        format!("Symbol({})", self.description().unwrap_or(""))
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptive_string())
    }
}

/// SameValueZero projection of a value, suitable as a hash key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Booleans by value
    Boolean(bool),
    /// Canonical bit pattern (one NaN, no negative zero)
    Number(u64),
    /// BigInts by value
    BigInt(Rc<BigInt>),
    /// Strings by content
    String(Rc<str>),
    /// Symbols by address
    Symbol(usize),
    /// Objects by address
    Object(usize),
}

impl Value {
    /// Create a string value
    pub fn string(s: &str) -> Self {
        Self::String(Rc::from(s))
    }

    /// Create a BigInt value
    pub fn bigint(b: impl Into<BigInt>) -> Self {
        Self::BigInt(Rc::new(b.into()))
    }

    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Check for an object of any kind
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Borrow the object, if any
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Primitive number payload
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Primitive boolean payload
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Primitive string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Primitive BigInt payload
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Self::BigInt(b) => Some(b),
            _ => None,
        }
    }

    /// Callable objects only
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(JsObject::is_callable)
    }

    /// The `typeof` tag
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Object(o) if o.is_callable() => "function",
            Self::Object(_) => "object",
        }
    }

    /// Key under which keyed collections deduplicate this value
    pub fn identity_key(&self) -> IdentityKey {
        match self {
            Self::Undefined => IdentityKey::Undefined,
            Self::Null => IdentityKey::Null,
            Self::Boolean(b) => IdentityKey::Boolean(*b),
            Self::Number(n) => {
                let canonical = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                IdentityKey::Number(canonical.to_bits())
            }
            Self::BigInt(b) => IdentityKey::BigInt(b.clone()),
            Self::String(s) => IdentityKey::String(s.clone()),
            Self::Symbol(s) => IdentityKey::Symbol(s.addr()),
            Self::Object(o) => IdentityKey::Object(o.addr()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<JsObject> for Value {
    fn from(o: JsObject) -> Self {
        Self::Object(o)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", number_to_string(*n)),
            Self::BigInt(b) => write!(f, "{}n", b),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Symbol(s) => write!(f, "{:?}", s),
            Self::Object(o) => write!(f, "{:?}", o),
        }
    }
}
