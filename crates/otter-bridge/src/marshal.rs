//! Boundary marshaling helpers
//!
//! Numeric narrowing/widening between guest integer types and host values,
//! string transcoding for explicit-length guest spans, and argument-array
//! unpacking.
//!
//! ## Numeric rules
//!
//! - 32-bit extraction from a BigInt keeps the low 32 bits (two's
//!   complement), never routing through a double.
//! - 32-bit extraction from anything else uses ToInt32 / ToUint32.
//! - 64-bit extraction from a non-BigInt truncates toward zero, then wraps
//!   to 64 bits; non-finite inputs become 0.
//! - Unsigned 64-bit extraction clamps negatives to 0.

use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, One, Signed};
use smallvec::SmallVec;

use otter_bridge_host::number::{to_int32, to_uint32};
use otter_bridge_host::{HostError, HostResult, Realm, Value, ops};

use crate::handle::Handle;
use crate::table::HandleTable;

/// Arguments unpacked from a guest argument array
pub type ArgList = SmallVec<[Value; 8]>;

/// Low 64 bits of `n` in two's complement
pub fn bigint_low_u64(n: &BigInt) -> u64 {
    let (sign, digits) = n.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0);
    match sign {
        Sign::Minus => low.wrapping_neg(),
        _ => low,
    }
}

/// `BigInt.asIntN(64, n)`
pub fn bigint_as_i64(n: &BigInt) -> i64 {
    bigint_low_u64(n) as i64
}

/// `BigInt.asIntN(32, n)`
pub fn bigint_as_i32(n: &BigInt) -> i32 {
    bigint_low_u64(n) as u32 as i32
}

/// `BigInt.asUintN(32, n)`
pub fn bigint_as_u32(n: &BigInt) -> u32 {
    bigint_low_u64(n) as u32
}

/// Widen an unsigned 64-bit value that arrived through a signed carrier
///
/// A carrier that reads negative is shifted up by 2^64, so the result is
/// always in `[0, 2^64 - 1]`.
pub fn biguint_from_carrier(carrier: i64) -> BigInt {
    let n = BigInt::from(carrier);
    if n.is_negative() {
        n + (BigInt::one() << 64)
    } else {
        n
    }
}

fn truncated_bigint(n: f64) -> Option<BigInt> {
    if !n.is_finite() {
        return None;
    }
    BigInt::from_f64(n.trunc())
}

/// Guest `int` view of a host value
pub fn value_to_i32(realm: &Realm, value: &Value) -> HostResult<i32> {
    match value {
        Value::BigInt(b) => Ok(bigint_as_i32(b)),
        other => Ok(to_int32(ops::to_number(realm, other)?)),
    }
}

/// Guest `unsigned int` view of a host value
pub fn value_to_u32(realm: &Realm, value: &Value) -> HostResult<u32> {
    match value {
        Value::BigInt(b) => Ok(bigint_as_u32(b)),
        other => Ok(to_uint32(ops::to_number(realm, other)?)),
    }
}

/// Guest `long long` view of a host value
pub fn value_to_i64(realm: &Realm, value: &Value) -> HostResult<i64> {
    match value {
        Value::BigInt(b) => Ok(bigint_as_i64(b)),
        other => {
            let n = ops::number_conversion(realm, other)?;
            let wide = truncated_bigint(n).ok_or_else(|| {
                HostError::range_error(format!("{} cannot be converted to a BigInt", n))
            })?;
            Ok(bigint_as_i64(&wide))
        }
    }
}

/// Guest `unsigned long long` view of a host value, clamping negatives to 0
pub fn value_to_u64(realm: &Realm, value: &Value) -> HostResult<u64> {
    match value {
        Value::BigInt(b) if b.is_negative() => Ok(0),
        Value::BigInt(b) => Ok(bigint_low_u64(b)),
        other => {
            let n = ops::number_conversion(realm, other)?.trunc();
            // NaN fails the comparison and clamps like a negative
            let n = if n >= 0.0 { n } else { 0.0 };
            let wide = truncated_bigint(n).ok_or_else(|| {
                HostError::range_error(format!("{} cannot be converted to a BigInt", n))
            })?;
            Ok(bigint_low_u64(&wide))
        }
    }
}

/// Guest `double` view of a host value
pub fn value_to_f64(realm: &Realm, value: &Value) -> HostResult<f64> {
    ops::number_conversion(realm, value)
}

fn until_nul<T: Copy + PartialEq + Default>(units: &[T]) -> &[T] {
    let end = units
        .iter()
        .position(|u| *u == T::default())
        .unwrap_or(units.len());
    &units[..end]
}

/// Decode an explicit-length UTF-8 span
///
/// Stops at an embedded NUL; invalid sequences become U+FFFD.
pub fn decode_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(until_nul(bytes)).into_owned()
}

/// Decode an explicit-length UTF-16 span (same rules as [`decode_utf8`])
pub fn decode_utf16(units: &[u16]) -> String {
    String::from_utf16_lossy(until_nul(units))
}

/// UTF-8 bytes followed by a single NUL
pub fn encode_utf8_nul(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// Little-endian UTF-16 bytes followed by a two-byte NUL
pub fn encode_utf16_nul(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Interpret a stored array element as a handle
///
/// Only exact integers in `u32` range name a handle; anything else
/// resolves to nothing.
pub fn handle_from_value(value: &Value) -> Option<Handle> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Some(Handle(*n as u32))
        }
        _ => None,
    }
}

/// The value stored in an array to reference `handle`
pub fn handle_to_value(handle: Handle) -> Value {
    Value::Number(f64::from(handle.0))
}

/// Most arguments a single host call accepts
pub const MAX_ARGUMENTS: u32 = 65_535;

/// Resolve an argument array: each element is a handle, resolved in turn
///
/// Holes and elements that do not name a live handle become `undefined`.
pub fn unpack_arguments(table: &HandleTable, argv: &Value) -> HostResult<ArgList> {
    let (len, entries) = argv
        .as_object()
        .and_then(|o| Some((o.array_length()?, o.array_entries()?)))
        .ok_or_else(|| {
            HostError::type_error(format!(
                "argument list must be an array, got {}",
                ops::describe(argv)
            ))
        })?;
    if len > MAX_ARGUMENTS {
        return Err(HostError::range_error(format!(
            "Too many arguments in function call ({})",
            len
        )));
    }
    let mut args: ArgList = SmallVec::from_elem(Value::Undefined, len as usize);
    for (index, element) in entries {
        if let Some(value) = handle_from_value(&element).and_then(|h| table.resolve(h)) {
            args[index as usize] = value;
        }
    }
    Ok(args)
}
