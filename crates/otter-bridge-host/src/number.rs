//! Numeric conversions with host semantics.
//!
//! Number-to-string formatting, string-to-number parsing and the
//! integer truncation helpers (`ToInt32`, `ToUint32`) used by coercions.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Num, ToPrimitive, Zero};

const TWO_32: f64 = 4_294_967_296.0;

/// ES2023 ToInt32 abstract operation.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ES2023 ToUint32 abstract operation.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    // fmod is exact, so the remainder is always an integer below 2^32
    n.trunc().rem_euclid(TWO_32) as u32
}

/// Format a number per `Number::toString(10)`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e3"
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
        out
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", (point - 1).abs())
        } else {
            format!("{first}.{rest}e{sign}{}", (point - 1).abs())
        }
    }
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

fn radix_prefix(s: &str) -> Option<(u32, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }
    match bytes[1] {
        b'x' | b'X' => Some((16, &s[2..])),
        b'o' | b'O' => Some((8, &s[2..])),
        b'b' | b'B' => Some((2, &s[2..])),
        _ => None,
    }
}

/// StringToNumber: parse a string the way the host's `Number(str)` does.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    if let Some((radix, digits)) = radix_prefix(trimmed) {
        if digits.is_empty() {
            return f64::NAN;
        }
        return BigInt::from_str_radix(digits, radix)
            .ok()
            .and_then(|b| b.to_f64())
            .unwrap_or(f64::NAN);
    }

    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    // Rust's float grammar also accepts "inf" and "nan", which the host does not
    let valid = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// StringToBigInt: `None` when the string is not a valid integer literal.
pub fn string_to_bigint(s: &str) -> Option<BigInt> {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return Some(BigInt::zero());
    }
    if let Some((radix, digits)) = radix_prefix(trimmed) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return BigInt::from_str_radix(digits, radix).ok();
    }
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned.is_empty() || !unsigned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    BigInt::from_str_radix(trimmed, 10).ok()
}

/// Compare a BigInt against a double without losing precision.
///
/// Returns `None` when `n` is NaN.
pub fn compare_bigint_number(b: &BigInt, n: f64) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;

    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if n == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let t = n.trunc();
    let bt = BigInt::from_f64(t)?;
    Some(match b.cmp(&bt) {
        Ordering::Equal if n > t => Ordering::Less,
        Ordering::Equal if n < t => Ordering::Greater,
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_int32() {
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::INFINITY), 0);
        assert_eq!(to_int32(3.7), 3);
        assert_eq!(to_int32(-3.7), -3);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(4294967296.0 + 5.0), 5);
    }

    #[test]
    fn test_to_uint32() {
        assert_eq!(to_uint32(-5.0), 4294967291);
        assert_eq!(to_uint32(-0.0), 0);
        assert_eq!(to_uint32(1e20), (1e20f64.rem_euclid(TWO_32)) as u32);
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-5.0), "-5");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(123.456), "123.456");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(1.5e-10), "1.5e-10");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number(".5"), 0.5);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("nan").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("-0x10").is_nan());
    }

    #[test]
    fn test_string_to_bigint() {
        assert_eq!(string_to_bigint("123"), Some(BigInt::from(123)));
        assert_eq!(string_to_bigint("-7"), Some(BigInt::from(-7)));
        assert_eq!(string_to_bigint("0xff"), Some(BigInt::from(255)));
        assert_eq!(string_to_bigint(" "), Some(BigInt::from(0)));
        assert_eq!(string_to_bigint("1.5"), None);
    }

    #[test]
    fn test_compare_bigint_number() {
        use std::cmp::Ordering;
        let five = BigInt::from(5);
        assert_eq!(compare_bigint_number(&five, 5.5), Some(Ordering::Less));
        assert_eq!(compare_bigint_number(&five, 5.0), Some(Ordering::Equal));
        assert_eq!(compare_bigint_number(&five, 4.9), Some(Ordering::Greater));
        assert_eq!(compare_bigint_number(&five, f64::NAN), None);
    }
}
