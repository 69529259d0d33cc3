use std::cmp::Ordering;

use fraction::{BigFraction, BigUint};
use serde_json::{Number, Value};

// Exponents past this are clamped; the resulting magnitudes are far outside
// anything representable in an instance worth validating.
const MAX_EXP: i64 = 1_000_000;

/// Converts the decimal lexeme of `n` into an exact rational.
///
/// serde_json with `arbitrary_precision` renders the original literal, so
/// `0.1` becomes exactly 1/10 rather than the nearest binary float.
pub(crate) fn to_fraction(n: &Number) -> BigFraction {
    let s = n.to_string();
    let (neg, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };

    let (mantissa, exp) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], s[i + 1..].parse::<i64>().unwrap_or(0)),
        None => (s, 0),
    };
    let (int, frac) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
        None => (mantissa, ""),
    };

    let mut digits = String::with_capacity(int.len() + frac.len());
    digits.push_str(int);
    digits.push_str(frac);
    let num: BigUint = digits.parse().unwrap_or_default();
    let zero = num == BigUint::default();

    let scale = (exp - frac.len() as i64).clamp(-MAX_EXP, MAX_EXP);
    let f = if scale >= 0 {
        BigFraction::new(num * pow10(scale as u32), BigUint::from(1u8))
    } else {
        BigFraction::new(num, pow10(-scale as u32))
    };
    // keep -0 and 0 identical
    if neg && !zero {
        -f
    } else {
        f
    }
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u8).pow(exp)
}

/// Reads a non-negative integer bound, tolerating forms like `2.0`.
pub(crate) fn as_usize(n: &Number) -> Option<usize> {
    if let Some(u) = n.as_u64() {
        return usize::try_from(u).ok();
    }
    let f = to_fraction(n);
    let zero = BigFraction::new(BigUint::from(0u8), BigUint::from(1u8));
    if f < zero {
        return None;
    }
    match (f.numer(), f.denom()) {
        (Some(num), Some(den)) if *den == BigUint::from(1u8) => {
            u64::try_from(num).ok().and_then(|u| usize::try_from(u).ok())
        }
        _ => None,
    }
}

/// whether `n` denotes a mathematical integer (`1.0` qualifies)
pub(crate) fn is_integer(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    matches!(to_fraction(n).denom(), Some(d) if *d == BigUint::from(1u8))
}

pub(crate) fn num_equals(n1: &Number, n2: &Number) -> bool {
    num_cmp(n1, n2) == Ordering::Equal
}

pub(crate) fn num_cmp(n1: &Number, n2: &Number) -> Ordering {
    if let (Some(n1), Some(n2)) = (n1.as_i64(), n2.as_i64()) {
        return n1.cmp(&n2);
    }
    if let (Some(n1), Some(n2)) = (n1.as_u64(), n2.as_u64()) {
        return n1.cmp(&n2);
    }
    // lexeme fractions are always rational, so partial_cmp cannot fail
    to_fraction(n1)
        .partial_cmp(&to_fraction(n2))
        .unwrap_or(Ordering::Equal)
}

/// exact-decimal test for the `multipleOf` keyword
pub(crate) fn multiple_of(n: &Number, of: &Number) -> bool {
    let quotient = to_fraction(n) / to_fraction(of);
    matches!(quotient.denom(), Some(d) if *d == BigUint::from(1u8))
}

/// Structural equality with canonical numeric comparison. serde_json treats
/// 1 and 1.0 as unequal, so Value::eq cannot be used.
pub(crate) fn equals(v1: &Value, v2: &Value) -> bool {
    match (v1, v2) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
        (Value::Number(n1), Value::Number(n2)) => num_equals(n1, n2),
        (Value::String(s1), Value::String(s2)) => s1 == s2,
        (Value::Array(arr1), Value::Array(arr2)) => {
            arr1.len() == arr2.len() && arr1.iter().zip(arr2).all(|(e1, e2)| equals(e1, e2))
        }
        (Value::Object(obj1), Value::Object(obj2)) => {
            if obj1.len() != obj2.len() {
                return false;
            }
            obj1.iter()
                .all(|(k1, v1)| matches!(obj2.get(k1), Some(v2) if equals(v1, v2)))
        }
        _ => false,
    }
}
