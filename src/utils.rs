use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// [Greatest common divisor][gcd] of two `i64` values.
///
/// ```text
/// gcd(a, 0) = |a|
/// gcd(a, b) = gcd(b, a mod b)
/// ```
///
/// The result is unsigned: `gcd(i64::MIN, 0)` is `2^63`, which has no `i64` form.
///
/// [gcd]: https://en.wikipedia.org/wiki/Euclidean_algorithm
pub fn gcd(a: i64, b: i64) -> u64 {
    gcd_unsigned(a.unsigned_abs(), b.unsigned_abs())
}

fn gcd_unsigned(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// GCD of all values in the slice, `0` for an empty or all-zero slice.
pub fn gcd_many(values: &[i64]) -> u64 {
    values.iter().fold(0, |acc, &v| gcd_unsigned(acc, v.unsigned_abs()))
}

/// GCD of [`BigInt`] values (non-negative), `0` for an empty or all-zero slice.
pub fn gcd_big(values: &[BigInt]) -> BigInt {
    let mut acc = BigInt::zero();
    for v in values {
        let mut b = v.abs();
        while !b.is_zero() {
            let t = &acc % &b;
            acc = b;
            b = t;
        }
    }
    acc
}

/// Floor division for `i64` (rounds towards negative infinity).
///
/// Returns `None` when `d == 0` or on overflow.
pub fn floor_div(n: i64, d: i64) -> Option<i64> {
    let q = n.checked_div(d)?;
    if (n % d != 0) && ((n < 0) != (d < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Floor division for [`BigInt`] (rounds towards negative infinity).
///
/// # Panics
///
/// Panics if `d` is zero.
pub fn floor_div_big(n: &BigInt, d: &BigInt) -> BigInt {
    let q = n / d;
    let r = n % d;
    if !r.is_zero() && (r.is_negative() != d.is_negative()) {
        q - 1
    } else {
        q
    }
}

/// Ceiling division for [`BigInt`] (rounds towards positive infinity).
///
/// # Panics
///
/// Panics if `d` is zero.
pub fn ceil_div_big(n: &BigInt, d: &BigInt) -> BigInt {
    -floor_div_big(&-n, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(0, 0), 0);
        assert_eq!(gcd(7, 0), 7);
        assert_eq!(gcd(0, -7), 7);
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(-12, 18), 6);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd_many(&[]), 0);
        assert_eq!(gcd_many(&[4, -6, 10]), 2);
        assert_eq!(gcd_many(&[0, 0, 3]), 3);
    }

    #[test]
    fn test_gcd_extremes() {
        assert_eq!(gcd(i64::MIN, 0), 1 << 63);
        assert_eq!(gcd(i64::MIN, i64::MIN), 1 << 63);
        assert_eq!(gcd(i64::MIN, 6), 2);
        assert_eq!(gcd(i64::MAX, i64::MIN), 1);
        assert_eq!(gcd_many(&[i64::MIN, 0]), 1 << 63);
        assert!(i64::try_from(gcd_many(&[i64::MIN])).is_err());
    }

    #[test]
    fn test_gcd_big() {
        let b = |v: i64| BigInt::from(v);
        assert_eq!(gcd_big(&[]), b(0));
        assert_eq!(gcd_big(&[b(0), b(0)]), b(0));
        assert_eq!(gcd_big(&[b(-12), b(18), b(0)]), b(6));
        assert_eq!(gcd_big(&[b(i64::MIN)]), -b(i64::MIN));
    }

    #[test]
    fn test_floor_div() {
        //   n  d  floor
        // ------------
        //   7  2   3
        //  -7  2  -4
        //   7 -2  -4
        //  -7 -2   3
        //   6  3   2
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(-7, -2), Some(3));
        assert_eq!(floor_div(6, 3), Some(2));
        assert_eq!(floor_div(1, 0), None);
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn test_big_div() {
        let b = |v: i64| BigInt::from(v);
        assert_eq!(floor_div_big(&b(-7), &b(2)), b(-4));
        assert_eq!(floor_div_big(&b(7), &b(2)), b(3));
        assert_eq!(ceil_div_big(&b(7), &b(2)), b(4));
        assert_eq!(ceil_div_big(&b(-7), &b(2)), b(-3));
        assert_eq!(ceil_div_big(&b(6), &b(-3)), b(-2));
        assert_eq!(ceil_div_big(&b(0), &b(5)), b(0));
    }
}
