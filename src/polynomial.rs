//! Multivariate polynomials with exact rational coefficients.
//!
//! A [`Polynomial`] is the closed-form count of the inner levels of a loop
//! nest, as a function of the outer iterators and the parameters. Summing it
//! over one more level uses the power sums `S_d(x) = Σ_{t=1}^{x} t^d`:
//!
//! ```text
//! Σ_{t=lo}^{hi} t^d = S_d(hi) - S_d(lo - 1)
//! ```
//!
//! The identity holds for every `hi >= lo - 1`, and in particular yields zero
//! for the empty range `hi = lo - 1`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Exponent of every variable.
type Monomial = Vec<u32>;

/// Polynomial in `nvars` variables `x_0 .. x_{nvars-1}`.
///
/// # Examples
///
/// ```
/// use num_bigint::BigInt;
/// use num_rational::BigRational;
/// use flops_rs::polynomial::Polynomial;
///
/// // Σ_{i=0}^{N-1} (i + 1), over the variables [i, N]
/// let i_plus_one = Polynomial::var(2, 0) + Polynomial::one(2);
/// let last = Polynomial::var(2, 1) - Polynomial::one(2);
/// let count = i_plus_one.sum_over(0, &Polynomial::zero(2), &last);
///
/// let point = [BigInt::from(0), BigInt::from(10)];
/// assert_eq!(count.eval(&point), BigRational::from_integer(55.into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    nvars: usize,
    /// Non-zero coefficients only.
    terms: BTreeMap<Monomial, BigRational>,
}

impl Polynomial {
    pub fn zero(nvars: usize) -> Self {
        Self {
            nvars,
            terms: BTreeMap::new(),
        }
    }

    pub fn one(nvars: usize) -> Self {
        Self::constant(nvars, BigRational::one())
    }

    pub fn constant(nvars: usize, value: BigRational) -> Self {
        let mut p = Self::zero(nvars);
        p.add_term(vec![0; nvars], value);
        p
    }

    pub fn integer(nvars: usize, value: BigInt) -> Self {
        Self::constant(nvars, BigRational::from_integer(value))
    }

    /// The variable `x_k`.
    pub fn var(nvars: usize, k: usize) -> Self {
        let mut m = vec![0; nvars];
        m[k] = 1;
        let mut p = Self::zero(nvars);
        p.add_term(m, BigRational::one());
        p
    }

    /// The affine form `Σ coeffs[v]·x_v + constant`, over `coeffs.len()` variables.
    pub fn affine(coeffs: &[BigInt], constant: &BigInt) -> Self {
        let nvars = coeffs.len();
        let mut p = Self::integer(nvars, constant.clone());
        for (k, c) in coeffs.iter().enumerate() {
            if !c.is_zero() {
                let mut m = vec![0; nvars];
                m[k] = 1;
                p.add_term(m, BigRational::from_integer(c.clone()));
            }
        }
        p
    }

    pub fn num_vars(&self) -> usize {
        self.nvars
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// The value of a polynomial without variables.
    pub fn as_constant(&self) -> Option<BigRational> {
        let mut value = BigRational::zero();
        for (m, c) in &self.terms {
            if m.iter().any(|&e| e != 0) {
                return None;
            }
            value += c;
        }
        Some(value)
    }

    fn add_term(&mut self, m: Monomial, c: BigRational) {
        if c.is_zero() {
            return;
        }
        match self.terms.entry(m) {
            Entry::Vacant(e) => {
                e.insert(c);
            }
            Entry::Occupied(mut e) => {
                *e.get_mut() += c;
                if e.get().is_zero() {
                    e.remove();
                }
            }
        }
    }

    pub fn scale(&self, factor: &BigRational) -> Self {
        let mut out = Self::zero(self.nvars);
        for (m, c) in &self.terms {
            out.add_term(m.clone(), c * factor);
        }
        out
    }

    pub fn pow(&self, e: u32) -> Self {
        let mut acc = Self::one(self.nvars);
        for _ in 0..e {
            acc = &acc * self;
        }
        acc
    }

    /// Coefficients of `x_k^0, x_k^1, ...`, none of which mentions `x_k`.
    fn coefficients_in(&self, k: usize) -> Vec<Polynomial> {
        let mut out: Vec<Polynomial> = Vec::new();
        for (m, c) in &self.terms {
            let d = m[k] as usize;
            if out.len() <= d {
                out.resize(d + 1, Self::zero(self.nvars));
            }
            let mut m = m.clone();
            m[k] = 0;
            out[d].add_term(m, c.clone());
        }
        out
    }

    /// The univariate polynomial `Σ coeffs[e]·y^e` at `y = arg` (Horner).
    fn compose(coeffs: &[BigRational], arg: &Polynomial) -> Polynomial {
        let mut acc = Polynomial::zero(arg.nvars);
        for c in coeffs.iter().rev() {
            acc = &(&acc * arg) + &Polynomial::constant(arg.nvars, c.clone());
        }
        acc
    }

    /// `Σ_{x_k = lo}^{hi} self`, where `lo` and `hi` do not mention `x_k`.
    ///
    /// Exact wherever `hi >= lo - 1`.
    pub fn sum_over(&self, k: usize, lo: &Polynomial, hi: &Polynomial) -> Polynomial {
        let below = lo - &Polynomial::one(self.nvars);
        let mut sum = Polynomial::zero(self.nvars);
        for (d, c) in self.coefficients_in(k).iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            let s = power_sum(d as u32);
            let diff = &Self::compose(&s, hi) - &Self::compose(&s, &below);
            sum = &sum + &(c * &diff);
        }
        sum
    }

    /// Fixes the first `values.len()` variables.
    pub fn partial_eval(&self, values: &[BigInt]) -> Polynomial {
        let mut out = Self::zero(self.nvars);
        for (m, c) in &self.terms {
            let mut factor = BigInt::one();
            let mut rest = m.clone();
            for (v, x) in values.iter().enumerate() {
                if m[v] > 0 {
                    factor *= x.pow(m[v]);
                    rest[v] = 0;
                }
            }
            out.add_term(rest, c * BigRational::from_integer(factor));
        }
        out
    }

    /// Value at a full point, one value per variable.
    pub fn eval(&self, values: &[BigInt]) -> BigRational {
        debug_assert_eq!(values.len(), self.nvars);
        let mut value = BigRational::zero();
        for (m, c) in &self.terms {
            let mut factor = BigInt::one();
            for (&e, x) in m.iter().zip(values) {
                if e > 0 {
                    factor *= x.pow(e);
                }
            }
            value += c * BigRational::from_integer(factor);
        }
        value
    }

    /// Renders with `names[v]` for `x_v`, highest monomials first.
    pub fn display<'a>(&'a self, names: &'a [String]) -> PolynomialDisplay<'a> {
        PolynomialDisplay { poly: self, names }
    }
}

/// Coefficients of `S_d(x) = Σ_{t=1}^{x} t^d`, lowest power first.
///
/// Built by the recurrence
/// `(d+1)·S_d(x) = (x+1)^{d+1} - 1 - Σ_{j<d} C(d+1, j)·S_j(x)`.
pub fn power_sum(d: u32) -> Vec<BigRational> {
    let d = d as usize;
    let mut sums: Vec<Vec<BigRational>> = Vec::with_capacity(d + 1);
    for n in 0..=d {
        let binom = binomials(n + 1);
        let mut s: Vec<BigRational> = binom.iter().cloned().map(BigRational::from_integer).collect();
        s[0] -= BigRational::one();
        for (j, prev) in sums.iter().enumerate() {
            let c = BigRational::from_integer(binom[j].clone());
            for (e, a) in prev.iter().enumerate() {
                s[e] -= &c * a;
            }
        }
        let denom = BigRational::from_integer(BigInt::from(n + 1));
        for a in s.iter_mut() {
            *a /= &denom;
        }
        sums.push(s);
    }
    sums.pop().unwrap_or_default()
}

/// Row `m` of Pascal's triangle.
fn binomials(m: usize) -> Vec<BigInt> {
    let mut row = Vec::with_capacity(m + 1);
    let mut c = BigInt::one();
    for e in 0..=m {
        row.push(c.clone());
        c = c * BigInt::from(m - e) / BigInt::from(e + 1);
    }
    row
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        debug_assert_eq!(self.nvars, rhs.nvars);
        let mut out = self.clone();
        for (m, c) in &rhs.terms {
            out.add_term(m.clone(), c.clone());
        }
        out
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        debug_assert_eq!(self.nvars, rhs.nvars);
        let mut out = self.clone();
        for (m, c) in &rhs.terms {
            out.add_term(m.clone(), -c);
        }
        out
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        debug_assert_eq!(self.nvars, rhs.nvars);
        let mut out = Polynomial::zero(self.nvars);
        for (a, x) in &self.terms {
            for (b, y) in &rhs.terms {
                let m = a.iter().zip(b).map(|(i, j)| i + j).collect();
                out.add_term(m, x * y);
            }
        }
        out
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.scale(&-BigRational::one())
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: Polynomial) -> Polynomial {
        &self + &rhs
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: Polynomial) -> Polynomial {
        &self - &rhs
    }
}

impl Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Polynomial {
        &self * &rhs
    }
}

pub struct PolynomialDisplay<'a> {
    poly: &'a Polynomial,
    names: &'a [String],
}

impl fmt::Display for PolynomialDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return write!(f, "0");
        }
        for (n, (m, c)) in self.poly.terms.iter().rev().enumerate() {
            let vars: Vec<String> = m
                .iter()
                .enumerate()
                .filter(|&(_, &e)| e > 0)
                .map(|(v, &e)| {
                    let name = self.names.get(v).cloned().unwrap_or_else(|| format!("x{}", v));
                    if e == 1 {
                        name
                    } else {
                        format!("{}^{}", name, e)
                    }
                })
                .collect();
            let magnitude = c.abs();
            if n == 0 {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            if vars.is_empty() {
                write!(f, "{}", magnitude)?;
            } else if magnitude.is_one() {
                write!(f, "{}", vars.join("*"))?;
            } else {
                write!(f, "{}*{}", magnitude, vars.join("*"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    fn ints(xs: &[i64]) -> Vec<BigInt> {
        xs.iter().map(|&x| BigInt::from(x)).collect()
    }

    #[test]
    fn test_power_sum() {
        assert_eq!(power_sum(0), vec![q(0, 1), q(1, 1)]);
        assert_eq!(power_sum(1), vec![q(0, 1), q(1, 2), q(1, 2)]);
        assert_eq!(power_sum(2), vec![q(0, 1), q(1, 6), q(1, 2), q(1, 3)]);
        for d in 0..6u32 {
            let s = power_sum(d);
            for x in 0..8i64 {
                let expected: i64 = (1..=x).map(|t| t.pow(d)).sum();
                let p = Polynomial::compose(&s, &Polynomial::integer(0, BigInt::from(x)));
                assert_eq!(p.as_constant(), Some(q(expected, 1)), "S_{}({})", d, x);
            }
        }
    }

    #[test]
    fn test_arithmetic() {
        let x = Polynomial::var(2, 0);
        let y = Polynomial::var(2, 1);
        let p = &(&x + &y) * &(&x - &y);
        assert_eq!(p, &x.pow(2) - &y.pow(2));
        assert!((&p - &p).is_zero());
        assert_eq!(p.eval(&ints(&[5, 3])), q(16, 1));
        assert_eq!((-&x).eval(&ints(&[5, 3])), q(-5, 1));
    }

    #[test]
    fn test_sum_over_triangle() {
        // Σ_{i=0}^{N-1} Σ_{j=0}^{i} 1 over variables [i, j, N]
        let one = Polynomial::one(3);
        let zero = Polynomial::zero(3);
        let i = Polynomial::var(3, 0);
        let n = Polynomial::var(3, 2);
        let inner = one.sum_over(1, &zero, &i);
        assert_eq!(inner, &i + &one);
        let count = inner.sum_over(0, &zero, &(&n - &one));
        for v in 0..10i64 {
            assert_eq!(count.eval(&ints(&[0, 0, v])), q(v * (v + 1) / 2, 1));
        }
        assert_eq!(count.num_terms(), 2);
    }

    #[test]
    fn test_sum_over_empty_range() {
        // hi = lo - 1 sums to zero
        let p = Polynomial::var(1, 0).pow(3);
        let s = p.sum_over(0, &Polynomial::integer(1, 5.into()), &Polynomial::integer(1, 4.into()));
        assert_eq!(s.as_constant(), Some(q(0, 1)));
    }

    #[test]
    fn test_partial_eval() {
        // x*y + 2y over [x, y] with x = 3
        let x = Polynomial::var(2, 0);
        let y = Polynomial::var(2, 1);
        let p = &(&x * &y) + &y.scale(&q(2, 1));
        let fixed = p.partial_eval(&ints(&[3]));
        assert_eq!(fixed, y.scale(&q(5, 1)));
        assert_eq!(fixed.as_constant(), None);
        assert_eq!(p.partial_eval(&ints(&[3, 2])).as_constant(), Some(q(10, 1)));
    }

    #[test]
    fn test_display() {
        let names = vec!["i".to_string(), "N".to_string()];
        let n = Polynomial::var(2, 1);
        let p = &n.pow(2).scale(&q(1, 2)) + &n.scale(&q(-1, 2));
        assert_eq!(p.display(&names).to_string(), "1/2*N^2 - 1/2*N");
        let p = &(&Polynomial::var(2, 0) * &n) + &Polynomial::integer(2, BigInt::from(-3));
        assert_eq!(p.display(&names).to_string(), "i*N - 3");
        assert_eq!(Polynomial::zero(2).display(&names).to_string(), "0");
    }
}
