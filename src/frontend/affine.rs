//! Affine expressions over named variables.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::ConstraintKind;

/// `Σ coeff·name + constant`, with no zero coefficients stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affine {
    terms: BTreeMap<String, i64>,
    constant: i64,
}

impl Affine {
    pub fn constant(value: i64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn var(name: &str) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(name.to_string(), 1);
        Self { terms, constant: 0 }
    }

    pub fn constant_value(&self) -> i64 {
        self.constant
    }

    /// Coefficient of `name` (0 if absent).
    pub fn coeff(&self, name: &str) -> i64 {
        self.terms.get(name).copied().unwrap_or(0)
    }

    /// Returns the constant value if the expression has no variables.
    pub fn as_constant(&self) -> Option<i64> {
        self.terms.is_empty().then_some(self.constant)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, i64)> {
        self.terms.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// `self + other`, `None` on overflow.
    pub fn add(&self, other: &Affine) -> Option<Affine> {
        let mut result = self.clone();
        for (name, &c) in &other.terms {
            let entry = result.terms.entry(name.clone()).or_insert(0);
            *entry = entry.checked_add(c)?;
            if *entry == 0 {
                result.terms.remove(name);
            }
        }
        result.constant = result.constant.checked_add(other.constant)?;
        Some(result)
    }

    /// `k · self`, `None` on overflow.
    pub fn scale(&self, k: i64) -> Option<Affine> {
        if k == 0 {
            return Some(Affine::default());
        }
        let mut terms = BTreeMap::new();
        for (name, &c) in &self.terms {
            terms.insert(name.clone(), c.checked_mul(k)?);
        }
        Some(Affine {
            terms,
            constant: self.constant.checked_mul(k)?,
        })
    }

    pub fn sub(&self, other: &Affine) -> Option<Affine> {
        self.add(&other.scale(-1)?)
    }

    pub fn add_constant(&self, k: i64) -> Option<Affine> {
        self.add(&Affine::constant(k))
    }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, c) in self.terms() {
            let sign = if c < 0 { "-" } else { "+" };
            if first {
                if c < 0 {
                    write!(f, "-")?;
                }
            } else {
                write!(f, " {} ", sign)?;
            }
            if c.unsigned_abs() != 1 {
                write!(f, "{}", c.unsigned_abs())?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0 {
            write!(f, " {} {}", if self.constant < 0 { "-" } else { "+" }, self.constant.unsigned_abs())
        } else {
            Ok(())
        }
    }
}

/// `expr = 0` or `expr >= 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffineConstraint {
    pub kind: ConstraintKind,
    pub expr: Affine,
}

impl AffineConstraint {
    pub fn ge_zero(expr: Affine) -> Self {
        Self {
            kind: ConstraintKind::Inequality,
            expr,
        }
    }

    pub fn eq_zero(expr: Affine) -> Self {
        Self {
            kind: ConstraintKind::Equality,
            expr,
        }
    }
}

impl fmt::Display for AffineConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let i = Affine::var("i");
        let n = Affine::var("N");
        let e = n.sub(&i).unwrap().add_constant(-1).unwrap();
        assert_eq!(e.coeff("i"), -1);
        assert_eq!(e.coeff("N"), 1);
        assert_eq!(e.constant_value(), -1);
        assert_eq!(e.to_string(), "N - i - 1");

        let z = e.sub(&e).unwrap();
        assert_eq!(z.as_constant(), Some(0));
        assert_eq!(z.terms().count(), 0);
    }

    #[test]
    fn test_scale() {
        let e = Affine::var("i").add_constant(3).unwrap().scale(-2).unwrap();
        assert_eq!(e.to_string(), "-2i - 6");
        assert_eq!(e.scale(0).unwrap(), Affine::default());
        assert!(Affine::constant(i64::MAX).scale(2).is_none());
    }

    #[test]
    fn test_constraint_display() {
        let c = AffineConstraint::ge_zero(Affine::var("j"));
        assert_eq!(c.to_string(), "j >= 0");
        let c = AffineConstraint::eq_zero(Affine::constant(0));
        assert_eq!(c.to_string(), "0 = 0");
    }
}
