//! Translation of raw relation rows into typed constraint systems.
//!
//! The translator drops the leading indicator column of every raw row (see
//! [`model`][crate::model]) and replaces it with an explicit
//! [`ConstraintKind`]. Rows are partitioned into equalities and inequalities,
//! each group keeping source order. Columns are never reordered:
//!
//! ```text
//! raw:  [ ind | i_0 .. i_{n-1} | p_0 .. p_{m-1} | const ]
//! row:        [ i_0 .. i_{n-1} | p_0 .. p_{m-1} | const ]
//! ```
//!
//! # Preconditions
//!
//! Rows are assumed well formed: non-empty and of equal width
//! `1 + #iterators + #parameters + 1`. Malformed rows are a bug in the
//! producer of the model and are not diagnosed here.

use std::fmt::{self, Write};

use crate::model::Relation;
use crate::space::DimensionSpace;
use crate::types::{ConstraintKind, DimKind};

/// One affine constraint `coeffs · [i.., p.., 1] (= | >=) 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintRow {
    pub kind: ConstraintKind,
    pub coeffs: Vec<i64>,
}

impl ConstraintRow {
    pub fn new(kind: ConstraintKind, coeffs: Vec<i64>) -> Self {
        Self { kind, coeffs }
    }

    /// Decodes a raw row: the first entry is the indicator, the rest are coefficients.
    pub fn from_raw(raw: &[i64]) -> Self {
        let (indicator, coeffs) = raw.split_first().map_or((0, &[][..]), |(i, c)| (*i, c));
        Self {
            kind: ConstraintKind::from_indicator(indicator),
            coeffs: coeffs.to_vec(),
        }
    }

    /// Constant term (last column).
    pub fn constant(&self) -> i64 {
        self.coeffs.last().copied().unwrap_or(0)
    }

    /// Renders the constraint with the dimension labels of `space`.
    pub fn display<'a>(&'a self, space: &'a DimensionSpace) -> RowDisplay<'a> {
        RowDisplay { row: self, space }
    }
}

pub struct RowDisplay<'a> {
    row: &'a ConstraintRow,
    space: &'a DimensionSpace,
}

impl fmt::Display for RowDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_affine(&self.row.coeffs, self.space), self.row.kind)
    }
}

/// Formats `coeffs · [i.., p.., 1]` as an affine expression, e.g. `-i + N - 1`.
pub fn format_affine(coeffs: &[i64], space: &DimensionSpace) -> String {
    let mut terms: Vec<(i64, String)> = Vec::new();
    for pos in 0..space.num_set() {
        if let Some(&c) = coeffs.get(space.column(DimKind::Set, pos)) {
            terms.push((c, space.label(DimKind::Set, pos)));
        }
    }
    for pos in 0..space.num_params() {
        if let Some(&c) = coeffs.get(space.column(DimKind::Param, pos)) {
            terms.push((c, space.label(DimKind::Param, pos)));
        }
    }
    let constant = coeffs.get(space.constant_column()).copied().unwrap_or(0);

    let mut out = String::new();
    for (c, label) in terms.into_iter().filter(|(c, _)| *c != 0) {
        let magnitude = c.unsigned_abs();
        if out.is_empty() {
            if c < 0 {
                out.push('-');
            }
        } else {
            out.push_str(if c < 0 { " - " } else { " + " });
        }
        if magnitude != 1 {
            let _ = write!(out, "{}", magnitude);
        }
        out.push_str(&label);
    }
    if out.is_empty() {
        let _ = write!(out, "{}", constant);
    } else if constant != 0 {
        let _ = write!(out, " {} {}", if constant < 0 { '-' } else { '+' }, constant.unsigned_abs());
    }
    out
}

/// Equalities and inequalities of one iteration domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSystem {
    equalities: Vec<ConstraintRow>,
    inequalities: Vec<ConstraintRow>,
    num_iterators: usize,
}

impl ConstraintSystem {
    pub fn new(num_iterators: usize) -> Self {
        Self {
            equalities: Vec::new(),
            inequalities: Vec::new(),
            num_iterators,
        }
    }

    /// Translates a statement's raw relation.
    ///
    /// Every raw row ends up in exactly one group; none is dropped or re-typed.
    pub fn from_relation(relation: &Relation, num_iterators: usize) -> Self {
        let mut system = Self::new(num_iterators);
        for raw in relation.rows() {
            system.push(ConstraintRow::from_raw(raw));
        }
        system
    }

    pub fn push(&mut self, row: ConstraintRow) {
        match row.kind {
            ConstraintKind::Equality => self.equalities.push(row),
            ConstraintKind::Inequality => self.inequalities.push(row),
        }
    }

    pub fn equalities(&self) -> &[ConstraintRow] {
        &self.equalities
    }

    pub fn inequalities(&self) -> &[ConstraintRow] {
        &self.inequalities
    }

    pub fn num_iterators(&self) -> usize {
        self.num_iterators
    }

    pub fn num_rows(&self) -> usize {
        self.equalities.len() + self.inequalities.len()
    }

    /// All rows, equalities first.
    pub fn rows(&self) -> impl Iterator<Item = &ConstraintRow> {
        self.equalities.iter().chain(self.inequalities.iter())
    }

    /// Renders the system as `{ [i..] : c_1 and c_2 .. }` over `space`.
    pub fn display<'a>(&'a self, space: &'a DimensionSpace) -> SystemDisplay<'a> {
        SystemDisplay { system: self, space }
    }
}

pub struct SystemDisplay<'a> {
    system: &'a ConstraintSystem,
    space: &'a DimensionSpace,
}

impl fmt::Display for SystemDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = (0..self.space.num_params())
            .map(|k| self.space.label(DimKind::Param, k))
            .collect();
        let set: Vec<String> = (0..self.space.num_set())
            .map(|k| self.space.label(DimKind::Set, k))
            .collect();
        write!(f, "[{}] -> {{ [{}]", params.join(", "), set.join(", "))?;
        for (i, row) in self.system.rows().enumerate() {
            let sep = if i == 0 { " : " } else { " and " };
            write!(f, "{}{}", sep, row.display(self.space))?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(params: &[&str], iters: &[&str]) -> DimensionSpace {
        let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
        let iters: Vec<String> = iters.iter().map(|s| s.to_string()).collect();
        DimensionSpace::build(&params, iters.len(), Some(iters.as_slice()))
    }

    #[test]
    fn test_translate_preserves_rows() {
        // i - 1 = 0, i >= 0, -i + N - 1 >= 0, j >= 0
        let relation = Relation::from_rows(vec![
            vec![0, 1, 0, 0, -1],
            vec![1, 1, 0, 0, 0],
            vec![1, -1, 0, 1, -1],
            vec![1, 0, 1, 0, 0],
        ]);
        let system = ConstraintSystem::from_relation(&relation, 2);

        assert_eq!(system.equalities().len(), 1);
        assert_eq!(system.inequalities().len(), 3);
        assert_eq!(system.num_rows(), relation.num_rows());
        for row in system.rows() {
            assert_eq!(row.coeffs.len(), relation.num_columns() - 1);
            assert_eq!(row.coeffs.len(), 2 + 1 + 1);
        }
        // source order within the group, columns untouched
        assert_eq!(system.inequalities()[1].coeffs, vec![-1, 0, 1, -1]);
        assert_eq!(system.equalities()[0].coeffs, vec![1, 0, 0, -1]);
    }

    #[test]
    fn test_nonzero_indicator_is_inequality() {
        let relation = Relation::from_rows(vec![vec![7, 1, 0], vec![-1, 1, 0]]);
        let system = ConstraintSystem::from_relation(&relation, 1);
        assert_eq!(system.inequalities().len(), 2);
        assert!(system.equalities().is_empty());
    }

    #[test]
    fn test_empty_relation() {
        let system = ConstraintSystem::from_relation(&Relation::new(), 0);
        assert_eq!(system.num_rows(), 0);
        assert_eq!(system.num_iterators(), 0);
    }

    #[test]
    fn test_format_affine() {
        let s = space(&["N"], &["i", "j"]);
        assert_eq!(format_affine(&[-1, 0, 1, -1], &s), "-i + N - 1");
        assert_eq!(format_affine(&[2, -3, 0, 5], &s), "2i - 3j + 5");
        assert_eq!(format_affine(&[0, 0, 0, -4], &s), "-4");
        assert_eq!(format_affine(&[0, 0, 0, 0], &s), "0");
    }

    #[test]
    fn test_display_system() {
        let s = space(&["N"], &["i"]);
        let relation = Relation::from_rows(vec![vec![1, 1, 0, 0], vec![1, -1, 1, -1]]);
        let system = ConstraintSystem::from_relation(&relation, 1);
        assert_eq!(
            system.display(&s).to_string(),
            "[N] -> { [i] : i >= 0 and -i + N - 1 >= 0 }"
        );
    }
}
