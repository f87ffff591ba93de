//! Small tagged types shared across the pipeline.
//!
//! Newtypes and enums here replace the integer conventions of the raw
//! polyhedral model (indicator columns, positional dimension kinds) with
//! explicit tags.

use std::fmt;

/// Kind of an affine constraint row.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConstraintKind {
    /// `a·x + c = 0`
    Equality,
    /// `a·x + c >= 0`
    Inequality,
}

impl ConstraintKind {
    /// Decodes the leading indicator of a raw relation row.
    ///
    /// Zero means equality, anything else means inequality.
    pub fn from_indicator(indicator: i64) -> Self {
        if indicator == 0 {
            ConstraintKind::Equality
        } else {
            ConstraintKind::Inequality
        }
    }

    pub fn is_equality(self) -> bool {
        self == ConstraintKind::Equality
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Equality => write!(f, "= 0"),
            ConstraintKind::Inequality => write!(f, ">= 0"),
        }
    }
}

/// Kind of a dimension in a [`DimensionSpace`][crate::space::DimensionSpace].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DimKind {
    /// Symbolic problem-size parameter.
    Param,
    /// Loop iterator (set dimension).
    Set,
}

impl fmt::Display for DimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimKind::Param => write!(f, "param"),
            DimKind::Set => write!(f, "set"),
        }
    }
}

/// A statement identifier (0-indexed, source order).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StmtId(usize);

impl StmtId {
    pub fn new(index: usize) -> Self {
        StmtId(index)
    }

    /// Returns the raw statement index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl From<usize> for StmtId {
    fn from(index: usize) -> Self {
        StmtId(index)
    }
}
