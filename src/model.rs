//! Affine program model consumed by the estimator.
//!
//! A [`ProgramModel`] is what a front end (see [`frontend`][crate::frontend])
//! produces from source text: the declared symbolic parameters and, for each
//! statement, its iteration domain as raw constraint rows.
//!
//! # Raw row layout
//!
//! Every row of a statement's [`Relation`] has the layout
//!
//! ```text
//! [ indicator | i_0 .. i_{n-1} | p_0 .. p_{m-1} | const ]
//! ```
//!
//! where `indicator == 0` marks an equality and any other value an inequality
//! (`>= 0`). All rows of one statement have the same width,
//! `1 + #iterators + #parameters + 1`. This is a precondition on the producer
//! and is not re-validated downstream.

use crate::types::StmtId;

/// Raw constraint rows of one iteration domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relation {
    rows: Vec<Vec<i64>>,
}

impl Relation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<i64>>) -> Self {
        Self { rows }
    }

    /// Appends one raw row (including its leading indicator).
    pub fn push_row(&mut self, row: Vec<i64>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the rows, indicator included (`0` for an empty relation).
    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, |row| row.len())
    }
}

/// Textual body of a statement, with the names of its enclosing iterators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Iterator names, outermost first.
    pub iterators: Vec<String>,
    /// The statement text, e.g. `"C[i][j] = C[i][j] + A[i][k] * B[k][j];"`.
    pub expression: String,
}

/// One statement of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Iteration domain.
    pub domain: Relation,
    /// Number of iterator (set) dimensions of the domain.
    pub num_iterators: usize,
    /// Body text; statements without one are excluded from estimation.
    pub body: Option<Body>,
}

impl Statement {
    pub fn new(domain: Relation, num_iterators: usize, body: Option<Body>) -> Self {
        Self {
            domain,
            num_iterators,
            body,
        }
    }

    /// Iterator names, if the statement carries a body.
    pub fn iterator_names(&self) -> Option<&[String]> {
        self.body.as_ref().map(|b| b.iterators.as_slice())
    }

    /// Body expression text, if any.
    pub fn expression(&self) -> Option<&str> {
        self.body.as_ref().map(|b| b.expression.as_str())
    }
}

/// A whole program: parameters in declaration order and statements in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramModel {
    parameters: Vec<String>,
    statements: Vec<Statement>,
}

impl ProgramModel {
    pub fn new(parameters: Vec<String>) -> Self {
        Self {
            parameters,
            statements: Vec::new(),
        }
    }

    pub fn add_statement(&mut self, statement: Statement) -> StmtId {
        let id = StmtId::new(self.statements.len());
        self.statements.push(statement);
        id
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Iterates statements together with their identifiers.
    pub fn iter(&self) -> impl Iterator<Item = (StmtId, &Statement)> {
        self.statements
            .iter()
            .enumerate()
            .map(|(i, s)| (StmtId::new(i), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_building() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        let domain = Relation::from_rows(vec![vec![1, 1, 0, 0], vec![1, -1, 1, -1]]);
        let body = Body {
            iterators: vec!["i".to_string()],
            expression: "x[i] = x[i] * 2;".to_string(),
        };
        let s0 = model.add_statement(Statement::new(domain.clone(), 1, Some(body)));
        let s1 = model.add_statement(Statement::new(domain, 1, None));

        assert_eq!(s0, StmtId::new(0));
        assert_eq!(s1, StmtId::new(1));
        assert_eq!(model.num_parameters(), 1);
        assert_eq!(model.statements().len(), 2);

        let (id, stmt) = model.iter().nth(1).unwrap();
        assert_eq!(id.to_string(), "S1");
        assert!(stmt.expression().is_none());
        assert!(stmt.iterator_names().is_none());
        assert_eq!(stmt.domain.num_rows(), 2);
        assert_eq!(stmt.domain.num_columns(), 4);
    }

    #[test]
    fn test_empty_relation() {
        let rel = Relation::new();
        assert_eq!(rel.num_rows(), 0);
        assert_eq!(rel.num_columns(), 0);
    }
}
