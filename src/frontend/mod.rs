//! Extraction of a [`ProgramModel`] from C-like source text.
//!
//! The static control part must be enclosed in `#pragma scop` and
//! `#pragma endscop`. Inside it, `for` loops with affine bounds and unit
//! stride, `if` guards with affine conditions, blocks and plain statements
//! are accepted. Every plain statement becomes a [`Statement`] whose domain
//! rows use the layout `[indicator | iterators | parameters | constant]`,
//! with indicator `0` for equalities and `1` for inequalities.
//!
//! ```
//! use flops_rs::frontend::{Extractor, ScopExtractor};
//!
//! let src = "
//! #pragma scop
//! for (i = 0; i < N; i++)
//!   y[i] = a * x[i] + y[i];
//! #pragma endscop
//! ";
//! let model = ScopExtractor.extract(src).unwrap();
//! assert_eq!(model.parameters(), ["N".to_string()]);
//! assert_eq!(model.statements().len(), 1);
//! ```

mod affine;
mod lexer;
mod parser;

use log::{debug, warn};
use thiserror::Error;

use crate::model::{Body, ProgramModel, Relation, Statement};

use self::affine::AffineConstraint;
use self::parser::{ParsedStatement, Parser};

/// Failure to extract a model from source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no '#pragma scop' region found")]
    NoScop,
    #[error("line {line}: '#pragma scop' without matching '#pragma endscop'")]
    Unterminated { line: usize },
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected { line: usize, expected: String, found: String },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("line {line}: non-affine expression: {reason}")]
    NonAffine { line: usize, reason: String },
    #[error("line {line}: unsupported loop: {reason}")]
    UnsupportedLoop { line: usize, reason: String },
    #[error("line {line}: unsupported construct '{construct}'")]
    Unsupported { line: usize, construct: String },
    #[error("line {line}: unexpected character {ch:?}")]
    BadChar { line: usize, ch: char },
    #[error("line {line}: invalid number literal '{text}'")]
    BadNumber { line: usize, text: String },
    #[error("line {line}: coefficient out of range")]
    Overflow { line: usize },
}

/// Source of program models.
pub trait Extractor {
    fn extract(&self, source: &str) -> Result<ProgramModel, ExtractError>;
}

/// Extracts the first `#pragma scop` region of the source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopExtractor;

impl Extractor for ScopExtractor {
    fn extract(&self, source: &str) -> Result<ProgramModel, ExtractError> {
        let (region, first_line) = scop_region(source)?;
        let tokens = lexer::tokenize(region, first_line)?;
        debug!("Scop region at line {}: {} tokens", first_line, tokens.len());

        let (parameters, parsed) = Parser::new(region, &tokens).parse()?;
        debug!("Parameters: {:?}", parameters);

        let mut model = ProgramModel::new(parameters);
        for stmt in &parsed {
            let domain = materialize(stmt, model.parameters())?;
            let id = model.add_statement(Statement::new(
                domain,
                stmt.iterators.len(),
                Some(Body {
                    iterators: stmt.iterators.clone(),
                    expression: stmt.expression.clone(),
                }),
            ));
            debug!("{} at line {} over {:?}", id, stmt.line, stmt.iterators);
        }
        Ok(model)
    }
}

fn is_pragma(line: &str, word: &str) -> bool {
    let mut parts = line.trim().trim_start_matches('#').split_whitespace();
    line.trim_start().starts_with('#') && parts.next() == Some("pragma") && parts.next() == Some(word)
}

/// Returns the text strictly between the first `#pragma scop` and its
/// `#pragma endscop`, and the 1-based line number where that text starts.
fn scop_region(source: &str) -> Result<(&str, usize), ExtractError> {
    let mut start: Option<(usize, usize)> = None;
    let mut region = None;
    let mut offset = 0;

    for (k, line) in source.split_inclusive('\n').enumerate() {
        let next = offset + line.len();
        match start {
            None if is_pragma(line, "scop") => start = Some((next, k + 2)),
            Some((begin, first_line)) if is_pragma(line, "endscop") => {
                if region.is_none() {
                    region = Some((&source[begin..offset], first_line));
                } else {
                    warn!("Ignoring additional scop region at line {}", first_line - 1);
                }
                start = None;
            }
            _ => {}
        }
        offset = next;
    }

    match (region, start) {
        (Some(found), _) => Ok(found),
        (None, Some((_, first_line))) => Err(ExtractError::Unterminated { line: first_line - 1 }),
        (None, None) => Err(ExtractError::NoScop),
    }
}

/// Lays out the constraints of `stmt` as domain rows.
fn materialize(stmt: &ParsedStatement, parameters: &[String]) -> Result<Relation, ExtractError> {
    let n_iter = stmt.iterators.len();
    let width = 1 + n_iter + parameters.len() + 1;

    let mut relation = Relation::new();
    for c in &stmt.constraints {
        relation.push_row(row(c, stmt, parameters, width)?);
    }
    Ok(relation)
}

fn row(c: &AffineConstraint, stmt: &ParsedStatement, parameters: &[String], width: usize) -> Result<Vec<i64>, ExtractError> {
    let n_iter = stmt.iterators.len();
    let mut row = vec![0; width];
    row[0] = if c.kind.is_equality() { 0 } else { 1 };
    for (name, coeff) in c.expr.terms() {
        // Iterators shadow parameters of the same name.
        let col = match stmt.iterators.iter().position(|it| it == name) {
            Some(k) => 1 + k,
            None => match parameters.iter().position(|p| p == name) {
                Some(k) => 1 + n_iter + k,
                None => {
                    return Err(ExtractError::Unexpected {
                        line: stmt.line,
                        expected: "iterator or parameter".to_string(),
                        found: format!("'{}'", name),
                    })
                }
            },
        };
        row[col] = coeff;
    }
    row[width - 1] = c.expr.constant_value();
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigInt;
    use test_log::test;

    use crate::constraint::ConstraintSystem;
    use crate::count::{Context, CountPolynomial, CountingEngine, ParamPoint, Quotient};
    use crate::projection::ProjectionCounter;
    use crate::space::DimensionSpace;

    fn wrap(body: &str) -> String {
        format!("int main() {{\n#pragma scop\n{}\n#pragma endscop\n}}\n", body)
    }

    fn count(model: &ProgramModel, stmt: usize, params: &[i64]) -> Option<Quotient> {
        let s = &model.statements()[stmt];
        let system = ConstraintSystem::from_relation(&s.domain, s.num_iterators);
        let space = DimensionSpace::build(model.parameters(), s.num_iterators, s.iterator_names());
        let ctx = Context::default();
        let poly = ProjectionCounter.count(&ctx, &system, &space)?;
        let point = ParamPoint::from_coords(params.iter().map(|&v| BigInt::from(v)).collect());
        poly.eval(&ctx, &point)
    }

    #[test]
    fn test_triangular_nest() {
        let src = wrap("for (i = 0; i < N; i++)\n  for (j = 0; j <= i; j++)\n    s = s + a[i][j];");
        let model = ScopExtractor.extract(&src).unwrap();
        assert_eq!(model.parameters(), ["N".to_string()]);

        let stmt = &model.statements()[0];
        assert_eq!(stmt.num_iterators, 2);
        assert_eq!(stmt.iterator_names(), Some(&["i".to_string(), "j".to_string()][..]));
        assert_eq!(stmt.expression(), Some("s = s + a[i][j];"));
        // [ind | i j | N | 1]
        assert_eq!(
            stmt.domain.rows(),
            &[
                vec![1, 1, 0, 0, 0],
                vec![1, -1, 0, 1, -1],
                vec![1, 0, 1, 0, 0],
                vec![1, 1, -1, 0, 0],
            ]
        );

        for n in [0i64, 1, 4, 10] {
            let expected = BigInt::from(n * (n + 1) / 2);
            assert_eq!(count(&model, 0, &[n]).and_then(|q| q.to_integer()), Some(expected));
        }
    }

    #[test]
    fn test_non_affine_reports_line() {
        let src = wrap("for (i = 0; i < N; i++)\n  for (j = 0; j < i * N; j++)\n    s = s + 1;");
        assert_eq!(
            ScopExtractor.extract(&src).map(|_| ()),
            Err(ExtractError::NonAffine {
                line: 4,
                reason: "product of 'i' and 'N'".to_string()
            })
        );
    }

    #[test]
    fn test_if_equality_guard() {
        let src = wrap("for (i = 0; i < N; i++)\n  for (j = 0; j < N; j++)\n    if (i == j)\n      d[i] = d[i] + a[i][j];");
        let model = ScopExtractor.extract(&src).unwrap();
        let stmt = &model.statements()[0];
        assert_eq!(stmt.domain.rows().last(), Some(&vec![0, 1, -1, 0, 0]));
        assert_eq!(count(&model, 0, &[7]).and_then(|q| q.to_integer()), Some(BigInt::from(7)));
    }

    #[test]
    fn test_iterator_shadows_parameter() {
        // `j` is a parameter of S0 and an iterator of S1.
        let src = wrap("for (i = 0; i < j; i++) x = x + 1;\nfor (j = 0; j < N; j++) y = y * 2;");
        let model = ScopExtractor.extract(&src).unwrap();
        assert_eq!(model.parameters(), ["j".to_string(), "N".to_string()]);
        assert_eq!(model.statements()[1].domain.rows()[1], vec![1, -1, 0, 1, -1]);
    }

    #[test]
    fn test_missing_region() {
        assert_eq!(ScopExtractor.extract("x = y;").map(|_| ()), Err(ExtractError::NoScop));
        assert_eq!(
            ScopExtractor.extract("a;\n#pragma scop\nx = y;\n").map(|_| ()),
            Err(ExtractError::Unterminated { line: 2 })
        );
    }

    #[test]
    fn test_first_region_is_used() {
        let src = "#pragma scop\nx = x + 1;\n#pragma endscop\n#pragma scop\ny = y * 2 + 1;\n#pragma endscop\n";
        let model = ScopExtractor.extract(src).unwrap();
        assert_eq!(model.statements().len(), 1);
        assert_eq!(model.statements()[0].expression(), Some("x = x + 1;"));
        assert_eq!(model.statements()[0].num_iterators, 0);
    }

    #[test]
    fn test_pragma_spacing() {
        assert!(is_pragma("  #  pragma   scop  \n", "scop"));
        assert!(is_pragma("#pragma endscop", "endscop"));
        assert!(!is_pragma("#pragma endscop", "scop"));
        assert!(!is_pragma("// #pragma scop", "scop"));
    }

    #[test]
    fn test_gemm() {
        let src = wrap(
            "for (i = 0; i < NI; i++)\n  for (j = 0; j < NJ; j++)\n    for (k = 0; k < NK; ++k)\n      C[i][j] += alpha * A[i][k] * B[k][j];",
        );
        let model = ScopExtractor.extract(&src).unwrap();
        assert_eq!(
            model.parameters(),
            ["NI".to_string(), "NJ".to_string(), "NK".to_string()]
        );
        assert_eq!(
            count(&model, 0, &[2, 3, 4]).and_then(|q| q.to_integer()),
            Some(BigInt::from(24))
        );
    }
}
