//! FLOP estimation driver.
//!
//! [`Estimator::run`] walks the statements of a [`ProgramModel`] in source
//! order. For each statement with a body it computes the operation density,
//! translates the domain, asks the [`CountingEngine`] for a counting
//! polynomial and evaluates it with the run's [`ParameterBinding`]. A
//! positive count contributes `density × count` to the total.
//!
//! Statement failures never abort the run: the statement contributes nothing
//! and its [`Outcome`] records why.

use std::fmt;

use log::{info, warn};
use num_bigint::BigUint;
use num_traits::Zero;

use crate::binding::ParameterBinding;
use crate::constraint::ConstraintSystem;
use crate::count::{Context, CountingEngine};
use crate::density::operation_density;
use crate::evaluate::{evaluate, EvaluationError};
use crate::model::{ProgramModel, Statement};
use crate::space::DimensionSpace;
use crate::types::StmtId;

/// What happened to one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Contributed `contribution = density × count`.
    Counted { count: BigUint, contribution: BigUint },
    /// No body text; excluded from estimation.
    NoBody,
    /// The engine returned no polynomial.
    CountingFailed,
    /// The polynomial could not be evaluated.
    EvaluationFailed(EvaluationError),
    /// The domain holds no point at the bound parameter values.
    EmptyDomain {
        /// Parameters that were bound to 0 because no value was supplied.
        defaulted: Vec<String>,
    },
}

impl Outcome {
    /// Contribution to the total (0 unless counted).
    pub fn contribution(&self) -> BigUint {
        match self {
            Outcome::Counted { contribution, .. } => contribution.clone(),
            _ => BigUint::zero(),
        }
    }

    /// Iteration count, if the statement was counted.
    pub fn count(&self) -> Option<&BigUint> {
        match self {
            Outcome::Counted { count, .. } => Some(count),
            _ => None,
        }
    }
}

/// Per-statement diagnostics.
///
/// The `Display` form is the one-line summary logged for the statement, e.g.
/// `S0: 4 ops x 2 iterations = 8` or `S1: no body, excluded from estimation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRecord {
    pub id: StmtId,
    pub expression: Option<String>,
    pub density: u64,
    /// Textual form of the counting polynomial, if one was built.
    pub polynomial: Option<String>,
    pub outcome: Outcome,
}

impl fmt::Display for StatementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.id)?;
        match &self.outcome {
            Outcome::Counted { count, contribution } => write!(
                f,
                "{} ops x {} iterations = {}",
                self.density, count, contribution
            ),
            Outcome::NoBody => write!(f, "no body, excluded from estimation"),
            Outcome::CountingFailed => write!(f, "no counting polynomial, skipped"),
            Outcome::EvaluationFailed(err) => write!(f, "{}, skipped", err),
            Outcome::EmptyDomain { defaulted } if defaulted.is_empty() => write!(f, "empty domain"),
            Outcome::EmptyDomain { defaulted } => {
                write!(f, "empty domain with {} = 0", defaulted.join(", "))
            }
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimationResult {
    pub total: BigUint,
    pub records: Vec<StatementRecord>,
    /// Bound names that are not parameters of the model; ignored.
    pub unknown: Vec<String>,
}

impl EstimationResult {
    pub fn record(&self, id: StmtId) -> Option<&StatementRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records of statements that contributed to the total.
    pub fn counted(&self) -> impl Iterator<Item = &StatementRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Counted { .. }))
    }
}

impl fmt::Display for EstimationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        write!(f, "Total FLOPs = {}", self.total)
    }
}

/// Drives one estimation run over a model.
pub struct Estimator<'a, E> {
    engine: &'a E,
    ctx: &'a Context,
    binding: &'a ParameterBinding,
}

impl<'a, E: CountingEngine> Estimator<'a, E> {
    pub fn new(engine: &'a E, ctx: &'a Context, binding: &'a ParameterBinding) -> Self {
        Self { engine, ctx, binding }
    }

    /// Estimates the FLOPs of every statement of `model` and sums them.
    pub fn run(&self, model: &ProgramModel) -> EstimationResult {
        let mut result = EstimationResult::default();
        for (name, _) in self.binding.iter() {
            if !model.parameters().iter().any(|p| p == name) {
                warn!("Parameter {} not found in polynomial", name);
                result.unknown.push(name.to_string());
            }
        }
        for (id, stmt) in model.iter() {
            let record = self.estimate_statement(model.parameters(), id, stmt);
            result.total += record.outcome.contribution();
            result.records.push(record);
        }
        info!("Total FLOPs = {}", result.total);
        result
    }

    fn estimate_statement(&self, parameters: &[String], id: StmtId, stmt: &Statement) -> StatementRecord {
        let Some(expression) = stmt.expression() else {
            let record = StatementRecord {
                id,
                expression: None,
                density: 0,
                polynomial: None,
                outcome: Outcome::NoBody,
            };
            warn!("{}", record);
            return record;
        };

        info!("Computing FLOPs for statement {}: {}", id, expression);
        let density = operation_density(expression);
        info!("{}: {} ops per execution", id, density);

        let system = ConstraintSystem::from_relation(&stmt.domain, stmt.num_iterators);
        let space = DimensionSpace::build(parameters, stmt.num_iterators, stmt.iterator_names());

        let mut record = StatementRecord {
            id,
            expression: Some(expression.to_string()),
            density,
            polynomial: None,
            outcome: Outcome::CountingFailed,
        };

        let Some(poly) = self.engine.count(self.ctx, &system, &space) else {
            warn!("{}: could not compute the counting polynomial of {}", id, system.display(&space));
            return record;
        };
        let text = poly.to_string();
        info!("{}: counting polynomial {}", id, text);
        record.polynomial = Some(text);

        let evaluation = evaluate(self.ctx, &poly, &space, self.binding);
        record.outcome = match evaluation.result {
            Ok(count) if !count.is_zero() => {
                let contribution = &count * density;
                info!("{}: {} iterations, {} FLOPs", id, count, contribution);
                Outcome::Counted { count, contribution }
            }
            Ok(_) => {
                let defaulted = evaluation.bound.defaulted;
                if self.binding.is_empty() && !defaulted.is_empty() {
                    warn!("{}: no parameters supplied, domain is empty with {:?} = 0", id, defaulted);
                } else if !defaulted.is_empty() {
                    warn!("{}: domain is empty, unresolved parameters {:?} were bound to 0", id, defaulted);
                } else {
                    warn!("{}: domain is empty", id);
                }
                Outcome::EmptyDomain { defaulted }
            }
            Err(err) => {
                warn!("{}: could not evaluate counting polynomial: {}", id, err);
                Outcome::EvaluationFailed(err)
            }
        };
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::model::{Body, Relation};
    use crate::projection::ProjectionCounter;

    const BODY: &str = "a[i][j] = a[i][j] + b[i+1][j] * (c[i][j] - d[i][j]) / e[i][j];";

    fn single_loop(expression: Option<&str>) -> Statement {
        // 0 <= i <= N - 1
        let domain = Relation::from_rows(vec![vec![1, 1, 0, 0], vec![1, -1, 1, -1]]);
        let body = expression.map(|e| Body {
            iterators: vec!["i".to_string()],
            expression: e.to_string(),
        });
        Statement::new(domain, 1, body)
    }

    fn run(model: &ProgramModel, args: &[&str]) -> EstimationResult {
        let ctx = Context::default();
        let binding = ParameterBinding::from_args(args);
        Estimator::new(&ProjectionCounter, &ctx, &binding).run(model)
    }

    #[test]
    fn test_single_statement() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        model.add_statement(single_loop(Some(BODY)));

        let result = run(&model, &["N=10"]);
        assert_eq!(result.total, BigUint::from(40u32));
        let record = result.record(StmtId::new(0)).unwrap();
        assert_eq!(record.density, 4);
        assert_eq!(record.outcome.count(), Some(&BigUint::from(10u32)));
        assert_eq!(
            record.polynomial.as_deref(),
            Some("card([N] -> { [i] : i >= 0 and -i + N - 1 >= 0 })")
        );
    }

    #[test]
    fn test_statement_without_body_is_excluded() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        model.add_statement(single_loop(None));
        model.add_statement(single_loop(Some("x[i] = x[i] * y[i] + 1;")));

        let result = run(&model, &["N=5"]);
        assert_eq!(result.total, BigUint::from(10u32));
        assert_eq!(result.records[0].outcome, Outcome::NoBody);
        assert_eq!(result.records[0].to_string(), "S0: no body, excluded from estimation");
        assert_eq!(result.counted().count(), 1);
        assert_eq!(
            result.to_string(),
            "S0: no body, excluded from estimation\nS1: 2 ops x 5 iterations = 10\nTotal FLOPs = 10"
        );
    }

    #[test]
    fn test_scalar_statement() {
        let mut model = ProgramModel::new(vec![]);
        model.add_statement(Statement::new(
            Relation::new(),
            0,
            Some(Body {
                iterators: vec![],
                expression: "s = s * 2 + 1;".to_string(),
            }),
        ));

        let result = run(&model, &[]);
        assert_eq!(result.records[0].outcome.count(), Some(&BigUint::from(1u32)));
        assert_eq!(result.total, BigUint::from(2u32));
    }

    #[test]
    fn test_unknown_parameter_does_not_change_total() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        model.add_statement(single_loop(Some(BODY)));

        let plain = run(&model, &["N=10"]);
        let extra = run(&model, &["N=10", "UNKNOWN=3"]);
        assert_eq!(plain.total, extra.total);
        assert!(plain.unknown.is_empty());
        assert_eq!(extra.unknown, vec!["UNKNOWN".to_string()]);
    }

    #[test]
    fn test_no_parameters_supplied() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        model.add_statement(single_loop(Some(BODY)));

        let result = run(&model, &[]);
        assert_eq!(result.total, BigUint::zero());
        assert_eq!(
            result.records[0].outcome,
            Outcome::EmptyDomain {
                defaulted: vec!["N".to_string()]
            }
        );
        assert_eq!(result.records[0].to_string(), "S0: empty domain with N = 0");
    }

    #[test]
    fn test_counting_failure_is_recorded() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        // i >= 0 only: unbounded
        let domain = Relation::from_rows(vec![vec![1, 1, 0, 0]]);
        let body = Body {
            iterators: vec!["i".to_string()],
            expression: "x[i] = x[i] + 1;".to_string(),
        };
        model.add_statement(Statement::new(domain, 1, Some(body)));
        model.add_statement(single_loop(Some("y[i] = y[i] - 1;")));

        let result = run(&model, &["N=3"]);
        assert_eq!(result.records[0].outcome, Outcome::CountingFailed);
        assert_eq!(result.records[0].to_string(), "S0: no counting polynomial, skipped");
        assert!(result.records[0].polynomial.is_none());
        assert_eq!(result.total, BigUint::from(3u32));
    }

    #[test]
    fn test_evaluation_failure_is_recorded() {
        let mut model = ProgramModel::new(vec!["N".to_string(), "M".to_string()]);
        // 0 <= i <= N - 1, 0 <= j <= min(i, M)
        let domain = Relation::from_rows(vec![
            vec![1, 1, 0, 0, 0, 0],
            vec![1, -1, 0, 1, 0, -1],
            vec![1, 0, 1, 0, 0, 0],
            vec![1, 1, -1, 0, 0, 0],
            vec![1, 0, -1, 0, 1, 0],
        ]);
        let body = Body {
            iterators: vec!["i".to_string(), "j".to_string()],
            expression: "x[i][j] = x[i][j] + 1;".to_string(),
        };
        model.add_statement(Statement::new(domain, 2, Some(body)));

        let ctx = Context::new(crate::count::CountConfig::default().with_eval_budget(3));
        let binding = ParameterBinding::from_args(["N=10", "M=4"]);
        let result = Estimator::new(&ProjectionCounter, &ctx, &binding).run(&model);
        assert!(matches!(
            result.records[0].outcome,
            Outcome::EvaluationFailed(EvaluationError::Undefined(_))
        ));
        assert_eq!(
            result.records[0].to_string(),
            "S0: polynomial is undefined at [10, 4], skipped"
        );
        assert_eq!(result.total, BigUint::zero());
    }

    #[test]
    fn test_display() {
        let mut model = ProgramModel::new(vec!["N".to_string()]);
        model.add_statement(single_loop(Some(BODY)));
        let result = run(&model, &["N=2"]);
        assert_eq!(result.to_string(), "S0: 4 ops x 2 iterations = 8\nTotal FLOPs = 8");
    }
}
