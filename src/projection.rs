//! Projection-based counting backend.
//!
//! [`ProjectionCounter`] implements [`CountingEngine`] by Fourier–Motzkin
//! elimination. Iterators are eliminated from the innermost outwards; the rows
//! removed at each step become the lower and upper bounds of that iterator,
//! expressed over outer iterators and parameters only. Rows left once every
//! iterator is gone constrain parameters alone and act as guards.
//!
//! # Summation
//!
//! A level with a single lower bound `i >= lo` and a single upper bound
//! `i <= hi` is summed in closed form: the count of the levels inside it, a
//! [`Polynomial`] in the outer iterators and parameters, is summed over
//! `lo..=hi` with power sums. Every `lo <= hi + 1` combination needed for that
//! identity is itself a projected row, so it holds wherever the level is
//! reached.
//!
//! When every level has this shape, the whole count is a polynomial in the
//! parameters, built once at projection time. Otherwise the parameters are
//! fixed first, which often merges competing bounds into one, and the
//! innermost run of single-bound levels is summed in closed form while the
//! outer levels are walked point by point within the evaluation budget.
//! Projection may over-approximate the integer shadow of a domain, but the
//! original rows are all kept as bounds of their innermost iterator, so every
//! counted point satisfies the full system and the count is exact.
//!
//! # Normalisation
//!
//! Every row `a·x + c >= 0` is divided by `g = gcd(a)` with the constant
//! floored: `(a/g)·x + floor(c/g) >= 0`. Equalities are split into two
//! opposite inequalities before normalisation, so equalities without integer
//! solutions turn into contradicting bounds.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, trace};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::constraint::ConstraintSystem;
use crate::count::{Context, CountPolynomial, CountingEngine, ParamPoint, Quotient};
use crate::polynomial::Polynomial;
use crate::space::DimensionSpace;
use crate::types::DimKind;
use crate::utils::{ceil_div_big, floor_div, floor_div_big, gcd_big, gcd_many};

/// Inequality row `coeffs · [i.., p.., 1] >= 0`.
type Row = Vec<i64>;

/// Row over arbitrary-precision coefficients, constant last.
type BigRow = Vec<BigInt>;

/// Bounds of one iterator.
#[derive(Debug, Clone, Default)]
struct Level {
    /// Rows with a positive coefficient on the iterator.
    lower: Vec<Row>,
    /// Rows with a negative coefficient on the iterator.
    upper: Vec<Row>,
}

/// Result of normalising a single row.
enum Normalized {
    Row(Row),
    /// Constant-only row that always holds.
    Trivial,
    /// Constant-only row that never holds.
    Infeasible,
}

fn normalize(mut row: Row) -> Option<Normalized> {
    let Some((&constant, vars)) = row.split_last() else {
        return Some(Normalized::Trivial);
    };
    // A gcd of 2^63 only comes from i64::MIN coefficients and has no i64 form.
    let g = i64::try_from(gcd_many(vars)).ok()?;
    if g == 0 {
        return Some(if constant >= 0 {
            Normalized::Trivial
        } else {
            Normalized::Infeasible
        });
    }
    if g != 1 {
        let last = row.len() - 1;
        for c in row[..last].iter_mut() {
            *c /= g;
        }
        row[last] = floor_div(constant, g)?;
    }
    Some(Normalized::Row(row))
}

fn negate(row: &[i64]) -> Option<Row> {
    row.iter().map(|c| c.checked_neg()).collect()
}

/// Combines a lower bound `l` (positive on `k`) with an upper bound `u`
/// (negative on `k`) into a row without `k`.
fn combine(l: &[i64], u: &[i64], k: usize) -> Option<Row> {
    let a = l[k];
    let b = u[k].checked_neg()?;
    l.iter()
        .zip(u.iter())
        .map(|(&x, &y)| b.checked_mul(x)?.checked_add(a.checked_mul(y)?))
        .collect()
}

/// Normalises `row` and appends it to `rows` unless it is trivial or already present.
fn push_normalized(row: Row, rows: &mut Vec<Row>, seen: &mut HashSet<Row>, infeasible: &mut bool) -> Option<()> {
    match normalize(row)? {
        Normalized::Row(row) => {
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
        Normalized::Trivial => {}
        Normalized::Infeasible => *infeasible = true,
    }
    Some(())
}

/// Bounds `(lo, hi)` of iterator `k` as affine polynomials over the other
/// columns, when there is exactly one row on each side, both with a unit
/// coefficient on `k`.
fn unit_bounds(lower: &[BigRow], upper: &[BigRow], k: usize) -> Option<(Polynomial, Polynomial)> {
    let ([l], [u]) = (lower, upper) else {
        return None;
    };
    if !l[k].is_one() || !(-&u[k]).is_one() {
        return None;
    }
    // i + a·x + c >= 0  gives  i >= -a·x - c
    let (l_const, l_vars) = l.split_last()?;
    let mut lo: Vec<BigInt> = l_vars.iter().map(|c| -c).collect();
    lo[k] = BigInt::zero();
    // -i + b·x + d >= 0  gives  i <= b·x + d
    let (u_const, u_vars) = u.split_last()?;
    let mut hi: Vec<BigInt> = u_vars.to_vec();
    hi[k] = BigInt::zero();
    Some((Polynomial::affine(&lo, &-l_const), Polynomial::affine(&hi, u_const)))
}

fn widen(rows: &[Row]) -> Vec<BigRow> {
    rows.iter()
        .map(|row| row.iter().map(|&c| BigInt::from(c)).collect())
        .collect()
}

/// Count of the whole nest as a polynomial over `[i.., p..]`, if every level
/// has a single unit bound on each side.
fn closed_form(levels: &[Level], num_vars: usize) -> Option<Polynomial> {
    let mut count = Polynomial::one(num_vars);
    for (k, level) in levels.iter().enumerate().rev() {
        let (lo, hi) = unit_bounds(&widen(&level.lower), &widen(&level.upper), k)?;
        count = count.sum_over(k, &lo, &hi);
    }
    Some(count)
}

/// Parametric counting by projection.
///
/// # Examples
///
/// ```
/// use flops_rs::constraint::ConstraintSystem;
/// use flops_rs::count::{Context, CountPolynomial, CountingEngine, ParamPoint};
/// use flops_rs::model::Relation;
/// use flops_rs::projection::ProjectionCounter;
/// use flops_rs::space::DimensionSpace;
///
/// // { [i] : 0 <= i < N }
/// let relation = Relation::from_rows(vec![vec![1, 1, 0, 0], vec![1, -1, 1, -1]]);
/// let system = ConstraintSystem::from_relation(&relation, 1);
/// let space = DimensionSpace::build(&["N".to_string()], 1, Some(&["i".to_string()][..]));
///
/// let ctx = Context::default();
/// let poly = ProjectionCounter.count(&ctx, &system, &space).unwrap();
/// let point = ParamPoint::from_coords(vec![10.into()]);
/// assert_eq!(poly.eval(&ctx, &point).unwrap().to_integer(), Some(10.into()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionCounter;

impl ProjectionCounter {
    fn project(&self, ctx: &Context, system: &ConstraintSystem, space: &DimensionSpace) -> Option<ProjectedPolynomial> {
        let num_set = space.num_set();
        let width = space.num_columns();
        let max_constraints = ctx.config().max_constraints;

        let mut infeasible = false;
        let mut seen: HashSet<Row> = HashSet::new();
        let mut rows: Vec<Row> = Vec::new();

        for row in system.rows() {
            if row.coeffs.len() != width {
                debug!(
                    "Row width {} does not match space width {}, cannot count",
                    row.coeffs.len(),
                    width
                );
                return None;
            }
            if row.kind.is_equality() {
                push_normalized(negate(&row.coeffs)?, &mut rows, &mut seen, &mut infeasible)?;
            }
            push_normalized(row.coeffs.clone(), &mut rows, &mut seen, &mut infeasible)?;
        }

        let mut levels = vec![Level::default(); num_set];
        for k in (0..num_set).rev() {
            let mut level = Level::default();
            let mut rest = Vec::new();
            for row in rows.drain(..) {
                match row[k] {
                    c if c > 0 => level.lower.push(row),
                    c if c < 0 => level.upper.push(row),
                    _ => rest.push(row),
                }
            }
            if level.lower.is_empty() || level.upper.is_empty() {
                debug!(
                    "Iterator {} of {} has no {} bound, domain is unbounded",
                    k,
                    space,
                    if level.lower.is_empty() { "lower" } else { "upper" }
                );
                return None;
            }

            seen.clear();
            seen.extend(rest.iter().cloned());
            for l in &level.lower {
                for u in &level.upper {
                    push_normalized(combine(l, u, k)?, &mut rest, &mut seen, &mut infeasible)?;
                }
            }
            if rest.len() > max_constraints {
                debug!(
                    "Projection of iterator {} produced {} rows (limit {})",
                    k,
                    rest.len(),
                    max_constraints
                );
                return None;
            }
            trace!(
                "Level {}: {} lower, {} upper, {} remaining",
                k,
                level.lower.len(),
                level.upper.len(),
                rest.len()
            );
            levels[k] = level;
            rows = rest;
        }

        let closed = if infeasible {
            None
        } else {
            closed_form(&levels, width - 1)
        };

        Some(ProjectedPolynomial {
            space: space.clone(),
            system: system.clone(),
            guards: rows,
            levels,
            infeasible,
            closed,
        })
    }
}

impl CountingEngine for ProjectionCounter {
    type Poly = ProjectedPolynomial;

    fn count(&self, ctx: &Context, system: &ConstraintSystem, space: &DimensionSpace) -> Option<ProjectedPolynomial> {
        let poly = self.project(ctx, system, space)?;
        ctx.record_polynomial();
        debug!(
            "Projected {} rows into {} levels and {} guards",
            system.num_rows(),
            poly.levels.len(),
            poly.guards.len()
        );
        if let Some(closed) = &poly.closed {
            debug!("Closed form: {}", closed.display(&poly.names()));
        }
        Some(poly)
    }
}

/// Counting polynomial of a projected domain.
#[derive(Debug, Clone)]
pub struct ProjectedPolynomial {
    space: DimensionSpace,
    system: ConstraintSystem,
    /// Parameter-only rows.
    guards: Vec<Row>,
    /// Bounds per iterator, outermost first.
    levels: Vec<Level>,
    /// A row of the domain can never hold.
    infeasible: bool,
    /// Count over `[i.., p..]` when every level has a single unit bound pair.
    closed: Option<Polynomial>,
}

/// Bounds of one level once the parameters are fixed, over `[i.., 1]`.
struct Bounds {
    lower: Vec<BigRow>,
    upper: Vec<BigRow>,
}

struct Walk<'a> {
    bounds: &'a [Bounds],
    /// Count of the levels from `split` inwards, over the iterators.
    inner: Polynomial,
    split: usize,
    iters: Vec<BigInt>,
    visited: u64,
    budget: u64,
}

impl Walk<'_> {
    /// Value of `row` without its coefficient on iterator `k`.
    fn rest(&self, row: &[BigInt], k: usize) -> BigInt {
        let mut acc = row[row.len() - 1].clone();
        for (c, x) in row.iter().zip(&self.iters).take(k) {
            if !c.is_zero() {
                acc += c * x;
            }
        }
        acc
    }

    fn range(&self, k: usize) -> (BigInt, BigInt) {
        let bounds = &self.bounds[k];
        let lo = bounds
            .lower
            .iter()
            .map(|row| ceil_div_big(&-self.rest(row, k), &row[k]))
            .max();
        let hi = bounds
            .upper
            .iter()
            .map(|row| floor_div_big(&self.rest(row, k), &-&row[k]))
            .min();
        // Both bound lists are non-empty by construction.
        (lo.unwrap_or_default(), hi.unwrap_or_default())
    }

    fn count(&mut self, k: usize) -> Option<BigRational> {
        let (lo, hi) = self.range(k);
        if lo > hi {
            return Some(BigRational::zero());
        }
        if k + 1 == self.split {
            let n = self.inner.num_vars();
            let inner = self.inner.partial_eval(&self.iters);
            let sum = inner.sum_over(k, &Polynomial::integer(n, lo), &Polynomial::integer(n, hi));
            return sum.as_constant();
        }

        let mut total = BigRational::zero();
        let mut x = lo;
        while x <= hi {
            self.visited += 1;
            if self.visited > self.budget {
                return None;
            }
            self.iters.push(x.clone());
            let inner = self.count(k + 1);
            self.iters.pop();
            total += inner?;
            x += 1;
        }
        Some(total)
    }
}

impl ProjectedPolynomial {
    /// Labels of `[i.., p..]`.
    fn names(&self) -> Vec<String> {
        (0..self.space.num_set())
            .map(|k| self.space.label(DimKind::Set, k))
            .chain((0..self.space.num_params()).map(|k| self.space.label(DimKind::Param, k)))
            .collect()
    }

    /// Closed-form count over the parameters, if the nest has one.
    pub fn closed_form(&self) -> Option<&Polynomial> {
        self.closed.as_ref()
    }

    /// `row` with parameters fixed, as iterator coefficients and a constant,
    /// divided by the gcd of the iterator coefficients with the constant floored.
    fn substitute(&self, row: &[i64], params: &[BigInt]) -> (Vec<BigInt>, BigInt) {
        let num_set = self.space.num_set();
        let last = self.space.constant_column();
        let mut vars: Vec<BigInt> = row[..num_set].iter().map(|&c| BigInt::from(c)).collect();
        let mut constant = BigInt::from(row[last]);
        for (&c, p) in row[num_set..last].iter().zip(params) {
            if c != 0 {
                constant += BigInt::from(c) * p;
            }
        }
        let g = gcd_big(&vars);
        if g > BigInt::one() {
            for c in vars.iter_mut() {
                *c /= &g;
            }
            constant = floor_div_big(&constant, &g);
        }
        (vars, constant)
    }

    /// Fixed-parameter rows of one side of a level, keeping only the tightest
    /// row among those with the same iterator coefficients.
    fn tightest(&self, rows: &[Row], params: &[BigInt]) -> Vec<BigRow> {
        let mut best: BTreeMap<Vec<BigInt>, BigInt> = BTreeMap::new();
        for row in rows {
            let (vars, constant) = self.substitute(row, params);
            match best.entry(vars) {
                Entry::Vacant(e) => {
                    e.insert(constant);
                }
                Entry::Occupied(mut e) => {
                    if constant < *e.get() {
                        e.insert(constant);
                    }
                }
            }
        }
        best.into_iter()
            .map(|(mut row, constant)| {
                row.push(constant);
                row
            })
            .collect()
    }

    /// Exact count at `point` as a rational, or `None` if the budget ran out.
    fn value_at(&self, ctx: &Context, point: &ParamPoint) -> Option<BigRational> {
        if point.dim() != self.space.num_params() {
            debug!(
                "Point {} has dimension {}, expected {}",
                point,
                point.dim(),
                self.space.num_params()
            );
            return None;
        }
        if self.infeasible {
            return Some(BigRational::zero());
        }

        let params = point.coords();
        let guards_hold = self
            .guards
            .iter()
            .all(|row| !self.substitute(row, params).1.is_negative());
        if !guards_hold {
            trace!("Guard violated at {}", point);
            return Some(BigRational::zero());
        }
        if self.levels.is_empty() {
            return Some(BigRational::one());
        }

        if let Some(closed) = &self.closed {
            let mut values = vec![BigInt::zero(); self.space.num_set()];
            values.extend(params.iter().cloned());
            return Some(closed.eval(&values));
        }

        let bounds: Vec<Bounds> = self
            .levels
            .iter()
            .map(|level| Bounds {
                lower: self.tightest(&level.lower, params),
                upper: self.tightest(&level.upper, params),
            })
            .collect();

        let mut inner = Polynomial::one(self.space.num_set());
        let mut split = bounds.len();
        while split > 1 {
            let k = split - 1;
            let Some((lo, hi)) = unit_bounds(&bounds[k].lower, &bounds[k].upper, k) else {
                break;
            };
            inner = inner.sum_over(k, &lo, &hi);
            split = k;
        }
        trace!("Walking {} of {} levels at {}", split, bounds.len(), point);

        let mut walk = Walk {
            bounds: &bounds,
            inner,
            split,
            iters: Vec::with_capacity(split),
            visited: 0,
            budget: ctx.config().eval_budget,
        };
        let count = walk.count(0);
        if count.is_none() {
            debug!(
                "Evaluation at {} exceeded the budget of {} points",
                point,
                ctx.config().eval_budget
            );
        }
        count
    }

    /// Integer-point count at `point`, or `None` if the evaluation budget ran out.
    pub fn count_at(&self, ctx: &Context, point: &ParamPoint) -> Option<BigInt> {
        let value = self.value_at(ctx, point)?;
        value.is_integer().then(|| value.to_integer())
    }
}

impl CountPolynomial for ProjectedPolynomial {
    fn eval(&self, ctx: &Context, point: &ParamPoint) -> Option<Quotient> {
        ctx.record_evaluation();
        let value = self.value_at(ctx, point)?;
        Some(Quotient::new(value.numer().clone(), value.denom().clone()))
    }
}

impl fmt::Display for ProjectedPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card({})", self.system.display(&self.space))
    }
}
