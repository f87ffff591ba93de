//! Counting engine interface and the shared computation context.
//!
//! The estimator never counts lattice points itself. It shapes a
//! [`ConstraintSystem`] and a [`DimensionSpace`] and hands them to a
//! [`CountingEngine`], which returns a [`CountPolynomial`]: a function from
//! parameter values to the number of integer points of the domain.
//!
//! Any backend satisfying the contract below can be plugged in. The crate
//! ships [`ProjectionCounter`][crate::projection::ProjectionCounter].
//!
//! # Contract
//!
//! - `count` is deterministic for a fixed `(system, space)`.
//! - For every parameter point at which the domain is non-empty and bounded in
//!   the iterator dimensions, the polynomial evaluates to the exact number of
//!   integer points.
//! - `count` returns `None` when the domain cannot be bounded or represented.

use std::cell::Cell;
use std::fmt;

use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::constraint::ConstraintSystem;
use crate::space::DimensionSpace;

/// A point in parameter space, one coordinate per parameter dimension in space order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamPoint {
    coords: Vec<BigInt>,
}

impl ParamPoint {
    /// The origin of a `dim`-dimensional parameter space.
    pub fn zero(dim: usize) -> Self {
        Self {
            coords: vec![BigInt::zero(); dim],
        }
    }

    pub fn from_coords(coords: Vec<BigInt>) -> Self {
        Self { coords }
    }

    pub fn set_coordinate(&mut self, pos: usize, value: BigInt) {
        self.coords[pos] = value;
    }

    pub fn coordinate(&self, pos: usize) -> &BigInt {
        &self.coords[pos]
    }

    pub fn coords(&self) -> &[BigInt] {
        &self.coords
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }
}

impl fmt::Display for ParamPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coords: Vec<String> = self.coords.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", coords.join(", "))
    }
}

/// Exact value of a polynomial at a point: `numer / denom`, `denom > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quotient {
    pub numer: BigInt,
    pub denom: BigInt,
}

impl Quotient {
    pub fn new(numer: BigInt, denom: BigInt) -> Self {
        Self { numer, denom }
    }

    pub fn integer(value: BigInt) -> Self {
        Self {
            numer: value,
            denom: BigInt::one(),
        }
    }

    /// The integer value, if the denominator divides the numerator.
    pub fn to_integer(&self) -> Option<BigInt> {
        if self.denom.is_zero() {
            return None;
        }
        if (&self.numer % &self.denom).is_zero() {
            Some(&self.numer / &self.denom)
        } else {
            None
        }
    }
}

impl fmt::Display for Quotient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom.is_one() {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

/// A counting polynomial produced by a [`CountingEngine`].
///
/// The `Display` form is the textual diagnostic rendering.
pub trait CountPolynomial: fmt::Display {
    /// Evaluates at a parameter point.
    ///
    /// Returns `None` when no concrete value can be produced (the point lies
    /// outside every piece, or the context's limits were hit).
    fn eval(&self, ctx: &Context, point: &ParamPoint) -> Option<Quotient>;
}

/// Parametric integer-point counting backend.
pub trait CountingEngine {
    type Poly: CountPolynomial;

    /// Builds the counting polynomial of `system` over `space`, or `None`.
    fn count(&self, ctx: &Context, system: &ConstraintSystem, space: &DimensionSpace) -> Option<Self::Poly>;
}

/// Limits of a counting [`Context`].
///
/// # Examples
///
/// ```
/// use flops_rs::count::{Context, CountConfig};
///
/// let config = CountConfig::default().with_max_constraints(512);
/// let ctx = Context::new(config);
/// assert_eq!(ctx.config().max_constraints, 512);
/// ```
#[derive(Debug, Clone)]
pub struct CountConfig {
    /// Upper bound on constraints kept while projecting a domain (default: 4096).
    pub max_constraints: usize,
    /// Upper bound on iteration points one evaluation may walk one by one
    /// (default: 2^26). Levels summed in closed form do not count against it.
    pub eval_budget: u64,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            max_constraints: 4096,
            eval_budget: 1 << 26,
        }
    }
}

impl CountConfig {
    pub fn with_max_constraints(mut self, max_constraints: usize) -> Self {
        self.max_constraints = max_constraints;
        self
    }

    pub fn with_eval_budget(mut self, eval_budget: u64) -> Self {
        self.eval_budget = eval_budget;
        self
    }
}

/// The computation context of one run.
///
/// Acquired once at the start of a run and borrowed by every engine call.
/// Released on drop, on every exit path.
pub struct Context {
    config: CountConfig,
    polynomials: Cell<usize>,
    evaluations: Cell<usize>,
}

impl Context {
    pub fn new(config: CountConfig) -> Self {
        debug!("Acquiring counting context: {:?}", config);
        Self {
            config,
            polynomials: Cell::new(0),
            evaluations: Cell::new(0),
        }
    }

    pub fn config(&self) -> &CountConfig {
        &self.config
    }

    /// Number of polynomials built in this context.
    pub fn polynomials(&self) -> usize {
        self.polynomials.get()
    }

    /// Number of evaluations performed in this context.
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    pub fn record_polynomial(&self) {
        self.polynomials.set(self.polynomials.get() + 1);
    }

    pub fn record_evaluation(&self) {
        self.evaluations.set(self.evaluations.get() + 1);
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(CountConfig::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("polynomials", &self.polynomials())
            .field("evaluations", &self.evaluations())
            .finish()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        debug!(
            "Releasing counting context ({} polynomials, {} evaluations)",
            self.polynomials(),
            self.evaluations()
        );
    }
}
