//! Binding parameter values to a space and evaluating counting polynomials.

use log::{debug, warn};
use num_bigint::{BigInt, BigUint};
use num_traits::Signed;
use thiserror::Error;

use crate::binding::ParameterBinding;
use crate::count::{Context, CountPolynomial, ParamPoint, Quotient};
use crate::space::DimensionSpace;
use crate::types::DimKind;

/// Why a present polynomial produced no count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("polynomial is undefined at {0}")]
    Undefined(ParamPoint),
    #[error("polynomial value {0} is not an integer")]
    NonIntegral(Quotient),
    #[error("polynomial value {0} is negative")]
    Negative(BigInt),
}

/// A parameter point resolved from a binding, with what had to be defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPoint {
    pub point: ParamPoint,
    /// Declared parameters missing from the binding, bound to 0.
    pub defaulted: Vec<String>,
    /// Positions of unnamed parameter dimensions, bound to 0.
    pub unnamed: Vec<usize>,
    /// Binding keys that match no parameter of the space; ignored.
    pub unknown: Vec<String>,
}

/// Resolves `binding` against the parameter dimensions of `space`.
///
/// Missing parameters default to 0 without a warning; binding keys that
/// are not parameters of the space are recorded and ignored.
pub fn bind(space: &DimensionSpace, binding: &ParameterBinding) -> BoundPoint {
    let mut point = ParamPoint::zero(space.num_params());
    let mut defaulted = Vec::new();
    let mut unnamed = Vec::new();

    for pos in 0..space.num_params() {
        match space.name(DimKind::Param, pos) {
            Some(name) => match binding.get(name) {
                Some(value) => point.set_coordinate(pos, BigInt::from(value)),
                None => defaulted.push(name.to_string()),
            },
            None => {
                warn!("Parameter dimension {} is unnamed and cannot be bound, using 0", pos);
                unnamed.push(pos);
            }
        }
    }

    let mut unknown = Vec::new();
    for (name, _) in binding.iter() {
        if space.find_dim_by_name(DimKind::Param, name).is_none() {
            debug!("Parameter {} not found in {}", name, space);
            unknown.push(name.to_string());
        }
    }

    if !defaulted.is_empty() {
        debug!("Parameters {:?} not bound, using 0", defaulted);
    }

    BoundPoint {
        point,
        defaulted,
        unnamed,
        unknown,
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub bound: BoundPoint,
    pub result: Result<BigUint, EvaluationError>,
}

/// Evaluates `poly` at the point described by `binding` over `space`.
///
/// The count must be a non-negative integer. A rational value is rejected
/// rather than truncated.
pub fn evaluate<P: CountPolynomial>(
    ctx: &Context,
    poly: &P,
    space: &DimensionSpace,
    binding: &ParameterBinding,
) -> Evaluation {
    let bound = bind(space, binding);
    let result = eval_point(ctx, poly, &bound.point);
    Evaluation { bound, result }
}

fn eval_point<P: CountPolynomial>(ctx: &Context, poly: &P, point: &ParamPoint) -> Result<BigUint, EvaluationError> {
    let value = poly
        .eval(ctx, point)
        .ok_or_else(|| EvaluationError::Undefined(point.clone()))?;
    let count = value
        .to_integer()
        .ok_or_else(|| EvaluationError::NonIntegral(value.clone()))?;
    if count.is_negative() {
        return Err(EvaluationError::Negative(count));
    }
    // Non-negative, so the magnitude is the value itself.
    Ok(count.magnitude().clone())
}
