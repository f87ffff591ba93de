//! # flops-rs: Static FLOP estimation for affine loop nests
//!
//! **`flops-rs`** estimates the number of arithmetic operations a program performs
//! without running it. It works on *static control parts*: loop nests whose bounds
//! and guards are affine in the enclosing loop iterators and a set of symbolic
//! parameters (`N`, `M`, ...).
//!
//! ## How it works
//!
//! For every statement `S` of the program:
//!
//! - the **operation density** `d(S)` is estimated from the statement text, by
//!   counting the arithmetic operators of its right-hand side outside array subscripts;
//! - the **iteration domain** of `S` (a set of integer points described by affine
//!   constraints) is handed to a counting engine, which produces a *counting
//!   polynomial* `card(S)` in the parameters;
//! - the polynomial is evaluated at the user's parameter values.
//!
//! The estimate is `Σ d(S) · card(S)`, computed with arbitrary precision.
//!
//! ## Basic Usage
//!
//! ```rust
//! use flops_rs::binding::ParameterBinding;
//! use flops_rs::count::Context;
//! use flops_rs::estimate::Estimator;
//! use flops_rs::frontend::{Extractor, ScopExtractor};
//! use flops_rs::projection::ProjectionCounter;
//!
//! let src = "
//! #pragma scop
//! for (i = 0; i < N; i++)
//!   for (j = 0; j <= i; j++)
//!     s = s + a[i][j] * b[j];
//! #pragma endscop
//! ";
//!
//! // 1. Extract the affine model
//! let model = ScopExtractor.extract(src).unwrap();
//!
//! // 2. Bind parameters, as given on the command line
//! let binding = ParameterBinding::from_args(["N=100"]);
//!
//! // 3. Count and sum within one context
//! let ctx = Context::default();
//! let result = Estimator::new(&ProjectionCounter, &ctx, &binding).run(&model);
//!
//! // 2 ops per execution, 100·101/2 executions
//! assert_eq!(result.total, num_bigint::BigUint::from(10100u32));
//! ```
//!
//! ## Core Components
//!
//! - **[`frontend`]**: Extraction of a [`ProgramModel`][crate::model::ProgramModel] from `#pragma scop` regions.
//! - **[`constraint`]** and **[`space`]**: Translation of raw domain rows into typed constraint systems over named dimensions.
//! - **[`count`]**: The counting engine boundary and the scoped computation [`Context`][crate::count::Context].
//! - **[`projection`]**: A counting engine based on Fourier–Motzkin projection.
//! - **[`polynomial`]**: Exact multivariate polynomials, used for closed-form summation over loop levels.
//! - **[`evaluate`]**: Binding parameter values and evaluating counting polynomials.
//! - **[`estimate`]**: The driver that ties everything together.

pub mod binding;
pub mod constraint;
pub mod count;
pub mod density;
pub mod estimate;
pub mod evaluate;
pub mod frontend;
pub mod input;
pub mod model;
pub mod polynomial;
pub mod projection;
pub mod space;
pub mod types;
pub mod utils;
