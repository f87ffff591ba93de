//! Operation density of a statement body.
//!
//! The density is a textual estimate of the arithmetic operations performed by
//! one execution of a statement. Everything up to and including the first `=`
//! is the assignment target and is skipped. The remainder is scanned once,
//! counting every `+`, `-`, `*` and `/` that appears outside square brackets,
//! so index arithmetic such as `b[i+1]` is not counted. Parentheses do not
//! affect nesting.
//!
//! ```text
//! a[i][j] = a[i][j] + b[i+1][j] * (c[i][j] - d[i][j]) / e[i][j];
//!                   ^         x    ^         ^          ^          -> 4
//! ```
//!
//! This is a heuristic, not a parse: unary minus counts as an operation, and
//! in a compound assignment like `x += y * z` the operator before `=` belongs
//! to the skipped target.

/// Estimated arithmetic operations per execution of `expr`.
pub fn operation_density(expr: &str) -> u64 {
    let rhs = match expr.find('=') {
        Some(pos) => &expr[pos + 1..],
        None => expr,
    };

    let mut depth: i64 = 0;
    let mut ops = 0;
    for c in rhs.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            '+' | '-' | '*' | '/' if depth == 0 => ops += 1,
            _ => {}
        }
    }
    ops
}
