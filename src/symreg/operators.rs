//! Named arithmetic operators for symbolic regression.
//!
//! Operators that are undefined on part of their domain are protected: they
//! return `1.0` instead of producing an infinity or NaN.

use crate::error::{GpError, GpResult};
use crate::gp::{Catalog, NodeView, Operator};
use crate::symreg::dataset::Sample;
use serde::{Deserialize, Serialize};

/// Names accepted by [`operator`].
pub const OPERATOR_NAMES: [&str; 9] = ["add", "sub", "mul", "div", "sin", "cos", "sqrt", "log", "exp"];

/// Range generated constants are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantRange {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl Default for ConstantRange {
    fn default() -> Self {
        Self { min: -1.0, max: 1.0 }
    }
}

fn arg(node: &NodeView<'_, Sample>, slot: usize, sample: &Sample) -> f64 {
    node.child(slot).evaluate(sample)
}

/// Look up an operator by name.
#[must_use]
pub fn operator(name: &str) -> Option<Operator<Sample>> {
    let op: Operator<Sample> = match name {
        "add" => Operator::new("+", 2, |n, s| arg(n, 0, s) + arg(n, 1, s)),
        "sub" => Operator::new("-", 2, |n, s| arg(n, 0, s) - arg(n, 1, s)),
        "mul" => Operator::new("*", 2, |n, s| arg(n, 0, s) * arg(n, 1, s)),
        "div" => Operator::new("/", 2, |n, s| {
            let divisor = arg(n, 1, s);
            if divisor == 0.0 { 1.0 } else { arg(n, 0, s) / divisor }
        }),
        "sin" => Operator::new("sin", 1, |n, s| arg(n, 0, s).sin()),
        "cos" => Operator::new("cos", 1, |n, s| arg(n, 0, s).cos()),
        "sqrt" => Operator::new("sqrt", 1, |n, s| {
            let value = arg(n, 0, s);
            if value < 0.0 { 1.0 } else { value.sqrt() }
        }),
        "log" => Operator::new("log", 1, |n, s| {
            let value = arg(n, 0, s);
            if value <= 0.0 { 1.0 } else { value.log10() }
        }),
        "exp" => Operator::new("exp", 1, |n, s| arg(n, 0, s).exp()),
        _ => return None,
    };
    Some(op)
}

/// Terminal reading input column `index` (rendered as `x{index + 1}`).
///
/// A sample without that column evaluates to NaN.
#[must_use]
pub fn variable(index: usize) -> Operator<Sample> {
    Operator::terminal(format!("x{}", index + 1), move |s: &Sample| {
        s.inputs.get(index).copied().unwrap_or(f64::NAN)
    })
}

/// Build the catalog for a regression problem.
///
/// Holds the named operators, one variable per input column and, when
/// `constants` is given, a generated constant drawn from that range.
///
/// # Errors
///
/// Returns [`GpError::Configuration`] for unknown or repeated operator
/// names, an empty or non-finite constant range, or a catalog without any
/// terminal.
pub fn build_catalog<S: AsRef<str>>(
    names: &[S],
    inputs: usize,
    constants: Option<ConstantRange>,
) -> GpResult<Catalog<Sample>> {
    let mut operators = Vec::with_capacity(names.len() + inputs + 1);
    for (i, name) in names.iter().map(AsRef::as_ref).enumerate() {
        if names[..i].iter().any(|earlier| earlier.as_ref() == name) {
            return Err(GpError::config(format!("operator '{name}' is listed twice")));
        }
        let op = operator(name).ok_or_else(|| {
            GpError::config(format!(
                "unknown operator '{name}', expected one of: {}",
                OPERATOR_NAMES.join(", ")
            ))
        })?;
        operators.push(op);
    }

    operators.extend((0..inputs).map(variable));

    if let Some(range) = constants {
        if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
            return Err(GpError::config(format!(
                "invalid constant range [{}, {}]",
                range.min, range.max
            )));
        }
        operators.push(Operator::constant(range.min, range.max));
    }

    Catalog::new(operators)
}
