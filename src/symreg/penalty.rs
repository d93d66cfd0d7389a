//! Regression penalty.

use crate::gp::{Penalty, Tree};
use crate::symreg::dataset::Sample;

/// Root of the summed squared residuals, `sqrt(Σ (f(x) - y)²)`.
///
/// Non-finite results become `f64::INFINITY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootSumSquaredError;

impl Penalty<Sample> for RootSumSquaredError {
    fn calculate(&self, contexts: &[Sample], tree: &Tree<Sample>) -> f64 {
        let sum: f64 = contexts
            .iter()
            .map(|sample| {
                let diff = tree.evaluate(sample) - sample.target;
                diff * diff
            })
            .sum();
        let penalty = sum.sqrt();
        if penalty.is_finite() { penalty } else { f64::INFINITY }
    }
}
