//! Error types for tree construction and the evolutionary engine.

use thiserror::Error;

/// Errors raised by the GP core.
///
/// Crossover rejection is not represented here: invalid offspring are an
/// expected outcome and are dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpError {
    /// The operator table or engine configuration cannot support evolution.
    ///
    /// Detected eagerly when the catalog or engine is built, before any
    /// generation runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A textual expression could not be turned into a tree.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A generator was asked for a tree its budget cannot hold.
    ///
    /// The engine sizes every request so this never happens; seeing it means
    /// a budget invariant was broken.
    #[error("cannot build a tree with depth {max_depth} in {max_nodes} nodes: {reason}")]
    ConstructionInfeasible {
        /// Requested depth budget.
        max_depth: usize,
        /// Requested node budget.
        max_nodes: usize,
        /// What went wrong.
        reason: &'static str,
    },
}

impl GpError {
    /// Shorthand for a [`GpError::Configuration`] error.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type for GP operations.
pub type GpResult<T> = Result<T, GpError>;
