// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! gpsr: tree-based genetic programming for symbolic regression.
//!
//! The crate has two layers:
//! - [`gp`]: a generic engine that evolves expression trees over any
//!   operator catalog and context type, under depth and size bounds and a
//!   fixed budget of penalty evaluations
//! - [`symreg`]: symbolic regression on top of it, with a named arithmetic
//!   operator table, tabular sample files and a root-sum-squared penalty
//!
//! [`config`] ties both together into a run description loaded from JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   CLI (gpsr evolve / check)         │
//! ├─────────────────────────────────────┤
//! │   RunConfig  →  symreg problem      │
//! ├─────────────────────────────────────┤
//! │   gp::Engine (generic over C)       │
//! └─────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gp;
pub mod symreg;

pub use config::{ConfigError, ConstantRange, RunConfig};
pub use error::{GpError, GpResult};
pub use gp::{Catalog, Engine, EngineConfig, Operator, Penalty, Tree};
