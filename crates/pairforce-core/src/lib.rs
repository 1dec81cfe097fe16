//! # Pairforce Core Library
//!
//! Evaluation of user-defined pairwise nonbonded interactions: an energy expression in the
//! pair distance `r`, per-particle parameters merged through combining rules, global
//! parameters, and per-pair exceptions that exclude a pair or give it explicit parameters.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data and math: the expression language, the
//!   force definition (`CustomNonbondedForce`), validation into immutable tables, combining
//!   rules, pair enumeration and the reference pair evaluator.
//!
//! - **[`engine`]: The Logic Core.** The kernel contract (`CustomNonbondedKernel`) and its
//!   reference implementation, run-time configuration, progress reporting and the unified
//!   error type.
//!
//! - **[`workflows`]: The Public API.** End-to-end entry points that evaluate energies and
//!   forces over coordinate frames or check a force definition for consistency.
//!
//! ## Features
//!
//! - `parallel` (default) - evaluates the pair loop on the rayon thread pool.

pub mod core;
pub mod engine;
pub mod workflows;
