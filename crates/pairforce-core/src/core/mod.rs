//! # Core Module
//!
//! Stateless building blocks of the library: compiled expressions, the custom nonbonded
//! force and its evaluator, the particle system description, and geometry helpers.
//!
//! ## Architecture
//!
//! - **Expressions** ([`expression`]) - Parsing, evaluation and differentiation of scalar formulas
//! - **Force Definition and Evaluation** ([`forcefield`]) - Parameters, exceptions, validation,
//!   combining rules, pair enumeration and the reference pair evaluator
//! - **System Description** ([`models`]) - Particle count and periodic box
//! - **Geometry** ([`utils`]) - Pair separation with optional minimum-image convention

pub mod expression;
pub mod forcefield;
pub mod models;
pub mod utils;
