//! # Force Field Module
//!
//! Definition, validation and reference evaluation of a custom pairwise nonbonded force.
//!
//! ## Overview
//!
//! A [`params::CustomNonbondedForce`] describes the interaction as data: an energy expression
//! in the pair distance `r`, per-particle parameters with their combining rules, global
//! parameters, and exceptions that either exclude a pair or give it explicit parameters.
//! Before anything is evaluated the description is checked against a
//! [`ParticleSystem`](crate::core::models::system::ParticleSystem) by
//! [`validation::validate`], which yields immutable tables.
//!
//! Evaluation happens in two passes over those tables:
//!
//! - the **generic pass** visits candidate pairs (all non-excepted pairs, or a neighbor list
//!   when a cutoff is active) and combines the two particles' parameters per pair;
//! - the **exception pass** visits every exception carrying explicit parameters and uses
//!   them as-is.
//!
//! ## Key Components
//!
//! - [`params`] - The force description and its TOML form
//! - [`validation`] - Consistency checks and the validated tables
//! - [`exceptions`] - Exception table with symmetric partner lookup
//! - [`combining`] - Per-pair combining rules
//! - [`pairs`] - Neighbor lists and pair enumeration
//! - [`interaction`] - The energy and force evaluator

pub mod combining;
pub mod exceptions;
pub mod interaction;
pub mod pairs;
pub mod params;
pub mod validation;
