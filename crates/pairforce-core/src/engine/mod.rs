//! # Engine Module
//!
//! Stateful evaluation machinery built on top of [`core`](crate::core).
//!
//! ## Overview
//!
//! A kernel takes a [`CustomNonbondedForce`](crate::core::forcefield::params::CustomNonbondedForce)
//! and the [`ParticleSystem`](crate::core::models::system::ParticleSystem) it belongs to,
//! validates and compiles it once, and then evaluates forces and energies for any number of
//! coordinate sets. Each evaluation call depends only on its own inputs.
//!
//! ## Architecture
//!
//! - **Kernel Contract** ([`kernel`]) - The backend trait and the reference implementation
//! - **Configuration** ([`config`]) - Run-time overrides of cutoff, method and globals
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-level error type wrapping the lower layers

pub mod config;
pub mod error;
pub mod kernel;
pub mod progress;
