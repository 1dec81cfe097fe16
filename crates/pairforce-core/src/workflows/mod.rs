//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) and [`core`](crate::core)
//! layers together.
//!
//! ## Overview
//!
//! A workflow accepts a force definition, the system it applies to, and the data to process,
//! and takes care of kernel setup, configuration overrides and progress reporting.
//!
//! - **Evaluation Workflow** ([`evaluate`]) - Energies and forces over a sequence of
//!   coordinate frames, plus a validation-only check

pub mod evaluate;
