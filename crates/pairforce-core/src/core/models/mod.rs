//! # Core Models Module
//!
//! Descriptions of the system a force is attached to.
//!
//! ## Key Components
//!
//! - [`system`] - The particle count and optional periodic box a force definition must agree with

pub mod system;
