//! # Expression Module
//!
//! Compiled scalar expressions used for energies, radial derivatives and combining rules.
//!
//! ## Overview
//!
//! The interaction engine never inspects an expression's structure. It only asks for a value
//! given a set of bound variables, through the [`Expression`] trait. Two families of
//! implementations are available:
//!
//! - **Closures** - any `Fn(&Variables) -> Result<f64, ExpressionError>` is an expression,
//!   which keeps hand-written potentials and test doubles cheap to express.
//! - **Compiled programs** ([`ExpressionProgram`]) - parsed from text such as
//!   `"4*eps*(s6^2-s6); s6=(sigma/r)^6"`, with support for symbolic differentiation so the
//!   radial force can be derived from the energy.
//!
//! ## Grammar
//!
//! Numbers, identifiers, `+ - * / ^`, unary minus, parentheses and the functions
//! `sqrt exp log sin cos tan abs step min max`. `^` is right-associative and binds tighter
//! than unary minus. Intermediate definitions follow the main expression, separated by `;`.

mod parser;
mod program;

pub use program::ExpressionProgram;

use std::collections::HashMap;
use thiserror::Error;

/// Variable bindings visible to an expression during one evaluation.
pub type Variables = HashMap<String, f64>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },
    #[error("Definition of '{0}' refers back to itself")]
    CyclicDefinition(String),
    #[error("Reference to undefined variable '{0}'")]
    UndefinedVariable(String),
}

pub trait Expression: Send + Sync {
    fn evaluate(&self, variables: &Variables) -> Result<f64, ExpressionError>;
}

impl<F> Expression for F
where
    F: Fn(&Variables) -> Result<f64, ExpressionError> + Send + Sync,
{
    #[inline]
    fn evaluate(&self, variables: &Variables) -> Result<f64, ExpressionError> {
        self(variables)
    }
}

/// Looks up a bound variable, failing with [`ExpressionError::UndefinedVariable`].
#[inline]
pub fn lookup(variables: &Variables, name: &str) -> Result<f64, ExpressionError> {
    variables
        .get(name)
        .copied()
        .ok_or_else(|| ExpressionError::UndefinedVariable(name.to_string()))
}
