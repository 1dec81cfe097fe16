use thiserror::Error;

use crate::core::expression::ExpressionError;
use crate::core::forcefield::interaction::SetupError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::forcefield::validation::SpecificationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid force specification: {source}")]
    Specification {
        #[from]
        source: SpecificationError,
    },

    #[error("Invalid interaction setup: {source}")]
    Setup {
        #[from]
        source: SetupError,
    },

    #[error("Expression evaluation failed: {source}")]
    Expression {
        #[from]
        source: ExpressionError,
    },

    #[error("Failed to compile {what}: {source}")]
    Compilation {
        what: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Failed to load force definition: {source}")]
    ParamLoad {
        #[from]
        source: ParamLoadError,
    },

    #[error("Kernel has not been initialized")]
    NotInitialized,

    #[error("Expected {expected} particle positions, found {found}")]
    PositionCountMismatch { expected: usize, found: usize },

    #[error("Periodic cutoff requires the system to define a periodic box")]
    MissingPeriodicBox,

    #[error("The {what} buffer has length {found}, expected {expected}")]
    BufferSizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Neighbor list pair ({i}, {j}) is invalid for {num_particles} particles")]
    InvalidNeighborPair {
        i: usize,
        j: usize,
        num_particles: usize,
    },

    #[error("Name '{0}' is declared more than once among parameters, globals and 'r'")]
    NameConflict(String),

    #[error("Global parameter '{0}' is not declared by the force")]
    UnknownGlobalParameter(String),

    #[error("Per-particle parameter count changed from {expected} to {found} after initialization")]
    ParameterLayoutChanged { expected: usize, found: usize },
}
