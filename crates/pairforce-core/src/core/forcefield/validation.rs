use super::exceptions::{ExceptionTable, PairOverride};
use super::params::CustomNonbondedForce;
use crate::core::models::system::ParticleSystem;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecificationError {
    #[error("Force defines {found} particles but the system has {expected}")]
    ParticleCountMismatch { expected: usize, found: usize },
    #[error("Wrong number of parameters for particle {particle}: expected {expected}, found {found}")]
    WrongParticleParameterCount {
        particle: usize,
        expected: usize,
        found: usize,
    },
    #[error("Illegal particle index {particle} in exception {exception}")]
    IllegalExceptionParticle { exception: usize, particle: usize },
    #[error("Exception {exception} pairs particle {particle} with itself")]
    SelfException { exception: usize, particle: usize },
    #[error("Multiple exceptions are specified for particles {particle1} and {particle2}")]
    DuplicateException { particle1: usize, particle2: usize },
    #[error("Wrong number of parameters for exception {exception}: expected 0 or {expected}, found {found}")]
    WrongExceptionParameterCount {
        exception: usize,
        expected: usize,
        found: usize,
    },
    #[error("No particle with index {0}")]
    UnknownParticle(usize),
    #[error("No exception with index {0}")]
    UnknownException(usize),
}

/// Parameter and exception tables that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTables {
    pub particle_parameters: Vec<Vec<f64>>,
    pub exceptions: ExceptionTable,
}

/// Checks a force definition against its system, stopping at the first problem.
pub fn validate(
    system: &ParticleSystem,
    force: &CustomNonbondedForce,
) -> Result<ValidatedTables, SpecificationError> {
    let num_particles = force.num_particles();
    if num_particles != system.num_particles() {
        return Err(SpecificationError::ParticleCountMismatch {
            expected: system.num_particles(),
            found: num_particles,
        });
    }

    let num_parameters = force.num_per_particle_parameters();
    for (particle, parameters) in force.particles().iter().enumerate() {
        if parameters.len() != num_parameters {
            return Err(SpecificationError::WrongParticleParameterCount {
                particle,
                expected: num_parameters,
                found: parameters.len(),
            });
        }
    }

    let mut claimed: Vec<HashSet<usize>> = vec![HashSet::new(); num_particles];
    let mut exceptions = ExceptionTable::new(num_particles);
    for (index, entry) in force.exceptions().iter().enumerate() {
        for particle in [entry.particle1, entry.particle2] {
            if particle >= num_particles {
                return Err(SpecificationError::IllegalExceptionParticle {
                    exception: index,
                    particle,
                });
            }
        }
        let (a, b) = (entry.particle1, entry.particle2);
        if a == b {
            return Err(SpecificationError::SelfException {
                exception: index,
                particle: a,
            });
        }
        if claimed[a].contains(&b) || claimed[b].contains(&a) {
            return Err(SpecificationError::DuplicateException {
                particle1: a,
                particle2: b,
            });
        }
        let kind = match entry.parameters.len() {
            0 => PairOverride::Excluded,
            n if n == num_parameters => PairOverride::Override(entry.parameters.clone()),
            found => {
                return Err(SpecificationError::WrongExceptionParameterCount {
                    exception: index,
                    expected: num_parameters,
                    found,
                });
            }
        };
        claimed[a].insert(b);
        claimed[b].insert(a);
        exceptions.push(a, b, kind);
    }

    Ok(ValidatedTables {
        particle_parameters: force.particles().to_vec(),
        exceptions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn force_with_particles(n: usize) -> CustomNonbondedForce {
        let mut force = CustomNonbondedForce::new("q/r");
        force.add_per_particle_parameter("q", None);
        for _ in 0..n {
            force.add_particle(vec![1.0]);
        }
        force
    }

    #[test]
    fn accepts_consistent_specification() {
        let mut force = force_with_particles(3);
        force.add_exception(0, 1, vec![]);
        force.add_exception(1, 2, vec![0.5]);
        let tables = validate(&ParticleSystem::new(3), &force).unwrap();
        assert_eq!(tables.particle_parameters.len(), 3);
        assert_eq!(tables.exceptions.len(), 2);
        assert_eq!(tables.exceptions.entries()[0].kind, PairOverride::Excluded);
        assert_eq!(
            tables.exceptions.entries()[1].kind,
            PairOverride::Override(vec![0.5])
        );
    }

    #[test]
    fn rejects_particle_count_mismatch() {
        let force = force_with_particles(2);
        assert_eq!(
            validate(&ParticleSystem::new(3), &force),
            Err(SpecificationError::ParticleCountMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_wrong_particle_parameter_length_naming_the_particle() {
        let mut force = force_with_particles(3);
        force.set_particle_parameters(2, vec![1.0, 2.0]).unwrap();
        assert_eq!(
            validate(&ParticleSystem::new(3), &force),
            Err(SpecificationError::WrongParticleParameterCount {
                particle: 2,
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_exception_with_out_of_range_particle() {
        let mut force = force_with_particles(3);
        force.add_exception(0, 3, vec![]);
        assert_eq!(
            validate(&ParticleSystem::new(3), &force),
            Err(SpecificationError::IllegalExceptionParticle {
                exception: 0,
                particle: 3
            })
        );
    }

    #[test]
    fn rejects_exception_of_particle_with_itself() {
        let mut force = force_with_particles(3);
        force.add_exception(1, 1, vec![]);
        assert!(matches!(
            validate(&ParticleSystem::new(3), &force),
            Err(SpecificationError::SelfException { particle: 1, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_exception_in_either_direction() {
        let mut force = force_with_particles(6);
        force.add_exception(2, 5, vec![]);
        force.add_exception(5, 2, vec![1.0]);
        assert_eq!(
            validate(&ParticleSystem::new(6), &force),
            Err(SpecificationError::DuplicateException {
                particle1: 5,
                particle2: 2
            })
        );
    }

    #[test]
    fn rejects_exception_parameter_vector_of_wrong_length() {
        let mut force = force_with_particles(3);
        force.add_exception(0, 1, vec![]);
        force.add_exception(0, 2, vec![1.0, 2.0]);
        assert_eq!(
            validate(&ParticleSystem::new(3), &force),
            Err(SpecificationError::WrongExceptionParameterCount {
                exception: 1,
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn reports_first_problem_in_documented_order() {
        let mut force = force_with_particles(2);
        force.set_particle_parameters(0, vec![]).unwrap();
        force.add_exception(0, 7, vec![]);
        assert!(matches!(
            validate(&ParticleSystem::new(2), &force),
            Err(SpecificationError::WrongParticleParameterCount { particle: 0, .. })
        ));
    }
}
