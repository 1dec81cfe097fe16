use crate::core::expression::Variables;
use crate::core::forcefield::params::{CustomNonbondedForce, NonbondedMethod};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Cutoff distance must be positive and finite, got {0}")]
    InvalidCutoff(f64),
    #[error("Global parameter '{name}' has non-finite value {value}")]
    NonFiniteGlobal { name: String, value: f64 },
}

/// Run-time adjustments applied on top of a force definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationConfig {
    pub nonbonded_method: Option<NonbondedMethod>,
    pub cutoff_distance: Option<f64>,
    pub global_parameters: Variables,
    pub per_particle_energy: bool,
}

impl EvaluationConfig {
    /// Returns a copy of `force` with the overrides applied.
    ///
    /// A cutoff override on a force without a cutoff switches it to
    /// [`NonbondedMethod::CutoffNonPeriodic`] unless a method is also given.
    pub fn apply_to(&self, force: &CustomNonbondedForce) -> CustomNonbondedForce {
        let mut force = force.clone();
        if let Some(distance) = self.cutoff_distance {
            force.set_cutoff_distance(distance);
            if !force.nonbonded_method().uses_cutoff() {
                force.set_nonbonded_method(NonbondedMethod::CutoffNonPeriodic);
            }
        }
        if let Some(method) = self.nonbonded_method {
            force.set_nonbonded_method(method);
        }
        force
    }
}

#[derive(Default)]
pub struct EvaluationConfigBuilder {
    nonbonded_method: Option<NonbondedMethod>,
    cutoff_distance: Option<f64>,
    global_parameters: Variables,
    per_particle_energy: bool,
}

impl EvaluationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonbonded_method(mut self, method: NonbondedMethod) -> Self {
        self.nonbonded_method = Some(method);
        self
    }
    pub fn cutoff_distance(mut self, distance: f64) -> Self {
        self.cutoff_distance = Some(distance);
        self
    }
    pub fn global_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.global_parameters.insert(name.into(), value);
        self
    }
    pub fn global_parameters(mut self, values: Variables) -> Self {
        self.global_parameters.extend(values);
        self
    }
    pub fn per_particle_energy(mut self, enabled: bool) -> Self {
        self.per_particle_energy = enabled;
        self
    }

    pub fn build(self) -> Result<EvaluationConfig, ConfigError> {
        if let Some(distance) = self.cutoff_distance {
            if !(distance.is_finite() && distance > 0.0) {
                return Err(ConfigError::InvalidCutoff(distance));
            }
        }
        if let Some((name, &value)) = self
            .global_parameters
            .iter()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(ConfigError::NonFiniteGlobal {
                name: name.clone(),
                value,
            });
        }
        Ok(EvaluationConfig {
            nonbonded_method: self.nonbonded_method,
            cutoff_distance: self.cutoff_distance,
            global_parameters: self.global_parameters,
            per_particle_energy: self.per_particle_energy,
        })
    }
}
