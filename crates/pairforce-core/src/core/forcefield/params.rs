use super::validation::SpecificationError;
use crate::core::expression::Variables;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CUTOFF_DISTANCE: f64 = 1.0;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NonbondedMethod {
    #[default]
    NoCutoff,
    CutoffNonPeriodic,
    CutoffPeriodic,
}

impl NonbondedMethod {
    pub fn uses_cutoff(self) -> bool {
        !matches!(self, NonbondedMethod::NoCutoff)
    }

    pub fn uses_periodic_boundaries(self) -> bool {
        matches!(self, NonbondedMethod::CutoffPeriodic)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PerParticleParameter {
    pub name: String,
    #[serde(default)]
    pub combining_rule: Option<String>,
}

impl PerParticleParameter {
    /// The rule used to merge the two particles' values, `name1*name2` when unspecified.
    pub fn combining_rule(&self) -> String {
        self.combining_rule
            .clone()
            .unwrap_or_else(|| format!("{0}1*{0}2", self.name))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GlobalParameter {
    pub name: String,
    #[serde(default)]
    pub default_value: f64,
}

/// One row of the exception table as supplied by the user. An empty
/// `parameters` vector excludes the pair entirely.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExceptionEntry {
    pub particle1: usize,
    pub particle2: usize,
    #[serde(default)]
    pub parameters: Vec<f64>,
}

fn default_cutoff_distance() -> f64 {
    DEFAULT_CUTOFF_DISTANCE
}

/// A user-defined pairwise potential together with its per-particle parameter
/// table and exception table.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CustomNonbondedForce {
    energy: String,
    #[serde(default)]
    nonbonded_method: NonbondedMethod,
    #[serde(default = "default_cutoff_distance")]
    cutoff_distance: f64,
    #[serde(default)]
    particles: Vec<Vec<f64>>,
    #[serde(default)]
    per_particle_parameters: Vec<PerParticleParameter>,
    #[serde(default)]
    global_parameters: Vec<GlobalParameter>,
    #[serde(default)]
    exceptions: Vec<ExceptionEntry>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl CustomNonbondedForce {
    pub fn new(energy: impl Into<String>) -> Self {
        Self {
            energy: energy.into(),
            nonbonded_method: NonbondedMethod::default(),
            cutoff_distance: DEFAULT_CUTOFF_DISTANCE,
            particles: Vec::new(),
            per_particle_parameters: Vec::new(),
            global_parameters: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn energy(&self) -> &str {
        &self.energy
    }

    pub fn set_energy(&mut self, energy: impl Into<String>) {
        self.energy = energy.into();
    }

    pub fn nonbonded_method(&self) -> NonbondedMethod {
        self.nonbonded_method
    }

    pub fn set_nonbonded_method(&mut self, method: NonbondedMethod) {
        self.nonbonded_method = method;
    }

    pub fn cutoff_distance(&self) -> f64 {
        self.cutoff_distance
    }

    pub fn set_cutoff_distance(&mut self, distance: f64) {
        self.cutoff_distance = distance;
    }

    pub fn add_per_particle_parameter(
        &mut self,
        name: impl Into<String>,
        combining_rule: Option<String>,
    ) -> usize {
        self.per_particle_parameters.push(PerParticleParameter {
            name: name.into(),
            combining_rule,
        });
        self.per_particle_parameters.len() - 1
    }

    pub fn per_particle_parameters(&self) -> &[PerParticleParameter] {
        &self.per_particle_parameters
    }

    pub fn num_per_particle_parameters(&self) -> usize {
        self.per_particle_parameters.len()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.per_particle_parameters
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn add_global_parameter(&mut self, name: impl Into<String>, default_value: f64) -> usize {
        self.global_parameters.push(GlobalParameter {
            name: name.into(),
            default_value,
        });
        self.global_parameters.len() - 1
    }

    pub fn global_parameters(&self) -> &[GlobalParameter] {
        &self.global_parameters
    }

    pub fn num_global_parameters(&self) -> usize {
        self.global_parameters.len()
    }

    pub fn default_global_parameters(&self) -> Variables {
        self.global_parameters
            .iter()
            .map(|g| (g.name.clone(), g.default_value))
            .collect()
    }

    pub fn add_particle(&mut self, parameters: Vec<f64>) -> usize {
        self.particles.push(parameters);
        self.particles.len() - 1
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn particle_parameters(&self, index: usize) -> Option<&[f64]> {
        self.particles.get(index).map(Vec::as_slice)
    }

    pub fn particles(&self) -> &[Vec<f64>] {
        &self.particles
    }

    pub fn set_particle_parameters(
        &mut self,
        index: usize,
        parameters: Vec<f64>,
    ) -> Result<(), SpecificationError> {
        let slot = self
            .particles
            .get_mut(index)
            .ok_or(SpecificationError::UnknownParticle(index))?;
        *slot = parameters;
        Ok(())
    }

    pub fn add_exception(&mut self, particle1: usize, particle2: usize, parameters: Vec<f64>) -> usize {
        self.exceptions.push(ExceptionEntry {
            particle1,
            particle2,
            parameters,
        });
        self.exceptions.len() - 1
    }

    pub fn exceptions(&self) -> &[ExceptionEntry] {
        &self.exceptions
    }

    pub fn num_exceptions(&self) -> usize {
        self.exceptions.len()
    }

    pub fn set_exception_parameters(
        &mut self,
        index: usize,
        particle1: usize,
        particle2: usize,
        parameters: Vec<f64>,
    ) -> Result<(), SpecificationError> {
        let slot = self
            .exceptions
            .get_mut(index)
            .ok_or(SpecificationError::UnknownException(index))?;
        *slot = ExceptionEntry {
            particle1,
            particle2,
            parameters,
        };
        Ok(())
    }
}
