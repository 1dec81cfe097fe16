use pairforce::core::forcefield::params::CustomNonbondedForce;
use pairforce::core::models::system::ParticleSystem;
use pairforce::engine::config::EvaluationConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub force_path: PathBuf,
    pub num_particles: Option<usize>,
    pub periodic_box: Option<[f64; 3]>,
    pub evaluation: EvaluationConfig,
}

impl AppConfig {
    /// The system a loaded force is evaluated in. The particle count defaults to the
    /// number of particles the force defines.
    pub fn system_for(&self, force: &CustomNonbondedForce) -> ParticleSystem {
        let mut system = ParticleSystem::new(self.num_particles.unwrap_or(force.num_particles()));
        system.set_periodic_box(self.periodic_box);
        system
    }
}
