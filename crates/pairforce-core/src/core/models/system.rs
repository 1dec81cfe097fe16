use nalgebra::Vector3;
use serde::Deserialize;

/// The owning system of a force: how many particles exist and, for periodic
/// simulations, the orthorhombic box edge lengths.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParticleSystem {
    num_particles: usize,
    #[serde(default)]
    periodic_box: Option<[f64; 3]>,
}

impl ParticleSystem {
    pub fn new(num_particles: usize) -> Self {
        Self {
            num_particles,
            periodic_box: None,
        }
    }

    pub fn with_periodic_box(mut self, box_size: [f64; 3]) -> Self {
        self.periodic_box = Some(box_size);
        self
    }

    #[inline]
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    #[inline]
    pub fn periodic_box(&self) -> Option<Vector3<f64>> {
        self.periodic_box.map(Vector3::from)
    }

    pub fn set_periodic_box(&mut self, box_size: Option<[f64; 3]>) {
        self.periodic_box = box_size;
    }
}
