use super::combining::{CombiningRules, set_variable};
use super::exceptions::ExceptionTable;
use super::pairs::{NeighborList, PairSource};
use crate::core::expression::{Expression, ExpressionError, Variables};
use crate::core::utils::geometry::separation;
use nalgebra::{Point3, Vector3};
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("Cutoff distance must be positive and finite, got {0}")]
    InvalidCutoff(f64),
    #[error("Periodic boundary conditions require a cutoff to be set first")]
    PeriodicWithoutCutoff,
    #[error("Periodic box edge {axis} ({size}) must be finite and at least twice the cutoff distance ({cutoff})")]
    BoxTooSmall { axis: char, size: f64, cutoff: f64 },
}

/// Accumulation targets for one evaluation call. Every target is added to,
/// never overwritten; clearing between calls is the caller's job.
#[derive(Debug, Default)]
pub struct ForceBuffers<'a> {
    pub forces: Option<&'a mut [Vector3<f64>]>,
    pub energy_by_particle: Option<&'a mut [f64]>,
    pub total_energy: Option<&'a mut f64>,
}

impl<'a> ForceBuffers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forces(mut self, forces: &'a mut [Vector3<f64>]) -> Self {
        self.forces = Some(forces);
        self
    }

    pub fn with_energy_by_particle(mut self, energies: &'a mut [f64]) -> Self {
        self.energy_by_particle = Some(energies);
        self
    }

    pub fn with_total_energy(mut self, total: &'a mut f64) -> Self {
        self.total_energy = Some(total);
        self
    }

    #[inline]
    fn wants_energy(&self) -> bool {
        self.total_energy.is_some() || self.energy_by_particle.is_some()
    }
}

/// Owned per-worker partial sums shaped like a set of [`ForceBuffers`].
#[cfg(feature = "parallel")]
#[derive(Clone)]
struct PartialBuffers {
    forces: Option<Vec<Vector3<f64>>>,
    energy_by_particle: Option<Vec<f64>>,
    total_energy: Option<f64>,
}

#[cfg(feature = "parallel")]
impl PartialBuffers {
    fn shaped_like(target: &ForceBuffers<'_>, num_particles: usize) -> Self {
        Self {
            forces: target
                .forces
                .as_ref()
                .map(|_| vec![Vector3::zeros(); num_particles]),
            energy_by_particle: target
                .energy_by_particle
                .as_ref()
                .map(|_| vec![0.0; num_particles]),
            total_energy: target.total_energy.as_ref().map(|_| 0.0),
        }
    }

    fn as_buffers(&mut self) -> ForceBuffers<'_> {
        ForceBuffers {
            forces: self.forces.as_deref_mut(),
            energy_by_particle: self.energy_by_particle.as_deref_mut(),
            total_energy: self.total_energy.as_mut(),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        if let (Some(a), Some(b)) = (self.forces.as_mut(), other.forces) {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
        if let (Some(a), Some(b)) = (self.energy_by_particle.as_mut(), other.energy_by_particle) {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
        if let (Some(a), Some(b)) = (self.total_energy.as_mut(), other.total_energy) {
            *a += b;
        }
        self
    }

    fn add_into(self, target: &mut ForceBuffers<'_>) {
        if let (Some(a), Some(b)) = (target.forces.as_deref_mut(), self.forces) {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
        if let (Some(a), Some(b)) = (target.energy_by_particle.as_deref_mut(), self.energy_by_particle)
        {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
        if let (Some(a), Some(b)) = (target.total_energy.as_deref_mut(), self.total_energy) {
            *a += b;
        }
    }
}

/// Every edge must be finite and at least twice the cutoff.
fn check_box(box_size: &[f64; 3], cutoff: f64) -> Result<(), SetupError> {
    for (axis, &size) in ['x', 'y', 'z'].iter().zip(box_size) {
        if !(size.is_finite() && size >= 2.0 * cutoff) {
            return Err(SetupError::BoxTooSmall {
                axis: *axis,
                size,
                cutoff,
            });
        }
    }
    Ok(())
}

/// Evaluates a user-defined pair potential over a set of particles.
///
/// `force_expression` is the radial derivative dE/dr of `energy_expression`.
/// Cutoff and periodic settings are fixed between evaluation calls and only
/// change through [`set_use_cutoff`](Self::set_use_cutoff) and
/// [`set_periodic`](Self::set_periodic).
pub struct CustomNonbondedInteraction<E> {
    energy_expression: E,
    force_expression: E,
    combining_rules: CombiningRules<E>,
    cutoff: Option<f64>,
    periodic_box: Option<Vector3<f64>>,
}

impl<E: Expression> CustomNonbondedInteraction<E> {
    pub fn new(energy_expression: E, force_expression: E, combining_rules: CombiningRules<E>) -> Self {
        Self {
            energy_expression,
            force_expression,
            combining_rules,
            cutoff: None,
            periodic_box: None,
        }
    }

    pub fn set_use_cutoff(&mut self, distance: f64) -> Result<(), SetupError> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(SetupError::InvalidCutoff(distance));
        }
        if let Some(b) = &self.periodic_box {
            check_box(&[b.x, b.y, b.z], distance)?;
        }
        self.cutoff = Some(distance);
        Ok(())
    }

    pub fn set_periodic(&mut self, box_size: [f64; 3]) -> Result<(), SetupError> {
        let cutoff = self.cutoff.ok_or(SetupError::PeriodicWithoutCutoff)?;
        check_box(&box_size, cutoff)?;
        self.periodic_box = Some(Vector3::from(box_size));
        Ok(())
    }

    pub fn cutoff_distance(&self) -> Option<f64> {
        self.cutoff
    }

    pub fn periodic_box(&self) -> Option<&Vector3<f64>> {
        self.periodic_box.as_ref()
    }

    pub fn combining_rules(&self) -> &CombiningRules<E> {
        &self.combining_rules
    }

    /// Generic pass: every candidate pair, parameters from the combining rules.
    ///
    /// With a cutoff the pairs come from `neighbors` (built on the spot when
    /// absent); without one, all pairs are visited except those in `exceptions`.
    pub fn calculate_pair_ixn(
        &self,
        positions: &[Point3<f64>],
        particle_parameters: &[Vec<f64>],
        exceptions: &ExceptionTable,
        neighbors: Option<&NeighborList>,
        globals: &Variables,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), ExpressionError> {
        let built;
        let source = match self.cutoff {
            Some(cutoff) => {
                let list = match neighbors {
                    Some(list) => list,
                    None => {
                        built = NeighborList::build(
                            positions,
                            cutoff,
                            self.periodic_box.as_ref(),
                            exceptions,
                        );
                        debug!(pairs = built.len(), "Built neighbor list for cutoff evaluation.");
                        &built
                    }
                };
                PairSource::NeighborList(list)
            }
            None => PairSource::Exhaustive {
                num_particles: positions.len(),
                exceptions,
            },
        };
        self.accumulate_pairs(positions, particle_parameters, source, globals, buffers)
    }

    #[cfg(not(feature = "parallel"))]
    fn accumulate_pairs(
        &self,
        positions: &[Point3<f64>],
        particle_parameters: &[Vec<f64>],
        source: PairSource<'_>,
        globals: &Variables,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), ExpressionError> {
        let mut scratch = globals.clone();
        let mut variables = globals.clone();
        for (i, j) in source.pairs() {
            self.combining_rules
                .combine(i, j, particle_parameters, &mut scratch, &mut variables)?;
            self.calculate_one_ixn(i, j, positions, &mut variables, buffers)?;
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn accumulate_pairs(
        &self,
        positions: &[Point3<f64>],
        particle_parameters: &[Vec<f64>],
        source: PairSource<'_>,
        globals: &Variables,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), ExpressionError> {
        struct Worker {
            partial: PartialBuffers,
            scratch: Variables,
            variables: Variables,
        }

        let template = PartialBuffers::shaped_like(buffers, positions.len());
        let new_worker = || Worker {
            partial: template.clone(),
            scratch: globals.clone(),
            variables: globals.clone(),
        };

        let reduced = source
            .pairs()
            .par_bridge()
            .try_fold(new_worker, |mut worker, (i, j)| {
                self.combining_rules.combine(
                    i,
                    j,
                    particle_parameters,
                    &mut worker.scratch,
                    &mut worker.variables,
                )?;
                self.calculate_one_ixn(
                    i,
                    j,
                    positions,
                    &mut worker.variables,
                    &mut worker.partial.as_buffers(),
                )?;
                Ok::<_, ExpressionError>(worker)
            })
            .map(|worker| worker.map(|w| w.partial))
            .try_reduce_with(|a, b| Ok(a.merge(b)));

        if let Some(partial) = reduced.transpose()? {
            partial.add_into(buffers);
        }
        Ok(())
    }

    /// Exception pass: each override entry is evaluated with its own,
    /// already-combined parameters. Pure exclusions contribute nothing.
    pub fn calculate_exception_ixn(
        &self,
        positions: &[Point3<f64>],
        exceptions: &ExceptionTable,
        globals: &Variables,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), ExpressionError> {
        let mut variables = globals.clone();
        for (i, j, values) in exceptions.overrides() {
            self.combining_rules.bind_combined(values, &mut variables);
            self.calculate_one_ixn(i, j, positions, &mut variables, buffers)?;
        }
        Ok(())
    }

    /// Adds the contribution of a single pair. `variables` must already hold
    /// the combined parameters and globals; `r` is bound here.
    pub fn calculate_one_ixn(
        &self,
        i: usize,
        j: usize,
        positions: &[Point3<f64>],
        variables: &mut Variables,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), ExpressionError> {
        let delta = separation(&positions[i], &positions[j], self.periodic_box.as_ref());
        if let Some(cutoff) = self.cutoff {
            if delta.r >= cutoff {
                return Ok(());
            }
        }

        set_variable(variables, "r", delta.r);

        if let Some(forces) = buffers.forces.as_deref_mut() {
            let de_dr = self.force_expression.evaluate(variables)? / delta.r;
            let force = delta.delta * -de_dr;
            forces[i] += force;
            forces[j] -= force;
        }

        if buffers.wants_energy() {
            let energy = self.energy_expression.evaluate(variables)?;
            if let Some(total) = buffers.total_energy.as_deref_mut() {
                *total += energy;
            }
            if let Some(per_particle) = buffers.energy_by_particle.as_deref_mut() {
                per_particle[i] += energy;
                per_particle[j] += energy;
            }
        }

        Ok(())
    }
}
