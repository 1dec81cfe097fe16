use crate::core::expression::ExpressionProgram;
use crate::core::forcefield::interaction::ForceBuffers;
use crate::core::forcefield::params::{CustomNonbondedForce, NonbondedMethod};
use crate::core::models::system::ParticleSystem;
use crate::engine::config::EvaluationConfig;
use crate::engine::error::EngineError;
use crate::engine::kernel::{CustomNonbondedKernel, EvaluationContext, ReferenceKernel};
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub total_energy: f64,
    pub energy_by_particle: Option<Vec<f64>>,
    pub forces: Vec<Vector3<f64>>,
}

/// Outcome of a successful [`check`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub num_particles: usize,
    pub num_per_particle_parameters: usize,
    pub num_global_parameters: usize,
    pub num_exclusions: usize,
    pub num_overrides: usize,
    pub nonbonded_method: NonbondedMethod,
    pub cutoff_distance: Option<f64>,
    pub force_expression: String,
}

#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(
    system: &ParticleSystem,
    force: &CustomNonbondedForce,
    frames: &[Vec<Point3<f64>>],
    config: &EvaluationConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<FrameResult>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Setup" });
    let force = config.apply_to(force);
    let mut kernel = ReferenceKernel::new();
    kernel.initialize(system, &force)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::FramesStart {
        total: frames.len() as u64,
    });
    let mut results = Vec::with_capacity(frames.len());
    for (index, positions) in frames.iter().enumerate() {
        let result = evaluate_frame(&mut kernel, positions, config)?;
        debug!(frame = index, energy = result.total_energy, "Evaluated frame.");
        reporter.report(Progress::FrameDone {
            index,
            total_energy: result.total_energy,
        });
        results.push(result);
    }
    reporter.report(Progress::FramesFinish);

    info!("Evaluation complete: {} frame(s).", results.len());
    Ok(results)
}

fn evaluate_frame(
    kernel: &mut ReferenceKernel,
    positions: &[Point3<f64>],
    config: &EvaluationConfig,
) -> Result<FrameResult, EngineError> {
    let n = positions.len();
    let mut forces = vec![Vector3::zeros(); n];
    let mut energy_by_particle = config.per_particle_energy.then(|| vec![0.0; n]);
    let mut total_energy = 0.0;

    let mut buffers = ForceBuffers::new()
        .with_forces(&mut forces)
        .with_total_energy(&mut total_energy);
    if let Some(per_particle) = energy_by_particle.as_deref_mut() {
        buffers = buffers.with_energy_by_particle(per_particle);
    }
    let context =
        EvaluationContext::new(positions).with_global_parameters(&config.global_parameters);
    kernel.execute(&context, &mut buffers)?;

    Ok(FrameResult {
        total_energy,
        energy_by_particle,
        forces,
    })
}

/// Validates and compiles `force` against `system` without evaluating anything.
#[instrument(skip_all, name = "check_workflow")]
pub fn check(
    system: &ParticleSystem,
    force: &CustomNonbondedForce,
) -> Result<ValidationSummary, EngineError> {
    let mut kernel = ReferenceKernel::new();
    kernel.initialize(system, force)?;

    let force_expression = ExpressionProgram::parse(force.energy())
        .map_err(|source| EngineError::Compilation {
            what: "energy expression".to_string(),
            source,
        })?
        .differentiate("r")
        .to_string();
    let num_exclusions = force
        .exceptions()
        .iter()
        .filter(|e| e.parameters.is_empty())
        .count();
    let method = force.nonbonded_method();

    Ok(ValidationSummary {
        num_particles: force.num_particles(),
        num_per_particle_parameters: force.num_per_particle_parameters(),
        num_global_parameters: force.num_global_parameters(),
        num_exclusions,
        num_overrides: force.num_exceptions() - num_exclusions,
        nonbonded_method: method,
        cutoff_distance: method.uses_cutoff().then(|| force.cutoff_distance()),
        force_expression,
    })
}
