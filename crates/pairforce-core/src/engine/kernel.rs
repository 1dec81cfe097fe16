use super::error::EngineError;
use crate::core::expression::{ExpressionError, ExpressionProgram, Variables};
use crate::core::forcefield::combining::CombiningRules;
use crate::core::forcefield::interaction::{CustomNonbondedInteraction, ForceBuffers};
use crate::core::forcefield::pairs::NeighborList;
use crate::core::forcefield::params::CustomNonbondedForce;
use crate::core::forcefield::validation::{ValidatedTables, validate};
use crate::core::models::system::ParticleSystem;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Per-call inputs. Global parameters missing here take their declared defaults.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub positions: &'a [Point3<f64>],
    pub global_parameters: Option<&'a Variables>,
    pub neighbor_list: Option<&'a NeighborList>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(positions: &'a [Point3<f64>]) -> Self {
        Self {
            positions,
            global_parameters: None,
            neighbor_list: None,
        }
    }

    pub fn with_global_parameters(mut self, values: &'a Variables) -> Self {
        self.global_parameters = Some(values);
        self
    }

    pub fn with_neighbor_list(mut self, list: &'a NeighborList) -> Self {
        self.neighbor_list = Some(list);
        self
    }
}

/// Backend contract for evaluating a [`CustomNonbondedForce`].
pub trait CustomNonbondedKernel {
    fn initialize(
        &mut self,
        system: &ParticleSystem,
        force: &CustomNonbondedForce,
    ) -> Result<(), EngineError>;

    /// Adds this force's contributions to whichever targets `buffers` carries.
    fn execute(
        &mut self,
        context: &EvaluationContext<'_>,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), EngineError>;

    /// Replaces particle and exception parameters without recompiling expressions.
    fn update_parameters_in_context(
        &mut self,
        force: &CustomNonbondedForce,
    ) -> Result<(), EngineError>;

    fn execute_forces(
        &mut self,
        context: &EvaluationContext<'_>,
        forces: &mut [Vector3<f64>],
    ) -> Result<(), EngineError> {
        self.execute(context, &mut ForceBuffers::new().with_forces(forces))
    }

    fn execute_energy(&mut self, context: &EvaluationContext<'_>) -> Result<f64, EngineError> {
        let mut total = 0.0;
        self.execute(context, &mut ForceBuffers::new().with_total_energy(&mut total))?;
        Ok(total)
    }
}

struct KernelState {
    system: ParticleSystem,
    interaction: CustomNonbondedInteraction<ExpressionProgram>,
    tables: ValidatedTables,
    default_globals: Variables,
    num_parameters: usize,
}

/// Single-process reference evaluator.
#[derive(Default)]
pub struct ReferenceKernel {
    state: Option<KernelState>,
}

impl ReferenceKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn num_particles(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.system.num_particles())
    }

    fn state(&self) -> Result<&KernelState, EngineError> {
        self.state.as_ref().ok_or(EngineError::NotInitialized)
    }
}

impl CustomNonbondedKernel for ReferenceKernel {
    #[instrument(skip_all, name = "kernel_initialize")]
    fn initialize(
        &mut self,
        system: &ParticleSystem,
        force: &CustomNonbondedForce,
    ) -> Result<(), EngineError> {
        let tables = validate(system, force)?;

        let names = force.parameter_names();
        let default_globals = force.default_global_parameters();
        check_names(&names, force.global_parameters().iter().map(|g| g.name.as_str()))?;

        let energy = compile("energy expression", force.energy())?;
        let mut allowed: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        allowed.extend(default_globals.keys().map(String::as_str));
        allowed.insert("r");
        check_variables("energy expression", &energy, &allowed)?;
        let force_expression = energy.differentiate("r");
        debug!(derivative = %force_expression, "Derived radial force expression.");

        let suffixed: Vec<String> = names
            .iter()
            .flat_map(|name| [format!("{name}1"), format!("{name}2")])
            .collect();
        let mut rule_allowed: BTreeSet<&str> = suffixed.iter().map(String::as_str).collect();
        rule_allowed.extend(default_globals.keys().map(String::as_str));

        let mut rules = Vec::with_capacity(names.len());
        for parameter in force.per_particle_parameters() {
            let what = format!("combining rule for '{}'", parameter.name);
            let rule = compile(&what, &parameter.combining_rule())?;
            check_variables(&what, &rule, &rule_allowed)?;
            rules.push((parameter.name.clone(), rule));
        }

        let mut interaction =
            CustomNonbondedInteraction::new(energy, force_expression, CombiningRules::new(rules));

        let method = force.nonbonded_method();
        if method.uses_cutoff() {
            interaction.set_use_cutoff(force.cutoff_distance())?;
        }
        if method.uses_periodic_boundaries() {
            let b = system.periodic_box().ok_or(EngineError::MissingPeriodicBox)?;
            interaction.set_periodic([b.x, b.y, b.z])?;
        } else if system.periodic_box().is_some() {
            warn!("System defines a periodic box but the force does not use periodic boundaries.");
        }

        info!(
            particles = system.num_particles(),
            exceptions = tables.exceptions.len(),
            overrides = tables.exceptions.num_overrides(),
            method = ?method,
            cutoff = ?interaction.cutoff_distance(),
            "Initialized reference kernel."
        );

        self.state = Some(KernelState {
            system: system.clone(),
            interaction,
            tables,
            default_globals,
            num_parameters: force.num_per_particle_parameters(),
        });
        Ok(())
    }

    fn execute(
        &mut self,
        context: &EvaluationContext<'_>,
        buffers: &mut ForceBuffers<'_>,
    ) -> Result<(), EngineError> {
        let state = self.state()?;
        let num_particles = state.system.num_particles();

        if context.positions.len() != num_particles {
            return Err(EngineError::PositionCountMismatch {
                expected: num_particles,
                found: context.positions.len(),
            });
        }
        check_buffer("force", buffers.forces.as_deref().map(<[_]>::len), num_particles)?;
        check_buffer(
            "per-particle energy",
            buffers.energy_by_particle.as_deref().map(<[_]>::len),
            num_particles,
        )?;

        if let Some(list) = context.neighbor_list {
            check_neighbor_pairs(list, num_particles)?;
        }

        let mut globals = state.default_globals.clone();
        if let Some(values) = context.global_parameters {
            for (name, &value) in values {
                match globals.get_mut(name) {
                    Some(slot) => *slot = value,
                    None => return Err(EngineError::UnknownGlobalParameter(name.clone())),
                }
            }
        }

        state.interaction.calculate_pair_ixn(
            context.positions,
            &state.tables.particle_parameters,
            &state.tables.exceptions,
            context.neighbor_list,
            &globals,
            buffers,
        )?;
        state.interaction.calculate_exception_ixn(
            context.positions,
            &state.tables.exceptions,
            &globals,
            buffers,
        )?;
        Ok(())
    }

    #[instrument(skip_all, name = "kernel_update_parameters")]
    fn update_parameters_in_context(
        &mut self,
        force: &CustomNonbondedForce,
    ) -> Result<(), EngineError> {
        let state = self.state.as_mut().ok_or(EngineError::NotInitialized)?;
        if force.num_per_particle_parameters() != state.num_parameters {
            return Err(EngineError::ParameterLayoutChanged {
                expected: state.num_parameters,
                found: force.num_per_particle_parameters(),
            });
        }
        state.tables = validate(&state.system, force)?;
        debug!(
            exceptions = state.tables.exceptions.len(),
            "Replaced particle and exception parameters."
        );
        Ok(())
    }
}

fn compile(what: &str, source: &str) -> Result<ExpressionProgram, EngineError> {
    ExpressionProgram::parse(source).map_err(|source| EngineError::Compilation {
        what: what.to_string(),
        source,
    })
}

fn check_variables(
    what: &str,
    program: &ExpressionProgram,
    allowed: &BTreeSet<&str>,
) -> Result<(), EngineError> {
    match program
        .referenced_variables()
        .into_iter()
        .find(|name| !allowed.contains(name.as_str()))
    {
        Some(name) => Err(EngineError::Compilation {
            what: what.to_string(),
            source: ExpressionError::UndefinedVariable(name),
        }),
        None => Ok(()),
    }
}

/// Rejects repeated names, names shadowing `r`, and globals shadowing the
/// `name1`/`name2` bindings seen by combining rules.
fn check_names<'a>(
    parameters: &[String],
    globals: impl IntoIterator<Item = &'a str>,
) -> Result<(), EngineError> {
    let mut seen: BTreeSet<&str> = BTreeSet::from(["r"]);
    let mut suffixed = BTreeSet::new();
    for name in parameters {
        if !seen.insert(name.as_str()) {
            return Err(EngineError::NameConflict(name.clone()));
        }
        suffixed.insert(format!("{name}1"));
        suffixed.insert(format!("{name}2"));
    }
    for name in globals {
        if !seen.insert(name) || suffixed.contains(name) {
            return Err(EngineError::NameConflict(name.to_string()));
        }
    }
    Ok(())
}

fn check_neighbor_pairs(list: &NeighborList, num_particles: usize) -> Result<(), EngineError> {
    match list
        .pairs()
        .iter()
        .find(|&&(i, j)| i >= num_particles || j >= num_particles || i == j)
    {
        Some(&(i, j)) => Err(EngineError::InvalidNeighborPair {
            i,
            j,
            num_particles,
        }),
        None => Ok(()),
    }
}

fn check_buffer(what: &'static str, len: Option<usize>, expected: usize) -> Result<(), EngineError> {
    match len {
        Some(found) if found != expected => Err(EngineError::BufferSizeMismatch {
            what,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::NonbondedMethod;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn charge_force(charges: &[f64]) -> CustomNonbondedForce {
        let mut force = CustomNonbondedForce::new("k*q/r");
        force.add_per_particle_parameter("q", None);
        force.add_global_parameter("k", 1.0);
        for &q in charges {
            force.add_particle(vec![q]);
        }
        force
    }

    fn initialized(force: &CustomNonbondedForce, system: &ParticleSystem) -> ReferenceKernel {
        let mut kernel = ReferenceKernel::new();
        kernel.initialize(system, force).unwrap();
        kernel
    }

    #[test]
    fn execute_before_initialize_fails() {
        let mut kernel = ReferenceKernel::new();
        let positions = [Point3::origin()];
        let result = kernel.execute_energy(&EvaluationContext::new(&positions));
        assert!(matches!(result, Err(EngineError::NotInitialized)));
        assert!(!kernel.is_initialized());
    }

    #[test]
    fn two_charges_energy_and_forces() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(2.0, 0.0, 0.0)];
        let context = EvaluationContext::new(&positions);

        let energy = kernel.execute_energy(&context).unwrap();
        assert!(f64_approx_equal(energy, 0.5));

        let mut forces = vec![Vector3::zeros(); 2];
        kernel.execute_forces(&context, &mut forces).unwrap();
        assert!(f64_approx_equal(forces[0].x, -0.25));
        assert!(f64_approx_equal(forces[1].x, 0.25));
    }

    #[test]
    fn context_globals_override_defaults() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(2.0, 0.0, 0.0)];
        let globals: Variables = [("k".to_string(), 3.0)].into_iter().collect();
        let context = EvaluationContext::new(&positions).with_global_parameters(&globals);
        assert!(f64_approx_equal(kernel.execute_energy(&context).unwrap(), 1.5));
    }

    #[test]
    fn undeclared_context_global_is_rejected() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(2.0, 0.0, 0.0)];
        let globals: Variables = [("kk".to_string(), 3.0)].into_iter().collect();
        let context = EvaluationContext::new(&positions).with_global_parameters(&globals);
        assert!(matches!(
            kernel.execute_energy(&context),
            Err(EngineError::UnknownGlobalParameter(name)) if name == "kk"
        ));
    }

    #[test]
    fn repeated_calls_give_identical_results() {
        let force = charge_force(&[0.3, -1.2, 0.8]);
        let mut kernel = initialized(&force, &ParticleSystem::new(3));
        let positions = [
            Point3::new(0.0, 0.1, 0.2),
            Point3::new(1.0, -0.3, 0.4),
            Point3::new(-0.7, 0.9, 1.1),
        ];
        let context = EvaluationContext::new(&positions);
        let first = kernel.execute_energy(&context).unwrap();
        let second = kernel.execute_energy(&context).unwrap();
        assert!(f64_approx_equal(first, second));
    }

    #[test]
    fn initialize_reports_invalid_specification() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = ReferenceKernel::new();
        let result = kernel.initialize(&ParticleSystem::new(3), &force);
        assert!(matches!(result, Err(EngineError::Specification { .. })));
        assert!(!kernel.is_initialized());
    }

    #[test]
    fn initialize_rejects_unknown_variable_in_energy() {
        let mut force = charge_force(&[1.0, 1.0]);
        force.set_energy("q*eps/r");
        let mut kernel = ReferenceKernel::new();
        match kernel.initialize(&ParticleSystem::new(2), &force) {
            Err(EngineError::Compilation { what, source }) => {
                assert_eq!(what, "energy expression");
                assert_eq!(source, ExpressionError::UndefinedVariable("eps".to_string()));
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn initialize_rejects_malformed_combining_rule() {
        let mut force = CustomNonbondedForce::new("q/r");
        force.add_per_particle_parameter("q", Some("q1*".to_string()));
        force.add_particle(vec![1.0]);
        let mut kernel = ReferenceKernel::new();
        let result = kernel.initialize(&ParticleSystem::new(1), &force);
        assert!(matches!(
            result,
            Err(EngineError::Compilation {
                source: ExpressionError::Parse { .. },
                ..
            })
        ));
    }

    #[test]
    fn periodic_method_requires_system_box() {
        let mut force = charge_force(&[1.0, 1.0]);
        force.set_nonbonded_method(NonbondedMethod::CutoffPeriodic);
        let mut kernel = ReferenceKernel::new();
        let result = kernel.initialize(&ParticleSystem::new(2), &force);
        assert!(matches!(result, Err(EngineError::MissingPeriodicBox)));
    }

    #[test]
    fn periodic_method_rejects_small_box() {
        let mut force = charge_force(&[1.0, 1.0]);
        force.set_nonbonded_method(NonbondedMethod::CutoffPeriodic);
        force.set_cutoff_distance(2.0);
        let system = ParticleSystem::new(2).with_periodic_box([5.0, 3.0, 5.0]);
        let mut kernel = ReferenceKernel::new();
        assert!(matches!(
            kernel.initialize(&system, &force),
            Err(EngineError::Setup { .. })
        ));
    }

    #[test]
    fn cutoff_method_drops_distant_pairs() {
        let mut force = charge_force(&[1.0, 1.0, 1.0]);
        force.set_nonbonded_method(NonbondedMethod::CutoffNonPeriodic);
        force.set_cutoff_distance(1.5);
        let mut kernel = initialized(&force, &ParticleSystem::new(3));
        let positions = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
        ];
        let energy = kernel.execute_energy(&EvaluationContext::new(&positions)).unwrap();
        assert!(f64_approx_equal(energy, 1.0));
    }

    #[test]
    fn supplied_neighbor_list_is_used_as_given() {
        let mut force = charge_force(&[1.0, 1.0, 1.0]);
        force.set_nonbonded_method(NonbondedMethod::CutoffNonPeriodic);
        force.set_cutoff_distance(10.0);
        let mut kernel = initialized(&force, &ParticleSystem::new(3));
        let positions = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let list = NeighborList::from_pairs(vec![(0, 1)]);
        let context = EvaluationContext::new(&positions).with_neighbor_list(&list);
        assert!(f64_approx_equal(kernel.execute_energy(&context).unwrap(), 1.0));
    }

    #[test]
    fn neighbor_list_with_invalid_pairs_is_rejected() {
        let mut force = charge_force(&[1.0, 1.0]);
        force.set_nonbonded_method(NonbondedMethod::CutoffNonPeriodic);
        force.set_cutoff_distance(10.0);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];

        for (i, j) in [(0, 5), (7, 1), (1, 1)] {
            let list = NeighborList::from_pairs(vec![(0, 1), (i, j)]);
            let context = EvaluationContext::new(&positions).with_neighbor_list(&list);
            let mut forces = vec![Vector3::zeros(); 2];
            match kernel.execute_forces(&context, &mut forces) {
                Err(EngineError::InvalidNeighborPair {
                    i: fi,
                    j: fj,
                    num_particles: 2,
                }) => assert_eq!((fi, fj), (i, j)),
                other => panic!("unexpected result for ({i}, {j}): {:?}", other.err()),
            }
            assert_eq!(forces, vec![Vector3::zeros(); 2]);
        }
    }

    #[test]
    fn initialize_rejects_conflicting_names() {
        let cases: [(&[&str], &[&str], &str); 5] = [
            (&["q", "q"], &[], "q"),
            (&["r"], &[], "r"),
            (&["q"], &["r"], "r"),
            (&["q"], &["q"], "q"),
            (&["q"], &["q1"], "q1"),
        ];
        for (parameters, globals, conflict) in cases {
            let mut force = CustomNonbondedForce::new("1/r");
            for &name in parameters {
                force.add_per_particle_parameter(name, None);
            }
            for &name in globals {
                force.add_global_parameter(name, 1.0);
            }
            force.add_particle(vec![1.0; parameters.len()]);
            let mut kernel = ReferenceKernel::new();
            match kernel.initialize(&ParticleSystem::new(1), &force) {
                Err(EngineError::NameConflict(name)) => assert_eq!(name, conflict),
                other => panic!("unexpected result for {conflict}: {:?}", other.err()),
            }
            assert!(!kernel.is_initialized());
        }
    }

    #[test]
    fn mismatched_position_count_is_rejected() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin()];
        assert!(matches!(
            kernel.execute_energy(&EvaluationContext::new(&positions)),
            Err(EngineError::PositionCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn mismatched_force_buffer_is_rejected() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let mut forces = vec![Vector3::zeros(); 3];
        assert!(matches!(
            kernel.execute_forces(&EvaluationContext::new(&positions), &mut forces),
            Err(EngineError::BufferSizeMismatch { what: "force", .. })
        ));
    }

    #[test]
    fn update_parameters_replaces_tables() {
        let mut force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let positions = [Point3::origin(), Point3::new(2.0, 0.0, 0.0)];

        force.set_particle_parameters(1, vec![-2.0]).unwrap();
        kernel.update_parameters_in_context(&force).unwrap();
        let energy = kernel.execute_energy(&EvaluationContext::new(&positions)).unwrap();
        assert!(f64_approx_equal(energy, -1.0));

        force.add_exception(0, 1, vec![]);
        kernel.update_parameters_in_context(&force).unwrap();
        let energy = kernel.execute_energy(&EvaluationContext::new(&positions)).unwrap();
        assert_eq!(energy, 0.0);
    }

    #[test]
    fn update_parameters_rejects_changed_layout() {
        let force = charge_force(&[1.0, 1.0]);
        let mut kernel = initialized(&force, &ParticleSystem::new(2));
        let mut changed = charge_force(&[]);
        changed.add_per_particle_parameter("s", None);
        changed.add_particle(vec![1.0, 1.0]);
        changed.add_particle(vec![1.0, 1.0]);
        assert!(matches!(
            kernel.update_parameters_in_context(&changed),
            Err(EngineError::ParameterLayoutChanged {
                expected: 1,
                found: 2
            })
        ));
    }
}
