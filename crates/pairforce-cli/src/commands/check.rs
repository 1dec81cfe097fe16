use crate::cli::CheckArgs;
use crate::config::build_config;
use crate::error::Result;
use pairforce::core::forcefield::params::CustomNonbondedForce;
use pairforce::workflows;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    let config = build_config(&args.force, false)?;

    info!("Loading force definition from {:?}", &config.force_path);
    let force = config
        .evaluation
        .apply_to(&CustomNonbondedForce::load(&config.force_path)?);
    let system = config.system_for(&force);

    let summary = workflows::evaluate::check(&system, &force)?;

    println!("Force definition is valid: {}", config.force_path.display());
    println!("  Particles:            {}", summary.num_particles);
    println!("  Per-particle params:  {}", summary.num_per_particle_parameters);
    println!("  Global params:        {}", summary.num_global_parameters);
    println!("  Exclusions:           {}", summary.num_exclusions);
    println!("  Parameter overrides:  {}", summary.num_overrides);
    println!("  Nonbonded method:     {:?}", summary.nonbonded_method);
    if let Some(cutoff) = summary.cutoff_distance {
        println!("  Cutoff distance:      {}", cutoff);
    }
    println!("  dE/dr:                {}", summary.force_expression);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ForceArgs;
    use crate::error::CliError;
    use pairforce::engine::error::EngineError;
    use std::fs;

    fn check_file(content: &str) -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let force_path = dir.path().join("force.toml");
        fs::write(&force_path, content).unwrap();
        run(CheckArgs {
            force: ForceArgs {
                force: Some(force_path),
                ..Default::default()
            },
        })
    }

    #[test]
    fn accepts_valid_definition() {
        let content = r#"
energy = "4*eps*((sigma/r)^12-(sigma/r)^6)"
nonbonded-method = "cutoff-non-periodic"
cutoff-distance = 1.2
particles = [[0.3, 0.5], [0.35, 0.4], [0.3, 0.5]]

[[per-particle-parameters]]
name = "sigma"
combining-rule = "0.5*(sigma1+sigma2)"

[[per-particle-parameters]]
name = "eps"
combining-rule = "sqrt(eps1*eps2)"

[[exceptions]]
particle1 = 0
particle2 = 1
"#;
        check_file(content).unwrap();
    }

    #[test]
    fn rejects_duplicate_exceptions() {
        let content = r#"
energy = "q/r"
particles = [[1.0], [1.0]]

[[per-particle-parameters]]
name = "q"

[[exceptions]]
particle1 = 0
particle2 = 1

[[exceptions]]
particle1 = 1
particle2 = 0
"#;
        assert!(matches!(
            check_file(content),
            Err(CliError::Core(EngineError::Specification { .. }))
        ));
    }
}
