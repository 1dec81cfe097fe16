use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::ForceArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use pairforce::core::forcefield::params::NonbondedMethod;
use pairforce::engine::config::EvaluationConfigBuilder;
use std::path::PathBuf;
use tracing::debug;

/// Layers command-line arguments over `-S` values over the config file over defaults.
pub fn build_config(args: &ForceArgs, per_particle_flag: bool) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let force_path = args
        .force
        .clone()
        .or_else(|| file_config.force.take().and_then(|f| f.path))
        .unwrap_or_else(|| PathBuf::from(defaults.force_path));

    let system_file = file_config.system.take().unwrap_or_default();
    let periodic_box = match &args.periodic_box {
        Some(values) => Some(to_box(values)?),
        None => system_file.periodic_box,
    };

    let evaluation_file = file_config.evaluation.take().unwrap_or_default();
    let cutoff = args.cutoff.or(evaluation_file.cutoff);
    let method = args
        .method
        .map(NonbondedMethod::from)
        .or(evaluation_file.method);

    let per_particle_energy = per_particle_flag
        || file_config
            .output
            .take()
            .and_then(|o| o.per_particle)
            .unwrap_or(defaults.per_particle_energy);

    let mut builder = EvaluationConfigBuilder::new()
        .global_parameters(file_config.globals.into_iter().collect())
        .per_particle_energy(per_particle_energy);
    if let Some(cutoff) = cutoff {
        builder = builder.cutoff_distance(cutoff);
    }
    if let Some(method) = method {
        builder = builder.nonbonded_method(method);
    }
    let evaluation = builder.build()?;

    debug!(
        force = ?force_path,
        cutoff = ?evaluation.cutoff_distance,
        method = ?evaluation.nonbonded_method,
        globals = evaluation.global_parameters.len(),
        "Resolved run configuration."
    );

    Ok(AppConfig {
        force_path,
        num_particles: system_file.num_particles,
        periodic_box,
        evaluation,
    })
}

fn to_box(values: &[f64]) -> Result<[f64; 3]> {
    let edges: [f64; 3] = values.try_into().map_err(|_| {
        CliError::Argument(format!(
            "--box expects three edge lengths, got {}",
            values.len()
        ))
    })?;
    if edges.iter().any(|&e| !(e.is_finite() && e > 0.0)) {
        return Err(CliError::Argument(format!(
            "Periodic box edges must be positive, got {:?}",
            edges
        )));
    }
    Ok(edges)
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) =
            parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
        let to_config = |e: parser::ParseError| CliError::Config(e.to_string());

        match key {
            "evaluation.cutoff" => {
                config
                    .evaluation
                    .get_or_insert_with(Default::default)
                    .cutoff = Some(parser::parse_f64(key, value_str).map_err(to_config)?);
            }
            "evaluation.method" => {
                let method = toml::Value::String(value_str.to_string())
                    .try_into::<NonbondedMethod>()
                    .map_err(|_| {
                        CliError::Config(format!(
                            "Invalid nonbonded method for {}: '{}'",
                            key, value_str
                        ))
                    })?;
                config
                    .evaluation
                    .get_or_insert_with(Default::default)
                    .method = Some(method);
            }
            "output.per-particle" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .per_particle = Some(parser::parse_bool(key, value_str).map_err(to_config)?);
            }
            _ => {
                let name = key.strip_prefix("globals.").unwrap_or(key);
                if name.is_empty() || name.contains('.') {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
                let value = parser::parse_f64(key, value_str).map_err(to_config)?;
                config.globals.insert(name.to_string(), value);
            }
        }
    }
    Ok(config)
}
