use crate::error::{CliError, Result};
use pairforce::core::forcefield::params::NonbondedMethod;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileForceConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSystemConfig {
    pub num_particles: Option<usize>,
    pub periodic_box: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEvaluationConfig {
    pub cutoff: Option<f64>,
    pub method: Option<NonbondedMethod>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutputConfig {
    pub per_particle: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub force: Option<FileForceConfig>,
    pub system: Option<FileSystemConfig>,
    pub evaluation: Option<FileEvaluationConfig>,
    #[serde(default)]
    pub globals: BTreeMap<String, f64>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    /// Reads a run configuration. A relative `[force] path` is resolved against the
    /// directory containing the configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let (Some(force_path), Some(dir)) = (
            config.force.as_mut().and_then(|f| f.path.as_mut()),
            path.parent(),
        ) {
            if force_path.is_relative() {
                *force_path = dir.join(&*force_path);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("run.toml");
        fs::write(
            &cfg_path,
            r#"
[force]
path = "lj.toml"

[system]
num-particles = 4
periodic-box = [3.0, 3.0, 3.5]

[evaluation]
cutoff = 1.2
method = "cutoff-periodic"

[globals]
scale = 0.5

[output]
per-particle = true
"#,
        )
        .unwrap();

        let config = FileConfig::from_file(&cfg_path).unwrap();
        assert_eq!(
            config.force.unwrap().path,
            Some(dir.path().join("lj.toml"))
        );
        let system = config.system.unwrap();
        assert_eq!(system.num_particles, Some(4));
        assert_eq!(system.periodic_box, Some([3.0, 3.0, 3.5]));
        let evaluation = config.evaluation.unwrap();
        assert_eq!(evaluation.cutoff, Some(1.2));
        assert_eq!(evaluation.method, Some(NonbondedMethod::CutoffPeriodic));
        assert_eq!(config.globals["scale"], 0.5);
        assert_eq!(config.output.unwrap().per_particle, Some(true));
    }

    #[test]
    fn absolute_force_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("run.toml");
        let force_path = dir.path().join("elsewhere").join("force.toml");
        fs::write(
            &cfg_path,
            format!("[force]\npath = {:?}\n", force_path.to_string_lossy()),
        )
        .unwrap();
        let config = FileConfig::from_file(&cfg_path).unwrap();
        assert_eq!(config.force.unwrap().path, Some(force_path));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("run.toml");
        fs::write(&cfg_path, "[evaluation]\ncutof = 1.0\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&cfg_path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
