use clap::{Args, Parser, Subcommand, ValueEnum};
use pairforce::core::forcefield::params::NonbondedMethod;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Pairforce Developers",
    version,
    about = "Pairforce CLI - Evaluate custom pairwise nonbonded energies and forces from a TOML force definition and CSV coordinates.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate energies and forces for one or more coordinate frames.
    Evaluate(EvaluateArgs),
    /// Validate a force definition and compile its expressions without evaluating.
    Check(CheckArgs),
}

/// Options shared by every command that loads a force definition.
#[derive(Args, Debug, Clone, Default)]
pub struct ForceArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the force definition, overriding `[force] path` from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub force: Option<PathBuf>,

    /// Orthorhombic periodic box edge lengths, overriding `[system] periodic-box`.
    #[arg(long = "box", num_args = 3, value_names = ["X", "Y", "Z"])]
    pub periodic_box: Option<Vec<f64>>,

    /// Override the nonbonded method of the force definition.
    #[arg(short, long, value_enum, value_name = "METHOD")]
    pub method: Option<MethodArg>,

    /// Override the cutoff distance. Enables a non-periodic cutoff if the force has none.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Set a configuration value, overriding the config file.
    /// A bare name sets a global parameter. Can be used multiple times.
    /// Example: -S scale=0.5 -S evaluation.cutoff=1.2
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub force: ForceArgs,

    /// Coordinate files in CSV format with an `x,y,z` header, one file per frame.
    #[arg(short, long, required = true, num_args = 1.., value_name = "PATH")]
    pub input: Vec<PathBuf>,

    /// Output CSV path. With several frames, the frame number is appended to the file stem.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Also compute the energy attributed to each particle.
    #[arg(long)]
    pub per_particle_energy: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub force: ForceArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    NoCutoff,
    CutoffNonPeriodic,
    CutoffPeriodic,
}

impl From<MethodArg> for NonbondedMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::NoCutoff => NonbondedMethod::NoCutoff,
            MethodArg::CutoffNonPeriodic => NonbondedMethod::CutoffNonPeriodic,
            MethodArg::CutoffPeriodic => NonbondedMethod::CutoffPeriodic,
        }
    }
}
