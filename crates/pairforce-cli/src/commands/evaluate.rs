use crate::cli::EvaluateArgs;
use crate::config::build_config;
use crate::error::Result;
use crate::io;
use crate::utils::progress::CliProgressHandler;
use pairforce::core::forcefield::params::CustomNonbondedForce;
use pairforce::engine::progress::ProgressReporter;
use pairforce::workflows;
use tracing::info;

pub fn run(args: EvaluateArgs) -> Result<()> {
    let config = build_config(&args.force, args.per_particle_energy)?;

    info!("Loading force definition from {:?}", &config.force_path);
    let force = CustomNonbondedForce::load(&config.force_path)?;
    let system = config.system_for(&force);

    let frames = args
        .input
        .iter()
        .map(|path| {
            info!("Loading coordinates from {:?}", path);
            io::read_frame(path)
        })
        .collect::<Result<Vec<_>>>()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evaluating {} frame(s) of {} particle(s)...",
        frames.len(),
        system.num_particles()
    );
    let results = workflows::evaluate::run(&system, &force, &frames, &config.evaluation, &reporter)?;

    for (i, result) in results.iter().enumerate() {
        let output_path = io::output_path_for(&args.output, i + 1, results.len());
        info!(
            "Writing frame {} (Energy: {:.6}) to {:?}",
            i + 1,
            result.total_energy,
            &output_path
        );
        io::write_frame_result(&output_path, result)?;
        println!(
            "  Frame {}: total energy {:.6}, written to {}",
            i + 1,
            result.total_energy,
            output_path.display()
        );
    }

    Ok(())
}
