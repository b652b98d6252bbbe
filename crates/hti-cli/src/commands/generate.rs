use crate::cli::GenArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use hti_ice::core::reference::einstein::CrystalModel;
use hti_ice::engine::config::HtiParams;
use hti_ice::engine::progress::ProgressReporter;
use hti_ice::workflows;
use tracing::info;

pub fn run(args: GenArgs) -> Result<()> {
    let params = HtiParams::load(&args.param)?;

    let crystal = if args.frenkel {
        println!("# gen task with Frenkel's Einstein crystal");
        CrystalModel::Frenkel
    } else {
        println!("# gen task with Vega's Einstein molecule");
        CrystalModel::Vega
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let summary = workflows::generate::run(&params, &args.output, crystal, &reporter)?;

    let total: usize = summary.stages.iter().map(|(_, n)| n).sum();
    info!(
        "Job written to {:?}: {} stages, {} tasks.",
        summary.job_dir,
        summary.stages.len(),
        total
    );
    Ok(())
}
