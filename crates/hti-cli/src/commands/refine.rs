use crate::cli::RefineArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use hti_ice::engine::progress::ProgressReporter;
use hti_ice::workflows;
use tracing::info;

pub fn run(args: RefineArgs) -> Result<()> {
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let summary = workflows::refine::run(&args.input, &args.output, args.error, &reporter)?;

    for stage in &summary.stages {
        info!(
            "{}: {} -> {} λ points (largest interval error {:.3e})",
            stage.stage, stage.old_points, stage.new_points, stage.max_error
        );
    }
    info!(
        "Refined job written to {:?}: {} tasks reused, {} new tasks to run.",
        summary.job_dir, summary.reused_tasks, summary.new_tasks
    );
    Ok(())
}
