use super::generate::{CONF_FILE, PARAM_FILE, backup_existing, read_configuration, write_task};
use crate::core::models::lambda::{LAMBDA_MATCH_TOLERANCE, LambdaGrid};
use crate::core::models::system::{molecule_count, replicated_count};
use crate::core::numerics::quadrature::{interval_errors, refine_grid, refinement_factors};
use crate::engine::config::{HtiParams, ParamError};
use crate::engine::error::EngineError;
use crate::engine::post::{TaskSamples, load_stage, stage_integrand};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stages::{Stage, task_dir_name};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct StageRefinement {
    pub stage: String,
    pub old_points: usize,
    pub new_points: usize,
    /// Largest estimated interval error before refinement.
    pub max_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefineSummary {
    pub job_dir: PathBuf,
    pub backup: Option<PathBuf>,
    pub stages: Vec<StageRefinement>,
    /// Tasks carried over from the input job, results included.
    pub reused_tasks: usize,
    pub new_tasks: usize,
}

struct StagePlan {
    stage: Stage,
    tasks: Vec<TaskSamples>,
    grid: LambdaGrid,
}

/// Builds a new job whose λ grids are dense enough for a total quadrature error of `error`.
///
/// `error` is in eV per molecule, the unit `compute` reports. The budget is spread evenly
/// over all intervals of all stages. Tasks at λ values that already exist are copied with
/// their output; only the new points need to be run.
#[instrument(skip_all, name = "refine_workflow")]
pub fn run(
    input: &Path,
    output: &Path,
    error: f64,
    reporter: &ProgressReporter,
) -> Result<RefineSummary, EngineError> {
    if !(error > 0.0) {
        return Err(ParamError::Invalid {
            key: "error",
            reason: format!("the error target must be positive, got {}", error),
        }
        .into());
    }
    if same_location(input, output) {
        return Err(ParamError::Invalid {
            key: "output",
            reason: format!("'{}' is the input job itself", output.display()),
        }
        .into());
    }
    let params = HtiParams::load(&input.join(PARAM_FILE))?;
    let system = read_configuration(&input.join(CONF_FILE))?;
    let nmols = molecule_count(replicated_count(system.natoms(), &params.copies));
    if nmols == 0 {
        return Err(EngineError::InconsistentJob(
            "the configuration holds no complete molecule".to_string(),
        ));
    }
    let stages = params.switch.stages();

    let mut loaded = Vec::with_capacity(stages.len());
    let mut all_errors = Vec::with_capacity(stages.len());
    for stage in &stages {
        let tasks = load_stage(input, stage, reporter)?;
        let records = stage_integrand(stage, &tasks, &params)?;
        let x: Vec<f64> = records.iter().map(|r| r.lambda).collect();
        // per molecule, like the errors `compute` reports
        let y: Vec<f64> = records.iter().map(|r| r.dudl / nmols as f64).collect();
        let errors = interval_errors(&x, &y).map_err(|source| EngineError::Numerics {
            stage: stage.dir_name(),
            source,
        })?;
        all_errors.push(errors);
        loaded.push((*stage, tasks, x));
    }

    let total_intervals: usize = all_errors.iter().map(Vec::len).sum();
    let tol = error / total_intervals.max(1) as f64;
    info!(tolerance = tol, intervals = total_intervals, "Refining λ grids.");

    let mut new_params = params.clone();
    let mut plans = Vec::with_capacity(loaded.len());
    let mut refinements = Vec::with_capacity(loaded.len());
    for ((stage, tasks, x), errors) in loaded.into_iter().zip(&all_errors) {
        let factors = refinement_factors(errors, tol);
        let refined = refine_grid(&x, &factors).map_err(|source| ParamError::Invalid {
            key: "error",
            reason: format!("a target of {} is too tight for stage {}: {}", error, stage, source),
        })?;
        let grid = LambdaGrid::from_values(refined).map_err(|source| {
            ParamError::Lambda {
                key: stage.kind.lambda_key(),
                source,
            }
        })?;
        debug!("Stage {} refined from {} to {} points", stage, x.len(), grid.len());
        refinements.push(StageRefinement {
            stage: stage.dir_name(),
            old_points: x.len(),
            new_points: grid.len(),
            max_error: errors.iter().copied().fold(0.0, f64::max),
        });
        new_params.set_lambda_grid(stage.kind, &grid);
        plans.push(StagePlan { stage, tasks, grid });
    }

    let backup = backup_existing(output)?;
    fs::create_dir_all(output).map_err(|e| EngineError::io(output, e))?;
    let conf_src = input.join(CONF_FILE);
    let conf_dst = output.join(CONF_FILE);
    fs::copy(&conf_src, &conf_dst).map_err(|e| EngineError::io(&conf_src, e))?;
    new_params.save(&output.join(PARAM_FILE))?;

    let mut reused_tasks = 0;
    let mut new_tasks = 0;
    for plan in &plans {
        reporter.report(Progress::StageStart {
            name: plan.stage.dir_name(),
            tasks: plan.grid.len() as u64,
        });
        for (index, &lambda) in plan.grid.values().iter().enumerate() {
            let existing = plan
                .tasks
                .iter()
                .find(|t| (t.lambda - lambda).abs() < LAMBDA_MATCH_TOLERANCE);
            match existing {
                Some(task) => {
                    let dest = output.join(plan.stage.dir_name()).join(task_dir_name(index));
                    copy_task(&task.dir, &dest)?;
                    reused_tasks += 1;
                }
                None => {
                    write_task(output, &new_params, &plan.stage, index, lambda)?;
                    new_tasks += 1;
                }
            }
            reporter.report(Progress::TaskDone);
        }
        reporter.report(Progress::StageFinish);
    }
    info!(reused = reused_tasks, new = new_tasks, "Refined job written.");

    Ok(RefineSummary {
        job_dir: output.to_path_buf(),
        backup,
        stages: refinements,
        reused_tasks,
        new_tasks,
    })
}

/// Whether both paths name the same existing directory.
fn same_location(a: &Path, b: &Path) -> bool {
    matches!((fs::canonicalize(a), fs::canonicalize(b)), (Ok(a), Ok(b)) if a == b)
}

fn copy_task(src: &Path, dest: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(dest).map_err(|e| EngineError::io(dest, e))?;
    let entries = fs::read_dir(src).map_err(|e| EngineError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(src, e))?;
        let path = entry.path();
        if path.is_file() {
            let target = dest.join(entry.file_name());
            fs::copy(&path, &target).map_err(|e| EngineError::io(&path, e))?;
        }
    }
    Ok(())
}
