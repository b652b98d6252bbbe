use crate::core::constants::{BAR_ANGSTROM3_TO_EV, thermal_energy_ev};
use crate::core::io::table::{IntegrandRecord, write_integrand_table};
use crate::core::io::thermo_log::ThermoTable;
use crate::core::numerics::block::{BlockEstimate, block_average, block_subsample};
use crate::core::numerics::mbar::{self, MbarOptions};
use crate::core::numerics::quadrature::{IntegralEstimate, integrate};
use crate::core::numerics::NumericsError;
use crate::engine::config::HtiParams;
use crate::engine::error::EngineError;
use crate::engine::lammps_input::{
    COLUMN_DUDL, COLUMN_PRESSURE, COLUMN_TEMPERATURE, COLUMN_TOTAL_ENERGY, COLUMN_VOLUME,
    LAMBDA_FILE, LOG_FILE,
};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stages::Stage;
use nalgebra::DMatrix;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INTEGRAND_TABLE: &str = "hti.out";

/// How the per-stage free-energy differences are obtained from the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntegrationMethod {
    /// Quadrature of ⟨dU/dλ⟩ over the λ grid.
    #[default]
    Inte,
    /// Multistate Bennett acceptance ratio over all λ states of a stage.
    Mbar,
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationMethod::Inte => f.write_str("inte"),
            IntegrationMethod::Mbar => f.write_str("mbar"),
        }
    }
}

/// Thermodynamic averages of the target system, normalised per molecule where extensive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThermoInfo {
    pub e: f64,
    pub e_err: f64,
    pub h: f64,
    pub h_err: f64,
    pub t: f64,
    pub t_err: f64,
    pub p: f64,
    pub p_err: f64,
    pub v: f64,
    pub v_err: f64,
    pub pv: f64,
    pub pv_err: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationResult {
    /// Free-energy difference from the reference to the target, eV per molecule.
    pub de: f64,
    pub stat_err: f64,
    pub inte_err: f64,
    pub thermo: ThermoInfo,
}

/// The thermo output of one λ task.
#[derive(Debug, Clone)]
pub struct TaskSamples {
    pub lambda: f64,
    pub dir: PathBuf,
    pub table: ThermoTable,
}

/// Task directories of a stage, in task order.
pub fn stage_task_dirs(job: &Path, stage: &Stage) -> Result<Vec<PathBuf>, EngineError> {
    let stage_dir = job.join(stage.dir_name());
    let entries = fs::read_dir(&stage_dir).map_err(|e| EngineError::io(&stage_dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(&stage_dir, e))?;
        let path = entry.path();
        let is_task = entry.file_name().to_string_lossy().starts_with("task.");
        if is_task && path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    if dirs.is_empty() {
        return Err(EngineError::EmptyStage(stage.dir_name()));
    }
    Ok(dirs)
}

pub fn read_task_lambda(task_dir: &Path) -> Result<f64, EngineError> {
    let path = task_dir.join(LAMBDA_FILE);
    let content = fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
    content.trim().parse::<f64>().map_err(|_| {
        EngineError::InconsistentJob(format!(
            "'{}' does not hold a λ value: '{}'",
            path.display(),
            content.trim()
        ))
    })
}

fn load_task(task_dir: &Path) -> Result<TaskSamples, EngineError> {
    let lambda = read_task_lambda(task_dir)?;
    let log_path = task_dir.join(LOG_FILE);
    let table = ThermoTable::read_from_path(&log_path).map_err(|source| EngineError::ThermoLog {
        path: log_path.to_string_lossy().to_string(),
        source,
    })?;
    Ok(TaskSamples {
        lambda,
        dir: task_dir.to_path_buf(),
        table,
    })
}

/// Reads every task of a stage, sorted by λ.
pub fn load_stage(
    job: &Path,
    stage: &Stage,
    reporter: &ProgressReporter,
) -> Result<Vec<TaskSamples>, EngineError> {
    let dirs = stage_task_dirs(job, stage)?;
    reporter.report(Progress::StageStart {
        name: stage.dir_name(),
        tasks: dirs.len() as u64,
    });
    let mut tasks = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        tasks.push(load_task(dir)?);
        reporter.report(Progress::TaskDone);
    }
    reporter.report(Progress::StageFinish);
    tasks.sort_by(|a, b| a.lambda.total_cmp(&b.lambda));
    debug!("Loaded {} tasks of stage {}", tasks.len(), stage);
    Ok(tasks)
}

fn column(task: &TaskSamples, name: &str) -> Result<Vec<f64>, EngineError> {
    let log_path = task.dir.join(LOG_FILE);
    task.table.column(name).map_err(|source| EngineError::ThermoLog {
        path: log_path.to_string_lossy().to_string(),
        source,
    })
}

fn averaged(
    stage: &Stage,
    data: &[f64],
    params: &HtiParams,
) -> Result<BlockEstimate, EngineError> {
    block_average(data, params.stat_skip, params.stat_bsize).map_err(|source| {
        EngineError::Numerics {
            stage: stage.dir_name(),
            source,
        }
    })
}

/// Block-averaged ⟨dU/dλ⟩ of every task of a stage.
pub fn stage_integrand(
    stage: &Stage,
    tasks: &[TaskSamples],
    params: &HtiParams,
) -> Result<Vec<IntegrandRecord>, EngineError> {
    tasks
        .iter()
        .map(|task| {
            let est = averaged(stage, &column(task, COLUMN_DUDL)?, params)?;
            Ok(IntegrandRecord {
                lambda: task.lambda,
                dudl: est.mean,
                dudl_err: est.error,
            })
        })
        .collect()
}

fn integrate_records(
    stage: &Stage,
    records: &[IntegrandRecord],
) -> Result<IntegralEstimate, EngineError> {
    let x: Vec<f64> = records.iter().map(|r| r.lambda).collect();
    let y: Vec<f64> = records.iter().map(|r| r.dudl).collect();
    let y_err: Vec<f64> = records.iter().map(|r| r.dudl_err).collect();
    integrate(&x, &y, &y_err).map_err(|source| EngineError::Numerics {
        stage: stage.dir_name(),
        source,
    })
}

/// Free-energy difference across a stage by MBAR, in eV.
///
/// With linear mixing the reduced potential of a sample in state `k` is
/// `β λ_k dU/dλ` up to a λ-independent term that cancels.
fn mbar_stage(
    stage: &Stage,
    tasks: &[TaskSamples],
    params: &HtiParams,
) -> Result<IntegralEstimate, EngineError> {
    let numerics = |source: NumericsError| EngineError::Numerics {
        stage: stage.dir_name(),
        source,
    };
    let kt = thermal_energy_ev(params.temp);
    let lambdas: Vec<f64> = tasks.iter().map(|t| t.lambda).collect();

    let mut pooled = Vec::new();
    let mut n_k = Vec::with_capacity(tasks.len());
    for task in tasks {
        let samples = block_subsample(&column(task, COLUMN_DUDL)?, params.stat_skip, params.stat_bsize);
        n_k.push(samples.len());
        pooled.extend(samples);
    }
    if pooled.is_empty() {
        return Err(numerics(NumericsError::InsufficientPoints {
            what: "MBAR",
            required: 1,
            actual: 0,
        }));
    }

    let u_kn = DMatrix::from_fn(lambdas.len(), pooled.len(), |k, n| lambdas[k] * pooled[n] / kt);
    let solution = mbar::solve(&u_kn, &n_k, &MbarOptions::default()).map_err(numerics)?;
    let last = lambdas.len() - 1;
    debug!(
        "MBAR for {} converged in {} iterations",
        stage,
        solution.iterations()
    );
    Ok(IntegralEstimate {
        value: kt * solution.delta(0, last),
        stat_err: kt * solution.delta_error(0, last),
        inte_err: 0.0,
    })
}

/// Averages of the target Hamiltonian, taken from one task's thermo output.
pub fn thermo_info(
    stage: &Stage,
    task: &TaskSamples,
    params: &HtiParams,
    nmols: usize,
) -> Result<ThermoInfo, EngineError> {
    let n = nmols as f64;
    let energy = column(task, COLUMN_TOTAL_ENERGY)?;
    let temp = column(task, COLUMN_TEMPERATURE)?;
    let press = column(task, COLUMN_PRESSURE)?;
    let volume = column(task, COLUMN_VOLUME)?;

    let pv: Vec<f64> = press
        .iter()
        .zip(&volume)
        .map(|(p, v)| p * v * BAR_ANGSTROM3_TO_EV / n)
        .collect();
    let enthalpy: Vec<f64> = energy.iter().zip(&pv).map(|(e, pv)| e / n + pv).collect();
    let per_mol: Vec<f64> = energy.iter().map(|e| e / n).collect();
    let vol_per_mol: Vec<f64> = volume.iter().map(|v| v / n).collect();

    let e = averaged(stage, &per_mol, params)?;
    let h = averaged(stage, &enthalpy, params)?;
    let t = averaged(stage, &temp, params)?;
    let p = averaged(stage, &press, params)?;
    let v = averaged(stage, &vol_per_mol, params)?;
    let pv = averaged(stage, &pv, params)?;
    Ok(ThermoInfo {
        e: e.mean,
        e_err: e.error,
        h: h.mean,
        h_err: h.error,
        t: t.mean,
        t_err: t.error,
        p: p.mean,
        p_err: p.error,
        v: v.mean,
        v_err: v.error,
        pv: pv.mean,
        pv_err: pv.error,
    })
}

/// Integrates every stage of a finished job and normalises the result by `nmols`.
///
/// Writes the averaged integrand of each stage to `NN.stage/hti.out`.
pub fn post_tasks(
    job: &Path,
    params: &HtiParams,
    nmols: usize,
    method: IntegrationMethod,
    reporter: &ProgressReporter,
) -> Result<IntegrationResult, EngineError> {
    if nmols == 0 {
        return Err(EngineError::InconsistentJob(
            "the configuration holds no complete molecule".to_string(),
        ));
    }
    let stages = params.switch.stages();
    let mut de = 0.0;
    let mut stat_sq = 0.0;
    let mut inte_sq = 0.0;
    let mut thermo = ThermoInfo::default();

    for (i, stage) in stages.iter().enumerate() {
        let tasks = load_stage(job, stage, reporter)?;
        let records = stage_integrand(stage, &tasks, params)?;
        write_integrand_table(&job.join(stage.dir_name()).join(INTEGRAND_TABLE), &records)?;

        let est = match method {
            IntegrationMethod::Inte => integrate_records(stage, &records)?,
            IntegrationMethod::Mbar => mbar_stage(stage, &tasks, params)?,
        };
        info!(
            stage = %stage,
            value = est.value,
            stat_err = est.stat_err,
            inte_err = est.inte_err,
            "Stage integrated."
        );
        reporter.report(Progress::Message(format!(
            "{}: {:.8} eV ({:.3e} stat, {:.3e} inte)",
            stage, est.value, est.stat_err, est.inte_err
        )));
        de += est.value;
        stat_sq += est.stat_err * est.stat_err;
        inte_sq += est.inte_err * est.inte_err;

        if i + 1 == stages.len() {
            if let Some(target) = tasks.last() {
                thermo = thermo_info(stage, target, params, nmols)?;
            }
        }
    }

    let n = nmols as f64;
    Ok(IntegrationResult {
        de: de / n,
        stat_err: stat_sq.sqrt() / n,
        inte_err: inte_sq.sqrt() / n,
        thermo,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fmt::Write;

    /// A minimal `log.lammps` whose thermo table carries the given `v_dudl` series.
    pub fn log_with_dudl(dudl: &[f64], press: f64, volume: f64, etotal: f64) -> String {
        let mut out = String::from(
            "LAMMPS (29 Sep 2021)\nunits metal\n\
             Step KinEng PotEng TotEng Temp Press Volume v_dudl \n",
        );
        for (i, d) in dudl.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} 1.0 {} {} 150 {} {} {}",
                i * 10,
                etotal - 1.0,
                etotal,
                press,
                volume,
                d
            );
        }
        out.push_str("Loop time of 1.0 on 1 procs for 100 steps with 12 atoms\n");
        out
    }
}
