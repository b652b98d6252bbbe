use crate::core::io::lammps::LammpsDataFile;
use crate::core::io::traits::ConfigurationFile;
use crate::core::models::system::SystemData;
use crate::core::reference::einstein::CrystalModel;
use crate::engine::config::{EINSTEIN_REFERENCE, HtiParams, SwitchProtocol};
use crate::engine::error::EngineError;
use crate::engine::lammps_input::{self, INPUT_FILE, LAMBDA_FILE};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stages::{Stage, task_dir_name};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const PARAM_FILE: &str = "in.json";
pub const CONF_FILE: &str = "conf.lmp";

#[derive(Debug, Clone, PartialEq)]
pub struct GenSummary {
    pub job_dir: PathBuf,
    /// Where a previous directory of the same name was moved.
    pub backup: Option<PathBuf>,
    /// Stage directory names with their task counts.
    pub stages: Vec<(String, usize)>,
}

/// Generates an HTI job for ice against the Einstein reference.
///
/// The job always uses the `both` switch protocol; `crystal` selects between
/// Frenkel's fixed-centre-of-mass crystal and Vega's Einstein molecule.
#[instrument(skip_all, name = "generate_workflow")]
pub fn run(
    params: &HtiParams,
    output: &Path,
    crystal: CrystalModel,
    reporter: &ProgressReporter,
) -> Result<GenSummary, EngineError> {
    let mut params = params.clone();
    params.reference = EINSTEIN_REFERENCE.to_string();
    params.switch = SwitchProtocol::Both;
    params.crystal = crystal;
    params.equi_conf = absolute(&params.equi_conf)?;
    params.model = absolute(&params.model)?;
    info!(crystal = %crystal, output = %output.display(), "Generating HTI job.");

    let system = read_configuration(&params.equi_conf)?;
    check_types(&system, &params)?;

    let backup = backup_existing(output)?;
    create_dir(output)?;
    write_configuration(&system.with_masses(params.mass_map.clone()), &output.join(CONF_FILE))?;
    params.save(&output.join(PARAM_FILE))?;

    let mut stages = Vec::new();
    for stage in params.switch.stages() {
        let grid = params.lambda_grid(stage.kind)?;
        reporter.report(Progress::StageStart {
            name: stage.dir_name(),
            tasks: grid.len() as u64,
        });
        for (index, &lambda) in grid.values().iter().enumerate() {
            write_task(output, &params, &stage, index, lambda)?;
            reporter.report(Progress::TaskDone);
        }
        reporter.report(Progress::StageFinish);
        info!("Stage {} holds {} tasks.", stage, grid.len());
        stages.push((stage.dir_name(), grid.len()));
    }

    Ok(GenSummary {
        job_dir: output.to_path_buf(),
        backup,
        stages,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, EngineError> {
    std::path::absolute(path).map_err(|e| EngineError::io(path, e))
}

fn create_dir(path: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(path).map_err(|e| EngineError::io(path, e))
}

pub(crate) fn read_configuration(path: &Path) -> Result<SystemData, EngineError> {
    LammpsDataFile::read_from_path(path).map_err(|source| EngineError::Configuration {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

pub(crate) fn write_configuration(system: &SystemData, path: &Path) -> Result<(), EngineError> {
    LammpsDataFile::write_to_path(system, path).map_err(|source| EngineError::Configuration {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

fn check_types(system: &SystemData, params: &HtiParams) -> Result<(), EngineError> {
    if system.num_types() != params.mass_map.len() {
        return Err(EngineError::InconsistentJob(format!(
            "configuration has {} atom types but mass_map lists {}",
            system.num_types(),
            params.mass_map.len()
        )));
    }
    Ok(())
}

/// Moves an existing `path` aside to the first free `path.bkNNN`.
pub(crate) fn backup_existing(path: &Path) -> Result<Option<PathBuf>, EngineError> {
    if !path.exists() {
        return Ok(None);
    }
    let base = path.as_os_str().to_string_lossy().trim_end_matches('/').to_string();
    for counter in 0..1000 {
        let candidate = PathBuf::from(format!("{}.bk{:03}", base, counter));
        if !candidate.exists() {
            fs::rename(path, &candidate).map_err(|e| EngineError::io(path, e))?;
            warn!("Moved existing '{}' to '{}'.", path.display(), candidate.display());
            return Ok(Some(candidate));
        }
    }
    Err(EngineError::InconsistentJob(format!(
        "no free backup name left for '{}'",
        path.display()
    )))
}

/// Writes `in.lammps` and `lambda.out` of one task and returns its directory.
pub(crate) fn write_task(
    job: &Path,
    params: &HtiParams,
    stage: &Stage,
    index: usize,
    lambda: f64,
) -> Result<PathBuf, EngineError> {
    let dir = job.join(stage.dir_name()).join(task_dir_name(index));
    create_dir(&dir)?;
    let seed = 2 * (stage.index as u64 * 100_000 + index as u64) + 1;
    let input = lammps_input::render(params, stage, lambda, seed)?;
    let input_path = dir.join(INPUT_FILE);
    fs::write(&input_path, input).map_err(|e| EngineError::io(&input_path, e))?;
    let lambda_path = dir.join(LAMBDA_FILE);
    fs::write(&lambda_path, format!("{}\n", lambda)).map_err(|e| EngineError::io(&lambda_path, e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::testing::{job_params, write_conf};
    use tempfile::tempdir;

    #[test]
    fn job_layout_is_created() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let params = job_params(&conf);
        let job = dir.path().join("new_job");

        let summary = run(&params, &job, CrystalModel::Vega, &ProgressReporter::new()).unwrap();

        assert_eq!(summary.backup, None);
        assert_eq!(
            summary.stages,
            vec![
                ("00.lj_on".to_string(), 3),
                ("01.deep_on".to_string(), 3),
                ("02.spring_off".to_string(), 2),
            ]
        );
        assert!(job.join(CONF_FILE).exists());
        let task = job.join("01.deep_on").join("task.000002");
        assert!(task.join(INPUT_FILE).exists());
        assert_eq!(fs::read_to_string(task.join(LAMBDA_FILE)).unwrap(), "1\n");
        let lj_first = job.join("00.lj_on").join("task.000000").join(LAMBDA_FILE);
        assert_eq!(fs::read_to_string(lj_first).unwrap(), "0.000001\n");
    }

    #[test]
    fn written_parameters_record_the_reference_setup() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let mut params = job_params(&conf);
        params.switch = SwitchProtocol::OneStep;
        params.reference = "ideal".to_string();
        let job = dir.path().join("job");

        run(&params, &job, CrystalModel::Frenkel, &ProgressReporter::new()).unwrap();

        let written = HtiParams::load(&job.join(PARAM_FILE)).unwrap();
        assert_eq!(written.reference, "einstein");
        assert_eq!(written.switch, SwitchProtocol::Both);
        assert_eq!(written.crystal, CrystalModel::Frenkel);
        assert!(written.equi_conf.is_absolute());
        let copied = read_configuration(&job.join(CONF_FILE)).unwrap();
        assert_eq!(copied.atom_numbs(), &[2, 4]);
    }

    #[test]
    fn existing_output_is_backed_up() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let params = job_params(&conf);
        let job = dir.path().join("job");
        fs::create_dir_all(&job).unwrap();
        fs::write(job.join("marker"), "old").unwrap();

        let summary = run(&params, &job, CrystalModel::Vega, &ProgressReporter::new()).unwrap();
        let backup = summary.backup.unwrap();
        assert_eq!(backup, dir.path().join("job.bk000"));
        assert!(backup.join("marker").exists());
        assert!(!job.join("marker").exists());

        let second = run(&params, &job, CrystalModel::Vega, &ProgressReporter::new()).unwrap();
        assert_eq!(second.backup.unwrap(), dir.path().join("job.bk001"));
    }

    #[test]
    fn mass_map_must_match_the_configuration() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let mut params = job_params(&conf);
        params.mass_map = vec![15.9994];
        let result = run(&params, &dir.path().join("job"), CrystalModel::Vega, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::InconsistentJob(_))));
    }
}
