use super::generate::{CONF_FILE, PARAM_FILE, read_configuration};
use crate::core::constants::{ATOMS_PER_MOLECULE, pauling_correction};
use crate::core::models::system::{SystemData, molecule_count, replicated_count};
use crate::core::reference::einstein::EinsteinCrystal;
use crate::engine::config::{EINSTEIN_REFERENCE, HtiParams};
use crate::engine::error::EngineError;
use crate::engine::post::{IntegrationMethod, IntegrationResult, post_tasks};
use crate::engine::progress::ProgressReporter;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FreeEnergyType {
    #[default]
    Helmholtz,
    Gibbs,
}

impl fmt::Display for FreeEnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeEnergyType::Helmholtz => f.write_str("Helmholtz"),
            FreeEnergyType::Gibbs => f.write_str("Gibbs"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComputeOptions {
    pub free_energy_type: FreeEnergyType,
    pub method: IntegrationMethod,
    /// Add the Pauling residual entropy of proton-disordered ice.
    pub disorder_corr: bool,
}

/// Free energy of a finished job, everything in eV per molecule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputeReport {
    pub nmols: usize,
    /// Einstein reference free energy, including the Pauling correction when requested.
    pub e0: f64,
    pub pauling_corr: f64,
    pub integration: IntegrationResult,
    pub free_energy_type: FreeEnergyType,
    pub free_energy: f64,
    pub stat_err: f64,
    pub inte_err: f64,
}

/// Einstein-crystal free energy per atom of the (replicated) job configuration.
pub fn einstein_free_energy(params: &HtiParams, system: &SystemData) -> Result<f64, EngineError> {
    let copies = params.num_copies();
    let atom_numbs: Vec<usize> = system.atom_numbs().iter().map(|&n| n * copies).collect();
    let reference_type = system.atom_types().first().copied().ok_or_else(|| {
        EngineError::InconsistentJob("the configuration holds no atoms".to_string())
    })?;
    let springs = params.spring_constants();
    let crystal = EinsteinCrystal {
        temperature: params.temp,
        masses: &params.mass_map,
        spring_constants: &springs,
        atom_numbs: &atom_numbs,
        volume: system.volume() * copies as f64,
        model: params.crystal,
        reference_type,
    };
    Ok(crystal.free_energy_per_atom()?)
}

/// Computes the free energy per molecule of the job in `job`.
///
/// Fails with [`EngineError::UnsupportedReference`] before any integration when the
/// job was not set up against the Einstein reference.
#[instrument(skip_all, name = "compute_workflow")]
pub fn run(
    job: &Path,
    options: &ComputeOptions,
    reporter: &ProgressReporter,
) -> Result<ComputeReport, EngineError> {
    let params = HtiParams::load(&job.join(PARAM_FILE))?;
    let system = read_configuration(&job.join(CONF_FILE))?;

    let natoms = replicated_count(system.natoms(), &params.copies);
    let nmols = molecule_count(natoms);
    info!(natoms, nmols, "Job configuration loaded.");

    if params.reference != EINSTEIN_REFERENCE {
        return Err(EngineError::UnsupportedReference(params.reference.clone()));
    }
    let mut e0 = einstein_free_energy(&params, &system)? * ATOMS_PER_MOLECULE as f64;
    let pauling_corr = if options.disorder_corr {
        pauling_correction(params.temp)
    } else {
        0.0
    };
    e0 += pauling_corr;

    let integration = post_tasks(job, &params, nmols, options.method, reporter)?;
    let (free_energy, stat_err) = match options.free_energy_type {
        FreeEnergyType::Helmholtz => (e0 + integration.de, integration.stat_err),
        FreeEnergyType::Gibbs => {
            let pv = integration.thermo.pv;
            let pv_err = integration.thermo.pv_err;
            (
                e0 + integration.de + pv,
                (integration.stat_err.powi(2) + pv_err.powi(2)).sqrt(),
            )
        }
    };
    info!(
        kind = %options.free_energy_type,
        free_energy,
        stat_err,
        inte_err = integration.inte_err,
        "Free energy computed."
    );

    Ok(ComputeReport {
        nmols,
        e0,
        pauling_corr,
        integration,
        free_energy_type: options.free_energy_type,
        free_energy,
        stat_err,
        inte_err: integration.inte_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::BAR_ANGSTROM3_TO_EV;
    use crate::core::reference::einstein::CrystalModel;
    use crate::engine::lammps_input::LOG_FILE;
    use crate::engine::post::fixtures::log_with_dudl;
    use crate::engine::post::{read_task_lambda, stage_task_dirs};
    use crate::workflows::generate;
    use crate::workflows::testing::{job_params, write_conf};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// A generated job whose tasks report dU/dλ = 3 in every stage and a
    /// fluctuating pressure in the target state.
    fn finished_job(root: &Path) -> PathBuf {
        let conf = write_conf(root);
        let job = root.join("job");
        generate::run(&job_params(&conf), &job, CrystalModel::Vega, &ProgressReporter::new())
            .unwrap();
        for stage in HtiParams::load(&job.join(PARAM_FILE)).unwrap().switch.stages() {
            for dir in stage_task_dirs(&job, &stage).unwrap() {
                let log = if read_task_lambda(&dir).unwrap() == 1.0 {
                    // alternate the pressure between two blocks
                    let a = log_with_dudl(&[3.0; 2], 1000.0, 120.0, -40.0);
                    let b = log_with_dudl(&[3.0; 2], 3000.0, 120.0, -40.0);
                    let rows_b: Vec<&str> = b.lines().skip(3).take(2).collect();
                    a.replacen("Loop time", &format!("{}\nLoop time", rows_b.join("\n")), 1)
                } else {
                    log_with_dudl(&[3.0; 4], 1000.0, 120.0, -40.0)
                };
                fs::write(dir.join(LOG_FILE), log).unwrap();
            }
        }
        job
    }

    fn options(kind: FreeEnergyType, disorder_corr: bool) -> ComputeOptions {
        ComputeOptions {
            free_energy_type: kind,
            method: IntegrationMethod::Inte,
            disorder_corr,
        }
    }

    #[test]
    fn helmholtz_free_energy_combines_reference_and_integration() {
        let dir = tempdir().unwrap();
        let job = finished_job(dir.path());
        let report = run(&job, &options(FreeEnergyType::Helmholtz, false), &ProgressReporter::new())
            .unwrap();

        assert_eq!(report.nmols, 2);
        assert_eq!(report.pauling_corr, 0.0);
        // lj_on spans [1e-6, 1 - 1e-6]; the other two stages span [0, 1]
        let de = 3.0 * ((1.0 - 2e-6) + 1.0 + 1.0) / 2.0;
        assert!((report.integration.de - de).abs() < 1e-9);
        assert!((report.free_energy - (report.e0 + de)).abs() < 1e-9);
        assert_eq!(report.stat_err, report.integration.stat_err);
    }

    #[test]
    fn disorder_correction_is_added_to_the_reference() {
        let dir = tempdir().unwrap();
        let job = finished_job(dir.path());
        let plain = run(&job, &options(FreeEnergyType::Helmholtz, false), &ProgressReporter::new())
            .unwrap();
        let corrected = run(&job, &options(FreeEnergyType::Helmholtz, true), &ProgressReporter::new())
            .unwrap();
        assert!((corrected.pauling_corr - pauling_correction(150.0)).abs() < 1e-15);
        assert!((corrected.e0 - plain.e0 - corrected.pauling_corr).abs() < 1e-12);
    }

    #[test]
    fn gibbs_adds_pv_and_its_error_in_quadrature() {
        let dir = tempdir().unwrap();
        let job = finished_job(dir.path());
        let helmholtz =
            run(&job, &options(FreeEnergyType::Helmholtz, false), &ProgressReporter::new()).unwrap();
        let gibbs =
            run(&job, &options(FreeEnergyType::Gibbs, false), &ProgressReporter::new()).unwrap();

        let thermo = gibbs.integration.thermo;
        let pv = 2000.0 * 120.0 * BAR_ANGSTROM3_TO_EV / 2.0;
        assert!((thermo.pv - pv).abs() < 1e-12);
        assert!(thermo.pv_err > 0.0);
        assert!((gibbs.free_energy - (helmholtz.free_energy + thermo.pv)).abs() < 1e-12);
        let expected_err = (gibbs.integration.stat_err.powi(2) + thermo.pv_err.powi(2)).sqrt();
        assert!((gibbs.stat_err - expected_err).abs() < 1e-15);
        assert_eq!(gibbs.inte_err, helmholtz.inte_err);
    }

    #[test]
    fn non_einstein_reference_fails_before_integration() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let job = dir.path().join("job");
        generate::run(&job_params(&conf), &job, CrystalModel::Vega, &ProgressReporter::new())
            .unwrap();
        let mut params = HtiParams::load(&job.join(PARAM_FILE)).unwrap();
        params.reference = "ideal".to_string();
        params.save(&job.join(PARAM_FILE)).unwrap();

        // no task has a log yet, so reaching the integration would fail differently
        let err = run(&job, &ComputeOptions::default(), &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedReference(r) if r == "ideal"));
    }

    #[test]
    fn molecules_count_replicated_atoms() {
        let dir = tempdir().unwrap();
        let job = finished_job(dir.path());
        let mut params = HtiParams::load(&job.join(PARAM_FILE)).unwrap();
        params.copies = [2, 2, 1];
        params.save(&job.join(PARAM_FILE)).unwrap();
        let report = run(&job, &ComputeOptions::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(report.nmols, 8);
    }

    #[test]
    fn einstein_reference_scales_with_replication() {
        let dir = tempdir().unwrap();
        let conf = write_conf(dir.path());
        let mut params = job_params(&conf);
        let system = generate::read_configuration(&conf).unwrap();
        let single = einstein_free_energy(&params, &system).unwrap();
        params.copies = [2, 1, 1];
        let double = einstein_free_energy(&params, &system).unwrap();
        assert!(single.is_finite() && double.is_finite());
        assert_ne!(single, double);
    }
}
