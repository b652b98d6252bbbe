use crate::cli::ComputeArgs;
use crate::error::Result;
use crate::utils::format::{fixed, value_with_errors};
use crate::utils::progress::CliProgressHandler;
use hti_ice::engine::post::ThermoInfo;
use hti_ice::engine::progress::ProgressReporter;
use hti_ice::workflows::compute::{ComputeOptions, ComputeReport, FreeEnergyType};
use hti_ice::workflows;

pub fn run(args: ComputeArgs) -> Result<()> {
    let options = ComputeOptions {
        free_energy_type: args.free_energy_type.into(),
        method: args.inte_method.into(),
        disorder_corr: args.disorder_corr,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let report = workflows::compute::run(&args.job, &options, &reporter)?;

    println!("{}", render_report(&report));
    Ok(())
}

fn thermo_line(label: &str, value: f64, err: f64) -> String {
    format!("# {}  {} {}", label, fixed(value, 20, 8), fixed(err, 20, 8))
}

pub fn render_thermo_info(info: &ThermoInfo) -> String {
    [
        "# thermodynamics (normalized by nmols)".to_string(),
        thermo_line("E (err)  [eV]:", info.e, info.e_err),
        thermo_line("H (err)  [eV]:", info.h, info.h_err),
        thermo_line("T (err)   [K]:", info.t, info.t_err),
        thermo_line("P (err) [bar]:", info.p, info.p_err),
        thermo_line("V (err) [A^3]:", info.v, info.v_err),
        thermo_line("PV(err)  [eV]:", info.pv, info.pv_err),
    ]
    .join("\n")
}

pub fn render_report(report: &ComputeReport) -> String {
    let integration = &report.integration;
    let heading = match report.free_energy_type {
        FreeEnergyType::Helmholtz => "# Helmholtz free ener per mol (stat_err inte_err) [eV]:",
        FreeEnergyType::Gibbs => "# Gibbs free ener per mol (stat_err inte_err) [eV]:",
    };
    [
        render_thermo_info(&integration.thermo),
        format!("# free ener of Einstein Mole: {}", fixed(report.e0, 20, 8)),
        format!("# Pauling corr:               {}", fixed(report.pauling_corr, 20, 8)),
        format!(
            "# fe integration              {}",
            value_with_errors(integration.de, integration.stat_err, integration.inte_err)
        ),
        heading.to_string(),
        value_with_errors(report.free_energy, report.stat_err, report.inte_err),
    ]
    .join("\n")
}
