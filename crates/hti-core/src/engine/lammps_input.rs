use crate::core::reference::einstein::CrystalModel;
use crate::engine::config::{HtiParams, ParamError, SoftParams};
use crate::engine::stages::{Stage, StageKind};
use std::fmt::Write;

pub const INPUT_FILE: &str = "in.lammps";
pub const LAMBDA_FILE: &str = "lambda.out";
pub const LOG_FILE: &str = "log.lammps";

/// Thermo column headers as LAMMPS prints them for the `thermo_style` below.
pub const COLUMN_DUDL: &str = "v_dudl";
pub const COLUMN_TOTAL_ENERGY: &str = "TotEng";
pub const COLUMN_TEMPERATURE: &str = "Temp";
pub const COLUMN_PRESSURE: &str = "Press";
pub const COLUMN_VOLUME: &str = "Volume";

const DEEPMD_STYLE: &str = "deepmd";
const SOFT_LJ_STYLE: &str = "lj/cut/soft";

/// Renders the LAMMPS input of one task.
///
/// The task runs in `JOB/NN.stage/task.NNNNNN/` and reads the job's `conf.lmp`
/// two levels up.
pub fn render(
    params: &HtiParams,
    stage: &Stage,
    lambda: f64,
    seed: u64,
) -> Result<String, ParamError> {
    let mut out = String::new();
    let [nx, ny, nz] = params.copies;
    let spring_scale = if stage.kind.scales_springs() {
        1.0 - lambda
    } else {
        1.0
    };

    // `fmt::Write` into a String cannot fail.
    let _ = writeln!(out, "# {} at lambda = {}", stage, lambda);
    let _ = writeln!(out, "clear");
    let _ = writeln!(out, "variable        NSTEPS          equal {}", params.nsteps);
    let _ = writeln!(out, "variable        THERMO_FREQ     equal {}", params.thermo_freq);
    let _ = writeln!(out, "variable        TEMP            equal {}", params.temp);
    let _ = writeln!(out, "variable        TAU_T           equal {}", params.tau_t);
    if let Some(pres) = params.pres {
        let _ = writeln!(out, "variable        PRES            equal {}", pres);
    }
    let _ = writeln!(out, "variable        LAMBDA          equal {:.10}", lambda);
    let _ = writeln!(out, "variable        INV_LAMBDA      equal 1-v_LAMBDA");
    let _ = writeln!(out);
    let _ = writeln!(out, "units           metal");
    let _ = writeln!(out, "boundary        p p p");
    let _ = writeln!(out, "atom_style      atomic");
    let _ = writeln!(out, "read_data       ../../conf.lmp");
    let _ = writeln!(out, "replicate       {} {} {}", nx, ny, nz);
    for (i, mass) in params.mass_map.iter().enumerate() {
        let _ = writeln!(out, "mass            {} {}", i + 1, mass);
    }
    let _ = writeln!(out);

    write_pair_section(&mut out, params, stage)?;
    let _ = writeln!(out);
    write_spring_section(&mut out, params, spring_scale);
    let _ = writeln!(out);

    let _ = writeln!(out, "variable        dudl            equal {}", stage.dudl_expression());
    let _ = writeln!(out, "thermo_style    custom step ke pe etotal temp press vol v_dudl");
    let _ = writeln!(out, "thermo_modify   format float %.10e");
    let _ = writeln!(out, "thermo          ${{THERMO_FREQ}}");
    let _ = writeln!(out);

    let _ = writeln!(out, "velocity        all create ${{TEMP}} {} dist gaussian", seed);
    if params.langevin {
        let _ = writeln!(out, "fix             integrate all nve");
        let _ = writeln!(
            out,
            "fix             thermostat all langevin ${{TEMP}} ${{TEMP}} ${{TAU_T}} {} zero yes",
            seed + 1
        );
    } else {
        let _ = writeln!(out, "fix             integrate all nvt temp ${{TEMP}} ${{TEMP}} ${{TAU_T}}");
    }
    if params.crystal == CrystalModel::Frenkel {
        let _ = writeln!(out, "velocity        all zero linear");
        let _ = writeln!(out, "fix             fix_com all momentum 1 linear 1 1 1");
    }
    let _ = writeln!(out, "timestep        {}", params.timestep);
    let _ = writeln!(out, "run             ${{NSTEPS}}");

    Ok(out)
}

fn write_soft_coeffs(out: &mut String, soft: &SoftParams, substyle: &str) {
    let sigmas = [(1, 1, soft.sigma_oo), (1, 2, soft.sigma_oh), (2, 2, soft.sigma_hh)];
    for (i, j, sigma) in sigmas {
        let _ = writeln!(
            out,
            "pair_coeff      {} {} {}{} {} 1.0",
            i, j, substyle, soft.epsilon, sigma
        );
    }
}

fn write_pair_section(out: &mut String, params: &HtiParams, stage: &Stage) -> Result<(), ParamError> {
    let model = params.model.display();
    let soft_style = |soft: &SoftParams| {
        format!("{} {} {} {}", SOFT_LJ_STYLE, soft.n, soft.alpha_lj, soft.rcut)
    };

    match (stage.kind, stage.with_lj) {
        (StageKind::LjOn, _) => {
            let soft = params.soft_params()?;
            let _ = writeln!(out, "pair_style      hybrid/scaled v_LAMBDA {}", soft_style(soft));
            write_soft_coeffs(out, soft, &format!("{} ", SOFT_LJ_STYLE));
            let _ = writeln!(out, "compute         e_lj all pair {}", SOFT_LJ_STYLE);
            let _ = writeln!(out, "variable        E_lj            equal c_e_lj");
            let _ = writeln!(out, "variable        E_deep          equal 0");
        }
        (StageKind::DeepOn, true) => {
            let soft = params.soft_params()?;
            let _ = writeln!(
                out,
                "pair_style      hybrid/scaled v_INV_LAMBDA {} v_LAMBDA {} {}",
                soft_style(soft),
                DEEPMD_STYLE,
                model
            );
            write_soft_coeffs(out, soft, &format!("{} ", SOFT_LJ_STYLE));
            let _ = writeln!(out, "pair_coeff      * * {}", DEEPMD_STYLE);
            let _ = writeln!(out, "compute         e_lj all pair {}", SOFT_LJ_STYLE);
            let _ = writeln!(out, "compute         e_deep all pair {}", DEEPMD_STYLE);
            let _ = writeln!(out, "variable        E_lj            equal c_e_lj");
            let _ = writeln!(out, "variable        E_deep          equal c_e_deep");
        }
        (StageKind::DeepOn, false) | (StageKind::Switch, _) => {
            let _ = writeln!(out, "pair_style      hybrid/scaled v_LAMBDA {} {}", DEEPMD_STYLE, model);
            let _ = writeln!(out, "pair_coeff      * * {}", DEEPMD_STYLE);
            let _ = writeln!(out, "compute         e_deep all pair {}", DEEPMD_STYLE);
            let _ = writeln!(out, "variable        E_lj            equal 0");
            let _ = writeln!(out, "variable        E_deep          equal c_e_deep");
        }
        (StageKind::SpringOff, _) => {
            let _ = writeln!(out, "pair_style      {} {}", DEEPMD_STYLE, model);
            let _ = writeln!(out, "pair_coeff      * *");
            let _ = writeln!(out, "variable        E_lj            equal 0");
            let _ = writeln!(out, "variable        E_deep          equal pe");
        }
    }
    Ok(())
}

/// Harmonic tethers on every atom except, for the Einstein molecule, atom 1.
///
/// The unscaled spring energy is measured through the mean squared displacement
/// so that it stays defined when the applied spring constant reaches zero.
fn write_spring_section(out: &mut String, params: &HtiParams, scale: f64) {
    let springs = params.spring_constants();
    if params.crystal == CrystalModel::Vega {
        let _ = writeln!(out, "group           reference id 1");
    }
    let mut energy_terms = Vec::with_capacity(springs.len());
    for (i, k) in springs.iter().enumerate() {
        let t = i + 1;
        let _ = writeln!(out, "group           type_{t} type {t}");
        let group = if params.crystal == CrystalModel::Vega {
            let _ = writeln!(out, "group           spring_{t} subtract type_{t} reference");
            format!("spring_{t}")
        } else {
            format!("type_{t}")
        };
        let _ = writeln!(out, "fix             spring_{t} {group} spring/self {}", k * scale);
        let _ = writeln!(out, "compute         msd_{t} {group} msd");
        energy_terms.push(format!("0.5*{}*count({})*c_msd_{t}[4]", k, group));
    }
    let _ = writeln!(
        out,
        "variable        E_spring        equal {}",
        if energy_terms.is_empty() {
            "0".to_string()
        } else {
            energy_terms.join("+")
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SwitchProtocol;
    use std::path::Path;

    fn params(extra: &str) -> HtiParams {
        let json = format!(
            r#"{{
                "equi_conf": "conf.lmp", "model": "/models/graph.pb",
                "mass_map": [15.9994, 1.00794], "spring_k": 0.5, "temp": 200,
                "copies": [2, 1, 1],
                "soft_param": {{ "sigma_oo": 3.1, "sigma_oh": 2.0, "sigma_hh": 1.0, "epsilon": 0.0067 }},
                "lambda_deep_on": [0, 1]{}
            }}"#,
            extra
        );
        HtiParams::from_json_str(&json, Path::new("in.json")).unwrap()
    }

    #[test]
    fn lj_on_task_scales_soft_lj_and_keeps_full_springs() {
        let p = params("");
        let stage = SwitchProtocol::Both.stages()[0];
        let input = render(&p, &stage, 0.25, 7).unwrap();
        assert!(input.contains("variable        LAMBDA          equal 0.2500000000"));
        assert!(input.contains("replicate       2 1 1"));
        assert!(input.contains("pair_style      hybrid/scaled v_LAMBDA lj/cut/soft 1 0.5 6"));
        assert!(input.contains("pair_coeff      1 2 lj/cut/soft 0.0067 2 1.0"));
        assert!(input.contains("fix             spring_1 spring_1 spring/self 0.5"));
        assert!(input.contains("variable        dudl            equal v_E_lj"));
        assert!(input.contains("thermo_style    custom step ke pe etotal temp press vol v_dudl"));
    }

    #[test]
    fn spring_off_scales_springs_by_one_minus_lambda() {
        let p = params("");
        let stage = SwitchProtocol::Both.stages()[2];
        let input = render(&p, &stage, 0.75, 7).unwrap();
        assert!(input.contains("spring/self 0.125"));
        assert!(input.contains("pair_style      deepmd /models/graph.pb"));
        assert!(input.contains("variable        dudl            equal -v_E_spring"));
    }

    #[test]
    fn frenkel_crystal_tethers_every_atom_and_fixes_the_centre_of_mass() {
        let p = params(r#", "crystal": "frenkel", "langevin": false"#);
        let stage = SwitchProtocol::TwoStep.stages()[0];
        let input = render(&p, &stage, 0.5, 7).unwrap();
        assert!(!input.contains("group           reference id 1"));
        assert!(input.contains("fix             spring_2 type_2 spring/self 0.5"));
        assert!(input.contains("fix             fix_com all momentum 1 linear 1 1 1"));
        assert!(input.contains("fix             integrate all nvt temp"));
        assert!(input.contains("variable        dudl            equal v_E_deep\n"));
    }

    #[test]
    fn vega_crystal_leaves_the_reference_atom_free() {
        let p = params("");
        let stage = SwitchProtocol::OneStep.stages()[0];
        let input = render(&p, &stage, 0.0, 7).unwrap();
        assert!(input.contains("group           reference id 1"));
        assert!(input.contains("group           spring_1 subtract type_1 reference"));
        assert!(input.contains("fix             thermostat all langevin"));
    }

    #[test]
    fn soft_stages_require_soft_parameters() {
        let mut p = params("");
        p.soft_param = None;
        let stage = SwitchProtocol::Both.stages()[0];
        assert!(matches!(
            render(&p, &stage, 0.5, 1),
            Err(ParamError::MissingParameter("soft_param"))
        ));
    }
}
