use crate::core::models::lambda::{LambdaEntry, LambdaError, LambdaGrid};
use crate::core::reference::einstein::CrystalModel;
use crate::engine::stages::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EINSTEIN_REFERENCE: &str = "einstein";

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid λ grid '{key}': {source}")]
    Lambda {
        key: &'static str,
        source: LambdaError,
    },
    #[error("Invalid parameter '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Order in which the reference crystal is transformed into the target system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchProtocol {
    /// Springs off and target potential on in a single stage.
    OneStep,
    /// Target potential on, then springs off.
    TwoStep,
    /// Soft LJ on, LJ swapped for the target potential, then springs off.
    ThreeStep,
    /// Alias of the three-step path, kept verbatim in `in.json`.
    #[default]
    Both,
}

impl fmt::Display for SwitchProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwitchProtocol::OneStep => "one-step",
            SwitchProtocol::TwoStep => "two-step",
            SwitchProtocol::ThreeStep => "three-step",
            SwitchProtocol::Both => "both",
        };
        f.write_str(name)
    }
}

/// Spring constant in eV/Å², either shared by all atom types or given per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpringConstant {
    Uniform(f64),
    PerType(Vec<f64>),
}

impl SpringConstant {
    pub fn per_type(&self, num_types: usize) -> Vec<f64> {
        match self {
            SpringConstant::Uniform(k) => vec![*k; num_types],
            SpringConstant::PerType(ks) => ks.clone(),
        }
    }
}

/// Soft-core Lennard-Jones parameters used by the `lj_on` stage (`lj/cut/soft`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftParams {
    pub sigma_oo: f64,
    pub sigma_oh: f64,
    pub sigma_hh: f64,
    pub epsilon: f64,
    #[serde(default = "default_rcut")]
    pub rcut: f64,
    #[serde(default = "default_soft_n")]
    pub n: f64,
    #[serde(default = "default_alpha_lj")]
    pub alpha_lj: f64,
}

fn default_rcut() -> f64 {
    6.0
}
fn default_soft_n() -> f64 {
    1.0
}
fn default_alpha_lj() -> f64 {
    0.5
}
fn default_copies() -> [usize; 3] {
    [1, 1, 1]
}
fn default_timestep() -> f64 {
    0.0005
}
fn default_nsteps() -> usize {
    100_000
}
fn default_thermo_freq() -> usize {
    10
}
fn default_stat_bsize() -> usize {
    100
}
fn default_true() -> bool {
    true
}
fn default_tau_t() -> f64 {
    0.1
}
fn default_protect_eps() -> f64 {
    1e-6
}
fn default_reference() -> String {
    EINSTEIN_REFERENCE.to_string()
}

/// The job parameter set stored as `in.json`.
///
/// Keys this tool does not know about are carried through `extra` so that a
/// rewritten `in.json` keeps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtiParams {
    pub equi_conf: PathBuf,
    #[serde(default = "default_copies")]
    pub copies: [usize; 3],
    pub model: PathBuf,
    pub mass_map: Vec<f64>,
    pub spring_k: SpringConstant,
    pub temp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pres: Option<f64>,
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    #[serde(default = "default_nsteps")]
    pub nsteps: usize,
    #[serde(default = "default_thermo_freq")]
    pub thermo_freq: usize,
    #[serde(default)]
    pub stat_skip: usize,
    #[serde(default = "default_stat_bsize")]
    pub stat_bsize: usize,
    #[serde(default = "default_true")]
    pub langevin: bool,
    #[serde(default = "default_tau_t")]
    pub tau_t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_param: Option<SoftParams>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lambda_lj_on: Vec<LambdaEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lambda_deep_on: Vec<LambdaEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lambda_spring_off: Vec<LambdaEntry>,
    #[serde(default = "default_protect_eps")]
    pub protect_eps: f64,
    #[serde(default = "default_reference")]
    pub reference: String,
    #[serde(default)]
    pub crystal: CrystalModel,
    #[serde(default)]
    pub switch: SwitchProtocol,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HtiParams {
    pub fn from_json_str(content: &str, origin: &Path) -> Result<Self, ParamError> {
        let params: Self = serde_json::from_str(content).map_err(|source| ParamError::Json {
            path: origin.to_string_lossy().to_string(),
            source,
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn load(path: &Path) -> Result<Self, ParamError> {
        let content = fs::read_to_string(path).map_err(|source| ParamError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        Self::from_json_str(&content, path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ParamError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| ParamError::Json {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        fs::write(path, content + "\n").map_err(|source| ParamError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ParamError> {
        if !(self.temp > 0.0) {
            return Err(ParamError::Invalid {
                key: "temp",
                reason: format!("temperature must be positive, got {}", self.temp),
            });
        }
        if self.mass_map.is_empty() {
            return Err(ParamError::MissingParameter("mass_map"));
        }
        if self.copies.contains(&0) {
            return Err(ParamError::Invalid {
                key: "copies",
                reason: "every replication count must be at least 1".to_string(),
            });
        }
        if self.thermo_freq == 0 {
            return Err(ParamError::Invalid {
                key: "thermo_freq",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.protect_eps >= 0.0 && self.protect_eps < 0.5) {
            return Err(ParamError::Invalid {
                key: "protect_eps",
                reason: format!("must lie in [0, 0.5), got {}", self.protect_eps),
            });
        }
        Ok(())
    }

    pub fn num_copies(&self) -> usize {
        self.copies.iter().product()
    }

    pub fn spring_constants(&self) -> Vec<f64> {
        self.spring_k.per_type(self.mass_map.len())
    }

    /// Grid of λ values at which the tasks of a stage are run.
    pub fn lambda_grid(&self, kind: StageKind) -> Result<LambdaGrid, ParamError> {
        let key = kind.lambda_key();
        let entries = match kind {
            StageKind::LjOn => &self.lambda_lj_on,
            StageKind::DeepOn | StageKind::Switch => &self.lambda_deep_on,
            StageKind::SpringOff => &self.lambda_spring_off,
        };
        if entries.is_empty() {
            return Err(ParamError::MissingParameter(key));
        }
        let grid =
            LambdaGrid::from_entries(entries).map_err(|source| ParamError::Lambda { key, source })?;
        Ok(match kind {
            StageKind::LjOn => grid.protected(self.protect_eps),
            _ => grid,
        })
    }

    /// Replaces the grid of a stage with explicit values.
    pub fn set_lambda_grid(&mut self, kind: StageKind, grid: &LambdaGrid) {
        let entries = grid.to_entries();
        match kind {
            StageKind::LjOn => self.lambda_lj_on = entries,
            StageKind::DeepOn | StageKind::Switch => self.lambda_deep_on = entries,
            StageKind::SpringOff => self.lambda_spring_off = entries,
        }
    }

    pub fn soft_params(&self) -> Result<&SoftParams, ParamError> {
        self.soft_param
            .as_ref()
            .ok_or(ParamError::MissingParameter("soft_param"))
    }
}
