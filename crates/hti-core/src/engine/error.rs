use crate::core::io::lammps::LammpsDataError;
use crate::core::io::table::TableError;
use crate::core::io::thermo_log::ThermoLogError;
use crate::core::numerics::NumericsError;
use crate::core::reference::einstein::EinsteinError;
use crate::engine::config::ParamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("Failed to read configuration '{path}': {source}")]
    Configuration {
        path: String,
        source: LammpsDataError,
    },

    #[error("Failed to read thermo output '{path}': {source}")]
    ThermoLog {
        path: String,
        source: ThermoLogError,
    },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Numerical failure in stage '{stage}': {source}")]
    Numerics {
        stage: String,
        source: NumericsError,
    },

    #[error("Einstein reference failed: {0}")]
    Einstein(#[from] EinsteinError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported reference '{0}': ice free energies must be computed against 'einstein'")]
    UnsupportedReference(String),

    #[error("Stage '{0}' contains no tasks")]
    EmptyStage(String),

    #[error("Inconsistent job: {0}")]
    InconsistentJob(String),
}

impl EngineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }
}
