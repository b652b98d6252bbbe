use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// One averaged integrand sample of a stage: ⟨dU/dλ⟩ at a given λ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntegrandRecord {
    pub lambda: f64,
    pub dudl: f64,
    pub dudl_err: f64,
}

pub fn write_integrand_table(path: &Path, records: &[IntegrandRecord]) -> Result<(), TableError> {
    let to_err = |source| TableError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_err)?;
    for record in records {
        writer.serialize(record).map_err(to_err)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    })
}
