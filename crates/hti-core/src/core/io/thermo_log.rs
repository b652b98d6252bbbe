use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ThermoLogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("No thermo output found in log")]
    NoThermoData,
    #[error("Malformed thermo row on line {line}: '{content}'")]
    MalformedRow { line: usize, content: String },
    #[error("Thermo column '{0}' not present in log")]
    MissingColumn(String),
}

/// The thermo table of the last `run` in a LAMMPS log.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ThermoTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the values of a column, matched case-insensitively.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, ThermoLogError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| ThermoLogError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, ThermoLogError> {
        let mut last: Option<ThermoTable> = None;
        let mut current: Option<ThermoTable> = None;

        for (idx, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = idx + 1;
            let trimmed = line.trim();

            if let Some(table) = current.as_mut() {
                if trimmed.starts_with("Loop time") {
                    last = current.take();
                    continue;
                }
                if trimmed.is_empty() || trimmed.starts_with("WARNING") {
                    continue;
                }
                let values: Result<Vec<f64>, _> =
                    trimmed.split_whitespace().map(str::parse::<f64>).collect();
                match values {
                    Ok(row) if row.len() == table.columns.len() => table.rows.push(row),
                    _ => {
                        return Err(ThermoLogError::MalformedRow {
                            line: line_num,
                            content: trimmed.to_string(),
                        });
                    }
                }
                continue;
            }

            if trimmed.starts_with("Step ") || trimmed == "Step" {
                debug!("Thermo header found on line {}", line_num);
                current = Some(ThermoTable {
                    columns: trimmed.split_whitespace().map(str::to_string).collect(),
                    rows: Vec::new(),
                });
            }
        }

        if let Some(unfinished) = current {
            warn!(
                "Thermo table without 'Loop time' footer; using {} rows of a possibly unfinished run.",
                unfinished.rows.len()
            );
            last = Some(unfinished);
        }

        match last {
            Some(table) if !table.rows.is_empty() => Ok(table),
            _ => Err(ThermoLogError::NoThermoData),
        }
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ThermoLogError> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }
}
