use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Two λ values closer than this are treated as the same grid point.
pub const LAMBDA_MATCH_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LambdaError {
    #[error("Invalid λ range '{0}': expected 'start:stop:step'")]
    MalformedRange(String),
    #[error("Invalid number '{value}' in λ range '{range}'")]
    InvalidNumber { range: String, value: String },
    #[error("λ range '{0}' must have a positive step")]
    NonPositiveStep(String),
    #[error("λ value {0} lies outside [0, 1]")]
    OutOfBounds(f64),
    #[error("λ grid is empty")]
    Empty,
}

/// One entry of a λ grid as written in the job parameters: either a single value
/// or a `"start:stop:step"` range with the stop value excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LambdaEntry {
    Value(f64),
    Range(String),
}

impl LambdaEntry {
    fn expand(&self, out: &mut Vec<f64>) -> Result<(), LambdaError> {
        match self {
            LambdaEntry::Value(v) => {
                out.push(*v);
                Ok(())
            }
            LambdaEntry::Range(text) => expand_range(text, out),
        }
    }
}

impl fmt::Display for LambdaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LambdaEntry::Value(v) => write!(f, "{}", v),
            LambdaEntry::Range(s) => f.write_str(s),
        }
    }
}

fn expand_range(text: &str, out: &mut Vec<f64>) -> Result<(), LambdaError> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    let parse = |s: &str| -> Result<f64, LambdaError> {
        s.parse::<f64>().map_err(|_| LambdaError::InvalidNumber {
            range: text.to_string(),
            value: s.to_string(),
        })
    };
    match parts.as_slice() {
        [single] => {
            out.push(parse(single)?);
            Ok(())
        }
        [start, stop, step] => {
            let (start, stop, step) = (parse(start)?, parse(stop)?, parse(step)?);
            if step <= 0.0 {
                return Err(LambdaError::NonPositiveStep(text.to_string()));
            }
            let n = ((stop - start) / step - LAMBDA_MATCH_TOLERANCE).ceil().max(0.0) as usize;
            out.extend((0..n).map(|i| start + i as f64 * step));
            Ok(())
        }
        _ => Err(LambdaError::MalformedRange(text.to_string())),
    }
}

/// A sorted, de-duplicated set of λ values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaGrid {
    values: Vec<f64>,
}

impl LambdaGrid {
    pub fn from_entries(entries: &[LambdaEntry]) -> Result<Self, LambdaError> {
        let mut values = Vec::new();
        for entry in entries {
            entry.expand(&mut values)?;
        }
        Self::from_values(values)
    }

    pub fn from_values(mut values: Vec<f64>) -> Result<Self, LambdaError> {
        if let Some(&bad) = values
            .iter()
            .find(|v| !v.is_finite() || **v < -LAMBDA_MATCH_TOLERANCE || **v > 1.0 + LAMBDA_MATCH_TOLERANCE)
        {
            return Err(LambdaError::OutOfBounds(bad));
        }
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup_by(|a, b| (*a - *b).abs() < LAMBDA_MATCH_TOLERANCE);
        if values.is_empty() {
            return Err(LambdaError::Empty);
        }
        Ok(Self { values })
    }

    /// Moves the end points 0 and 1 inward by `eps`.
    pub fn protected(&self, eps: f64) -> Self {
        let values = self
            .values
            .iter()
            .map(|&v| {
                if v.abs() < LAMBDA_MATCH_TOLERANCE {
                    eps
                } else if (v - 1.0).abs() < LAMBDA_MATCH_TOLERANCE {
                    1.0 - eps
                } else {
                    v
                }
            })
            .collect();
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_entries(&self) -> Vec<LambdaEntry> {
        self.values.iter().copied().map(LambdaEntry::Value).collect()
    }
}
