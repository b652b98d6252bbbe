use super::NumericsError;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MbarOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for MbarOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-10,
        }
    }
}

/// Dimensionless free energies of all states, relative to state 0, with their
/// asymptotic covariance.
#[derive(Debug, Clone)]
pub struct MbarSolution {
    free_energies: Vec<f64>,
    covariance: DMatrix<f64>,
    iterations: usize,
}

impl MbarSolution {
    pub fn free_energies(&self) -> &[f64] {
        &self.free_energies
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `f_j - f_i` in units of kT.
    pub fn delta(&self, i: usize, j: usize) -> f64 {
        self.free_energies[j] - self.free_energies[i]
    }

    /// Standard error of `f_j - f_i`.
    pub fn delta_error(&self, i: usize, j: usize) -> f64 {
        let c = &self.covariance;
        (c[(i, i)] + c[(j, j)] - 2.0 * c[(i, j)]).max(0.0).sqrt()
    }
}

fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Solves the MBAR equations by self-consistent iteration.
///
/// `u_kn[(k, n)]` is the reduced potential of sample `n` evaluated in state `k`;
/// samples are pooled from all states and `n_k[k]` counts the samples drawn from
/// state `k`. States without samples are allowed.
pub fn solve(
    u_kn: &DMatrix<f64>,
    n_k: &[usize],
    options: &MbarOptions,
) -> Result<MbarSolution, NumericsError> {
    let (k_states, n_samples) = u_kn.shape();
    if n_k.len() != k_states {
        return Err(NumericsError::LengthMismatch {
            what: "sample counts",
            expected: k_states,
            actual: n_k.len(),
        });
    }
    let total: usize = n_k.iter().sum();
    if total != n_samples || n_samples == 0 {
        return Err(NumericsError::LengthMismatch {
            what: "pooled samples",
            expected: total,
            actual: n_samples,
        });
    }
    if u_kn.iter().any(|u| !u.is_finite()) {
        return Err(NumericsError::NonFinite("reduced potentials"));
    }

    let log_n_k: Vec<f64> = n_k
        .iter()
        .map(|&n| if n == 0 { f64::NEG_INFINITY } else { (n as f64).ln() })
        .collect();
    let mut f = vec![0.0; k_states];
    let mut log_denom = vec![0.0; n_samples];

    let mut iterations = 0;
    loop {
        for (n, slot) in log_denom.iter_mut().enumerate() {
            *slot = log_sum_exp((0..k_states).map(|k| log_n_k[k] + f[k] - u_kn[(k, n)]));
        }
        let mut f_new: Vec<f64> = (0..k_states)
            .map(|k| -log_sum_exp((0..n_samples).map(|n| -u_kn[(k, n)] - log_denom[n])))
            .collect();
        let offset = f_new[0];
        f_new.iter_mut().for_each(|v| *v -= offset);

        let residual = f_new
            .iter()
            .zip(&f)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        f = f_new;
        iterations += 1;
        trace!("MBAR iteration {}: residual {:e}", iterations, residual);

        if !residual.is_finite() {
            return Err(NumericsError::NonFinite("MBAR free energies"));
        }
        if residual < options.tolerance {
            break;
        }
        if iterations >= options.max_iterations {
            return Err(NumericsError::MbarConvergence {
                iterations,
                residual,
            });
        }
    }
    for (n, slot) in log_denom.iter_mut().enumerate() {
        *slot = log_sum_exp((0..k_states).map(|k| log_n_k[k] + f[k] - u_kn[(k, n)]));
    }
    debug!("MBAR converged after {} iterations", iterations);

    let covariance = asymptotic_covariance(u_kn, n_k, &f, &log_denom)?;
    Ok(MbarSolution {
        free_energies: f,
        covariance,
        iterations,
    })
}

/// Asymptotic covariance of the free energies from a thin SVD of the weight matrix.
fn asymptotic_covariance(
    u_kn: &DMatrix<f64>,
    n_k: &[usize],
    f: &[f64],
    log_denom: &[f64],
) -> Result<DMatrix<f64>, NumericsError> {
    let (k_states, n_samples) = u_kn.shape();
    let weights = DMatrix::from_fn(n_samples, k_states, |n, k| {
        (f[k] - u_kn[(k, n)] - log_denom[n]).exp()
    });

    let svd = weights.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or(NumericsError::NonFinite("MBAR weight decomposition"))?;
    let v = v_t.transpose();
    let sigma = DMatrix::from_diagonal(&svd.singular_values);
    let counts = DMatrix::from_diagonal(&DVector::from_iterator(
        k_states,
        n_k.iter().map(|&n| n as f64),
    ));

    let rank = sigma.nrows();
    let inner = DMatrix::<f64>::identity(rank, rank)
        - &sigma * v.columns(0, rank).transpose() * &counts * v.columns(0, rank) * &sigma;
    let inner_pinv = inner
        .pseudo_inverse(1e-10)
        .map_err(|_| NumericsError::NonFinite("MBAR covariance"))?;

    let v_sigma = v.columns(0, rank) * &sigma;
    Ok(&v_sigma * inner_pinv * v_sigma.transpose())
}
