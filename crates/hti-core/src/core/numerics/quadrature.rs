use super::NumericsError;

/// Largest number of points a refined λ grid may hold.
pub const MAX_REFINED_POINTS: usize = 100_000;

/// Result of integrating a sampled integrand over its grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegralEstimate {
    pub value: f64,
    /// Statistical error propagated from the per-point errors.
    pub stat_err: f64,
    /// Quadrature error, estimated as |Simpson − trapezoid|.
    pub inte_err: f64,
}

fn validate_grid(x: &[f64]) -> Result<(), NumericsError> {
    if x.len() < 2 {
        return Err(NumericsError::InsufficientPoints {
            what: "quadrature",
            required: 2,
            actual: x.len(),
        });
    }
    if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
        return Err(NumericsError::NonIncreasingGrid { index: index + 1 });
    }
    Ok(())
}

/// Trapezoid weights on an arbitrary increasing grid.
pub fn trapezoid_weights(x: &[f64]) -> Result<Vec<f64>, NumericsError> {
    validate_grid(x)?;
    let mut w = vec![0.0; x.len()];
    for (i, pair) in x.windows(2).enumerate() {
        let h = pair[1] - pair[0];
        w[i] += 0.5 * h;
        w[i + 1] += 0.5 * h;
    }
    Ok(w)
}

/// Composite Simpson weights on an arbitrary increasing grid.
///
/// Intervals are consumed in pairs with the non-uniform three-point rule. With an odd
/// number of intervals the last one is integrated with the parabola through the last
/// three points. Two points fall back to the trapezoid rule.
pub fn simpson_weights(x: &[f64]) -> Result<Vec<f64>, NumericsError> {
    validate_grid(x)?;
    let n = x.len();
    if n == 2 {
        return trapezoid_weights(x);
    }
    let mut w = vec![0.0; n];
    let intervals = n - 1;
    let paired = intervals - intervals % 2;

    for i in (0..paired).step_by(2) {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let s = (h0 + h1) / 6.0;
        w[i] += s * (2.0 - h1 / h0);
        w[i + 1] += s * (h0 + h1) * (h0 + h1) / (h0 * h1);
        w[i + 2] += s * (2.0 - h0 / h1);
    }

    if intervals % 2 == 1 {
        let h0 = x[n - 2] - x[n - 3];
        let h1 = x[n - 1] - x[n - 2];
        w[n - 1] += (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
        w[n - 2] += (h1 * h1 + 3.0 * h1 * h0) / (6.0 * h0);
        w[n - 3] -= h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
    }
    Ok(w)
}

/// Integrates `y(x)` with Simpson weights and propagates the independent errors `y_err`.
pub fn integrate(x: &[f64], y: &[f64], y_err: &[f64]) -> Result<IntegralEstimate, NumericsError> {
    for (what, len) in [("integrand", y.len()), ("integrand errors", y_err.len())] {
        if len != x.len() {
            return Err(NumericsError::LengthMismatch {
                what,
                expected: x.len(),
                actual: len,
            });
        }
    }
    let simpson = simpson_weights(x)?;
    let trapezoid = trapezoid_weights(x)?;

    let dot = |w: &[f64], v: &[f64]| w.iter().zip(v).map(|(a, b)| a * b).sum::<f64>();
    let value = dot(&simpson, y);
    let stat_err = simpson
        .iter()
        .zip(y_err)
        .map(|(w, e)| (w * e).powi(2))
        .sum::<f64>()
        .sqrt();
    let inte_err = (value - dot(&trapezoid, y)).abs();

    if !value.is_finite() || !stat_err.is_finite() {
        return Err(NumericsError::NonFinite("quadrature"));
    }
    Ok(IntegralEstimate {
        value,
        stat_err,
        inte_err,
    })
}

fn second_derivative(x: &[f64], y: &[f64], i: usize) -> f64 {
    let d01 = (y[i + 1] - y[i]) / (x[i + 1] - x[i]);
    let d12 = (y[i + 2] - y[i + 1]) / (x[i + 2] - x[i + 1]);
    2.0 * (d12 - d01) / (x[i + 2] - x[i])
}

/// Local quadrature error of each interval, `h³ |f''| / 12`.
///
/// The curvature of interval `i` is the larger of the two three-point stencils that
/// contain it. Grids with fewer than three points carry no curvature information and
/// report zero error.
pub fn interval_errors(x: &[f64], y: &[f64]) -> Result<Vec<f64>, NumericsError> {
    validate_grid(x)?;
    if y.len() != x.len() {
        return Err(NumericsError::LengthMismatch {
            what: "integrand",
            expected: x.len(),
            actual: y.len(),
        });
    }
    let n = x.len();
    if n < 3 {
        return Ok(vec![0.0; n - 1]);
    }
    let curvature: Vec<f64> = (0..n - 2).map(|i| second_derivative(x, y, i).abs()).collect();
    Ok((0..n - 1)
        .map(|i| {
            let left = i.checked_sub(1).and_then(|j| curvature.get(j)).copied();
            let right = curvature.get(i).copied();
            let f2 = left.into_iter().chain(right).fold(0.0_f64, f64::max);
            let h = x[i + 1] - x[i];
            h * h * h * f2 / 12.0
        })
        .collect())
}

/// Number of equal pieces each interval must be cut into so that its error drops below `tol`.
///
/// The local error of the trapezoid-like panel scales with `h³`, so `k` pieces reduce the
/// interval's total error by `k²`. Factors are capped at [`MAX_REFINED_POINTS`].
pub fn refinement_factors(errors: &[f64], tol: f64) -> Vec<usize> {
    errors
        .iter()
        .map(|&e| {
            if !(tol > 0.0 && e > tol) {
                1
            } else {
                (e / tol).sqrt().ceil().min(MAX_REFINED_POINTS as f64) as usize
            }
        })
        .collect()
}

/// Splits interval `i` of `x` into `factors[i]` equal pieces.
pub fn refine_grid(x: &[f64], factors: &[usize]) -> Result<Vec<f64>, NumericsError> {
    let points = factors
        .iter()
        .try_fold(1_usize, |acc, &k| acc.checked_add(k.max(1)))
        .filter(|&n| n <= MAX_REFINED_POINTS)
        .ok_or(NumericsError::GridTooLarge {
            limit: MAX_REFINED_POINTS,
        })?;
    let mut out = Vec::with_capacity(points);
    for (pair, &k) in x.windows(2).zip(factors) {
        let k = k.max(1);
        let h = (pair[1] - pair[0]) / k as f64;
        out.extend((0..k).map(|j| pair[0] + j as f64 * h));
    }
    if let Some(&last) = x.last() {
        out.push(last);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} != {b}");
    }

    #[test]
    fn simpson_is_exact_for_quadratics_on_uneven_grid() {
        let x = [0.0, 0.1, 0.35, 0.5, 0.8, 1.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v * v - v + 2.0).collect();
        let est = integrate(&x, &y, &[0.0; 6]).unwrap();
        // ∫0^1 (3x² - x + 2) dx = 1 - 0.5 + 2
        close(est.value, 2.5, 1e-12);
    }

    #[test]
    fn simpson_with_even_interval_count_is_exact_for_quadratics() {
        let x = [0.0, 0.2, 0.5, 0.7, 1.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        close(integrate(&x, &y, &[0.0; 5]).unwrap().value, 1.0 / 3.0, 1e-12);
    }

    #[test]
    fn uniform_simpson_weights_are_classic() {
        let w = simpson_weights(&[0.0, 0.5, 1.0]).unwrap();
        close(w[0], 1.0 / 6.0, 1e-15);
        close(w[1], 4.0 / 6.0, 1e-15);
        close(w[2], 1.0 / 6.0, 1e-15);
    }

    #[test]
    fn weights_sum_to_interval_length() {
        let x = [0.0, 0.05, 0.1, 0.3, 0.65, 1.0];
        close(simpson_weights(&x).unwrap().iter().sum(), 1.0, 1e-12);
        close(trapezoid_weights(&x).unwrap().iter().sum(), 1.0, 1e-12);
    }

    #[test]
    fn linear_integrand_has_no_integration_error() {
        let x = [0.0, 0.3, 1.0];
        let y = [1.0, 1.6, 3.0];
        let est = integrate(&x, &y, &[0.0; 3]).unwrap();
        close(est.value, 2.0, 1e-12);
        close(est.inte_err, 0.0, 1e-12);
    }

    #[test]
    fn two_points_use_trapezoid_and_propagate_errors() {
        let est = integrate(&[0.0, 1.0], &[1.0, 3.0], &[0.2, 0.2]).unwrap();
        close(est.value, 2.0, 1e-12);
        close(est.stat_err, (2.0 * 0.01_f64).sqrt(), 1e-12);
        assert_eq!(est.inte_err, 0.0);
    }

    #[test]
    fn curved_integrand_reports_integration_error() {
        let x = [0.0, 0.5, 1.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let est = integrate(&x, &y, &[0.0; 3]).unwrap();
        // trapezoid gives 0.375, Simpson 1/3
        close(est.inte_err, 0.375 - 1.0 / 3.0, 1e-12);
    }

    #[test]
    fn bad_grids_are_rejected() {
        assert!(matches!(
            integrate(&[0.0], &[1.0], &[0.0]),
            Err(NumericsError::InsufficientPoints { .. })
        ));
        assert_eq!(
            simpson_weights(&[0.0, 0.5, 0.5, 1.0]),
            Err(NumericsError::NonIncreasingGrid { index: 2 })
        );
        assert!(matches!(
            integrate(&[0.0, 1.0], &[1.0], &[0.0, 0.0]),
            Err(NumericsError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn interval_errors_follow_curvature() {
        let x = [0.0, 0.5, 1.0];
        let y = [0.0, 0.25, 1.0];
        let errors = interval_errors(&x, &y).unwrap();
        // f'' = 2 everywhere, h = 0.5
        close(errors[0], 0.125 * 2.0 / 12.0, 1e-12);
        close(errors[1], 0.125 * 2.0 / 12.0, 1e-12);
        assert_eq!(interval_errors(&[0.0, 1.0], &[0.0, 1.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn refinement_factors_scale_with_square_root() {
        assert_eq!(refinement_factors(&[0.5, 1.0, 4.0, 4.1], 1.0), vec![1, 1, 2, 3]);
        assert_eq!(refinement_factors(&[10.0], 0.0), vec![1]);
        assert_eq!(refinement_factors(&[1.0], 1e-300), vec![MAX_REFINED_POINTS]);
    }

    #[test]
    fn grid_refinement_inserts_equal_pieces() {
        let refined = refine_grid(&[0.0, 0.5, 1.0], &[1, 4]).unwrap();
        assert_eq!(refined, vec![0.0, 0.5, 0.625, 0.75, 0.875, 1.0]);
        assert_eq!(refine_grid(&[0.2], &[]).unwrap(), vec![0.2]);
    }

    #[test]
    fn oversized_refinement_is_rejected_without_overflow() {
        let factors = [usize::MAX, usize::MAX];
        assert_eq!(
            refine_grid(&[0.0, 0.5, 1.0], &factors),
            Err(NumericsError::GridTooLarge { limit: MAX_REFINED_POINTS })
        );
        let factors = refinement_factors(&[1.0, 1.0], 1e-300);
        assert!(matches!(
            refine_grid(&[0.0, 0.5, 1.0], &factors),
            Err(NumericsError::GridTooLarge { .. })
        ));
    }
}
