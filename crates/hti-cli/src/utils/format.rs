//! printf-style number formatting for the result report.

fn non_finite(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("nan")
    } else if value == f64::INFINITY {
        Some("inf")
    } else if value == f64::NEG_INFINITY {
        Some("-inf")
    } else {
        None
    }
}

/// `%{width}.{precision}f`
pub fn fixed(value: f64, width: usize, precision: usize) -> String {
    match non_finite(value) {
        Some(s) => format!("{:>width$}", s),
        None => format!("{:>width$.precision$}", value),
    }
}

/// `%{width}.{precision}e`, with a signed exponent of at least two digits (`1.234e-03`).
pub fn scientific(value: f64, width: usize, precision: usize) -> String {
    let body = match non_finite(value) {
        Some(s) => s.to_string(),
        None => {
            let rust = format!("{:.precision$e}", value);
            match rust.split_once('e') {
                Some((mantissa, exp)) => {
                    let exp: i32 = exp.parse().unwrap_or(0);
                    let sign = if exp < 0 { '-' } else { '+' };
                    format!("{}e{}{:02}", mantissa, sign, exp.abs())
                }
                None => rust,
            }
        }
    };
    format!("{:>width$}", body)
}

/// A value with its statistical and integration errors: `%20.12f  %10.3e  %10.3e`.
pub fn value_with_errors(value: f64, stat_err: f64, inte_err: f64) -> String {
    format!(
        "{}  {}  {}",
        fixed(value, 20, 12),
        scientific(stat_err, 10, 3),
        scientific(inte_err, 10, 3)
    )
}
