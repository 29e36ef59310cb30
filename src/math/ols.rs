//! Linear least squares solver.
//!
//! Two places in this crate reduce to a small linear regression
//!
//! ```text
//! minimize ‖X β - y‖²
//! ```
//!
//! - each damped Levenberg–Marquardt step (the augmented system `[J; √λ D]`)
//! - the log-linear regressions that seed exponential / power-law fits
//!
//! Implementation choices:
//! - We use SVD so tall systems (more rows than columns) and rank-deficient
//!   Jacobians (e.g. all samples at `t = 0`) still get a minimum-norm answer.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Parameter counts are tiny (2–3 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Ordinary least squares line `y ≈ intercept + slope·x`.
///
/// Returns `(intercept, slope)`, or `None` with fewer than two points.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mut design = DMatrix::<f64>::zeros(n, 2);
    let mut rhs = DVector::<f64>::zeros(n);
    for i in 0..n {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = x[i];
        rhs[i] = y[i];
    }
    let beta = solve_least_squares(&design, &rhs)?;
    Some((beta[0], beta[1]))
}
