//! Finite-difference derivatives of a scalar model with respect to its parameters.
//!
//! Models are plain closures `f(t, params)`, so we never have analytic
//! derivatives. Central differences are accurate to `O(h²)`; the step scales
//! with the parameter magnitude so that both `A ≈ 1e3` and `B ≈ 1e-2` get a
//! sensible perturbation.

use nalgebra::DMatrix;

use crate::domain::Sample;

/// Cube root of machine epsilon: the optimal central-difference step for smooth functions.
const STEP_REL: f64 = 6.055_454_452_393_343e-6;

/// Perturbation used for parameter `p`.
pub fn fd_step(p: f64) -> f64 {
    STEP_REL * p.abs().max(1.0)
}

/// Fill the `m × n` Jacobian of the predictions `f(t_i, params)` w.r.t. `params`.
///
/// Rows follow `samples`, columns follow `params`. Entries that evaluate to a
/// non-finite value are left non-finite; callers decide how to react.
pub fn fill_jacobian<F>(model: &F, samples: &[Sample], params: &[f64], out: &mut DMatrix<f64>)
where
    F: Fn(f64, &[f64]) -> f64 + ?Sized,
{
    let mut probe = params.to_vec();
    for j in 0..params.len() {
        let h = fd_step(params[j]);
        for (i, s) in samples.iter().enumerate() {
            probe[j] = params[j] + h;
            let up = model(s.t, &probe);
            probe[j] = params[j] - h;
            let down = model(s.t, &probe);
            out[(i, j)] = (up - down) / (2.0 * h);
        }
        probe[j] = params[j];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_of_exponential_matches_analytic() {
        let model = |t: f64, p: &[f64]| p[0] * (p[1] * t).exp();
        let samples = [Sample::new(0.0, 0.0), Sample::new(1.0, 0.0), Sample::new(5.0, 0.0)];
        let params = [3.0, 0.2];
        let mut jac = DMatrix::zeros(3, 2);
        fill_jacobian(&model, &samples, &params, &mut jac);

        for (i, s) in samples.iter().enumerate() {
            let e = (params[1] * s.t).exp();
            assert!((jac[(i, 0)] - e).abs() < 1e-8);
            assert!((jac[(i, 1)] - params[0] * s.t * e).abs() < 1e-7);
        }
    }

    #[test]
    fn step_scales_with_magnitude() {
        assert_eq!(fd_step(0.0), fd_step(1.0));
        assert!(fd_step(1e4) > fd_step(1.0) * 1e3);
    }
}
