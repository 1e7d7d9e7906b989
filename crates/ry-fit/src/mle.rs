//! Maximum likelihood estimation with fixed parameters and Hessian errors.
//!
//! Free parameters are minimised in unit-box coordinates
//! `u = (x - lo) / (hi - lo)`, so that parameters with very different
//! natural scales (yields, widths, polynomial coefficients) are comparable
//! for the optimizer. Fixed parameters never enter the optimisation vector.

use nalgebra::DMatrix;
use ry_core::traits::LogDensityModel;
use ry_core::{FitResult, Result};

use crate::optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizerConfig};

/// Maps unit-box coordinates of the free parameters onto the full vector.
struct FreeSubspace<'a, M: LogDensityModel> {
    model: &'a M,
    base: Vec<f64>,
    free: Vec<usize>,
    lo: Vec<f64>,
    span: Vec<f64>,
}

impl<'a, M: LogDensityModel> FreeSubspace<'a, M> {
    fn new(model: &'a M) -> Self {
        let bounds = model.parameter_bounds();
        let fixed = model.parameter_fixed();
        let base: Vec<f64> = model
            .parameter_init()
            .iter()
            .zip(&bounds)
            .zip(&fixed)
            .map(|((&x, &(lo, hi)), &f)| if f { x } else { x.clamp(lo, hi) })
            .collect();
        // degenerate bounds behave as fixed
        let free: Vec<usize> =
            (0..base.len()).filter(|&i| !fixed[i] && bounds[i].1 > bounds[i].0).collect();
        let lo = free.iter().map(|&i| bounds[i].0).collect();
        let span = free.iter().map(|&i| bounds[i].1 - bounds[i].0).collect();
        Self { model, base, free, lo, span }
    }

    fn to_full(&self, u: &[f64]) -> Vec<f64> {
        let mut x = self.base.clone();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = self.lo[k] + u[k] * self.span[k];
        }
        x
    }

    fn to_unit(&self, x: &[f64]) -> Vec<f64> {
        self.free.iter().enumerate().map(|(k, &i)| (x[i] - self.lo[k]) / self.span[k]).collect()
    }
}

impl<M: LogDensityModel> ObjectiveFunction for FreeSubspace<'_, M> {
    fn eval(&self, u: &[f64]) -> Result<f64> {
        self.model.nll(&self.to_full(u))
    }
}

/// Maximum Likelihood Estimator
///
/// Fits statistical models by minimizing negative log-likelihood.
#[derive(Clone, Default)]
pub struct MaximumLikelihoodEstimator {
    config: OptimizerConfig,
}

impl MaximumLikelihoodEstimator {
    /// Create a new MLE with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create MLE with custom optimizer configuration
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Access the optimizer configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Fit any [`LogDensityModel`] by minimizing negative log-likelihood.
    ///
    /// A failing minimisation (line-search error, non-finite likelihood) is
    /// reported as a non-converged result at the starting point rather than
    /// an error. The fit counts as converged only if the optimizer converged
    /// and the covariance of the free parameters is positive definite.
    pub fn fit<M: LogDensityModel>(&self, model: &M) -> Result<FitResult> {
        let space = FreeSubspace::new(model);
        let n = space.base.len();
        let k = space.free.len();

        let init_u = space.to_unit(&space.base);
        let unit_bounds = vec![(0.0, 1.0); k];
        let optimizer = LbfgsbOptimizer::new(self.config.clone());
        let opt = match optimizer.minimize(&space, &init_u, &unit_bounds) {
            Ok(opt) => opt,
            Err(e) => {
                log::warn!("minimisation failed: {e}");
                let nll = model.nll(&space.base).unwrap_or(f64::NAN);
                return Ok(FitResult::new(space.base.clone(), vec![0.0; n], nll, false, 0, 0)
                    .with_message(e.to_string()));
            }
        };

        let parameters = space.to_full(&opt.parameters);
        let mut uncertainties = vec![0.0; n];
        let hessian = match compute_hessian(&space, &opt.parameters) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("Hessian evaluation failed: {e}");
                let fr = FitResult::new(
                    parameters,
                    uncertainties,
                    opt.fval,
                    false,
                    opt.n_iter as usize,
                    opt.n_fev,
                );
                return Ok(fr.with_message(e.to_string()));
            }
        };

        let (covariance_ok, cov_flat) = match invert_hessian(&hessian, k) {
            Some(cov_u) => {
                let mut ok = true;
                let mut full = vec![0.0; n * n];
                for (a, &i) in space.free.iter().enumerate() {
                    for (b, &j) in space.free.iter().enumerate() {
                        full[i * n + j] = cov_u[(a, b)] * space.span[a] * space.span[b];
                    }
                    let var = full[i * n + i];
                    if var.is_finite() && var > 0.0 {
                        uncertainties[i] = var.sqrt();
                    } else {
                        ok = false;
                    }
                }
                if !ok {
                    log::warn!("Invalid covariance diagonal; omitting covariance matrix");
                }
                (ok, ok.then_some(full))
            }
            None => {
                log::warn!("Hessian inversion failed, using diagonal approximation");
                for (a, &i) in space.free.iter().enumerate() {
                    uncertainties[i] = space.span[a] / hessian[(a, a)].abs().max(1e-12).sqrt();
                }
                (false, None)
            }
        };

        let mut fr = FitResult::new(
            parameters,
            uncertainties,
            opt.fval,
            opt.converged && covariance_ok,
            opt.n_iter as usize,
            opt.n_fev,
        )
        .with_message(opt.message);
        if let Some(cov) = cov_flat {
            fr = fr.with_covariance(cov);
        }
        Ok(fr)
    }
}

/// Hessian in unit-box coordinates from forward differences of the gradient.
fn compute_hessian(objective: &dyn ObjectiveFunction, best: &[f64]) -> Result<DMatrix<f64>> {
    let n = best.len();
    let grad_center = objective.gradient(best)?;
    let mut hessian = DMatrix::zeros(n, n);

    for j in 0..n {
        // step back into the box when sitting on the upper bound
        let eps = if best[j] > 0.5 { -1e-4 } else { 1e-4 };
        let mut shifted = best.to_vec();
        shifted[j] += eps;
        let grad_shifted = objective.gradient(&shifted)?;
        for i in 0..n {
            hessian[(i, j)] = (grad_shifted[i] - grad_center[i]) / eps;
        }
    }

    let ht = hessian.transpose();
    Ok((&hessian + &ht) * 0.5)
}

/// Invert the Hessian via damped Cholesky, falling back to LU.
///
/// Returns `None` if no inverse with positive finite variances exists.
fn invert_hessian(hessian: &DMatrix<f64>, n: usize) -> Option<DMatrix<f64>> {
    if n == 0 {
        return Some(DMatrix::zeros(0, 0));
    }
    let identity = DMatrix::identity(n, n);
    let diag_scale = (0..n).map(|i| hessian[(i, i)].abs()).fold(0.0_f64, f64::max).max(1.0);

    let mut h_damped = hessian.clone();
    let mut damping = 0.0_f64;
    let max_attempts = 10;

    for attempt in 0..max_attempts {
        if let Some(chol) = nalgebra::linalg::Cholesky::new(h_damped.clone()) {
            return Some(chol.solve(&identity));
        }
        if attempt + 1 == max_attempts {
            break;
        }
        let next_damping = if damping == 0.0 { diag_scale * 1e-9 } else { damping * 10.0 };
        for i in 0..n {
            h_damped[(i, i)] += next_damping - damping;
        }
        damping = next_damping;
    }

    let cov = h_damped.lu().try_inverse()?;
    (0..n).all(|i| cov[(i, i)].is_finite() && cov[(i, i)] > 0.0).then_some(cov)
}
