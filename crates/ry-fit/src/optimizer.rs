//! Bounded L-BFGS minimisation on top of argmin.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ry_core::{Error, Result};

/// Configuration for the L-BFGS optimizer
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of iterations
    pub max_iter: u64,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Number of corrections kept for the inverse Hessian approximation
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iter: 1000, tol: 1e-3, m: 10 }
    }
}

/// Result of a minimisation
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best parameters found
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`
    pub fval: f64,
    /// Number of iterations
    pub n_iter: u64,
    /// Number of objective evaluations
    pub n_fev: usize,
    /// Convergence status
    pub converged: bool,
    /// Termination message
    pub message: String,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OptimizationResult(fval={:.6}, n_iter={}, n_fev={}, converged={})",
            self.fval, self.n_iter, self.n_fev, self.converged
        )
    }
}

/// Objective function for the optimizer
pub trait ObjectiveFunction: Send + Sync {
    /// Evaluate at `params`
    fn eval(&self, params: &[f64]) -> Result<f64>;

    /// Gradient at `params` (central differences if not overridden)
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        let mut work = params.to_vec();
        let mut grad = vec![0.0; params.len()];
        for i in 0..params.len() {
            let eps = 1e-6 * params[i].abs().max(1.0);
            work[i] = params[i] + eps;
            let f_plus = self.eval(&work)?;
            work[i] = params[i] - eps;
            let f_minus = self.eval(&work)?;
            work[i] = params[i];
            grad[i] = (f_plus - f_minus) / (2.0 * eps);
        }
        Ok(grad)
    }
}

fn clamp_params(params: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    params.iter().zip(bounds).map(|(&v, &(lo, hi))| v.clamp(lo, hi)).collect()
}

/// Adapter exposing an [`ObjectiveFunction`] with box bounds to argmin.
struct BoundedProblem<'a> {
    objective: &'a dyn ObjectiveFunction,
    bounds: &'a [(f64, f64)],
    n_fev: Arc<AtomicUsize>,
}

impl CostFunction for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        self.n_fev.fetch_add(1, Ordering::Relaxed);
        let clamped = clamp_params(params, self.bounds);
        self.objective.eval(&clamped).map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl Gradient for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        let clamped = clamp_params(params, self.bounds);
        let mut g = self
            .objective
            .gradient(&clamped)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))?;

        // Projected gradient: drop components pushing further out of the box.
        const EPS: f64 = 1e-12;
        for ((gi, &x), &(lo, hi)) in g.iter_mut().zip(&clamped).zip(self.bounds) {
            if (x <= lo + EPS && *gi > 0.0) || (x >= hi - EPS && *gi < 0.0) {
                *gi = 0.0;
            }
        }
        Ok(g)
    }
}

/// L-BFGS with box constraints applied by clamping
pub struct LbfgsbOptimizer {
    config: OptimizerConfig,
}

impl LbfgsbOptimizer {
    /// Create an optimizer with the given configuration
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` starting at `init_params` within `bounds`.
    pub fn minimize(
        &self,
        objective: &dyn ObjectiveFunction,
        init_params: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<OptimizationResult> {
        if init_params.len() != bounds.len() {
            return Err(Error::Validation(format!(
                "Parameter and bounds length mismatch: {} != {}",
                init_params.len(),
                bounds.len()
            )));
        }
        let init = clamp_params(init_params, bounds);
        if init.is_empty() {
            let fval = objective.eval(&init)?;
            return Ok(OptimizationResult {
                parameters: init,
                fval,
                n_iter: 0,
                n_fev: 1,
                converged: true,
                message: "no free parameters".to_string(),
            });
        }

        let n_fev = Arc::new(AtomicUsize::new(0));
        let problem = BoundedProblem { objective, bounds, n_fev: n_fev.clone() };
        let tol_cost = if self.config.tol == 0.0 { 0.0 } else { (0.1 * self.config.tol).max(1e-12) };
        let solver = LBFGS::new(MoreThuenteLineSearch::new(), self.config.m)
            .with_tolerance_grad(self.config.tol)
            .and_then(|s| s.with_tolerance_cost(tol_cost))
            .map_err(|e| Error::Validation(format!("Invalid optimizer configuration: {e}")))?;

        let res = Executor::new(problem, solver)
            .configure(|state| state.param(init).max_iters(self.config.max_iter))
            .run()
            .map_err(|e| Error::Computation(format!("Optimization failed: {e}")))?;

        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| Error::Computation("No best parameters found".to_string()))?;
        let termination = state.get_termination_status();
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );

        Ok(OptimizationResult {
            parameters: clamp_params(best, bounds),
            fval: state.get_best_cost(),
            n_iter: state.get_iter(),
            n_fev: n_fev.load(Ordering::Relaxed),
            converged,
            message: termination.to_string(),
        })
    }
}

impl Default for LbfgsbOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // f(x, y) = (x - 2)^2 + 4 (y - 3)^2, minimum at (2, 3)
    struct Bowl;

    impl ObjectiveFunction for Bowl {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            Ok((p[0] - 2.0).powi(2) + 4.0 * (p[1] - 3.0).powi(2))
        }
    }

    #[test]
    fn test_unconstrained_minimum() {
        let opt = LbfgsbOptimizer::new(OptimizerConfig { max_iter: 200, tol: 1e-8, m: 10 });
        let r = opt.minimize(&Bowl, &[0.0, 0.0], &[(-10.0, 10.0), (-10.0, 10.0)]).unwrap();
        assert!(r.converged, "{r}: {}", r.message);
        assert_relative_eq!(r.parameters[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(r.parameters[1], 3.0, epsilon = 1e-4);
        assert!(r.n_fev > 0);
    }

    #[test]
    fn test_minimum_on_bound() {
        let opt = LbfgsbOptimizer::default();
        let r = opt.minimize(&Bowl, &[4.0, 1.5], &[(3.0, 5.0), (1.0, 2.0)]).unwrap();
        assert_relative_eq!(r.parameters[0], 3.0, epsilon = 1e-4);
        assert_relative_eq!(r.parameters[1], 2.0, epsilon = 1e-4);
        assert!(r.converged, "Status: {}", r.message);
    }

    #[test]
    fn test_length_mismatch() {
        let opt = LbfgsbOptimizer::default();
        assert!(opt.minimize(&Bowl, &[0.0], &[(0.0, 1.0), (0.0, 1.0)]).is_err());
    }

    #[test]
    fn test_no_free_parameters() {
        struct Constant;
        impl ObjectiveFunction for Constant {
            fn eval(&self, _p: &[f64]) -> Result<f64> {
                Ok(7.0)
            }
        }
        let r = LbfgsbOptimizer::default().minimize(&Constant, &[], &[]).unwrap();
        assert!(r.converged);
        assert_eq!(r.fval, 7.0);
    }
}
