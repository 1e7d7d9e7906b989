//! Common result types

use serde::{Deserialize, Serialize};

/// A value with its (symmetric) uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Estimate {
    /// Central value
    pub value: f64,
    /// One standard deviation
    pub error: f64,
}

impl Estimate {
    /// Create a new estimate
    pub fn new(value: f64, error: f64) -> Self {
        Self { value, error }
    }

    /// Number of standard deviations between `self.value` and `truth`.
    pub fn pull(&self, truth: f64) -> f64 {
        if self.error > 0.0 { (self.value - truth) / self.error } else { f64::INFINITY }
    }
}

/// Result of a maximum likelihood fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Best-fit parameter values
    pub parameters: Vec<f64>,

    /// Parameter uncertainties (sqrt of covariance diagonal, 0 for fixed parameters)
    pub uncertainties: Vec<f64>,

    /// Covariance matrix (row-major, N×N). `None` if Hessian inversion failed.
    pub covariance: Option<Vec<f64>>,

    /// Negative log-likelihood at minimum
    pub nll: f64,

    /// Convergence status
    pub converged: bool,

    /// Number of optimizer iterations
    pub n_iter: usize,

    /// Number of function evaluations
    pub n_evaluations: usize,

    /// Optimizer termination message
    pub message: String,
}

impl FitResult {
    /// Create a new fit result
    pub fn new(
        parameters: Vec<f64>,
        uncertainties: Vec<f64>,
        nll: f64,
        converged: bool,
        n_iter: usize,
        n_evaluations: usize,
    ) -> Self {
        Self {
            parameters,
            uncertainties,
            covariance: None,
            nll,
            converged,
            n_iter,
            n_evaluations,
            message: String::new(),
        }
    }

    /// Attach a covariance matrix
    pub fn with_covariance(mut self, covariance: Vec<f64>) -> Self {
        self.covariance = Some(covariance);
        self
    }

    /// Attach the optimizer termination message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Covariance element (i, j). Returns `None` if covariance is unavailable.
    pub fn covariance_at(&self, i: usize, j: usize) -> Option<f64> {
        let cov = self.covariance.as_ref()?;
        let n = self.parameters.len();
        if i >= n || j >= n {
            return None;
        }
        Some(cov[i * n + j])
    }

    /// Get correlation matrix element (i, j). Returns `None` if covariance is unavailable.
    pub fn correlation(&self, i: usize, j: usize) -> Option<f64> {
        let cov_ij = self.covariance_at(i, j)?;
        let sigma_i = self.uncertainties[i];
        let sigma_j = self.uncertainties[j];
        if sigma_i <= 0.0 || sigma_j <= 0.0 {
            return None;
        }
        Some(cov_ij / (sigma_i * sigma_j))
    }

    /// Value and uncertainty of parameter `i`
    pub fn estimate(&self, i: usize) -> Option<Estimate> {
        Some(Estimate::new(*self.parameters.get(i)?, *self.uncertainties.get(i)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_correlation_from_covariance() {
        let fr = FitResult::new(vec![1.0, 2.0], vec![2.0, 3.0], 0.5, true, 10, 20)
            .with_covariance(vec![4.0, 3.0, 3.0, 9.0]);
        assert_relative_eq!(fr.correlation(0, 1).unwrap(), 0.5);
        assert_relative_eq!(fr.correlation(1, 1).unwrap(), 1.0);
        assert!(fr.correlation(2, 0).is_none());
    }

    #[test]
    fn test_correlation_without_covariance() {
        let fr = FitResult::new(vec![1.0], vec![0.1], 0.0, false, 0, 0);
        assert!(fr.correlation(0, 0).is_none());
        assert_eq!(fr.estimate(0), Some(Estimate::new(1.0, 0.1)));
        assert_eq!(fr.estimate(1), None);
    }

    #[test]
    fn test_pull() {
        let e = Estimate::new(110.0, 5.0);
        assert_relative_eq!(e.pull(100.0), 2.0);
        assert!(Estimate::new(1.0, 0.0).pull(0.0).is_infinite());
    }
}
