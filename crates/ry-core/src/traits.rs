//! Core traits
//!
//! The fitting code only sees models through [`LogDensityModel`], so the
//! minimiser does not depend on how a particular likelihood is assembled.

use crate::Result;

/// A model exposing a negative log-likelihood over a bounded parameter vector.
pub trait LogDensityModel: Send + Sync {
    /// Number of parameters
    fn dim(&self) -> usize;

    /// Parameter bounds (min, max)
    fn parameter_bounds(&self) -> Vec<(f64, f64)>;

    /// Suggested starting point
    fn parameter_init(&self) -> Vec<f64>;

    /// Parameters held constant during minimisation
    fn parameter_fixed(&self) -> Vec<bool> {
        vec![false; self.dim()]
    }

    /// Negative log-likelihood at `params`
    fn nll(&self, params: &[f64]) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parabola;

    impl LogDensityModel for Parabola {
        fn dim(&self) -> usize {
            2
        }
        fn parameter_bounds(&self) -> Vec<(f64, f64)> {
            vec![(-10.0, 10.0); 2]
        }
        fn parameter_init(&self) -> Vec<f64> {
            vec![0.0; 2]
        }
        fn nll(&self, p: &[f64]) -> Result<f64> {
            Ok((p[0] - 1.0).powi(2) + 3.0 * p[1] * p[1])
        }
    }

    #[test]
    fn test_nothing_fixed_by_default() {
        assert_eq!(Parabola.parameter_fixed(), vec![false, false]);
        assert_eq!(Parabola.nll(&Parabola.parameter_init()).unwrap(), 1.0);
    }
}
