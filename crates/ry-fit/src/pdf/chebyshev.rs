use crate::model::Parameter;
use crate::pdf::MassShape;

/// Chebyshev series `sum_k c_k T_k(x')` on the fit window.
///
/// `x'` maps the window `[a, b]` to `[-1, 1]`. `c0` only sets the overall
/// scale, which the background yield already carries, so it is held fixed.
/// Negative values are clipped to zero.
#[derive(Debug, Clone)]
pub struct ChebyshevShape {
    order: usize,
    window: (f64, f64),
}

impl ChebyshevShape {
    /// Chebyshev series with coefficients `c0..=c{order}`.
    pub fn new(order: usize, window: (f64, f64)) -> Self {
        Self { order, window }
    }

    #[inline]
    fn xprime(&self, x: f64) -> f64 {
        let (a, b) = self.window;
        ((2.0 * x - (a + b)) / (b - a)).clamp(-1.0, 1.0)
    }
}

impl MassShape for ChebyshevShape {
    fn parameters(&self) -> Vec<Parameter> {
        let mut params = vec![Parameter::new("c0", 1.0, (0.0, 10.0)).fixed()];
        params.extend((1..=self.order).map(|k| Parameter::new(&format!("c{k}"), 0.0, (-10.0, 10.0))));
        params
    }

    fn density(&self, x: f64, params: &[f64]) -> f64 {
        let xp = self.xprime(x);
        // T_{k+1} = 2x T_k - T_{k-1}
        let (mut tkm1, mut tk) = (1.0, xp);
        let mut f = params[0];
        for (k, &c) in params.iter().enumerate().skip(1) {
            if k > 1 {
                let tkp1 = 2.0 * xp * tk - tkm1;
                tkm1 = tk;
                tk = tkp1;
            }
            f += c * tk;
        }
        f.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matches_explicit_polynomials() {
        let s = ChebyshevShape::new(3, (-1.0, 1.0));
        let x: f64 = 0.3;
        let c = [1.0, 0.2, -0.1, 0.05];
        let expected =
            1.0 + 0.2 * x - 0.1 * (2.0 * x * x - 1.0) + 0.05 * (4.0 * x.powi(3) - 3.0 * x);
        assert_relative_eq!(s.density(x, &c), expected, epsilon = 1e-12);
    }

    #[test]
    fn clipped_at_zero_and_c0_fixed() {
        let s = ChebyshevShape::new(1, (0.0, 1.0));
        assert_eq!(s.density(0.0, &[0.1, 1.0]), 0.0);
        let params = s.parameters();
        assert!(params[0].fixed);
        assert!(!params[1].fixed);
    }
}
