use crate::model::Parameter;
use crate::pdf::MassShape;

/// Gaussian peak `exp(-((x - mean) / sigma)^2 / 2)`.
#[derive(Debug, Clone)]
pub struct GaussianShape {
    window: (f64, f64),
}

impl GaussianShape {
    /// Gaussian with defaults centred in `window`.
    pub fn new(window: (f64, f64)) -> Self {
        Self { window }
    }
}

/// Mean and width defaults shared by the peaking shapes.
pub(crate) fn peak_parameters(window: (f64, f64)) -> [Parameter; 2] {
    let (lo, hi) = window;
    let w = hi - lo;
    [
        Parameter::new("mean", 0.5 * (lo + hi), (lo, hi)),
        Parameter::new("sigma", w / 30.0, (w * 1e-4, 0.5 * w)),
    ]
}

impl MassShape for GaussianShape {
    fn parameters(&self) -> Vec<Parameter> {
        peak_parameters(self.window).to_vec()
    }

    fn density(&self, x: f64, params: &[f64]) -> f64 {
        let t = (x - params[0]) / params[1];
        (-0.5 * t * t).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn peak_and_width() {
        let g = GaussianShape::new((1.7, 2.0));
        assert_relative_eq!(g.density(1.87, &[1.87, 0.01]), 1.0);
        assert_relative_eq!(g.density(1.88, &[1.87, 0.01]), (-0.5f64).exp(), epsilon = 1e-12);
    }
}
