use crate::model::Parameter;
use crate::pdf::MassShape;

/// Exponential `exp(lam * x)`.
///
/// Evaluated as `exp(lam * (x - a))` with `a` the window's lower edge; the
/// offset is a constant factor absorbed by the normalisation.
#[derive(Debug, Clone)]
pub struct ExponentialShape {
    window: (f64, f64),
}

impl ExponentialShape {
    /// Exponential over `window`.
    pub fn new(window: (f64, f64)) -> Self {
        Self { window }
    }
}

impl MassShape for ExponentialShape {
    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("lam", -1.0, (-200.0, 200.0))]
    }

    fn density(&self, x: f64, params: &[f64]) -> f64 {
        (params[0] * (x - self.window.0)).exp()
    }
}

/// Threshold shape `dm^power * exp(poly(dm))` with `dm = x - threshold`.
///
/// The plain variant has `poly = lam * dm`; the extended one
/// `poly = c1 dm + c2 dm^2 + c3 dm^3`. Zero at and below the threshold.
#[derive(Debug, Clone)]
pub struct PowerExponentialShape {
    threshold: f64,
    extended: bool,
}

impl PowerExponentialShape {
    /// Threshold shape starting at `threshold`.
    pub fn new(threshold: f64, extended: bool) -> Self {
        Self { threshold, extended }
    }
}

impl MassShape for PowerExponentialShape {
    fn parameters(&self) -> Vec<Parameter> {
        let power = Parameter::new("power", 0.5, (0.0, 10.0));
        if self.extended {
            vec![
                power,
                Parameter::new("c1", 0.0, (-500.0, 500.0)),
                Parameter::new("c2", 0.0, (-5.0e4, 5.0e4)),
                Parameter::new("c3", 0.0, (-5.0e6, 5.0e6)),
            ]
        } else {
            vec![power, Parameter::new("lam", -10.0, (-1000.0, 100.0))]
        }
    }

    fn density(&self, x: f64, params: &[f64]) -> f64 {
        let dm = x - self.threshold;
        if dm <= 0.0 {
            return 0.0;
        }
        let poly = if self.extended {
            dm * (params[1] + dm * (params[2] + dm * params[3]))
        } else {
            params[1] * dm
        };
        (params[0] * dm.ln() + poly).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponential_ratio() {
        let s = ExponentialShape::new((1.0, 2.0));
        let r = s.density(1.5, &[-2.0]) / s.density(1.0, &[-2.0]);
        assert_relative_eq!(r, (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn threshold_shapes() {
        let th = 0.13957;
        let plain = PowerExponentialShape::new(th, false);
        assert_eq!(plain.density(0.139, &[0.5, -10.0]), 0.0);
        let dm: f64 = 0.01;
        assert_relative_eq!(
            plain.density(th + dm, &[0.5, -10.0]),
            dm.sqrt() * (-0.1f64).exp(),
            epsilon = 1e-12
        );

        let ext = PowerExponentialShape::new(th, true);
        let p = [0.5, -20.0, 500.0, -5000.0];
        let expected = dm.sqrt() * (-20.0 * dm + 500.0 * dm * dm - 5000.0 * dm.powi(3)).exp();
        assert_relative_eq!(ext.density(th + dm, &p), expected, epsilon = 1e-12);
    }
}
