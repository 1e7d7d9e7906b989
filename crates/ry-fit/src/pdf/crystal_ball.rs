use crate::model::Parameter;
use crate::pdf::MassShape;
use crate::pdf::gaussian::peak_parameters;

/// Two-sided Crystal Ball: Gaussian core with power-law tails.
///
/// Parameters: `mean, sigma, alphal, nl, alphar, nr`. With `t = (x - mean) / sigma`:
///
/// - `t < -alphal`: `A_l * (B_l - t)^-nl`
/// - `t > alphar`: `A_r * (B_r + t)^-nr`
/// - otherwise `exp(-t^2 / 2)`
///
/// where `A = (n / alpha)^n exp(-alpha^2 / 2)` and `B = n / alpha - alpha`.
/// The tails are evaluated in log space, since `(n / alpha)^n` overflows for
/// large `n`.
#[derive(Debug, Clone)]
pub struct DoubleCrystalBallShape {
    window: (f64, f64),
}

impl DoubleCrystalBallShape {
    /// Double Crystal Ball with defaults centred in `window`.
    pub fn new(window: (f64, f64)) -> Self {
        Self { window }
    }
}

#[inline]
fn tail(u: f64, alpha: f64, n: f64) -> f64 {
    // u >= alpha is the distance into the tail
    let b = n / alpha - alpha;
    let log_a = n * (n / alpha).ln() - 0.5 * alpha * alpha;
    (log_a - n * (b + u).ln()).exp()
}

impl MassShape for DoubleCrystalBallShape {
    fn parameters(&self) -> Vec<Parameter> {
        let [mean, sigma] = peak_parameters(self.window);
        vec![
            mean,
            sigma,
            Parameter::new("alphal", 1.5, (0.1, 10.0)),
            Parameter::new("nl", 5.0, (1.0, 200.0)),
            Parameter::new("alphar", 1.5, (0.1, 10.0)),
            Parameter::new("nr", 5.0, (1.0, 200.0)),
        ]
    }

    fn density(&self, x: f64, params: &[f64]) -> f64 {
        let (mean, sigma) = (params[0], params[1]);
        let (alphal, nl, alphar, nr) = (params[2], params[3], params[4], params[5]);
        let t = (x - mean) / sigma;
        if t < -alphal {
            tail(-t, alphal, nl)
        } else if t > alphar {
            tail(t, alphar, nr)
        } else {
            (-0.5 * t * t).exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const P: [f64; 6] = [0.1455, 0.0005, 1.5, 50.0, 1.2, 3.0];

    #[test]
    fn continuous_at_junctions() {
        let s = DoubleCrystalBallShape::new((0.14, 0.16));
        let (mean, sigma) = (P[0], P[1]);
        let eps = 1e-12;
        let left = mean - P[2] * sigma;
        assert_relative_eq!(s.density(left - eps, &P), s.density(left + eps, &P), epsilon = 1e-6);
        let right = mean + P[4] * sigma;
        assert_relative_eq!(
            s.density(right - eps, &P),
            s.density(right + eps, &P),
            epsilon = 1e-6
        );
    }

    #[test]
    fn tails_decay_and_stay_finite() {
        let s = DoubleCrystalBallShape::new((0.14, 0.16));
        let far_left = s.density(0.1400, &P);
        let far_right = s.density(0.1600, &P);
        assert!(far_left.is_finite() && far_left >= 0.0);
        assert!(far_right > far_left, "nr=3 tail is heavier than nl=50");
        assert!(s.density(0.1460, &P) < s.density(0.1456, &P));
    }
}
