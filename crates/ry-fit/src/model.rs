//! Extended binned likelihood for a signal + background mass spectrum.

use ry_core::traits::LogDensityModel;
use ry_core::{Error, Result};

use crate::data::BinnedMassData;
use crate::pdf::MassShape;

/// Fit parameter with starting value and box bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Stable parameter name.
    pub name: String,
    /// Suggested initial value.
    pub init: f64,
    /// Bounds `(low, high)` (LBFGS-B box constraints).
    pub bounds: (f64, f64),
    /// Held at `init` during minimisation.
    pub fixed: bool,
}

impl Parameter {
    /// Free parameter.
    pub fn new(name: &str, init: f64, bounds: (f64, f64)) -> Self {
        Self { name: name.to_string(), init, bounds, fixed: false }
    }

    /// Same parameter, held fixed at its initial value.
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// Simpson sub-intervals per bin (even).
const SUBINTERVALS: usize = 8;

/// Smallest expected count used in the likelihood.
const MIN_EXPECTED: f64 = 1e-12;

/// Index of the signal yield in the parameter vector.
pub const SIGNAL_YIELD: usize = 0;
/// Index of the background yield in the parameter vector.
pub const BACKGROUND_YIELD: usize = 1;

/// Extended binned Poisson model `nu_i = n_sig * P_s,i + n_bkg * P_b,i`.
///
/// Parameter layout: `[n_sig, n_bkg, signal shape..., background shape...]`.
/// Bin probabilities are Simpson integrals of each shape over the bin,
/// normalised to the sum over all window bins.
#[derive(Debug)]
pub struct MassModel {
    data: BinnedMassData,
    signal: Box<dyn MassShape>,
    background: Box<dyn MassShape>,
    parameters: Vec<Parameter>,
    n_signal: usize,
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl MassModel {
    /// Assemble the model. `signal_params` and `background_params` must match
    /// the shapes' parameter counts.
    pub fn new(
        data: BinnedMassData,
        signal: Box<dyn MassShape>,
        signal_params: Vec<Parameter>,
        background: Box<dyn MassShape>,
        background_params: Vec<Parameter>,
        yields: [Parameter; 2],
    ) -> Result<Self> {
        let expected_sig = signal.parameters().len();
        let expected_bkg = background.parameters().len();
        if signal_params.len() != expected_sig || background_params.len() != expected_bkg {
            return Err(Error::Validation(format!(
                "parameter count mismatch: signal {} (expected {expected_sig}), \
                 background {} (expected {expected_bkg})",
                signal_params.len(),
                background_params.len()
            )));
        }
        for p in yields.iter().chain(&signal_params).chain(&background_params) {
            let (lo, hi) = p.bounds;
            if !(lo <= hi) || !p.init.is_finite() {
                return Err(Error::Validation(format!(
                    "parameter '{}': invalid init {} or bounds ({lo}, {hi})",
                    p.name, p.init
                )));
            }
        }

        let n_signal = signal_params.len();
        let mut parameters: Vec<Parameter> = yields.into_iter().collect();
        parameters.extend(signal_params);
        parameters.extend(background_params);

        let (nodes, weights) = simpson_grid(data.edges());
        Ok(Self { data, signal, background, parameters, n_signal, nodes, weights })
    }

    /// Fitted data.
    pub fn data(&self) -> &BinnedMassData {
        &self.data
    }

    /// Model parameters in vector order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Position of parameter `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Whether parameter `i` belongs to the signal shape.
    pub fn is_signal_parameter(&self, i: usize) -> bool {
        (2..2 + self.n_signal).contains(&i)
    }

    fn signal_slice<'a>(&self, params: &'a [f64]) -> &'a [f64] {
        &params[2..2 + self.n_signal]
    }

    fn background_slice<'a>(&self, params: &'a [f64]) -> &'a [f64] {
        &params[2 + self.n_signal..]
    }

    /// Normalised per-bin probabilities of `shape` and its integral over the window.
    fn bin_probabilities(&self, shape: &dyn MassShape, params: &[f64]) -> Result<(Vec<f64>, f64)> {
        let per_bin = SUBINTERVALS + 1;
        let integrals: Vec<f64> = self
            .nodes
            .chunks(per_bin)
            .zip(self.weights.chunks(per_bin))
            .map(|(xs, ws)| xs.iter().zip(ws).map(|(&x, &w)| w * shape.density(x, params)).sum())
            .collect();
        let norm: f64 = integrals.iter().sum();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(Error::Computation(format!(
                "shape integral over fit window is {norm} for parameters {params:?}"
            )));
        }
        Ok((integrals.into_iter().map(|v| v / norm).collect(), norm))
    }

    /// Expected signal and background counts per bin.
    pub fn components(&self, params: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let (ps, _) = self.bin_probabilities(self.signal.as_ref(), self.signal_slice(params))?;
        let (pb, _) =
            self.bin_probabilities(self.background.as_ref(), self.background_slice(params))?;
        let (ns, nb) = (params[SIGNAL_YIELD], params[BACKGROUND_YIELD]);
        Ok((ps.iter().map(|p| ns * p).collect(), pb.iter().map(|p| nb * p).collect()))
    }

    /// Expected total counts per bin.
    pub fn expected(&self, params: &[f64]) -> Result<Vec<f64>> {
        let (s, b) = self.components(params)?;
        Ok(s.iter().zip(&b).map(|(s, b)| s + b).collect())
    }

    /// Fitted background summed over the bins `bins`.
    pub fn background_sum(&self, params: &[f64], bins: &[usize]) -> Result<f64> {
        let (pb, _) =
            self.bin_probabilities(self.background.as_ref(), self.background_slice(params))?;
        Ok(params[BACKGROUND_YIELD] * bins.iter().map(|&i| pb[i]).sum::<f64>())
    }

    /// Signal and background densities at `x`, in counts per unit of `x`.
    pub fn densities(&self, params: &[f64], xs: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let sig = self.signal_slice(params);
        let bkg = self.background_slice(params);
        let (_, norm_s) = self.bin_probabilities(self.signal.as_ref(), sig)?;
        let (_, norm_b) = self.bin_probabilities(self.background.as_ref(), bkg)?;
        let ns = params[SIGNAL_YIELD] / norm_s;
        let nb = params[BACKGROUND_YIELD] / norm_b;
        Ok((
            xs.iter().map(|&x| ns * self.signal.density(x, sig)).collect(),
            xs.iter().map(|&x| nb * self.background.density(x, bkg)).collect(),
        ))
    }
}

/// Composite Simpson nodes and weights, `SUBINTERVALS + 1` per bin.
fn simpson_grid(edges: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let per_bin = SUBINTERVALS + 1;
    let n_bins = edges.len() - 1;
    let mut nodes = Vec::with_capacity(n_bins * per_bin);
    let mut weights = Vec::with_capacity(n_bins * per_bin);
    for w in edges.windows(2) {
        let h = (w[1] - w[0]) / SUBINTERVALS as f64;
        for k in 0..=SUBINTERVALS {
            nodes.push(w[0] + k as f64 * h);
            let c = if k == 0 || k == SUBINTERVALS {
                1.0
            } else if k % 2 == 1 {
                4.0
            } else {
                2.0
            };
            weights.push(c * h / 3.0);
        }
    }
    (nodes, weights)
}

impl LogDensityModel for MassModel {
    fn dim(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(|p| p.bounds).collect()
    }

    fn parameter_init(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.init).collect()
    }

    fn parameter_fixed(&self) -> Vec<bool> {
        self.parameters.iter().map(|p| p.fixed).collect()
    }

    /// Poisson deviance `sum(nu - n + n ln(n / nu))`, which differs from the
    /// extended NLL by a data-only constant.
    fn nll(&self, params: &[f64]) -> Result<f64> {
        let expected = self.expected(params)?;
        let nll = self
            .data
            .counts()
            .iter()
            .zip(&expected)
            .map(|(&n, &nu)| {
                let nu = nu.max(MIN_EXPECTED);
                if n > 0.0 { nu - n + n * (n / nu).ln() } else { nu }
            })
            .sum::<f64>();
        if !nll.is_finite() {
            return Err(Error::Computation(format!("non-finite NLL at {params:?}")));
        }
        Ok(nll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{BackgroundFunc, SignalFunc};
    use approx::assert_relative_eq;
    use ry_hist::Histogram;

    fn flat_data(n_bins: usize, count: f64) -> BinnedMassData {
        let edges: Vec<f64> = (0..=n_bins).map(|i| 1.0 + i as f64 / n_bins as f64).collect();
        let mut h = Histogram::new("h", "", edges).unwrap();
        for i in 0..n_bins {
            h.set_bin(i, count, count.sqrt());
        }
        BinnedMassData::from_histogram(&h, (1.0, 2.0)).unwrap()
    }

    fn model(data: BinnedMassData) -> MassModel {
        let window = (1.0, 2.0);
        let sig = SignalFunc::Gaussian.build(window);
        let bkg = BackgroundFunc::ChebPol(1).build(window, 0.0);
        let sp = sig.parameters();
        let bp = bkg.parameters();
        let yields = [
            Parameter::new("n_sig", 100.0, (0.0, 1e4)),
            Parameter::new("n_bkg", 900.0, (0.0, 1e4)),
        ];
        MassModel::new(data, sig, sp, bkg, bp, yields).unwrap()
    }

    #[test]
    fn expected_counts_sum_to_yields() {
        let m = model(flat_data(20, 50.0));
        let p = vec![100.0, 900.0, 1.5, 0.05, 1.0, 0.3];
        let nu = m.expected(&p).unwrap();
        assert_relative_eq!(nu.iter().sum::<f64>(), 1000.0, epsilon = 1e-9);
        let (s, _) = m.components(&p).unwrap();
        let peak = s.iter().cloned().fold(0.0, f64::max);
        assert!(s[9] == peak || s[10] == peak);
    }

    #[test]
    fn simpson_integrates_cubic_exactly() {
        let (nodes, weights) = simpson_grid(&[0.0, 0.5, 2.0]);
        let integral: f64 = nodes.iter().zip(&weights).map(|(x, w)| w * x.powi(3)).sum();
        assert_relative_eq!(integral, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn deviance_is_zero_when_model_matches_data() {
        let m = model(flat_data(10, 100.0));
        // flat background, no signal
        let p = vec![0.0, 1000.0, 1.5, 0.05, 1.0, 0.0];
        assert_relative_eq!(m.nll(&p).unwrap(), 0.0, epsilon = 1e-9);
        let worse = vec![0.0, 1100.0, 1.5, 0.05, 1.0, 0.0];
        assert!(m.nll(&worse).unwrap() > 1.0);
    }

    #[test]
    fn background_sum_over_subset() {
        let m = model(flat_data(10, 100.0));
        let p = vec![0.0, 1000.0, 1.5, 0.05, 1.0, 0.0];
        assert_relative_eq!(m.background_sum(&p, &[0, 1, 2]).unwrap(), 300.0, epsilon = 1e-9);
        let (_, b) = m.densities(&p, &[1.25]).unwrap();
        assert_relative_eq!(b[0], 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn mismatched_parameters_rejected() {
        let window = (1.0, 2.0);
        let sig = SignalFunc::Gaussian.build(window);
        let bkg = BackgroundFunc::Expo.build(window, 0.0);
        let yields =
            [Parameter::new("n_sig", 1.0, (0.0, 2.0)), Parameter::new("n_bkg", 1.0, (0.0, 2.0))];
        let err = MassModel::new(flat_data(5, 1.0), sig, vec![], bkg, vec![], yields);
        assert!(err.is_err());
    }
}
