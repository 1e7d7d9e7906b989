//! High-level mass fitter: configure, fit, query.

use ry_core::traits::LogDensityModel;
use ry_core::{Error, Estimate, FitResult, Result};
use ry_hist::Histogram;

use crate::data::BinnedMassData;
use crate::mle::MaximumLikelihoodEstimator;
use crate::model::{BACKGROUND_YIELD, MassModel, Parameter, SIGNAL_YIELD};
use crate::optimizer::OptimizerConfig;
use crate::pdf::{BackgroundFunc, MassShape, SignalFunc};

/// What to fit: shapes, window and the kinematic threshold for
/// threshold-type backgrounds.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSetup {
    /// Label used in logs and output names.
    pub name: String,
    /// Signal shape.
    pub signal: SignalFunc,
    /// Background shape.
    pub background: BackgroundFunc,
    /// Fit window `(lo, hi)`.
    pub window: (f64, f64),
    /// Threshold of `expopow`/`expopowext` backgrounds.
    pub threshold: f64,
}

impl FitSetup {
    /// Setup with a zero threshold.
    pub fn new(name: &str, signal: SignalFunc, background: BackgroundFunc, window: (f64, f64)) -> Self {
        Self { name: name.to_string(), signal, background, window, threshold: 0.0 }
    }

    /// Same setup with `threshold` for threshold-type backgrounds.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Configures and runs a signal + background fit of one mass histogram.
#[derive(Debug)]
pub struct MassFitter {
    setup: FitSetup,
    data: BinnedMassData,
    signal: Box<dyn MassShape>,
    signal_params: Vec<Parameter>,
    background: Box<dyn MassShape>,
    background_params: Vec<Parameter>,
    signal_fraction: f64,
    config: OptimizerConfig,
}

impl MassFitter {
    /// Prepare a fit of `histogram` restricted to `setup.window`.
    pub fn new(histogram: &Histogram, setup: FitSetup) -> Result<Self> {
        let data = BinnedMassData::from_histogram(histogram, setup.window)?;
        if !(data.total() > 0.0) {
            return Err(Error::Validation(format!(
                "'{}': no entries inside fit window {:?}",
                setup.name, setup.window
            )));
        }
        let signal = setup.signal.build(setup.window);
        let background = setup.background.build(setup.window, setup.threshold);
        Ok(Self {
            signal_params: signal.parameters(),
            background_params: background.parameters(),
            signal,
            background,
            data,
            setup,
            signal_fraction: 0.1,
            config: OptimizerConfig::default(),
        })
    }

    /// Use `config` for the minimisation.
    pub fn with_optimizer(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the peak at `mass`, bounded to `mass * (1 -/+ rel_range)`.
    pub fn set_particle_mass(&mut self, mass: f64, rel_range: f64) -> Result<()> {
        let bounds = (mass * (1.0 - rel_range), mass * (1.0 + rel_range));
        self.set_signal_initpar("mean", mass, Some((bounds.0.min(bounds.1), bounds.0.max(bounds.1))))
    }

    /// Set starting value (and optionally bounds) of a signal parameter.
    pub fn set_signal_initpar(&mut self, name: &str, value: f64, bounds: Option<(f64, f64)>) -> Result<()> {
        let label = self.setup.signal.to_string();
        set_initpar(&mut self.signal_params, &label, name, value, bounds)
    }

    /// Hold a signal parameter fixed at `value`.
    pub fn fix_signal_par(&mut self, name: &str, value: f64) -> Result<()> {
        let label = self.setup.signal.to_string();
        let p = find_mut(&mut self.signal_params, &label, name)?;
        p.init = value;
        p.fixed = true;
        Ok(())
    }

    /// Set starting value (and optionally bounds) of a background parameter.
    pub fn set_background_initpar(
        &mut self,
        name: &str,
        value: f64,
        bounds: Option<(f64, f64)>,
    ) -> Result<()> {
        let label = self.setup.background.to_string();
        set_initpar(&mut self.background_params, &label, name, value, bounds)
    }

    /// Initial signal share of the window content, in `(0, 1)`.
    pub fn set_signal_fraction(&mut self, fraction: f64) -> Result<()> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::Validation(format!("signal fraction {fraction} not in (0, 1)")));
        }
        self.signal_fraction = fraction;
        Ok(())
    }

    /// Names of the signal parameters.
    pub fn signal_parameter_names(&self) -> Vec<&str> {
        self.signal_params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Names of the background parameters.
    pub fn background_parameter_names(&self) -> Vec<&str> {
        self.background_params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Minimise and return the fitted state.
    pub fn fit(self) -> Result<MassFit> {
        let total = self.data.total();
        let yield_bounds = (0.0, 2.0 * total + 100.0);
        let yields = [
            Parameter::new("n_sig", self.signal_fraction * total, yield_bounds),
            Parameter::new("n_bkg", (1.0 - self.signal_fraction) * total, yield_bounds),
        ];
        let model = MassModel::new(
            self.data,
            self.signal,
            self.signal_params,
            self.background,
            self.background_params,
            yields,
        )?;
        let result = MaximumLikelihoodEstimator::with_config(self.config).fit(&model)?;
        log::debug!(
            "{}: nll={:.4} converged={} iterations={} ({})",
            self.setup.name,
            result.nll,
            result.converged,
            result.n_iter,
            result.message
        );
        Ok(MassFit { setup: self.setup, model, result })
    }
}

fn find_mut<'a>(params: &'a mut [Parameter], label: &str, name: &str) -> Result<&'a mut Parameter> {
    params
        .iter_mut()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::Validation(format!("'{label}' has no parameter '{name}'")))
}

fn set_initpar(
    params: &mut [Parameter],
    label: &str,
    name: &str,
    value: f64,
    bounds: Option<(f64, f64)>,
) -> Result<()> {
    let p = find_mut(params, label, name)?;
    if let Some((lo, hi)) = bounds {
        if !(lo <= hi) {
            return Err(Error::Validation(format!("'{name}': invalid bounds ({lo}, {hi})")));
        }
        p.bounds = (lo, hi);
    }
    let (lo, hi) = p.bounds;
    if !p.fixed && !(lo <= value && value <= hi) {
        return Err(Error::Validation(format!(
            "'{name}': initial value {value} outside bounds ({lo}, {hi})"
        )));
    }
    p.init = value;
    Ok(())
}

/// Model curves sampled for plotting, in counts per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct FitCurves {
    /// Sample positions.
    pub x: Vec<f64>,
    /// Signal + background.
    pub total: Vec<f64>,
    /// Signal only.
    pub signal: Vec<f64>,
    /// Background only.
    pub background: Vec<f64>,
}

/// A finished fit.
#[derive(Debug)]
pub struct MassFit {
    setup: FitSetup,
    model: MassModel,
    result: FitResult,
}

impl MassFit {
    /// Whether the minimisation converged with a valid covariance.
    pub fn converged(&self) -> bool {
        self.result.converged
    }

    /// Raw optimizer output.
    pub fn result(&self) -> &FitResult {
        &self.result
    }

    /// The setup this fit ran with.
    pub fn setup(&self) -> &FitSetup {
        &self.setup
    }

    /// Data inside the fit window.
    pub fn data(&self) -> &BinnedMassData {
        self.model.data()
    }

    /// Fitted signal yield.
    pub fn raw_yield(&self) -> Estimate {
        self.estimate(SIGNAL_YIELD)
    }

    /// Fitted background yield in the window.
    pub fn background_yield(&self) -> Estimate {
        self.estimate(BACKGROUND_YIELD)
    }

    /// Any fitted parameter by name.
    pub fn parameter(&self, name: &str) -> Result<Estimate> {
        let i = self.model.index_of(name).ok_or_else(|| {
            Error::NotFound(format!("parameter '{name}' in fit '{}'", self.setup.name))
        })?;
        Ok(self.estimate(i))
    }

    /// A fitted signal-shape parameter by name.
    pub fn signal_parameter(&self, name: &str) -> Result<Estimate> {
        match self.model.index_of(name) {
            Some(i) if self.model.is_signal_parameter(i) => Ok(self.estimate(i)),
            _ => Err(Error::NotFound(format!(
                "signal parameter '{name}' of '{}' in fit '{}'",
                self.setup.signal, self.setup.name
            ))),
        }
    }

    /// Fitted peak position.
    pub fn mass(&self) -> Result<Estimate> {
        self.signal_parameter("mean")
    }

    /// Fitted peak width.
    pub fn sigma(&self) -> Result<Estimate> {
        self.signal_parameter("sigma")
    }

    fn estimate(&self, i: usize) -> Estimate {
        Estimate::new(self.result.parameters[i], self.result.uncertainties[i])
    }

    fn counting_bins(&self, lo: f64, hi: f64) -> Result<Vec<usize>> {
        let bins = self.data().bins_in(lo, hi);
        if bins.is_empty() {
            return Err(Error::Validation(format!(
                "no bins of fit '{}' inside counting window [{lo}, {hi}]",
                self.setup.name
            )));
        }
        Ok(bins)
    }

    /// Fitted background in the bins with centres in `[lo, hi]`.
    ///
    /// The uncertainty is propagated through the fit covariance; without a
    /// covariance the relative background-yield error is used.
    pub fn background_in(&self, lo: f64, hi: f64) -> Result<Estimate> {
        let bins = self.counting_bins(lo, hi)?;
        let p = &self.result.parameters;
        let value = self.model.background_sum(p, &bins)?;

        let Some(cov) = self.result.covariance.as_ref() else {
            let nb = self.background_yield();
            let rel = if nb.value > 0.0 { nb.error / nb.value } else { 0.0 };
            return Ok(Estimate::new(value, value * rel));
        };

        let n = p.len();
        let mut grad = vec![0.0; n];
        let bounds = self.model.parameter_bounds();
        for i in 0..n {
            let sigma = self.result.uncertainties[i];
            if sigma <= 0.0 {
                continue;
            }
            let h = 1e-3 * sigma;
            let (lo_b, hi_b) = bounds[i];
            let mut up = p.clone();
            up[i] = (p[i] + h).min(hi_b);
            let mut down = p.clone();
            down[i] = (p[i] - h).max(lo_b);
            let step = up[i] - down[i];
            if step <= 0.0 {
                continue;
            }
            grad[i] = (self.model.background_sum(&up, &bins)?
                - self.model.background_sum(&down, &bins)?)
                / step;
        }
        let mut var = 0.0;
        for i in 0..n {
            for j in 0..n {
                var += grad[i] * cov[i * n + j] * grad[j];
            }
        }
        Ok(Estimate::new(value, var.max(0.0).sqrt()))
    }

    /// Yield by bin counting: data minus fitted background over the bins with
    /// centres in `[lo, hi]`.
    pub fn raw_yield_bincounting(&self, lo: f64, hi: f64) -> Result<Estimate> {
        let bins = self.counting_bins(lo, hi)?;
        let data = self.data();
        let counts: f64 = bins.iter().map(|&i| data.counts()[i]).sum();
        let sumw2: f64 = bins.iter().map(|&i| data.sumw2()[i]).sum();
        let bkg = self.background_in(lo, hi)?;
        Ok(Estimate::new(counts - bkg.value, (sumw2 + bkg.error * bkg.error).sqrt()))
    }

    /// Pearson chi2 per degree of freedom over non-empty bins.
    pub fn chi2_ndf(&self) -> Result<f64> {
        let expected = self.model.expected(&self.result.parameters)?;
        let data = self.data();
        let mut chi2 = 0.0;
        let mut n_used = 0usize;
        for ((&n, &w2), &nu) in data.counts().iter().zip(data.sumw2()).zip(&expected) {
            if n > 0.0 {
                chi2 += (n - nu).powi(2) / if w2 > 0.0 { w2 } else { n };
                n_used += 1;
            }
        }
        let n_free = self.result.uncertainties.iter().filter(|&&s| s > 0.0).count();
        let ndf = n_used as f64 - n_free as f64;
        Ok(if ndf > 0.0 { chi2 / ndf } else { f64::NAN })
    }

    /// Model curves on `n_points` equally spaced positions across the window.
    pub fn curves(&self, n_points: usize) -> Result<FitCurves> {
        let (a, b) = self.data().range();
        let n = n_points.max(2);
        let x: Vec<f64> = (0..n).map(|i| a + (b - a) * i as f64 / (n - 1) as f64).collect();
        let (sig, bkg) = self.model.densities(&self.result.parameters, &x)?;
        let width = self.data().mean_bin_width();
        let signal: Vec<f64> = sig.iter().map(|v| v * width).collect();
        let background: Vec<f64> = bkg.iter().map(|v| v * width).collect();
        let total = signal.iter().zip(&background).map(|(s, b)| s + b).collect();
        Ok(FitCurves { x, total, signal, background })
    }

    /// Fitted background content of every window bin.
    pub fn background_bins(&self) -> Result<Vec<f64>> {
        let (_, bkg) = self.model.components(&self.result.parameters)?;
        Ok(bkg)
    }

    /// Data, fitted total and fitted background as histograms named
    /// `hist_data{suffix}`, `hist_model{suffix}` and `hist_bkg{suffix}`.
    pub fn component_histograms(&self, suffix: &str) -> Result<Vec<Histogram>> {
        let data = self.data();
        let (sig, bkg) = self.model.components(&self.result.parameters)?;
        let mut h_data = Histogram::new(&format!("hist_data{suffix}"), "data", data.edges().to_vec())?;
        let mut h_model =
            Histogram::new(&format!("hist_model{suffix}"), "total fit", data.edges().to_vec())?;
        let mut h_bkg =
            Histogram::new(&format!("hist_bkg{suffix}"), "background fit", data.edges().to_vec())?;
        for i in 0..data.n_bins() {
            h_data.set_bin(i, data.counts()[i], data.sumw2()[i].max(0.0).sqrt());
            h_model.set_bin(i, sig[i] + bkg[i], 0.0);
            h_bkg.set_bin(i, bkg[i], 0.0);
        }
        Ok(vec![h_data, h_model, h_bkg])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist() -> Histogram {
        let edges: Vec<f64> = (0..=60).map(|i| 1.7 + 0.005 * i as f64).collect();
        let mut h = Histogram::new("h", "", edges).unwrap();
        for i in 0..60 {
            h.set_bin(i, 100.0, 10.0);
        }
        h
    }

    fn setup() -> FitSetup {
        FitSetup::new("t", SignalFunc::Gaussian, BackgroundFunc::ChebPol(2), (1.72, 2.0))
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut f = MassFitter::new(&hist(), setup()).unwrap();
        assert!(f.set_signal_initpar("alphal", 1.5, None).is_err());
        assert!(f.set_background_initpar("lam", -1.0, None).is_err());
        assert!(f.fix_signal_par("nr", 3.0).is_err());
        assert!(f.set_signal_initpar("sigma", 0.01, Some((0.001, 0.04))).is_ok());
    }

    #[test]
    fn init_outside_bounds_is_rejected() {
        let mut f = MassFitter::new(&hist(), setup()).unwrap();
        assert!(f.set_signal_initpar("sigma", 1.0, Some((0.001, 0.04))).is_err());
        assert!(f.set_signal_initpar("sigma", 0.01, Some((0.04, 0.001))).is_err());
        assert!(f.set_signal_fraction(1.5).is_err());
        assert!(f.set_particle_mass(1.87, 0.05).is_ok());
        // fixed coefficient may be set anywhere
        assert!(f.set_background_initpar("c0", 0.4, None).is_ok());
    }

    #[test]
    fn empty_window_fails_to_prepare() {
        let h = Histogram::new("h", "", vec![1.7, 1.8, 1.9, 2.0]).unwrap();
        assert!(MassFitter::new(&h, setup()).is_err());
    }
}
