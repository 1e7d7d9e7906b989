//! Fits of synthetic mass spectra with known content.

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use ry_fit::{BackgroundFunc, FitSetup, MassFitter, SignalFunc};
use ry_hist::Histogram;

const MEAN: f64 = 1.8697;
const SIGMA: f64 = 0.010;
const N_SIG: f64 = 2000.0;
const BKG_PER_BIN: f64 = 150.0;

/// Expected content per bin: Gaussian peak plus a falling linear background.
fn expected_counts(edges: &[f64]) -> Vec<f64> {
    let gauss = |x: f64| {
        let t = (x - MEAN) / SIGMA;
        (-0.5 * t * t).exp() / (SIGMA * (2.0 * std::f64::consts::PI).sqrt())
    };
    edges
        .windows(2)
        .map(|w| {
            let sub = 50;
            let h = (w[1] - w[0]) / sub as f64;
            let sig: f64 = (0..sub).map(|k| gauss(w[0] + (k as f64 + 0.5) * h) * h).sum();
            let centre = 0.5 * (w[0] + w[1]);
            let bkg = BKG_PER_BIN * (1.0 - 1.5 * (centre - 1.87));
            N_SIG * sig + bkg
        })
        .collect()
}

fn spectrum(sample: Option<u64>) -> Histogram {
    let edges: Vec<f64> = (0..=70).map(|i| 1.70 + 0.005 * i as f64).collect();
    let mut h = Histogram::new("hist_mass", "", edges.clone()).unwrap();
    let mut rng = sample.map(StdRng::seed_from_u64);
    for (i, mu) in expected_counts(&edges).into_iter().enumerate() {
        let n = match rng.as_mut() {
            Some(r) => Poisson::new(mu).unwrap().sample(r),
            None => mu.round(),
        };
        h.set_bin(i, n, n.sqrt());
    }
    h
}

fn dplus_fitter(h: &Histogram, sgn: SignalFunc) -> MassFitter {
    let setup = FitSetup::new("test", sgn, BackgroundFunc::ChebPol(2), (1.72, 2.02));
    let mut f = MassFitter::new(h, setup).unwrap();
    f.set_particle_mass(MEAN, 0.05).unwrap();
    f.set_signal_initpar("sigma", 0.005, Some((0.0001, 0.04))).unwrap();
    f.set_signal_fraction(0.1).unwrap();
    f.set_background_initpar("c0", 0.4, None).unwrap();
    f.set_background_initpar("c1", -0.2, None).unwrap();
    f.set_background_initpar("c2", -0.01, None).unwrap();
    f
}

/// Injected signal in the bins of `h` with centres in `[lo, hi]`.
fn injected_signal(h: &Histogram, lo: f64, hi: f64) -> f64 {
    let total = expected_counts(&h.bin_edges);
    (0..h.n_bins)
        .filter(|&i| (lo..=hi).contains(&h.bin_center(i)))
        .map(|i| {
            let c = h.bin_center(i);
            total[i] - BKG_PER_BIN * (1.0 - 1.5 * (c - 1.87))
        })
        .sum()
}

#[test]
fn asimov_gaussian_recovers_injected_signal() {
    let h = spectrum(None);
    let fit = dplus_fitter(&h, SignalFunc::Gaussian).fit().unwrap();
    assert!(fit.converged(), "{}", fit.result().message);

    let y = fit.raw_yield();
    assert!(y.pull(N_SIG).abs() < 1.0, "yield {y:?}");
    assert!(y.error > 0.0);

    let mean = fit.mass().unwrap();
    assert_relative_eq!(mean.value, MEAN, epsilon = 1e-3);
    let sigma = fit.sigma().unwrap();
    assert_relative_eq!(sigma.value, SIGMA, max_relative = 0.05);

    let chi2 = fit.chi2_ndf().unwrap();
    assert!(chi2 < 0.5, "Asimov data should fit almost exactly, chi2/ndf = {chi2}");
}

#[test]
fn bincounting_subtracts_fitted_background() {
    let h = spectrum(None);
    let fit = dplus_fitter(&h, SignalFunc::Gaussian).fit().unwrap();
    assert!(fit.converged());

    let (lo, hi) = (1.82, 1.92);
    let counted = fit.raw_yield_bincounting(lo, hi).unwrap();
    let truth = injected_signal(&h, lo, hi);
    assert!(counted.pull(truth).abs() < 1.0, "counted {counted:?}, injected {truth}");

    let bkg = fit.background_in(lo, hi).unwrap();
    assert!(bkg.error > 0.0);
    assert!(counted.error > bkg.error);
    assert!(fit.raw_yield_bincounting(2.5, 2.6).is_err());
}

#[test]
fn fixed_parameters_hold_their_values() {
    let h = spectrum(None);
    let mut f = dplus_fitter(&h, SignalFunc::DoubleCb);
    f.fix_signal_par("sigma", 0.0101).unwrap();
    for (name, value) in [("alphal", 1.5), ("nl", 50.0), ("alphar", 1.5), ("nr", 50.0)] {
        f.fix_signal_par(name, value).unwrap();
    }
    let fit = f.fit().unwrap();
    assert!(fit.converged(), "{}", fit.result().message);

    let sigma = fit.sigma().unwrap();
    assert_eq!(sigma.value, 0.0101);
    assert_eq!(sigma.error, 0.0);
    assert_eq!(fit.signal_parameter("nl").unwrap().value, 50.0);
    assert!(fit.mass().unwrap().error > 0.0);
    assert!(fit.signal_parameter("c1").is_err());
    assert!(fit.parameter("c1").is_ok());
}

#[test]
fn poisson_sample_within_three_sigma() {
    let h = spectrum(Some(42));
    let fit = dplus_fitter(&h, SignalFunc::Gaussian).fit().unwrap();
    assert!(fit.converged(), "{}", fit.result().message);
    let y = fit.raw_yield();
    assert!(y.pull(N_SIG).abs() < 3.0, "yield {y:?}");
}

#[test]
fn curves_and_component_histograms() {
    let h = spectrum(None);
    let fit = dplus_fitter(&h, SignalFunc::Gaussian).fit().unwrap();
    let curves = fit.curves(200).unwrap();
    assert_eq!(curves.x.len(), 200);
    let peak = curves.signal.iter().cloned().fold(0.0, f64::max);
    // 2000 * 0.005 / (0.01 * sqrt(2 pi)) ~ 399 per bin at the peak
    assert_relative_eq!(peak, 399.0, max_relative = 0.05);

    let hists = fit.component_histograms("_pt2.0_4.0").unwrap();
    let names: Vec<&str> = hists.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, ["hist_data_pt2.0_4.0", "hist_model_pt2.0_4.0", "hist_bkg_pt2.0_4.0"]);
    assert_relative_eq!(hists[1].integral(), hists[0].integral(), max_relative = 1e-3);
}
