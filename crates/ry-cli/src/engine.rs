//! [`FitBackend`] running binned likelihood fits with `ry-fit`.

use anyhow::{Context, Result};
use ry_core::Estimate;
use ry_fit::pdf::TAIL_PARAMETERS;
use ry_fit::{FitSetup, MassFit, MassFitter, OptimizerConfig};
use ry_viz::MassFitArtifact;

use crate::extract::{FitBackend, FitReport, FitRequest};
use crate::species::{ParInit, Species};

const CURVE_POINTS: usize = 300;

#[derive(Debug, Clone, Default)]
pub struct MassFitBackend {
    optimizer: OptimizerConfig,
}

impl MassFitBackend {
    /// Fitter with the species' starting values and the request's fixed set.
    ///
    /// `None` when the spectrum cannot be fitted at all (e.g. empty window).
    fn configure(&self, request: &FitRequest<'_>) -> Result<Option<MassFitter>> {
        let bin = request.bin;
        let setup = FitSetup::new(&request.name, bin.signal, bin.background, bin.window)
            .with_threshold(request.threshold_mass);
        let mut fitter = match MassFitter::new(request.histogram, setup) {
            Ok(f) => f.with_optimizer(self.optimizer.clone()),
            Err(e) => {
                tracing::warn!(fit = %request.name, "skipping fit: {e}");
                return Ok(None);
            }
        };

        let init = request.species.fit_init();
        fitter.set_particle_mass(request.signal_mass, init.mass_rel_range)?;
        fitter.set_signal_fraction(init.signal_fraction)?;

        let names: Vec<String> =
            fitter.signal_parameter_names().into_iter().map(String::from).collect();
        for p in known(init.signal, &names) {
            if let Err(e) = fitter.set_signal_initpar(p.name, p.value, p.bounds) {
                tracing::warn!(fit = %request.name, "keeping default for {}: {e}", p.name);
            }
        }
        let names: Vec<String> =
            fitter.background_parameter_names().into_iter().map(String::from).collect();
        for p in known(init.background, &names) {
            if let Err(e) = fitter.set_background_initpar(p.name, p.value, p.bounds) {
                tracing::warn!(fit = %request.name, "keeping default for {}: {e}", p.name);
            }
        }

        for (name, value) in request.fixed.iter() {
            fitter
                .fix_signal_par(name, value)
                .with_context(|| format!("fixing {name} in {}", request.name))?;
        }
        Ok(Some(fitter))
    }
}

fn known<'a>(table: &'a [ParInit], names: &'a [String]) -> impl Iterator<Item = &'a ParInit> {
    table.iter().filter(move |p| names.iter().any(|n| n == p.name))
}

impl FitBackend for MassFitBackend {
    fn fit(&mut self, request: &FitRequest<'_>) -> Result<FitReport> {
        let Some(fitter) = self.configure(request)? else {
            return Ok(FitReport::failed());
        };
        let fit = match fitter.fit() {
            Ok(fit) => fit,
            Err(e) => {
                tracing::warn!(fit = %request.name, "fit failed: {e}");
                return Ok(FitReport::failed());
            }
        };
        if !fit.converged() {
            tracing::debug!(fit = %request.name, message = %fit.result().message, "not converged");
            return Ok(FitReport::failed());
        }

        let mut report = FitReport {
            converged: true,
            raw_yield: fit.raw_yield(),
            mean: fit.mass()?,
            sigma: fit.sigma()?,
            ..FitReport::default()
        };
        if request.bin.signal.has_tails() {
            let mut tails = [Estimate::default(); 4];
            for (slot, name) in tails.iter_mut().zip(TAIL_PARAMETERS) {
                *slot = fit.signal_parameter(name)?;
            }
            report.tails = Some(tails);
        }
        if let Some((lo, hi)) = request.counting_window {
            match fit.raw_yield_bincounting(lo, hi) {
                Ok(counted) => report.bincount = Some(counted),
                Err(e) => {
                    tracing::warn!(fit = %request.name, "skipping bin counting: {e}");
                    return Ok(FitReport::failed());
                }
            }
        }
        if let Some(suffix) = &request.dump_suffix {
            report.components = fit.component_histograms(suffix)?;
        }
        if let Some(title) = &request.plot_title {
            report.artifact = Some(artifact(&fit, title, request.species)?);
        }
        Ok(report)
    }
}

/// Plot data of a converged fit.
pub fn artifact(fit: &MassFit, title: &str, species: Species) -> Result<MassFitArtifact> {
    let data = fit.data();
    let curves = fit.curves(CURVE_POINTS)?;
    let raw = fit.raw_yield();
    let mean = fit.mass()?;
    let sigma = fit.sigma()?;
    let chi2 = fit.chi2_ndf()?;
    let width_mev = 1000.0 * data.mean_bin_width();

    Ok(MassFitArtifact {
        title: title.to_string(),
        x_label: species.x_label().to_string(),
        y_label: format!("Counts per {width_mev:.1} MeV/c\u{00B2}"),
        bin_edges: data.edges().to_vec(),
        data_y: data.counts().to_vec(),
        data_yerr: data.sumw2().iter().map(|w| w.max(0.0).sqrt()).collect(),
        background_bin_y: fit.background_bins()?,
        curve_x: curves.x,
        total_y: curves.total,
        signal_y: curves.signal,
        background_y: curves.background,
        info: vec![
            format!("S = {:.0} \u{00B1} {:.0}", raw.value, raw.error),
            format!("\u{03BC} = {:.4} \u{00B1} {:.4} GeV/c\u{00B2}", mean.value, mean.error),
            format!(
                "\u{03C3} = {:.2} \u{00B1} {:.2} MeV/c\u{00B2}",
                1000.0 * sigma.value,
                1000.0 * sigma.error
            ),
            format!("\u{03C7}\u{00B2}/ndf = {chi2:.2}"),
        ],
    })
}
