//! Reference and cut-variation fits, bin by bin.
//!
//! For every momentum bin the `nocutnp` spectrum is fitted first. Its shape
//! parameters seed a [`FixedParams`] set that is held constant while the same
//! bin is re-fitted under each signal-score threshold; those yields come from
//! bin counting. The fitting itself sits behind [`FitBackend`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ry_core::Estimate;
use ry_fit::SignalFunc;
use ry_fit::pdf::TAIL_PARAMETERS;
use ry_hist::{HistFile, Histogram};
use ry_viz::{MassFitArtifact, PlotKind};

use crate::config::{PtBin, RunConfig};
use crate::pdg::MassLookup;
use crate::project::{nocut_name, threshold_name};
use crate::species::Species;

/// Shape parameters held constant in cut-variation fits, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedParams(Vec<(String, f64)>);

impl FixedParams {
    /// Set `name` to `value`, replacing an earlier entry.
    pub fn insert(&mut self, name: &str, value: f64) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One fit the orchestrator needs.
#[derive(Debug, Clone)]
pub struct FitRequest<'a> {
    /// `<hadron>_pt.._nocutnp` or `<hadron>_pt.._bdtnp<t>`.
    pub name: String,
    pub histogram: &'a Histogram,
    pub bin: &'a PtBin,
    pub species: Species,
    /// Expected peak position.
    pub signal_mass: f64,
    /// Kinematic threshold for `expopow`-type backgrounds.
    pub threshold_mass: f64,
    pub fixed: &'a FixedParams,
    /// Compute a bin-counting yield over this window.
    pub counting_window: Option<(f64, f64)>,
    /// Produce a plot artifact with this title.
    pub plot_title: Option<String>,
    /// Produce data/model/background histograms named with this suffix.
    pub dump_suffix: Option<String>,
}

/// Scalars extracted from one fit. Nothing else of the fit is kept.
#[derive(Debug, Clone, Default)]
pub struct FitReport {
    pub converged: bool,
    pub raw_yield: Estimate,
    pub mean: Estimate,
    pub sigma: Estimate,
    /// `alphal`, `nl`, `alphar`, `nr` for double Crystal Ball signals.
    pub tails: Option<[Estimate; 4]>,
    pub bincount: Option<Estimate>,
    pub artifact: Option<MassFitArtifact>,
    pub components: Vec<Histogram>,
}

impl FitReport {
    /// Report of a fit that did not converge.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Something that can fit a mass spectrum.
pub trait FitBackend {
    fn fit(&mut self, request: &FitRequest<'_>) -> Result<FitReport>;
}

/// Command-line switches of the fit stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub fix_mean: bool,
    pub plot_npcut: bool,
}

/// Parameters to hold fixed after the reference fit of a bin.
///
/// Always `sigma`; `mean` iff `fix_mean`; the four tails iff the signal is a
/// double Crystal Ball. Empty when the reference fit did not converge.
pub fn reference_fixes(report: &FitReport, signal: SignalFunc, fix_mean: bool) -> FixedParams {
    let mut fixed = FixedParams::default();
    if !report.converged {
        return fixed;
    }
    fixed.insert("sigma", report.sigma.value);
    if fix_mean {
        fixed.insert("mean", report.mean.value);
    }
    if signal.has_tails()
        && let Some(tails) = &report.tails
    {
        for (name, e) in TAIL_PARAMETERS.iter().zip(tails) {
            fixed.insert(name, e.value);
        }
    }
    fixed
}

const REFERENCE_HISTS: [(&str, &str); 7] = [
    ("hist_rawyield", "raw yield"),
    ("hist_sigma", "\u{03C3} (GeV/c\u{00B2})"),
    ("hist_mean", "\u{03BC} (GeV/c\u{00B2})"),
    ("hist_alphal", "\u{03B1}_l"),
    ("hist_alphar", "\u{03B1}_r"),
    ("hist_nl", "n_l"),
    ("hist_nr", "n_r"),
];

/// Histograms of the fit stage, one bin per momentum bin.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// `hist_rawyield`, `hist_sigma`, `hist_mean`, `hist_alphal`,
    /// `hist_alphar`, `hist_nl`, `hist_nr` of the reference fits.
    pub reference: Vec<Histogram>,
    /// `hist_rawyield` per threshold, in configured order.
    pub thresholds: Vec<(f64, Histogram)>,
    /// Data/model/background dumps of converged reference fits.
    pub components: Vec<Histogram>,
    pub n_fits: usize,
    pub n_converged: usize,
}

impl Extraction {
    pub fn reference_hist(&self, name: &str) -> Option<&Histogram> {
        self.reference.iter().find(|h| h.name == name)
    }
}

fn pt_histogram(name: &str, title: &str, edges: &[f64]) -> Result<Histogram> {
    Ok(Histogram::new(name, title, edges.to_vec())?)
}

fn record(h: &mut Histogram, bin: usize, e: Estimate) {
    h.set_bin(bin, e.value, e.error);
}

fn plot(artifact: &MassFitArtifact, kind: PlotKind, path: &Path, cfg: &RunConfig) -> Result<()> {
    ry_viz::render_to_file(artifact, kind, path, &cfg.viz)
        .with_context(|| format!("rendering {}", path.display()))?;
    tracing::debug!(path = %path.display(), "plot saved");
    Ok(())
}

fn plot_title(bin: &PtBin) -> String {
    format!("{:.1} < pT < {:.1} GeV/c", bin.pt_min, bin.pt_max)
}

fn npcut_plot_dir(cfg: &RunConfig) -> PathBuf {
    cfg.out_dir.join("plots_npcut")
}

/// Fit every bin of `input` and collect the output histograms.
///
/// Plots are written as they are produced; the histogram containers are
/// left to the caller.
pub fn extract(
    cfg: &RunConfig,
    opts: Options,
    masses: &dyn MassLookup,
    input: &HistFile,
    backend: &mut dyn FitBackend,
) -> Result<Extraction> {
    let edges = cfg.pt_edges();
    let mut reference = REFERENCE_HISTS
        .iter()
        .map(|(name, title)| pt_histogram(name, title, &edges))
        .collect::<Result<Vec<_>>>()?;
    let mut thresholds = cfg
        .thresholds
        .iter()
        .map(|&t| pt_histogram("hist_rawyield", "raw yield", &edges).map(|h| (t, h)))
        .collect::<Result<Vec<_>>>()?;
    let mut components = Vec::new();
    let (mut n_fits, mut n_converged) = (0, 0);

    let signal_mass = cfg.species.signal_mass(masses)?;
    let threshold_mass = cfg.species.threshold(masses)?;
    let hadron = cfg.species.name();
    let suffix = &cfg.suffix;
    if opts.plot_npcut {
        let dir = npcut_plot_dir(cfg);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    for (ipt, bin) in cfg.bins.iter().enumerate() {
        let label = bin.label();
        let histogram = input
            .get_histogram(&nocut_name(bin))
            .with_context(|| format!("reading reference spectrum of {label}"))?;
        let no_fix = FixedParams::default();
        let request = FitRequest {
            name: format!("{hadron}_{label}_nocutnp"),
            histogram: &histogram,
            bin,
            species: cfg.species,
            signal_mass,
            threshold_mass,
            fixed: &no_fix,
            counting_window: None,
            plot_title: Some(plot_title(bin)),
            dump_suffix: Some(format!("_{label}_nocutnp")),
        };
        let report = backend.fit(&request)?;
        n_fits += 1;

        let fixed = reference_fixes(&report, bin.signal, opts.fix_mean);
        if !fixed.is_empty() {
            tracing::debug!(bin = %label, fixed = ?fixed.names(), "shape fixed for cut variations");
        }
        if report.converged {
            n_converged += 1;
            tracing::info!(
                bin = %label,
                raw_yield = report.raw_yield.value,
                sigma = report.sigma.value,
                "reference fit converged"
            );
            let mut values = vec![report.raw_yield, report.sigma, report.mean];
            if bin.signal.has_tails()
                && let Some([alphal, nl, alphar, nr]) = report.tails
            {
                values.extend([alphal, alphar, nl, nr]);
            }
            for (h, e) in reference.iter_mut().zip(values) {
                record(h, ipt, e);
            }
            components.extend(report.components);
            if let Some(artifact) = &report.artifact {
                let stem = format!("{suffix}_{label}_nocutnp.svg");
                plot(artifact, PlotKind::MassFit, &cfg.out_dir.join(format!("massfit{stem}")), cfg)?;
                plot(artifact, PlotKind::Residuals, &cfg.out_dir.join(format!("massfitres{stem}")), cfg)?;
            }
        } else {
            tracing::warn!(
                bin = %label,
                "reference fit did not converge; cut-variation fits run with free shape parameters"
            );
        }

        for (th, h_yield) in thresholds.iter_mut() {
            let th = *th;
            let histogram = input
                .get_histogram(&threshold_name(bin, th))
                .with_context(|| format!("reading spectrum of {label} at threshold {th:.2}"))?;
            let request = FitRequest {
                name: format!("{hadron}_{label}_bdtnp{th:.2}"),
                histogram: &histogram,
                bin,
                species: cfg.species,
                signal_mass,
                threshold_mass,
                fixed: &fixed,
                counting_window: Some(cfg.species.counting_window()),
                plot_title: opts.plot_npcut.then(|| format!("{}, BDT np > {th:.2}", plot_title(bin))),
                dump_suffix: None,
            };
            let report = backend.fit(&request)?;
            n_fits += 1;
            if !report.converged {
                tracing::warn!(bin = %label, threshold = th, "cut-variation fit did not converge");
                continue;
            }
            n_converged += 1;
            let Some(raw) = report.bincount else {
                anyhow::bail!("fit backend returned no bin-counting yield for {}", request.name);
            };
            tracing::debug!(bin = %label, threshold = th, raw_yield = raw.value, "cut-variation fit");
            record(h_yield, ipt, raw);
            if let Some(artifact) = &report.artifact {
                let path = npcut_plot_dir(cfg).join(format!("massfit{suffix}_{label}_cutnp_{th:?}.svg"));
                plot(artifact, PlotKind::MassFit, &path, cfg)?;
            }
        }
    }

    Ok(Extraction { reference, thresholds, components, n_fits, n_converged })
}

/// Fit stage: read `hist_mass<suffix>.json`, fit, write the yield containers.
pub fn run(
    cfg: &RunConfig,
    opts: Options,
    masses: &dyn MassLookup,
    backend: &mut dyn FitBackend,
) -> Result<Extraction> {
    let in_path = cfg.mass_file();
    let input =
        HistFile::open(&in_path).with_context(|| format!("opening {}", in_path.display()))?;
    std::fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating {}", cfg.out_dir.display()))?;

    let extraction = extract(cfg, opts, masses, &input, backend)?;

    for (th, h) in &extraction.thresholds {
        let path = cfg.threshold_file(*th);
        let mut out = HistFile::create(&path)?;
        out.write_histogram(h.clone())?;
        out.close().with_context(|| format!("writing {}", path.display()))?;
    }

    let path = cfg.nocut_file();
    let mut out = HistFile::create(&path)?;
    for h in extraction.components.iter().chain(&extraction.reference) {
        out.write_histogram(h.clone())?;
    }
    out.close().with_context(|| format!("writing {}", path.display()))?;

    let total = extraction.reference_hist("hist_rawyield").map_or(0.0, Histogram::integral);
    tracing::info!(
        fits = extraction.n_fits,
        converged = extraction.n_converged,
        raw_yield = total,
        out_dir = %cfg.out_dir.display(),
        "raw yields written"
    );
    Ok(extraction)
}
