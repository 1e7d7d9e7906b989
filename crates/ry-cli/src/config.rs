//! Run configuration (YAML) parsing + semantic validation.
//!
//! The raw file is deserialised as-is, then checked and resolved into a
//! [`RunConfig`] before any projection or fit starts.

use anyhow::{Context, Result};
use ry_fit::{BackgroundFunc, SignalFunc};
use ry_viz::config::VizConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::species::Species;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub hadron: String,
    pub pt_mins: Vec<f64>,
    pub pt_maxs: Vec<f64>,
    pub fit: FitConfig,
    pub bdt_cuts: BdtCuts,
    #[serde(default)]
    pub input: Option<InputConfig>,
    pub output: OutputConfig,
    /// Plot styling.
    #[serde(default)]
    pub plot: VizConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitConfig {
    pub mass_mins: Vec<f64>,
    pub mass_maxs: Vec<f64>,
    pub sgn_funcs: Vec<String>,
    pub bkg_funcs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BdtCuts {
    pub bkg: BkgCut,
    pub nonprompt: Vec<f64>,
}

/// Background-score cut: one value for every bin, or one per bin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BkgCut {
    Scalar(f64),
    PerBin(Vec<f64>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub data: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub rawyields: RawYieldsOutput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawYieldsOutput {
    pub directory: PathBuf,
    #[serde(default)]
    pub suffix: String,
}

/// One transverse-momentum bin with its fit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PtBin {
    pub pt_min: f64,
    pub pt_max: f64,
    pub window: (f64, f64),
    pub signal: SignalFunc,
    pub background: BackgroundFunc,
    pub bkg_cut: f64,
}

impl PtBin {
    /// `pt{min:.1}_{max:.1}`, shared by histogram, file and plot names.
    pub fn label(&self) -> String {
        format!("pt{:.1}_{:.1}", self.pt_min, self.pt_max)
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub species: Species,
    pub bins: Vec<PtBin>,
    pub thresholds: Vec<f64>,
    pub input: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub suffix: String,
    pub viz: VizConfig,
}

impl RunConfig {
    /// Momentum edges of the output histograms: `pt_mins ++ [last pt_max]`.
    pub fn pt_edges(&self) -> Vec<f64> {
        let mut edges: Vec<f64> = self.bins.iter().map(|b| b.pt_min).collect();
        if let Some(last) = self.bins.last() {
            edges.push(last.pt_max);
        }
        edges
    }

    pub fn mass_file(&self) -> PathBuf {
        self.out_dir.join(format!("hist_mass{}.json", self.suffix))
    }

    pub fn nocut_file(&self) -> PathBuf {
        self.out_dir.join(format!("rawyields_nocut{}.json", self.suffix))
    }

    pub fn threshold_file(&self, threshold: f64) -> PathBuf {
        self.out_dir.join(format!("rawyields_bdtnp{threshold:.2}{}.json", self.suffix))
    }
}

/// Read, parse and validate the configuration at `path`.
pub fn load(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let raw: Config = serde_yaml_ng::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    validate(raw).with_context(|| format!("invalid config {}", path.display()))
}

/// Check bin-count consistency and resolve model identifiers.
pub fn validate(cfg: Config) -> Result<RunConfig> {
    let n = cfg.pt_mins.len();
    if n != cfg.pt_maxs.len() {
        anyhow::bail!(
            "pt_mins and pt_maxs must have the same length (got {} and {})",
            n,
            cfg.pt_maxs.len()
        );
    }
    if n == 0 {
        anyhow::bail!("pt_mins must contain at least one bin");
    }

    let fit = &cfg.fit;
    let lens = [
        ("mass_mins", fit.mass_mins.len()),
        ("mass_maxs", fit.mass_maxs.len()),
        ("sgn_funcs", fit.sgn_funcs.len()),
        ("bkg_funcs", fit.bkg_funcs.len()),
    ];
    let total: usize = lens.iter().map(|(_, l)| l).sum();
    if total != 4 * n {
        anyhow::bail!(
            "fit.mass_mins, fit.mass_maxs, fit.sgn_funcs and fit.bkg_funcs must each have \
             one entry per pt bin ({n}); found {total} entries in total"
        );
    }

    let bkg_cuts = match &cfg.bdt_cuts.bkg {
        BkgCut::Scalar(c) => vec![*c; n],
        BkgCut::PerBin(v) if v.len() == n => v.clone(),
        BkgCut::PerBin(v) => anyhow::bail!(
            "bdt_cuts.bkg must be a single value or have one entry per pt bin ({n}), got {}",
            v.len()
        ),
    };

    for (key, len) in lens {
        if len != n {
            anyhow::bail!("fit.{key} has {len} entries, expected one per pt bin ({n})");
        }
    }

    let species: Species = cfg.hadron.parse()?;

    let mut bins = Vec::with_capacity(n);
    for i in 0..n {
        let (pt_min, pt_max) = (cfg.pt_mins[i], cfg.pt_maxs[i]);
        if !(pt_min < pt_max) {
            anyhow::bail!("pt bin {i}: pt_min {pt_min} must be below pt_max {pt_max}");
        }
        if i > 0 && pt_min < cfg.pt_maxs[i - 1] {
            anyhow::bail!(
                "pt bin {i}: pt_min {pt_min} overlaps or precedes the previous bin \
                 (pt_max {}); bins must be in ascending order",
                cfg.pt_maxs[i - 1]
            );
        }
        let window = (fit.mass_mins[i], fit.mass_maxs[i]);
        if !(window.0 < window.1) {
            anyhow::bail!(
                "pt bin {i}: fit window [{}, {}] is empty",
                window.0,
                window.1
            );
        }
        let (count_lo, count_hi) = species.counting_window();
        if !(window.0 < count_hi && window.1 > count_lo) {
            anyhow::bail!(
                "pt bin {i}: fit window [{}, {}] does not overlap the {species} counting \
                 window [{count_lo}, {count_hi}]",
                window.0,
                window.1
            );
        }
        let signal: SignalFunc = fit.sgn_funcs[i]
            .parse()
            .with_context(|| format!("fit.sgn_funcs[{i}]"))?;
        let background: BackgroundFunc = fit.bkg_funcs[i]
            .parse()
            .with_context(|| format!("fit.bkg_funcs[{i}]"))?;
        bins.push(PtBin { pt_min, pt_max, window, signal, background, bkg_cut: bkg_cuts[i] });
    }

    Ok(RunConfig {
        species,
        bins,
        thresholds: cfg.bdt_cuts.nonprompt,
        input: cfg.input.map(|i| i.data),
        out_dir: cfg.output.rawyields.directory,
        suffix: cfg.output.rawyields.suffix,
        viz: cfg.plot,
    })
}
