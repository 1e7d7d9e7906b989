//! rawyields: project a sparse mass histogram and extract raw yields per
//! pT bin and non-prompt score threshold.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod config;
mod engine;
mod extract;
mod pdg;
mod project;
mod species;

#[derive(Parser)]
#[command(name = "rawyields")]
#[command(about = "rawyields - raw-yield extraction with non-prompt score variations")]
#[command(version)]
struct Cli {
    /// YAML run configuration
    #[arg(short = 'c', long, visible_alias = "cfg_file", default_value = "config.yml")]
    cfg_file: PathBuf,

    /// Project the sparse histogram into mass spectra
    #[arg(short, long)]
    project: bool,

    /// Fit the projected mass spectra
    #[arg(short, long)]
    fit: bool,

    /// Also fix the peak position in the threshold fits
    #[arg(long, visible_alias = "fix_mean")]
    fix_mean: bool,

    /// Save a plot for every threshold fit
    #[arg(long, visible_alias = "plot_npcut")]
    plot_npcut: bool,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    let cfg = config::load(&cli.cfg_file)?;
    tracing::info!(
        hadron = %cfg.species,
        bins = cfg.bins.len(),
        thresholds = cfg.thresholds.len(),
        "loaded {}",
        cli.cfg_file.display()
    );

    if !cli.project && !cli.fit {
        tracing::warn!("nothing to do: pass --project and/or --fit");
        return Ok(());
    }
    if cli.project {
        project::run(&cfg)?;
    }
    if cli.fit {
        let opts = extract::Options { fix_mean: cli.fix_mean, plot_npcut: cli.plot_npcut };
        let masses = pdg::PdgTable::builtin();
        let mut backend = engine::MassFitBackend::default();
        extract::run(&cfg, opts, &masses, &mut backend)?;
    }
    Ok(())
}
