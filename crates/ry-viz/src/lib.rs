//! # ry-viz
//!
//! SVG rendering for fit diagnostics. Plots are rendered from a
//! numbers-first [`MassFitArtifact`], so the renderer does not depend on the
//! fitting library.

pub mod artifact;
pub mod canvas;
pub mod color;
pub mod config;
pub mod header;
pub mod layout;
pub mod plots;
pub mod primitives;
pub mod text;

use std::path::Path;

pub use artifact::MassFitArtifact;
use config::VizConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("layout error: {0}")]
    Layout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::fmt::Error> for RenderError {
    fn from(e: std::fmt::Error) -> Self {
        Self::Layout(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Which view of a mass fit to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// Data with total, signal and background curves.
    MassFit,
    /// Data minus fitted background, with the signal curve.
    Residuals,
}

/// Render `artifact` to an SVG string.
pub fn render_svg(artifact: &MassFitArtifact, kind: PlotKind, config: &VizConfig) -> Result<String> {
    artifact.validate()?;
    match kind {
        PlotKind::MassFit => plots::mass_fit::render(artifact, config),
        PlotKind::Residuals => plots::residuals::render(artifact, config),
    }
}

/// Render `artifact` and write it to `path`.
pub fn render_to_file(
    artifact: &MassFitArtifact,
    kind: PlotKind,
    path: &Path,
    config: &VizConfig,
) -> Result<()> {
    let svg = render_svg(artifact, kind, config)?;
    std::fs::write(path, svg)?;
    Ok(())
}
