//! Numbers-first description of a fitted mass spectrum.

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Everything needed to draw a mass fit, in counts per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassFitArtifact {
    /// Plot title (e.g. the momentum interval).
    pub title: String,
    /// X-axis label.
    pub x_label: String,
    /// Y-axis label.
    pub y_label: String,
    /// Bin edges of the fitted data (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Data content per bin.
    pub data_y: Vec<f64>,
    /// Data uncertainty per bin.
    pub data_yerr: Vec<f64>,
    /// Fitted background per bin.
    pub background_bin_y: Vec<f64>,
    /// Curve sample positions.
    pub curve_x: Vec<f64>,
    /// Total fit at `curve_x`.
    pub total_y: Vec<f64>,
    /// Signal component at `curve_x`.
    pub signal_y: Vec<f64>,
    /// Background component at `curve_x`.
    pub background_y: Vec<f64>,
    /// Text lines for the info box (yield, mean, width, ...).
    #[serde(default)]
    pub info: Vec<String>,
}

impl MassFitArtifact {
    /// Check array lengths.
    pub fn validate(&self) -> crate::Result<()> {
        let n = self.data_y.len();
        if n == 0 {
            return Err(RenderError::Layout(format!("'{}': no bins to draw", self.title)));
        }
        if self.bin_edges.len() != n + 1
            || self.data_yerr.len() != n
            || self.background_bin_y.len() != n
        {
            return Err(RenderError::Layout(format!(
                "'{}': bin arrays disagree (edges={}, data={}, err={}, bkg={})",
                self.title,
                self.bin_edges.len(),
                n,
                self.data_yerr.len(),
                self.background_bin_y.len()
            )));
        }
        let m = self.curve_x.len();
        if self.total_y.len() != m || self.signal_y.len() != m || self.background_y.len() != m {
            return Err(RenderError::Layout(format!(
                "'{}': curve arrays disagree with {m} sample points",
                self.title
            )));
        }
        Ok(())
    }

    /// Bin centre `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_edges[i] + self.bin_edges[i + 1])
    }
}
