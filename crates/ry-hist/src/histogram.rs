//! 1-D histogram type stored in histogram containers.

use ry_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 1D histogram with variable bin edges.
///
/// Bin indices in this API are 0-based and exclude under/overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    #[serde(default)]
    pub title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin (for statistical errors), if stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sumw2: Option<Vec<f64>>,
    /// Underflow content.
    #[serde(default)]
    pub underflow: f64,
    /// Overflow content.
    #[serde(default)]
    pub overflow: f64,
    /// Total number of entries.
    #[serde(default)]
    pub entries: f64,
}

impl Histogram {
    /// Empty histogram over `bin_edges`, with sumw2 tracking enabled.
    pub fn new(name: &str, title: &str, bin_edges: Vec<f64>) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(Error::Validation(format!(
                "histogram '{name}': need at least 2 edges, got {}",
                bin_edges.len()
            )));
        }
        if bin_edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::Validation(format!(
                "histogram '{name}': edges must be strictly increasing"
            )));
        }
        let n_bins = bin_edges.len() - 1;
        Ok(Self {
            name: name.to_string(),
            title: title.to_string(),
            n_bins,
            x_min: bin_edges[0],
            x_max: bin_edges[n_bins],
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: Some(vec![0.0; n_bins]),
            underflow: 0.0,
            overflow: 0.0,
            entries: 0.0,
        })
    }

    /// Check internal consistency of a deserialised histogram.
    pub fn validate(&self) -> Result<()> {
        if self.bin_edges.len() != self.n_bins + 1 || self.bin_content.len() != self.n_bins {
            return Err(Error::Validation(format!(
                "histogram '{}': inconsistent bin arrays (n_bins={}, edges={}, content={})",
                self.name,
                self.n_bins,
                self.bin_edges.len(),
                self.bin_content.len()
            )));
        }
        if let Some(sw2) = &self.sumw2
            && sw2.len() != self.n_bins
        {
            return Err(Error::Validation(format!(
                "histogram '{}': sumw2 length {} != n_bins {}",
                self.name,
                sw2.len(),
                self.n_bins
            )));
        }
        Ok(())
    }

    /// Bin containing `x`, or `None` for underflow/overflow.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if !(x >= self.x_min && x < self.x_max) {
            return None;
        }
        Some(self.bin_edges.partition_point(|&e| e <= x) - 1)
    }

    /// Fill `x` with `weight`.
    pub fn fill(&mut self, x: f64, weight: f64) {
        self.entries += 1.0;
        match self.find_bin(x) {
            Some(i) => {
                self.bin_content[i] += weight;
                if let Some(sw2) = self.sumw2.as_mut() {
                    sw2[i] += weight * weight;
                }
            }
            None if x < self.x_min => self.underflow += weight,
            None => self.overflow += weight,
        }
    }

    /// Centre of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_edges[i] + self.bin_edges[i + 1])
    }

    /// Width of bin `i`.
    pub fn bin_width(&self, i: usize) -> f64 {
        self.bin_edges[i + 1] - self.bin_edges[i]
    }

    /// Statistical error of bin `i`: `sqrt(sumw2)` if stored, else `sqrt(|content|)`.
    pub fn bin_error(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(sw2) => sw2[i].max(0.0).sqrt(),
            None => self.bin_content[i].abs().sqrt(),
        }
    }

    /// Sum of squared weights of bin `i` (content if not tracked).
    pub fn bin_sumw2(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(sw2) => sw2[i],
            None => self.bin_content[i].abs(),
        }
    }

    /// Set content and error of bin `i`.
    pub fn set_bin(&mut self, i: usize, content: f64, error: f64) {
        let n = self.n_bins;
        self.bin_content[i] = content;
        self.sumw2.get_or_insert_with(|| vec![0.0; n])[i] = error * error;
    }

    /// Sum of bin contents (excluding under/overflow).
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}
