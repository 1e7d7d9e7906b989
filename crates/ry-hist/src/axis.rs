//! Binned axis with ROOT bin numbering.
//!
//! Bin `0` is the underflow, bins `1..=n_bins` are regular, `n_bins + 1` is
//! the overflow.

use ry_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A binned axis described by its edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis name (e.g. `"mass"`).
    pub name: String,
    /// Axis title, used as plot label.
    #[serde(default)]
    pub title: String,
    /// Bin edges, strictly increasing (length = n_bins + 1).
    pub edges: Vec<f64>,
}

impl Axis {
    /// Axis with `n_bins` equal-width bins on `[lo, hi)`.
    pub fn uniform(name: &str, title: &str, n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation(format!("axis '{name}': n_bins must be > 0")));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::Validation(format!(
                "axis '{name}': invalid range [{lo}, {hi})"
            )));
        }
        let width = (hi - lo) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| lo + i as f64 * width).collect();
        edges.push(hi);
        Ok(Self { name: name.to_string(), title: title.to_string(), edges })
    }

    /// Axis with variable-width bins.
    pub fn variable(name: &str, title: &str, edges: Vec<f64>) -> Result<Self> {
        let axis = Self { name: name.to_string(), title: title.to_string(), edges };
        axis.validate()?;
        Ok(axis)
    }

    /// Check that edges are finite and strictly increasing.
    pub fn validate(&self) -> Result<()> {
        if self.edges.len() < 2 {
            return Err(Error::Validation(format!(
                "axis '{}': need at least 2 edges, got {}",
                self.name,
                self.edges.len()
            )));
        }
        if self.edges.iter().any(|e| !e.is_finite()) {
            return Err(Error::Validation(format!("axis '{}': non-finite edge", self.name)));
        }
        if self.edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Validation(format!(
                "axis '{}': edges must be strictly increasing",
                self.name
            )));
        }
        Ok(())
    }

    /// Number of regular bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the first bin.
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// ROOT bin number containing `x` (0 = underflow, n+1 = overflow).
    ///
    /// Values on an inner edge belong to the bin above it. NaN goes to the
    /// overflow.
    pub fn find_bin(&self, x: f64) -> usize {
        let n = self.n_bins();
        if x.is_nan() || x >= self.max() {
            return n + 1;
        }
        if x < self.min() {
            return 0;
        }
        self.edges.partition_point(|&e| e <= x)
    }

    /// Lower edge of ROOT bin `bin` (1-based).
    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.edges[(bin.max(1) - 1).min(self.n_bins())]
    }

    /// Upper edge of ROOT bin `bin` (1-based).
    pub fn bin_up_edge(&self, bin: usize) -> f64 {
        self.edges[bin.clamp(1, self.n_bins())]
    }

    /// Centre of ROOT bin `bin` (1-based).
    pub fn bin_center(&self, bin: usize) -> f64 {
        0.5 * (self.bin_low_edge(bin) + self.bin_up_edge(bin))
    }
}

/// Inclusive range of ROOT bin numbers selected on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisRange {
    /// No restriction: every bin including under/overflow.
    #[default]
    Full,
    /// Bins `first..=last` (ROOT numbering).
    Bins {
        /// First selected bin.
        first: usize,
        /// Last selected bin.
        last: usize,
    },
}

impl AxisRange {
    /// Range `first..=last`, with `last` clamped to the overflow bin.
    ///
    /// An inverted range selects nothing.
    pub fn bins(first: usize, last: usize, n_bins: usize) -> Self {
        Self::Bins { first, last: last.min(n_bins + 1) }
    }

    /// Whether ROOT bin `bin` falls in the range.
    pub fn contains(&self, bin: usize) -> bool {
        match *self {
            Self::Full => true,
            Self::Bins { first, last } => first <= bin && bin <= last,
        }
    }
}
