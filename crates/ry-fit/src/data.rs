//! Binned data inside a fit window.

use ry_core::{Error, Result};
use ry_hist::Histogram;

/// The bins of a mass histogram whose centres lie in the fit window.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedMassData {
    edges: Vec<f64>,
    counts: Vec<f64>,
    sumw2: Vec<f64>,
}

impl BinnedMassData {
    /// Select the bins of `h` with centres in `[lo, hi]`.
    pub fn from_histogram(h: &Histogram, window: (f64, f64)) -> Result<Self> {
        let (lo, hi) = window;
        if !(lo < hi) {
            return Err(Error::Validation(format!(
                "fit window [{lo}, {hi}] of '{}' is empty",
                h.name
            )));
        }
        let selected: Vec<usize> = (0..h.n_bins)
            .filter(|&i| {
                let c = h.bin_center(i);
                c >= lo && c <= hi
            })
            .collect();
        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return Err(Error::Validation(format!(
                "no bins of '{}' inside fit window [{lo}, {hi}]",
                h.name
            )));
        };
        Ok(Self {
            edges: h.bin_edges[first..=last + 1].to_vec(),
            counts: h.bin_content[first..=last].to_vec(),
            sumw2: selected.iter().map(|&i| h.bin_sumw2(i)).collect(),
        })
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Bin edges (length = n_bins + 1).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin contents.
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Sum of squared weights per bin.
    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    /// Total content.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Lower and upper edge of the selected range.
    pub fn range(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    /// Centre of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }

    /// Indices of bins whose centres lie in `[lo, hi]`.
    pub fn bins_in(&self, lo: f64, hi: f64) -> Vec<usize> {
        (0..self.n_bins())
            .filter(|&i| {
                let c = self.bin_center(i);
                c >= lo && c <= hi
            })
            .collect()
    }

    /// Mean bin width.
    pub fn mean_bin_width(&self) -> f64 {
        let (a, b) = self.range();
        (b - a) / self.n_bins() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist() -> Histogram {
        let mut h = Histogram::new("h", "", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        for (i, c) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
            h.set_bin(i, *c, c.sqrt());
        }
        h
    }

    #[test]
    fn selects_bins_by_centre() {
        let d = BinnedMassData::from_histogram(&hist(), (1.2, 3.6)).unwrap();
        assert_eq!(d.counts(), &[2.0, 3.0, 4.0]);
        assert_eq!(d.edges(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(d.range(), (1.0, 4.0));
        assert_eq!(d.total(), 9.0);
        assert_eq!(d.bins_in(2.0, 3.0), vec![1]);
    }

    #[test]
    fn empty_window_is_rejected() {
        assert!(BinnedMassData::from_histogram(&hist(), (1.1, 1.4)).is_err());
        assert!(BinnedMassData::from_histogram(&hist(), (3.0, 2.0)).is_err());
    }
}
