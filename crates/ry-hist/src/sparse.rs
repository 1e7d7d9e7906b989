//! N-dimensional sparse histogram with range selection and projection.
//!
//! Only filled bins are stored. A [`Selection`] is an immutable value holding
//! one [`AxisRange`] per axis; projecting never mutates the histogram, so
//! successive selections cannot leak into each other.

use std::collections::HashMap;

use ry_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisRange};
use crate::histogram::Histogram;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BinStats {
    sumw: f64,
    sumw2: f64,
}

/// Sparse N-D histogram keyed by ROOT bin coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SparseRecord", into = "SparseRecord")]
pub struct SparseHistogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    axes: Vec<Axis>,
    bins: HashMap<Vec<usize>, BinStats>,
    entries: f64,
}

impl SparseHistogram {
    /// Empty histogram over `axes`.
    pub fn new(name: &str, title: &str, axes: Vec<Axis>) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::Validation(format!("sparse histogram '{name}': no axes")));
        }
        for ax in &axes {
            ax.validate()?;
        }
        Ok(Self {
            name: name.to_string(),
            title: title.to_string(),
            axes,
            bins: HashMap::new(),
            entries: 0.0,
        })
    }

    /// Number of axes.
    pub fn n_dims(&self) -> usize {
        self.axes.len()
    }

    /// Axis `i`.
    pub fn axis(&self, i: usize) -> Option<&Axis> {
        self.axes.get(i)
    }

    /// All axes, in dimension order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of stored (non-empty) bins.
    pub fn n_filled_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of fill calls.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Fill one point with `weight`.
    pub fn fill(&mut self, point: &[f64], weight: f64) -> Result<()> {
        if point.len() != self.axes.len() {
            return Err(Error::Validation(format!(
                "sparse histogram '{}': point has {} coordinates, expected {}",
                self.name,
                point.len(),
                self.axes.len()
            )));
        }
        let coords: Vec<usize> =
            self.axes.iter().zip(point).map(|(ax, &x)| ax.find_bin(x)).collect();
        self.add_to_bin(coords, weight, weight * weight);
        self.entries += 1.0;
        Ok(())
    }

    /// Add `sumw`/`sumw2` directly to the bin at `coords` (ROOT numbering).
    pub fn add_to_bin(&mut self, coords: Vec<usize>, sumw: f64, sumw2: f64) {
        let stats = self.bins.entry(coords).or_default();
        stats.sumw += sumw;
        stats.sumw2 += sumw2;
    }

    /// Content of the bin at `coords`, zero if never filled.
    pub fn bin_content(&self, coords: &[usize]) -> f64 {
        self.bins.get(coords).map_or(0.0, |s| s.sumw)
    }

    /// Project onto `axis`, keeping only bins inside `selection`.
    ///
    /// The projected axis keeps its own range too; entries outside it are
    /// dropped, entries in its under/overflow land in the result's flow
    /// fields.
    pub fn projection(&self, axis: usize, selection: &Selection) -> Result<Histogram> {
        let target = self.axes.get(axis).ok_or_else(|| {
            Error::Validation(format!(
                "sparse histogram '{}': no axis {axis} (has {})",
                self.name,
                self.axes.len()
            ))
        })?;
        if selection.ranges.len() > self.axes.len() {
            return Err(Error::Validation(format!(
                "selection spans {} axes, histogram '{}' has {}",
                selection.ranges.len(),
                self.name,
                self.axes.len()
            )));
        }

        let mut h = Histogram::new(
            &format!("{}_proj_{axis}", self.name),
            &target.title,
            target.edges.clone(),
        )?;
        let n = target.n_bins();
        let mut sumw2 = vec![0.0; n];
        for (coords, stats) in &self.bins {
            let selected =
                coords.iter().enumerate().all(|(dim, &bin)| selection.range(dim).contains(bin));
            if !selected {
                continue;
            }
            match coords[axis] {
                0 => h.underflow += stats.sumw,
                b if b > n => h.overflow += stats.sumw,
                b => {
                    h.bin_content[b - 1] += stats.sumw;
                    sumw2[b - 1] += stats.sumw2;
                }
            }
            h.entries += stats.sumw;
        }
        h.sumw2 = Some(sumw2);
        Ok(h)
    }
}

/// Per-axis range restrictions applied by [`SparseHistogram::projection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ranges: Vec<AxisRange>,
}

impl Selection {
    /// Selection with no restriction on any axis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of `self` with `range` on `axis`.
    pub fn with_range(mut self, axis: usize, range: AxisRange) -> Self {
        self.set_range(axis, range);
        self
    }

    /// Restrict `axis` to `range` (replacing any previous restriction).
    pub fn set_range(&mut self, axis: usize, range: AxisRange) {
        if self.ranges.len() <= axis {
            self.ranges.resize(axis + 1, AxisRange::Full);
        }
        self.ranges[axis] = range;
    }

    /// Range on `axis` (`Full` if unset).
    pub fn range(&self, axis: usize) -> AxisRange {
        self.ranges.get(axis).copied().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
struct SparseRecord {
    name: String,
    #[serde(default)]
    title: String,
    axes: Vec<Axis>,
    #[serde(default)]
    entries: f64,
    bins: Vec<SparseEntry>,
}

#[derive(Serialize, Deserialize)]
struct SparseEntry {
    bin: Vec<usize>,
    sumw: f64,
    sumw2: f64,
}

impl From<SparseHistogram> for SparseRecord {
    fn from(h: SparseHistogram) -> Self {
        let mut bins: Vec<SparseEntry> = h
            .bins
            .into_iter()
            .map(|(bin, s)| SparseEntry { bin, sumw: s.sumw, sumw2: s.sumw2 })
            .collect();
        bins.sort_by(|a, b| a.bin.cmp(&b.bin));
        Self { name: h.name, title: h.title, axes: h.axes, entries: h.entries, bins }
    }
}

impl TryFrom<SparseRecord> for SparseHistogram {
    type Error = Error;

    fn try_from(rec: SparseRecord) -> Result<Self> {
        let mut h = SparseHistogram::new(&rec.name, &rec.title, rec.axes)?;
        for entry in rec.bins {
            if entry.bin.len() != h.axes.len() {
                return Err(Error::Validation(format!(
                    "sparse histogram '{}': bin {:?} has wrong dimension",
                    h.name, entry.bin
                )));
            }
            if entry.bin.iter().zip(&h.axes).any(|(&b, ax)| b > ax.n_bins() + 1) {
                return Err(Error::Validation(format!(
                    "sparse histogram '{}': bin {:?} out of range",
                    h.name, entry.bin
                )));
            }
            h.add_to_bin(entry.bin, entry.sumw, entry.sumw2);
        }
        h.entries = rec.entries;
        Ok(h)
    }
}
