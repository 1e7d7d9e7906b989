//! Projection of the 4-axis sparse histogram into per-bin mass spectra.

use anyhow::{Context, Result};
use ry_hist::{Axis, AxisRange, HistFile, Histogram, Selection, SparseHistogram};

use crate::config::{PtBin, RunConfig};

/// Name of the sparse histogram in the input container.
pub const SPARSE_NAME: &str = "hData";

pub const MASS_AXIS: usize = 0;
pub const PT_AXIS: usize = 1;
pub const BKG_AXIS: usize = 2;
pub const NP_AXIS: usize = 3;

pub fn nocut_name(bin: &PtBin) -> String {
    format!("hist_mass_{}_nocutnp", bin.label())
}

pub fn threshold_name(bin: &PtBin, threshold: f64) -> String {
    format!("hist_mass_{}_bdtnp{threshold:.2}", bin.label())
}

/// Boundaries are nudged inwards by this relative amount before `find_bin`.
fn eps(x: f64) -> f64 {
    1e-3 * x.abs()
}

fn axis<'a>(sparse: &'a SparseHistogram, i: usize) -> Result<&'a Axis> {
    sparse.axis(i).with_context(|| {
        format!("sparse histogram '{}' has no axis {i} (has {})", sparse.name, sparse.n_dims())
    })
}

/// Momentum and background-score restriction of `bin`.
pub fn bin_selection(sparse: &SparseHistogram, bin: &PtBin) -> Result<Selection> {
    let bkg = axis(sparse, BKG_AXIS)?;
    let pt = axis(sparse, PT_AXIS)?;
    let bkg_last = bkg.find_bin(bin.bkg_cut - eps(bin.bkg_cut));
    let pt_first = pt.find_bin(bin.pt_min + eps(bin.pt_min));
    let pt_last = pt.find_bin(bin.pt_max - eps(bin.pt_max));
    Ok(Selection::new()
        .with_range(BKG_AXIS, AxisRange::bins(1, bkg_last, bkg.n_bins()))
        .with_range(PT_AXIS, AxisRange::bins(pt_first, pt_last, pt.n_bins())))
}

/// `base` further restricted to signal scores above `threshold`, overflow included.
pub fn threshold_selection(
    sparse: &SparseHistogram,
    base: &Selection,
    threshold: f64,
) -> Result<Selection> {
    let np = axis(sparse, NP_AXIS)?;
    let first = np.find_bin(threshold + eps(threshold));
    Ok(base.clone().with_range(NP_AXIS, AxisRange::bins(first, np.n_bins() + 1, np.n_bins())))
}

/// Mass spectra of one bin: the `nocutnp` one first, then one per threshold.
pub fn project_bin(
    sparse: &SparseHistogram,
    bin: &PtBin,
    thresholds: &[f64],
) -> Result<Vec<Histogram>> {
    let base = bin_selection(sparse, bin)?;
    let mut out = Vec::with_capacity(thresholds.len() + 1);

    let mut h = sparse.projection(MASS_AXIS, &base)?;
    h.name = nocut_name(bin);
    out.push(h);

    for &th in thresholds {
        let sel = threshold_selection(sparse, &base, th)?;
        let mut h = sparse.projection(MASS_AXIS, &sel)?;
        h.name = threshold_name(bin, th);
        out.push(h);
    }
    Ok(out)
}

/// Read `hData`, project every bin and write `hist_mass<suffix>.json`.
pub fn run(cfg: &RunConfig) -> Result<()> {
    let input = cfg.input.as_ref().context("projection needs input.data in the config")?;
    let sparse = HistFile::open(input)
        .and_then(|f| f.get_sparse(SPARSE_NAME))
        .with_context(|| format!("reading '{SPARSE_NAME}' from {}", input.display()))?;
    axis(&sparse, NP_AXIS)?;

    std::fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating {}", cfg.out_dir.display()))?;
    let path = cfg.mass_file();
    let mut out = HistFile::create(&path)?;
    for bin in &cfg.bins {
        tracing::info!(pt_min = bin.pt_min, pt_max = bin.pt_max, "projecting");
        for h in project_bin(&sparse, bin, &cfg.thresholds)? {
            tracing::debug!(name = %h.name, integral = h.integral(), "projected");
            out.write_histogram(h)?;
        }
    }
    out.close().with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "mass histograms written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ry_fit::{BackgroundFunc, SignalFunc};

    fn sparse() -> SparseHistogram {
        let axes = vec![
            Axis::uniform("mass", "", 10, 1.7, 2.0).unwrap(),
            Axis::variable("pt", "", vec![0.0, 1.0, 2.0, 4.0, 8.0]).unwrap(),
            Axis::uniform("bkg", "", 10, 0.0, 1.0).unwrap(),
            Axis::uniform("np", "", 10, 0.0, 1.0).unwrap(),
        ];
        let mut h = SparseHistogram::new(SPARSE_NAME, "", axes).unwrap();
        for (i, np) in [0.05, 0.15, 0.25, 0.55, 0.95, 1.5].into_iter().enumerate() {
            let w = (i + 1) as f64;
            h.fill(&[1.86, 3.0, 0.02, np], w).unwrap();
            // outside the momentum bin and above the background cut
            h.fill(&[1.86, 5.0, 0.02, np], 100.0).unwrap();
            h.fill(&[1.86, 3.0, 0.5, np], 1000.0).unwrap();
        }
        h
    }

    fn bin() -> PtBin {
        PtBin {
            pt_min: 2.0,
            pt_max: 4.0,
            window: (1.72, 2.0),
            signal: SignalFunc::Gaussian,
            background: BackgroundFunc::Expo,
            bkg_cut: 0.1,
        }
    }

    #[test]
    fn edge_values_select_whole_bins() {
        let s = sparse();
        let sel = bin_selection(&s, &bin()).unwrap();
        assert_eq!(sel.range(PT_AXIS), AxisRange::Bins { first: 3, last: 3 });
        // cut 0.1 sits on the edge between bkg bins 1 and 2
        assert_eq!(sel.range(BKG_AXIS), AxisRange::Bins { first: 1, last: 1 });
        assert_eq!(sel.range(NP_AXIS), AxisRange::Full);

        let th = threshold_selection(&s, &sel, 0.2).unwrap();
        assert_eq!(th.range(NP_AXIS), AxisRange::Bins { first: 3, last: 11 });
        let zero = threshold_selection(&s, &sel, 0.0).unwrap();
        assert_eq!(zero.range(NP_AXIS), AxisRange::Bins { first: 1, last: 11 });
    }

    #[test]
    fn projections_are_named_and_cut() {
        let hs = project_bin(&sparse(), &bin(), &[0.0, 0.2, 0.5]).unwrap();
        let names: Vec<&str> = hs.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "hist_mass_pt2.0_4.0_nocutnp",
                "hist_mass_pt2.0_4.0_bdtnp0.00",
                "hist_mass_pt2.0_4.0_bdtnp0.20",
                "hist_mass_pt2.0_4.0_bdtnp0.50",
            ]
        );
        // weights 1..=6; the np overflow entry (weight 6) counts for every threshold
        assert_eq!(hs[0].integral(), 21.0);
        assert_eq!(hs[1].integral(), 21.0);
        assert_eq!(hs[2].integral(), 18.0);
        assert_eq!(hs[3].integral(), 15.0);
    }

    #[test]
    fn threshold_order_does_not_matter() {
        let s = sparse();
        let forward = project_bin(&s, &bin(), &[0.1, 0.5]).unwrap();
        let alone = project_bin(&s, &bin(), &[0.5]).unwrap();
        assert_eq!(forward[2].bin_content, alone[1].bin_content);
        let backward = project_bin(&s, &bin(), &[0.5, 0.1]).unwrap();
        assert_eq!(forward[1].bin_content, backward[2].bin_content);
    }

    #[test]
    fn three_axis_input_is_rejected() {
        let axes = vec![
            Axis::uniform("mass", "", 10, 1.7, 2.0).unwrap(),
            Axis::uniform("pt", "", 4, 0.0, 8.0).unwrap(),
            Axis::uniform("bkg", "", 10, 0.0, 1.0).unwrap(),
        ];
        let s = SparseHistogram::new(SPARSE_NAME, "", axes).unwrap();
        let base = bin_selection(&s, &bin()).unwrap();
        assert!(threshold_selection(&s, &base, 0.1).is_err());
    }
}
