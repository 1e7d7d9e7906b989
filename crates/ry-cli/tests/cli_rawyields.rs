use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use ry_hist::{Axis, HistFile, HistObject, SparseHistogram};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const PEAK: f64 = 1.8697;
const WIDTH: f64 = 0.008;
const N_SIGNAL: usize = 3_000;
const N_BACKGROUND: usize = 6_000;
const PT_BINS: [(f64, f64); 2] = [(2.0, 4.0), (4.0, 6.0)];

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rawyields"))
}

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let p = std::env::temp_dir()
        .join(format!("rawyields_cli_{}_{}_{tag}", std::process::id(), nanos));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn config(hadron: &str, pt_mins: &str, pt_maxs: &str) -> String {
    format!(
        "hadron: {hadron}
pt_mins: {pt_mins}
pt_maxs: {pt_maxs}
fit:
  mass_mins: [1.72, 1.72]
  mass_maxs: [2.0, 2.0]
  sgn_funcs: [gaussian, gaussian]
  bkg_funcs: [chebpol1, chebpol1]
bdt_cuts:
  bkg: 0.05
  nonprompt: [0.0, 0.5]
input:
  data: AnalysisResults.json
output:
  rawyields:
    directory: out
    suffix: _test
"
    )
}

/// Injected signal counts per pT bin: (all, non-prompt score >= 0.5).
type Truth = Vec<(f64, f64)>;

/// `hData` with a Gaussian peak on a flat background in each pT bin.
fn write_input(dir: &Path, seed: u64) -> Truth {
    let axes = vec![
        Axis::uniform("mass", "M (GeV/c^{2})", 60, 1.70, 2.00).unwrap(),
        Axis::uniform("pt", "p_{T} (GeV/c)", 20, 0.0, 10.0).unwrap(),
        Axis::uniform("bkg", "BDT bkg", 100, 0.0, 1.0).unwrap(),
        Axis::uniform("np", "BDT nonprompt", 20, 0.0, 1.0).unwrap(),
    ];
    let mut h = SparseHistogram::new("hData", "", axes).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let peak = Normal::new(PEAK, WIDTH).unwrap();
    let mut truth = Vec::new();

    for (lo, hi) in PT_BINS {
        let pt = |rng: &mut StdRng| lo + 0.1 + (hi - lo - 0.2) * rng.random::<f64>();
        let mut counts = (0.0, 0.0);
        for _ in 0..N_SIGNAL {
            let np = rng.random::<f64>();
            let point = [peak.sample(&mut rng), pt(&mut rng), 0.02 * rng.random::<f64>(), np];
            h.fill(&point, 1.0).unwrap();
            counts.0 += 1.0;
            if np >= 0.5 {
                counts.1 += 1.0;
            }
        }
        for _ in 0..N_BACKGROUND {
            let mass = 1.70 + 0.30 * rng.random::<f64>();
            let point = [mass, pt(&mut rng), 0.04 * rng.random::<f64>(), rng.random::<f64>()];
            h.fill(&point, 1.0).unwrap();
        }
        // rejected by the background-score cut
        for _ in 0..1_000 {
            let point = [PEAK, pt(&mut rng), 0.5 + 0.4 * rng.random::<f64>(), rng.random::<f64>()];
            h.fill(&point, 1.0).unwrap();
        }
        truth.push(counts);
    }

    let mut f = HistFile::create(dir.join("AnalysisResults.json")).unwrap();
    f.write(HistObject::Sparse(h)).unwrap();
    f.close().unwrap();
    truth
}

#[test]
fn mismatched_pt_edges_abort_before_any_work() {
    let dir = tmp_dir("mismatch");
    std::fs::write(dir.join("config.yml"), config("dplus", "[2.0, 4.0]", "[4.0]")).unwrap();
    write_input(&dir, 1);

    let out = run(&dir, &["-p", "-f"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("pt_mins"), "stderr: {stderr}");
    assert!(!dir.join("out").exists());
}

#[test]
fn unsupported_hadron_is_rejected() {
    let dir = tmp_dir("hadron");
    let cfg = config("lambdac", "[2.0, 4.0]", "[4.0, 6.0]");
    std::fs::write(dir.join("custom.yml"), cfg).unwrap();

    let out = run(&dir, &["--cfg-file", "custom.yml", "-p"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("lambdac"), "stderr: {stderr}");
}

#[test]
fn missing_config_is_an_error() {
    let dir = tmp_dir("noconfig");
    let out = run(&dir, &["-f"]);
    assert!(!out.status.success());
}

#[test]
fn project_and_fit_recover_injected_yields() {
    let dir = tmp_dir("e2e");
    std::fs::write(dir.join("config.yml"), config("dplus", "[2.0, 4.0]", "[4.0, 6.0]")).unwrap();
    let truth = write_input(&dir, 2024);

    let out = run(&dir, &["-p", "-f", "--plot-npcut", "--log-level", "info"]);
    assert!(
        out.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );

    let out_dir = dir.join("out");
    let masses = HistFile::open(out_dir.join("hist_mass_test.json")).unwrap();
    for name in [
        "hist_mass_pt2.0_4.0_nocutnp",
        "hist_mass_pt2.0_4.0_bdtnp0.00",
        "hist_mass_pt2.0_4.0_bdtnp0.50",
        "hist_mass_pt4.0_6.0_nocutnp",
        "hist_mass_pt4.0_6.0_bdtnp0.00",
        "hist_mass_pt4.0_6.0_bdtnp0.50",
    ] {
        assert!(masses.contains(name), "missing {name}");
    }
    let nocut = masses.get_histogram("hist_mass_pt2.0_4.0_nocutnp").unwrap();
    let all = masses.get_histogram("hist_mass_pt2.0_4.0_bdtnp0.00").unwrap();
    assert_eq!(nocut.bin_content, all.bin_content);
    assert_eq!(nocut.integral(), (N_SIGNAL + N_BACKGROUND) as f64);

    let reference = HistFile::open(out_dir.join("rawyields_nocut_test.json")).unwrap();
    let raw = reference.get_histogram("hist_rawyield").unwrap();
    let tight = HistFile::open(out_dir.join("rawyields_bdtnp0.50_test.json"))
        .unwrap()
        .get_histogram("hist_rawyield")
        .unwrap();
    assert_eq!(raw.n_bins, 2);
    assert_eq!(raw.bin_edges, vec![2.0, 4.0, 6.0]);
    for (i, &(n_all, n_tight)) in truth.iter().enumerate() {
        let (value, error) = (raw.bin_content[i], raw.bin_error(i));
        assert!(error > 0.0);
        assert!((value - n_all).abs() < 3.0 * error, "bin {i}: {value} +- {error} vs {n_all}");

        let (value, error) = (tight.bin_content[i], tight.bin_error(i));
        assert!(error > 0.0);
        assert!((value - n_tight).abs() < 3.0 * error, "bin {i}: {value} +- {error} vs {n_tight}");
    }
    let sigma = reference.get_histogram("hist_sigma").unwrap();
    for i in 0..2 {
        assert!((sigma.bin_content[i] - WIDTH).abs() < 0.002, "sigma {}", sigma.bin_content[i]);
    }
    let alphal = reference.get_histogram("hist_alphal").unwrap();
    assert_eq!(alphal.bin_content, vec![0.0, 0.0]);
    assert!(reference.contains("hist_data_pt2.0_4.0_nocutnp"));
    assert!(reference.contains("hist_bkg_pt4.0_6.0_nocutnp"));

    for label in ["pt2.0_4.0", "pt4.0_6.0"] {
        let svg = std::fs::read_to_string(out_dir.join(format!("massfit_test_{label}_nocutnp.svg"))).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(out_dir.join(format!("massfitres_test_{label}_nocutnp.svg")).exists());
        for th in ["0.0", "0.5"] {
            let path = out_dir.join("plots_npcut").join(format!("massfit_test_{label}_cutnp_{th}.svg"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }
}

#[test]
fn no_stage_flags_does_nothing() {
    let dir = tmp_dir("idle");
    std::fs::write(dir.join("config.yml"), config("dplus", "[2.0, 4.0]", "[4.0, 6.0]")).unwrap();
    let out = run(&dir, &[]);
    assert!(out.status.success());
    assert!(!dir.join("out").exists());
}
