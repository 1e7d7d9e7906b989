//! Supported particle species and their hand-tuned fit settings.

use std::fmt;
use std::str::FromStr;

use ry_core::{Error, Result};

use crate::pdg::MassLookup;

const PION_ID: i32 = 211;

/// Starting value and optional bounds of one named fit parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParInit {
    pub name: &'static str,
    pub value: f64,
    pub bounds: Option<(f64, f64)>,
}

const fn par(name: &'static str, value: f64, bounds: Option<(f64, f64)>) -> ParInit {
    ParInit { name, value, bounds }
}

/// Per-species starting point of a mass fit.
///
/// Entries naming parameters the chosen shape does not have are skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitInit {
    /// Relative half-range allowed around the expected peak position.
    pub mass_rel_range: f64,
    pub signal_fraction: f64,
    pub signal: &'static [ParInit],
    pub background: &'static [ParInit],
}

const DSTAR_INIT: FitInit = FitInit {
    mass_rel_range: 0.05,
    signal_fraction: 0.1,
    signal: &[
        par("sigma", 0.0005, Some((0.0001, 0.002))),
        par("alphal", 1.5, Some((1.0, 3.0))),
        par("alphar", 1.5, Some((1.0, 3.0))),
        par("nl", 50.0, Some((30.0, 100.0))),
        par("nr", 50.0, Some((30.0, 100.0))),
    ],
    background: &[
        par("power", 0.5, None),
        par("c1", -20.0, None),
        par("c2", 500.0, None),
        par("c3", -5000.0, None),
    ],
};

const DPLUS_INIT: FitInit = FitInit {
    mass_rel_range: 0.05,
    signal_fraction: 0.1,
    signal: &[par("sigma", 0.005, Some((0.0001, 0.04)))],
    background: &[
        par("c0", 0.4, None),
        par("c1", -0.2, None),
        par("c2", -0.01, None),
        par("c3", 0.01, None),
    ],
};

/// Charmed hadron whose yield is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    /// D*+ → D0 π+, fitted in the mass difference M(Kππ) - M(Kπ).
    Dstar,
    /// D+ → K- π+ π+.
    Dplus,
}

impl Species {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dstar => "dstar",
            Self::Dplus => "dplus",
        }
    }

    /// Expected peak position in the fitted variable.
    pub fn signal_mass(&self, masses: &dyn MassLookup) -> Result<f64> {
        match self {
            Self::Dstar => Ok(masses.mass(413)? - masses.mass(421)?),
            Self::Dplus => masses.mass(411),
        }
    }

    /// Kinematic threshold of `expopow`-type backgrounds.
    pub fn threshold(&self, masses: &dyn MassLookup) -> Result<f64> {
        masses.mass(PION_ID)
    }

    /// Window of the bin-counting yield in cut-variation fits.
    pub fn counting_window(&self) -> (f64, f64) {
        match self {
            Self::Dstar => (0.14, 0.16),
            Self::Dplus => (1.70, 2.00),
        }
    }

    pub fn fit_init(&self) -> &'static FitInit {
        match self {
            Self::Dstar => &DSTAR_INIT,
            Self::Dplus => &DPLUS_INIT,
        }
    }

    /// Label of the fitted variable.
    pub fn x_label(&self) -> &'static str {
        match self {
            Self::Dstar => "M(K\u{03C0}\u{03C0}) - M(K\u{03C0}) (GeV/c\u{00B2})",
            Self::Dplus => "M(K\u{03C0}\u{03C0}) (GeV/c\u{00B2})",
        }
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dstar" => Ok(Self::Dstar),
            "dplus" => Ok(Self::Dplus),
            other => Err(Error::Validation(format!(
                "hadron '{other}' not supported (expected dstar or dplus)"
            ))),
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdg::PdgTable;
    use approx::assert_relative_eq;

    #[test]
    fn dstar_peaks_at_mass_difference() {
        let t = PdgTable::builtin();
        assert_relative_eq!(Species::Dstar.signal_mass(&t).unwrap(), 0.14542, epsilon = 1e-9);
        assert_relative_eq!(Species::Dplus.signal_mass(&t).unwrap(), 1.86966);
        assert_relative_eq!(Species::Dstar.threshold(&t).unwrap(), 0.13957039);
    }

    #[test]
    fn parse_round_trip() {
        for s in [Species::Dstar, Species::Dplus] {
            assert_eq!(s.name().parse::<Species>().unwrap(), s);
        }
        let err = "lambdac".parse::<Species>().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn init_values_sit_inside_their_bounds() {
        for s in [Species::Dstar, Species::Dplus] {
            let init = s.fit_init();
            for p in init.signal.iter().chain(init.background) {
                if let Some((lo, hi)) = p.bounds {
                    assert!(lo <= p.value && p.value <= hi, "{}: {}", s, p.name);
                }
            }
        }
    }
}
