//! Particle masses by PDG Monte Carlo id.

use std::collections::BTreeMap;

use ry_core::{Error, Result};

/// Source of particle masses in GeV/c^2.
pub trait MassLookup {
    /// Mass of the particle with Monte Carlo id `mc_id` (sign ignored).
    fn mass(&self, mc_id: i32) -> Result<f64>;
}

/// Built-in table of the masses this tool needs (PDG 2024 values).
#[derive(Debug, Clone)]
pub struct PdgTable {
    masses: BTreeMap<i32, f64>,
}

impl PdgTable {
    pub fn builtin() -> Self {
        let masses = [
            (111, 0.1349768),
            (211, 0.13957039),
            (310, 0.497611),
            (321, 0.493677),
            (411, 1.86966),
            (413, 2.01026),
            (421, 1.86484),
            (423, 2.00685),
            (431, 1.96835),
            (2212, 0.93827208816),
            (4122, 2.28646),
        ];
        Self { masses: masses.into_iter().collect() }
    }
}

impl Default for PdgTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MassLookup for PdgTable {
    fn mass(&self, mc_id: i32) -> Result<f64> {
        self.masses
            .get(&mc_id.abs())
            .copied()
            .ok_or_else(|| Error::NotFound(format!("mass of particle with mc id {mc_id}")))
    }
}
