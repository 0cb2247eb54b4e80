//! Ordered cutflow requirements.
//!
//! Each cut looks at the whole event on its own: cut 3 re-derives its photon
//! subset instead of reusing the survivors of cut 2. The histogrammer turns
//! the independent decisions into cumulative counts.

use mp_core::{Event, Result};
use serde::{Deserialize, Serialize};

use crate::config::CutThresholds;

/// Number of cuts.
pub const N_CUTS: usize = 4;

/// Cutflow bin labels, pre-cut bucket first.
pub const CUT_LABELS: [&str; N_CUTS + 1] =
    ["All Events", "N Photons", "Photon Et", "Photon Eta", "Met"];

/// Per-cut decisions for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutResult {
    /// Independent pass/fail per cut, in order.
    pub cuts: [bool; N_CUTS],
}

impl CutResult {
    /// All cuts passed.
    pub fn passes_all(&self) -> bool {
        self.cuts.iter().all(|&c| c)
    }

    /// Position `k` is true iff cuts `0..=k` all passed.
    pub fn cumulative(&self) -> [bool; N_CUTS] {
        let mut out = [false; N_CUTS];
        let mut pass = true;
        for (o, &c) in out.iter_mut().zip(&self.cuts) {
            pass &= c;
            *o = pass;
        }
        out
    }

    /// Index of the first failing cut.
    pub fn first_failing(&self) -> Option<usize> {
        self.cuts.iter().position(|&c| !c)
    }
}

/// Evaluates the four cutflow requirements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutflowEvaluator {
    thresholds: CutThresholds,
}

impl CutflowEvaluator {
    /// Evaluator over validated thresholds.
    pub fn new(thresholds: CutThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &CutThresholds {
        &self.thresholds
    }

    /// Evaluate every cut on `event`.
    ///
    /// Fails with [`mp_core::Error::MissingField`] when the missing-energy
    /// collection is empty.
    pub fn evaluate(&self, event: &Event) -> Result<CutResult> {
        let t = &self.thresholds;
        let met = event.leading_met()?;

        let n_photons = event.photons.len() >= t.min_num_photons;
        let hard = event.photons.iter().any(|ph| ph.et > t.min_photon_et);
        let hard_central = event
            .photons
            .iter()
            .any(|ph| ph.et > t.min_photon_et && ph.eta.abs() < t.max_photon_eta);
        let met_ok = met.pt >= t.min_met_et;

        Ok(CutResult { cuts: [n_photons, hard, hard_central, met_ok] })
    }
}
