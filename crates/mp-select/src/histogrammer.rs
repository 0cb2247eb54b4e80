//! Cutflow counters and post-selection distributions.

use mp_core::{Error, Event, Result};
use mp_hist::Histogram;
use serde::Serialize;

use crate::config::CutThresholds;
use crate::cutflow::{CUT_LABELS, CutResult, N_CUTS};

const KINEMATIC_BINS: usize = 400;
const KINEMATIC_MAX: f64 = 400.0;

/// Additive accumulator for the cutflow path.
///
/// One instance per worker; partial accumulators are combined with
/// [`SelectionHistogrammer::merge`], which is commutative.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionHistogrammer {
    counts: [u64; N_CUTS + 1],
    photon_et: Histogram,
    met_et: Histogram,
    selected: u64,
    malformed: u64,
}

impl SelectionHistogrammer {
    /// Empty accumulator with 400 one-GeV bins per distribution.
    pub fn new() -> Result<Self> {
        Ok(Self {
            counts: [0; N_CUTS + 1],
            photon_et: kinematic_histogram("hPhotonEt", "PhotonEt")?,
            met_et: kinematic_histogram("hMetEt", "MetEt")?,
            selected: 0,
            malformed: 0,
        })
    }

    /// Empty accumulator with the same binning as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            counts: [0; N_CUTS + 1],
            photon_et: self.photon_et.cleared(),
            met_et: self.met_et.cleared(),
            selected: 0,
            malformed: 0,
        }
    }

    /// Count one evaluated event; fills the distributions if it passed every cut.
    pub fn record(&mut self, result: &CutResult, event: &Event) {
        self.counts[0] += 1;
        for (k, pass) in result.cumulative().into_iter().enumerate() {
            if pass {
                self.counts[k + 1] += 1;
            }
        }
        if result.passes_all() {
            self.selected += 1;
            // Both collections are non-empty once every cut passed.
            if let (Some(ph), Some(met)) = (event.photons.first(), event.met.first()) {
                self.photon_et.fill(ph.et);
                self.met_et.fill(met.et());
            }
        }
    }

    /// Count one event that could not be evaluated.
    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    /// Events retained so far.
    pub fn selected(&self) -> u64 {
        self.selected
    }

    /// Add another worker's counts.
    pub fn merge(&mut self, other: &SelectionHistogrammer) -> Result<()> {
        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }
        self.photon_et.merge(&other.photon_et).map_err(|e| Error::Validation(e.to_string()))?;
        self.met_et.merge(&other.met_et).map_err(|e| Error::Validation(e.to_string()))?;
        self.selected += other.selected;
        self.malformed += other.malformed;
        Ok(())
    }

    /// Labeled snapshot of the accumulated state.
    pub fn summary(&self, thresholds: &CutThresholds) -> CutflowSummary {
        CutflowSummary {
            labels: CUT_LABELS,
            counts: self.counts,
            thresholds: *thresholds,
            selected: self.selected,
            malformed: self.malformed,
            photon_et: self.photon_et.clone(),
            met_et: self.met_et.clone(),
        }
    }
}

fn kinematic_histogram(name: &str, title: &str) -> Result<Histogram> {
    Histogram::uniform(name, KINEMATIC_BINS, 0.0, KINEMATIC_MAX)
        .map(|h| h.title(title))
        .map_err(|e| Error::Validation(e.to_string()))
}

/// End-of-run cutflow report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutflowSummary {
    /// Bucket labels, pre-cut first.
    pub labels: [&'static str; N_CUTS + 1],
    /// Cumulative counts per bucket.
    pub counts: [u64; N_CUTS + 1],
    /// Thresholds the counts were produced with.
    pub thresholds: CutThresholds,
    /// Events passing every cut.
    pub selected: u64,
    /// Events dropped because a required field was absent.
    pub malformed: u64,
    /// Leading-photon Et of retained events.
    pub photon_et: Histogram,
    /// Missing Et of retained events.
    pub met_et: Histogram,
}

impl CutflowSummary {
    /// Bucket labels with threshold values, e.g. `N Photons >= 1`.
    pub fn display_labels(&self) -> [String; N_CUTS + 1] {
        let t = &self.thresholds;
        [
            self.labels[0].to_string(),
            format!("{} >= {}", self.labels[1], t.min_num_photons),
            format!("{} >= {}", self.labels[2], t.min_photon_et),
            format!("{} <= {}", self.labels[3], t.max_photon_eta),
            format!("{} >= {}", self.labels[4], t.min_met_et),
        ]
    }
}
