//! Event reduction: photon choice, reweighting and record assembly.

use std::sync::Arc;

use mp_core::{Error, Event, Photon, PhotonClass, ReducedRecord, Result};
use serde::Serialize;

use crate::config::{PipelineConfig, SampleKind};
use crate::kinematics::corrected_delta_phi;
use crate::photon_id::PhotonClassifier;
use crate::weights::{PileupVariant, WeightTables};

/// Result of reducing one well-formed event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// A record was produced.
    Emitted(ReducedRecord),
    /// No photon in either identification region.
    NoCandidate,
    /// The chosen photon is too close in azimuth to the missing energy.
    FailedSeparation,
}

/// Combined weights of one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWeights {
    /// Nominal pileup weight.
    pub pu: f64,
    /// K-factor.
    pub kfactor: f64,
    /// `pu * kfactor * lumi_scale`
    pub nominal: f64,
    /// Up-shifted pileup variant of `nominal`.
    pub up: f64,
    /// Down-shifted pileup variant of `nominal`.
    pub down: f64,
}

impl EventWeights {
    const UNIT: EventWeights =
        EventWeights { pu: 1.0, kfactor: 1.0, nominal: 1.0, up: 1.0, down: 1.0 };
}

/// Turns events into reduced records.
#[derive(Debug, Clone)]
pub struct EventReducer {
    classifier: PhotonClassifier,
    tables: Arc<WeightTables>,
    kind: SampleKind,
    lumi_scale: f64,
    min_dphi: Option<f64>,
}

impl EventReducer {
    /// Build a reducer. Fails if the configuration lacks what reduction needs.
    pub fn new(cfg: &PipelineConfig, tables: Arc<WeightTables>) -> Result<Self> {
        let id = cfg
            .photon_id
            .as_ref()
            .ok_or_else(|| Error::Config("photon_id is required for reduction".into()))?;
        if cfg.sample.kind == SampleKind::Mc && !tables.has_pileup() {
            return Err(Error::Config("pileup targets are required for simulated samples".into()));
        }
        Ok(Self {
            classifier: PhotonClassifier::new(id),
            tables,
            kind: cfg.sample.kind,
            lumi_scale: cfg.sample.lumi_scale(),
            min_dphi: cfg.reduction.min_met_photon_dphi,
        })
    }

    /// Reduce one event.
    ///
    /// `Err` is always a per-event [`Error::MissingField`]; the caller drops
    /// the event. A missing-energy entry without an azimuth is one of them.
    pub fn reduce(&self, event_index: u64, event: &Event) -> Result<Reduction> {
        let Some((photon_index, label)) = self.classifier.choose(&event.photons) else {
            return Ok(Reduction::NoCandidate);
        };
        let photon: &Photon = &event.photons[photon_index];
        let met = event.leading_met()?;
        let met_phi = met.require_phi()?;

        let dphi = corrected_delta_phi(photon.phi, met_phi);
        if let Some(min) = self.min_dphi
            && (dphi.is_nan() || dphi.abs() < min)
        {
            return Ok(Reduction::FailedSeparation);
        }

        let w = self.weights(event)?;
        Ok(Reduction::Emitted(ReducedRecord {
            event_index,
            photon_index,
            label,
            weight: w.nominal,
            weight_pu_up: w.up,
            weight_pu_down: w.down,
            pu_weight: w.pu,
            kfactor: w.kfactor,
            photon_et: photon.et,
            photon_eta: photon.eta,
            photon_phi: photon.phi,
            met_pt: met.pt,
            met_phi,
            dphi_photon_met: dphi,
        }))
    }

    /// Weights of `event`; unit weights for recorded data.
    pub fn weights(&self, event: &Event) -> Result<EventWeights> {
        if self.kind == SampleKind::Data {
            return Ok(EventWeights::UNIT);
        }

        let npu = event.require_npu()?;
        if npu.is_nan() {
            return Err(Error::MissingField("npu"));
        }
        let kfactor = if self.tables.has_kfactor() {
            let (scale, phet) = event.require_generator_kinematics()?;
            self.tables.kfactor_weight(scale, phet)
        } else {
            1.0
        };

        let [pu, pu_up, pu_down] = PileupVariant::ALL.map(|v| self.tables.pu_weight(npu, v));
        let common = kfactor * self.lumi_scale;
        Ok(EventWeights {
            pu,
            kfactor,
            nominal: pu * common,
            up: pu_up * common,
            down: pu_down * common,
        })
    }
}

/// Additive accumulator for the reduction path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReductionSummary {
    /// Events seen, malformed ones included.
    pub events: u64,
    /// Records emitted.
    pub emitted: u64,
    /// Emitted with a selected photon.
    pub selected_photons: u64,
    /// Emitted with a fake photon.
    pub fake_photons: u64,
    /// Dropped for lack of a candidate photon.
    pub dropped_no_candidate: u64,
    /// Dropped by the photon/missing-energy separation cut.
    pub dropped_separation: u64,
    /// Dropped because a required field was absent or unreadable.
    pub malformed: u64,
    /// Sum of nominal weights.
    pub sum_weight: f64,
    /// Sum of up-shifted weights.
    pub sum_weight_pu_up: f64,
    /// Sum of down-shifted weights.
    pub sum_weight_pu_down: f64,
}

impl ReductionSummary {
    /// Account for one reduction result.
    pub fn record(&mut self, reduction: &Reduction) {
        self.events += 1;
        match reduction {
            Reduction::Emitted(r) => {
                self.emitted += 1;
                match r.label {
                    PhotonClass::Selected => self.selected_photons += 1,
                    PhotonClass::Fake => self.fake_photons += 1,
                    PhotonClass::Rejected => {}
                }
                self.sum_weight += r.weight;
                self.sum_weight_pu_up += r.weight_pu_up;
                self.sum_weight_pu_down += r.weight_pu_down;
            }
            Reduction::NoCandidate => self.dropped_no_candidate += 1,
            Reduction::FailedSeparation => self.dropped_separation += 1,
        }
    }

    /// Account for one event that could not be reduced.
    pub fn record_malformed(&mut self) {
        self.events += 1;
        self.malformed += 1;
    }

    /// Add another worker's counts.
    pub fn merge(&mut self, other: &ReductionSummary) {
        self.events += other.events;
        self.emitted += other.emitted;
        self.selected_photons += other.selected_photons;
        self.fake_photons += other.fake_photons;
        self.dropped_no_candidate += other.dropped_no_candidate;
        self.dropped_separation += other.dropped_separation;
        self.malformed += other.malformed;
        self.sum_weight += other.sum_weight;
        self.sum_weight_pu_up += other.sum_weight_pu_up;
        self.sum_weight_pu_down += other.sum_weight_pu_down;
    }
}
