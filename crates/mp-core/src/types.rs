//! Per-event data model shared by the selection and reduction paths.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A reconstructed photon candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Photon {
    /// Transverse energy (GeV).
    pub et: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle (rad).
    pub phi: f64,
    /// Shower-shape ratio R9.
    #[serde(default = "unmeasured")]
    pub r9: f64,
    /// Hadronic-to-electromagnetic energy ratio.
    #[serde(default = "unmeasured")]
    pub hover_e: f64,
    /// Shower width along eta (sigma_ieta_ieta).
    #[serde(default = "unmeasured")]
    pub cov_ieta_ieta: f64,
    /// First isolation sum.
    #[serde(default = "unmeasured")]
    pub iso1: f64,
    /// Second isolation sum.
    #[serde(default = "unmeasured")]
    pub iso2: f64,
    /// Third isolation sum.
    #[serde(default = "unmeasured")]
    pub iso3: f64,
}

/// Identification variables absent from the input read as NaN, which fails
/// every region cut.
fn unmeasured() -> f64 {
    f64::NAN
}

/// Missing transverse energy of an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingEnergy {
    /// Magnitude of the transverse momentum imbalance (GeV).
    pub pt: f64,
    /// Azimuthal direction of the imbalance (rad). Only the reduction path needs it.
    #[serde(default)]
    pub phi: Option<f64>,
}

impl MissingEnergy {
    /// Azimuth, required for the photon separation.
    pub fn require_phi(&self) -> Result<f64> {
        self.phi.ok_or(Error::MissingField("met.phi"))
    }

    /// Transverse energy; identical to `pt` for the massless imbalance vector.
    #[inline]
    pub fn et(&self) -> f64 {
        self.pt
    }
}

/// One event as handed over by the external data source.
///
/// Absent collections deserialize as empty and absent generator scalars as
/// `None`, so the consumer decides whether the absence is fatal for the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Photon candidates, in source order.
    #[serde(default)]
    pub photons: Vec<Photon>,
    /// Missing-energy collection; only the first entry is used.
    #[serde(default)]
    pub met: Vec<MissingEnergy>,
    /// Simulated pileup count.
    #[serde(default)]
    pub npu: Option<f64>,
    /// Generator kinematic scale.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Generator-level photon transverse energy.
    #[serde(default)]
    pub phet: Option<f64>,
}

impl Event {
    /// First entry of the missing-energy collection.
    pub fn leading_met(&self) -> Result<&MissingEnergy> {
        self.met.first().ok_or(Error::MissingField("met"))
    }

    /// First photon in collection order.
    pub fn leading_photon(&self) -> Result<&Photon> {
        self.photons.first().ok_or(Error::MissingField("photons"))
    }

    /// Simulated pileup count, required for reweighting.
    pub fn require_npu(&self) -> Result<f64> {
        self.npu.ok_or(Error::MissingField("npu"))
    }

    /// Generator `(scale, phet)` pair, required for the k-factor.
    pub fn require_generator_kinematics(&self) -> Result<(f64, f64)> {
        let scale = self.scale.ok_or(Error::MissingField("scale"))?;
        let phet = self.phet.ok_or(Error::MissingField("phet"))?;
        Ok((scale, phet))
    }
}

/// Photon quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotonClass {
    /// Prompt, isolated electromagnetic shower.
    Selected,
    /// Sideband candidate used for the misidentification estimate.
    Fake,
    /// Neither region.
    Rejected,
}

/// Reduced per-event output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedRecord {
    /// Position of the event in the input sequence.
    pub event_index: u64,
    /// Index of the chosen photon in the event's photon collection.
    pub photon_index: usize,
    /// Category of the chosen photon.
    pub label: PhotonClass,
    /// Nominal event weight.
    pub weight: f64,
    /// Event weight with the up-shifted pileup target.
    pub weight_pu_up: f64,
    /// Event weight with the down-shifted pileup target.
    pub weight_pu_down: f64,
    /// Nominal pileup weight component.
    pub pu_weight: f64,
    /// K-factor component.
    pub kfactor: f64,
    /// Chosen photon transverse energy.
    pub photon_et: f64,
    /// Chosen photon pseudorapidity.
    pub photon_eta: f64,
    /// Chosen photon azimuth.
    pub photon_phi: f64,
    /// Missing transverse energy.
    pub met_pt: f64,
    /// Missing-energy azimuth.
    pub met_phi: f64,
    /// Wrapped azimuthal separation between the chosen photon and the missing energy.
    pub dphi_photon_met: f64,
}
