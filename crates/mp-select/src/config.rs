//! Pipeline configuration: cut thresholds, photon-identification tables,
//! pileup targets, k-factor grid and sample normalization.
//!
//! Everything here is checked by [`PipelineConfig::validate`] before the first
//! event is touched; a configuration that passes validation never produces a
//! fatal error mid-run.

use std::path::Path;

use mp_core::{Error, Result};
use mp_hist::{Grid2D, Histogram};
use serde::{Deserialize, Serialize};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Raise logging to per-event detail.
    #[serde(default)]
    pub verbose: bool,
    /// Cutflow thresholds.
    #[serde(default)]
    pub cuts: CutThresholds,
    /// Photon-identification regions (required by the reduction path).
    #[serde(default)]
    pub photon_id: Option<PhotonIdConfig>,
    /// Pileup reweighting tables (required by the reduction path for simulation).
    #[serde(default)]
    pub pileup: Option<PileupConfig>,
    /// Higher-order correction grid; absent means a flat 1.0 correction.
    #[serde(default)]
    pub kfactor: Option<KFactorConfig>,
    /// Sample bookkeeping.
    #[serde(default)]
    pub sample: SampleConfig,
    /// Extra requirements applied during reduction.
    #[serde(default)]
    pub reduction: ReductionConfig,
}

/// Thresholds of the four ordered cutflow requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CutThresholds {
    /// Minimum number of photon candidates.
    pub min_num_photons: usize,
    /// Photon transverse energy must be strictly above this (GeV).
    pub min_photon_et: f64,
    /// Photon |eta| must be strictly below this.
    pub max_photon_eta: f64,
    /// Missing transverse energy must be at least this (GeV).
    pub min_met_et: f64,
}

impl Default for CutThresholds {
    fn default() -> Self {
        Self { min_num_photons: 1, min_photon_et: 30.0, max_photon_eta: 2.4, min_met_et: 30.0 }
    }
}

/// Upper bound on an isolation sum, optionally growing with photon Et:
/// `bound = constant + et_slope * et`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsoCut {
    /// Et-independent part of the bound.
    pub constant: f64,
    /// Coefficient multiplying the photon Et.
    #[serde(default)]
    pub et_slope: f64,
}

impl IsoCut {
    /// Bound for a photon of transverse energy `et`.
    #[inline]
    pub fn bound(&self, et: f64) -> f64 {
        self.constant + self.et_slope * et
    }
}

/// Cut set describing one identification region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionCuts {
    /// Upper bound on H/E.
    pub max_hover_e: f64,
    /// Upper bound on sigma_ieta_ieta.
    pub max_cov_ieta_ieta: f64,
    /// Optional lower bound on R9.
    #[serde(default)]
    pub min_r9: Option<f64>,
    /// Bound on the first isolation sum.
    pub iso1: IsoCut,
    /// Bound on the second isolation sum.
    pub iso2: IsoCut,
    /// Bound on the third isolation sum.
    pub iso3: IsoCut,
}

/// Selected (tight) and fake (loose sideband) photon regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhotonIdConfig {
    /// Tight region.
    pub selected: RegionCuts,
    /// Loose window; a photon is fake when it is inside it and fails the tight region.
    pub fake: RegionCuts,
}

/// Target pileup distributions, one per systematic variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PileupTargets {
    /// Nominal target.
    pub nominal: Vec<f64>,
    /// Up-shifted target.
    pub up: Vec<f64>,
    /// Down-shifted target.
    pub down: Vec<f64>,
}

/// Pileup reweighting inputs sharing one binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PileupConfig {
    /// Bin edges in simulated pileup count.
    pub edges: Vec<f64>,
    /// Pileup distribution of the simulated sample.
    pub simulated: Vec<f64>,
    /// Observed target distributions.
    pub targets: PileupTargets,
}

/// K-factor grid over `(scale, phet)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KFactorConfig {
    /// Bin edges in generator kinematic scale.
    pub scale_edges: Vec<f64>,
    /// Bin edges in generator photon Et.
    pub phet_edges: Vec<f64>,
    /// Row-major over scale: `values[i_scale * n_phet + i_phet]`.
    pub values: Vec<f64>,
}

/// Whether the input is recorded data or simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Simulation: reweighted.
    #[default]
    Mc,
    /// Recorded data: unit weights.
    Data,
}

/// Sample bookkeeping used for the luminosity normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleConfig {
    /// Data or simulation.
    #[serde(default)]
    pub kind: SampleKind,
    /// Cross section (pb).
    #[serde(default)]
    pub cross_section_pb: Option<f64>,
    /// Number of generated events.
    #[serde(default)]
    pub n_generated: Option<f64>,
    /// Target integrated luminosity (pb^-1).
    #[serde(default)]
    pub lumi_pb: Option<f64>,
}

impl SampleConfig {
    /// Per-event normalization `lumi * xsec / n_generated`; 1.0 unless all three are set
    /// on a simulated sample.
    pub fn lumi_scale(&self) -> f64 {
        match (self.kind, self.lumi_pb, self.cross_section_pb, self.n_generated) {
            (SampleKind::Mc, Some(lumi), Some(xsec), Some(n_gen)) => lumi * xsec / n_gen,
            _ => 1.0,
        }
    }
}

/// Requirements applied on top of photon identification during reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReductionConfig {
    /// Minimum |dphi| between the chosen photon and the missing energy.
    #[serde(default)]
    pub min_met_photon_dphi: Option<f64>,
}

impl PipelineConfig {
    /// Read a YAML (or JSON) configuration file and validate it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        // YAML is a superset of JSON, so one parser covers both.
        let cfg: PipelineConfig = serde_yaml_ng::from_slice(&bytes)?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: PipelineConfig = serde_yaml_ng::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every threshold and table for consistency.
    pub fn validate(&self) -> Result<()> {
        let c = &self.cuts;
        non_negative("cuts.min_photon_et", c.min_photon_et)?;
        non_negative("cuts.min_met_et", c.min_met_et)?;
        if !(c.max_photon_eta.is_finite() && c.max_photon_eta > 0.0) {
            return Err(invalid(format!(
                "cuts.max_photon_eta must be finite and > 0 (got {})",
                c.max_photon_eta
            )));
        }

        if let Some(id) = &self.photon_id {
            validate_region("photon_id.selected", &id.selected)?;
            validate_region("photon_id.fake", &id.fake)?;
        }

        if let Some(pu) = &self.pileup {
            validate_pileup(pu)?;
        }

        if let Some(k) = &self.kfactor {
            Grid2D::new(k.scale_edges.clone(), k.phet_edges.clone(), k.values.clone())
                .map_err(|e| invalid(format!("kfactor: {e}")))?;
            for (i, &v) in k.values.iter().enumerate() {
                non_negative(&format!("kfactor.values[{i}]"), v)?;
            }
        }

        let s = &self.sample;
        for (name, value) in [
            ("sample.cross_section_pb", s.cross_section_pb),
            ("sample.n_generated", s.n_generated),
            ("sample.lumi_pb", s.lumi_pb),
        ] {
            if let Some(v) = value
                && !(v.is_finite() && v > 0.0)
            {
                return Err(invalid(format!("{name} must be finite and > 0 (got {v})")));
            }
        }

        if let Some(dphi) = self.reduction.min_met_photon_dphi
            && !(0.0..=std::f64::consts::PI).contains(&dphi)
        {
            return Err(invalid(format!(
                "reduction.min_met_photon_dphi must lie in [0, pi] (got {dphi})"
            )));
        }

        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::Config(msg)
}

fn non_negative(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and >= 0 (got {v})")))
    }
}

fn validate_region(prefix: &str, r: &RegionCuts) -> Result<()> {
    non_negative(&format!("{prefix}.max_hover_e"), r.max_hover_e)?;
    non_negative(&format!("{prefix}.max_cov_ieta_ieta"), r.max_cov_ieta_ieta)?;
    if let Some(r9) = r.min_r9 {
        non_negative(&format!("{prefix}.min_r9"), r9)?;
    }
    for (name, iso) in [("iso1", &r.iso1), ("iso2", &r.iso2), ("iso3", &r.iso3)] {
        if !(iso.constant.is_finite() && iso.et_slope.is_finite()) {
            return Err(invalid(format!("{prefix}.{name} bounds must be finite")));
        }
    }
    Ok(())
}

fn validate_pileup(pu: &PileupConfig) -> Result<()> {
    let binning = Histogram::with_edges("pileup", pu.edges.clone())
        .map_err(|e| invalid(format!("pileup.edges: {e}")))?;
    let n_bins = binning.n_bins();

    let t = &pu.targets;
    for (name, contents) in [
        ("pileup.simulated", &pu.simulated),
        ("pileup.targets.nominal", &t.nominal),
        ("pileup.targets.up", &t.up),
        ("pileup.targets.down", &t.down),
    ] {
        if contents.len() != n_bins {
            return Err(invalid(format!(
                "{name} has {} entries, binning has {n_bins} bins",
                contents.len()
            )));
        }
        for (i, &v) in contents.iter().enumerate() {
            non_negative(&format!("{name}[{i}]"), v)?;
        }
        if contents.iter().sum::<f64>() <= 0.0 {
            return Err(invalid(format!("{name} has zero integral")));
        }
    }
    Ok(())
}
