//! Read-only weight tables: pileup reweighting with systematic variants and
//! the higher-order k-factor correction.
//!
//! Tables are built once from a validated [`PipelineConfig`] and shared
//! between workers behind an `Arc`; nothing mutates them after load.

use mp_core::{Error, Result};
use mp_hist::{Grid2D, Histogram};
use serde::{Deserialize, Serialize};

use crate::config::{KFactorConfig, PileupConfig, PipelineConfig};

/// Pileup target variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PileupVariant {
    /// Nominal target.
    Nominal,
    /// Up-shifted target.
    Up,
    /// Down-shifted target.
    Down,
}

impl PileupVariant {
    /// All variants, nominal first.
    pub const ALL: [PileupVariant; 3] = [Self::Nominal, Self::Up, Self::Down];
}

/// Per-bin ratios `target / simulated` (both unit-normalized), one table per variant.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupWeights {
    nominal: Histogram,
    up: Histogram,
    down: Histogram,
}

impl PileupWeights {
    /// Build the three ratio tables.
    pub fn from_config(cfg: &PileupConfig) -> Result<Self> {
        let simulated = tabulated("pileup_simulated", &cfg.edges, &cfg.simulated)?.normalized();
        let t = &cfg.targets;
        Ok(Self {
            nominal: ratio("pu_weight_nominal", &cfg.edges, &t.nominal, &simulated)?,
            up: ratio("pu_weight_up", &cfg.edges, &t.up, &simulated)?,
            down: ratio("pu_weight_down", &cfg.edges, &t.down, &simulated)?,
        })
    }

    /// Weight for `npu`, clamped to the edge bins outside the table's domain.
    ///
    /// NaN carries no reweighting information and yields 1.0.
    pub fn weight(&self, npu: f64, variant: PileupVariant) -> f64 {
        self.table(variant).clamped_content(npu).unwrap_or(1.0)
    }

    /// Underlying ratio histogram of a variant.
    pub fn table(&self, variant: PileupVariant) -> &Histogram {
        match variant {
            PileupVariant::Nominal => &self.nominal,
            PileupVariant::Up => &self.up,
            PileupVariant::Down => &self.down,
        }
    }
}

fn tabulated(name: &str, edges: &[f64], contents: &[f64]) -> Result<Histogram> {
    Histogram::from_contents(name, edges.to_vec(), contents.to_vec())
        .map_err(|e| Error::Config(format!("{name}: {e}")))
}

fn ratio(name: &str, edges: &[f64], target: &[f64], simulated: &Histogram) -> Result<Histogram> {
    let target = tabulated(name, edges, target)?.normalized();
    let weights: Vec<f64> = target
        .bin_content
        .iter()
        .zip(&simulated.bin_content)
        .map(|(&t, &s)| if s > 0.0 { t / s } else { 1.0 })
        .collect();
    tabulated(name, edges, &weights)
}

/// Lookup tables shared by every worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTables {
    pileup: Option<PileupWeights>,
    kfactor: Option<Grid2D>,
}

impl WeightTables {
    /// Tables with no reweighting information: every lookup returns 1.0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the tables configured in `cfg`.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let pileup = cfg.pileup.as_ref().map(PileupWeights::from_config).transpose()?;
        let kfactor = cfg.kfactor.as_ref().map(kfactor_grid).transpose()?;
        tracing::debug!(
            pileup = pileup.is_some(),
            kfactor = kfactor.is_some(),
            "weight tables loaded"
        );
        Ok(Self { pileup, kfactor })
    }

    /// Whether pileup targets are configured.
    pub fn has_pileup(&self) -> bool {
        self.pileup.is_some()
    }

    /// Whether a k-factor grid is configured.
    pub fn has_kfactor(&self) -> bool {
        self.kfactor.is_some()
    }

    /// Pileup tables, if configured.
    pub fn pileup(&self) -> Option<&PileupWeights> {
        self.pileup.as_ref()
    }

    /// Pileup weight for `npu` under `variant`; 1.0 without pileup targets.
    pub fn pu_weight(&self, npu: f64, variant: PileupVariant) -> f64 {
        self.pileup.as_ref().map_or(1.0, |pu| pu.weight(npu, variant))
    }

    /// K-factor at `(scale, phet)`; 1.0 without a grid or outside its range.
    pub fn kfactor_weight(&self, scale: f64, phet: f64) -> f64 {
        self.kfactor.as_ref().and_then(|g| g.get(scale, phet)).unwrap_or(1.0)
    }
}

fn kfactor_grid(cfg: &KFactorConfig) -> Result<Grid2D> {
    Grid2D::new(cfg.scale_edges.clone(), cfg.phet_edges.clone(), cfg.values.clone())
        .map_err(|e| Error::Config(format!("kfactor: {e}")))
}
