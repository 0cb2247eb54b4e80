//! One-dimensional histogram with explicit under/overflow bookkeeping.

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};

/// Under/overflow handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPolicy {
    /// Drop entries outside the histogram range (record them in `underflow/overflow`).
    #[default]
    Drop,
    /// Fold underflow into the first bin and overflow into the last bin.
    Fold,
}

/// A 1D histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Axis title.
    pub title: String,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (sum of weights per bin).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Underflow sum of weights (before optional folding).
    pub underflow: f64,
    /// Overflow sum of weights (before optional folding).
    pub overflow: f64,
    /// Entries counted into a visible bin.
    pub entries: u64,
    /// Under/overflow policy applied by [`Histogram::fill_weighted`].
    pub flow_policy: FlowPolicy,
}

impl Histogram {
    /// Histogram with `n_bins` equal-width bins on `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(HistError::InvalidBinning("n_bins must be > 0".into()));
        }
        if !(x_min.is_finite() && x_max.is_finite()) || x_max <= x_min {
            return Err(HistError::InvalidBinning(format!(
                "range must be finite with x_min < x_max (got [{x_min}, {x_max}))"
            )));
        }
        let width = (x_max - x_min) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| x_min + width * i as f64).collect();
        edges.push(x_max);
        Self::with_edges(name, edges)
    }

    /// Empty histogram with explicit bin edges.
    pub fn with_edges(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        validate_edges(&bin_edges)?;
        let n_bins = bin_edges.len() - 1;
        Ok(Self {
            name: name.into(),
            title: String::new(),
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            flow_policy: FlowPolicy::Drop,
        })
    }

    /// Histogram from precomputed bin contents (e.g. a tabulated distribution).
    pub fn from_contents(
        name: impl Into<String>,
        bin_edges: Vec<f64>,
        bin_content: Vec<f64>,
    ) -> Result<Self> {
        let mut h = Self::with_edges(name, bin_edges)?;
        if bin_content.len() != h.n_bins() {
            return Err(HistError::LengthMismatch(format!(
                "'{}': {} contents for {} bins",
                h.name,
                bin_content.len(),
                h.n_bins()
            )));
        }
        h.sumw2 = bin_content.iter().map(|c| c * c).collect();
        h.bin_content = bin_content;
        Ok(h)
    }

    /// Set the axis title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the under/overflow policy.
    pub fn flow_policy(mut self, policy: FlowPolicy) -> Self {
        self.flow_policy = policy;
        self
    }

    /// Number of bins (excluding under/overflow).
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Lower edge of the first bin.
    #[inline]
    pub fn x_min(&self) -> f64 {
        self.bin_edges[0]
    }

    /// Upper edge of the last bin.
    #[inline]
    pub fn x_max(&self) -> f64 {
        self.bin_edges[self.bin_edges.len() - 1]
    }

    /// Sum of visible bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Fill with unit weight.
    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    /// Fill with weight `w`. NaN values are ignored.
    pub fn fill_weighted(&mut self, x: f64, w: f64) {
        if x.is_nan() {
            return;
        }
        let w2 = w * w;
        let n_bins = self.n_bins();

        if x < self.x_min() {
            self.underflow += w;
            if self.flow_policy == FlowPolicy::Fold {
                self.bin_content[0] += w;
                self.sumw2[0] += w2;
                self.entries += 1;
            }
            return;
        }
        if x >= self.x_max() {
            self.overflow += w;
            if self.flow_policy == FlowPolicy::Fold {
                self.bin_content[n_bins - 1] += w;
                self.sumw2[n_bins - 1] += w2;
                self.entries += 1;
            }
            return;
        }

        if let Some(b) = self.find_bin(x) {
            self.bin_content[b] += w;
            self.sumw2[b] += w2;
            self.entries += 1;
        }
    }

    /// Bin index for `x`, `None` for underflow, overflow and NaN.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        find_bin(&self.bin_edges, x)
    }

    /// Bin index for `x` with out-of-range values clamped to the edge bins.
    ///
    /// Returns `None` only for NaN.
    pub fn clamped_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() {
            return None;
        }
        if x < self.x_min() {
            return Some(0);
        }
        if x >= self.x_max() {
            return Some(self.n_bins() - 1);
        }
        self.find_bin(x)
    }

    /// Content of the bin containing `x`, edge-clamped.
    pub fn clamped_content(&self, x: f64) -> Option<f64> {
        self.clamped_bin(x).map(|b| self.bin_content[b])
    }

    /// Copy scaled to unit integral. A histogram with zero integral is returned unchanged.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        let integral = self.integral();
        if integral > 0.0 {
            let inv = 1.0 / integral;
            let inv2 = inv * inv;
            out.bin_content.iter_mut().for_each(|c| *c *= inv);
            out.sumw2.iter_mut().for_each(|s| *s *= inv2);
            out.underflow *= inv;
            out.overflow *= inv;
        }
        out
    }

    /// Add `other` bin by bin. Binning must be identical.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if self.bin_edges != other.bin_edges {
            return Err(HistError::IncompatibleMerge(format!(
                "'{}' ({} bins) vs '{}' ({} bins)",
                self.name,
                self.n_bins(),
                other.name,
                other.n_bins()
            )));
        }
        for (a, b) in self.bin_content.iter_mut().zip(&other.bin_content) {
            *a += b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
        Ok(())
    }

    /// Copy with the same binning, title and policy but no entries.
    pub fn cleared(&self) -> Self {
        let n_bins = self.n_bins();
        Self {
            name: self.name.clone(),
            title: self.title.clone(),
            bin_edges: self.bin_edges.clone(),
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            flow_policy: self.flow_policy,
        }
    }
}

fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(HistError::InvalidBinning(format!(
            "need at least 2 edges (got {})",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(HistError::InvalidBinning("edges must be finite".into()));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(HistError::InvalidBinning("edges must be strictly increasing".into()));
    }
    Ok(())
}

/// Find the bin index for a value given sorted bin edges.
///
/// Returns `None` for underflow/overflow.
pub(crate) fn find_bin(edges: &[f64], val: f64) -> Option<usize> {
    if val.is_nan() || val < edges[0] || val >= edges[edges.len() - 1] {
        return None;
    }
    // Number of edges <= val; at least 1 here since val >= edges[0].
    let upper = edges.partition_point(|&e| e <= val);
    Some(upper - 1)
}
