//! # mp-select
//!
//! Monophoton event selection and reduction.
//!
//! Two paths share one configuration document:
//! - **cutflow**: [`CutflowEvaluator`] applies four ordered requirements and
//!   [`SelectionHistogrammer`] accumulates cumulative counts plus kinematic
//!   distributions of the retained events.
//! - **reduction**: [`EventReducer`] picks a photon candidate via
//!   [`PhotonClassifier`], computes pileup and k-factor weights from
//!   [`WeightTables`] and emits one [`mp_core::ReducedRecord`] per event.
//!
//! Both are driven through [`pipeline::EventProcessor`], either sequentially
//! from an [`mp_core::EventSource`] or partitioned across rayon workers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cutflow;
pub mod histogrammer;
pub mod kinematics;
pub mod photon_id;
pub mod pipeline;
pub mod reducer;
pub mod weights;

pub use config::{
    CutThresholds, IsoCut, KFactorConfig, PhotonIdConfig, PileupConfig, PileupTargets,
    PipelineConfig, ReductionConfig, RegionCuts, SampleConfig, SampleKind,
};
pub use cutflow::{CUT_LABELS, CutResult, CutflowEvaluator, N_CUTS};
pub use histogrammer::{CutflowSummary, SelectionHistogrammer};
pub use kinematics::corrected_delta_phi;
pub use photon_id::PhotonClassifier;
pub use pipeline::{
    CutflowPipeline, DropReason, EventProcessor, Outcome, ReductionPipeline, run_partitioned,
    run_partitioned_indexed, run_sequential,
};
pub use reducer::{EventReducer, EventWeights, Reduction, ReductionSummary};
pub use weights::{PileupVariant, PileupWeights, WeightTables};
