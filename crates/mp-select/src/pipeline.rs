//! Pipeline drivers.
//!
//! A processor is built once with `initialize(config)`, fed one event at a
//! time through [`EventProcessor::process_one`] and turned into a summary by
//! [`EventProcessor::finalize`]. For parallel runs each worker gets its own
//! [`EventProcessor::fork`] and the partial results are merged at the end,
//! so the per-event path never takes a lock.

use std::sync::Arc;

use mp_core::{Error, Event, EventSource, RecordSink, ReducedRecord, Result};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::cutflow::CutflowEvaluator;
use crate::histogrammer::{CutflowSummary, SelectionHistogrammer};
use crate::reducer::{EventReducer, Reduction, ReductionSummary};
use crate::weights::WeightTables;

/// Events per rayon task in [`run_partitioned`] when the caller passes 0.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Why an event produced no output.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// A cutflow requirement failed.
    FailedCuts {
        /// Index of the first failing cut.
        first_failing: usize,
    },
    /// No photon in either identification region.
    NoCandidate,
    /// Photon/missing-energy separation cut failed.
    FailedSeparation,
    /// A required field was absent or the record could not be decoded.
    Malformed(String),
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Passed the cutflow.
    Retained,
    /// Reduced into a record.
    Emitted(ReducedRecord),
    /// Dropped.
    Dropped(DropReason),
}

/// One stage of per-event processing with an additive internal state.
pub trait EventProcessor: Sized + Send + Sync {
    /// End-of-run report.
    type Summary;

    /// Process one event.
    fn process_one(&mut self, index: u64, event: &Event) -> Outcome;

    /// Count an event that could not be processed. Callers log it.
    fn record_malformed(&mut self, index: u64, err: &Error);

    /// Fresh processor with the same configuration and empty counters.
    fn fork(&self) -> Self;

    /// Fold another worker's counters into this one.
    fn merge(&mut self, other: Self) -> Result<()>;

    /// Produce the summary.
    fn finalize(self) -> Self::Summary;
}

/// Cutflow selection path.
#[derive(Debug, Clone)]
pub struct CutflowPipeline {
    evaluator: CutflowEvaluator,
    hists: SelectionHistogrammer,
}

impl CutflowPipeline {
    /// Validate `cfg` and build the pipeline.
    pub fn initialize(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        let hists = SelectionHistogrammer::new()?;
        Ok(Self { evaluator: CutflowEvaluator::new(cfg.cuts), hists })
    }
}

impl EventProcessor for CutflowPipeline {
    type Summary = CutflowSummary;

    fn process_one(&mut self, index: u64, event: &Event) -> Outcome {
        match self.evaluator.evaluate(event) {
            Ok(result) => {
                self.hists.record(&result, event);
                match result.first_failing() {
                    None => Outcome::Retained,
                    Some(first_failing) => {
                        tracing::debug!(event = index, first_failing, "event skipped");
                        Outcome::Dropped(DropReason::FailedCuts { first_failing })
                    }
                }
            }
            Err(e) => {
                tracing::debug!(event = index, error = %e, "malformed event");
                self.record_malformed(index, &e);
                Outcome::Dropped(DropReason::Malformed(e.to_string()))
            }
        }
    }

    fn record_malformed(&mut self, _index: u64, _err: &Error) {
        self.hists.record_malformed();
    }

    fn fork(&self) -> Self {
        Self { evaluator: self.evaluator, hists: self.hists.empty_like() }
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.hists.merge(&other.hists)
    }

    fn finalize(self) -> CutflowSummary {
        let summary = self.hists.summary(self.evaluator.thresholds());
        tracing::info!(
            malformed = summary.malformed,
            "selected events: {}",
            summary.selected
        );
        summary
    }
}

/// Reduction path.
#[derive(Debug, Clone)]
pub struct ReductionPipeline {
    reducer: Arc<EventReducer>,
    summary: ReductionSummary,
}

impl ReductionPipeline {
    /// Validate `cfg`, load the weight tables and build the pipeline.
    pub fn initialize(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        let tables = Arc::new(WeightTables::from_config(cfg)?);
        let reducer = EventReducer::new(cfg, tables)?;
        Ok(Self { reducer: Arc::new(reducer), summary: ReductionSummary::default() })
    }
}

impl EventProcessor for ReductionPipeline {
    type Summary = ReductionSummary;

    fn process_one(&mut self, index: u64, event: &Event) -> Outcome {
        match self.reducer.reduce(index, event) {
            Ok(reduction) => {
                self.summary.record(&reduction);
                match reduction {
                    Reduction::Emitted(record) => Outcome::Emitted(record),
                    Reduction::NoCandidate => {
                        tracing::debug!(event = index, "no photon candidate");
                        Outcome::Dropped(DropReason::NoCandidate)
                    }
                    Reduction::FailedSeparation => {
                        tracing::debug!(event = index, "photon aligned with missing energy");
                        Outcome::Dropped(DropReason::FailedSeparation)
                    }
                }
            }
            Err(e) => {
                tracing::debug!(event = index, error = %e, "malformed event");
                self.record_malformed(index, &e);
                Outcome::Dropped(DropReason::Malformed(e.to_string()))
            }
        }
    }

    fn record_malformed(&mut self, _index: u64, _err: &Error) {
        self.summary.record_malformed();
    }

    fn fork(&self) -> Self {
        Self { reducer: Arc::clone(&self.reducer), summary: ReductionSummary::default() }
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.summary.merge(&other.summary);
        Ok(())
    }

    fn finalize(self) -> ReductionSummary {
        let s = self.summary;
        tracing::info!(
            events = s.events,
            fake = s.fake_photons,
            malformed = s.malformed,
            sum_weight = s.sum_weight,
            "selected events: {}",
            s.emitted
        );
        s
    }
}

/// Drive `source` through `processor` one event at a time, writing emitted
/// records to `sink`.
///
/// Per-event source errors are counted as malformed; any other source error
/// and every sink error abort the run.
pub fn run_sequential<P: EventProcessor>(
    mut processor: P,
    source: &mut dyn EventSource,
    sink: &mut dyn RecordSink,
) -> Result<P::Summary> {
    tracing::debug!(source = source.name(), "run started");
    let mut index = 0u64;
    while let Some(item) = source.next_event() {
        match item {
            Ok(event) => {
                if let Outcome::Emitted(record) = processor.process_one(index, &event) {
                    sink.write_record(&record)?;
                }
            }
            Err(e) if e.is_per_event() => {
                tracing::warn!(event = index, error = %e, "skipping undecodable record");
                processor.record_malformed(index, &e);
            }
            Err(e) => return Err(e),
        }
        index += 1;
    }
    sink.flush()?;
    Ok(processor.finalize())
}

/// Process `events` in parallel chunks, one forked processor per chunk.
///
/// Records come back in input order; counters are identical to a
/// sequential run over the same events.
pub fn run_partitioned<P: EventProcessor>(
    processor: P,
    events: &[Event],
    chunk_size: usize,
) -> Result<(Vec<ReducedRecord>, P::Summary)> {
    partitioned(processor, events, chunk_size, |pos| pos as u64)
}

/// Like [`run_partitioned`], with `indices[i]` as the input position of
/// `events[i]`. Used when undecodable records were removed before the split.
pub fn run_partitioned_indexed<P: EventProcessor>(
    processor: P,
    events: &[Event],
    indices: &[u64],
    chunk_size: usize,
) -> Result<(Vec<ReducedRecord>, P::Summary)> {
    if indices.len() != events.len() {
        return Err(Error::Validation(format!(
            "{} indices for {} events",
            indices.len(),
            events.len()
        )));
    }
    partitioned(processor, events, chunk_size, |pos| indices[pos])
}

fn partitioned<P, F>(
    mut processor: P,
    events: &[Event],
    chunk_size: usize,
    index_of: F,
) -> Result<(Vec<ReducedRecord>, P::Summary)>
where
    P: EventProcessor,
    F: Fn(usize) -> u64 + Sync,
{
    let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };

    let parts: Vec<(P, Vec<ReducedRecord>)> = events
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let mut worker = processor.fork();
            let mut records = Vec::new();
            let offset = chunk_idx * chunk_size;
            for (i, event) in chunk.iter().enumerate() {
                if let Outcome::Emitted(record) = worker.process_one(index_of(offset + i), event) {
                    records.push(record);
                }
            }
            (worker, records)
        })
        .collect();

    let mut records = Vec::new();
    for (worker, part) in parts {
        processor.merge(worker)?;
        records.extend(part);
    }
    Ok((records, processor.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_core::{MissingEnergy, Photon, VecSink, VecSource};

    fn event(et: f64, met: Option<f64>) -> Event {
        Event {
            photons: vec![Photon {
                et,
                eta: 0.5,
                phi: 0.0,
                r9: 0.9,
                hover_e: 0.01,
                cov_ieta_ieta: 0.009,
                iso1: 0.0,
                iso2: 0.0,
                iso3: 0.0,
            }],
            met: met.map(|pt| MissingEnergy { pt, phi: Some(3.0) }).into_iter().collect(),
            npu: Some(20.0),
            ..Default::default()
        }
    }

    #[test]
    fn cutflow_outcomes() {
        let mut p = CutflowPipeline::initialize(&PipelineConfig::default()).unwrap();
        assert_eq!(p.process_one(0, &event(50.0, Some(40.0))), Outcome::Retained);
        assert_eq!(
            p.process_one(1, &event(20.0, Some(40.0))),
            Outcome::Dropped(DropReason::FailedCuts { first_failing: 1 })
        );
        assert!(matches!(
            p.process_one(2, &event(50.0, None)),
            Outcome::Dropped(DropReason::Malformed(_))
        ));
        let s = p.finalize();
        assert_eq!(s.counts, [2, 2, 1, 1, 1]);
        assert_eq!(s.selected, 1);
        assert_eq!(s.malformed, 1);
    }

    #[test]
    fn sequential_counts_source_errors_as_malformed() {
        let p = CutflowPipeline::initialize(&PipelineConfig::default()).unwrap();
        let mut src = VecSource::from_results(vec![
            Ok(event(50.0, Some(40.0))),
            Err(Error::MalformedRecord("line 2".into())),
        ]);
        let mut sink = VecSink::default();
        let s = run_sequential(p, &mut src, &mut sink).unwrap();
        assert_eq!(s.selected, 1);
        assert_eq!(s.malformed, 1);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn sequential_aborts_on_fatal_source_error() {
        let p = CutflowPipeline::initialize(&PipelineConfig::default()).unwrap();
        let io = std::io::Error::other("disk gone");
        let mut src = VecSource::from_results(vec![Err(Error::Io(io))]);
        let mut sink = VecSink::default();
        assert!(matches!(run_sequential(p, &mut src, &mut sink), Err(Error::Io(_))));
    }

    #[test]
    fn initialize_rejects_invalid_config() {
        let mut cfg = PipelineConfig::default();
        cfg.cuts.max_photon_eta = -1.0;
        assert!(matches!(CutflowPipeline::initialize(&cfg), Err(Error::Config(_))));
        // Reduction needs photon_id on top of valid cuts.
        assert!(matches!(
            ReductionPipeline::initialize(&PipelineConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn partitioned_matches_sequential() {
        let events: Vec<Event> = (0..257)
            .map(|i| match i % 4 {
                0 => event(50.0 + i as f64, Some(40.0)),
                1 => event(10.0, Some(40.0)),
                2 => event(80.0, Some(5.0)),
                _ => event(80.0, None),
            })
            .collect();

        let cfg = PipelineConfig::default();
        let mut sink = VecSink::default();
        let seq = run_sequential(
            CutflowPipeline::initialize(&cfg).unwrap(),
            &mut VecSource::new(events.clone()),
            &mut sink,
        )
        .unwrap();
        let (records, par) =
            run_partitioned(CutflowPipeline::initialize(&cfg).unwrap(), &events, 16).unwrap();

        assert!(records.is_empty());
        assert_eq!(seq, par);
        assert_eq!(par.selected, 65);
        assert_eq!(par.malformed, 64);
    }

    #[test]
    fn indexed_partition_keeps_input_positions() {
        let events = vec![event(50.0, Some(40.0)), event(60.0, None)];
        let p = CutflowPipeline::initialize(&PipelineConfig::default()).unwrap();
        assert!(matches!(
            run_partitioned_indexed(p.fork(), &events, &[0], 1),
            Err(Error::Validation(_))
        ));
        let (_, s) = run_partitioned_indexed(p, &events, &[0, 7], 1).unwrap();
        assert_eq!(s.selected, 1);
        assert_eq!(s.malformed, 1);
    }
}
