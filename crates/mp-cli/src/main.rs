//! monophoton CLI

mod io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mp_core::{Event, EventSource, RecordSink, ReducedRecord, VecSink};
use mp_select::pipeline::{DEFAULT_CHUNK_SIZE, EventProcessor, run_partitioned_indexed};
use mp_select::{CutflowPipeline, PipelineConfig, ReductionPipeline, run_sequential};
use std::path::{Path, PathBuf};

use crate::io::{JsonlEventSource, JsonlRecordSink};

#[derive(Parser)]
#[command(name = "monophoton")]
#[command(about = "Monophoton event selection and reduction")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cutflow and write the summary (pretty JSON)
    Select {
        /// Pipeline configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input events (JSON lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto). 1 streams the input without loading it.
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Events per parallel task (ignored with --threads 1)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Reduce events into weighted records
    Reduce {
        /// Pipeline configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Input events (JSON lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for reduced records (JSON lines)
        #[arg(long)]
        records: PathBuf,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto). 1 streams the input without loading it.
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Events per parallel task (ignored with --threads 1)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Validate a pipeline configuration
    ValidateConfig {
        /// Pipeline configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for the report (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Select { config, input, output, threads, chunk_size } => {
            let cfg = load_config(&config, cli.log_level)?;
            cmd_select(&cfg, &input, output.as_ref(), threads, chunk_size)
        }
        Commands::Reduce { config, input, records, output, threads, chunk_size } => {
            let cfg = load_config(&config, cli.log_level)?;
            cmd_reduce(&cfg, &input, &records, output.as_ref(), threads, chunk_size)
        }
        Commands::ValidateConfig { config, output } => {
            init_logging(cli.log_level, false);
            cmd_validate_config(&config, output.as_ref())
        }
    }
}

fn init_logging(level: tracing::Level, verbose: bool) {
    let level = if verbose { level.max(tracing::Level::DEBUG) } else { level };
    // stdout carries the JSON summary.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path, level: tracing::Level) -> Result<PipelineConfig> {
    let cfg = PipelineConfig::from_path(path)?;
    init_logging(level, cfg.verbose);
    tracing::info!(path = %path.display(), verbose = cfg.verbose, "configuration loaded");
    Ok(cfg)
}

fn cmd_select(
    cfg: &PipelineConfig,
    input: &Path,
    output: Option<&PathBuf>,
    threads: usize,
    chunk_size: usize,
) -> Result<()> {
    let pipeline = CutflowPipeline::initialize(cfg)?;
    let summary = if threads == 1 {
        let mut source = JsonlEventSource::open(input)?;
        run_sequential(pipeline, &mut source, &mut VecSink::default())?
    } else {
        let loaded = load_events(input, pipeline, threads)?;
        loaded.run(chunk_size)?.1
    };

    let mut value = serde_json::to_value(&summary)?;
    value["display_labels"] = serde_json::json!(summary.display_labels());
    write_json(output, value)
}

fn cmd_reduce(
    cfg: &PipelineConfig,
    input: &Path,
    records: &Path,
    output: Option<&PathBuf>,
    threads: usize,
    chunk_size: usize,
) -> Result<()> {
    let pipeline = ReductionPipeline::initialize(cfg)?;
    let mut sink = JsonlRecordSink::create(records)?;
    let summary = if threads == 1 {
        let mut source = JsonlEventSource::open(input)?;
        run_sequential(pipeline, &mut source, &mut sink)?
    } else {
        let (reduced, summary) = load_events(input, pipeline, threads)?.run(chunk_size)?;
        for record in &reduced {
            sink.write_record(record)?;
        }
        sink.flush()?;
        summary
    };
    tracing::info!(path = %records.display(), records = summary.emitted, "records written");

    write_json(output, serde_json::to_value(&summary)?)
}

fn cmd_validate_config(path: &Path, output: Option<&PathBuf>) -> Result<()> {
    let cfg = PipelineConfig::from_path(path)?;
    let reduction = ReductionPipeline::initialize(&cfg).err().map(|e| e.to_string());
    write_json(
        output,
        serde_json::json!({
            "valid": true,
            "cuts": cfg.cuts,
            "photon_id": cfg.photon_id.is_some(),
            "pileup": cfg.pileup.is_some(),
            "kfactor": cfg.kfactor.is_some(),
            "sample_kind": cfg.sample.kind,
            "lumi_scale": cfg.sample.lumi_scale(),
            "reduction_ready": reduction.is_none(),
            "reduction_error": reduction,
        }),
    )
}

/// Decoded input held in memory for a partitioned run.
struct Loaded<P> {
    processor: P,
    events: Vec<Event>,
    indices: Vec<u64>,
}

impl<P: EventProcessor> Loaded<P> {
    fn run(self, chunk_size: usize) -> Result<(Vec<ReducedRecord>, P::Summary)> {
        Ok(run_partitioned_indexed(self.processor, &self.events, &self.indices, chunk_size)?)
    }
}

/// Read every event into memory. Undecodable lines are accounted on
/// `processor` before the partitioning starts.
fn load_events<P: EventProcessor>(
    input: &Path,
    mut processor: P,
    threads: usize,
) -> Result<Loaded<P>> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let mut source = JsonlEventSource::open(input)?;
    let mut events = Vec::new();
    let mut indices = Vec::new();
    let mut index = 0u64;
    while let Some(item) = source.next_event() {
        match item {
            Ok(event) => {
                events.push(event);
                indices.push(index);
            }
            Err(e) if e.is_per_event() => {
                tracing::warn!(event = index, error = %e, "skipping undecodable record");
                processor.record_malformed(index, &e);
            }
            Err(e) => return Err(e.into()),
        }
        index += 1;
    }
    tracing::info!(source = source.name(), events = events.len(), "events loaded");
    Ok(Loaded { processor, events, indices })
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
