//! # Chunk orchestrator
//!
//! Top-level driver of an evaluation run. Splits the synthetic population
//! into disjoint id blocks (one per chunk), runs every chunk through the
//! generate → truth → external pipeline → reconcile sequence on a bounded
//! rayon pool, and merges the per-chunk tables in chunk-index order.
//!
//! ## Chunk independence
//!
//! Chunk `i` owns the id block `[i·object_count, (i+1)·object_count)` and
//! the RNG seed `base_seed + i`, so any chunk can be regenerated
//! bit-for-bit in isolation. A failing chunk poisons nothing: its error is
//! recorded in the [`RunOutcome`] and the merge skips it.
//!
//! Shared state is prepared once, before the pool starts: the Earth
//! ephemeris is loaded and checked against the observation epochs, and the
//! hypothesis grid is written at the run root where every chunk's Cluster
//! Linker invocation reads it.
//!
//! The merged tables are rewritten from the in-memory per-chunk results on
//! every run, so repeating a run over the same workspace converges to the
//! same merged files.

use std::fmt;
use std::fs;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{error, info};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::{generate_catalog, write_catalog};
use crate::chunk_workspace::{
    ChunkWorkspace, GUESS_GRID_FILE, MERGED_RECOVERED_FILE, MERGED_TRUTH_FILE,
};
use crate::constants::ObjectId;
use crate::earth_ephem::EarthEphemeris;
use crate::guess_grid::{generate_guess_grid, write_guess_grid};
use crate::heliobench_errors::HeliobenchError;
use crate::linkage::reconcile::{reconcile, write_recovered_table, RecoveredObjectRecord};
use crate::linkage::runner::{run_pipeline, PipelineReport};
use crate::run_config::RunConfig;
use crate::simulator::TrajectorySimulator;
use crate::truth::{extract_truth, write_truth_table, TruthRecord};

/// Everything one successful chunk produced.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    /// Fitted truth records of this chunk's id block, ordered by object id.
    pub truth: Vec<TruthRecord>,
    /// Reconciled linker output, in cluster-summary order.
    pub recovered: Vec<RecoveredObjectRecord>,
    pub pipeline: PipelineReport,
    pub elapsed: Duration,
}

/// Result of one chunk, kept even when the chunk failed.
#[derive(Debug)]
pub struct ChunkReport {
    pub chunk_index: usize,
    pub outcome: Result<ChunkOutcome, HeliobenchError>,
}

/// Summary of a whole evaluation run.
///
/// `chunks` is ordered by chunk index regardless of completion order.
#[derive(Debug)]
pub struct RunOutcome {
    pub chunks: Vec<ChunkReport>,
    pub merged_truth_count: usize,
    pub merged_recovered_count: usize,
    pub truth_path: Utf8PathBuf,
    pub recovered_path: Utf8PathBuf,
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Number of chunks whose pipeline failed.
    pub fn failed_chunk_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.outcome.is_err())
            .count()
    }

    /// True when every chunk completed.
    pub fn is_complete(&self) -> bool {
        self.failed_chunk_count() == 0
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Evaluation Run Outcome")?;
            writeln!(f, "----------------------")?;
            for chunk in &self.chunks {
                match &chunk.outcome {
                    Ok(outcome) => {
                        writeln!(
                            f,
                            "  chunk {:03}: {} truth / {} recovered rows, pair coverage {:.1}%, {:.2}s",
                            chunk.chunk_index,
                            outcome.truth.len(),
                            outcome.recovered.len(),
                            outcome.pipeline.pairs_coverage_percent,
                            outcome.elapsed.as_secs_f64(),
                        )?;
                        writeln!(f, "             {}", outcome.pipeline.tracklet_stage)?;
                        writeln!(f, "             {}", outcome.pipeline.linker_stage)?;
                    }
                    Err(err) => {
                        writeln!(f, "  chunk {:03}: FAILED: {err}", chunk.chunk_index)?
                    }
                }
            }
            writeln!(
                f,
                "  merged truth     : {} rows -> {}",
                self.merged_truth_count, self.truth_path
            )?;
            writeln!(
                f,
                "  merged recovered : {} rows -> {}",
                self.merged_recovered_count, self.recovered_path
            )?;
            write!(f, "  total            : {:.2}s", self.elapsed.as_secs_f64())
        } else {
            write!(
                f,
                "RunOutcome({}/{} chunks ok, truth={}, recovered={}, {:.2}s)",
                self.chunks.len() - self.failed_chunk_count(),
                self.chunks.len(),
                self.merged_truth_count,
                self.merged_recovered_count,
                self.elapsed.as_secs_f64(),
            )
        }
    }
}

/// Run the whole evaluation: every chunk, then the merge.
///
/// Arguments
/// ---------
/// * `config`: the complete run description; input files are checked first.
/// * `simulator`: trajectory backend, shared read-only by all workers.
///
/// Return
/// ------
/// * A [`RunOutcome`] with one [`ChunkReport`] per chunk in index order and
///   the merged table locations. Chunk failures are contained in their
///   reports; only pre-chunk setup errors (bad inputs, epochs outside the
///   ephemeris span, grid or pool construction) abort the run itself.
pub fn orchestrate<S: TrajectorySimulator + Sync>(
    config: &RunConfig,
    simulator: &S,
) -> Result<RunOutcome, HeliobenchError> {
    let started = Instant::now();

    config.validate_inputs()?;
    fs::create_dir_all(&config.output_dir)?;

    let ephemeris = EarthEphemeris::from_file(&config.earth_ephem_file)?;
    let (span_start, span_end) = ephemeris.span();
    for &epoch in config
        .epochs
        .iter()
        .chain(std::iter::once(&config.reference_epoch))
    {
        if !ephemeris.covers(epoch) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "epoch {epoch} is outside the Earth ephemeris span [{span_start}, {span_end}]"
            )));
        }
    }

    info!(config = %config, "starting evaluation run");

    let grid = generate_guess_grid(&config.guess_grid)?;
    let grid_path = config.output_dir.join(GUESS_GRID_FILE);
    write_guess_grid(&grid, &grid_path)?;
    info!(hypotheses = grid.len(), path = %grid_path, "hypothesis grid written");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_limit)
        .build()
        .map_err(|err| {
            HeliobenchError::InvalidRunParameter(format!(
                "cannot build a worker pool of {} threads: {err}",
                config.worker_limit
            ))
        })?;

    #[cfg(feature = "progress")]
    let pb = {
        let pb = ProgressBar::new(config.chunk_count.max(1) as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} chunks ({percent:>3}%) | ETA {eta_precise}",
            )
            .expect("indicatif template"),
        );
        pb.enable_steady_tick(Duration::from_millis(200));
        pb
    };

    let chunks: Vec<ChunkReport> = pool.install(|| {
        (0..config.chunk_count)
            .into_par_iter()
            .map(|chunk_index| {
                let outcome = run_chunk(config, simulator, &ephemeris, chunk_index);
                if let Err(err) = &outcome {
                    error!(chunk = chunk_index, %err, "chunk failed");
                }
                #[cfg(feature = "progress")]
                pb.inc(1);
                ChunkReport {
                    chunk_index,
                    outcome,
                }
            })
            .collect()
    });

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    let mut merged_truth = Vec::new();
    let mut merged_recovered = Vec::new();
    for report in &chunks {
        if let Ok(outcome) = &report.outcome {
            merged_truth.extend_from_slice(&outcome.truth);
            merged_recovered.extend_from_slice(&outcome.recovered);
        }
    }

    let truth_path = config.output_dir.join(MERGED_TRUTH_FILE);
    let recovered_path = config.output_dir.join(MERGED_RECOVERED_FILE);
    write_truth_table(&merged_truth, &truth_path)?;
    write_recovered_table(&merged_recovered, &recovered_path)?;

    let outcome = RunOutcome {
        chunks,
        merged_truth_count: merged_truth.len(),
        merged_recovered_count: merged_recovered.len(),
        truth_path,
        recovered_path,
        elapsed: started.elapsed(),
    };

    info!(
        ok_chunks = outcome.chunks.len() - outcome.failed_chunk_count(),
        chunk_count = outcome.chunks.len(),
        truth_rows = outcome.merged_truth_count,
        recovered_rows = outcome.merged_recovered_count,
        "evaluation run finished"
    );
    Ok(outcome)
}

/// Run one chunk end to end inside its own workspace directory.
fn run_chunk<S: TrajectorySimulator>(
    config: &RunConfig,
    simulator: &S,
    ephemeris: &EarthEphemeris,
    chunk_index: usize,
) -> Result<ChunkOutcome, HeliobenchError> {
    let started = Instant::now();
    let workspace = ChunkWorkspace::create(&config.output_dir, chunk_index)?;

    let seed = config.base_seed.wrapping_add(chunk_index as u64);
    let id_offset = (chunk_index * config.object_count) as ObjectId;
    let mut rng = StdRng::seed_from_u64(seed);
    info!(chunk = chunk_index, seed, id_offset, "generating synthetic catalog");

    let (detections, _population) =
        generate_catalog(simulator, config, ephemeris, id_offset, &mut rng)?;
    write_catalog(&detections, config, &workspace.catalog_path())?;

    let truth = extract_truth(&detections, config.reference_epoch, config.epoch_count())?;
    write_truth_table(&truth, &workspace.truth_path())?;

    let pipeline = run_pipeline(config, &workspace)?;

    let recovered = reconcile(
        &workspace.clusters_path(),
        &workspace.cluster_summary_path(),
        config.duplicate_policy,
    )?;
    write_recovered_table(&recovered, &workspace.recovered_path())?;

    info!(
        chunk = chunk_index,
        truth_rows = truth.len(),
        recovered_rows = recovered.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "chunk finished"
    );

    Ok(ChunkOutcome {
        chunk_index,
        truth,
        recovered,
        pipeline,
        elapsed: started.elapsed(),
    })
}
