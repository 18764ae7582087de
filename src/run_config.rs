//! # Run configuration
//!
//! This module defines the [`RunConfig`] struct and its builder, which carry
//! every tunable of an evaluation run: the synthetic population and its
//! observation cadence, the chunking and worker-pool layout, the hypothesis
//! grid, and the locations of the two external executables and their shared
//! input files.
//!
//! ## Purpose
//!
//! All state flows through this one explicit object; nothing in the crate
//! reads process-wide defaults. A [`RunConfig`] is immutable once built and is
//! shared read-only across all chunk workers.
//!
//! Construction is two-phase:
//!
//! 1. [`RunConfigBuilder::build`] validates everything that can be checked
//!    without touching the filesystem (bounds, counts, required fields).
//! 2. [`RunConfig::validate_inputs`] checks that the shared input files exist,
//!    right before the orchestrator starts spending time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use heliobench::run_config::RunConfig;
//!
//! let config = RunConfig::builder()
//!     .object_count(400)
//!     .chunk_count(4)
//!     .worker_limit(2)
//!     .base_seed(7)
//!     .make_tracklets_bin("heliolinc2/make_tracklets")
//!     .heliolinc_bin("heliolinc2/heliolinc")
//!     .earth_ephem_file("heliolinc2/tests/Earth1day2020s_02a.txt")
//!     .obscode_file("heliolinc2/tests/ObsCodes.txt")
//!     .colformat_file("colformat.txt")
//!     .output_dir("./runs/small")
//!     .build()?;
//! # Ok::<(), heliobench::HeliobenchError>(())
//! ```

use std::cmp::Ordering::Greater;
use std::fmt;

use camino::Utf8PathBuf;

use crate::constants::{MpcCode, MJD};
use crate::guess_grid::GuessGridConfig;
use crate::heliobench_errors::HeliobenchError;
use crate::linkage::reconcile::DuplicatePolicy;

/// Complete configuration of one evaluation run.
///
/// Fields
/// -----------------
/// **Synthetic population / catalog**
/// * `epochs` – observation epochs (MJD), strictly increasing, at least 3
///   (the truth fit is quadratic).
/// * `reference_epoch` – expansion point of the truth fit and the epoch passed
///   to the Cluster Linker's `-mjd` flag. Defaults to the middle epoch.
/// * `object_count` – synthetic objects **per chunk**.
/// * `mag`, `band`, `obscode` – constant photometry columns of the catalog.
///
/// **Chunking / workers**
/// * `chunk_count` – number of independent chunks; chunk `i` owns the id block
///   `[i·object_count, (i+1)·object_count)` and RNG seed `base_seed + i`.
/// * `worker_limit` – size of the thread pool running chunks; independent of
///   `chunk_count`.
/// * `base_seed` – base of the per-chunk deterministic seeds.
///
/// **Hypothesis grid**
/// * `guess_grid` – axis bounds/counts/rounding, see
///   [`GuessGridConfig`](crate::guess_grid::GuessGridConfig).
///
/// **Reconciliation**
/// * `duplicate_policy` – treatment of a cluster number that the linker's
///   detail table maps to two different identities, see [`DuplicatePolicy`].
///
/// **External tools / shared inputs**
/// * `make_tracklets_bin`, `heliolinc_bin` – the two executables. A bare name
///   resolves through `PATH` at spawn time; a path containing `/` must exist.
/// * `earth_ephem_file` – Earth state table, consumed both by the tools and by
///   the catalog generator (observer position).
/// * `obscode_file`, `colformat_file` – passed through to the Tracklet
///   Builder, never parsed by this crate.
/// * `max_velocity` – optional `-maxvel` (deg/day); `max_time_separation` –
///   optional `-maxtime` (days).
///
/// **Output**
/// * `output_dir` – run root; chunk workspaces and merged tables land here.
///
/// Defaults
/// -----------------
/// The builder starts from the single-chunk reference workload: 10 000
/// objects, the two-visits-per-night cadence of [`RunConfig::default_epochs`],
/// magnitude 20.0 in band `r` at observatory `W84`, one worker, seed 42.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    // --- Synthetic population / catalog ---
    pub epochs: Vec<MJD>,
    pub reference_epoch: MJD,
    pub object_count: usize,
    pub mag: f64,
    pub band: String,
    pub obscode: MpcCode,

    // --- Chunking / workers ---
    pub chunk_count: usize,
    pub worker_limit: usize,
    pub base_seed: u64,

    // --- Hypothesis grid ---
    pub guess_grid: GuessGridConfig,

    // --- Reconciliation ---
    pub duplicate_policy: DuplicatePolicy,

    // --- External tools / shared inputs ---
    pub make_tracklets_bin: Utf8PathBuf,
    pub heliolinc_bin: Utf8PathBuf,
    pub earth_ephem_file: Utf8PathBuf,
    pub obscode_file: Utf8PathBuf,
    pub colformat_file: Utf8PathBuf,
    pub max_velocity: Option<f64>,
    pub max_time_separation: Option<f64>,

    // --- Output ---
    pub output_dir: Utf8PathBuf,
}

impl RunConfig {
    /// Create a new [`RunConfigBuilder`] initialized with the defaults above.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// The reference observation cadence: two visits per night on nights 0, 7
    /// and 13 of the window, starting at MJD 60676.5.
    pub fn default_epochs() -> Vec<MJD> {
        [0.5, 0.6, 7.5, 7.6, 13.5, 13.6]
            .iter()
            .map(|offset| 60676.0 + offset)
            .collect()
    }

    /// Number of observation epochs, i.e. detections per object.
    pub fn epoch_count(&self) -> usize {
        self.epochs.len()
    }

    /// Total synthetic objects across all chunks.
    pub fn total_object_count(&self) -> usize {
        self.object_count * self.chunk_count
    }

    /// Check that every shared input file exists.
    ///
    /// Tool paths are only checked when they contain a path separator; bare
    /// names are left to `PATH` resolution at spawn time. Called by the
    /// orchestrator before any chunk work starts.
    pub fn validate_inputs(&self) -> Result<(), HeliobenchError> {
        for path in [
            &self.earth_ephem_file,
            &self.obscode_file,
            &self.colformat_file,
        ] {
            if !path.is_file() {
                return Err(HeliobenchError::InputFileNotFound(path.to_string()));
            }
        }
        for tool in [&self.make_tracklets_bin, &self.heliolinc_bin] {
            if tool.as_str().contains('/') && !tool.is_file() {
                return Err(HeliobenchError::InputFileNotFound(tool.to_string()));
            }
        }
        Ok(())
    }
}

/// Builder for [`RunConfig`], with validation.
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    epochs: Vec<MJD>,
    reference_epoch: Option<MJD>,
    object_count: usize,
    mag: f64,
    band: String,
    obscode: MpcCode,

    chunk_count: usize,
    worker_limit: usize,
    base_seed: u64,

    guess_grid: GuessGridConfig,
    duplicate_policy: DuplicatePolicy,

    make_tracklets_bin: Option<Utf8PathBuf>,
    heliolinc_bin: Option<Utf8PathBuf>,
    earth_ephem_file: Option<Utf8PathBuf>,
    obscode_file: Option<Utf8PathBuf>,
    colformat_file: Option<Utf8PathBuf>,
    max_velocity: Option<f64>,
    max_time_separation: Option<f64>,

    output_dir: Option<Utf8PathBuf>,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            epochs: RunConfig::default_epochs(),
            reference_epoch: None,
            object_count: 10_000,
            mag: 20.0,
            band: "r".into(),
            obscode: "W84".into(),

            chunk_count: 1,
            worker_limit: 1,
            base_seed: 42,

            guess_grid: GuessGridConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),

            make_tracklets_bin: None,
            heliolinc_bin: None,
            earth_ephem_file: None,
            obscode_file: None,
            colformat_file: None,
            max_velocity: None,
            max_time_separation: None,

            output_dir: None,
        }
    }

    // --- Synthetic population / catalog ---
    pub fn epochs(mut self, v: Vec<MJD>) -> Self {
        self.epochs = v;
        self
    }
    /// Override the default (middle-epoch) reference epoch.
    pub fn reference_epoch(mut self, v: MJD) -> Self {
        self.reference_epoch = Some(v);
        self
    }
    pub fn object_count(mut self, v: usize) -> Self {
        self.object_count = v;
        self
    }
    pub fn mag(mut self, v: f64) -> Self {
        self.mag = v;
        self
    }
    pub fn band(mut self, v: impl Into<String>) -> Self {
        self.band = v.into();
        self
    }
    pub fn obscode(mut self, v: impl Into<MpcCode>) -> Self {
        self.obscode = v.into();
        self
    }

    // --- Chunking / workers ---
    pub fn chunk_count(mut self, v: usize) -> Self {
        self.chunk_count = v;
        self
    }
    pub fn worker_limit(mut self, v: usize) -> Self {
        self.worker_limit = v;
        self
    }
    pub fn base_seed(mut self, v: u64) -> Self {
        self.base_seed = v;
        self
    }

    // --- Hypothesis grid ---
    pub fn guess_grid(mut self, v: GuessGridConfig) -> Self {
        self.guess_grid = v;
        self
    }

    // --- Reconciliation ---
    pub fn duplicate_policy(mut self, v: DuplicatePolicy) -> Self {
        self.duplicate_policy = v;
        self
    }

    // --- External tools / shared inputs ---
    pub fn make_tracklets_bin(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.make_tracklets_bin = Some(v.into());
        self
    }
    pub fn heliolinc_bin(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.heliolinc_bin = Some(v.into());
        self
    }
    pub fn earth_ephem_file(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.earth_ephem_file = Some(v.into());
        self
    }
    pub fn obscode_file(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.obscode_file = Some(v.into());
        self
    }
    pub fn colformat_file(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.colformat_file = Some(v.into());
        self
    }
    pub fn max_velocity(mut self, v: f64) -> Self {
        self.max_velocity = Some(v);
        self
    }
    pub fn max_time_separation(mut self, v: f64) -> Self {
        self.max_time_separation = Some(v);
        self
    }

    // --- Output ---
    pub fn output_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.output_dir = Some(v.into());
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Finalize the builder and produce a [`RunConfig`].
    ///
    /// Validation rules
    /// -----------------
    /// * at least 3 epochs, strictly increasing, all finite;
    /// * `object_count`, `chunk_count`, `worker_limit` all ≥ 1;
    /// * `mag` finite, `band` and `obscode` non-empty;
    /// * `max_velocity` / `max_time_separation`, when given, strictly positive;
    /// * the guess grid bounds pass [`GuessGridConfig::validate`];
    /// * both executables, the three shared input files and the output
    ///   directory are set.
    ///
    /// File existence is deliberately **not** checked here; see
    /// [`RunConfig::validate_inputs`].
    pub fn build(self) -> Result<RunConfig, HeliobenchError> {
        if self.epochs.len() < 3 {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "at least 3 observation epochs are required for the quadratic truth fit, got {}",
                self.epochs.len()
            )));
        }
        if self.epochs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(HeliobenchError::InvalidRunParameter(
                "observation epochs must be finite and strictly increasing".into(),
            ));
        }

        let reference_epoch = match self.reference_epoch {
            Some(epoch) if epoch.is_finite() => epoch,
            Some(epoch) => {
                return Err(HeliobenchError::InvalidRunParameter(format!(
                    "reference epoch must be finite, got {epoch}"
                )))
            }
            None => self.epochs[(self.epochs.len() - 1) / 2],
        };

        if self.object_count == 0 {
            return Err(HeliobenchError::InvalidRunParameter(
                "object_count must be >= 1".into(),
            ));
        }
        if self.chunk_count == 0 {
            return Err(HeliobenchError::InvalidRunParameter(
                "chunk_count must be >= 1".into(),
            ));
        }
        if self.worker_limit == 0 {
            return Err(HeliobenchError::InvalidRunParameter(
                "worker_limit must be >= 1".into(),
            ));
        }

        if !self.mag.is_finite() {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "mag must be finite, got {}",
                self.mag
            )));
        }
        if self.band.is_empty() || self.obscode.is_empty() {
            return Err(HeliobenchError::InvalidRunParameter(
                "band and obscode must be non-empty".into(),
            ));
        }

        if let Some(v) = self.max_velocity {
            if !Self::gt0(v) {
                return Err(HeliobenchError::InvalidRunParameter(format!(
                    "max_velocity must be > 0 deg/day, got {v}"
                )));
            }
        }
        if let Some(v) = self.max_time_separation {
            if !Self::gt0(v) {
                return Err(HeliobenchError::InvalidRunParameter(format!(
                    "max_time_separation must be > 0 days, got {v}"
                )));
            }
        }

        self.guess_grid.validate()?;

        let require = |field: Option<Utf8PathBuf>, name: &str| {
            field.ok_or_else(|| {
                HeliobenchError::InvalidRunParameter(format!("{name} is required"))
            })
        };

        Ok(RunConfig {
            epochs: self.epochs,
            reference_epoch,
            object_count: self.object_count,
            mag: self.mag,
            band: self.band,
            obscode: self.obscode,

            chunk_count: self.chunk_count,
            worker_limit: self.worker_limit,
            base_seed: self.base_seed,

            guess_grid: self.guess_grid,
            duplicate_policy: self.duplicate_policy,

            make_tracklets_bin: require(self.make_tracklets_bin, "make_tracklets_bin")?,
            heliolinc_bin: require(self.heliolinc_bin, "heliolinc_bin")?,
            earth_ephem_file: require(self.earth_ephem_file, "earth_ephem_file")?,
            obscode_file: require(self.obscode_file, "obscode_file")?,
            colformat_file: require(self.colformat_file, "colformat_file")?,
            max_velocity: self.max_velocity,
            max_time_separation: self.max_time_separation,

            output_dir: require(self.output_dir, "output_dir")?,
        })
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 50; // width reserved for "name = value"
            writeln!(f, "Evaluation Run Configuration")?;
            writeln!(f, "----------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Synthetic population]")?;
            line!(
                "object_count         = {}",
                self.object_count,
                "Objects per chunk"
            )?;
            line!(
                "epochs               = {}",
                format!(
                    "{} in [{:.3}, {:.3}]",
                    self.epochs.len(),
                    self.epochs[0],
                    self.epochs[self.epochs.len() - 1]
                ),
                "Observation epochs (MJD)"
            )?;
            line!(
                "reference_epoch      = {:.3}",
                self.reference_epoch,
                format!(
                    "Truth fit / Cluster Linker -mjd ({})",
                    hifitime::Epoch::from_mjd_utc(self.reference_epoch)
                )
            )?;
            line!("mag                  = {:.2}", self.mag, "Catalog magnitude")?;
            line!("band                 = {}", self.band, "Photometric band")?;
            line!("obscode              = {}", self.obscode, "Observatory code")?;

            writeln!(f, "\n[Chunking / workers]")?;
            line!(
                "chunk_count          = {}",
                self.chunk_count,
                "Independent id blocks"
            )?;
            line!(
                "worker_limit         = {}",
                self.worker_limit,
                "Thread pool size"
            )?;
            line!(
                "base_seed            = {}",
                self.base_seed,
                "Chunk i uses base_seed + i"
            )?;

            writeln!(f, "\n[Hypothesis grid]")?;
            line!(
                "range                = {}",
                format!(
                    "[{}, {}] x{} ({:?})",
                    self.guess_grid.range_min,
                    self.guess_grid.range_max,
                    self.guess_grid.range_count,
                    self.guess_grid.range_spacing
                ),
                "AU"
            )?;
            line!(
                "rate fractions       = {}",
                format!(
                    "[{}, {}] x{}",
                    self.guess_grid.rate_fraction_min,
                    self.guess_grid.rate_fraction_max,
                    self.guess_grid.rate_count
                ),
                "Scaled by local escape velocity"
            )?;
            line!(
                "mean_accel           = {}",
                format!(
                    "[{}, {}] x{}",
                    self.guess_grid.accel_min, self.guess_grid.accel_max, self.guess_grid.accel_count
                ),
                "Units of GM/r^2"
            )?;
            line!(
                "norm / decimals      = {}",
                format!("{} / {}", self.guess_grid.norm, self.guess_grid.decimals),
                "Row weight, rounding"
            )?;

            writeln!(f, "\n[Reconciliation]")?;
            line!(
                "duplicate_policy     = {:?}",
                self.duplicate_policy,
                "Conflicting cluster identities"
            )?;

            writeln!(f, "\n[External tools]")?;
            line!(
                "make_tracklets       = {}",
                self.make_tracklets_bin,
                "Tracklet Builder executable"
            )?;
            line!(
                "heliolinc            = {}",
                self.heliolinc_bin,
                "Cluster Linker executable"
            )?;
            line!(
                "earth_ephem_file     = {}",
                self.earth_ephem_file,
                "Earth state table"
            )?;
            line!(
                "obscode_file         = {}",
                self.obscode_file,
                "Observatory codes (pass-through)"
            )?;
            line!(
                "colformat_file       = {}",
                self.colformat_file,
                "Catalog column map (pass-through)"
            )?;
            line!(
                "max_velocity         = {}",
                self.max_velocity
                    .map(|v| format!("{v:.3} deg/day"))
                    .unwrap_or_else(|| "-".into()),
                "Optional -maxvel"
            )?;
            line!(
                "max_time_separation  = {}",
                self.max_time_separation
                    .map(|v| format!("{v:.3} d"))
                    .unwrap_or_else(|| "-".into()),
                "Optional -maxtime"
            )?;

            writeln!(f, "\n[Output]")?;
            line!("output_dir           = {}", self.output_dir, "Run root")?;

            Ok(())
        } else {
            write!(
                f,
                "RunConfig(chunks={}x{} objects, epochs={}, ref={:.3}, workers={}, seed={}, grid={}x{}x{})",
                self.chunk_count,
                self.object_count,
                self.epochs.len(),
                self.reference_epoch,
                self.worker_limit,
                self.base_seed,
                self.guess_grid.range_count,
                self.guess_grid.rate_count,
                self.guess_grid.accel_count,
            )
        }
    }
}

#[cfg(test)]
mod test_run_config {
    use super::*;

    fn builder_with_paths() -> RunConfigBuilder {
        RunConfig::builder()
            .make_tracklets_bin("make_tracklets")
            .heliolinc_bin("heliolinc")
            .earth_ephem_file("earth.txt")
            .obscode_file("ObsCodes.txt")
            .colformat_file("colformat.txt")
            .output_dir("./out")
    }

    #[test]
    fn test_reference_epoch_defaults_to_middle() {
        let config = builder_with_paths().build().unwrap();
        assert_eq!(config.reference_epoch, 60683.5);
        assert_eq!(config.epoch_count(), 6);
    }

    #[test]
    fn test_explicit_reference_epoch_wins() {
        let config = builder_with_paths().reference_epoch(60680.0).build().unwrap();
        assert_eq!(config.reference_epoch, 60680.0);
    }

    #[test]
    fn test_too_few_epochs_rejected() {
        let result = builder_with_paths()
            .epochs(vec![60676.5, 60676.6])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_non_increasing_epochs_rejected() {
        let result = builder_with_paths()
            .epochs(vec![60676.5, 60676.5, 60677.0])
            .build();
        assert!(result.is_err());

        let result = builder_with_paths()
            .epochs(vec![60676.5, f64::NAN, 60677.0])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(builder_with_paths().object_count(0).build().is_err());
        assert!(builder_with_paths().chunk_count(0).build().is_err());
        assert!(builder_with_paths().worker_limit(0).build().is_err());
    }

    #[test]
    fn test_missing_required_path_rejected() {
        let result = RunConfig::builder()
            .make_tracklets_bin("make_tracklets")
            .heliolinc_bin("heliolinc")
            .earth_ephem_file("earth.txt")
            .obscode_file("ObsCodes.txt")
            .colformat_file("colformat.txt")
            // no output_dir
            .build();
        assert!(matches!(
            result,
            Err(HeliobenchError::InvalidRunParameter(msg)) if msg.contains("output_dir")
        ));
    }

    #[test]
    fn test_non_positive_tracklet_limits_rejected() {
        assert!(builder_with_paths().max_velocity(0.0).build().is_err());
        assert!(builder_with_paths().max_time_separation(-1.0).build().is_err());
    }

    #[test]
    fn test_validate_inputs_checks_shared_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for name in ["earth.txt", "ObsCodes.txt", "colformat.txt"] {
            std::fs::write(root.join(name), "x\n").unwrap();
        }

        let config = RunConfig::builder()
            .make_tracklets_bin("make_tracklets")
            .heliolinc_bin("heliolinc")
            .earth_ephem_file(root.join("earth.txt"))
            .obscode_file(root.join("ObsCodes.txt"))
            .colformat_file(root.join("colformat.txt"))
            .output_dir(root.join("out"))
            .build()
            .unwrap();
        assert!(config.validate_inputs().is_ok());

        let mut broken = config.clone();
        broken.earth_ephem_file = root.join("missing.txt");
        assert!(matches!(
            broken.validate_inputs(),
            Err(HeliobenchError::InputFileNotFound(_))
        ));

        // Tool given as an explicit path must exist; a bare name is deferred
        // to PATH resolution.
        let mut tool_path = config.clone();
        tool_path.heliolinc_bin = root.join("not_built/heliolinc");
        assert!(tool_path.validate_inputs().is_err());
    }

    #[test]
    fn test_total_object_count() {
        let config = builder_with_paths()
            .object_count(250)
            .chunk_count(4)
            .build()
            .unwrap();
        assert_eq!(config.total_object_count(), 1000);
    }

    #[test]
    fn test_display_modes() {
        let config = builder_with_paths().build().unwrap();

        let compact = format!("{config}");
        assert!(compact.starts_with("RunConfig("));
        assert!(compact.contains("epochs=6"));

        let verbose = format!("{config:#}");
        assert!(verbose.contains("[Hypothesis grid]"));
        assert!(verbose.contains("duplicate_policy"));
        // MJD 60683.5 is 2025-01-08 12:00 UTC.
        assert!(verbose.contains("2025-01-08"));
    }
}
