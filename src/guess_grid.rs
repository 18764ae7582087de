//! # Guess grid generator
//!
//! Builds the finite grid of heliocentric (range, range-rate, range-acceleration)
//! hypotheses the Cluster Linker scans, and serializes it to the hypothesis file
//! passed to the tool through its `-heliodist` flag.
//!
//! The three axes are spaced independently. The raw rate axis holds *fractions*
//! in `[-1, 1]`: each fraction is scaled by the local escape velocity at the row's
//! range, so physical range-rates stay dynamically plausible at every distance.
//! The acceleration axis is expressed in units of the local gravitational
//! acceleration `GM/r²`, the convention the Cluster Linker expects.
//!
//! All numeric fields are rounded to a fixed number of decimals before the grid
//! leaves this module. The file is written once per run and shared read-only by
//! every chunk, so the rounded form doubles as a stable deduplication key.
//!
//! ## Example
//!
//! ```rust,no_run
//! use heliobench::guess_grid::{generate_guess_grid, write_guess_grid, GuessGridConfig};
//!
//! let config = GuessGridConfig::default();
//! let grid = generate_guess_grid(&config)?;
//! write_guess_grid(&grid, "hypo.csv".into())?;
//! # Ok::<(), heliobench::HeliobenchError>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use itertools::iproduct;

use crate::constants::GAUSS_GRAV_SQUARED;
use crate::heliobench_errors::HeliobenchError;

/// Header line of the hypothesis file, fixed by the Cluster Linker.
pub const GUESS_GRID_HEADER: &str = "#r(AU) rdot(AU/day) norm mean_accel";

/// Spacing law for the heliocentric range axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSpacing {
    Linear,
    /// Logarithmic spacing, denser close to the Sun.
    Log,
}

/// One row of the hypothesis grid.
///
/// `range` in AU, `range_rate` in AU/day, `mean_accel` in units of the local
/// gravitational acceleration `GM/r²`. `norm` is the normalization weight
/// copied verbatim into every row. All fields are already rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuessHypothesis {
    pub range: f64,
    pub range_rate: f64,
    pub norm: f64,
    pub mean_accel: f64,
}

/// Axis bounds, counts and rounding for the hypothesis grid.
///
/// Validated by [`GuessGridConfig::validate`] before any grid is produced;
/// invalid bounds are configuration errors, reported immediately and never
/// retried.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessGridConfig {
    /// Range axis bounds (AU), `min < max`, `min > 0`.
    pub range_min: f64,
    pub range_max: f64,
    pub range_count: usize,
    pub range_spacing: GridSpacing,

    /// Raw rate-axis fractions in `[-1, 1]`, scaled per row by the local
    /// escape velocity.
    pub rate_fraction_min: f64,
    pub rate_fraction_max: f64,
    pub rate_count: usize,

    /// Acceleration axis bounds, in units of `GM/r²`.
    pub accel_min: f64,
    pub accel_max: f64,
    pub accel_count: usize,

    /// Normalization weight written to every row.
    pub norm: f64,

    /// Decimal precision applied to every numeric field.
    pub decimals: u32,
}

impl Default for GuessGridConfig {
    fn default() -> Self {
        Self {
            range_min: 1.5,
            range_max: 50.0,
            range_count: 40,
            range_spacing: GridSpacing::Linear,

            rate_fraction_min: -0.9,
            rate_fraction_max: 0.9,
            rate_count: 21,

            accel_min: -1.0,
            accel_max: 1.0,
            accel_count: 3,

            norm: 1.0,
            decimals: 3,
        }
    }
}

impl GuessGridConfig {
    /// Check bounds, counts and rounding for consistency.
    ///
    /// All comparisons are written so that a NaN bound fails validation
    /// rather than slipping through.
    pub fn validate(&self) -> Result<(), HeliobenchError> {
        if !(self.range_min < self.range_max) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: require range_min < range_max, got [{}, {}]",
                self.range_min, self.range_max
            )));
        }
        if !(self.range_min > 0.0) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: range_min must be > 0 AU, got {}",
                self.range_min
            )));
        }
        if !(self.rate_fraction_min < self.rate_fraction_max) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: require rate_fraction_min < rate_fraction_max, got [{}, {}]",
                self.rate_fraction_min, self.rate_fraction_max
            )));
        }
        if !(self.rate_fraction_min >= -1.0) || !(self.rate_fraction_max <= 1.0) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: rate fractions must lie in [-1, 1], got [{}, {}]",
                self.rate_fraction_min, self.rate_fraction_max
            )));
        }
        if !(self.accel_min < self.accel_max) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: require accel_min < accel_max, got [{}, {}]",
                self.accel_min, self.accel_max
            )));
        }
        if self.range_count == 0 || self.rate_count == 0 || self.accel_count == 0 {
            return Err(HeliobenchError::InvalidRunParameter(
                "guess grid: axis counts must be >= 1".into(),
            ));
        }
        if !(self.norm > 0.0) {
            return Err(HeliobenchError::InvalidRunParameter(format!(
                "guess grid: norm must be > 0, got {}",
                self.norm
            )));
        }
        Ok(())
    }
}

/// Local escape velocity at heliocentric distance `range`, AU/day.
pub(crate) fn escape_velocity(range: f64) -> f64 {
    (2.0 * GAUSS_GRAV_SQUARED / range).sqrt()
}

/// `count` evenly spaced points over `[min, max]`, endpoints included.
fn linspace(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![min];
    }
    let step = (max - min) / (count - 1) as f64;
    (0..count).map(|i| min + step * i as f64).collect()
}

/// `count` logarithmically spaced points over `[min, max]`, endpoints included.
fn logspace(min: f64, max: f64, count: usize) -> Vec<f64> {
    linspace(min.ln(), max.ln(), count)
        .into_iter()
        .map(f64::exp)
        .collect()
}

/// Round `value` to `decimals` decimal places.
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Build the full Cartesian product of the three hypothesis axes.
///
/// Arguments
/// ---------
/// * `config`: validated axis bounds, counts, spacing and rounding.
///
/// Return
/// ------
/// * Exactly `range_count × rate_count × accel_count` hypotheses, range axis
///   outermost, every field rounded to `config.decimals` places.
pub fn generate_guess_grid(
    config: &GuessGridConfig,
) -> Result<Vec<GuessHypothesis>, HeliobenchError> {
    config.validate()?;

    let ranges = match config.range_spacing {
        GridSpacing::Linear => linspace(config.range_min, config.range_max, config.range_count),
        GridSpacing::Log => logspace(config.range_min, config.range_max, config.range_count),
    };
    let fractions = linspace(
        config.rate_fraction_min,
        config.rate_fraction_max,
        config.rate_count,
    );
    let accels = linspace(config.accel_min, config.accel_max, config.accel_count);

    let grid = iproduct!(&ranges, &fractions, &accels)
        .map(|(&range, &fraction, &accel)| GuessHypothesis {
            range: round_to(range, config.decimals),
            range_rate: round_to(fraction * escape_velocity(range), config.decimals),
            norm: round_to(config.norm, config.decimals),
            mean_accel: round_to(accel, config.decimals),
        })
        .collect();

    Ok(grid)
}

/// Serialize the grid to the whitespace-delimited hypothesis file.
///
/// The header and column order are part of the Cluster Linker's input
/// contract and must not change.
pub fn write_guess_grid(grid: &[GuessHypothesis], path: &Utf8Path) -> Result<(), HeliobenchError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{GUESS_GRID_HEADER}")?;
    for hypothesis in grid {
        writeln!(
            writer,
            "{} {} {} {}",
            hypothesis.range, hypothesis.range_rate, hypothesis.norm, hypothesis.mean_accel
        )?;
    }
    writer.flush()?;
    Ok(())
}
