//! # Earth ephemeris table
//!
//! Reader and interpolator for the heliolinc-style Earth ephemeris file that
//! the external tools also consume (`-earth` flag). The same table doubles as
//! the observer position source for the synthetic catalog generator, so the
//! detections the crate fabricates and the geometry the Cluster Linker assumes
//! come from one consistent ephemeris.
//!
//! ## File format
//!
//! Whitespace-delimited text, one state per line:
//!
//! ```text
//! MJD  x  y  z  vx  vy  vz
//! ```
//!
//! with positions in **km** and velocities in **km/s**, heliocentric ecliptic
//! J2000. Lines starting with `#` and blank lines are skipped. Epochs must be
//! strictly increasing. On load everything is converted to AU and AU/day.
//!
//! ## Interpolation
//!
//! [`EarthEphemeris::state_at`] uses cubic Hermite interpolation over the
//! bracketing pair of table rows, which keeps daily-sampled tables accurate to
//! well below the astrometric noise floor of the simulated detections.

use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use nalgebra::Vector3;

use crate::constants::{AU, MJD, SECONDS_PER_DAY};
use crate::heliobench_errors::HeliobenchError;

/// In-memory Earth ephemeris: epochs with heliocentric state vectors.
///
/// Units after loading: AU and AU/day, ecliptic J2000.
#[derive(Debug, Clone)]
pub struct EarthEphemeris {
    epochs: Vec<MJD>,
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
}

impl EarthEphemeris {
    /// Parse an ephemeris table from a file.
    ///
    /// Arguments
    /// ---------
    /// * `path`: ephemeris file in the format described in the module doc.
    ///
    /// Return
    /// ------
    /// * A loaded [`EarthEphemeris`], or a parse/consistency error naming the
    ///   offending line.
    pub fn from_file(path: &Utf8Path) -> Result<Self, HeliobenchError> {
        let file = File::open(path)
            .map_err(|_| HeliobenchError::InputFileNotFound(path.to_string()))?;

        let mut epochs = Vec::new();
        let mut positions = Vec::new();
        let mut velocities = Vec::new();

        for (line_idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 7 {
                return Err(HeliobenchError::DataConsistency(format!(
                    "{path}:{}: expected 7 fields (MJD x y z vx vy vz), got {}",
                    line_idx + 1,
                    fields.len()
                )));
            }

            let mut values = [0.0_f64; 7];
            for (value, field) in values.iter_mut().zip(&fields) {
                *value = field.parse()?;
            }

            epochs.push(values[0]);
            // km → AU, km/s → AU/day
            positions.push(Vector3::new(values[1], values[2], values[3]) / AU);
            velocities.push(Vector3::new(values[4], values[5], values[6]) * (SECONDS_PER_DAY / AU));
        }

        if epochs.len() < 2 {
            return Err(HeliobenchError::DataConsistency(format!(
                "{path}: ephemeris needs at least 2 state rows, got {}",
                epochs.len()
            )));
        }
        if epochs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(HeliobenchError::DataConsistency(format!(
                "{path}: ephemeris epochs must be strictly increasing"
            )));
        }

        Ok(Self {
            epochs,
            positions,
            velocities,
        })
    }

    /// Inclusive epoch span of the table, as `(first, last)` MJD.
    pub fn span(&self) -> (MJD, MJD) {
        (self.epochs[0], self.epochs[self.epochs.len() - 1])
    }

    /// True if `mjd` lies inside the table span.
    pub fn covers(&self, mjd: MJD) -> bool {
        let (first, last) = self.span();
        mjd >= first && mjd <= last
    }

    /// Heliocentric state of the Earth at an arbitrary epoch.
    ///
    /// Cubic Hermite interpolation between the two bracketing table rows, so
    /// both the interpolated position and velocity are continuous and exact at
    /// the nodes.
    ///
    /// Arguments
    /// ---------
    /// * `mjd`: requested epoch, must lie inside [`span`](EarthEphemeris::span).
    ///
    /// Return
    /// ------
    /// * `(position, velocity)` in AU and AU/day.
    pub fn state_at(&self, mjd: MJD) -> Result<(Vector3<f64>, Vector3<f64>), HeliobenchError> {
        if !self.covers(mjd) {
            let (first, last) = self.span();
            return Err(HeliobenchError::DataConsistency(format!(
                "epoch {mjd} outside Earth ephemeris span [{first}, {last}]"
            )));
        }

        // Index of the first node strictly greater than mjd; the bracketing
        // interval is [hi - 1, hi].
        let hi = self
            .epochs
            .partition_point(|&t| t <= mjd)
            .min(self.epochs.len() - 1);
        let lo = hi - 1;

        let dt = self.epochs[hi] - self.epochs[lo];
        let t = (mjd - self.epochs[lo]) / dt;

        let (p0, p1) = (self.positions[lo], self.positions[hi]);
        let (v0, v1) = (self.velocities[lo], self.velocities[hi]);

        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        let position = h00 * p0 + h10 * dt * v0 + h01 * p1 + h11 * dt * v1;

        // Derivative of the Hermite basis, rescaled from the unit interval
        let d00 = (6.0 * t2 - 6.0 * t) / dt;
        let d10 = 3.0 * t2 - 4.0 * t + 1.0;
        let d01 = (-6.0 * t2 + 6.0 * t) / dt;
        let d11 = 3.0 * t2 - 2.0 * t;

        let velocity = d00 * p0 + d10 * v0 + d01 * p1 + d11 * v1;

        Ok((position, velocity))
    }
}
