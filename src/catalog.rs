//! # Synthetic detection catalog
//!
//! Drives a [`TrajectorySimulator`] over a freshly sampled population and
//! assembles the detection catalog the Tracklet Builder consumes, plus the
//! per-object heliocentric samples the truth extractor fits afterwards.
//!
//! ## Geometry
//!
//! For every (object, epoch) pair the generator:
//!
//! 1. takes the object's heliocentric state from the simulator and the
//!    observer's from the Earth ephemeris (Hermite interpolation),
//! 2. forms the topocentric offset and applies the first-order light-time
//!    correction,
//! 3. rotates from ecliptic to equatorial J2000 by the mean obliquity and
//!    converts to (RA, DEC) degrees, RA normalized into `(-180, 180]`.
//!
//! The observer is the geocenter of the same ephemeris file the external
//! tools receive, so the synthetic astrometry and the Cluster Linker's
//! geometry share one Earth.
//!
//! Records are sorted by `(object id, epoch)`; every object has exactly one
//! record per configured epoch. A simulator error aborts the whole
//! generation, no partial catalog leaves this module.

use std::fs::File;
use std::io::BufWriter;

use camino::Utf8Path;
use nalgebra::Vector3;
use rand::Rng;

use crate::constants::{Degree, ObjectId, MJD};
use crate::earth_ephem::EarthEphemeris;
use crate::heliobench_errors::HeliobenchError;
use crate::ref_frames::{cartesian_to_radec, correct_light_time, ecliptic_to_equatorial};
use crate::run_config::RunConfig;
use crate::simulator::{SyntheticObject, TrajectorySimulator};

/// Catalog column order, fixed by the colformat contract handed to the
/// Tracklet Builder.
pub const CATALOG_HEADER: [&str; 7] = ["idstring", "MJD", "RA", "Dec", "mag", "band", "obscode"];

/// One synthetic detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub object_id: ObjectId,
    pub epoch: MJD,
    /// Right ascension in degrees, normalized to `(-180, 180]`.
    pub ra: Degree,
    /// Declination in degrees.
    pub dec: Degree,
    /// Heliocentric distance of the object (AU); input of the truth fit.
    pub helio_dist: f64,
    /// Heliocentric ecliptic J2000 position (AU).
    pub position: Vector3<f64>,
}

/// Sample a population and observe it at every configured epoch.
///
/// The simulator is called once per epoch with the whole population; the
/// per-epoch batches are accumulated and finally sorted by
/// `(object id, epoch)`.
///
/// Arguments
/// ---------
/// * `simulator`: trajectory backend advancing the population.
/// * `config`: epochs, per-chunk object count, reference epoch, photometry.
/// * `ephemeris`: Earth state table providing the observer position.
/// * `id_offset`: added to every object id, makes chunk id blocks disjoint.
/// * `rng`: caller-seeded generator, the only source of randomness.
///
/// Return
/// ------
/// * The sorted detection records and the sampled population.
pub fn generate_catalog<S: TrajectorySimulator>(
    simulator: &S,
    config: &RunConfig,
    ephemeris: &EarthEphemeris,
    id_offset: ObjectId,
    rng: &mut impl Rng,
) -> Result<(Vec<DetectionRecord>, Vec<SyntheticObject>), HeliobenchError> {
    let objects = SyntheticObject::sample_population(
        rng,
        config.object_count,
        id_offset,
        config.reference_epoch,
    );

    let rotation = ecliptic_to_equatorial();
    let mut records = Vec::with_capacity(objects.len() * config.epochs.len());

    for &epoch in &config.epochs {
        let states = simulator.advance_to(&objects, epoch)?;
        let (observer_position, observer_velocity) = ephemeris.state_at(epoch)?;

        for (object, state) in objects.iter().zip(&states) {
            let relative_position = state.position - observer_position;
            let relative_velocity = state.velocity - observer_velocity;
            let apparent = correct_light_time(relative_position, relative_velocity);

            let (alpha, delta, _) = cartesian_to_radec(rotation * apparent);

            let mut ra = alpha.to_degrees();
            if ra > 180.0 {
                ra -= 360.0;
            }

            records.push(DetectionRecord {
                object_id: object.object_id,
                epoch,
                ra,
                dec: delta.to_degrees(),
                helio_dist: state.position.norm(),
                position: state.position,
            });
        }
    }

    records.sort_by(|a, b| {
        a.object_id
            .cmp(&b.object_id)
            .then_with(|| a.epoch.total_cmp(&b.epoch))
    });

    Ok((records, objects))
}

/// Serialize the catalog as the CSV the Tracklet Builder reads.
///
/// Angles carry 6 decimals (sub-milliarcsecond, well below the astrometry the
/// pipeline cares about); magnitude, band and observatory code are the run
/// constants from the config.
pub fn write_catalog(
    records: &[DetectionRecord],
    config: &RunConfig,
    path: &Utf8Path,
) -> Result<(), HeliobenchError> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(CATALOG_HEADER)?;

    let mag = format!("{:.2}", config.mag);
    for record in records {
        let id = record.object_id.to_string();
        let mjd = record.epoch.to_string();
        let ra = format!("{:.6}", record.ra);
        let dec = format!("{:.6}", record.dec);
        writer.write_record([
            id.as_str(),
            mjd.as_str(),
            ra.as_str(),
            dec.as_str(),
            mag.as_str(),
            config.band.as_str(),
            config.obscode.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
