//! # Ground-truth extraction
//!
//! Reduces each object's heliocentric distance samples to the three numbers
//! the Cluster Linker also estimates: distance, radial velocity and radial
//! acceleration at the reference epoch. The reduction is a degree-2
//! least-squares fit of distance against `epoch − reference_epoch`, so the
//! truth is an *operational* local quadratic around the reference epoch, not
//! the true orbital motion. That is deliberate: it matches the motion model
//! the linker itself assumes, so linker output and truth are comparable
//! numbers.
//!
//! Count violations are hard faults. A missing or extra detection means an
//! upstream contract was broken, and a silently skipped object would corrupt
//! every downstream recovery-rate figure.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use camino::Utf8Path;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::catalog::DetectionRecord;
use crate::constants::{ObjectId, MJD};
use crate::heliobench_errors::HeliobenchError;

/// Fitted heliocentric truth of one object at the reference epoch.
///
/// Serialized column names follow the object-table convention
/// (`ObjID,helioDist,helioVel,helioAcc`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthRecord {
    #[serde(rename = "ObjID")]
    pub object_id: ObjectId,
    /// Heliocentric distance at the reference epoch (AU).
    #[serde(rename = "helioDist")]
    pub helio_dist: f64,
    /// Radial velocity at the reference epoch (AU/day).
    #[serde(rename = "helioVel")]
    pub helio_vel: f64,
    /// Radial acceleration at the reference epoch (AU/day²).
    #[serde(rename = "helioAcc")]
    pub helio_acc: f64,
}

/// Fit every object's distance series with a quadratic in time.
///
/// The input must be grouped by object id (the catalog generator's sort
/// order) with exactly `epochs_per_object` records per object.
///
/// Arguments
/// ---------
/// * `records`: detection records, grouped by object id.
/// * `reference_epoch`: expansion point of the fit (MJD).
/// * `epochs_per_object`: required records per object, at least 3.
///
/// Return
/// ------
/// * One [`TruthRecord`] per object, ordered by object id ascending, with
///   distance `c0`, velocity `c1` and acceleration `2·c2` from the fitted
///   coefficients.
pub fn extract_truth(
    records: &[DetectionRecord],
    reference_epoch: MJD,
    epochs_per_object: usize,
) -> Result<Vec<TruthRecord>, HeliobenchError> {
    if epochs_per_object < 3 {
        return Err(HeliobenchError::InvalidRunParameter(format!(
            "quadratic truth fit needs at least 3 epochs per object, got {epochs_per_object}"
        )));
    }
    if records.len() % epochs_per_object != 0 {
        return Err(HeliobenchError::DataConsistency(format!(
            "{} detections do not divide evenly into groups of {epochs_per_object}",
            records.len()
        )));
    }

    let mut truth = Vec::with_capacity(records.len() / epochs_per_object);
    for group in records.chunk_by(|a, b| a.object_id == b.object_id) {
        let object_id = group[0].object_id;
        if group.len() != epochs_per_object {
            return Err(HeliobenchError::DataConsistency(format!(
                "object {object_id}: expected {epochs_per_object} detections, found {}",
                group.len()
            )));
        }

        let mut ata = Matrix3::zeros();
        let mut atb = Vector3::zeros();
        for record in group {
            let x = record.epoch - reference_epoch;
            let row = Vector3::new(1.0, x, x * x);
            ata += row * row.transpose();
            atb += row * record.helio_dist;
        }

        let coefficients = ata.lu().solve(&atb).ok_or_else(|| {
            HeliobenchError::DataConsistency(format!(
                "object {object_id}: singular normal equations in quadratic fit"
            ))
        })?;

        truth.push(TruthRecord {
            object_id,
            helio_dist: coefficients[0],
            helio_vel: coefficients[1],
            helio_acc: 2.0 * coefficients[2],
        });
    }

    truth.sort_by_key(|record| record.object_id);
    Ok(truth)
}

/// Write a truth table as CSV (`ObjID,helioDist,helioVel,helioAcc`).
pub fn write_truth_table(records: &[TruthRecord], path: &Utf8Path) -> Result<(), HeliobenchError> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a truth table back, e.g. when merging chunk outputs.
pub fn read_truth_table(path: &Utf8Path) -> Result<Vec<TruthRecord>, HeliobenchError> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod test_truth {
    use super::*;
    use approx::assert_relative_eq;

    fn quadratic_detections(
        object_id: ObjectId,
        epochs: &[MJD],
        reference_epoch: MJD,
        dist0: f64,
        vel: f64,
        acc: f64,
    ) -> Vec<DetectionRecord> {
        epochs
            .iter()
            .map(|&epoch| {
                let x = epoch - reference_epoch;
                DetectionRecord {
                    object_id,
                    epoch,
                    ra: 0.0,
                    dec: 0.0,
                    helio_dist: dist0 + vel * x + 0.5 * acc * x * x,
                    position: nalgebra::Vector3::zeros(),
                }
            })
            .collect()
    }

    const EPOCHS: [MJD; 6] = [60676.5, 60676.6, 60683.5, 60683.6, 60689.5, 60689.6];
    const REF: MJD = 60683.5;

    #[test]
    fn test_exact_quadratic_is_recovered() {
        let records = quadratic_detections(7, &EPOCHS, REF, 2.5, -0.01, 2.0e-4);
        let truth = extract_truth(&records, REF, 6).unwrap();

        assert_eq!(truth.len(), 1);
        assert_eq!(truth[0].object_id, 7);
        assert_relative_eq!(truth[0].helio_dist, 2.5, epsilon = 1e-10);
        assert_relative_eq!(truth[0].helio_vel, -0.01, epsilon = 1e-10);
        assert_relative_eq!(truth[0].helio_acc, 2.0e-4, epsilon = 1e-10);
    }

    #[test]
    fn test_output_sorted_by_object_id() {
        let mut records = quadratic_detections(3, &EPOCHS, REF, 3.0, 0.0, 0.0);
        records.extend(quadratic_detections(1, &EPOCHS, REF, 5.0, 0.0, 0.0));

        let truth = extract_truth(&records, REF, 6).unwrap();
        let ids: Vec<_> = truth.iter().map(|t| t.object_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_relative_eq!(truth[0].helio_dist, 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_wrong_group_size_is_a_hard_fault() {
        let mut records = quadratic_detections(0, &EPOCHS, REF, 2.0, 0.0, 0.0);
        records.extend(quadratic_detections(1, &EPOCHS[..5], REF, 2.0, 0.0, 0.0));
        records.extend(quadratic_detections(2, &EPOCHS[..1], REF, 2.0, 0.0, 0.0));

        // Total still divides evenly, the per-group check must catch it.
        let result = extract_truth(&records, REF, 6);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_non_divisible_total_is_a_hard_fault() {
        let records = quadratic_detections(0, &EPOCHS[..5], REF, 2.0, 0.0, 0.0);
        let result = extract_truth(&records, REF, 6);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_too_few_epochs_rejected() {
        let records = quadratic_detections(0, &EPOCHS[..2], REF, 2.0, 0.0, 0.0);
        assert!(extract_truth(&records, REF, 2).is_err());
    }

    #[test]
    fn test_degenerate_epochs_rejected() {
        let records = quadratic_detections(0, &[REF, REF, REF], REF, 2.0, 0.0, 0.0);
        let result = extract_truth(&records, REF, 3);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_truth_table_round_trip() {
        let records = vec![
            TruthRecord {
                object_id: 0,
                helio_dist: 2.5,
                helio_vel: -0.013,
                helio_acc: 1.7e-4,
            },
            TruthRecord {
                object_id: 1,
                helio_dist: 31.0,
                helio_vel: 0.002,
                helio_acc: -4.0e-6,
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("objTable.csv")).unwrap();
        write_truth_table(&records, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("ObjID,helioDist,helioVel,helioAcc\n"));

        let read_back = read_truth_table(&path).unwrap();
        assert_eq!(read_back, records);
    }
}
