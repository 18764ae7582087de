//! # Result reconciliation
//!
//! Joins the Cluster Linker's two output tables back into one record per
//! accepted cluster:
//!
//! * the **detail** table lists every clustered detection and is reduced to a
//!   `cluster number → identity string` map;
//! * the **summary** table carries one row per accepted cluster with the
//!   linker's own fitted heliocentric distance/velocity/acceleration.
//!
//! Because every chunk catalog is single-origin synthetic data, each cluster
//! should map to exactly one identity. A detail table where one cluster
//! number carries *different* identities is suspicious; the caller chooses
//! through [`DuplicatePolicy`] whether that overwrites quietly or fails the
//! chunk. A summary row whose cluster number never appears in the detail
//! table is always a hard fault — skipping it silently would bias every
//! recovery figure computed downstream.
//!
//! Columns are located by header name, with a leading `#` on the first
//! header cell tolerated (heliolinc2 writes `#clusternum,...`). Extra
//! columns are ignored.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::heliobench_errors::HeliobenchError;

/// How to treat a cluster number mapped to two different identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the identity from the last detail row, single-pass overwrite
    /// semantics.
    #[default]
    LastWins,
    /// Treat the conflict as a data-consistency fault naming the cluster.
    FailOnConflict,
}

/// Map from cluster number to the originating synthetic identity.
pub type ClusterIdentityMap = HashMap<i64, String, ahash::RandomState>;

/// One reconciled cluster: the linker's fit joined with the identity.
///
/// `helio_*` values are the linker's own estimates, copied without unit
/// conversion. One object may appear in several records; deduplication is
/// downstream analysis, not this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredObjectRecord {
    #[serde(rename = "clusternum")]
    pub cluster_num: i64,
    #[serde(rename = "idstring")]
    pub object_id: String,
    #[serde(rename = "heliodist")]
    pub helio_dist: f64,
    #[serde(rename = "heliovel")]
    pub helio_vel: f64,
    #[serde(rename = "helioacc")]
    pub helio_acc: f64,
}

/// Position of `name` among `headers`, tolerating a leading `#`.
fn header_index(
    headers: &csv::StringRecord,
    name: &str,
    path: &Utf8Path,
) -> Result<usize, HeliobenchError> {
    headers
        .iter()
        .position(|header| header.trim_start_matches('#').trim() == name)
        .ok_or_else(|| {
            HeliobenchError::DataConsistency(format!("{path}: missing column '{name}'"))
        })
}

fn field<'a>(
    row: &'a csv::StringRecord,
    index: usize,
    path: &Utf8Path,
) -> Result<&'a str, HeliobenchError> {
    row.get(index).map(str::trim).ok_or_else(|| {
        HeliobenchError::DataConsistency(format!(
            "{path}: row {:?} is missing field {index}",
            row.position().map(|p| p.line())
        ))
    })
}

/// Reduce the cluster detail table to a cluster → identity map.
pub fn load_cluster_map(
    detail_path: &Utf8Path,
    policy: DuplicatePolicy,
) -> Result<ClusterIdentityMap, HeliobenchError> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(detail_path)?));
    let headers = reader.headers()?.clone();
    let cluster_col = header_index(&headers, "clusternum", detail_path)?;
    let id_col = header_index(&headers, "idstring", detail_path)?;

    let mut map = ClusterIdentityMap::default();
    for row in reader.records() {
        let row = row?;
        let cluster_num: i64 = field(&row, cluster_col, detail_path)?.parse()?;
        let idstring = field(&row, id_col, detail_path)?.to_string();

        match map.entry(cluster_num) {
            Entry::Vacant(entry) => {
                entry.insert(idstring);
            }
            Entry::Occupied(mut entry) if entry.get() != &idstring => match policy {
                DuplicatePolicy::LastWins => {
                    entry.insert(idstring);
                }
                DuplicatePolicy::FailOnConflict => {
                    return Err(HeliobenchError::DataConsistency(format!(
                        "{detail_path}: cluster {cluster_num} maps to both '{}' and '{idstring}'",
                        entry.get()
                    )));
                }
            },
            // Same identity repeated: a cluster has many detail rows.
            Entry::Occupied(_) => {}
        }
    }
    Ok(map)
}

/// Join the summary table against the detail-table identity map.
///
/// Arguments
/// ---------
/// * `detail_path`: cluster detail table (`clusternum`, `idstring`, …).
/// * `summary_path`: cluster summary table (`clusternum`, `heliodist`,
///   `heliovel`, `helioacc`, …).
/// * `policy`: duplicate handling for the detail pass.
///
/// Return
/// ------
/// * One [`RecoveredObjectRecord`] per summary row, in summary order. A
///   summary cluster number absent from the detail map is a hard fault.
pub fn reconcile(
    detail_path: &Utf8Path,
    summary_path: &Utf8Path,
    policy: DuplicatePolicy,
) -> Result<Vec<RecoveredObjectRecord>, HeliobenchError> {
    let identity_map = load_cluster_map(detail_path, policy)?;

    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(summary_path)?));
    let headers = reader.headers()?.clone();
    let cluster_col = header_index(&headers, "clusternum", summary_path)?;
    let dist_col = header_index(&headers, "heliodist", summary_path)?;
    let vel_col = header_index(&headers, "heliovel", summary_path)?;
    let acc_col = header_index(&headers, "helioacc", summary_path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cluster_num: i64 = field(&row, cluster_col, summary_path)?.parse()?;

        let object_id = identity_map.get(&cluster_num).cloned().ok_or_else(|| {
            HeliobenchError::DataConsistency(format!(
                "{summary_path}: unknown cluster number {cluster_num}, absent from {detail_path}"
            ))
        })?;

        records.push(RecoveredObjectRecord {
            cluster_num,
            object_id,
            helio_dist: field(&row, dist_col, summary_path)?.parse()?,
            helio_vel: field(&row, vel_col, summary_path)?.parse()?,
            helio_acc: field(&row, acc_col, summary_path)?.parse()?,
        });
    }
    Ok(records)
}

/// Write reconciled records as CSV
/// (`clusternum,idstring,heliodist,heliovel,helioacc`).
pub fn write_recovered_table(
    records: &[RecoveredObjectRecord],
    path: &Utf8Path,
) -> Result<(), HeliobenchError> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a reconciled table back, e.g. when merging chunk outputs.
pub fn read_recovered_table(
    path: &Utf8Path,
) -> Result<Vec<RecoveredObjectRecord>, HeliobenchError> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod test_reconcile {
    use super::*;
    use camino::Utf8PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    const DETAIL: &str = "\
#clusternum,idstring,mjd,extra
1,7,60676.5,x
1,7,60676.6,x
2,13,60676.5,x
";

    const SUMMARY: &str = "\
#clusternum,posrms,heliodist,heliovel,helioacc
1,0.1,2.51,-0.011,0.0002
2,0.3,31.2,0.001,-0.000004
1,0.2,2.49,-0.010,0.0001
";

    #[test]
    fn test_one_record_per_summary_row_with_identity() {
        let dir = tempfile::tempdir().unwrap();
        let detail = write_file(&dir, "hl_out.csv", DETAIL);
        let summary = write_file(&dir, "hl_outsum.csv", SUMMARY);

        let records = reconcile(&detail, &summary, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].object_id, "7");
        assert_eq!(records[1].object_id, "13");
        assert_eq!(records[2].object_id, "7");
        assert_eq!(records[1].helio_dist, 31.2);
        assert_eq!(records[1].helio_acc, -0.000004);
    }

    #[test]
    fn test_unknown_cluster_number_is_a_hard_fault() {
        let dir = tempfile::tempdir().unwrap();
        let detail = write_file(&dir, "hl_out.csv", DETAIL);
        let summary = write_file(
            &dir,
            "hl_outsum.csv",
            "#clusternum,heliodist,heliovel,helioacc\n9,1.0,0.0,0.0\n",
        );

        let result = reconcile(&detail, &summary, DuplicatePolicy::LastWins);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_repeated_identity_is_not_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let detail = write_file(&dir, "hl_out.csv", DETAIL);

        let map = load_cluster_map(&detail, DuplicatePolicy::FailOnConflict).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], "7");
        assert_eq!(map[&2], "13");
    }

    #[test]
    fn test_conflicting_identity_policies() {
        let dir = tempfile::tempdir().unwrap();
        let detail = write_file(
            &dir,
            "hl_out.csv",
            "#clusternum,idstring\n1,7\n1,8\n",
        );

        let map = load_cluster_map(&detail, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(map[&1], "8");

        let result = load_cluster_map(&detail, DuplicatePolicy::FailOnConflict);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let detail = write_file(&dir, "hl_out.csv", "#clusternum,notid\n1,7\n");

        let result = load_cluster_map(&detail, DuplicatePolicy::LastWins);
        assert!(matches!(result, Err(HeliobenchError::DataConsistency(_))));
    }

    #[test]
    fn test_recovered_table_round_trip() {
        let records = vec![
            RecoveredObjectRecord {
                cluster_num: 1,
                object_id: "7".into(),
                helio_dist: 2.51,
                helio_vel: -0.011,
                helio_acc: 0.0002,
            },
            RecoveredObjectRecord {
                cluster_num: 2,
                object_id: "13".into(),
                helio_dist: 31.2,
                helio_vel: 0.001,
                helio_acc: -4e-6,
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("hl_extracted.csv")).unwrap();
        write_recovered_table(&records, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("clusternum,idstring,heliodist,heliovel,helioacc\n"));

        assert_eq!(read_recovered_table(&path).unwrap(), records);
    }
}
