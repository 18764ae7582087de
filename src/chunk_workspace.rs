//! # On-disk layout of a run
//!
//! A run directory holds the shared hypothesis file, the two merged result
//! tables, and one `chunk_XXX` subdirectory per chunk. Every intermediate
//! file of a chunk lives inside its own workspace, so concurrent chunks never
//! share a writable path. Workspaces are kept after the run for inspection;
//! nothing here deletes files.

use camino::{Utf8Path, Utf8PathBuf};

use crate::heliobench_errors::HeliobenchError;

/// Shared hypothesis file at the run root, written once before fan-out.
pub const GUESS_GRID_FILE: &str = "hypo.csv";
/// Merged truth table at the run root.
pub const MERGED_TRUTH_FILE: &str = "truth_merged.csv";
/// Merged recovered-object table at the run root.
pub const MERGED_RECOVERED_FILE: &str = "recovered_merged.csv";

/// Detection catalog handed to the Tracklet Builder.
pub const CATALOG_FILE: &str = "dets.csv";
/// Per-object truth table of the chunk.
pub const TRUTH_FILE: &str = "objTable.csv";
/// Paired detections written by the Tracklet Builder.
pub const PAIRDETS_FILE: &str = "pairdets.csv";
/// Pairs/tracklets written by the Tracklet Builder.
pub const PAIRS_FILE: &str = "pairs.csv";
/// Cluster detail table written by the Cluster Linker.
pub const CLUSTERS_FILE: &str = "hl_out.csv";
/// Cluster summary table written by the Cluster Linker.
pub const CLUSTER_SUMMARY_FILE: &str = "hl_outsum.csv";
/// Reconciled recovered-object table of the chunk.
pub const RECOVERED_FILE: &str = "hl_extracted.csv";
/// Captured stdout/stderr of the Tracklet Builder.
pub const TRACKLET_LOG_FILE: &str = "make_tracklets_log.txt";
/// Captured stdout/stderr of the Cluster Linker.
pub const LINKER_LOG_FILE: &str = "heliolinc_log.txt";

/// Private working directory of one chunk.
#[derive(Debug, Clone)]
pub struct ChunkWorkspace {
    pub chunk_index: usize,
    root: Utf8PathBuf,
}

impl ChunkWorkspace {
    /// Create (or reuse) `chunk_XXX` under the run root.
    pub fn create(run_root: &Utf8Path, chunk_index: usize) -> Result<Self, HeliobenchError> {
        let root = run_root.join(format!("chunk_{chunk_index:03}"));
        std::fs::create_dir_all(&root)?;
        Ok(Self { chunk_index, root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn catalog_path(&self) -> Utf8PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn truth_path(&self) -> Utf8PathBuf {
        self.root.join(TRUTH_FILE)
    }

    pub fn pairdets_path(&self) -> Utf8PathBuf {
        self.root.join(PAIRDETS_FILE)
    }

    pub fn pairs_path(&self) -> Utf8PathBuf {
        self.root.join(PAIRS_FILE)
    }

    pub fn clusters_path(&self) -> Utf8PathBuf {
        self.root.join(CLUSTERS_FILE)
    }

    pub fn cluster_summary_path(&self) -> Utf8PathBuf {
        self.root.join(CLUSTER_SUMMARY_FILE)
    }

    pub fn recovered_path(&self) -> Utf8PathBuf {
        self.root.join(RECOVERED_FILE)
    }

    pub fn tracklet_log_path(&self) -> Utf8PathBuf {
        self.root.join(TRACKLET_LOG_FILE)
    }

    pub fn linker_log_path(&self) -> Utf8PathBuf {
        self.root.join(LINKER_LOG_FILE)
    }
}
