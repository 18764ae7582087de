//! # External linkage pipeline
//!
//! Everything that touches the two heliolinc2 executables lives here:
//!
//! * [`runner`] drives `make_tracklets` and `heliolinc` over a chunk
//!   workspace, captures their output into per-chunk logs, and validates
//!   stage output files instead of trusting exit codes.
//! * [`reconcile`] joins the Cluster Linker's detail and summary tables back
//!   into per-cluster recovered-object records carrying the originating
//!   synthetic identity.
//!
//! The tools communicate exclusively through the filesystem; no stage output
//! is ever parsed from a pipe.

pub mod reconcile;
pub mod runner;
