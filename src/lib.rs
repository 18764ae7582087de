//! # heliobench
//!
//! Evaluation harness for the heliolinc2 asteroid-linkage toolchain.
//!
//! The crate samples a seeded synthetic orbit population, renders it into
//! detection catalogs, fits the per-object heliocentric truth, drives the
//! external `make_tracklets` and `heliolinc` executables over independent
//! chunks, and reconciles the linker output into recovered-object tables
//! that can be scored against the truth.
//!
//! Entry point: build a [`RunConfig`] and hand it to [`orchestrate`].

pub mod catalog;
pub mod chunk_workspace;
pub mod constants;
pub mod earth_ephem;
pub mod guess_grid;
pub mod heliobench_errors;
pub mod linkage;
pub mod orbit_type;
pub mod orchestrator;
mod ref_frames;
pub mod run_config;
pub mod simulator;
pub mod truth;

pub use heliobench_errors::HeliobenchError;
pub use orchestrator::{orchestrate, RunOutcome};
pub use run_config::RunConfig;
pub use simulator::{TrajectorySimulator, TwoBodySimulator};
