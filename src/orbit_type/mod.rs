//! # Orbital element representations
//!
//! This module defines the two **canonical orbital element sets** used by the
//! synthetic population and the associated conversions between them:
//!
//! - [`keplerian_element`](crate::orbit_type::keplerian_element) — Classical Keplerian elements `(a, e, i, Ω, ω, M)`,
//!   the representation in which the random population is drawn.
//! - [`equinoctial_element`](crate::orbit_type::equinoctial_element) — Equinoctial elements `(a, h, k, p, q, λ)`,
//!   a **non-singular formulation** used internally by the two-body propagator
//!   to stay robust near zero eccentricity or inclination.
//!
//! ## Typical workflow
//!
//! ```rust, no_run
//! use rand::{rngs::StdRng, SeedableRng};
//! use heliobench::orbit_type::equinoctial_element::EquinoctialElements;
//! use heliobench::orbit_type::keplerian_element::KeplerianElements;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! // Draw a random orbit and propagate it 10 days past its reference epoch
//! let kep = KeplerianElements::sample_uniform(&mut rng, 60676.5);
//! let equ: EquinoctialElements = (&kep).into();
//! let (position, velocity) = equ.solve_two_body_problem(kep.reference_epoch, 60686.5)?;
//! # Ok::<(), heliobench::heliobench_errors::HeliobenchError>(())
//! ```
//!
//! ## Units
//!
//! - Lengths: **AU**
//! - Angles: **radians**
//! - Time: **days** (epochs in **MJD**)

use crate::constants::DPI;

pub mod equinoctial_element;
pub mod keplerian_element;

/// Principal value of an angle in radians, reduced to [0, 2π).
pub(crate) fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}
