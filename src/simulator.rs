//! # Trajectory simulation seam
//!
//! The catalog generator does not care how objects move, only that something
//! can report the heliocentric state of every object at a given epoch. That
//! contract is the [`TrajectorySimulator`] trait; [`TwoBodySimulator`] is the
//! stock implementation built on the equinoctial two-body propagation in
//! [`crate::orbit_type`].
//!
//! The trait advances the whole population jointly per epoch rather than one
//! object at a time, so an implementation backed by an N-body integrator can
//! amortize a single integration step across all objects.

use nalgebra::Vector3;
use rand::Rng;

use crate::constants::{ObjectId, MJD};
use crate::heliobench_errors::HeliobenchError;
use crate::orbit_type::equinoctial_element::EquinoctialElements;
use crate::orbit_type::keplerian_element::KeplerianElements;

/// A synthetic solar-system object: sampled orbital elements plus a run-wide
/// unique integer id.
///
/// The equinoctial form of the elements is computed once at construction and
/// reused for every epoch the object is advanced to.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticObject {
    pub object_id: ObjectId,
    pub elements: KeplerianElements,
    equinoctial: EquinoctialElements,
}

impl SyntheticObject {
    pub fn new(object_id: ObjectId, elements: KeplerianElements) -> Self {
        let equinoctial = (&elements).into();
        Self {
            object_id,
            elements,
            equinoctial,
        }
    }

    /// Draw a population of `count` objects with consecutive ids starting at
    /// `id_offset`, elements uniform over the sampling domains of
    /// [`KeplerianElements::sample_uniform`].
    pub fn sample_population(
        rng: &mut impl Rng,
        count: usize,
        id_offset: ObjectId,
        reference_epoch: MJD,
    ) -> Vec<Self> {
        (0..count)
            .map(|index| {
                Self::new(
                    id_offset + index as ObjectId,
                    KeplerianElements::sample_uniform(rng, reference_epoch),
                )
            })
            .collect()
    }
}

/// Heliocentric state of one object at one epoch.
///
/// Ecliptic J2000 frame, AU and AU/day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelioState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Advances a synthetic population to arbitrary epochs.
pub trait TrajectorySimulator {
    /// Heliocentric state of every object in `objects` at `epoch`, in input
    /// order. An error for any single object aborts the whole batch.
    fn advance_to(
        &self,
        objects: &[SyntheticObject],
        epoch: MJD,
    ) -> Result<Vec<HelioState>, HeliobenchError>;
}

/// Keplerian two-body propagation of each object's osculating elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoBodySimulator;

impl TrajectorySimulator for TwoBodySimulator {
    fn advance_to(
        &self,
        objects: &[SyntheticObject],
        epoch: MJD,
    ) -> Result<Vec<HelioState>, HeliobenchError> {
        objects
            .iter()
            .map(|object| {
                let (position, velocity) = object
                    .equinoctial
                    .solve_two_body_problem(object.elements.reference_epoch, epoch)
                    .map_err(|err| {
                        HeliobenchError::SimulationFailure(format!(
                            "object {}: propagation to MJD {epoch} failed: {err}",
                            object.object_id
                        ))
                    })?;
                Ok(HelioState { position, velocity })
            })
            .collect()
    }
}
