//! # Keplerian orbital elements
//!
//! Classical element set `(a, e, i, Ω, ω, M)` at a reference epoch. This is the
//! user-facing representation: the synthetic population is drawn in Keplerian
//! form ([`KeplerianElements::sample_uniform`]) and converted to
//! [`EquinoctialElements`](crate::orbit_type::equinoctial_element::EquinoctialElements)
//! for propagation.
//!
//! ## Degeneracies
//!
//! Classical Keplerian elements suffer from singularities:
//!
//! - **Circular orbits (`e → 0`)**: periapsis argument ω becomes undefined.
//!   → conventionally set to `0.0` during conversion.
//! - **Equatorial orbits (`i → 0`)**: ascending node Ω becomes undefined.
//!   → conventionally set to `0.0` during conversion.
//!
//! For numerical work use the equinoctial representation.

use rand::Rng;

use crate::constants::MJD;
use crate::orbit_type::{equinoctial_element::EquinoctialElements, principal_angle};

/// Keplerian orbital elements (osculating, two-body).
///
/// Units
/// -----
/// * `reference_epoch`: MJD (Modified Julian Date).
/// * `semi_major_axis`: Astronomical Units (AU).
/// * `eccentricity`: unitless.
/// * `inclination`: radians.
/// * `ascending_node_longitude`: radians (Ω).
/// * `periapsis_argument`: radians (ω).
/// * `mean_anomaly`: radians (M).
#[derive(Debug, PartialEq, Clone)]
pub struct KeplerianElements {
    pub reference_epoch: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node_longitude: f64,
    pub periapsis_argument: f64,
    pub mean_anomaly: f64,
}

/// Element domain the random population is drawn from.
///
/// Semi-major axis spans the inner main belt out to the Kuiper belt; the
/// eccentricity cap keeps every orbit bound and the inclination range covers
/// prograde and retrograde objects alike.
pub const SEMI_MAJOR_AXIS_RANGE: (f64, f64) = (1.1, 50.0);
/// Eccentricity domain (bound orbits only).
pub const ECCENTRICITY_RANGE: (f64, f64) = (0.0, 0.99);

impl KeplerianElements {
    /// Draw one orbit with every element uniform over its fixed domain.
    ///
    /// Domains
    /// -------
    /// * semi-major axis: 1.1 – 50 AU,
    /// * eccentricity: 0 – 0.99,
    /// * inclination: 0 – 180°,
    /// * ascending node, periapsis argument, mean anomaly: 0 – 360° each.
    ///
    /// Arguments
    /// ---------
    /// * `rng`: random number generator (seed it for reproducible populations).
    /// * `reference_epoch`: epoch (MJD) the drawn elements are osculating at.
    ///
    /// Return
    /// ------
    /// * A new random [`KeplerianElements`], angles stored in radians.
    pub fn sample_uniform(rng: &mut impl Rng, reference_epoch: MJD) -> Self {
        let (a_min, a_max) = SEMI_MAJOR_AXIS_RANGE;
        let (e_min, e_max) = ECCENTRICITY_RANGE;
        KeplerianElements {
            reference_epoch,
            semi_major_axis: rng.random_range(a_min..a_max),
            eccentricity: rng.random_range(e_min..e_max),
            inclination: rng.random_range(0.0..std::f64::consts::PI),
            ascending_node_longitude: rng.random_range(0.0..std::f64::consts::TAU),
            periapsis_argument: rng.random_range(0.0..std::f64::consts::TAU),
            mean_anomaly: rng.random_range(0.0..std::f64::consts::TAU),
        }
    }

    pub(crate) fn from_equinoctial_internal(
        reference_epoch: f64,
        semi_major_axis: f64,
        eccentricity_sin_lon: f64,
        eccentricity_cos_lon: f64,
        tan_half_incl_sin_node: f64,
        tan_half_incl_cos_node: f64,
        mean_longitude: f64,
    ) -> Self {
        let eps = 1.0e-12; // small value for near-circular/near-equatorial tests
        let ecc = (eccentricity_sin_lon.powi(2) + eccentricity_cos_lon.powi(2)).sqrt();

        // dig = ω + Ω (undefined for e ≈ 0, set to 0 by convention)
        let dig = if ecc < eps {
            0.0
        } else {
            eccentricity_sin_lon.atan2(eccentricity_cos_lon)
        };

        let tgi2 = (tan_half_incl_sin_node.powi(2) + tan_half_incl_cos_node.powi(2)).sqrt();

        let omega_node = if tgi2 < eps {
            0.0
        } else {
            tan_half_incl_sin_node.atan2(tan_half_incl_cos_node)
        };

        let inclination = 2.0 * tgi2.atan();

        let periapsis_arg = principal_angle(dig - omega_node);
        let mean_anomaly = principal_angle(mean_longitude - dig);

        Self {
            reference_epoch,
            semi_major_axis,
            eccentricity: ecc,
            inclination,
            ascending_node_longitude: omega_node,
            periapsis_argument: periapsis_arg,
            mean_anomaly,
        }
    }
}

impl From<KeplerianElements> for EquinoctialElements {
    fn from(k: KeplerianElements) -> Self {
        EquinoctialElements::from_kepler_internal(
            k.reference_epoch,
            k.semi_major_axis,
            k.eccentricity,
            k.inclination,
            k.ascending_node_longitude,
            k.periapsis_argument,
            k.mean_anomaly,
        )
    }
}

impl From<&KeplerianElements> for EquinoctialElements {
    fn from(k: &KeplerianElements) -> Self {
        EquinoctialElements::from_kepler_internal(
            k.reference_epoch,
            k.semi_major_axis,
            k.eccentricity,
            k.inclination,
            k.ascending_node_longitude,
            k.periapsis_argument,
            k.mean_anomaly,
        )
    }
}

#[cfg(test)]
mod test_keplerian_element {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_keplerian_conversion() {
        let kepler = KeplerianElements {
            reference_epoch: 0.0,
            semi_major_axis: 1.8017360713,
            eccentricity: 0.2835591457,
            inclination: 0.2026738329,
            ascending_node_longitude: 0.0079559790,
            periapsis_argument: 1.2451951388,
            mean_anomaly: 0.4405458902,
        };

        let equinoctial: EquinoctialElements = kepler.into();

        assert_eq!(
            equinoctial,
            EquinoctialElements {
                reference_epoch: 0.0,
                semi_major_axis: 1.8017360713,
                eccentricity_sin_lon: 0.2693736809404963,
                eccentricity_cos_lon: 0.08856415260522467,
                tan_half_incl_sin_node: 0.0008089970142830734,
                tan_half_incl_cos_node: 0.10168201110394352,
                mean_longitude: 1.693697008,
            }
        );
    }

    #[test]
    fn test_sample_uniform_within_domains() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let k = KeplerianElements::sample_uniform(&mut rng, 60676.5);
            assert!(k.semi_major_axis >= 1.1 && k.semi_major_axis < 50.0);
            assert!(k.eccentricity >= 0.0 && k.eccentricity < 0.99);
            assert!(k.inclination >= 0.0 && k.inclination < std::f64::consts::PI);
            assert!(k.ascending_node_longitude >= 0.0);
            assert!(k.ascending_node_longitude < std::f64::consts::TAU);
            assert!(k.periapsis_argument < std::f64::consts::TAU);
            assert!(k.mean_anomaly < std::f64::consts::TAU);
            assert_eq!(k.reference_epoch, 60676.5);
        }
    }

    #[test]
    fn test_sample_uniform_deterministic_per_seed() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = KeplerianElements::sample_uniform(&mut rng_a, 60676.5);
        let b = KeplerianElements::sample_uniform(&mut rng_b, 60676.5);
        assert_eq!(a, b);
    }
}
