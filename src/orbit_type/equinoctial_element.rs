//! # Equinoctial orbital elements
//!
//! Non-singular element set `(a, h, k, p, q, λ)` and the **two-body
//! propagation** built on it. The equinoctial form avoids the classical
//! singularities at zero eccentricity and zero inclination, which matters here
//! because the random population deliberately covers both regimes.
//!
//! [`EquinoctialElements::solve_two_body_problem`] is the propagation kernel
//! behind the default trajectory simulator: it advances an orbit from its
//! reference epoch to an arbitrary target epoch and returns the heliocentric
//! ecliptic position and velocity.

use core::f64;
use std::f64::consts::PI;

use nalgebra::Vector3;
use roots::{find_root_newton_raphson, SimpleConvergency};

use crate::{
    constants::{DPI, GAUSS_GRAV_SQUARED},
    heliobench_errors::HeliobenchError,
    orbit_type::{keplerian_element::KeplerianElements, principal_angle},
};

/// Equinoctial orbital elements.
/// Units:
/// - a: AU (astronomical units)
/// - h, k: dimensionless (related to eccentricity)
/// - p, q: dimensionless (related to inclination)
/// - lambda: radians (mean longitude)
#[derive(Debug, PartialEq, Clone)]
pub struct EquinoctialElements {
    pub reference_epoch: f64,        // Reference epoch (MJD)
    pub semi_major_axis: f64,        // Semi-major axis (AU)
    pub eccentricity_sin_lon: f64,   // h = e * sin(Ω + ω)
    pub eccentricity_cos_lon: f64,   // k = e * cos(Ω + ω)
    pub tan_half_incl_sin_node: f64, // p = tan(i/2) * sin(Ω)
    pub tan_half_incl_cos_node: f64, // q = tan(i/2) * cos(Ω)
    pub mean_longitude: f64,         // λ = Ω + ω + M
}

impl EquinoctialElements {
    pub(crate) fn from_kepler_internal(
        reference_epoch: f64,
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        ascending_node_longitude: f64,
        periapsis_argument: f64,
        mean_anomaly: f64,
    ) -> Self {
        // ϖ = Ω + ω, the longitude of periapsis
        let dig = ascending_node_longitude + periapsis_argument;
        let tgi2 = (inclination / 2.0).tan();

        Self {
            reference_epoch,
            semi_major_axis,
            eccentricity_sin_lon: eccentricity * dig.sin(),
            eccentricity_cos_lon: eccentricity * dig.cos(),
            tan_half_incl_sin_node: tgi2 * ascending_node_longitude.sin(),
            tan_half_incl_cos_node: tgi2 * ascending_node_longitude.cos(),
            mean_longitude: principal_angle(dig + mean_anomaly),
        }
    }

    /// Solve the equinoctial Kepler equation for the eccentric longitude F.
    ///
    /// The equation is `R(F) = F − k·sin(F) + h·cos(F) − λ(t1) = 0`, solved by
    /// Newton–Raphson starting from `π + ϖ`.
    ///
    /// Arguments
    /// ---------
    /// * `mean_longitude_t1`: mean longitude at the target epoch, radians.
    /// * `longitude_of_periastre`: ϖ = Ω + ω, radians.
    ///
    /// Return
    /// ------
    /// * The eccentric longitude F in radians, or a root-finding error when the
    ///   solver does not converge.
    pub fn solve_kepler_equation(
        &self,
        mean_longitude_t1: f64,
        longitude_of_periastre: f64,
    ) -> Result<f64, HeliobenchError> {
        let f = |fval: f64| -> f64 {
            fval - self.eccentricity_cos_lon * fval.sin() + self.eccentricity_sin_lon * fval.cos()
                - mean_longitude_t1
        };

        let df = |fval: f64| -> f64 {
            1.0 - self.eccentricity_cos_lon * fval.cos() - self.eccentricity_sin_lon * fval.sin()
        };

        let x0 = PI + longitude_of_periastre;

        let mut tol = SimpleConvergency {
            eps: f64::EPSILON * 1e2, // ~2e-14
            max_iter: 25,
        };

        Ok(find_root_newton_raphson(x0, &f, &df, &mut tol)?)
    }

    fn compute_cartesian_position_and_velocity(
        &self,
        mean_motion: f64,
        eccentric_anomaly: f64,
        eccentricity_pow2: f64,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let beta = 1. / (1. + (1. - eccentricity_pow2).sqrt());

        let beta_ecc_term = beta * self.eccentricity_sin_lon * self.eccentricity_cos_lon;

        let sin_ecc_anom = eccentric_anomaly.sin();
        let cos_ecc_anom = eccentric_anomaly.cos();

        let xe = self.semi_major_axis
            * ((1. - beta * self.eccentricity_sin_lon.powi(2)) * cos_ecc_anom
                + beta_ecc_term * sin_ecc_anom
                - self.eccentricity_cos_lon);

        let ye = self.semi_major_axis
            * ((1. - beta * self.eccentricity_cos_lon.powi(2)) * sin_ecc_anom
                + beta_ecc_term * cos_ecc_anom
                - self.eccentricity_sin_lon);

        let u = 1. + self.tan_half_incl_sin_node.powi(2) + self.tan_half_incl_cos_node.powi(2);
        let inv_u = 1.0 / u;

        let common_component =
            2. * self.tan_half_incl_sin_node * self.tan_half_incl_cos_node * inv_u;

        let f_vector = Vector3::new(
            (1. - self.tan_half_incl_sin_node.powi(2) + self.tan_half_incl_cos_node.powi(2))
                * inv_u,
            common_component,
            -2. * self.tan_half_incl_sin_node * inv_u,
        );

        let g_vector = Vector3::new(
            common_component,
            (1. + self.tan_half_incl_sin_node.powi(2) - self.tan_half_incl_cos_node.powi(2))
                * inv_u,
            2. * self.tan_half_incl_cos_node * inv_u,
        );

        let cartesian_position = xe * f_vector + ye * g_vector;

        let v_const = mean_motion * self.semi_major_axis.powi(2) / (xe.powi(2) + ye.powi(2)).sqrt();

        let v_xe = v_const
            * (beta_ecc_term * cos_ecc_anom
                - (1. - beta * self.eccentricity_sin_lon.powi(2)) * sin_ecc_anom);
        let v_ye = v_const
            * ((1. - beta * self.eccentricity_cos_lon.powi(2)) * cos_ecc_anom
                - beta_ecc_term * sin_ecc_anom);
        let cartesian_velocity = v_xe * f_vector + v_ye * g_vector;

        (cartesian_position, cartesian_velocity)
    }

    /// Propagate the orbit from `t0` to `t1` under the two-body approximation.
    ///
    /// Arguments
    /// ---------
    /// * `t0`: epoch the elements are osculating at (MJD).
    /// * `t1`: target epoch (MJD).
    ///
    /// Return
    /// ------
    /// * `(position, velocity)` in heliocentric ecliptic J2000 coordinates,
    ///   AU and AU/day, or a root-finding error from the Kepler solver.
    pub fn solve_two_body_problem(
        &self,
        t0: f64,
        t1: f64,
    ) -> Result<(Vector3<f64>, Vector3<f64>), HeliobenchError> {
        let mean_motion = (GAUSS_GRAV_SQUARED / self.semi_major_axis.powi(3)).sqrt();
        let mut mean_longitude_t1 = self.mean_longitude + mean_motion * (t1 - t0);

        let eccentricity_pow2 =
            self.eccentricity_sin_lon.powi(2) + self.eccentricity_cos_lon.powi(2);
        let epsilon = f64::EPSILON * 1e2;

        let mut longitude_of_periastre = 0.0;
        if eccentricity_pow2 > epsilon {
            longitude_of_periastre =
                principal_angle(self.eccentricity_sin_lon.atan2(self.eccentricity_cos_lon));
        }

        mean_longitude_t1 = principal_angle(mean_longitude_t1);
        if mean_longitude_t1 < longitude_of_periastre {
            mean_longitude_t1 += DPI;
        }

        let eccentric_anomaly =
            self.solve_kepler_equation(mean_longitude_t1, longitude_of_periastre)?;

        Ok(self.compute_cartesian_position_and_velocity(
            mean_motion,
            eccentric_anomaly,
            eccentricity_pow2,
        ))
    }
}

impl From<EquinoctialElements> for KeplerianElements {
    fn from(equinoctial: EquinoctialElements) -> Self {
        KeplerianElements::from_equinoctial_internal(
            equinoctial.reference_epoch,
            equinoctial.semi_major_axis,
            equinoctial.eccentricity_sin_lon,
            equinoctial.eccentricity_cos_lon,
            equinoctial.tan_half_incl_sin_node,
            equinoctial.tan_half_incl_cos_node,
            equinoctial.mean_longitude,
        )
    }
}

impl From<&EquinoctialElements> for KeplerianElements {
    fn from(equinoctial: &EquinoctialElements) -> Self {
        KeplerianElements::from_equinoctial_internal(
            equinoctial.reference_epoch,
            equinoctial.semi_major_axis,
            equinoctial.eccentricity_sin_lon,
            equinoctial.eccentricity_cos_lon,
            equinoctial.tan_half_incl_sin_node,
            equinoctial.tan_half_incl_cos_node,
            equinoctial.mean_longitude,
        )
    }
}
