//! # Reference frame helpers
//!
//! Small set of frame conversions needed to turn simulated heliocentric
//! ecliptic states into observed equatorial angles:
//!
//! - [`obleq`] – mean obliquity of the ecliptic at a given epoch,
//! - [`rotmt`] – elementary rotation matrix about one of the coordinate axes,
//! - [`ecliptic_to_equatorial`] – the J2000 ecliptic → equatorial rotation,
//! - [`correct_light_time`] – first-order light-time correction of a
//!   topocentric position,
//! - [`cartesian_to_radec`] – Cartesian position → (α, δ, ρ).
//!
//! All positions are in AU and all angles in radians unless stated otherwise.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Radian, DPI, RADSEC, T2000, VLIGHT_AU};

/// Compute the mean obliquity of the ecliptic at a given epoch.
///
/// Uses the IAU 1980 polynomial in Julian centuries since J2000.
///
/// Arguments
/// ---------
/// * `tjm`: epoch in Modified Julian Date.
///
/// Returns
/// --------
/// * Mean obliquity ε in radians.
pub fn obleq(tjm: f64) -> Radian {
    // Obliquity coefficients
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (tjm - T2000) / 36525.0;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Elementary rotation matrix about a coordinate axis.
///
/// Arguments
/// ---------
/// * `alpha`: rotation angle in radians.
/// * `k`: axis index (0 = x, 1 = y, 2 = z).
///
/// Returns
/// --------
/// * The active rotation matrix R_k(α): applied to a vector, it rotates the
///   vector by `alpha` around the chosen axis.
pub fn rotmt(alpha: f64, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Rotation matrix from mean ecliptic J2000 to mean equatorial J2000 coordinates.
///
/// A vector `v_ecl` in ecliptic coordinates maps to `ecliptic_to_equatorial() * v_ecl`
/// in equatorial coordinates (rotation by the J2000 mean obliquity about the x axis).
pub fn ecliptic_to_equatorial() -> Matrix3<f64> {
    rotmt(obleq(T2000), 0)
}

/// Apply the first-order light-time correction to a topocentric position.
///
/// The object is seen where it was one light-travel-time ago, so its apparent
/// position is shifted back along the relative velocity:
///
/// ```text
/// x_corr = xrel − (‖xrel‖ / c) · vrel
/// ```
///
/// Arguments
/// ---------
/// * `xrel`: position of the object relative to the observer [AU].
/// * `vrel`: velocity of the object relative to the observer [AU/day].
///
/// Returns
/// --------
/// * Corrected topocentric position [AU]. Not normalized.
pub(crate) fn correct_light_time(xrel: Vector3<f64>, vrel: Vector3<f64>) -> Vector3<f64> {
    let norm_vector = xrel.norm();
    let dt = norm_vector / VLIGHT_AU;
    xrel - dt * vrel
}

/// Convert a 3D Cartesian position vector to right ascension and declination.
///
/// Arguments
/// ---------
/// * `cartesian_position`: 3D position vector in an equatorial frame [AU or any length unit].
///
/// Returns
/// --------
/// * Tuple `(α, δ, ρ)`:
///     - `α`: right ascension in radians, in the range [0, 2π).
///     - `δ`: declination in radians, in the range [−π/2, +π/2].
///     - `ρ`: Euclidean norm of the vector (distance to the origin).
///
/// Remarks
/// -------
/// * If the input vector has zero norm, the result is `(0.0, 0.0, 0.0)`.
/// * The RA computation uses `atan2` to preserve quadrant information.
pub(crate) fn cartesian_to_radec(cartesian_position: Vector3<f64>) -> (f64, f64, f64) {
    let pos_norm = cartesian_position.norm();
    if pos_norm == 0. {
        return (0.0, 0.0, pos_norm);
    }

    let delta = (cartesian_position.z / pos_norm).asin();

    let cos_delta = delta.cos();
    if cos_delta == 0.0 {
        return (0.0, delta, pos_norm);
    }

    let cos_alpha = cartesian_position.x / (pos_norm * cos_delta);
    let sin_alpha = cartesian_position.y / (pos_norm * cos_delta);
    let alpha = sin_alpha.atan2(cos_alpha);
    let alpha = if alpha < 0.0 { alpha + DPI } else { alpha };
    (alpha, delta, pos_norm)
}
