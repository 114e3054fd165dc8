//! Quaternion utilities shared by every interpolator.
//!
//! Rotations are handled as `nalgebra::UnitQuaternion<f64>`. Blending is done
//! on the raw 4-vectors (`coords`, ordered `[x, y, z, w]`) and always
//! re-normalized before a rotation leaves this module.

use crate::error::{Fallback, InterpolationError, Result};
use jointblend_env::EulerAngles;
use nalgebra::{Quaternion, UnitQuaternion, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Magnitude below which an IDW blend is treated as degenerate.
pub const IDW_NORM_THRESHOLD: f64 = 1e-10;

/// Magnitude below which an RBF evaluation is treated as degenerate.
pub const RBF_NORM_THRESHOLD: f64 = 1e-9;

/// How an Euler triple composes into a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EulerConvention {
    /// Rotate about X, then Y, then Z in the fixed frame: `R = Rz·Ry·Rx`.
    #[default]
    Xyz,

    /// Rotate about Z, then X, then Y in the fixed frame: `R = Ry·Rx·Rz`.
    /// This is how the calibration rig writes its angles.
    Zxy,
}

impl EulerConvention {
    /// Converts a degree triple to a unit quaternion.
    pub fn to_quaternion(&self, angles: &EulerAngles) -> UnitQuaternion<f64> {
        let [x, y, z] = angles.to_radians();
        match self {
            EulerConvention::Xyz => UnitQuaternion::from_euler_angles(x, y, z),
            EulerConvention::Zxy => {
                let qx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x);
                let qy = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y);
                let qz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z);
                qy * qx * qz
            }
        }
    }

    /// Decomposes a rotation back into a degree triple.
    ///
    /// Angles come back in `(-180, 180]`; the middle angle is limited to
    /// `[-90, 90]`.
    pub fn to_euler(&self, rotation: &UnitQuaternion<f64>) -> EulerAngles {
        match self {
            EulerConvention::Xyz => {
                let (roll, pitch, yaw) = rotation.euler_angles();
                EulerAngles::from_radians(roll, pitch, yaw)
            }
            EulerConvention::Zxy => {
                let r = rotation.to_rotation_matrix();
                let m = r.matrix();
                let sin_x = (-m[(1, 2)]).clamp(-1.0, 1.0);
                let x = sin_x.asin();

                // Gimbal lock: Y and Z share an axis, fold everything into Y
                let (y, z) = if sin_x.abs() < 1.0 - 1e-9 {
                    (m[(0, 2)].atan2(m[(2, 2)]), m[(1, 0)].atan2(m[(1, 1)]))
                } else {
                    ((-m[(2, 0)]).atan2(m[(0, 0)]), 0.0)
                };

                EulerAngles::from_radians(x, y, z)
            }
        }
    }
}

impl std::str::FromStr for EulerConvention {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xyz" => Ok(EulerConvention::Xyz),
            "zxy" | "unity" => Ok(EulerConvention::Zxy),
            _ => Err(format!("Unknown Euler convention: {}", s)),
        }
    }
}

/// A blended rotation plus the fallback taken to produce it, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolated {
    pub rotation: UnitQuaternion<f64>,
    pub fallback: Option<Fallback>,
}

impl Interpolated {
    pub fn exact(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            rotation,
            fallback: None,
        }
    }

    /// Identity rotation recorded as a fallback.
    pub fn identity(fallback: Fallback) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            fallback: Some(fallback),
        }
    }
}

/// Flips `q` into the same hemisphere as `reference`.
///
/// `q` and `-q` are the same rotation, but blending antipodal
/// representations component-wise cancels them out.
#[inline]
pub fn align_hemisphere(reference: &UnitQuaternion<f64>, q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    if reference.coords.dot(&q.coords) < 0.0 {
        UnitQuaternion::new_unchecked(-q.into_inner())
    } else {
        *q
    }
}

/// Aligns every quaternion against the first one.
pub fn align_to_first(quaternions: &[UnitQuaternion<f64>]) -> Vec<UnitQuaternion<f64>> {
    match quaternions.first() {
        Some(reference) => quaternions
            .iter()
            .map(|q| align_hemisphere(reference, q))
            .collect(),
        None => Vec::new(),
    }
}

/// Normalizes a raw `[x, y, z, w]` accumulator.
///
/// Returns the identity rotation with [`Fallback::DegenerateNormalization`]
/// when the magnitude is at or below `threshold` (or not finite).
pub fn normalize_or_identity(coords: Vector4<f64>, threshold: f64) -> Interpolated {
    let magnitude = coords.norm();
    if magnitude.is_finite() && magnitude > threshold {
        let q = Quaternion::from_vector(coords / magnitude);
        Interpolated::exact(UnitQuaternion::new_unchecked(q))
    } else {
        Interpolated::identity(Fallback::DegenerateNormalization)
    }
}

/// Weighted component-wise average of unit quaternions.
///
/// Quaternions are hemisphere-aligned against the first entry, accumulated
/// in `f64` with the given weights, then normalized. Weights are used as
/// given; callers normally pass weights summing to 1.
///
/// An empty input yields the identity with [`Fallback::EmptyNeighborSet`].
pub fn weighted_average(quaternions: &[UnitQuaternion<f64>], weights: &[f64]) -> Result<Interpolated> {
    if quaternions.len() != weights.len() {
        return Err(InterpolationError::LengthMismatch {
            expected: quaternions.len(),
            found: weights.len(),
        });
    }

    let reference = match quaternions.first() {
        Some(q) => *q,
        None => return Ok(Interpolated::identity(Fallback::EmptyNeighborSet)),
    };

    let mut accum = Vector4::zeros();
    for (q, &w) in quaternions.iter().zip(weights) {
        let aligned = align_hemisphere(&reference, q);
        accum += aligned.coords * w;
    }

    Ok(normalize_or_identity(accum, IDW_NORM_THRESHOLD))
}

/// Spherical interpolation from `a` (t = 0) to `b` (t = 1) along the
/// shortest arc.
pub fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    a.try_slerp(b, t, 1e-12).unwrap_or_else(|| {
        // Nearly identical inputs: a normalized lerp is exact enough
        let b = align_hemisphere(a, b);
        let blend = a.coords * (1.0 - t) + b.coords * t;
        normalize_or_identity(blend, IDW_NORM_THRESHOLD).rotation
    })
}

/// Rotation angle (radians, `[0, π]`) separating two orientations.
///
/// `q` and `-q` are at distance zero.
#[inline]
pub fn angular_distance(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    a.angle_to(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn euler(x: f64, y: f64, z: f64) -> UnitQuaternion<f64> {
        EulerConvention::Xyz.to_quaternion(&EulerAngles::new(x, y, z))
    }

    #[test]
    fn test_xyz_single_axis() {
        let q = euler(90.0, 0.0, 0.0);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        assert!(angular_distance(&q, &expected) < 1e-12);
    }

    #[test]
    fn test_xyz_order_matches_fixed_axes() {
        let q = euler(30.0, 40.0, 50.0);
        let qx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 30f64.to_radians());
        let qy = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 40f64.to_radians());
        let qz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 50f64.to_radians());
        assert!(angular_distance(&q, &(qz * qy * qx)) < 1e-12);
    }

    #[test]
    fn test_euler_decomposition_recovers_angles() {
        for convention in [EulerConvention::Xyz, EulerConvention::Zxy] {
            let angles = EulerAngles::new(20.0, -35.0, 70.0);
            let q = convention.to_quaternion(&angles);
            let back = convention.to_euler(&q);

            assert_relative_eq!(back.x, angles.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, angles.y, epsilon = 1e-9);
            assert_relative_eq!(back.z, angles.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zxy_gimbal_lock_keeps_rotation() {
        let angles = EulerAngles::new(90.0, 30.0, 10.0);
        let q = EulerConvention::Zxy.to_quaternion(&angles);
        let back = EulerConvention::Zxy.to_euler(&q);
        let q_back = EulerConvention::Zxy.to_quaternion(&back);

        assert!(angular_distance(&q, &q_back) < 1e-6);
    }

    #[test]
    fn test_align_hemisphere_flips_negative_dot() {
        let q = euler(10.0, 0.0, 0.0);
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());

        let aligned = align_hemisphere(&q, &flipped);
        assert!(aligned.coords.dot(&q.coords) > 0.0);
        assert_relative_eq!(aligned.coords, q.coords, epsilon = 1e-15);
    }

    #[test]
    fn test_normalize_degenerate_returns_identity() {
        let result = normalize_or_identity(Vector4::new(1e-12, 0.0, 0.0, 0.0), IDW_NORM_THRESHOLD);
        assert_eq!(result.rotation, UnitQuaternion::identity());
        assert_eq!(result.fallback, Some(Fallback::DegenerateNormalization));
    }

    #[test]
    fn test_weighted_average_halfway_about_y() {
        let quats = [euler(0.0, 0.0, 0.0), euler(0.0, 90.0, 0.0)];
        let result = weighted_average(&quats, &[0.5, 0.5]).unwrap();

        assert!(result.fallback.is_none());
        assert_relative_eq!(result.rotation.coords.norm(), 1.0, epsilon = 1e-5);

        let angles = EulerConvention::Xyz.to_euler(&result.rotation);
        assert!((44.0..=46.0).contains(&angles.y), "expected ~45°, got {}", angles.y);
    }

    #[test]
    fn test_weighted_average_antipodal_inputs_do_not_cancel() {
        let q = euler(0.0, 0.0, 30.0);
        let neg = UnitQuaternion::new_unchecked(-q.into_inner());

        let result = weighted_average(&[q, neg], &[0.5, 0.5]).unwrap();
        assert!(result.fallback.is_none());
        assert!(angular_distance(&result.rotation, &q) < 1e-12);
    }

    #[test]
    fn test_weighted_average_empty_is_identity() {
        let result = weighted_average(&[], &[]).unwrap();
        assert_eq!(result.rotation, UnitQuaternion::identity());
        assert_eq!(result.fallback, Some(Fallback::EmptyNeighborSet));
    }

    #[test]
    fn test_weighted_average_length_mismatch() {
        let err = weighted_average(&[euler(0.0, 0.0, 0.0)], &[0.5, 0.5]).unwrap_err();
        assert_eq!(err, InterpolationError::LengthMismatch { expected: 1, found: 2 });
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = euler(0.0, 0.0, 0.0);
        let b = euler(90.0, 0.0, 0.0);

        assert!(angular_distance(&slerp(&a, &b, 0.0), &a) < 1e-12);
        assert!(angular_distance(&slerp(&a, &b, 1.0), &b) < 1e-12);

        let mid = EulerConvention::Xyz.to_euler(&slerp(&a, &b, 0.5));
        assert_relative_eq!(mid.x, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_identical_inputs() {
        let a = euler(12.0, 5.0, -3.0);
        assert!(angular_distance(&slerp(&a, &a, 0.3), &a) < 1e-12);
    }

    fn unit_quaternion() -> impl Strategy<Value = UnitQuaternion<f64>> {
        (-180.0..180.0f64, -89.0..89.0f64, -180.0..180.0f64)
            .prop_map(|(x, y, z)| euler(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_weighted_average_is_unit(
            quats in prop::collection::vec(unit_quaternion(), 1..8),
            raw in prop::collection::vec(0.01..1.0f64, 8),
        ) {
            let raw = &raw[..quats.len()];
            let sum: f64 = raw.iter().sum();
            let weights: Vec<f64> = raw.iter().map(|w| w / sum).collect();

            let result = weighted_average(&quats, &weights).unwrap();
            prop_assert!((result.rotation.coords.norm() - 1.0).abs() < 1e-5);
        }

        #[test]
        fn prop_weighted_average_sign_invariant(
            quats in prop::collection::vec(unit_quaternion(), 1..6),
            flips in prop::collection::vec(any::<bool>(), 6),
        ) {
            let weights = vec![1.0 / quats.len() as f64; quats.len()];
            let flipped: Vec<_> = quats
                .iter()
                .zip(&flips)
                .map(|(q, &f)| if f { UnitQuaternion::new_unchecked(-q.into_inner()) } else { *q })
                .collect();

            let a = weighted_average(&quats, &weights).unwrap().rotation;
            let b = weighted_average(&flipped, &weights).unwrap().rotation;
            prop_assert!(angular_distance(&a, &b) < 1e-9);
        }
    }
}
