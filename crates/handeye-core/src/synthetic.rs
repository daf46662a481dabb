//! Deterministic synthetic data for hand-eye calibration problems.
//!
//! Used by tests across the workspace and by the CLI smoke tests. Nothing
//! here depends on `rand`: noise comes from a fixed SplitMix64 stream keyed
//! by `(seed, index)`, so datasets are identical across platforms.
//!
//! Frame conventions match the solver: `hcg` maps camera coordinates into
//! gripper coordinates, gripper motions `Hg` and camera motions `Hc` satisfy
//! `hcg * Hc = Hg * hcg`.

use nalgebra::{Rotation3, Unit};

use crate::{Iso3, Mat3, Real, RigidTransform, TransformError, UnitQuat, Vec3};

/// Rotation of `angle` radians about `axis` (normalized internally).
pub fn rotation_about(axis: &Vec3, angle: Real) -> Mat3 {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle).into_inner()
}

/// Rigid motion from an axis-angle rotation and a translation.
///
/// A zero or non-finite axis (or non-finite angle/translation) yields
/// [`TransformError::NonFinite`].
pub fn motion(
    axis: &Vec3,
    angle: Real,
    translation: Vec3,
) -> Result<RigidTransform, TransformError> {
    RigidTransform::new(rotation_about(axis, angle), translation)
}

fn fixed_motion(axis: [Real; 3], angle: Real, translation: [Real; 3]) -> RigidTransform {
    let axis = Unit::new_normalize(Vec3::from(axis));
    RigidTransform::from_isometry(&Iso3::from_parts(
        Vec3::from(translation).into(),
        UnitQuat::from_axis_angle(&axis, angle),
    ))
}

/// A handful of well-conditioned gripper motions with distinct axes.
pub fn default_gripper_motions() -> Vec<RigidTransform> {
    vec![
        fixed_motion([1.0, 0.2, -0.1], 0.45, [0.10, 0.20, 0.30]),
        fixed_motion([-0.1, 1.0, 0.3], 0.60, [-0.20, 0.10, 0.05]),
        fixed_motion([0.2, -0.3, 1.0], 0.70, [0.05, -0.10, 0.20]),
        fixed_motion([0.7, 0.7, 0.1], 0.35, [0.30, -0.25, -0.10]),
        fixed_motion([-0.5, 0.2, 0.8], 0.90, [-0.15, 0.05, 0.25]),
    ]
}

/// Camera motions consistent with `gripper_motions`: `Hc = hcg^-1 * Hg * hcg`.
pub fn camera_motions(
    hcg: &RigidTransform,
    gripper_motions: &[RigidTransform],
) -> Vec<RigidTransform> {
    let hcg_inv = hcg.inverse();
    gripper_motions
        .iter()
        .map(|hg| &(&hcg_inv * hg) * hcg)
        .collect()
}

/// Camera-from-target poses for eye-in-hand acquisition.
///
/// `base_target` is the fixed target pose in the robot base frame and
/// `base_gripper` the robot poses; `G * hcg * C = base_target` gives
/// `C = hcg^-1 * G^-1 * base_target`.
pub fn camera_target_poses(
    hcg: &RigidTransform,
    base_target: &RigidTransform,
    base_gripper: &[RigidTransform],
) -> Vec<RigidTransform> {
    let hcg_inv = hcg.inverse();
    base_gripper
        .iter()
        .map(|g| &(&hcg_inv * &g.inverse()) * base_target)
        .collect()
}

/// Deterministic uniform perturbation of rigid motions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute rotation-vector component (radians).
    pub max_rotation: Real,
    /// Maximum absolute translation component.
    pub max_translation: Real,
}

impl MotionNoise {
    /// Perturb `t` with the noise sample for `index`.
    ///
    /// Non-finite magnitudes surface as [`TransformError::NonFinite`].
    pub fn apply(
        &self,
        index: usize,
        t: &RigidTransform,
    ) -> Result<RigidTransform, TransformError> {
        let w = self.sample_vec(index, 0) * self.max_rotation.abs();
        let v = self.sample_vec(index, 1) * self.max_translation.abs();
        let dr = Rotation3::new(w).into_inner();
        RigidTransform::new(dr * t.rotation(), t.translation() + v)
    }

    /// Vector with components in `[-1, 1)`.
    fn sample_vec(&self, index: usize, stream: u64) -> Vec3 {
        let key = mix_key(self.seed, index, stream);
        Vec3::new(
            unit_sym(splitmix64(key)),
            unit_sym(splitmix64(key ^ 0x94D0_49BB_1331_11EB)),
            unit_sym(splitmix64(key ^ 0xBF58_476D_1CE4_E5B9)),
        )
    }
}

#[inline]
fn mix_key(seed: u64, index: usize, stream: u64) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ stream.wrapping_mul(0xD1B5_4A32_D192_ED03)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn unit_sym(x: u64) -> Real {
    // top 53 bits -> [0, 1) -> [-1, 1)
    let u = ((x >> 11) as Real) * (1.0 / ((1u64 << 53) as Real));
    2.0 * u - 1.0
}
