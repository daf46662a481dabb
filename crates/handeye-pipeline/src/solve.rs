//! Hand-eye calibration from JSON inputs.
//!
//! Input matrices are row-major `[[f64; 4]; 4]` arrays. Depending on
//! [`InputKind`] they are either relative motions (`Hgij`, `Hcij`) fed to the
//! solver directly, or absolute poses (base->gripper and camera->target) that
//! are first turned into motion pairs.

use std::path::Path;

use anyhow::{Context, Result};
use handeye_core::{
    mat4_from_rows, mat4_to_rows, quaternion_to_wxyz, rotation_to_euler_zyx,
    rotation_to_quaternion, EulerZyx, Mat4, Real, RigidTransform,
};
use handeye_linear::{
    motion_pairs_from_matrices, motion_pairs_from_poses, HandEyeSolver, MotionPair, PairStrategy,
    TsaiOptions,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::load_json_file;

/// How to interpret [`HandEyeInput`] matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// `gripper[i]` = `Hgij`, `camera[i]` = `Hcij`.
    #[default]
    Motions,
    /// `gripper[k]` = base->gripper pose, `camera[k]` = camera->target pose.
    Poses,
}

/// Configuration of a hand-eye run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandEyeConfig {
    pub input_kind: InputKind,
    /// Station pairing, only used for [`InputKind::Poses`].
    pub pair_strategy: PairStrategy,
    pub tsai: TsaiOptions,
}

/// Raw hand-eye input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandEyeInput {
    pub gripper: Vec<[[Real; 4]; 4]>,
    pub camera: Vec<[[Real; 4]; 4]>,
}

impl HandEyeInput {
    pub fn from_transforms(gripper: &[RigidTransform], camera: &[RigidTransform]) -> Self {
        Self {
            gripper: gripper.iter().map(|t| mat4_to_rows(&t.to_matrix())).collect(),
            camera: camera.iter().map(|t| mat4_to_rows(&t.to_matrix())).collect(),
        }
    }
}

/// Serializable hand-eye result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandEyeReport {
    /// `Hcg` (camera -> gripper), row-major.
    pub hcg: [[Real; 4]; 4],
    /// Rotation of `Hcg` as `[w, x, y, z]`.
    pub rotation_wxyz: [Real; 4],
    /// Rotation of `Hcg` as z-y-x Euler angles.
    pub rotation_euler: EulerZyx,
    pub total_pairs: usize,
    pub used_pairs: usize,
    pub skipped_pairs: Vec<usize>,
    pub rotation_rms: Real,
    pub translation_rms: Real,
}

impl HandEyeReport {
    pub fn transform(&self) -> Result<RigidTransform> {
        RigidTransform::from_matrix(&mat4_from_rows(&self.hcg))
            .context("report holds a non-rigid transform")
    }
}

fn build_pairs(input: &HandEyeInput, config: &HandEyeConfig) -> Result<Vec<MotionPair>> {
    let gripper: Vec<Mat4> = input.gripper.iter().map(mat4_from_rows).collect();
    let camera: Vec<Mat4> = input.camera.iter().map(mat4_from_rows).collect();
    let parsed = motion_pairs_from_matrices(&gripper, &camera, config.tsai.transform_tolerance)?;

    match config.input_kind {
        InputKind::Motions => Ok(parsed),
        InputKind::Poses => {
            let base_gripper: Vec<RigidTransform> = parsed.iter().map(|p| p.gripper).collect();
            let camera_target: Vec<RigidTransform> = parsed.iter().map(|p| p.camera).collect();
            Ok(motion_pairs_from_poses(
                &base_gripper,
                &camera_target,
                config.pair_strategy,
            )?)
        }
    }
}

/// Run Tsai hand-eye calibration on an in-memory input.
pub fn run_handeye(input: &HandEyeInput, config: &HandEyeConfig) -> Result<HandEyeReport> {
    let pairs = build_pairs(input, config)?;
    let estimate = HandEyeSolver::new(config.tsai)
        .solve(&pairs)
        .context("hand-eye calibration failed")?;

    let rotation = estimate.transform.rotation();
    let q = rotation_to_quaternion(rotation)?;
    info!(
        "hand-eye solved from {}/{} motion pairs",
        estimate.used_pairs,
        pairs.len()
    );

    Ok(HandEyeReport {
        hcg: mat4_to_rows(&estimate.transform.to_matrix()),
        rotation_wxyz: quaternion_to_wxyz(q.quaternion()),
        rotation_euler: rotation_to_euler_zyx(rotation),
        total_pairs: pairs.len(),
        used_pairs: estimate.used_pairs,
        skipped_pairs: estimate.skipped_pairs,
        rotation_rms: estimate.rotation_rms,
        translation_rms: estimate.translation_rms,
    })
}

/// Load input (and optional config) JSON files and run [`run_handeye`].
pub fn run_handeye_from_files(
    input_path: &Path,
    config_path: Option<&Path>,
) -> Result<HandEyeReport> {
    let input: HandEyeInput = load_json_file(input_path)?;
    let config = match config_path {
        Some(path) => load_json_file::<HandEyeConfig>(path)?,
        None => HandEyeConfig::default(),
    };
    run_handeye(&input, &config)
        .with_context(|| format!("while solving {}", input_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use handeye_core::{synthetic, Vec3};
    use handeye_linear::HandEyeError;

    fn ground_truth() -> RigidTransform {
        synthetic::motion(&Vec3::new(0.5, 0.5, -0.2), 1.2, Vec3::new(-0.02, 0.04, 0.1)).unwrap()
    }

    #[test]
    fn motions_input_recovers_ground_truth() {
        let hcg = ground_truth();
        let gripper = synthetic::default_gripper_motions();
        let camera = synthetic::camera_motions(&hcg, &gripper);
        let input = HandEyeInput::from_transforms(&gripper, &camera);

        let report = run_handeye(&input, &HandEyeConfig::default()).unwrap();
        assert_eq!(report.total_pairs, 5);
        assert_eq!(report.used_pairs, 5);
        let est = report.transform().unwrap();
        assert!((est.to_matrix() - hcg.to_matrix()).norm() < 1e-9);
        assert!(report.rotation_wxyz[0] >= 0.0);
    }

    #[test]
    fn poses_input_uses_pair_strategy() {
        let hcg = ground_truth();
        let base_target =
            synthetic::motion(&Vec3::new(0.0, 1.0, 0.0), 2.0, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let robot = synthetic::default_gripper_motions();
        let camera = synthetic::camera_target_poses(&hcg, &base_target, &robot);
        let input = HandEyeInput::from_transforms(&robot, &camera);

        let config = HandEyeConfig {
            input_kind: InputKind::Poses,
            pair_strategy: PairStrategy::AllPairs,
            ..HandEyeConfig::default()
        };
        let report = run_handeye(&input, &config).unwrap();
        assert_eq!(report.total_pairs, 10);
        let est = report.transform().unwrap();
        assert!((est.to_matrix() - hcg.to_matrix()).norm() < 1e-8);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let gripper = synthetic::default_gripper_motions();
        let input = HandEyeInput::from_transforms(&gripper, &gripper[..4]);
        let err = run_handeye(&input, &HandEyeConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HandEyeError>(),
            Some(HandEyeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn config_json_defaults() {
        let config: HandEyeConfig =
            serde_json::from_str(r#"{"input_kind": "poses", "tsai": {"min_pairs": 2}}"#).unwrap();
        assert_eq!(config.input_kind, InputKind::Poses);
        assert_eq!(config.pair_strategy, PairStrategy::Consecutive);
        assert_eq!(config.tsai.min_pairs, 2);
        assert!(config.tsai.project_rotations);
    }
}
