//! Integration tests for Tsai hand-eye calibration on synthetic pose streams.
//!
//! Covers:
//! 1. exact recovery from absolute eye-in-hand pose streams,
//! 2. graceful accuracy under small deterministic noise,
//! 3. rejection of a degenerate (single-axis) acquisition, with and without
//!    measurement noise.

use handeye_core::{synthetic, synthetic::MotionNoise, Real, RigidTransform, Vec3};
use handeye_linear::{
    motion_pairs_from_poses, HandEyeError, HandEyeSolver, PairStrategy, TsaiOptions,
};

fn rotation_angle_between(a: &RigidTransform, b: &RigidTransform) -> Real {
    let r_diff = a.rotation().transpose() * b.rotation();
    let cos_theta = ((r_diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    cos_theta.acos()
}

fn scene() -> (RigidTransform, RigidTransform, Vec<RigidTransform>) {
    let hcg = synthetic::motion(
        &Vec3::new(-0.4, 0.1, 0.9),
        1.9,
        Vec3::new(0.03, -0.08, 0.12),
    )
    .unwrap();
    let base_target = synthetic::motion(
        &Vec3::new(1.0, 0.0, 0.0),
        3.1,
        Vec3::new(0.6, 0.1, -0.05),
    )
    .unwrap();
    let robot_poses = synthetic::default_gripper_motions();
    (hcg, base_target, robot_poses)
}

#[test]
fn eye_in_hand_pose_streams_recover_handeye() {
    let (hcg, base_target, robot_poses) = scene();
    let camera_poses = synthetic::camera_target_poses(&hcg, &base_target, &robot_poses);

    for strategy in [PairStrategy::Consecutive, PairStrategy::AllPairs] {
        let pairs = motion_pairs_from_poses(&robot_poses, &camera_poses, strategy).unwrap();
        let est = HandEyeSolver::new(TsaiOptions::default())
            .solve(&pairs)
            .unwrap();

        let dt = (est.transform.translation() - hcg.translation()).norm();
        let ang = rotation_angle_between(&est.transform, &hcg);
        assert!(dt < 1e-8, "{strategy:?}: translation error {dt}");
        assert!(ang < 1e-8, "{strategy:?}: rotation error {ang}");
    }
}

#[test]
fn small_noise_gives_small_error() {
    let (hcg, base_target, robot_poses) = scene();
    let noise = MotionNoise {
        seed: 42,
        max_rotation: 1e-4,
        max_translation: 1e-4,
    };
    let camera_poses: Vec<RigidTransform> =
        synthetic::camera_target_poses(&hcg, &base_target, &robot_poses)
            .iter()
            .enumerate()
            .map(|(i, c)| noise.apply(i, c).unwrap())
            .collect();

    let pairs = motion_pairs_from_poses(&robot_poses, &camera_poses, PairStrategy::AllPairs)
        .unwrap();
    let est = HandEyeSolver::default().solve(&pairs).unwrap();

    let dt = (est.transform.translation() - hcg.translation()).norm();
    let ang = rotation_angle_between(&est.transform, &hcg);
    assert!(dt < 1e-2, "translation error {dt}");
    assert!(ang < 5e-3, "rotation error {ang}");
    assert!(est.rotation_rms > 0.0);
}

fn single_axis_robot_poses() -> Vec<RigidTransform> {
    let axis = Vec3::new(0.0, 0.0, 1.0);
    (0..5)
        .map(|k| {
            let kf = k as Real;
            synthetic::motion(&axis, 0.25 * kf, Vec3::new(0.1 * kf, 0.05, 0.8)).unwrap()
        })
        .collect()
}

#[test]
fn single_axis_acquisition_is_rejected() {
    let (hcg, base_target, _) = scene();
    let robot_poses = single_axis_robot_poses();
    let camera_poses = synthetic::camera_target_poses(&hcg, &base_target, &robot_poses);
    let pairs =
        motion_pairs_from_poses(&robot_poses, &camera_poses, PairStrategy::AllPairs).unwrap();

    let err = HandEyeSolver::default().solve(&pairs).unwrap_err();
    assert!(
        matches!(err, HandEyeError::DegenerateMotions { .. }),
        "unexpected: {err}"
    );
}

#[test]
fn noisy_single_axis_acquisition_is_still_rejected() {
    let (hcg, base_target, _) = scene();
    let robot_poses = single_axis_robot_poses();
    let camera_poses = synthetic::camera_target_poses(&hcg, &base_target, &robot_poses);

    for magnitude in [1e-9, 1e-6, 1e-4] {
        let perturb = |seed: u64, poses: &[RigidTransform]| -> Vec<RigidTransform> {
            let noise = MotionNoise {
                seed,
                max_rotation: magnitude,
                max_translation: magnitude,
            };
            poses
                .iter()
                .enumerate()
                .map(|(i, p)| noise.apply(i, p).unwrap())
                .collect()
        };
        let noisy_robot = perturb(11, &robot_poses);
        let noisy_camera = perturb(12, &camera_poses);
        let pairs =
            motion_pairs_from_poses(&noisy_robot, &noisy_camera, PairStrategy::AllPairs).unwrap();

        let err = HandEyeSolver::default().solve(&pairs).unwrap_err();
        assert!(
            matches!(err, HandEyeError::DegenerateMotions { .. }),
            "noise {magnitude:e}: unexpected {err}"
        );
    }
}

#[test]
fn disabling_the_conditioning_check_lets_noisy_single_axis_through() {
    let (hcg, base_target, _) = scene();
    let robot_poses = single_axis_robot_poses();
    let noise = MotionNoise {
        seed: 5,
        max_rotation: 1e-4,
        max_translation: 0.0,
    };
    let noisy_robot: Vec<RigidTransform> = robot_poses
        .iter()
        .enumerate()
        .map(|(i, p)| noise.apply(i, p).unwrap())
        .collect();
    let camera_poses = synthetic::camera_target_poses(&hcg, &base_target, &robot_poses);
    let pairs =
        motion_pairs_from_poses(&noisy_robot, &camera_poses, PairStrategy::AllPairs).unwrap();

    let strict = HandEyeSolver::default().solve(&pairs);
    assert!(matches!(strict, Err(HandEyeError::DegenerateMotions { .. })));

    let lax = TsaiOptions {
        min_conditioning: 0.0,
        ..TsaiOptions::default()
    };
    assert!(HandEyeSolver::new(lax).solve(&pairs).is_ok());
}
