//! Motion pairs for `AX = XB`.

use handeye_core::{Mat4, Real, RigidTransform};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::HandEyeError;

/// One observed pair of relative motions.
///
/// `gripper` is `Hgij`, the motion of the gripper/marker frame between two
/// stations; `camera` is `Hcij`, the motion of the camera/sensor frame
/// between the same two stations. The unknown `Hcg` satisfies
/// `Hcg * camera = gripper * Hcg`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPair {
    pub gripper: RigidTransform,
    pub camera: RigidTransform,
}

impl MotionPair {
    pub fn new(gripper: RigidTransform, camera: RigidTransform) -> Self {
        Self { gripper, camera }
    }
}

/// Which station pairs to turn into relative motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStrategy {
    /// Stations `(i, i + 1)`.
    #[default]
    Consecutive,
    /// Every station pair `(i, j)` with `i < j`.
    AllPairs,
}

/// Validate paired 4x4 motion matrices into [`MotionPair`]s.
///
/// Sizes are compared before anything is parsed.
pub fn motion_pairs_from_matrices(
    gripper: &[Mat4],
    camera: &[Mat4],
    tolerance: Real,
) -> Result<Vec<MotionPair>, HandEyeError> {
    if gripper.len() != camera.len() {
        return Err(HandEyeError::LengthMismatch {
            gripper: gripper.len(),
            camera: camera.len(),
        });
    }
    gripper
        .iter()
        .zip(camera.iter())
        .enumerate()
        .map(|(index, (g, c))| {
            let g = RigidTransform::from_matrix_with_tolerance(g, tolerance).map_err(|source| {
                HandEyeError::InvalidTransform {
                    index,
                    frame: "gripper",
                    source,
                }
            })?;
            let c = RigidTransform::from_matrix_with_tolerance(c, tolerance).map_err(|source| {
                HandEyeError::InvalidTransform {
                    index,
                    frame: "camera",
                    source,
                }
            })?;
            Ok(MotionPair::new(g, c))
        })
        .collect()
}

/// Build relative motions from absolute pose streams.
///
/// `base_gripper[k]` is the gripper pose in the robot base frame and
/// `camera_target[k]` the target pose in the camera frame at station `k`.
/// With `G_k * Hcg * C_k` constant, station pair `(i, j)` gives
///
/// ```text
/// Hgij = G_i^-1 * G_j
/// Hcij = C_i * C_j^-1
/// ```
pub fn motion_pairs_from_poses(
    base_gripper: &[RigidTransform],
    camera_target: &[RigidTransform],
    strategy: PairStrategy,
) -> Result<Vec<MotionPair>, HandEyeError> {
    if base_gripper.len() != camera_target.len() {
        return Err(HandEyeError::LengthMismatch {
            gripper: base_gripper.len(),
            camera: camera_target.len(),
        });
    }
    let num_poses = base_gripper.len();
    if num_poses < 2 {
        return Err(HandEyeError::NotEnoughPoses {
            required: 2,
            got: num_poses,
        });
    }

    let station_pairs: Vec<(usize, usize)> = match strategy {
        PairStrategy::Consecutive => (0..num_poses - 1).map(|i| (i, i + 1)).collect(),
        PairStrategy::AllPairs => (0..num_poses - 1)
            .flat_map(|i| ((i + 1)..num_poses).map(move |j| (i, j)))
            .collect(),
    };

    let pairs: Vec<MotionPair> = station_pairs
        .iter()
        .map(|&(i, j)| {
            let hg = &base_gripper[i].inverse() * &base_gripper[j];
            let hc = &camera_target[i] * &camera_target[j].inverse();
            MotionPair::new(hg, hc)
        })
        .collect();
    debug!(
        "built {} motion pairs from {} poses ({:?})",
        pairs.len(),
        num_poses,
        strategy
    );
    Ok(pairs)
}
