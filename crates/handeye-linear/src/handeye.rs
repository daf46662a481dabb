//! Hand-eye calibration (AX = XB) using Tsai's method.
//!
//! Reference: R. Y. Tsai, R. K. Lenz, "A New Technique for Fully Autonomous
//! and Efficient 3D Robotics Hand/Eye Calibration", IEEE Trans. Robotics and
//! Automation, 1989.
//!
//! Given motion pairs `(Hgij, Hcij)` the solver returns `Hcg` with
//! `Hcg * Hcij ~= Hgij * Hcg`:
//!
//! 1. per pair, modified Rodrigues parameters `P = 2 sin(theta / 2) * axis`
//!    of both rotations,
//! 2. stack `skew(Pg + Pc) * P' = Pc - Pg` and solve for `P'`,
//! 3. `Pcg = 2 P' / sqrt(1 + |P'|^2)` and the closed-form rotation
//!    `Rcg = (1 - |Pcg|^2 / 2) I + (Pcg Pcg^T + sqrt(4 - |Pcg|^2) [Pcg]x) / 2`,
//! 4. stack `(Rg - I) * Tcg = Rcg * Tc - Tg` and solve for `Tcg`.
//!
//! Both solves go through an SVD pseudo-inverse that checks the numerical
//! rank and the ratio `sigma_min / sigma_max`. Degenerate motion sets (e.g.
//! every rotation about the same axis) are reported as errors, including
//! when measurement noise keeps the stacked matrix formally full rank.

use std::fmt;

use handeye_core::{
    project_to_so3, skew, solve_well_conditioned, AxisAngle, LinalgError, Mat3, Mat4, Real,
    RigidTransform, TransformError, Vec3, ORTHONORMAL_TOLERANCE,
};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{motion_pairs_from_matrices, MotionPair};

/// Allowed overshoot of `|Pcg|^2` above 4 before it counts as a failure.
const ROTATION_DOMAIN_SLACK: Real = 1e-9;

/// Which of the two linear solves an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    Rotation,
    Translation,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStage::Rotation => f.write_str("rotation"),
            SolveStage::Translation => f.write_str("translation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandEyeError {
    #[error("inconsistent hand-eye input sizes: gripper {gripper} vs camera {camera}")]
    LengthMismatch { gripper: usize, camera: usize },
    #[error("need at least {required} motion pairs, got {got}")]
    NotEnoughPairs { required: usize, got: usize },
    #[error("need at least {required} poses, got {got}")]
    NotEnoughPoses { required: usize, got: usize },
    #[error("invalid {frame} transform at index {index}: {source}")]
    InvalidTransform {
        index: usize,
        frame: &'static str,
        #[source]
        source: TransformError,
    },
    #[error("only {usable} motion pairs carry a usable rotation, need at least 2")]
    InsufficientRotation { usable: usize },
    #[error("degenerate motion set in {stage} estimation: {source}")]
    DegenerateMotions {
        stage: SolveStage,
        #[source]
        source: LinalgError,
    },
    #[error("linear solve failed in {stage} estimation: {source}")]
    Linalg {
        stage: SolveStage,
        #[source]
        source: LinalgError,
    },
    #[error("rotation parameters out of domain: |Pcg|^2 = {0} > 4")]
    RotationOutOfDomain(Real),
    #[error("non-finite values in {0} estimation")]
    NonFinite(SolveStage),
    #[error("estimated transform is not rigid: {0}")]
    InvalidEstimate(#[source] TransformError),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl HandEyeError {
    fn from_linalg(stage: SolveStage, source: LinalgError) -> Self {
        match source {
            LinalgError::RankDeficient { .. } | LinalgError::IllConditioned { .. } => {
                HandEyeError::DegenerateMotions { stage, source }
            }
            LinalgError::NonFinite => HandEyeError::NonFinite(stage),
            other => HandEyeError::Linalg {
                stage,
                source: other,
            },
        }
    }
}

/// Options for [`HandEyeSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsaiOptions {
    /// Minimum number of motion pairs accepted (never below 2).
    pub min_pairs: usize,
    /// Pairs whose gripper or camera rotation angle is at or below this
    /// (radians) are left out of the rotation system.
    pub min_rotation_rad: Real,
    /// Relative singular-value threshold for the rank checks.
    pub rank_tolerance: Real,
    /// Smallest accepted `sigma_min / sigma_max` of either stacked system.
    /// Near-single-axis acquisitions fall below it even with noise.
    pub min_conditioning: Real,
    /// Project rotation blocks onto SO(3) before extracting axis-angle.
    pub project_rotations: bool,
    /// Orthonormality tolerance when parsing raw 4x4 matrices.
    pub transform_tolerance: Real,
}

impl Default for TsaiOptions {
    fn default() -> Self {
        Self {
            min_pairs: 3,
            min_rotation_rad: 1e-6,
            rank_tolerance: 1e-8,
            min_conditioning: 1e-2,
            project_rotations: true,
            transform_tolerance: ORTHONORMAL_TOLERANCE,
        }
    }
}

impl TsaiOptions {
    pub fn validate(&self) -> Result<(), HandEyeError> {
        if self.min_pairs < 2 {
            return Err(HandEyeError::InvalidOptions(format!(
                "min_pairs must be at least 2, got {}",
                self.min_pairs
            )));
        }
        if !(self.min_rotation_rad >= 0.0 && self.min_rotation_rad.is_finite()) {
            return Err(HandEyeError::InvalidOptions(format!(
                "min_rotation_rad must be finite and non-negative, got {}",
                self.min_rotation_rad
            )));
        }
        if !(self.rank_tolerance > 0.0 && self.rank_tolerance < 1.0) {
            return Err(HandEyeError::InvalidOptions(format!(
                "rank_tolerance must be in (0, 1), got {}",
                self.rank_tolerance
            )));
        }
        if !(self.min_conditioning >= 0.0 && self.min_conditioning < 1.0) {
            return Err(HandEyeError::InvalidOptions(format!(
                "min_conditioning must be in [0, 1), got {}",
                self.min_conditioning
            )));
        }
        if !(self.transform_tolerance > 0.0 && self.transform_tolerance.is_finite()) {
            return Err(HandEyeError::InvalidOptions(format!(
                "transform_tolerance must be positive, got {}",
                self.transform_tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a Tsai solve.
#[derive(Debug, Clone, PartialEq)]
pub struct TsaiEstimate {
    /// `Hcg`: maps camera coordinates into gripper coordinates.
    pub transform: RigidTransform,
    /// Pairs that entered the rotation system.
    pub used_pairs: usize,
    /// Indices of pairs left out of the rotation system (rotation too small).
    pub skipped_pairs: Vec<usize>,
    /// RMS residual of the stacked rotation system.
    pub rotation_rms: Real,
    /// RMS residual of the stacked translation system.
    pub translation_rms: Real,
}

/// Tsai's closed-form hand-eye solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandEyeSolver {
    options: TsaiOptions,
}

struct RotationStage {
    rotation: Mat3,
    used_pairs: usize,
    skipped_pairs: Vec<usize>,
    rms: Real,
}

impl HandEyeSolver {
    pub fn new(options: TsaiOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TsaiOptions {
        &self.options
    }

    /// Solve `Hcg * Hcij = Hgij * Hcg` over all pairs.
    pub fn solve(&self, pairs: &[MotionPair]) -> Result<TsaiEstimate, HandEyeError> {
        self.options.validate()?;
        if pairs.len() < self.options.min_pairs {
            return Err(HandEyeError::NotEnoughPairs {
                required: self.options.min_pairs,
                got: pairs.len(),
            });
        }

        let rot = self.estimate_rotation(pairs)?;
        let (translation, translation_rms) = self.estimate_translation(pairs, &rot.rotation)?;
        let transform = RigidTransform::new(rot.rotation, translation)
            .map_err(HandEyeError::InvalidEstimate)?;

        debug!(
            "tsai: {} pairs used, {} skipped, rms rot {:.3e} / trans {:.3e}",
            rot.used_pairs,
            rot.skipped_pairs.len(),
            rot.rms,
            translation_rms
        );

        Ok(TsaiEstimate {
            transform,
            used_pairs: rot.used_pairs,
            skipped_pairs: rot.skipped_pairs,
            rotation_rms: rot.rms,
            translation_rms,
        })
    }

    fn solve_stacked(
        &self,
        a: &DMatrix<Real>,
        b: &DVector<Real>,
    ) -> Result<DVector<Real>, LinalgError> {
        solve_well_conditioned(
            a,
            b,
            self.options.rank_tolerance,
            self.options.min_conditioning,
        )
    }

    fn rotation_block(&self, r: &Mat3) -> Result<Mat3, HandEyeError> {
        if self.options.project_rotations {
            project_to_so3(r).map_err(|e| HandEyeError::from_linalg(SolveStage::Rotation, e))
        } else {
            Ok(*r)
        }
    }

    fn estimate_rotation(&self, pairs: &[MotionPair]) -> Result<RotationStage, HandEyeError> {
        let min_angle = self.options.min_rotation_rad;
        let mut blocks: Vec<(Mat3, Vec3)> = Vec::with_capacity(pairs.len());
        let mut skipped_pairs = Vec::new();

        for (idx, pair) in pairs.iter().enumerate() {
            let rg = self.rotation_block(pair.gripper.rotation())?;
            let rc = self.rotation_block(pair.camera.rotation())?;
            let aa_g = AxisAngle::from_rotation(&rg);
            let aa_c = AxisAngle::from_rotation(&rc);

            match (
                aa_g.modified_rodrigues(min_angle),
                aa_c.modified_rodrigues(min_angle),
            ) {
                (Some(p_g), Some(p_c)) => blocks.push((skew(&(p_g + p_c)), p_c - p_g)),
                _ => {
                    debug!(
                        "motion pair {} skipped: rotation {:.3e} / {:.3e} rad below {:.3e}",
                        idx, aa_g.angle, aa_c.angle, min_angle
                    );
                    skipped_pairs.push(idx);
                }
            }
        }

        if blocks.len() < 2 {
            return Err(HandEyeError::InsufficientRotation {
                usable: blocks.len(),
            });
        }

        let num_rows = 3 * blocks.len();
        let mut a = DMatrix::<Real>::zeros(num_rows, 3);
        let mut b = DVector::<Real>::zeros(num_rows);
        for (i, (block, rhs)) in blocks.iter().enumerate() {
            a.view_mut((3 * i, 0), (3, 3)).copy_from(block);
            b.rows_mut(3 * i, 3).copy_from(rhs);
        }

        let p_prime = self.solve_stacked(&a, &b)
            .map_err(|e| HandEyeError::from_linalg(SolveStage::Rotation, e))?;
        let rms = residual_rms(&a, &b, &p_prime);
        let p_prime = Vec3::new(p_prime[0], p_prime[1], p_prime[2]);

        let rotation = rotation_from_scaled_rodrigues(&p_prime)?;
        Ok(RotationStage {
            rotation,
            used_pairs: blocks.len(),
            skipped_pairs,
            rms,
        })
    }

    fn estimate_translation(
        &self,
        pairs: &[MotionPair],
        rcg: &Mat3,
    ) -> Result<(Vec3, Real), HandEyeError> {
        let num_rows = 3 * pairs.len();
        let mut a = DMatrix::<Real>::zeros(num_rows, 3);
        let mut b = DVector::<Real>::zeros(num_rows);

        for (i, pair) in pairs.iter().enumerate() {
            let rg = pair.gripper.rotation();
            let tg = pair.gripper.translation();
            let tc = pair.camera.translation();

            a.view_mut((3 * i, 0), (3, 3))
                .copy_from(&(rg - Mat3::identity()));
            b.rows_mut(3 * i, 3).copy_from(&(rcg * tc - tg));
        }

        let t = self.solve_stacked(&a, &b)
            .map_err(|e| HandEyeError::from_linalg(SolveStage::Translation, e))?;
        let rms = residual_rms(&a, &b, &t);
        let t = Vec3::new(t[0], t[1], t[2]);
        if t.iter().any(|v| !v.is_finite()) {
            return Err(HandEyeError::NonFinite(SolveStage::Translation));
        }
        Ok((t, rms))
    }
}

/// Rotation from the scaled Rodrigues vector `P'` of the rotation solve.
fn rotation_from_scaled_rodrigues(p_prime: &Vec3) -> Result<Mat3, HandEyeError> {
    let pcg = p_prime * (2.0 / (1.0 + p_prime.norm_squared()).sqrt());
    let norm_sq = pcg.norm_squared();
    if !norm_sq.is_finite() {
        return Err(HandEyeError::NonFinite(SolveStage::Rotation));
    }
    if norm_sq > 4.0 + ROTATION_DOMAIN_SLACK {
        return Err(HandEyeError::RotationOutOfDomain(norm_sq));
    }
    let root = (4.0 - norm_sq).max(0.0).sqrt();

    let rcg = Mat3::identity() * (1.0 - 0.5 * norm_sq)
        + (pcg * pcg.transpose() + skew(&pcg) * root) * 0.5;
    if rcg.iter().any(|v| !v.is_finite()) {
        return Err(HandEyeError::NonFinite(SolveStage::Rotation));
    }
    Ok(rcg)
}

fn residual_rms(a: &DMatrix<Real>, b: &DVector<Real>, x: &DVector<Real>) -> Real {
    (a * x - b).norm() / (b.len() as Real).sqrt()
}

/// Tsai hand-eye over paired 4x4 motion matrices `Hgij`, `Hcij`.
///
/// Returns `Hcg` (camera -> gripper). Sizes are checked before any
/// matrix is parsed.
pub fn estimate_handeye_tsai(
    gripper_motions: &[Mat4],
    camera_motions: &[Mat4],
    options: &TsaiOptions,
) -> Result<TsaiEstimate, HandEyeError> {
    options.validate()?;
    let pairs = motion_pairs_from_matrices(
        gripper_motions,
        camera_motions,
        options.transform_tolerance,
    )?;
    HandEyeSolver::new(*options).solve(&pairs)
}
