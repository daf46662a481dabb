//! Closed-form hand-eye calibration.
//!
//! Solves `AX = XB` for the fixed transform between a camera/sensor frame and
//! the gripper/marker frame it is rigidly attached to, using Tsai's method:
//! one linear least-squares solve for the rotation (in modified Rodrigues
//! parameters) followed by one for the translation.
//!
//! ```no_run
//! use handeye_core::{synthetic, RigidTransform, Vec3};
//! use handeye_linear::{HandEyeSolver, MotionPair, TsaiOptions};
//!
//! let hcg = synthetic::motion(&Vec3::new(0.3, -0.2, 0.5), 0.6, Vec3::new(0.1, 0.0, 0.2))
//!     .unwrap();
//! let gripper = synthetic::default_gripper_motions();
//! let camera = synthetic::camera_motions(&hcg, &gripper);
//! let pairs: Vec<MotionPair> = gripper
//!     .into_iter()
//!     .zip(camera)
//!     .map(|(g, c)| MotionPair::new(g, c))
//!     .collect();
//!
//! let estimate = HandEyeSolver::new(TsaiOptions::default()).solve(&pairs).unwrap();
//! println!("{}", estimate.transform.to_matrix());
//! ```

pub mod handeye;
pub mod motion;

pub use handeye::*;
pub use motion::*;
