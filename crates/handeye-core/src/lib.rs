//! Core math primitives for `handeye-rs`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec3`, `Mat4`, ...) and small
//!   helpers (`skew`, `kron`, `sign`, SVD least squares),
//! - converters between quaternions, Euler angles and rotation matrices,
//! - a validated [`RigidTransform`] and [`DualQuaternion`],
//! - deterministic synthetic motion generators for tests and examples.
//!
//! Quaternions are scalar-first `(w, x, y, z)` everywhere in the public API.

/// Linear algebra type aliases and helpers.
pub mod math;
/// Quaternion / Euler / rotation-matrix conversions.
pub mod rotation;
/// Deterministic synthetic data for hand-eye problems.
pub mod synthetic;
/// Rigid transforms and dual quaternions.
pub mod transform;

pub use math::*;
pub use rotation::*;
pub use transform::*;
