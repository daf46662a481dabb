//! Mathematical utilities and type definitions.
//!
//! This module provides the fundamental types used throughout the workspace
//! and the linear-algebra helpers the hand-eye solver is assembled from.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Quaternion, UnitQuaternion, Vector3,
};

pub mod linalg;

pub use linalg::{
    kron, project_to_so3, sign, skew, solve_least_squares, solve_well_conditioned, LinalgError,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// Quaternion with [`Real`] components, not necessarily normalized.
pub type Quat = Quaternion<Real>;
/// Unit quaternion with [`Real`] components.
pub type UnitQuat = UnitQuaternion<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a row-major `[[f64; 4]; 4]` array into a [`Mat4`].
pub fn mat4_from_rows(rows: &[[Real; 4]; 4]) -> Mat4 {
    Mat4::from_fn(|r, c| rows[r][c])
}

/// Convert a [`Mat4`] into a row-major `[[f64; 4]; 4]` array.
pub fn mat4_to_rows(m: &Mat4) -> [[Real; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

/// Convert a row-major `[[f64; 3]; 3]` array into a [`Mat3`].
pub fn mat3_from_rows(rows: &[[Real; 3]; 3]) -> Mat3 {
    Mat3::from_fn(|r, c| rows[r][c])
}

/// Convert a [`Mat3`] into a row-major `[[f64; 3]; 3]` array.
pub fn mat3_to_rows(m: &Mat3) -> [[Real; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_arrays_are_row_major() {
        let rows = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = mat4_from_rows(&rows);
        assert_eq!(m[(0, 3)], 4.0);
        assert_eq!(m[(2, 1)], 10.0);
        assert_eq!(mat4_to_rows(&m), rows);

        let r3 = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(mat3_from_rows(&r3)[(1, 2)], 6.0);
        assert_eq!(mat3_to_rows(&mat3_from_rows(&r3)), r3);
    }
}
