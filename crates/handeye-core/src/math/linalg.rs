//! Small linear-algebra building blocks.
//!
//! Everything here is a pure function over `nalgebra` types. The hand-eye
//! solver composes these; they carry no state of their own.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use super::{Mat3, Real, Vec3};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("empty linear system ({rows}x{cols})")]
    EmptySystem { rows: usize, cols: usize },
    #[error("matrix has {rows} rows but right-hand side has {rhs}")]
    DimensionMismatch { rows: usize, rhs: usize },
    #[error("non-finite entries in linear system")]
    NonFinite,
    #[error("rank deficient system: numerical rank {rank}, need {required}")]
    RankDeficient { rank: usize, required: usize },
    #[error("ill-conditioned system: sigma_min / sigma_max = {ratio:.3e} < {min_ratio:.3e}")]
    IllConditioned { ratio: Real, min_ratio: Real },
    #[error("svd failed")]
    SvdFailed,
}

/// Skew-symmetric (cross-product) matrix of `v`.
///
/// ```text
/// [v]x = [  0  -v3   v2 ]
///        [  v3   0  -v1 ]
///        [ -v2  v1    0 ]
/// ```
///
/// Satisfies `skew(v) * x == v.cross(&x)`.
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Kronecker tensor product of `a` (MxN) and `b` (PxQ), an (MP)x(NQ) matrix
/// whose `(i, j)` block is `a[(i, j)] * b`.
pub fn kron(a: &DMatrix<Real>, b: &DMatrix<Real>) -> DMatrix<Real> {
    let (p, q) = b.shape();
    let mut c = DMatrix::<Real>::zeros(a.nrows() * p, a.ncols() * q);
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            c.view_mut((i * p, j * q), (p, q))
                .copy_from(&(b * a[(i, j)]));
        }
    }
    c
}

/// Signum: `1` for positive, `-1` for negative, `0` for zero (and NaN).
pub fn sign(a: Real) -> Real {
    if a > 0.0 {
        1.0
    } else if a < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Project a general 3x3 matrix to the closest rotation matrix (SO(3))
/// using SVD.
pub fn project_to_so3(m: &Mat3) -> Result<Mat3, LinalgError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    let svd = m.svd(true, true);
    let u = svd.u.ok_or(LinalgError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(LinalgError::SvdFailed)?;
    let mut r = u * v_t;

    // Ensure det(R) > 0
    if r.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r = u_flipped * v_t;
    }
    Ok(r)
}

/// Least-squares solve of `A x = b` through the SVD pseudo-inverse.
///
/// Singular values at or below `rank_tolerance * sigma_max` count as zero.
/// Unlike a plain pseudo-inverse this refuses to return a minimum-norm
/// solution for a rank-deficient `A`: the caller gets
/// [`LinalgError::RankDeficient`] instead.
pub fn solve_least_squares(
    a: &DMatrix<Real>,
    b: &DVector<Real>,
    rank_tolerance: Real,
) -> Result<DVector<Real>, LinalgError> {
    solve_well_conditioned(a, b, rank_tolerance, 0.0)
}

/// [`solve_least_squares`] that also requires `sigma_min / sigma_max` to be
/// at least `min_conditioning`.
///
/// Noise lifts the smallest singular value of a degenerate system just above
/// any rank threshold, so the rank check alone passes it; the ratio does not.
/// Fails with [`LinalgError::IllConditioned`].
pub fn solve_well_conditioned(
    a: &DMatrix<Real>,
    b: &DVector<Real>,
    rank_tolerance: Real,
    min_conditioning: Real,
) -> Result<DVector<Real>, LinalgError> {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 {
        return Err(LinalgError::EmptySystem { rows, cols });
    }
    if b.len() != rows {
        return Err(LinalgError::DimensionMismatch {
            rows,
            rhs: b.len(),
        });
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }

    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.iter().cloned().fold(0.0, Real::max);
    let threshold = rank_tolerance.max(0.0) * sigma_max;
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&s| sigma_max > 0.0 && s > threshold)
        .count();
    if rank < cols {
        return Err(LinalgError::RankDeficient {
            rank,
            required: cols,
        });
    }

    let sigma_min = svd
        .singular_values
        .iter()
        .cloned()
        .fold(Real::INFINITY, Real::min);
    let ratio = sigma_min / sigma_max;
    if ratio < min_conditioning {
        return Err(LinalgError::IllConditioned {
            ratio,
            min_ratio: min_conditioning,
        });
    }

    svd.solve(b, threshold)
        .map_err(|_| LinalgError::SvdFailed)
}
