//! Closed-form eigenvalues of a symmetric 2×2 matrix.

/// Eigenvalues of `[[xx, xy], [xy, yy]]` ordered by magnitude: `|l1| <= |l2|`.
///
/// Uses `μ± = (tr ± hypot(xx - yy, 2 xy)) / 2`. `hypot` keeps the
/// discriminant free of overflow and cancellation, and both roots are real.
#[inline]
pub fn symmetric_eigenvalues(xx: f32, xy: f32, yy: f32) -> (f32, f32) {
    let half_trace = 0.5 * (xx + yy);
    let half_disc = 0.5 * (xx - yy).hypot(2.0 * xy);
    let a = half_trace + half_disc;
    let b = half_trace - half_disc;
    if a.abs() <= b.abs() {
        (a, b)
    } else {
        (b, a)
    }
}
