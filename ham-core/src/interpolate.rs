//! Piecewise-linear interpolation on sorted abscissae.

/// Linearly interpolate `ys` over the strictly increasing abscissae `xs` at `x`.
///
/// Values beyond either end of `xs` are extrapolated linearly using the
/// slope of the nearest segment.
///
/// # Panics
/// Panics if `xs` and `ys` differ in length or are empty.
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    assert_eq!(xs.len(), ys.len(), "xs must have same length as ys");
    assert!(!xs.is_empty(), "cannot interpolate on an empty abscissa");

    let n = xs.len();
    if n == 1 {
        return ys[0];
    }

    // First index whose node lies strictly above x, clamped so that the
    // selected segment also covers extrapolation at both ends.
    let k = xs.partition_point(|&v| v <= x);
    let i = k.clamp(1, n - 1) - 1;

    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + t * (ys[i + 1] - ys[i])
}
