//! Closed-form approximations of the normal and chi-square distributions.
//!
//! These are the approximations used for periodogram significance
//! thresholds; none of them integrates the incomplete gamma function.

use std::f64::consts::PI;

/// Constant of Winitzki's error-function approximation.
const ERF_A: f64 = 8.0 * (PI - 3.0) / (3.0 * PI * (4.0 - PI));

/// Error function, Winitzki approximation (absolute error below 4e-4).
pub fn erf(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let ax2 = ERF_A * x * x;
    let inner = 1.0 - (-x * x * (4.0 / PI + ax2) / (1.0 + ax2)).exp();
    x.signum() * inner.sqrt()
}

/// Inverse error function on `(-1, 1)`, inverse of the same approximation.
pub fn erf_inv(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let lg = (1.0 - x * x).ln();
    let s = 2.0 / (PI * ERF_A) + lg / 2.0;
    x.signum() * ((s * s - lg / ERF_A).sqrt() - s).sqrt()
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal quantile for probability `p` in `(0, 1)`.
pub fn normal_quantile(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

/// Wilson-Hilferty coefficients `(h, p, m)` for `k` degrees of freedom.
///
/// These are the non-central chi-square approximation coefficients at
/// non-centrality zero; `h` is then `1/3` and `m` vanishes.
fn wilson_hilferty(k: f64) -> (f64, f64, f64) {
    let h = 1.0 - (2.0 * k * k) / (3.0 * k * k);
    let p = 1.0 / k;
    let m = (h - 1.0) * (1.0 - 3.0 * h);
    (h, p, m)
}

/// Chi-square quantile: the `x` with `P(X <= x) = prob` for `X ~ chi2(k)`.
///
/// Cube-root normal approximation combined with [`normal_quantile`].
pub fn chi_square_quantile(prob: f64, k: usize) -> f64 {
    let k = k as f64;
    let (h, p, m) = wilson_hilferty(k);
    let z = normal_quantile(prob);
    let s = z * h * (2.0 * p).sqrt() * (1.0 + 0.5 * m * p)
        + (1.0 + h * p * (h - 1.0 - 0.5 * (2.0 - h) * m * p));
    k * s.powf(1.0 / h)
}

/// Chi-square CDF under the same approximation.
pub fn chi_square_cdf(x: f64, k: usize) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let k = k as f64;
    let (h, p, m) = wilson_hilferty(k);
    let z = ((x / k).powf(h) - (1.0 + h * p * (h - 1.0 - 0.5 * (2.0 - h) * m * p)))
        / (h * (2.0 * p).sqrt() * (1.0 + 0.5 * m * p));
    normal_cdf(z)
}
