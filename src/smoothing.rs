//! Smoothing kernels for pre-filtering activity signals.
//!
//! Kernels are plain odd-length weight vectors consumed by
//! [`Signal::convolve`](crate::signal::Signal::convolve). Smoothing must be
//! applied before any downsampling of the same signal.

use serde::{Deserialize, Serialize};

/// Kernel shape offered to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    /// Gaussian, parameterized by its standard deviation in samples.
    Gaussian,
    /// Box filter, parameterized by its length in samples.
    Uniform,
}

/// Normalized Gaussian kernel truncated at `3 * ceil(sigma)` samples on each side.
///
/// The kernel has length `2 * 3 * ceil(sigma) + 1` and sums to one.
/// A non-positive `sigma` yields the identity kernel `[1.0]`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    let half = 3 * sigma.ceil() as usize;
    let len = 2 * half + 1;
    let s2 = sigma * sigma;

    let mut kernel = vec![0.0; len];
    kernel[half] = 1.0;
    let mut sum = 1.0;
    for i in 1..=half {
        let v = (-0.5 * (i * i) as f64 / s2).exp();
        kernel[half + i] = v;
        kernel[half - i] = v;
        sum += 2.0 * v;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Box kernel of `len` equal weights `1 / len`.
///
/// Even lengths are widened by one so the kernel stays centered.
pub fn uniform_kernel(len: usize) -> Vec<f64> {
    let len = if len == 0 {
        1
    } else if len % 2 == 0 {
        len + 1
    } else {
        len
    };
    vec![1.0 / len as f64; len]
}

/// Build a kernel of the given type. `size` is the standard deviation for
/// [`KernelType::Gaussian`] and the length for [`KernelType::Uniform`].
pub fn make_kernel(kernel_type: KernelType, size: f64) -> Vec<f64> {
    match kernel_type {
        KernelType::Gaussian => gaussian_kernel(size),
        KernelType::Uniform => uniform_kernel(size.max(0.0).round() as usize),
    }
}
