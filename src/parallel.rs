//! Parallel iteration switch.
//!
//! With the `parallel` feature (default) the macros below dispatch to rayon;
//! without it they fall back to plain iterators. Both variants are consumed
//! with `collect()`, which keeps results in input order, so the sequential
//! and parallel builds produce identical output.
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let stats: Vec<f64> = iter_maybe_parallel!(from_period..to_period)
//!     .map(|p| method.compute_statistic(p))
//!     .collect();
//! ```

/// Iterate a range or owned collection, in parallel when `parallel` is enabled.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Iterate a slice by reference, in parallel when `parallel` is enabled.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

pub use iter_maybe_parallel;
pub use slice_maybe_parallel;

#[cfg(test)]
mod tests {
    #[cfg(feature = "parallel")]
    use rayon::iter::ParallelIterator;

    #[test]
    fn test_range_order_preserved() {
        let squares: Vec<usize> = iter_maybe_parallel!(0..100usize).map(|i| i * i).collect();
        for (i, &s) in squares.iter().enumerate() {
            assert_eq!(s, i * i);
        }
    }

    #[test]
    fn test_slice_order_preserved() {
        let values = vec![3.0, 1.0, 2.0];
        let doubled: Vec<f64> = slice_maybe_parallel!(values).map(|&v| 2.0 * v).collect();
        assert_eq!(doubled, vec![6.0, 2.0, 4.0]);
    }
}
