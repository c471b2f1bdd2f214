//! Optional parallel iteration.
//!
//! With the `parallel` feature the per-year weighted fits and the
//! per-candidate outlier statistics run on rayon's pool. Without it the same
//! code iterates sequentially. Results are always collected in index order,
//! so both builds select identical outliers.

/// Iterate a range or collection in parallel when the `parallel` feature is on.
///
/// ```ignore
/// let fits: Vec<_> = iter_maybe_parallel!(0..years.len())
///     .map(|i| fit_year(i))
///     .collect();
/// ```
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

pub use iter_maybe_parallel;
