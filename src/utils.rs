//! Convenience methods for constructing grids in a way that echoes,
//! but does not exactly match, methods common in scripting languages.
use itertools::Itertools;
use num_traits::Float;

fn cast<T: Float>(i: usize) -> T {
    T::from(i).unwrap_or_else(T::nan)
}

/// Generates evenly spaced values from start to stop,
/// including the endpoint.
pub fn linspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    if n < 2 {
        return vec![start; n];
    }
    let dx: T = (stop - start) / cast(n - 1);
    let mut out: Vec<T> = (0..n).map(|i| start + cast::<T>(i) * dx).collect();
    out[n - 1] = stop;
    out
}

/// Generates values from start to stop with a constant ratio between
/// neighbors, including the endpoint. Both ends must be positive.
pub fn geomspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    linspace(start.ln(), stop.ln(), n)
        .into_iter()
        .enumerate()
        .map(|(i, v)| match i {
            0 => start,
            _ if i == n - 1 => stop,
            _ => v.exp(),
        })
        .collect()
}

/// Generates a meshgrid in C ordering (x0, y0, z0, x0, y0, z1, ..., x0, yn, zn)
pub fn meshgrid<T>(x: Vec<&Vec<T>>) -> Vec<Vec<T>>
where
    T: Float,
{
    x.into_iter()
        .multi_cartesian_product()
        .map(|xx| xx.iter().map(|y| **y).collect())
        .collect()
}
