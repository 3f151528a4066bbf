use rand::Rng;
use rand::SeedableRng;
use rand::distr::StandardUniform;
use rand::rngs::StdRng;

use crate::utils::linspace;

/// Fixed random seed to support repeatable testing
const SEED: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6,
    5, 4, 3, 2, 1,
];

/// Get a random number generator with a const seed for repeatable testing
pub fn rng_fixed_seed() -> StdRng {
    StdRng::from_seed(SEED)
}

/// Generate `n` random numbers using provided generator
pub fn randn<T>(rng: &mut StdRng, n: usize) -> Vec<T>
where
    StandardUniform: rand::distr::Distribution<T>,
{
    std::iter::repeat_with(|| rng.random::<T>())
        .take(n)
        .collect()
}

/// Evenly spaced grid with each interior knot moved by up to
/// `noise / 2` of the nominal spacing. Endpoints are kept exact.
/// `noise` below 1 keeps the grid strictly increasing.
pub fn jittered_grid(rng: &mut StdRng, start: f64, stop: f64, n: usize, noise: f64) -> Vec<f64> {
    let dx = (stop - start) / (n - 1) as f64;
    let mut x = linspace(start, stop, n);
    for v in x.iter_mut().take(n - 1).skip(1) {
        *v += (rng.random::<f64>() - 0.5) * noise * dx;
    }
    x
}

/// Root-mean-square difference between two equal-length slices
pub fn rms_error(a: &[f64], b: &[f64]) -> f64 {
    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (sum / a.len() as f64).sqrt()
}
