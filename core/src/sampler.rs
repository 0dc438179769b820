//! Random-variate generators used by the iteration engine.
//!
//! All three are total: degenerate parameters take an explicit branch
//! and return a boundary value instead of failing.

use crate::rng::UniformSource;

/// Triangular variate in [min, max] by inverse CDF.
///
/// A zero-width range returns `min` without dividing. The ordering
/// `min <= mode <= max` is the caller's responsibility; see
/// `TriangularInput::validate`.
pub fn sample_triangular(rng: &mut impl UniformSource, min: f64, mode: f64, max: f64) -> f64 {
    let width = max - min;
    if width == 0.0 {
        return min;
    }
    let u = rng.next_f64();
    let c = (mode - min) / width;
    if u <= c {
        min + (u * width * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * width * (max - mode)).sqrt()
    }
}

/// Poisson event count, Knuth's product-of-uniforms method.
pub fn sample_poisson(rng: &mut impl UniformSource, lambda: f64) -> u64 {
    if lambda <= 0.0 || lambda.is_nan() {
        return 0;
    }
    let threshold = (-lambda).exp();
    let mut draws: u64 = 0;
    let mut product = 1.0;
    loop {
        draws += 1;
        product *= rng.next_f64();
        if product <= threshold {
            return draws - 1;
        }
    }
}

/// 1 with probability `p`, else 0.
pub fn sample_bernoulli(rng: &mut impl UniformSource, p: f64) -> u8 {
    if rng.next_f64() < p {
        1
    } else {
        0
    }
}
