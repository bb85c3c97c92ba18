use std::f64::consts::{PI, SQRT_2};

use rand::{Rng, RngCore};

/// Uniform draw on `[0, 1)`.
pub fn sample_uniform(rng: &mut dyn RngCore) -> f64 {
    rng.random::<f64>()
}

/// Normal draw via the Box-Muller transform.
pub fn sample_normal(mean: f64, sd: f64, rng: &mut dyn RngCore) -> f64 {
    // 1 - U keeps the log argument in (0, 1].
    let u1 = 1.0 - sample_uniform(rng);
    let u2 = sample_uniform(rng);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + sd * z
}

/// Means above this use the normal approximation.
const POISSON_EXACT_LIMIT: f64 = 500.0;

/// Trial counts up to this are drawn one Bernoulli trial at a time.
const BINOMIAL_EXACT_LIMIT: u64 = 64;

/// Poisson draw. Moderate means are split into chunks small enough for
/// Knuth's multiplication method; large means use a normal approximation so
/// the cost stays bounded.
pub fn sample_poisson(lambda: f64, rng: &mut dyn RngCore) -> u64 {
    const CHUNK: f64 = 30.0;
    if lambda <= 0.0 || !lambda.is_finite() {
        return 0;
    }
    if lambda > POISSON_EXACT_LIMIT {
        let draw = sample_normal(lambda, lambda.sqrt(), rng).round();
        return draw.max(0.0) as u64;
    }
    let parts = (lambda / CHUNK).ceil().max(1.0);
    let part = lambda / parts;
    (0..parts as u64).map(|_| knuth_poisson(part, rng)).sum()
}

/// Binomial draw with a cost independent of `trials`.
///
/// Small trial counts are simulated directly. Otherwise the normal
/// approximation is used when the variance is large enough, and the Poisson
/// approximation of the rarer outcome when it is not.
pub fn sample_binomial(trials: u64, p: f64, rng: &mut dyn RngCore) -> u64 {
    if trials == 0 || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return trials;
    }
    if trials <= BINOMIAL_EXACT_LIMIT {
        return (0..trials).filter(|_| sample_uniform(rng) < p).count() as u64;
    }

    let n = trials as f64;
    let variance = n * p * (1.0 - p);
    if variance >= 25.0 {
        let draw = sample_normal(n * p, variance.sqrt(), rng).round();
        return draw.clamp(0.0, n) as u64;
    }
    if p <= 0.5 {
        sample_poisson(n * p, rng).min(trials)
    } else {
        trials - sample_poisson(n * (1.0 - p), rng).min(trials)
    }
}

fn knuth_poisson(lambda: f64, rng: &mut dyn RngCore) -> u64 {
    let limit = (-lambda).exp();
    let mut k = 0_u64;
    let mut p = 1.0;
    loop {
        p *= sample_uniform(rng);
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
